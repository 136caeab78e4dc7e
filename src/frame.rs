//! Frames as delivered by a frame source, and the grayscale plane the
//! tracking algorithms work on.

use std::sync::Arc;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// Pixel layout of a frame buffer. All formats are 8 bits per channel,
/// packed, without row padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    #[default]
    Rgb8,
    Bgr8,
    Rgba8,
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
            PixelFormat::Rgba8 => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// One video frame with its source-relative timestamp.
///
/// The pixel buffer is reference counted so a source can hand the same frame
/// to the pipeline and to a preview without copying.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Timestamp in the source's native unit (nanoseconds for most sources).
    pub timestamp: u64,
}

impl Frame {
    pub fn new(
        data: impl Into<Arc<[u8]>>,
        width: u32,
        height: u32,
        format: PixelFormat,
        timestamp: u64,
    ) -> Self {
        Self {
            data: data.into(),
            width,
            height,
            format,
            timestamp,
        }
    }

    /// Check that the buffer matches the declared dimensions and format.
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::Empty {
                width: self.width,
                height: self.height,
            });
        }

        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|pixels| pixels.checked_mul(self.format.bytes_per_pixel()))
            .ok_or(FrameError::TooLarge {
                width: self.width,
                height: self.height,
            })?;
        if self.data.len() != expected {
            return Err(FrameError::BufferSize {
                expected,
                actual: self.data.len(),
            });
        }

        Ok(())
    }

    /// Convert to a grayscale plane using Rec.601 luma weights.
    ///
    /// Callers must `validate` first; a short buffer yields zero pixels for
    /// the missing tail.
    pub fn luma(&self) -> LumaFrame {
        let (w, h) = (self.width as usize, self.height as usize);
        let bpp = self.format.bytes_per_pixel();
        let data = &self.data;

        let pixels = Array2::from_shape_fn((h, w), |(row, col)| {
            let i = (row * w + col) * bpp;
            match (self.format, data.get(i..i + bpp)) {
                (PixelFormat::Gray8, Some(p)) => p[0] as f32,
                (PixelFormat::Rgb8 | PixelFormat::Rgba8, Some(p)) => {
                    0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32
                }
                (PixelFormat::Bgr8, Some(p)) => {
                    0.114 * p[0] as f32 + 0.587 * p[1] as f32 + 0.299 * p[2] as f32
                }
                (_, None) => 0.0,
            }
        });

        LumaFrame {
            pixels,
            timestamp: self.timestamp,
        }
    }
}

/// Grayscale view of a frame, indexed `[[row, col]]`.
#[derive(Debug, Clone)]
pub struct LumaFrame {
    pub pixels: Array2<f32>,
    pub timestamp: u64,
}

impl LumaFrame {
    pub fn from_pixels(pixels: Array2<f32>, timestamp: u64) -> Self {
        Self { pixels, timestamp }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_buffer_size() {
        let frame = Frame::new(vec![0u8; 12], 2, 2, PixelFormat::Rgb8, 0);
        assert!(frame.validate().is_ok());

        let short = Frame::new(vec![0u8; 11], 2, 2, PixelFormat::Rgb8, 0);
        assert_eq!(
            short.validate(),
            Err(FrameError::BufferSize {
                expected: 12,
                actual: 11
            })
        );

        let empty = Frame::new(Vec::<u8>::new(), 0, 4, PixelFormat::Gray8, 0);
        assert!(matches!(empty.validate(), Err(FrameError::Empty { .. })));
    }

    #[test]
    fn test_oversized_dimensions_are_rejected() {
        let frame = Frame::new(vec![0u8; 16], u32::MAX, u32::MAX, PixelFormat::Rgb8, 0);
        assert_eq!(
            frame.validate(),
            Err(FrameError::TooLarge {
                width: u32::MAX,
                height: u32::MAX
            })
        );
    }

    #[test]
    fn test_luma_weights() {
        let rgb = Frame::new(vec![255u8, 0, 0], 1, 1, PixelFormat::Rgb8, 7);
        let bgr = Frame::new(vec![0u8, 0, 255], 1, 1, PixelFormat::Bgr8, 7);

        let a = rgb.luma();
        let b = bgr.luma();
        assert!((a.pixels[[0, 0]] - 0.299 * 255.0).abs() < 1e-3);
        assert!((a.pixels[[0, 0]] - b.pixels[[0, 0]]).abs() < 1e-3);
        assert_eq!(a.timestamp, 7);
    }

    #[test]
    fn test_luma_shape() {
        let frame = Frame::new(vec![10u8; 6], 3, 2, PixelFormat::Gray8, 0);
        let luma = frame.luma();
        assert_eq!(luma.width(), 3);
        assert_eq!(luma.height(), 2);
        assert_eq!(luma.pixels[[1, 2]], 10.0);
    }
}
