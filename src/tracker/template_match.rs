//! Template tracker based on normalized cross-correlation (NCC).

use ndarray::{Array2, ArrayView2, Zip, s};

use crate::error::TrackerError;
use crate::frame::LumaFrame;
use crate::tracker::algorithm::{TrackUpdate, TrackerAlgorithm};
use crate::tracker::rect::Rect;

/// Smallest template side accepted by `initialize`, in pixels.
const MIN_TEMPLATE_SIDE: usize = 4;

/// Below this standard deviation a patch is considered textureless.
const MIN_TEMPLATE_STD: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct TemplateConfig {
    /// Search margin around the previous ROI, as a fraction of its larger side.
    pub search_factor: f64,
    /// Lower bound on the search margin in pixels.
    pub min_search_margin: usize,
    /// Template blending weight applied on confident matches.
    pub learning_rate: f32,
    /// Matches at or above this NCC score refresh the template.
    pub refresh_thresh: f32,
    /// Matches below this NCC score are reported as lost.
    pub lost_thresh: f32,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            search_factor: 0.5,
            min_search_margin: 8,
            learning_rate: 0.1,
            refresh_thresh: 0.6,
            lost_thresh: 0.2,
        }
    }
}

/// Integer pixel box `(col, row, width, height)` fully inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PixelBox {
    pub col: usize,
    pub row: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelBox {
    /// Round `roi` to whole pixels and clip it to the frame.
    pub fn from_rect(roi: Rect, frame: &LumaFrame) -> Option<Self> {
        let clipped = roi.clip(frame.width() as f64, frame.height() as f64)?;
        let col = clipped.x.round() as usize;
        let row = clipped.y.round() as usize;
        let width = (clipped.width.round() as usize).min(frame.width().saturating_sub(col));
        let height = (clipped.height.round() as usize).min(frame.height().saturating_sub(row));
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            col,
            row,
            width,
            height,
        })
    }

    pub fn view<'a>(&self, frame: &'a LumaFrame) -> ArrayView2<'a, f32> {
        frame.pixels.slice(s![
            self.row..self.row + self.height,
            self.col..self.col + self.width
        ])
    }

    pub fn to_rect(self) -> Rect {
        Rect::new(
            self.col as f64,
            self.row as f64,
            self.width as f64,
            self.height as f64,
        )
    }
}

/// Tracks a target by sliding its appearance template over a search window
/// around the last known position.
#[derive(Debug, Clone, Default)]
pub struct TemplateTracker {
    config: TemplateConfig,
    /// Zero-mean template
    template: Option<Array2<f32>>,
    template_norm: f32,
    roi: Rect,
}

impl TemplateTracker {
    pub fn new(config: TemplateConfig) -> Self {
        Self {
            config,
            template: None,
            template_norm: 0.0,
            roi: Rect::default(),
        }
    }

    pub fn roi(&self) -> Rect {
        self.roi
    }

    pub fn is_initialized(&self) -> bool {
        self.template.is_some()
    }

    fn set_template(&mut self, patch: ArrayView2<'_, f32>) -> bool {
        let mean = patch.mean().unwrap_or(0.0);
        let centered = patch.mapv(|v| v - mean);
        let norm = centered.iter().map(|v| v * v).sum::<f32>().sqrt();
        let std = norm / (centered.len() as f32).sqrt();
        if std < MIN_TEMPLATE_STD {
            return false;
        }
        self.template = Some(centered);
        self.template_norm = norm;
        true
    }

    /// Best NCC match of the template in a window centered on `around`.
    ///
    /// Returns the matched box and its score, or `None` when the window does
    /// not fit a whole template.
    pub(crate) fn locate(&self, frame: &LumaFrame, around: Rect) -> Option<(PixelBox, f32)> {
        let template = self.template.as_ref()?;
        let (th, tw) = template.dim();

        let margin = (around.width.max(around.height) * self.config.search_factor)
            .max(self.config.min_search_margin as f64);
        let window = PixelBox::from_rect(around.expand(margin), frame)?;
        if window.width < tw || window.height < th {
            return None;
        }

        let n = (tw * th) as f32;
        let mut best: Option<(PixelBox, f32)> = None;

        for row in window.row..=window.row + window.height - th {
            for col in window.col..=window.col + window.width - tw {
                let candidate = PixelBox {
                    col,
                    row,
                    width: tw,
                    height: th,
                };
                let patch = candidate.view(frame);

                let mut cross = 0.0f32;
                let mut sum = 0.0f32;
                let mut sum_sq = 0.0f32;
                Zip::from(&patch).and(template).for_each(|&p, &t| {
                    cross += p * t;
                    sum += p;
                    sum_sq += p * p;
                });

                let var = (sum_sq - sum * sum / n).max(0.0);
                let score = if var > 0.0 {
                    cross / (var.sqrt() * self.template_norm)
                } else {
                    0.0
                };

                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((candidate, score));
                }
            }
        }

        best
    }

    /// Blend the template towards the patch at `at`.
    pub(crate) fn refresh(&mut self, frame: &LumaFrame, at: PixelBox) {
        let Some(template) = self.template.as_ref() else {
            return;
        };
        if at.view(frame).dim() != template.dim() {
            return;
        }

        let lr = self.config.learning_rate;
        let patch = at.view(frame);
        let mean = patch.mean().unwrap_or(0.0);
        let blended = Zip::from(template)
            .and(&patch)
            .map_collect(|&t, &p| (1.0 - lr) * t + lr * (p - mean));
        self.set_template(blended.view());
    }

    pub(crate) fn config(&self) -> &TemplateConfig {
        &self.config
    }
}

impl TrackerAlgorithm for TemplateTracker {
    fn initialize(&mut self, frame: &LumaFrame, roi: Rect) -> bool {
        self.template = None;
        self.roi = roi;

        let Some(pbox) = PixelBox::from_rect(roi, frame) else {
            return false;
        };
        if pbox.width < MIN_TEMPLATE_SIDE || pbox.height < MIN_TEMPLATE_SIDE {
            return false;
        }

        let ok = self.set_template(pbox.view(frame));
        if ok {
            self.roi = pbox.to_rect();
        }
        ok
    }

    fn update(&mut self, frame: &LumaFrame) -> Result<TrackUpdate, TrackerError> {
        if !self.is_initialized() {
            return Err(TrackerError::NotInitialized);
        }

        let (found, score) = self
            .locate(frame, self.roi)
            .ok_or(TrackerError::DegenerateRoi)?;
        let confidence = score.clamp(0.0, 1.0);
        if score < self.config.lost_thresh {
            return Err(TrackerError::TargetLost { confidence });
        }

        if score >= self.config.refresh_thresh {
            self.refresh(frame, found);
        }
        self.roi = found.to_rect();

        Ok(TrackUpdate {
            roi: self.roi,
            confidence,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A dark frame with a bright textured square whose top-left corner is at `(x, y)`.
    pub(crate) fn frame_with_square(w: usize, h: usize, x: usize, y: usize, timestamp: u64) -> LumaFrame {
        let pixels = Array2::from_shape_fn((h, w), |(r, c)| {
            if r >= y && r < y + 12 && c >= x && c < x + 12 {
                // checkerboard texture so the patch is not flat
                if ((r - y) / 3 + (c - x) / 3) % 2 == 0 { 220.0 } else { 140.0 }
            } else {
                20.0
            }
        });
        LumaFrame::from_pixels(pixels, timestamp)
    }

    #[test]
    fn test_follows_translation() {
        let mut tracker = TemplateTracker::default();
        let f0 = frame_with_square(80, 60, 20, 20, 0);
        assert!(tracker.initialize(&f0, Rect::new(18.0, 18.0, 16.0, 16.0)));

        let f1 = frame_with_square(80, 60, 25, 23, 1);
        let update = tracker.update(&f1).unwrap();
        assert_eq!(update.roi, Rect::new(23.0, 21.0, 16.0, 16.0));
        assert!(update.confidence > 0.9);
    }

    #[test]
    fn test_flat_patch_fails_initialize() {
        let mut tracker = TemplateTracker::default();
        let flat = LumaFrame::from_pixels(Array2::from_elem((40, 40), 50.0), 0);
        assert!(!tracker.initialize(&flat, Rect::new(5.0, 5.0, 10.0, 10.0)));
        assert_eq!(tracker.update(&flat), Err(TrackerError::NotInitialized));
    }

    #[test]
    fn test_roi_outside_frame_fails_initialize() {
        let mut tracker = TemplateTracker::default();
        let f0 = frame_with_square(40, 40, 5, 5, 0);
        assert!(!tracker.initialize(&f0, Rect::new(100.0, 100.0, 10.0, 10.0)));
    }
}
