//! What the renderer draws over each processed frame.

use crate::tracker::Rect;

/// One tracked region to outline. `index` selects the color and the chart
/// series the outline belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayRoi {
    pub index: usize,
    pub id: u64,
    pub rect: Rect,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub rois: Vec<OverlayRoi>,
    /// Rectangle the operator is currently drawing
    pub draft: Option<Rect>,
    pub fps: Option<String>,
    pub timestamp: Option<String>,
}

/// Frame-rate estimate from consecutive source timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub struct FpsCounter {
    last_timestamp: Option<u64>,
    fps: Option<f64>,
}

impl FpsCounter {
    /// Smoothing weight of the newest interval.
    const ALPHA: f64 = 0.1;

    /// Feed a frame timestamp; `units_per_second` is the source's clock rate.
    pub fn observe(&mut self, timestamp: u64, units_per_second: f64) {
        if let Some(last) = self.last_timestamp.filter(|&last| timestamp > last) {
            let instant = units_per_second / (timestamp - last) as f64;
            self.fps = Some(match self.fps {
                Some(fps) => fps + Self::ALPHA * (instant - fps),
                None => instant,
            });
        }
        self.last_timestamp = Some(timestamp);
    }

    pub fn fps(&self) -> Option<f64> {
        self.fps
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_from_timestamps() {
        let mut counter = FpsCounter::default();
        counter.observe(0, 1e9);
        assert_eq!(counter.fps(), None);

        for i in 1..=10u64 {
            counter.observe(i * 33_333_333, 1e9);
        }
        let fps = counter.fps().unwrap();
        assert!((fps - 30.0).abs() < 0.01, "fps = {fps}");
    }

    #[test]
    fn test_repeated_timestamp_is_ignored() {
        let mut counter = FpsCounter::default();
        counter.observe(100, 1000.0);
        counter.observe(100, 1000.0);
        assert_eq!(counter.fps(), None);
        counter.observe(200, 1000.0);
        assert_eq!(counter.fps(), Some(10.0));
    }
}
