//! Template matching with a constant-velocity motion prior.
//!
//! The Kalman prediction centers the search window, which keeps fast but
//! smoothly moving targets (a cart, a pendulum bob) inside it, and lets the
//! track coast through short occlusions.

use crate::error::TrackerError;
use crate::frame::LumaFrame;
use crate::tracker::algorithm::{TrackUpdate, TrackerAlgorithm};
use crate::tracker::kalman_filter::{KalmanFilter, KalmanState};
use crate::tracker::rect::Rect;
use crate::tracker::template_match::TemplateTracker;

/// Frames the track may coast on prediction alone before it is reported lost.
const MAX_COAST_FRAMES: u32 = 10;

#[derive(Debug, Clone, Default)]
pub struct KalmanTemplateTracker {
    matcher: TemplateTracker,
    kalman_filter: KalmanFilter,
    state: Option<KalmanState>,
    /// Template-sized ROI; the filter's aspect/height only drive the center.
    size: (f64, f64),
    coasted: u32,
}

impl KalmanTemplateTracker {
    fn roi_from(&self, state: &KalmanState) -> Rect {
        let (cx, cy) = state.rect().center();
        Rect::new(0.0, 0.0, self.size.0, self.size.1).with_center(cx, cy)
    }
}

impl TrackerAlgorithm for KalmanTemplateTracker {
    fn initialize(&mut self, frame: &LumaFrame, roi: Rect) -> bool {
        self.state = None;
        self.coasted = 0;

        if !self.matcher.initialize(frame, roi) {
            return false;
        }

        let start = self.matcher.roi();
        self.size = (start.width, start.height);
        self.state = Some(self.kalman_filter.initiate(start));
        true
    }

    fn update(&mut self, frame: &LumaFrame) -> Result<TrackUpdate, TrackerError> {
        let state = self.state.as_ref().ok_or(TrackerError::NotInitialized)?;
        let predicted = self.kalman_filter.predict(state);
        let predicted_roi = self.roi_from(&predicted);

        let thresholds = self.matcher.config();
        let (lost_thresh, refresh_thresh) = (thresholds.lost_thresh, thresholds.refresh_thresh);

        let matched = self
            .matcher
            .locate(frame, predicted_roi)
            .filter(|(_, score)| *score >= lost_thresh);

        let (next, confidence) = match matched {
            Some((found, score)) => {
                // weak matches are trusted less than the motion model
                let noise = 1.0 / f64::from(score.max(0.1));
                let corrected = self
                    .kalman_filter
                    .update(&predicted, found.to_rect(), noise)
                    .unwrap_or(predicted);
                if score >= refresh_thresh {
                    self.matcher.refresh(frame, found);
                }
                self.coasted = 0;
                (corrected, score.clamp(0.0, 1.0))
            }
            None => {
                self.coasted += 1;
                if self.coasted > MAX_COAST_FRAMES {
                    return Err(TrackerError::TargetLost { confidence: 0.0 });
                }
                (predicted, 0.0)
            }
        };

        let roi = self.roi_from(&next);
        self.state = Some(next);
        Ok(TrackUpdate { roi, confidence })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::template_match::tests::frame_with_square;

    #[test]
    fn test_tracks_moving_square() {
        let mut tracker = KalmanTemplateTracker::default();
        assert!(tracker.initialize(
            &frame_with_square(120, 60, 10, 20, 0),
            Rect::new(8.0, 18.0, 16.0, 16.0)
        ));

        let mut last = Rect::default();
        for step in 1..=8 {
            let frame = frame_with_square(120, 60, 10 + 4 * step, 20, step as u64);
            last = tracker.update(&frame).unwrap().roi;
        }

        let (cx, cy) = last.center();
        // square center is at x = 10 + 32 + 6
        assert!((cx - 48.0).abs() < 2.0, "cx = {cx}");
        assert!((cy - 26.0).abs() < 2.0, "cy = {cy}");
    }

    #[test]
    fn test_update_before_initialize() {
        let mut tracker = KalmanTemplateTracker::default();
        let frame = frame_with_square(40, 40, 5, 5, 0);
        assert_eq!(tracker.update(&frame), Err(TrackerError::NotInitialized));
    }
}
