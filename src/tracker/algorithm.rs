//! Trait for single-object tracking algorithms.

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::frame::LumaFrame;
use crate::tracker::kalman_template::KalmanTemplateTracker;
use crate::tracker::mean_shift::MeanShiftTracker;
use crate::tracker::rect::Rect;
use crate::tracker::template_match::TemplateTracker;

/// Result of advancing a tracker by one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackUpdate {
    /// New region of interest in frame pixel coordinates
    pub roi: Rect,
    /// Algorithm-specific match quality in `[0, 1]`; advisory only
    pub confidence: f32,
}

/// A stateful single-object tracker.
///
/// Implement this trait to plug any tracking method into the registry.
///
/// # Example
///
/// ```ignore
/// use roitrack_rs::{LumaFrame, Rect, TrackUpdate, TrackerAlgorithm, TrackerError};
///
/// struct StaticTracker {
///     roi: Option<Rect>,
/// }
///
/// impl TrackerAlgorithm for StaticTracker {
///     fn initialize(&mut self, _frame: &LumaFrame, roi: Rect) -> bool {
///         self.roi = Some(roi);
///         true
///     }
///
///     fn update(&mut self, _frame: &LumaFrame) -> Result<TrackUpdate, TrackerError> {
///         let roi = self.roi.ok_or(TrackerError::NotInitialized)?;
///         Ok(TrackUpdate { roi, confidence: 1.0 })
///     }
/// }
/// ```
pub trait TrackerAlgorithm: Send {
    /// Learn the target inside `roi` on `frame`. Returns `false` when the
    /// region cannot be used (outside the frame, too small, flat texture).
    fn initialize(&mut self, frame: &LumaFrame, roi: Rect) -> bool;

    /// Locate the target on a new frame.
    fn update(&mut self, frame: &LumaFrame) -> Result<TrackUpdate, TrackerError>;
}

impl<T: TrackerAlgorithm + ?Sized> TrackerAlgorithm for Box<T> {
    fn initialize(&mut self, frame: &LumaFrame, roi: Rect) -> bool {
        (**self).initialize(frame, roi)
    }

    fn update(&mut self, frame: &LumaFrame) -> Result<TrackUpdate, TrackerError> {
        (**self).update(frame)
    }
}

/// The built-in algorithms selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlgorithmKind {
    /// Normalized cross-correlation against an adaptive template
    #[default]
    TemplateMatch,
    /// Template matching smoothed by a constant-velocity Kalman filter
    KalmanTemplate,
    /// Luminance histogram back-projection with mean-shift
    MeanShift,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 3] = [
        AlgorithmKind::TemplateMatch,
        AlgorithmKind::KalmanTemplate,
        AlgorithmKind::MeanShift,
    ];

    /// Create a fresh, uninitialized tracker of this kind.
    pub fn build(self) -> Box<dyn TrackerAlgorithm> {
        match self {
            AlgorithmKind::TemplateMatch => Box::new(TemplateTracker::default()),
            AlgorithmKind::KalmanTemplate => Box::new(KalmanTemplateTracker::default()),
            AlgorithmKind::MeanShift => Box::new(MeanShiftTracker::default()),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AlgorithmKind::TemplateMatch => "template-match",
            AlgorithmKind::KalmanTemplate => "kalman-template",
            AlgorithmKind::MeanShift => "mean-shift",
        }
    }
}

impl std::fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
