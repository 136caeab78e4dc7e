mod algorithm;
mod kalman_filter;
mod kalman_template;
mod mean_shift;
mod rect;
mod registry;
mod template_match;
pub(crate) mod tracked_object;

pub use algorithm::{AlgorithmKind, TrackUpdate, TrackerAlgorithm};
pub use kalman_filter::{KalmanFilter, KalmanState};
pub use kalman_template::KalmanTemplateTracker;
pub use mean_shift::MeanShiftTracker;
pub use rect::Rect;
pub use registry::{Registry, Removed};
pub use template_match::{TemplateConfig, TemplateTracker};
pub use tracked_object::{InitOutcome, InitPolicy, TrackedObject};
