//! Integration of frame sources, trackers and charts into one pipeline.
//!
//! Sources push frames into a [`FrameSink`]; a [`TrackingPipeline`] runs
//! every tracker on each frame, appends samples to the chart series and
//! notifies subscribers.

mod clock;
mod draft;
mod overlay;
mod pipeline;
mod source;

pub use clock::{PipelineClock, elapsed};
pub use draft::RoiDraft;
pub use overlay::{FpsCounter, Overlay, OverlayRoi};
pub use pipeline::{FrameReport, FrameSample, PipelineEvent, Session, TrackingPipeline};
pub use source::{FrameSequence, FrameSink, FrameSource};
