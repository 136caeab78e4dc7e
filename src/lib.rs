//! Multi-ROI video tracking that turns object motion into time series.
//!
//! Draw regions of interest on a live or recorded video, track each one with
//! a pluggable single-object tracker and chart its center position over
//! time. Collected series can be exported as delimited text tables.

pub mod chart;
pub mod config;
pub mod error;
pub mod frame;
pub mod integration;
pub mod tracker;

pub use chart::{ChartRange, ExportConfig, RangeAggregator, SeriesPair, SeriesVisibility};
pub use config::{MissedUpdatePolicy, OverlayConfig, OverrunPolicy, PipelineConfig};
pub use error::{ConfigError, ExportError, FrameError, PipelineError, SourceError, TrackerError};
pub use frame::{Frame, LumaFrame, PixelFormat};
pub use integration::{
    FrameReport, FrameSample, FrameSequence, FrameSink, FrameSource, PipelineEvent, RoiDraft,
    Session, TrackingPipeline,
};
pub use tracker::{
    AlgorithmKind, InitPolicy, Rect, Registry, TrackUpdate, TrackedObject, TrackerAlgorithm,
};
