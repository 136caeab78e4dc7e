//! Error types shared across the crate.

use thiserror::Error;

/// Reasons a delivered frame is rejected before any tracker sees it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame has zero width or height ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("frame dimensions {width}x{height} do not fit in memory")]
    TooLarge { width: u32, height: u32 },
    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
    #[error("frame is {got:?}, session was initialized at {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        got: (u32, u32),
    },
}

/// Per-object failures reported by a tracking algorithm.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    #[error("tracker used before a successful initialize")]
    NotInitialized,
    #[error("target lost (confidence {confidence:.3})")]
    TargetLost { confidence: f32 },
    #[error("region of interest is degenerate after clipping to the frame")]
    DegenerateRoi,
    #[error("tracker panicked: {0}")]
    Panicked(String),
}

/// Failure raised by a frame source (device unreadable, decode error, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("frame source failed: {0}")]
pub struct SourceError(pub String);

impl SourceError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write or read table: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed table at line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("failed to spawn the frame processing thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
