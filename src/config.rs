//! Pipeline configuration, loadable from JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chart::{ExportConfig, SeriesVisibility};
use crate::error::ConfigError;
use crate::tracker::{AlgorithmKind, InitPolicy};

/// What happens when frames arrive faster than they are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverrunPolicy {
    /// Keep only the newest pending frame; older pending frames are dropped.
    #[default]
    DropStale,
    /// Queue up to `depth` frames and block the source when the queue is full.
    Queue { depth: usize },
}

/// What an object contributes on a frame where its tracker reports an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissedUpdatePolicy {
    /// Sample the last known ROI again, so every series advances on every
    /// frame and export rows stay aligned.
    #[default]
    HoldLast,
    /// Append nothing for that object on that frame.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub show_fps: bool,
    pub show_timestamp: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            show_fps: true,
            show_timestamp: true,
        }
    }
}

/// Configuration for the tracking pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Algorithm used for ROIs created from now on
    pub algorithm: AlgorithmKind,
    /// Maximum samples kept per series
    pub capacity: usize,
    /// Measure y upwards from the bottom edge of the frame
    pub flip_vertical: bool,
    /// Source timestamp units per emitted time unit (1e9: ns to s)
    pub time_divisor: f64,
    pub visibility: SeriesVisibility,
    pub init_policy: InitPolicy,
    pub missed_update: MissedUpdatePolicy,
    pub overrun: OverrunPolicy,
    pub export: ExportConfig,
    pub overlay: OverlayConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmKind::default(),
            capacity: 300,
            flip_vertical: true,
            time_divisor: 1e9,
            visibility: SeriesVisibility::default(),
            init_policy: InitPolicy::default(),
            missed_update: MissedUpdatePolicy::default(),
            overrun: OverrunPolicy::default(),
            export: ExportConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        validate_time_divisor(self.time_divisor)?;
        if let OverrunPolicy::Queue { depth: 0 } = self.overrun {
            return Err(ConfigError::Invalid {
                field: "overrun.depth",
                reason: "queue depth must be greater than zero".to_string(),
            });
        }
        self.export.validate()
    }

    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Load `path` if it exists, otherwise write the defaults there.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!(path = %path.display(), "config saved");
        Ok(())
    }
}

pub(crate) fn validate_time_divisor(divisor: f64) -> Result<(), ConfigError> {
    if divisor.is_finite() && divisor > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field: "time_divisor",
            reason: format!("{divisor} is not a positive finite number"),
        })
    }
}
