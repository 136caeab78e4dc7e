//! One tracked region of interest and its motion history.

use serde::{Deserialize, Serialize};

use crate::chart::SeriesPair;
use crate::error::TrackerError;
use crate::frame::LumaFrame;
use crate::tracker::algorithm::TrackerAlgorithm;
use crate::tracker::rect::Rect;

/// What to do when a tracker's first `initialize` call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InitPolicy {
    /// Mark the object initialized anyway and keep going; later updates on
    /// a bad region usually report errors and hold the last position.
    #[default]
    OptimisticContinue,
    /// Leave the object uninitialized and try again on the next frame.
    RetryUntilSuccess,
}

/// Outcome of the most recent `initialize` call on an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Succeeded,
    Failed,
}

/// A tracked object: algorithm instance, current ROI, and its series.
pub struct TrackedObject {
    /// Identifier unique within the owning registry; unlike the index it
    /// never shifts when an earlier object is removed.
    pub id: u64,
    /// Current region in frame pixel coordinates
    pub roi: Rect,
    /// False until the first `initialize` call has been accepted
    pub initialized: bool,
    /// Result of the last `initialize` call, if any
    pub last_init: Option<InitOutcome>,
    /// Advisory confidence reported by the last successful update
    pub confidence: Option<f32>,
    pub series: SeriesPair,
    tracker: Box<dyn TrackerAlgorithm>,
}

impl std::fmt::Debug for TrackedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedObject")
            .field("id", &self.id)
            .field("roi", &self.roi)
            .field("initialized", &self.initialized)
            .field("last_init", &self.last_init)
            .field("samples", &self.series.len())
            .finish_non_exhaustive()
    }
}

impl TrackedObject {
    pub fn new(id: u64, roi: Rect, tracker: Box<dyn TrackerAlgorithm>) -> Self {
        Self {
            id,
            roi,
            initialized: false,
            last_init: None,
            confidence: None,
            series: SeriesPair::new(),
            tracker,
        }
    }

    /// Run one tracking step on `frame` and return the ROI to sample.
    ///
    /// An uninitialized object calls `initialize` on the frame and never
    /// `update`. Errors leave `roi` untouched.
    pub fn advance(&mut self, frame: &LumaFrame, policy: InitPolicy) -> Result<Rect, TrackerError> {
        if !self.initialized {
            let ok = self.tracker.initialize(frame, self.roi);
            self.last_init = Some(if ok {
                InitOutcome::Succeeded
            } else {
                InitOutcome::Failed
            });

            self.initialized = match policy {
                InitPolicy::OptimisticContinue => true,
                InitPolicy::RetryUntilSuccess => ok,
            };

            return if self.initialized {
                Ok(self.roi)
            } else {
                Err(TrackerError::NotInitialized)
            };
        }

        let update = self.tracker.update(frame)?;
        self.roi = update.roi;
        self.confidence = Some(update.confidence);
        Ok(self.roi)
    }
}
