//! The motion counting engine.
//!
//! Pulls frames from a [`FrameSource`](crate::capture::FrameSource),
//! differences consecutive frames and drives every registered lane.
//! Per-frame results go to [`FrameObserver`]s so rendering, storage and
//! metrics stay out of the counting loop.

mod cancel;
mod config;
mod counting;
mod observer;

pub use cancel::CancellationFlag;
pub use config::EngineConfig;
pub use counting::{
    EngineState, FrameOutcome, LaneSummary, MotionCountingEngine, RunSummary, StopReason,
};
pub use observer::{FrameObserver, FrameRecord, LoggingObserver, RecordingObserver};

use crate::capture::SourceError;
use crate::detection::DetectionError;
use thiserror::Error;

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Frame or lane validation failed.
    #[error(transparent)]
    Detection(#[from] DetectionError),

    /// The frame source reported an error.
    #[error("frame source failed: {0}")]
    Source(#[from] SourceError),

    /// A lane was added after the first frame.
    #[error("lanes must be registered before the first frame")]
    RegistrationClosed,
}

impl EngineError {
    /// Returns true for the fatal mid-stream resolution change.
    pub fn is_dimension_mismatch(&self) -> bool {
        matches!(
            self,
            EngineError::Detection(DetectionError::DimensionMismatch { .. })
        )
    }

    /// Returns true for a rejected lane region.
    pub fn is_invalid_region(&self) -> bool {
        matches!(
            self,
            EngineError::Detection(DetectionError::InvalidRegion { .. })
        )
    }
}
