//! Motion detection and per-lane counting.
//!
//! Consecutive frames are differenced into a binary [`ChangeMap`]; each
//! [`LaneMonitor`] sums the map inside its [`DetectionRegion`] and turns
//! the resulting movement signal into discrete counts.

mod change_map;
mod config;
mod differencer;
mod lane;
mod region;

pub use change_map::{ChangeMap, CHANGED, DEFAULT_INTENSITY_DELTA, UNCHANGED};
pub use config::{DetectionConfig, LaneConfig, DEFAULT_MOVEMENT_THRESHOLD};
pub use differencer::FrameDifferencer;
pub use lane::{EvaluationResult, LaneId, LaneMonitor, LaneState};
pub use region::DetectionRegion;

use thiserror::Error;

/// Errors raised by the detection stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectionError {
    /// A frame does not have the engine's frame size.
    #[error("frame dimensions differ: expected {expected_width}x{expected_height}, got {actual_width}x{actual_height}")]
    DimensionMismatch {
        /// Configured width.
        expected_width: u32,
        /// Configured height.
        expected_height: u32,
        /// Width of the offending frame.
        actual_width: u32,
        /// Height of the offending frame.
        actual_height: u32,
    },

    /// A lane rectangle is empty or leaves the frame.
    #[error("invalid detection region {region}: {reason}")]
    InvalidRegion {
        /// The rejected rectangle.
        region: DetectionRegion,
        /// Short description of the problem.
        reason: &'static str,
    },

    /// The pixel buffer length disagrees with the frame dimensions.
    #[error("frame #{sequence} pixel buffer does not match its {width}x{height} dimensions")]
    MalformedFrame {
        /// Sequence number of the frame.
        sequence: u64,
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
    },
}

impl DetectionError {
    /// Builds a `DimensionMismatch` from two `(width, height)` pairs.
    pub fn mismatch(expected: (u32, u32), actual: (u32, u32)) -> Self {
        Self::DimensionMismatch {
            expected_width: expected.0,
            expected_height: expected.1,
            actual_width: actual.0,
            actual_height: actual.1,
        }
    }
}
