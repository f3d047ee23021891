//! Engine construction parameters.

use crate::capture::{ConfigError, FileConfig};
use crate::detection::{DetectionConfig, LaneConfig};

/// Everything needed to build a [`MotionCountingEngine`](super::MotionCountingEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Width of the frames the engine will receive.
    pub frame_width: u32,
    /// Height of the frames the engine will receive.
    pub frame_height: u32,
    /// Binarization level and default lane threshold.
    pub detection: DetectionConfig,
    /// Lanes in registration order.
    pub lanes: Vec<LaneConfig>,
}

impl EngineConfig {
    /// Creates a config with default detection settings and no lanes.
    pub fn new(frame_width: u32, frame_height: u32) -> Self {
        Self {
            frame_width,
            frame_height,
            detection: DetectionConfig::default(),
            lanes: Vec::new(),
        }
    }

    /// Adds a lane.
    pub fn with_lane(mut self, lane: LaneConfig) -> Self {
        self.lanes.push(lane);
        self
    }

    /// Sets the detection parameters.
    pub fn with_detection(mut self, detection: DetectionConfig) -> Self {
        self.detection = detection;
        self
    }
}

impl TryFrom<&FileConfig> for EngineConfig {
    type Error = ConfigError;

    /// Derives the engine settings, using post-scaling frame dimensions.
    fn try_from(file: &FileConfig) -> Result<Self, Self::Error> {
        let (frame_width, frame_height) = file.capture.frame_dimensions()?;
        Ok(Self {
            frame_width,
            frame_height,
            detection: file.detection.clone(),
            lanes: file.lanes.clone(),
        })
    }
}
