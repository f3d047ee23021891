//! Detection parameters and lane definitions.

use super::{DetectionRegion, DEFAULT_INTENSITY_DELTA};
use serde::{Deserialize, Serialize};

/// Default movement threshold in summed change-map units.
pub const DEFAULT_MOVEMENT_THRESHOLD: u64 = 5000;

/// Global detection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum absolute intensity difference (exclusive) for a pixel to
    /// count as changed.
    pub intensity_delta: u8,
    /// Lane activity must exceed this to register movement.
    pub movement_threshold: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            intensity_delta: DEFAULT_INTENSITY_DELTA,
            movement_threshold: DEFAULT_MOVEMENT_THRESHOLD,
        }
    }
}

/// One monitored lane as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneConfig {
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Per-lane override of [`DetectionConfig::movement_threshold`].
    #[serde(default)]
    pub threshold: Option<u64>,
}

impl LaneConfig {
    /// Creates an unnamed lane using the global threshold.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            name: None,
            x,
            y,
            width,
            height,
            threshold: None,
        }
    }

    /// Returns the lane rectangle.
    pub fn region(&self) -> DetectionRegion {
        DetectionRegion::new(self.x, self.y, self.width, self.height)
    }

    /// Returns the effective threshold given the global detection settings.
    pub fn effective_threshold(&self, detection: &DetectionConfig) -> u64 {
        self.threshold.unwrap_or(detection.movement_threshold)
    }
}

impl Default for LaneConfig {
    /// A single lane box sized for 1920x1080 footage.
    fn default() -> Self {
        Self {
            name: Some("lane-1".to_string()),
            ..Self::new(570, 650, 200, 20)
        }
    }
}
