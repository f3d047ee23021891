//! Capture and application configuration.
//!
//! Everything the counter needs is loaded once into a [`FileConfig`] and
//! handed explicitly to the engine; nothing reads configuration lazily.

use super::frame::fit_dimensions;
use crate::detection::{DetectionConfig, DetectionError, LaneConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the frame source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera device index (camera input only).
    pub device_id: u32,
    /// Width of incoming frames in pixels.
    pub width: u32,
    /// Height of incoming frames in pixels.
    pub height: u32,
    /// Optional box incoming frames are scaled to fit, aspect preserved.
    pub target_width: Option<u32>,
    /// See `target_width`; both or neither must be set.
    pub target_height: Option<u32>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: 1920,
            height: 1080,
            target_width: None,
            target_height: None,
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Returns the scale-to-fit box, if configured.
    pub fn target(&self) -> Option<(u32, u32)> {
        self.target_width.zip(self.target_height)
    }

    /// Dimensions of the frames the engine will see, after scaling.
    pub fn frame_dimensions(&self) -> Result<(u32, u32), ConfigError> {
        self.validate()?;
        match self.target() {
            Some((tw, th)) => {
                fit_dimensions(self.width, self.height, tw, th).ok_or(ConfigError::InvalidTarget)
            }
            None => Ok((self.width, self.height)),
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        match (self.target_width, self.target_height) {
            (None, None) => Ok(()),
            (Some(w), Some(h)) if w > 0 && h > 0 => Ok(()),
            _ => Err(ConfigError::InvalidTarget),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Width or height is zero.
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    /// Only one of the target sizes is set, or one is zero.
    #[error("invalid scale target (width and height must both be positive)")]
    InvalidTarget,
    /// A configured lane does not fit the frame.
    #[error("lane {index} is invalid: {source}")]
    InvalidLane {
        /// Position of the lane in the file.
        index: usize,
        /// What is wrong with it.
        #[source]
        source: DetectionError,
    },
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Frame source settings.
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Binarization level and default lane threshold.
    #[serde(default)]
    pub detection: DetectionConfig,
    /// Monitored lanes in registration order.
    #[serde(default = "default_lanes")]
    pub lanes: Vec<LaneConfig>,
    /// Reporting settings.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_lanes() -> Vec<LaneConfig> {
    vec![LaneConfig::default()]
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            detection: DetectionConfig::default(),
            lanes: default_lanes(),
            output: OutputConfig::default(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
    /// Log every lane result at info level, not only counted vehicles.
    pub log_every_frame: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            metrics_port: 0,
            log_every_frame: false,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks capture settings and that every lane fits the effective frame.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (width, height) = self.capture.frame_dimensions()?;
        for (index, lane) in self.lanes.iter().enumerate() {
            lane.region()
                .validate_within(width, height)
                .map_err(|source| ConfigError::InvalidLane { index, source })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lanes.len(), 1);
        assert_eq!(config.capture.frame_dimensions().unwrap(), (1920, 1080));
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = CaptureConfig::default();
        config.width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_half_specified_target_invalid() {
        let config = CaptureConfig {
            target_width: Some(1920),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTarget)));
    }

    #[test]
    fn test_target_changes_frame_dimensions() {
        let config = CaptureConfig {
            width: 640,
            height: 480,
            target_width: Some(1920),
            target_height: Some(1080),
            ..Default::default()
        };
        assert_eq!(config.frame_dimensions().unwrap(), (1440, 1080));
    }

    #[test]
    fn test_parse_toml() {
        let config = FileConfig::from_toml(
            r#"
            [capture]
            width = 320
            height = 240

            [detection]
            movement_threshold = 1200

            [[lanes]]
            name = "northbound"
            x = 10
            y = 200
            width = 100
            height = 20

            [[lanes]]
            x = 150
            y = 200
            width = 100
            height = 20
            threshold = 2000
            "#,
        )
        .unwrap();

        assert_eq!(config.detection.intensity_delta, 30);
        assert_eq!(config.detection.movement_threshold, 1200);
        assert_eq!(config.lanes.len(), 2);
        assert_eq!(config.lanes[0].name.as_deref(), Some("northbound"));
        assert_eq!(config.lanes[1].threshold, Some(2000));
        assert_eq!(config.output.metrics_port, 0);
    }

    #[test]
    fn test_lane_outside_frame_rejected() {
        let result = FileConfig::from_toml(
            r#"
            [capture]
            width = 320
            height = 240

            [[lanes]]
            x = 300
            y = 0
            width = 100
            height = 20
            "#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidLane { index: 0, .. })
        ));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            FileConfig::from_toml("[capture]\nwidth = \"wide\""),
            Err(ConfigError::ParseError(_))
        ));
    }
}
