//! Video input and frame handling.
//!
//! This module provides the [`FrameSource`] abstraction the counting
//! engine pulls from, the [`Frame`] type, and configuration loading.
//! Decoding of compressed video is left to external tools; sources here
//! consume raw grayscale data.

#[cfg(feature = "camera")]
mod camera;
mod config;
mod frame;
mod source;

#[cfg(feature = "camera")]
pub use camera::CameraSource;
pub use config::{CaptureConfig, ConfigError, FileConfig, OutputConfig};
pub use frame::{fit_dimensions, Frame};
pub use source::{
    FrameSource, RawVideoSource, ScaledSource, ScriptedSource, SourceError, SyntheticSource,
    SyntheticVehicle,
};
