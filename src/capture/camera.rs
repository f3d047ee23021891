//! Live camera input via `nokhwa`.
//!
//! Frames are requested in luma format so no colour conversion is
//! needed before differencing.

use super::{CaptureConfig, Frame, FrameSource, SourceError};
use nokhwa::{
    pixel_format::LumaFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
    Camera,
};

/// Frame rate requested alongside the configured resolution.
const REQUESTED_FPS: u32 = 30;

/// Frame source backed by a local camera device.
pub struct CameraSource {
    camera: Option<Camera>,
    sequence: u64,
}

impl CameraSource {
    /// Creates a closed camera source.
    pub fn new() -> Self {
        Self {
            camera: None,
            sequence: 0,
        }
    }

    /// Opens the camera selected by `config.device_id` and starts streaming.
    ///
    /// The device is asked for `config.width` x `config.height`. If it
    /// settles on any other resolution the open fails, since every frame
    /// would otherwise be rejected by the engine.
    pub fn open(&mut self, config: &CaptureConfig) -> Result<(), SourceError> {
        let index = CameraIndex::Index(config.device_id);
        let format = CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::MJPEG,
            REQUESTED_FPS,
        );
        let requested = RequestedFormat::new::<LumaFormat>(RequestedFormatType::Closest(format));

        let mut camera =
            Camera::new(index, requested).map_err(|e| SourceError::OpenFailed(e.to_string()))?;

        let resolution = camera.resolution();
        check_resolution(
            (resolution.width(), resolution.height()),
            (config.width, config.height),
        )?;

        camera
            .open_stream()
            .map_err(|e| SourceError::OpenFailed(e.to_string()))?;

        tracing::info!(
            device = config.device_id,
            width = config.width,
            height = config.height,
            "Camera opened"
        );
        self.camera = Some(camera);
        self.sequence = 0;
        Ok(())
    }

    /// Checks if the camera is currently open.
    pub fn is_open(&self) -> bool {
        self.camera.is_some()
    }

    /// Stops streaming and releases the device.
    pub fn close(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                tracing::warn!(error = %e, "Failed to stop camera stream");
            }
            tracing::info!("Camera closed");
        }
    }
}

fn check_resolution(actual: (u32, u32), expected: (u32, u32)) -> Result<(), SourceError> {
    if actual == expected {
        return Ok(());
    }
    Err(SourceError::OpenFailed(format!(
        "camera delivers {}x{}, configured capture size is {}x{}",
        actual.0, actual.1, expected.0, expected.1
    )))
}

impl Default for CameraSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let camera = self.camera.as_mut().ok_or(SourceError::NotInitialized)?;

        let buffer = camera
            .frame()
            .map_err(|e| SourceError::CaptureFailed(e.to_string()))?;
        let image = buffer
            .decode_image::<LumaFormat>()
            .map_err(|e| SourceError::CaptureFailed(e.to_string()))?;

        let (width, height) = image.dimensions();
        self.sequence += 1;
        Ok(Some(Frame::new(image.into_raw(), width, height, self.sequence)))
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_frame_without_open() {
        let mut source = CameraSource::new();
        assert!(matches!(
            source.next_frame(),
            Err(SourceError::NotInitialized)
        ));
    }

    #[test]
    fn test_is_open_lifecycle() {
        let mut source = CameraSource::default();
        assert!(!source.is_open());

        // Closing a closed source is a no-op
        source.close();
        assert!(!source.is_open());
    }

    #[test]
    fn test_resolution_must_match_config() {
        assert!(check_resolution((1920, 1080), (1920, 1080)).is_ok());

        let err = check_resolution((640, 480), (1920, 1080)).unwrap_err();
        assert!(matches!(err, SourceError::OpenFailed(ref msg) if msg.contains("640x480")));
    }
}
