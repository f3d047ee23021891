//! Frame source abstraction.
//!
//! The counting engine pulls frames one at a time through [`FrameSource`].
//! Implementations here cover raw grayscale streams, in-memory replays,
//! a synthetic traffic generator and a scaling adapter.

use super::Frame;
use crate::detection::DetectionRegion;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use thiserror::Error;

/// Errors that can occur while acquiring frames.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The device or stream could not be opened.
    #[error("failed to open source: {0}")]
    OpenFailed(String),
    /// A frame could not be read or decoded.
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    /// The stream ended partway through a frame.
    #[error("stream ended mid-frame: expected {expected} bytes, got {got}")]
    TruncatedFrame {
        /// Bytes in a full frame.
        expected: usize,
        /// Bytes read before the stream ended.
        got: usize,
    },
    /// Frames were requested before the source was opened.
    #[error("source not initialized")]
    NotInitialized,
    /// Reading the underlying stream failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ordered supply of grayscale frames.
pub trait FrameSource {
    /// Blocks until the next frame is available.
    ///
    /// Returns `Ok(None)` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        (**self).next_frame()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        (**self).next_frame()
    }
}

/// Reads back-to-back raw 8-bit grayscale frames of a fixed size.
///
/// This is the format produced by e.g.
/// `ffmpeg -i video.mp4 -f rawvideo -pix_fmt gray -`.
pub struct RawVideoSource<R> {
    reader: R,
    width: u32,
    height: u32,
    sequence: u64,
}

impl<R: Read> RawVideoSource<R> {
    /// Reads `width * height` byte frames from `reader`.
    pub fn new(reader: R, width: u32, height: u32) -> Self {
        Self {
            reader,
            width,
            height,
            sequence: 0,
        }
    }

    fn frame_len(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

impl<R: Read> FrameSource for RawVideoSource<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let expected = self.frame_len();
        let mut pixels = vec![0u8; expected];
        let mut filled = 0;

        while filled < expected {
            match self.reader.read(&mut pixels[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled == 0 && expected > 0 {
            tracing::debug!(frames = self.sequence, "Raw video stream ended");
            return Ok(None);
        }
        if filled < expected {
            return Err(SourceError::TruncatedFrame {
                expected,
                got: filled,
            });
        }

        self.sequence += 1;
        Ok(Some(Frame::new(pixels, self.width, self.height, self.sequence)))
    }
}

/// Replays a fixed list of frames, then ends.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    frames: VecDeque<Frame>,
}

impl ScriptedSource {
    /// Yields `frames` in order, then ends.
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Frames not yet handed out.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        Ok(self.frames.pop_front())
    }
}

/// A block that travels down the frame in a fixed column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticVehicle {
    /// Left edge of the column.
    pub x: u32,
    /// Column width.
    pub width: u32,
    /// Vehicle length in rows.
    pub length: u32,
    /// Rows travelled per frame.
    pub speed: u32,
    /// Frame index at which the first pass starts.
    pub first_frame: u64,
    /// Frames between the starts of two passes.
    pub period: u64,
}

impl SyntheticVehicle {
    /// A vehicle that drives through `region` once per period.
    ///
    /// The period leaves a gap of a few frames between passes so each
    /// pass is a separate movement event.
    pub fn through(region: &DetectionRegion, frame_height: u32, first_frame: u64) -> Self {
        let speed = 10;
        let length = (region.height * 3).max(30);
        let travel = (frame_height as u64 + length as u64) / speed as u64 + 1;
        Self {
            x: region.x,
            width: region.width,
            length,
            speed,
            first_frame,
            period: travel + 5,
        }
    }

    /// Top row of the vehicle at `frame`, or `None` before its first pass.
    fn top_at(&self, frame: u64) -> Option<i64> {
        if frame < self.first_frame || self.period == 0 {
            return None;
        }
        let t = (frame - self.first_frame) % self.period;
        Some(t as i64 * self.speed as i64 - self.length as i64)
    }

    /// Body intensity for a row offset inside the vehicle.
    ///
    /// Shifting by `speed` rows changes the value by exactly 50, so every
    /// covered pixel changes between frames while the vehicle moves.
    fn shade(&self, offset: u32) -> u8 {
        let speed = self.speed.max(1) as u64;
        (150 + (offset as u64 * 50 / speed) % 100) as u8
    }
}

/// Generates a static textured background with vehicles driving through it.
///
/// Deterministic: the same parameters always yield the same frames.
#[derive(Debug)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    vehicles: Vec<SyntheticVehicle>,
    total_frames: u64,
    sequence: u64,
}

impl SyntheticSource {
    /// An empty road of `total_frames` frames; add vehicles with
    /// [`with_vehicle`](Self::with_vehicle).
    pub fn new(width: u32, height: u32, total_frames: u64) -> Self {
        Self {
            width,
            height,
            vehicles: Vec::new(),
            total_frames,
            sequence: 0,
        }
    }

    /// Adds a vehicle to the scene.
    pub fn with_vehicle(mut self, vehicle: SyntheticVehicle) -> Self {
        self.vehicles.push(vehicle);
        self
    }

    /// Builds a scene with one recurring vehicle per region, staggered so
    /// lanes do not move in lockstep.
    pub fn for_regions(
        width: u32,
        height: u32,
        regions: &[DetectionRegion],
        total_frames: u64,
    ) -> Self {
        regions
            .iter()
            .enumerate()
            .fold(Self::new(width, height, total_frames), |source, (i, region)| {
                source.with_vehicle(SyntheticVehicle::through(region, height, 1 + 7 * i as u64))
            })
    }

    fn background(x: u32, y: u32) -> u8 {
        90 + ((x * 7 + y * 13) % 16) as u8
    }

    fn render(&self, index: u64) -> Vec<u8> {
        let width = self.width as usize;
        let mut pixels: Vec<u8> = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| Self::background(x, y)))
            .collect();

        for vehicle in &self.vehicles {
            let Some(top) = vehicle.top_at(index) else {
                continue;
            };
            let x0 = vehicle.x.min(self.width) as usize;
            let x1 = (vehicle.x as u64 + vehicle.width as u64).min(self.width as u64) as usize;

            for offset in 0..vehicle.length {
                let y = top + offset as i64;
                if y < 0 || y >= self.height as i64 {
                    continue;
                }
                let shade = vehicle.shade(offset);
                let row = y as usize * width;
                pixels[row + x0..row + x1].fill(shade);
            }
        }

        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if self.sequence >= self.total_frames {
            return Ok(None);
        }
        let pixels = self.render(self.sequence);
        self.sequence += 1;
        Ok(Some(Frame::new(pixels, self.width, self.height, self.sequence)))
    }
}

/// Scales every frame of the inner source to fit a target box.
pub struct ScaledSource<S> {
    inner: S,
    target_width: u32,
    target_height: u32,
}

impl<S: FrameSource> ScaledSource<S> {
    /// Scales every frame of `inner` to fit the target box.
    pub fn new(inner: S, target_width: u32, target_height: u32) -> Self {
        Self {
            inner,
            target_width,
            target_height,
        }
    }

    /// Consumes the adapter and returns the wrapped source.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: FrameSource> FrameSource for ScaledSource<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(frame) = self.inner.next_frame()? else {
            return Ok(None);
        };
        frame
            .scaled_to_fit(self.target_width, self.target_height)
            .map(Some)
            .ok_or_else(|| {
                SourceError::CaptureFailed(format!(
                    "cannot scale {}x{} frame #{} to fit {}x{}",
                    frame.width(),
                    frame.height(),
                    frame.sequence(),
                    self.target_width,
                    self.target_height
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_raw_source_reads_frames_then_ends() {
        let bytes: Vec<u8> = (0..24).collect();
        let mut source = RawVideoSource::new(Cursor::new(bytes), 4, 3);

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.sequence(), 1);
        assert_eq!(first.get(0, 0), Some(0));

        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.get(3, 2), Some(23));

        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_raw_source_truncated_frame() {
        let mut source = RawVideoSource::new(Cursor::new(vec![0u8; 10]), 4, 3);
        assert!(matches!(
            source.next_frame(),
            Err(SourceError::TruncatedFrame {
                expected: 12,
                got: 10
            })
        ));
    }

    #[test]
    fn test_scripted_source_order() {
        let mut source = ScriptedSource::new((1..=3).map(|i| Frame::filled(2, 2, 0, i)));
        assert_eq!(source.remaining(), 3);

        let seqs: Vec<u64> = std::iter::from_fn(|| source.next_frame().unwrap())
            .map(|f| f.sequence())
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_synthetic_source_is_deterministic() {
        let region = DetectionRegion::new(10, 40, 20, 5);
        let mut a = SyntheticSource::for_regions(64, 64, &[region], 12);
        let mut b = SyntheticSource::for_regions(64, 64, &[region], 12);

        for _ in 0..12 {
            let fa = a.next_frame().unwrap().unwrap();
            let fb = b.next_frame().unwrap().unwrap();
            assert!(fa.is_valid());
            assert_eq!(fa.pixels(), fb.pixels());
        }
        assert!(a.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_synthetic_vehicle_shade_steps_by_fifty() {
        let vehicle = SyntheticVehicle::through(&DetectionRegion::new(0, 0, 4, 4), 100, 0);
        for offset in 0..vehicle.length - vehicle.speed {
            let a = vehicle.shade(offset);
            let b = vehicle.shade(offset + vehicle.speed);
            assert_eq!(a.abs_diff(b), 50);
        }
    }

    #[test]
    fn test_scaled_source() {
        let inner = ScriptedSource::new(vec![Frame::filled(2, 1, 7, 1)]);
        let mut source = ScaledSource::new(inner, 8, 8);

        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.dimensions(), (8, 4));
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_scaled_source_invalid_target() {
        let inner = ScriptedSource::new(vec![Frame::filled(2, 1, 7, 1)]);
        let mut source = ScaledSource::new(inner, 0, 8);
        assert!(matches!(
            source.next_frame(),
            Err(SourceError::CaptureFailed(_))
        ));
    }
}
