//! Temporal differencing of a frame stream into change maps.
//!
//! Holds the previous frame so each new frame can be compared against
//! its immediate predecessor.

use super::{ChangeMap, DetectionError};
use crate::capture::Frame;

/// Produces one [`ChangeMap`] per consecutive frame pair.
#[derive(Debug)]
pub struct FrameDifferencer {
    /// Previous frame for differencing.
    previous: Option<Frame>,
    /// Binarization level.
    intensity_delta: u8,
}

impl FrameDifferencer {
    /// Creates an unprimed differencer.
    pub fn new(intensity_delta: u8) -> Self {
        Self {
            previous: None,
            intensity_delta,
        }
    }

    /// Computes the change map against the previous frame.
    ///
    /// Returns `Ok(None)` on the first frame (no previous to compare).
    /// On a dimension mismatch the stored frame is left untouched.
    pub fn difference(&mut self, current: Frame) -> Result<Option<ChangeMap>, DetectionError> {
        let map = match self.previous.as_ref() {
            Some(prev) => Some(ChangeMap::compute(prev, &current, self.intensity_delta)?),
            None => None,
        };

        self.previous = Some(current);
        Ok(map)
    }

    /// Returns the stored previous frame, if any.
    pub fn previous(&self) -> Option<&Frame> {
        self.previous.as_ref()
    }

    /// Returns the binarization level.
    pub fn intensity_delta(&self) -> u8 {
        self.intensity_delta
    }

    /// Forgets the previous frame.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Returns true if ready to produce output.
    pub fn is_primed(&self) -> bool {
        self.previous.is_some()
    }
}

impl Default for FrameDifferencer {
    fn default() -> Self {
        Self::new(super::DEFAULT_INTENSITY_DELTA)
    }
}
