//! Binarized frame-to-frame difference.
//!
//! A pixel is "changed" when the absolute intensity difference between
//! two consecutive frames exceeds a fixed delta. Changed pixels carry the
//! value 255 and unchanged ones 0, so summing a region yields
//! `255 * changed_pixels`.

use super::{DetectionError, DetectionRegion};
use crate::capture::Frame;

/// Value stored for a changed pixel.
pub const CHANGED: u8 = 255;

/// Value stored for an unchanged pixel.
pub const UNCHANGED: u8 = 0;

/// Default binarization level on the 0-255 scale.
pub const DEFAULT_INTENSITY_DELTA: u8 = 30;

/// Binary map of changed pixels between two frames.
#[derive(Clone, PartialEq, Eq)]
pub struct ChangeMap {
    /// Row-major [`CHANGED`]/[`UNCHANGED`] values.
    values: Vec<u8>,
    width: u32,
    height: u32,
}

impl ChangeMap {
    /// Computes the change map between `previous` and `current`.
    ///
    /// `changed[x, y] = |current[x, y] - previous[x, y]| > intensity_delta`.
    pub fn compute(
        previous: &Frame,
        current: &Frame,
        intensity_delta: u8,
    ) -> Result<Self, DetectionError> {
        if previous.dimensions() != current.dimensions() {
            return Err(DetectionError::mismatch(
                previous.dimensions(),
                current.dimensions(),
            ));
        }
        for frame in [previous, current] {
            if !frame.is_valid() {
                return Err(DetectionError::MalformedFrame {
                    sequence: frame.sequence(),
                    width: frame.width(),
                    height: frame.height(),
                });
            }
        }

        let values = current
            .pixels()
            .iter()
            .zip(previous.pixels().iter())
            .map(|(&c, &p)| {
                if c.abs_diff(p) > intensity_delta {
                    CHANGED
                } else {
                    UNCHANGED
                }
            })
            .collect();

        Ok(Self {
            values,
            width: current.width(),
            height: current.height(),
        })
    }

    /// Returns the map width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the map height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the raw binarized values.
    #[inline]
    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Returns the stored value at `(x, y)`, or `None` outside the map.
    pub fn value(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values
            .get((y as usize) * (self.width as usize) + x as usize)
            .copied()
    }

    /// Returns true if the pixel at `(x, y)` changed.
    pub fn is_changed(&self, x: u32, y: u32) -> bool {
        self.value(x, y) == Some(CHANGED)
    }

    /// Number of changed pixels in the whole map.
    pub fn changed_count(&self) -> usize {
        self.values.iter().filter(|&&v| v == CHANGED).count()
    }

    /// Sum of the map values inside `region`.
    ///
    /// The part of the region outside the map contributes nothing.
    pub fn activity(&self, region: &DetectionRegion) -> u64 {
        // Clamp in u64 before narrowing so far-off edges cannot wrap
        let x0 = u64::from(region.x).min(u64::from(self.width)) as usize;
        let x1 = region.right().min(u64::from(self.width)) as usize;
        let y0 = u64::from(region.y).min(u64::from(self.height)) as usize;
        let y1 = region.bottom().min(u64::from(self.height)) as usize;
        let width = self.width as usize;

        (y0..y1)
            .map(|y| {
                let row = &self.values[y * width + x0..y * width + x1];
                row.iter().map(|&v| v as u64).sum::<u64>()
            })
            .sum()
    }
}

impl std::fmt::Debug for ChangeMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeMap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("changed", &self.changed_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_frames_unchanged() {
        let a = Frame::filled(8, 8, 100, 1);
        let b = Frame::filled(8, 8, 100, 2);

        let map = ChangeMap::compute(&a, &b, DEFAULT_INTENSITY_DELTA).unwrap();

        assert_eq!(map.changed_count(), 0);
        assert!(map.values().iter().all(|&v| v == UNCHANGED));
        assert_eq!(map.activity(&DetectionRegion::new(0, 0, 8, 8)), 0);
    }

    #[test]
    fn test_single_pixel_change() {
        let a = Frame::filled(4, 4, 100, 1);
        let b = a.with_pixel(1, 2, 150);

        let map = ChangeMap::compute(&a, &b, DEFAULT_INTENSITY_DELTA).unwrap();

        assert_eq!(map.changed_count(), 1);
        assert!(map.is_changed(1, 2));
        assert_eq!(map.activity(&DetectionRegion::new(0, 2, 2, 2)), 255);
        assert_eq!(map.activity(&DetectionRegion::new(2, 0, 2, 2)), 0);
    }

    #[test]
    fn test_delta_is_strict() {
        let a = Frame::filled(2, 1, 100, 1);
        // Exactly 30 is not a change, 31 is; direction does not matter
        let b = Frame::new(vec![130, 69], 2, 1, 2);

        let map = ChangeMap::compute(&a, &b, 30).unwrap();

        assert!(!map.is_changed(0, 0));
        assert!(map.is_changed(1, 0));
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = Frame::filled(4, 4, 0, 1);
        let b = Frame::filled(4, 5, 0, 2);

        assert_eq!(
            ChangeMap::compute(&a, &b, 30),
            Err(DetectionError::mismatch((4, 4), (4, 5)))
        );
    }

    #[test]
    fn test_malformed_frame_rejected() {
        let a = Frame::filled(4, 4, 0, 1);
        let b = Frame::new(vec![0; 3], 4, 4, 2);

        assert!(matches!(
            ChangeMap::compute(&a, &b, 30),
            Err(DetectionError::MalformedFrame { sequence: 2, .. })
        ));
    }

    #[test]
    fn test_activity_clips_to_map() {
        let a = Frame::filled(3, 3, 0, 1);
        let b = Frame::filled(3, 3, 255, 2);
        let map = ChangeMap::compute(&a, &b, 30).unwrap();

        // Only the 2x2 corner overlaps the map
        assert_eq!(map.activity(&DetectionRegion::new(1, 1, 5, 5)), 4 * 255);
    }

    #[test]
    fn test_activity_with_edges_past_u32() {
        let a = Frame::filled(3, 3, 0, 1);
        let b = Frame::filled(3, 3, 255, 2);
        let map = ChangeMap::compute(&a, &b, 30).unwrap();

        // right() and bottom() exceed u32::MAX here
        let region = DetectionRegion::new(2, 1, u32::MAX, u32::MAX);
        assert!(region.right() > u64::from(u32::MAX));
        assert_eq!(map.activity(&region), 2 * 255);

        let outside = DetectionRegion::new(u32::MAX, u32::MAX, u32::MAX, u32::MAX);
        assert_eq!(map.activity(&outside), 0);
    }
}
