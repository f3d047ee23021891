//! Rectangular detection regions.

use super::DetectionError;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetectionRegion {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl DetectionRegion {
    /// Creates a region. No validation happens here; see [`Self::validate`].
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Number of pixels covered.
    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Returns true if `(x, y)` lies inside the region.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && (x as u64) < self.right() && y >= self.y && (y as u64) < self.bottom()
    }

    /// Returns true if the two regions share at least one pixel.
    pub fn overlaps(&self, other: &DetectionRegion) -> bool {
        (self.x as u64) < other.right()
            && (other.x as u64) < self.right()
            && (self.y as u64) < other.bottom()
            && (other.y as u64) < self.bottom()
    }

    /// Rejects regions that cover no pixels.
    pub fn validate(&self) -> Result<(), DetectionError> {
        if self.width == 0 || self.height == 0 {
            return Err(DetectionError::InvalidRegion {
                region: *self,
                reason: "region has zero area",
            });
        }
        Ok(())
    }

    /// Rejects degenerate regions and regions that extend past the frame.
    pub fn validate_within(&self, frame_width: u32, frame_height: u32) -> Result<(), DetectionError> {
        self.validate()?;
        if self.right() > frame_width as u64 || self.bottom() > frame_height as u64 {
            return Err(DetectionError::InvalidRegion {
                region: *self,
                reason: "region extends past the frame bounds",
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for DetectionRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}) {}x{}", self.x, self.y, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_area_rejected() {
        let region = DetectionRegion::new(0, 0, 0, 0);
        assert!(matches!(
            region.validate(),
            Err(DetectionError::InvalidRegion { .. })
        ));

        let flat = DetectionRegion::new(5, 5, 10, 0);
        assert!(flat.validate().is_err());
    }

    #[test]
    fn test_bounds_check() {
        let region = DetectionRegion::new(570, 650, 200, 20);
        assert!(region.validate_within(1920, 1080).is_ok());
        assert!(region.validate_within(640, 480).is_err());

        // Touching the edge is still inside
        let edge = DetectionRegion::new(2, 2, 2, 2);
        assert!(edge.validate_within(4, 4).is_ok());
        assert!(edge.validate_within(3, 4).is_err());
    }

    #[test]
    fn test_no_overflow_near_u32_max() {
        let region = DetectionRegion::new(u32::MAX, 0, 10, 1);
        assert!(region.validate_within(u32::MAX, 10).is_err());
    }

    #[test]
    fn test_contains_and_overlap() {
        let a = DetectionRegion::new(0, 0, 2, 2);
        let b = DetectionRegion::new(1, 1, 2, 2);
        let c = DetectionRegion::new(2, 0, 2, 2);

        assert!(a.contains(1, 1));
        assert!(!a.contains(2, 1));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
