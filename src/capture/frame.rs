//! Frame type representing a captured grayscale image with metadata.

use std::time::Instant;

/// A single grayscale frame from a video source.
///
/// Pixels are stored row-major, one byte per pixel. Frames are
/// immutable once built; the engine only ever reads them.
#[derive(Clone)]
pub struct Frame {
    /// Row-major 8-bit intensity samples.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Capture timestamp.
    timestamp: Instant,
    /// Monotonic sequence number assigned by the source.
    sequence: u64,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Creates a frame where every pixel has the same intensity.
    pub fn filled(width: u32, height: u32, value: u8, sequence: u64) -> Self {
        let len = (width as usize) * (height as usize);
        Self::new(vec![value; len], width, height, sequence)
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == self.pixel_count()
    }

    /// Returns the intensity at `(x, y)`, or `None` outside the frame.
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize) * (self.width as usize) + x as usize;
        self.pixels.get(idx).copied()
    }

    /// Returns a copy of this frame with one pixel replaced.
    ///
    /// Out-of-range coordinates leave the copy unchanged.
    pub fn with_pixel(&self, x: u32, y: u32, value: u8) -> Self {
        let mut pixels = self.pixels.clone();
        if x < self.width && y < self.height {
            let idx = (y as usize) * (self.width as usize) + x as usize;
            if let Some(p) = pixels.get_mut(idx) {
                *p = value;
            }
        }
        Self::new(pixels, self.width, self.height, self.sequence)
    }

    /// Scales the frame to fit inside `target_width` x `target_height`,
    /// preserving the aspect ratio (nearest-neighbour sampling).
    ///
    /// Returns `None` if either the target or this frame has a zero
    /// dimension, or if the buffer does not match the dimensions.
    pub fn scaled_to_fit(&self, target_width: u32, target_height: u32) -> Option<Self> {
        if !self.is_valid() {
            return None;
        }
        let (new_width, new_height) =
            fit_dimensions(self.width, self.height, target_width, target_height)?;

        if (new_width, new_height) == (self.width, self.height) {
            return Some(self.clone());
        }

        let src_w = self.width as usize;
        let mut pixels = Vec::with_capacity((new_width as usize) * (new_height as usize));
        for y in 0..new_height {
            let sy = ((y as u64 * self.height as u64) / new_height as u64) as usize;
            for x in 0..new_width {
                let sx = ((x as u64 * self.width as u64) / new_width as u64) as usize;
                pixels.push(self.pixels[sy * src_w + sx]);
            }
        }

        Some(Self {
            pixels,
            width: new_width,
            height: new_height,
            timestamp: self.timestamp,
            sequence: self.sequence,
        })
    }
}

/// Computes the largest size with the source aspect ratio that fits the
/// target box.
///
/// Returns `None` for zero-sized inputs or when the result would collapse
/// to zero in either dimension.
pub fn fit_dimensions(
    width: u32,
    height: u32,
    target_width: u32,
    target_height: u32,
) -> Option<(u32, u32)> {
    if width == 0 || height == 0 || target_width == 0 || target_height == 0 {
        return None;
    }
    let scale_x = target_width as f64 / width as f64;
    let scale_y = target_height as f64 / height as f64;
    let scale = scale_x.min(scale_y);

    let new_width = (width as f64 * scale) as u32;
    let new_height = (height as f64 * scale) as u32;
    if new_width == 0 || new_height == 0 {
        return None;
    }
    Some((new_width, new_height))
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
