//! Packed pixel buffers and their formats

mod format;
mod palette;

pub use format::{PixelFormat, Rgb};
pub use palette::Palette;

use crate::error::{Error, Result};

// ============================================================================
// Clip Rectangle
// ============================================================================

/// Inclusive integer rectangle in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClipRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ClipRect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Rectangle covering `width` x `height` pixels starting at (left, top)
    pub const fn with_size(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            right: left + width as i32 - 1,
            bottom: top + height as i32 - 1,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.right >= self.left && self.bottom >= self.top
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.right - self.left + 1
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.bottom - self.top + 1
    }

    /// Overlap of two rectangles; check `is_valid` on the result
    pub fn intersect(&self, other: &ClipRect) -> ClipRect {
        ClipRect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> ClipRect {
        ClipRect {
            left: self.left + dx,
            top: self.top + dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

// ============================================================================
// PixelBuffer
// ============================================================================

/// Packed pixel buffer with an explicit row stride
///
/// Row `y` starts at `y * bytes_per_row`; the bytes past
/// `format.min_bytes_per_row(width)` in each row are padding and are never
/// read or written by pixel operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    bytes_per_row: usize,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a zeroed buffer with rows padded to four bytes
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let bytes_per_row = format.padded_bytes_per_row(width);
        Self {
            width,
            height,
            bytes_per_row,
            format,
            pixels: vec![0; bytes_per_row * height as usize],
        }
    }

    /// Wrap existing pixel memory, validating the stride
    pub fn from_raw(
        width: u32,
        height: u32,
        bytes_per_row: usize,
        format: PixelFormat,
        pixels: Vec<u8>,
    ) -> Result<Self> {
        let min_row = format.min_bytes_per_row(width);
        if bytes_per_row < min_row {
            return Err(Error::invalid(format!(
                "bytes_per_row {} is shorter than {} needed for {} {:?} pixels",
                bytes_per_row, min_row, width, format
            )));
        }
        let needed = bytes_per_row * height as usize;
        if pixels.len() < needed {
            return Err(Error::invalid(format!(
                "pixel data holds {} bytes, {}x{} needs {}",
                pixels.len(),
                bytes_per_row,
                height,
                needed
            )));
        }
        Ok(Self { width, height, bytes_per_row, format, pixels })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn same_size(&self, other: &PixelBuffer) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Bounds rectangle at the origin
    pub fn bounds(&self) -> ClipRect {
        ClipRect::with_size(0, 0, self.width, self.height)
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32
    }

    /// Bytes of row `y` (without padding)
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.bytes_per_row;
        &self.pixels[start..start + self.format.min_bytes_per_row(self.width)]
    }

    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.bytes_per_row;
        let len = self.format.min_bytes_per_row(self.width);
        &mut self.pixels[start..start + len]
    }

    /// Read a pixel (bounds checked)
    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Rgb> {
        if self.in_bounds(x, y) {
            Some(self.format.read(self.row(y as u32), x as u32))
        } else {
            None
        }
    }

    /// Write a pixel (bounds checked)
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, c: Rgb) {
        if self.in_bounds(x, y) {
            let format = self.format;
            format.write(self.row_mut(y as u32), x as u32, c);
        }
    }

    /// Fill every pixel with one color
    pub fn clear(&mut self, c: Rgb) {
        let format = self.format;
        let width = self.width;
        for y in 0..self.height {
            let row = self.row_mut(y);
            for x in 0..width {
                format.write(row, x, c);
            }
        }
    }

    /// Copy into a new buffer of `format`, re-encoding every pixel
    pub fn convert(&self, format: PixelFormat) -> PixelBuffer {
        if format == self.format {
            return self.clone();
        }
        let mut out = PixelBuffer::new(self.width, self.height, format);
        for y in 0..self.height {
            let src = self.row(y);
            let dst = out.row_mut(y);
            for x in 0..self.width {
                format.write(dst, x, self.format.read(src, x));
            }
        }
        out
    }

    /// Decode the buffer into a row-major `Rgb` plane
    pub fn to_rgb_plane(&self) -> Vec<Rgb> {
        let mut plane = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height {
            let row = self.row(y);
            plane.extend((0..self.width).map(|x| self.format.read(row, x)));
        }
        plane
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}
