use serde::{Deserialize, Serialize};

use super::palette::Palette;

// ============================================================================
// Rgb
// ============================================================================

/// 8-bit per channel color, the unit every format decodes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn gray(v: u8) -> Self {
        Self { r: v, g: v, b: v }
    }

    /// Plain channel average, used for Gray8 and Mono1 encoding
    #[inline]
    pub fn luminance(self) -> u8 {
        ((self.r as u16 + self.g as u16 + self.b as u16) / 3) as u8
    }
}

// ============================================================================
// Pixel Format
// ============================================================================

/// Memory layout of one pixel.
///
/// 32-bit little-endian formats store a `0xAARRGGBB` word, so the bytes are
/// `[B, G, R, A]`; the big-endian variants store the same word byte-swapped.
/// 15/16-bit formats pack `r5 g6 b5` / `a1 r5 g5 b5` into a u16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Rgb32,
    Rgba32,
    Rgb16,
    Rgb15,
    Rgba15,
    Indexed8,
    Gray8,
    Mono1,
    Rgb32Big,
    Rgba32Big,
    Rgb16Big,
    Rgb15Big,
    Rgba15Big,
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 13] = [
        PixelFormat::Rgb32,
        PixelFormat::Rgba32,
        PixelFormat::Rgb16,
        PixelFormat::Rgb15,
        PixelFormat::Rgba15,
        PixelFormat::Indexed8,
        PixelFormat::Gray8,
        PixelFormat::Mono1,
        PixelFormat::Rgb32Big,
        PixelFormat::Rgba32Big,
        PixelFormat::Rgb16Big,
        PixelFormat::Rgb15Big,
        PixelFormat::Rgba15Big,
    ];

    pub fn bits_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Rgb32 | PixelFormat::Rgba32 | PixelFormat::Rgb32Big | PixelFormat::Rgba32Big => 32,
            PixelFormat::Rgb16
            | PixelFormat::Rgb15
            | PixelFormat::Rgba15
            | PixelFormat::Rgb16Big
            | PixelFormat::Rgb15Big
            | PixelFormat::Rgba15Big => 16,
            PixelFormat::Indexed8 | PixelFormat::Gray8 => 8,
            PixelFormat::Mono1 => 1,
        }
    }

    /// Smallest legal row length in bytes for `width` pixels
    pub fn min_bytes_per_row(self, width: u32) -> usize {
        (width as usize * self.bits_per_pixel() as usize).div_ceil(8)
    }

    /// Row length used by freshly allocated buffers (padded to 4 bytes)
    pub fn padded_bytes_per_row(self, width: u32) -> usize {
        self.min_bytes_per_row(width).next_multiple_of(4)
    }

    /// True for the 15/16/32-bit direct color formats
    pub fn is_truecolor(self) -> bool {
        matches!(self.bits_per_pixel(), 16 | 32)
    }

    pub fn is_32bit(self) -> bool {
        self.bits_per_pixel() == 32
    }

    pub fn is_big_endian(self) -> bool {
        matches!(
            self,
            PixelFormat::Rgb32Big
                | PixelFormat::Rgba32Big
                | PixelFormat::Rgb16Big
                | PixelFormat::Rgb15Big
                | PixelFormat::Rgba15Big
        )
    }

    /// Byte offsets of (r, g, b) inside a 32-bit pixel
    pub(crate) fn channel_offsets(self) -> Option<(usize, usize, usize)> {
        match self {
            PixelFormat::Rgb32 | PixelFormat::Rgba32 => Some((2, 1, 0)),
            PixelFormat::Rgb32Big | PixelFormat::Rgba32Big => Some((1, 2, 3)),
            _ => None,
        }
    }

    /// Decode pixel `x` of a row
    pub fn read(self, row: &[u8], x: u32) -> Rgb {
        let x = x as usize;
        match self {
            PixelFormat::Rgb32 | PixelFormat::Rgba32 | PixelFormat::Rgb32Big | PixelFormat::Rgba32Big => {
                // channel_offsets is Some for every 32-bit format
                let (ro, go, bo) = self.channel_offsets().unwrap_or((2, 1, 0));
                let p = &row[x * 4..x * 4 + 4];
                Rgb::new(p[ro], p[go], p[bo])
            },
            PixelFormat::Rgb16 | PixelFormat::Rgb16Big => {
                let v = self.read_u16(row, x);
                Rgb::new(
                    expand5((v >> 11) as u8),
                    expand6((v >> 5) as u8 & 0x3F),
                    expand5(v as u8 & 0x1F),
                )
            },
            PixelFormat::Rgb15 | PixelFormat::Rgba15 | PixelFormat::Rgb15Big | PixelFormat::Rgba15Big => {
                let v = self.read_u16(row, x);
                Rgb::new(
                    expand5((v >> 10) as u8 & 0x1F),
                    expand5((v >> 5) as u8 & 0x1F),
                    expand5(v as u8 & 0x1F),
                )
            },
            PixelFormat::Indexed8 => Palette::system().color(row[x]),
            PixelFormat::Gray8 => Rgb::gray(row[x]),
            PixelFormat::Mono1 => {
                if row[x >> 3] & (0x80 >> (x & 7)) != 0 {
                    Rgb::BLACK
                } else {
                    Rgb::WHITE
                }
            },
        }
    }

    /// Encode `c` into pixel `x` of a row
    pub fn write(self, row: &mut [u8], x: u32, c: Rgb) {
        let x = x as usize;
        match self {
            PixelFormat::Rgb32 | PixelFormat::Rgba32 => {
                let a = if self == PixelFormat::Rgb32 { 0xFF } else { row[x * 4 + 3] };
                row[x * 4..x * 4 + 4].copy_from_slice(&[c.b, c.g, c.r, a]);
            },
            PixelFormat::Rgb32Big | PixelFormat::Rgba32Big => {
                let a = if self == PixelFormat::Rgb32Big { 0xFF } else { row[x * 4] };
                row[x * 4..x * 4 + 4].copy_from_slice(&[a, c.r, c.g, c.b]);
            },
            PixelFormat::Rgb16 | PixelFormat::Rgb16Big => {
                let v = ((c.r as u16 >> 3) << 11) | ((c.g as u16 >> 2) << 5) | (c.b as u16 >> 3);
                self.write_u16(row, x, v);
            },
            PixelFormat::Rgb15 | PixelFormat::Rgba15 | PixelFormat::Rgb15Big | PixelFormat::Rgba15Big => {
                let alpha = if matches!(self, PixelFormat::Rgba15 | PixelFormat::Rgba15Big) {
                    0x8000
                } else {
                    0
                };
                let v = alpha | ((c.r as u16 >> 3) << 10) | ((c.g as u16 >> 3) << 5) | (c.b as u16 >> 3);
                self.write_u16(row, x, v);
            },
            PixelFormat::Indexed8 => row[x] = Palette::system().index_for(c),
            PixelFormat::Gray8 => row[x] = c.luminance(),
            PixelFormat::Mono1 => {
                let mask = 0x80 >> (x & 7);
                if c.luminance() < 128 {
                    row[x >> 3] |= mask;
                } else {
                    row[x >> 3] &= !mask;
                }
            },
        }
    }

    #[inline]
    fn read_u16(self, row: &[u8], x: usize) -> u16 {
        let bytes = [row[x * 2], row[x * 2 + 1]];
        if self.is_big_endian() {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        }
    }

    #[inline]
    fn write_u16(self, row: &mut [u8], x: usize, v: u16) {
        let bytes = if self.is_big_endian() { v.to_be_bytes() } else { v.to_le_bytes() };
        row[x * 2..x * 2 + 2].copy_from_slice(&bytes);
    }
}

/// Widen a 5-bit channel to 8 bits (replicating the high bits)
#[inline]
fn expand5(v: u8) -> u8 {
    (v << 3) | (v >> 2)
}

/// Widen a 6-bit channel to 8 bits
#[inline]
fn expand6(v: u8) -> u8 {
    (v << 2) | (v >> 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_32bit_layouts() {
        let mut row = [0u8; 4];
        PixelFormat::Rgb32.write(&mut row, 0, Rgb::new(1, 2, 3));
        assert_eq!(row, [3, 2, 1, 0xFF]);
        PixelFormat::Rgb32Big.write(&mut row, 0, Rgb::new(1, 2, 3));
        assert_eq!(row, [0xFF, 1, 2, 3]);
        assert_eq!(PixelFormat::Rgb32Big.read(&row, 0), Rgb::new(1, 2, 3));
    }

    #[test]
    fn test_rgba32_keeps_alpha() {
        let mut row = [9, 9, 9, 0x40];
        PixelFormat::Rgba32.write(&mut row, 0, Rgb::new(10, 20, 30));
        assert_eq!(row, [30, 20, 10, 0x40]);
    }

    #[test]
    fn test_16bit_endianness() {
        let mut le = [0u8; 2];
        let mut be = [0u8; 2];
        PixelFormat::Rgb16.write(&mut le, 0, Rgb::new(0xFF, 0, 0));
        PixelFormat::Rgb16Big.write(&mut be, 0, Rgb::new(0xFF, 0, 0));
        assert_eq!(u16::from_le_bytes(le), 0xF800);
        assert_eq!(be, [0xF8, 0x00]);
        assert_eq!(PixelFormat::Rgb16.read(&le, 0), Rgb::new(0xFF, 0, 0));
    }

    #[test]
    fn test_15bit_full_scale_survives() {
        let mut row = [0u8; 2];
        PixelFormat::Rgba15.write(&mut row, 0, Rgb::WHITE);
        assert_eq!(u16::from_le_bytes(row), 0xFFFF);
        assert_eq!(PixelFormat::Rgba15.read(&row, 0), Rgb::WHITE);
        PixelFormat::Rgb15.write(&mut row, 0, Rgb::WHITE);
        assert_eq!(u16::from_le_bytes(row), 0x7FFF);
    }

    #[test]
    fn test_mono1_bits_are_msb_first() {
        let mut row = [0u8; 2];
        PixelFormat::Mono1.write(&mut row, 0, Rgb::BLACK);
        PixelFormat::Mono1.write(&mut row, 9, Rgb::BLACK);
        assert_eq!(row, [0x80, 0x40]);
        assert_eq!(PixelFormat::Mono1.read(&row, 9), Rgb::BLACK);
        assert_eq!(PixelFormat::Mono1.read(&row, 1), Rgb::WHITE);
    }

    #[test]
    fn test_row_lengths() {
        assert_eq!(PixelFormat::Mono1.min_bytes_per_row(9), 2);
        assert_eq!(PixelFormat::Rgb16.padded_bytes_per_row(3), 8);
        assert_eq!(PixelFormat::Rgb32.padded_bytes_per_row(3), 12);
    }
}
