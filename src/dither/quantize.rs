//! Per-pixel quantizers for the disperser
//!
//! Each quantizer takes a color with the carried error already added, writes
//! the nearest representable value and returns the new error to carry.
//! Values that overshoot `[0, 255]` are softly clamped: only half of the
//! overshoot is carried on, so a long run of saturated pixels cannot wind
//! the error up without bound.

use crate::bitmap::{Palette, PixelFormat, Rgb};

/// Running per-channel error in 8-bit units (gray keeps 8.8 in `[0]`)
pub type Residual = [i32; 3];

#[derive(Debug, Clone, Copy)]
pub enum Quantizer<'a> {
    Rgb15,
    Rgb16,
    Indexed(&'a Palette),
    Gray,
}

impl Quantizer<'_> {
    /// Format of the buffer this quantizer writes
    pub fn output_format(&self) -> PixelFormat {
        match self {
            Quantizer::Rgb15 => PixelFormat::Rgb15,
            Quantizer::Rgb16 => PixelFormat::Rgb16,
            Quantizer::Indexed(_) => PixelFormat::Indexed8,
            Quantizer::Gray => PixelFormat::Gray8,
        }
    }

    /// Quantize `pixel + error` into pixel `x` of `row`
    pub fn apply(&self, row: &mut [u8], x: u32, pixel: Rgb, error: Residual) -> Residual {
        match *self {
            Quantizer::Rgb15 => self.truecolor(row, x, pixel, error, [0xF8, 0xF8, 0xF8]),
            Quantizer::Rgb16 => self.truecolor(row, x, pixel, error, [0xF8, 0xFC, 0xF8]),
            Quantizer::Indexed(palette) => {
                let (r, cr) = soft_clamp(pixel.r as i32 + error[0]);
                let (g, cg) = soft_clamp(pixel.g as i32 + error[1]);
                let (b, cb) = soft_clamp(pixel.b as i32 + error[2]);
                let index = palette.index_for(Rgb::new(r, g, b));
                row[x as usize] = index;
                let q = palette.color(index);
                [cr - q.r as i32, cg - q.g as i32, cb - q.b as i32]
            },
            Quantizer::Gray => {
                let sum = pixel.r as i32 + pixel.g as i32 + pixel.b as i32;
                let mut gray = sum * 256 / 3 + error[0];
                let level = gray / 256;
                let emitted = if level > 255 {
                    gray = ((level - 255) / 2 + 255) * 256;
                    255
                } else if level < 0 {
                    gray = (level / 2) * 256;
                    0
                } else {
                    level
                };
                row[x as usize] = emitted as u8;
                [gray - (emitted << 8), 0, 0]
            },
        }
    }

    fn truecolor(&self, row: &mut [u8], x: u32, pixel: Rgb, error: Residual, masks: [u8; 3]) -> Residual {
        let (r, cr) = soft_clamp(pixel.r as i32 + error[0]);
        let (g, cg) = soft_clamp(pixel.g as i32 + error[1]);
        let (b, cb) = soft_clamp(pixel.b as i32 + error[2]);
        let q = Rgb::new(r & masks[0], g & masks[1], b & masks[2]);
        self.output_format().write(row, x, q);
        [cr - q.r as i32, cg - q.g as i32, cb - q.b as i32]
    }
}

/// Clamp to a byte; returns (emitted, carried)
#[inline]
pub fn soft_clamp(v: i32) -> (u8, i32) {
    if v > 255 {
        (255, (v - 255) / 2 + 255)
    } else if v < 0 {
        (0, v / 2)
    } else {
        (v as u8, v)
    }
}
