//! Error-diffusion color reduction along a Hilbert path
//!
//! Diffusing the error along a space-filling curve instead of scanlines
//! keeps the carried error local in both directions and avoids the
//! directional worm artifacts of row-order dithering.

pub mod hilbert;
mod quantize;

pub use hilbert::{curve, walk, Direction, Rotation, Walker};
pub use quantize::{soft_clamp, Quantizer, Residual};

use crate::bitmap::{Palette, PixelBuffer, PixelFormat};
use crate::error::{Error, Result};

/// Reduce a 32-bit buffer to `target` with Hilbert-ordered error diffusion
///
/// 15-bit targets of any flavour produce `Rgb15`, 16-bit targets produce
/// `Rgb16`. `Rgb32` is a plain copy (alpha made opaque for an `Rgba32`
/// source), and other 32-bit targets fall back to it with a warning.
pub fn disperse(source: &PixelBuffer, target: PixelFormat, palette: &Palette) -> Result<PixelBuffer> {
    if !matches!(source.format(), PixelFormat::Rgb32 | PixelFormat::Rgba32) {
        return Err(Error::unsupported(source.format(), "disperse source"));
    }

    let quantizer = match target {
        PixelFormat::Rgb32 => return Ok(source.convert(PixelFormat::Rgb32)),
        PixelFormat::Rgb16 | PixelFormat::Rgb16Big => Quantizer::Rgb16,
        PixelFormat::Rgb15 | PixelFormat::Rgb15Big | PixelFormat::Rgba15 | PixelFormat::Rgba15Big => {
            Quantizer::Rgb15
        },
        PixelFormat::Indexed8 => Quantizer::Indexed(palette),
        PixelFormat::Gray8 => Quantizer::Gray,
        PixelFormat::Mono1 => return Err(Error::NotImplemented("dispersion to 1-bit monochrome")),
        PixelFormat::Rgba32 | PixelFormat::Rgb32Big | PixelFormat::Rgba32Big => {
            log::warn!("disperse: no quantizer for {:?}, returning an Rgb32 copy", target);
            return Ok(source.convert(PixelFormat::Rgb32));
        },
    };
    if quantizer.output_format() != target {
        log::debug!("disperse: writing {:?} for requested {:?}", quantizer.output_format(), target);
    }

    let mut output = PixelBuffer::new(source.width(), source.height(), quantizer.output_format());
    let mut state = DitherState::new(source, &mut output, quantizer);
    walk(source.width(), source.height(), &mut state);
    Ok(output)
}

// ============================================================================
// Dither State
// ============================================================================

/// Walker that quantizes each visited pixel and carries the error forward
struct DitherState<'a> {
    source: &'a PixelBuffer,
    target: &'a mut PixelBuffer,
    quantizer: Quantizer<'a>,
    collected_error: Residual,
    x: i64,
    y: i64,
}

impl<'a> DitherState<'a> {
    fn new(source: &'a PixelBuffer, target: &'a mut PixelBuffer, quantizer: Quantizer<'a>) -> Self {
        Self {
            source,
            target,
            quantizer,
            collected_error: [0; 3],
            x: 0,
            y: 0,
        }
    }

    fn visit(&mut self) {
        let (x, y) = (self.x, self.y);
        if x < 0 || y < 0 || x >= self.source.width() as i64 || y >= self.source.height() as i64 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        let pixel = self.source.format().read(self.source.row(y), x);
        self.collected_error = self
            .quantizer
            .apply(self.target.row_mut(y), x, pixel, self.collected_error);
    }
}

impl Walker for DitherState<'_> {
    fn step(&mut self, dir: Direction) {
        self.visit();
        let (dx, dy) = dir.delta();
        self.x += dx;
        self.y += dy;
    }

    fn seek(&mut self, x: u32, y: u32) {
        // error does not carry across a jump
        self.collected_error = [0; 3];
        self.x = x as i64;
        self.y = y as i64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Rgb;
    use crate::util::Rng;

    fn noise(w: u32, h: u32, seed: u64) -> PixelBuffer {
        let mut rng = Rng::new(seed);
        let mut buf = PixelBuffer::new(w, h, PixelFormat::Rgb32);
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                buf.set_pixel(x, y, Rgb::new(rng.next_u8(), rng.next_u8(), rng.next_u8()));
            }
        }
        buf
    }

    /// Tracks the largest carried error seen after each visit
    struct Probe<'a> {
        state: DitherState<'a>,
        peak: i32,
    }

    impl Walker for Probe<'_> {
        fn step(&mut self, dir: Direction) {
            self.state.step(dir);
            let peak = self.state.collected_error.iter().map(|e| e.abs()).max().unwrap_or(0);
            self.peak = self.peak.max(peak);
        }

        fn seek(&mut self, x: u32, y: u32) {
            self.state.seek(x, y);
        }
    }

    fn peak_error(source: &PixelBuffer, quantizer: Quantizer<'_>) -> i32 {
        let mut out = PixelBuffer::new(source.width(), source.height(), quantizer.output_format());
        let mut probe = Probe { state: DitherState::new(source, &mut out, quantizer), peak: 0 };
        walk(source.width(), source.height(), &mut probe);
        probe.peak
    }

    #[test]
    fn test_error_stays_bounded() {
        let src = noise(53, 41, 12);
        assert!(peak_error(&src, Quantizer::Rgb15) <= 16);
        assert!(peak_error(&src, Quantizer::Rgb16) <= 16);
        assert!(peak_error(&src, Quantizer::Gray) < 512);
        assert!(peak_error(&src, Quantizer::Indexed(Palette::system())) <= 128);
    }

    #[test]
    fn test_solid_extremes_survive() {
        for color in [Rgb::WHITE, Rgb::BLACK] {
            let mut src = PixelBuffer::new(13, 9, PixelFormat::Rgb32);
            src.clear(color);
            for target in [PixelFormat::Rgb15, PixelFormat::Rgb16, PixelFormat::Gray8, PixelFormat::Indexed8] {
                let out = disperse(&src, target, Palette::system()).unwrap();
                assert!(out.to_rgb_plane().iter().all(|&c| c == color), "{:?} -> {:?}", color, target);
            }
        }
    }

    #[test]
    fn test_indexed_mean_is_preserved() {
        let color = Rgb::new(100, 150, 200);
        let mut src = PixelBuffer::new(32, 32, PixelFormat::Rgb32);
        src.clear(color);
        let palette = Palette::system();
        let out = disperse(&src, PixelFormat::Indexed8, palette).unwrap();

        let (mut r, mut g, mut b) = (0u32, 0u32, 0u32);
        for y in 0..32 {
            for &i in out.row(y) {
                let c = palette.color(i);
                r += c.r as u32;
                g += c.g as u32;
                b += c.b as u32;
            }
        }
        let n = 32.0 * 32.0;
        assert!((r as f32 / n - 100.0).abs() < 2.0);
        assert!((g as f32 / n - 150.0).abs() < 2.0);
        assert!((b as f32 / n - 200.0).abs() < 2.0);
    }

    #[test]
    fn test_target_substitution() {
        let src = noise(5, 7, 1);
        let p = Palette::system();
        assert_eq!(disperse(&src, PixelFormat::Rgb16Big, p).unwrap().format(), PixelFormat::Rgb16);
        assert_eq!(disperse(&src, PixelFormat::Rgba15Big, p).unwrap().format(), PixelFormat::Rgb15);
        assert_eq!(disperse(&src, PixelFormat::Rgb32, p).unwrap(), src);
        // unknown 32-bit target falls back to a copy
        assert_eq!(disperse(&src, PixelFormat::Rgba32Big, p).unwrap(), src);
    }

    #[test]
    fn test_rgba_source_to_rgb32_is_converted() {
        let mut src = noise(6, 4, 8).convert(PixelFormat::Rgba32);
        src.as_bytes_mut().iter_mut().skip(3).step_by(4).for_each(|a| *a = 0x10);
        for target in [PixelFormat::Rgb32, PixelFormat::Rgb32Big] {
            let out = disperse(&src, target, Palette::system()).unwrap();
            assert_eq!(out.format(), PixelFormat::Rgb32);
            assert_eq!(out.to_rgb_plane(), src.to_rgb_plane());
            assert!(out.as_bytes().iter().skip(3).step_by(4).all(|&a| a == 0xFF));
        }
    }

    fn solid(w: u32, h: u32, color: Rgb) -> PixelBuffer {
        let mut buf = PixelBuffer::new(w, h, PixelFormat::Rgb32);
        buf.clear(color);
        buf
    }

    #[test]
    fn test_error_stays_bounded_on_solid_runs() {
        // none of these channel values is exactly representable
        let uneven = solid(211, 157, Rgb::new(13, 77, 201));
        assert!(peak_error(&uneven, Quantizer::Rgb15) <= 16);
        assert!(peak_error(&uneven, Quantizer::Rgb16) <= 16);
        assert!(peak_error(&uneven, Quantizer::Indexed(Palette::system())) <= 128);
        let gray = solid(211, 157, Rgb::new(100, 101, 101));
        assert!(peak_error(&gray, Quantizer::Gray) < 512);

        // 255 truncates to 248 in 15 bits; the overshoot is halved each step
        let saturated = solid(211, 157, Rgb::new(255, 255, 7));
        assert!(peak_error(&saturated, Quantizer::Rgb15) <= 16);
        assert!(peak_error(&saturated, Quantizer::Rgb16) <= 16);
        assert!(peak_error(&saturated, Quantizer::Indexed(Palette::system())) <= 128);
        assert!(peak_error(&solid(211, 157, Rgb::WHITE), Quantizer::Gray) < 512);
    }

    #[test]
    fn test_mono_is_not_implemented() {
        let src = noise(4, 4, 2);
        assert!(matches!(
            disperse(&src, PixelFormat::Mono1, Palette::system()),
            Err(Error::NotImplemented(_))
        ));
    }

    #[test]
    fn test_rejects_non_32bit_source() {
        let src = PixelBuffer::new(4, 4, PixelFormat::Rgb16);
        assert!(matches!(
            disperse(&src, PixelFormat::Gray8, Palette::system()),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_empty_source() {
        let src = PixelBuffer::new(0, 0, PixelFormat::Rgb32);
        let out = disperse(&src, PixelFormat::Rgb16, Palette::system()).unwrap();
        assert!(out.is_empty());
    }
}
