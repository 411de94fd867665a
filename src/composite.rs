//! Scalar alpha mixing of two 32-bit buffers

use crate::bitmap::PixelBuffer;
use crate::error::{Error, Result};

/// Mix `src` into `dst`: `dst + (src - dst) * mix` per color channel
///
/// `mix` is clamped to `[0, 1]` and applied as an 8.8 fixed-point factor with
/// a flooring shift, so a result never leaves the range spanned by the two
/// inputs. Alpha bytes are left alone. Only the overlapping
/// `min(width) x min(height)` region is touched.
pub fn blend(dst: &mut PixelBuffer, src: &PixelBuffer, mix: f32) -> Result<()> {
    if dst.is_empty() || src.is_empty() {
        return Err(Error::invalid("cannot blend an empty buffer"));
    }
    let Some(offsets) = dst.format().channel_offsets() else {
        return Err(Error::unsupported(dst.format(), "blend"));
    };
    if src.format() != dst.format() {
        return Err(Error::unsupported(src.format(), "blend"));
    }

    let mix = if mix.is_nan() { 0.0 } else { mix.clamp(0.0, 1.0) };
    if mix == 0.0 {
        return Ok(());
    }
    let fixed = (mix * 256.0) as i32;
    let (ro, go, bo) = offsets;

    let width = dst.width().min(src.width()) as usize;
    let height = dst.height().min(src.height());
    for y in 0..height {
        let s_row = src.row(y);
        let d_row = dst.row_mut(y);
        for (d, s) in d_row.chunks_exact_mut(4).zip(s_row.chunks_exact(4)).take(width) {
            for o in [ro, go, bo] {
                d[o] = mix_channel(d[o], s[o], fixed);
            }
        }
    }
    Ok(())
}

#[inline]
fn mix_channel(d: u8, s: u8, fixed: i32) -> u8 {
    let d = d as i32;
    (d + (((s as i32 - d) * fixed) >> 8)) as u8
}
