//! Box average with border exclusion
//!
//! A `kx` x `ky` kernel only writes output pixels whose whole window lies
//! inside the source. With `s = k / 2` that is `x` in `[s, width + s + 1 - k)`,
//! and the window of `x` is `[x - s, x - s + k)`. The border ring outside
//! this blur area is never touched.

use crate::bitmap::{ClipRect, PixelBuffer, PixelFormat, Rgb};
use crate::error::{Error, Result};

/// Formats `blur` can read
pub fn supported_input_format(format: PixelFormat) -> bool {
    matches!(
        format,
        PixelFormat::Rgb32
            | PixelFormat::Rgba32
            | PixelFormat::Rgb32Big
            | PixelFormat::Rgba32Big
            | PixelFormat::Mono1
    )
}

/// Formats `blur` can write
pub fn supported_output_format(format: PixelFormat) -> bool {
    matches!(
        format,
        PixelFormat::Rgb32
            | PixelFormat::Rgba32
            | PixelFormat::Rgb15
            | PixelFormat::Rgba15
            | PixelFormat::Rgb16
            | PixelFormat::Rgb32Big
            | PixelFormat::Rgba32Big
            | PixelFormat::Rgb15Big
            | PixelFormat::Rgba15Big
            | PixelFormat::Rgb16Big
    )
}

/// Blur `source` into `dest` (same size, formats may differ)
pub fn blur(source: &PixelBuffer, dest: &mut PixelBuffer, kernel_x: u32, kernel_y: u32) -> Result<()> {
    check_kernel(kernel_x, kernel_y)?;
    if !source.same_size(dest) {
        return Err(Error::invalid(format!(
            "source is {}x{} but dest is {}x{}",
            source.width(),
            source.height(),
            dest.width(),
            dest.height()
        )));
    }
    check_formats(source.format(), dest.format())?;

    let Some(averages) = BoxAverages::compute(source, kernel_x, kernel_y) else {
        return Ok(());
    };
    averages.write(dest, averages.area, 0, 0);
    Ok(())
}

/// Blur `source` into a framebuffer region
///
/// `dest_rect` is where the source lands in screen coordinates and must match
/// its size. Only pixels inside one of `visible`, inside the blur area and
/// inside `dest` are written.
pub fn blur_into(
    source: &PixelBuffer,
    dest: &mut PixelBuffer,
    dest_rect: ClipRect,
    visible: &[ClipRect],
    kernel_x: u32,
    kernel_y: u32,
) -> Result<()> {
    check_kernel(kernel_x, kernel_y)?;
    if dest_rect.width() != source.width() as i32 || dest_rect.height() != source.height() as i32 {
        return Err(Error::invalid(format!(
            "dest_rect is {}x{} but source is {}x{}",
            dest_rect.width(),
            dest_rect.height(),
            source.width(),
            source.height()
        )));
    }
    check_formats(source.format(), dest.format())?;

    let Some(averages) = BoxAverages::compute(source, kernel_x, kernel_y) else {
        return Ok(());
    };
    let area = averages.area.offset(dest_rect.left, dest_rect.top);
    let bounds = dest.bounds();
    for rect in visible {
        let clipped = rect.intersect(&area).intersect(&bounds);
        if clipped.is_valid() {
            averages.write(
                dest,
                clipped.offset(-dest_rect.left, -dest_rect.top),
                dest_rect.left,
                dest_rect.top,
            );
        }
    }
    Ok(())
}

/// Intersect the visible rectangles with the blur area of `dest_rect`
///
/// The result can be passed straight to `blur_into`.
pub fn clip_rects(visible: &[ClipRect], dest_rect: ClipRect, kernel_x: u32, kernel_y: u32) -> Vec<ClipRect> {
    let Some(area) = blur_area(dest_rect.width(), dest_rect.height(), kernel_x, kernel_y) else {
        return Vec::new();
    };
    let area = area.offset(dest_rect.left, dest_rect.top);
    visible
        .iter()
        .map(|r| r.intersect(&area))
        .filter(ClipRect::is_valid)
        .collect()
}

fn check_kernel(kernel_x: u32, kernel_y: u32) -> Result<()> {
    if kernel_x == 0 || kernel_y == 0 {
        return Err(Error::invalid(format!(
            "kernel must be positive, got {}x{}",
            kernel_x, kernel_y
        )));
    }
    Ok(())
}

fn check_formats(input: PixelFormat, output: PixelFormat) -> Result<()> {
    if !supported_input_format(input) {
        return Err(Error::unsupported(input, "box blur input"));
    }
    if !supported_output_format(output) {
        return Err(Error::unsupported(output, "box blur output"));
    }
    Ok(())
}

/// Inclusive blur area of a `width` x `height` image, `None` when the kernel
/// does not fit
fn blur_area(width: i32, height: i32, kernel_x: u32, kernel_y: u32) -> Option<ClipRect> {
    if kernel_x == 0 || kernel_y == 0 {
        return None;
    }
    let (kx, ky) = (kernel_x as i64, kernel_y as i64);
    let (sx, sy) = (kx / 2, ky / 2);
    let ex = width as i64 + sx + 1 - kx;
    let ey = height as i64 + sy + 1 - ky;
    if ex <= sx || ey <= sy {
        return None;
    }
    Some(ClipRect::new(sx as i32, sy as i32, ex as i32 - 1, ey as i32 - 1))
}

// ============================================================================
// Sliding-window sums
// ============================================================================

/// Box averages over the blur area of one source
struct BoxAverages {
    width: usize,
    area: ClipRect,
    averages: Vec<Rgb>,
}

impl BoxAverages {
    fn compute(source: &PixelBuffer, kernel_x: u32, kernel_y: u32) -> Option<Self> {
        let area = blur_area(source.width() as i32, source.height() as i32, kernel_x, kernel_y)?;
        let plane = source.to_rgb_plane();
        let w = source.width() as usize;
        let h = source.height() as usize;
        let (kx, ky) = (kernel_x as usize, kernel_y as usize);
        let (sx, sy) = (kx / 2, ky / 2);
        let (x0, x1) = (area.left as usize, area.right as usize + 1);
        let (y0, y1) = (area.top as usize, area.bottom as usize + 1);

        // --- Horizontal pass: window sums for every row, area columns only ---
        let mut hsum = vec![[0u64; 3]; w * h];
        for y in 0..h {
            let row = &plane[y * w..(y + 1) * w];
            let mut acc = [0u64; 3];
            for c in &row[x0 - sx..x0 - sx + kx] {
                add(&mut acc, *c);
            }
            hsum[y * w + x0] = acc;
            for x in x0 + 1..x1 {
                sub(&mut acc, row[x - 1 - sx]);
                add(&mut acc, row[x - 1 - sx + kx]);
                hsum[y * w + x] = acc;
            }
        }

        // --- Vertical pass: sum the row sums down each area column ---
        let div = kernel_x as u64 * kernel_y as u64;
        let avg = |acc: &[u64; 3]| average(acc, div);
        let mut averages = vec![Rgb::BLACK; w * h];
        for x in x0..x1 {
            let mut acc = [0u64; 3];
            for y in y0 - sy..y0 - sy + ky {
                acc_add(&mut acc, &hsum[y * w + x]);
            }
            averages[y0 * w + x] = avg(&acc);
            for y in y0 + 1..y1 {
                acc_sub(&mut acc, &hsum[(y - 1 - sy) * w + x]);
                acc_add(&mut acc, &hsum[(y - 1 - sy + ky) * w + x]);
                averages[y * w + x] = avg(&acc);
            }
        }

        Some(Self { width: w, area, averages })
    }

    /// Write `rect` (source coordinates) to `dest`, shifted by (dx, dy)
    fn write(&self, dest: &mut PixelBuffer, rect: ClipRect, dx: i32, dy: i32) {
        let format = dest.format();
        for y in rect.top..=rect.bottom {
            let row = dest.row_mut((y + dy) as u32);
            for x in rect.left..=rect.right {
                let c = self.averages[y as usize * self.width + x as usize];
                format.write(row, (x + dx) as u32, c);
            }
        }
    }
}

/// Channel sums divided by the kernel area, saturated to a byte
#[inline]
fn average(acc: &[u64; 3], div: u64) -> Rgb {
    Rgb::new(
        (acc[0] / div).min(255) as u8,
        (acc[1] / div).min(255) as u8,
        (acc[2] / div).min(255) as u8,
    )
}

#[inline]
fn add(acc: &mut [u64; 3], c: Rgb) {
    acc[0] += c.r as u64;
    acc[1] += c.g as u64;
    acc[2] += c.b as u64;
}

#[inline]
fn sub(acc: &mut [u64; 3], c: Rgb) {
    acc[0] -= c.r as u64;
    acc[1] -= c.g as u64;
    acc[2] -= c.b as u64;
}

#[inline]
fn acc_add(acc: &mut [u64; 3], v: &[u64; 3]) {
    acc[0] += v[0];
    acc[1] += v[1];
    acc[2] += v[2];
}

#[inline]
fn acc_sub(acc: &mut [u64; 3], v: &[u64; 3]) {
    acc[0] -= v[0];
    acc[1] -= v[1];
    acc[2] -= v[2];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Rng;

    fn random_buffer(w: u32, h: u32, seed: u64) -> PixelBuffer {
        let mut rng = Rng::new(seed);
        let mut buf = PixelBuffer::new(w, h, PixelFormat::Rgb32);
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                buf.set_pixel(x, y, Rgb::new(rng.next_u8(), rng.next_u8(), rng.next_u8()));
            }
        }
        buf
    }

    /// Straight per-pixel average, for comparison with the running sums
    fn naive_average(src: &PixelBuffer, x: i32, y: i32, kx: i32, ky: i32) -> Rgb {
        let (mut r, mut g, mut b) = (0u32, 0u32, 0u32);
        for wy in y - ky / 2..y - ky / 2 + ky {
            for wx in x - kx / 2..x - kx / 2 + kx {
                let c = src.get_pixel(wx, wy).unwrap();
                r += c.r as u32;
                g += c.g as u32;
                b += c.b as u32;
            }
        }
        let n = (kx * ky) as u32;
        Rgb::new((r / n) as u8, (g / n) as u8, (b / n) as u8)
    }

    #[test]
    fn test_gray_4x4_kernel_3() {
        let mut src = PixelBuffer::new(4, 4, PixelFormat::Rgb32);
        src.clear(Rgb::gray(128));
        let mut dst = PixelBuffer::new(4, 4, PixelFormat::Rgb32);
        blur(&src, &mut dst, 3, 3).unwrap();

        for y in 0..4 {
            for x in 0..4 {
                let inside = (1..=2).contains(&x) && (1..=2).contains(&y);
                let expected = if inside { Rgb::gray(128) } else { Rgb::BLACK };
                assert_eq!(dst.get_pixel(x, y), Some(expected), "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_border_untouched() {
        let src = random_buffer(17, 11, 7);
        let mut dst = PixelBuffer::new(17, 11, PixelFormat::Rgb32);
        dst.clear(Rgb::new(1, 2, 3));
        blur(&src, &mut dst, 5, 4).unwrap();

        // kx=5: x in [2, 15); ky=4: y in [2, 10)
        for y in 0..11 {
            for x in 0..17 {
                let inside = (2..15).contains(&x) && (2..10).contains(&y);
                let got = dst.get_pixel(x, y).unwrap();
                if inside {
                    assert_eq!(got, naive_average(&src, x, y, 5, 4), "pixel ({}, {})", x, y);
                } else {
                    assert_eq!(got, Rgb::new(1, 2, 3), "border pixel ({}, {})", x, y);
                }
            }
        }
    }

    #[test]
    fn test_kernel_one_is_identity() {
        let src = random_buffer(9, 6, 3);
        let mut dst = PixelBuffer::new(9, 6, PixelFormat::Rgb32);
        blur(&src, &mut dst, 1, 1).unwrap();
        assert_eq!(dst.to_rgb_plane(), src.to_rgb_plane());
    }

    #[test]
    fn test_kernel_larger_than_image_writes_nothing() {
        let src = random_buffer(4, 4, 5);
        let mut dst = PixelBuffer::new(4, 4, PixelFormat::Rgb32);
        let before = dst.clone();
        blur(&src, &mut dst, 9, 2).unwrap();
        assert_eq!(dst, before);
    }

    #[test]
    fn test_invalid_arguments() {
        let src = random_buffer(4, 4, 1);
        let mut dst = PixelBuffer::new(4, 4, PixelFormat::Rgb32);
        assert!(matches!(blur(&src, &mut dst, 0, 3), Err(Error::InvalidArgument(_))));

        let mut small = PixelBuffer::new(3, 4, PixelFormat::Rgb32);
        assert!(matches!(blur(&src, &mut small, 3, 3), Err(Error::InvalidArgument(_))));

        let gray = PixelBuffer::new(4, 4, PixelFormat::Gray8);
        assert!(matches!(
            blur(&gray, &mut dst, 3, 3),
            Err(Error::UnsupportedFormat { format: PixelFormat::Gray8, .. })
        ));

        let mut indexed = PixelBuffer::new(4, 4, PixelFormat::Indexed8);
        let before = indexed.clone();
        assert!(blur(&src, &mut indexed, 3, 3).is_err());
        assert_eq!(indexed, before);
    }

    #[test]
    fn test_mono_source_to_16bit() {
        let mut src = PixelBuffer::new(4, 3, PixelFormat::Mono1);
        // left half black
        src.set_pixel(0, 1, Rgb::BLACK);
        src.set_pixel(1, 1, Rgb::BLACK);
        let mut dst = PixelBuffer::new(4, 3, PixelFormat::Rgb16);
        blur(&src, &mut dst, 2, 1).unwrap();
        // window of x=1 is [0, 2): both black
        assert_eq!(dst.get_pixel(1, 1), Some(Rgb::BLACK));
        // window of x=2 is [1, 3): half white
        let mut probe = PixelBuffer::new(1, 1, PixelFormat::Rgb16);
        probe.set_pixel(0, 0, Rgb::gray(127));
        assert_eq!(dst.get_pixel(2, 1), probe.get_pixel(0, 0));
        assert_eq!(dst.get_pixel(3, 0), Some(Rgb::WHITE));
    }

    #[test]
    fn test_clip_rects() {
        let dest_rect = ClipRect::with_size(100, 50, 10, 8);
        let visible = [
            ClipRect::new(0, 0, 104, 1000),
            ClipRect::new(108, 51, 200, 52),
            ClipRect::new(0, 0, 50, 50),
        ];
        let rects = clip_rects(&visible, dest_rect, 3, 3);
        // blur area is x 101..=108, y 51..=56
        assert_eq!(rects, vec![ClipRect::new(101, 51, 104, 56), ClipRect::new(108, 51, 108, 52)]);
    }

    #[test]
    fn test_blur_into_framebuffer() {
        let src = random_buffer(6, 6, 11);
        let mut reference = PixelBuffer::new(6, 6, PixelFormat::Rgb32);
        blur(&src, &mut reference, 3, 3).unwrap();

        let mut fb = PixelBuffer::new(8, 8, PixelFormat::Rgb32Big);
        let dest_rect = ClipRect::with_size(4, 3, 6, 6);
        let visible = [ClipRect::new(0, 0, 7, 7)];
        blur_into(&src, &mut fb, dest_rect, &visible, 3, 3).unwrap();

        for y in 0..8 {
            for x in 0..8 {
                let (sx, sy) = (x - 4, y - 3);
                let in_area = (1..5).contains(&sx) && (1..5).contains(&sy);
                let expected = if in_area { reference.get_pixel(sx, sy).unwrap() } else { Rgb::BLACK };
                assert_eq!(fb.get_pixel(x, y), Some(expected), "fb pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_blur_into_rejects_size_mismatch() {
        let src = random_buffer(6, 6, 2);
        let mut fb = PixelBuffer::new(8, 8, PixelFormat::Rgb32);
        let visible = [fb.bounds()];
        let result = blur_into(&src, &mut fb, ClipRect::with_size(0, 0, 5, 6), &visible, 3, 3);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_sums_hold_large_kernel_areas() {
        // 5000 x 4000 kernel of white: 20M pixels, past the range of u32 sums
        let (kx, ky) = (5000u64, 4000u64);
        let mut acc = [0u64; 3];
        for _ in 0..ky {
            acc_add(&mut acc, &[255 * kx; 3]);
        }
        assert_eq!(acc[0], 255 * kx * ky);
        assert_eq!(average(&acc, kx * ky), Rgb::WHITE);

        acc_sub(&mut acc, &[255 * kx; 3]);
        add(&mut acc, Rgb::new(10, 20, 30));
        assert_eq!(average(&acc, kx * ky), Rgb::gray(254));
    }
}
