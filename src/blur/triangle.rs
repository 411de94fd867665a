//! Fast fixed-point triangle filter
//!
//! Every input channel value is turned into a triangle of base `size` and
//! height `reduce[c]`, built from its 8.8 slope `addon[c]`. Summing all
//! triangles at a position gives the output. Instead of drawing each
//! triangle, a single running slope (`subtractor`) is fed from a band of
//! addons: `+a` when a triangle starts rising, `-2a` at its peak and `+a`
//! when it has fallen back to zero.

use crate::bitmap::{PixelBuffer, PixelFormat, Rgb};
use crate::error::{Error, Result};

/// One lookup entry: triangle height and per-pixel slope, both 8.8 fixed point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slope {
    pub reduce: u16,
    pub addon: u16,
}

/// Largest effective matrix size; at unit coverage every slope is already
/// zero at this width
pub const MAX_MATRIX_SIZE: u32 = 1 << 16;

/// 256-entry slope table for one matrix size and coverage
#[derive(Debug, Clone)]
pub struct LookupTable {
    size: u32,
    coverage: f32,
    entries: [Slope; 256],
}

impl LookupTable {
    /// Sizes below 2 become 2, sizes above `MAX_MATRIX_SIZE` are clamped to
    /// it and odd sizes round up so both flanks match
    pub fn new(matrix_size: u32, coverage: f32) -> Self {
        let size = matrix_size.clamp(2, MAX_MATRIX_SIZE).next_multiple_of(2);
        let half = size / 2;
        let mut entries = [Slope::default(); 256];
        for (c, entry) in entries.iter_mut().enumerate() {
            let reduce = (c as f32 * coverage * 512.0 / size as f32) as u16;
            let addon = (reduce as u32 / half) as u16;
            *entry = Slope { reduce, addon };
        }
        Self { size, coverage, entries }
    }

    /// Effective (even) matrix size
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn half(&self) -> u32 {
        self.size / 2
    }

    #[inline]
    pub fn coverage(&self) -> f32 {
        self.coverage
    }

    #[inline]
    pub fn get(&self, c: u8) -> Slope {
        self.entries[c as usize]
    }

    #[inline]
    fn addon(&self, c: Rgb) -> [i64; 3] {
        [
            self.entries[c.r as usize].addon as i64,
            self.entries[c.g as usize].addon as i64,
            self.entries[c.b as usize].addon as i64,
        ]
    }
}

// ============================================================================
// TriangleBlur
// ============================================================================

/// Separable triangle blur with a configurable outside color
#[derive(Debug, Clone)]
pub struct TriangleBlur {
    table: LookupTable,
    outside: Rgb,
}

impl TriangleBlur {
    pub fn new(matrix_size: u32, outside: Rgb, coverage: f32) -> Self {
        Self {
            table: LookupTable::new(matrix_size, coverage),
            outside,
        }
    }

    /// Rebuild the lookup table for a new radius, outside color or coverage
    pub fn set_spread_size(&mut self, matrix_size: u32, outside: Rgb, coverage: f32) {
        self.table = LookupTable::new(matrix_size, coverage);
        self.outside = outside;
    }

    pub fn table(&self) -> &LookupTable {
        &self.table
    }

    pub fn outside(&self) -> Rgb {
        self.outside
    }

    /// Filter every row of `source` into `dest`
    pub fn blur_horizontal(&self, source: &PixelBuffer, dest: &mut PixelBuffer) -> Result<()> {
        check_pair(source, dest)?;
        let width = source.width() as usize;
        let mut line = vec![Rgb::BLACK; width];
        let mut out = vec![Rgb::BLACK; width];
        let (src_fmt, dst_fmt) = (source.format(), dest.format());
        for y in 0..source.height() {
            let row = source.row(y);
            for (x, px) in line.iter_mut().enumerate() {
                *px = src_fmt.read(row, x as u32);
            }
            self.filter_line(&line, &mut out);
            let row = dest.row_mut(y);
            for (x, px) in out.iter().enumerate() {
                dst_fmt.write(row, x as u32, *px);
            }
        }
        Ok(())
    }

    /// Filter every column of `source` into `dest`
    pub fn blur_vertical(&self, source: &PixelBuffer, dest: &mut PixelBuffer) -> Result<()> {
        check_pair(source, dest)?;
        let height = source.height() as usize;
        let mut line = vec![Rgb::BLACK; height];
        let mut out = vec![Rgb::BLACK; height];
        for x in 0..source.width() {
            for (y, px) in line.iter_mut().enumerate() {
                *px = source.format().read(source.row(y as u32), x);
            }
            self.filter_line(&line, &mut out);
            scatter_column(dest, x, &out);
        }
        Ok(())
    }

    /// Filter every column of `buffer` in place
    pub fn blur_vertical_in_place(&self, buffer: &mut PixelBuffer) -> Result<()> {
        check_format(buffer.format(), "triangle blur")?;
        let height = buffer.height() as usize;
        let mut line = vec![Rgb::BLACK; height];
        let mut out = vec![Rgb::BLACK; height];
        for x in 0..buffer.width() {
            for (y, px) in line.iter_mut().enumerate() {
                *px = buffer.format().read(buffer.row(y as u32), x);
            }
            self.filter_line(&line, &mut out);
            scatter_column(buffer, x, &out);
        }
        Ok(())
    }

    /// Horizontal pass into `dest`, then vertical pass in place
    pub fn blur_all(&self, source: &PixelBuffer, dest: &mut PixelBuffer) -> Result<()> {
        self.blur_horizontal(source, dest)?;
        self.blur_vertical_in_place(dest)
    }

    /// Filter one line; `output` must be as long as `input`
    ///
    /// Pixels outside the line read as the outside color. The band holds the
    /// addons of positions `-(h - 1) ..= n + h - 2`.
    pub fn filter_line(&self, input: &[Rgb], output: &mut [Rgb]) {
        let n = input.len();
        debug_assert_eq!(n, output.len());
        if n == 0 {
            return;
        }
        let h = self.table.half() as usize;
        let outside = self.table.addon(self.outside);
        let band: Vec<[i64; 3]> = (0..n + 2 * h - 2)
            .map(|j| match (j + 1).checked_sub(h) {
                Some(i) if i < n => self.table.addon(input[i]),
                _ => outside,
            })
            .collect();

        let mut subtractor = [0i64; 3];
        let mut value = [0i64; 3];
        for j in 0..band.len() {
            for ch in 0..3 {
                subtractor[ch] += band[j][ch];
                if j >= h {
                    subtractor[ch] -= 2 * band[j - h][ch];
                }
                if j >= 2 * h {
                    subtractor[ch] += band[j - 2 * h][ch];
                }
                value[ch] += subtractor[ch];
            }
            if j + 2 >= 2 * h {
                output[j + 2 - 2 * h] = Rgb::new(clamp8(value[0]), clamp8(value[1]), clamp8(value[2]));
            }
        }
    }
}

#[inline]
fn clamp8(v: i64) -> u8 {
    (v >> 8).clamp(0, 255) as u8
}

fn scatter_column(dest: &mut PixelBuffer, x: u32, column: &[Rgb]) {
    let format = dest.format();
    for (y, px) in column.iter().enumerate() {
        format.write(dest.row_mut(y as u32), x, *px);
    }
}

fn check_format(format: PixelFormat, operation: &'static str) -> Result<()> {
    if format.is_truecolor() {
        Ok(())
    } else {
        Err(Error::unsupported(format, operation))
    }
}

fn check_pair(source: &PixelBuffer, dest: &PixelBuffer) -> Result<()> {
    check_format(source.format(), "triangle blur input")?;
    check_format(dest.format(), "triangle blur output")?;
    if !source.same_size(dest) {
        return Err(Error::invalid(format!(
            "source is {}x{} but dest is {}x{}",
            source.width(),
            source.height(),
            dest.width(),
            dest.height()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Rng;

    /// Explicit triangle convolution the running sum must reproduce exactly
    fn convolve(blur: &TriangleBlur, input: &[Rgb]) -> Vec<Rgb> {
        let h = blur.table().half() as i64;
        let n = input.len() as i64;
        let pixel = |i: i64| {
            if (0..n).contains(&i) {
                input[i as usize]
            } else {
                blur.outside()
            }
        };
        (0..n)
            .map(|x| {
                let mut acc = [0i64; 3];
                for d in -(h - 1)..h {
                    let w = h - d.abs();
                    let a = blur.table().addon(pixel(x + d));
                    for ch in 0..3 {
                        acc[ch] += a[ch] * w;
                    }
                }
                Rgb::new(clamp8(acc[0]), clamp8(acc[1]), clamp8(acc[2]))
            })
            .collect()
    }

    fn random_line(len: usize, seed: u64) -> Vec<Rgb> {
        let mut rng = Rng::new(seed);
        (0..len)
            .map(|_| Rgb::new(rng.next_u8(), rng.next_u8(), rng.next_u8()))
            .collect()
    }

    #[test]
    fn test_lookup_table_rounding() {
        assert_eq!(LookupTable::new(0, 1.0).size(), 2);
        assert_eq!(LookupTable::new(7, 1.0).size(), 8);
        assert_eq!(LookupTable::new(8, 1.0).size(), 8);

        let t = LookupTable::new(8, 1.0);
        assert_eq!(t.get(255), Slope { reduce: 16320, addon: 4080 });
        assert_eq!(t.get(0), Slope::default());
    }

    #[test]
    fn test_lookup_table_saturates() {
        let t = LookupTable::new(2, 4.0);
        assert_eq!(t.get(255).reduce, u16::MAX);
    }

    #[test]
    fn test_huge_matrix_sizes_are_clamped() {
        for size in [MAX_MATRIX_SIZE + 1, 131_072, u32::MAX - 1, u32::MAX] {
            let t = LookupTable::new(size, 1.0);
            assert_eq!(t.size(), MAX_MATRIX_SIZE);
            assert_eq!(t.get(255).addon, 0);
        }

        let blur = TriangleBlur::new(u32::MAX, Rgb::WHITE, 1.0);
        let input = random_line(9, 3);
        let mut out = vec![Rgb::WHITE; 9];
        blur.filter_line(&input, &mut out);
        assert!(out.iter().all(|&c| c == Rgb::BLACK));
    }

    #[test]
    fn test_running_sum_matches_convolution() {
        for &size in &[2u32, 3, 4, 6, 10, 17, 40] {
            for &len in &[1usize, 2, 5, 13, 64] {
                let blur = TriangleBlur::new(size, Rgb::new(200, 10, 90), 1.0);
                let input = random_line(len, size as u64 * 131 + len as u64);
                let mut out = vec![Rgb::BLACK; len];
                blur.filter_line(&input, &mut out);
                assert_eq!(out, convolve(&blur, &input), "size {} len {}", size, len);
            }
        }
    }

    #[test]
    fn test_size_two_is_identity() {
        let blur = TriangleBlur::new(2, Rgb::BLACK, 1.0);
        let input = random_line(50, 9);
        let mut out = vec![Rgb::BLACK; 50];
        blur.filter_line(&input, &mut out);
        assert_eq!(out, input);
    }

    #[test]
    fn test_flat_field_stays_flat() {
        // with a matching outside color nothing changes apart from rounding
        let blur = TriangleBlur::new(12, Rgb::gray(100), 1.0);
        let input = vec![Rgb::gray(100); 30];
        let mut out = vec![Rgb::BLACK; 30];
        blur.filter_line(&input, &mut out);
        for px in out {
            assert!((px.r as i32 - 100).abs() <= 3, "got {:?}", px);
        }
    }

    #[test]
    fn test_vertical_in_place_matches_copy() {
        let mut src = PixelBuffer::new(7, 19, PixelFormat::Rgb32);
        let mut rng = Rng::new(4);
        for y in 0..19 {
            for x in 0..7 {
                src.set_pixel(x, y, Rgb::new(rng.next_u8(), rng.next_u8(), rng.next_u8()));
            }
        }
        let blur = TriangleBlur::new(6, Rgb::WHITE, 1.0);
        let mut copy = PixelBuffer::new(7, 19, PixelFormat::Rgb32);
        blur.blur_vertical(&src, &mut copy).unwrap();
        blur.blur_vertical_in_place(&mut src).unwrap();
        assert_eq!(src.to_rgb_plane(), copy.to_rgb_plane());
    }

    #[test]
    fn test_horizontal_rows_are_filtered() {
        let mut src = PixelBuffer::new(9, 2, PixelFormat::Rgb32Big);
        let line = random_line(9, 77);
        for (x, c) in line.iter().enumerate() {
            src.set_pixel(x as i32, 1, *c);
        }
        let blur = TriangleBlur::new(4, Rgb::BLACK, 1.0);
        let mut dst = PixelBuffer::new(9, 2, PixelFormat::Rgb32);
        blur.blur_horizontal(&src, &mut dst).unwrap();
        let expected = convolve(&blur, &line);
        for x in 0..9 {
            assert_eq!(dst.get_pixel(x, 1), Some(expected[x as usize]));
        }
    }

    #[test]
    fn test_rejects_bad_buffers() {
        let blur = TriangleBlur::new(4, Rgb::BLACK, 1.0);
        let src = PixelBuffer::new(4, 4, PixelFormat::Rgb32);
        let mut gray = PixelBuffer::new(4, 4, PixelFormat::Gray8);
        assert!(matches!(
            blur.blur_horizontal(&src, &mut gray),
            Err(Error::UnsupportedFormat { .. })
        ));
        let mut small = PixelBuffer::new(4, 3, PixelFormat::Rgb32);
        assert!(matches!(
            blur.blur_vertical(&src, &mut small),
            Err(Error::InvalidArgument(_))
        ));
    }
}
