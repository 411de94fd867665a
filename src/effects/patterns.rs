//! Synthetic source images for benchmarks and tests

use crate::bitmap::{PixelBuffer, PixelFormat, Rgb};
use crate::util::hsv_to_rgb;

/// Classic demoscene plasma, frozen at one point in time
pub struct Plasma {
    time: f32,
    palette: Vec<Rgb>,
    sin_table: Vec<f32>,
}

impl Plasma {
    pub fn new(time: f32) -> Self {
        // Pre-compute sine table for speed
        let sin_table: Vec<f32> = (0..256)
            .map(|i| (i as f32 * std::f32::consts::TAU / 256.0).sin())
            .collect();
        let palette = (0..256)
            .map(|i| hsv_to_rgb(i as f32 * 360.0 / 256.0, 0.8, 1.0))
            .collect();

        Self { time, palette, sin_table }
    }

    #[inline]
    fn fast_sin(&self, x: f32) -> f32 {
        let idx = ((x * 40.74) as i32 & 255) as usize;
        self.sin_table[idx]
    }

    /// Render a `width` x `height` buffer in `format`
    pub fn render(&self, width: u32, height: u32, format: PixelFormat) -> PixelBuffer {
        let mut buffer = PixelBuffer::new(width, height, format);
        let t = self.time;

        for y in 0..height {
            let row = buffer.row_mut(y);
            for x in 0..width {
                let fx = x as f32;
                let fy = y as f32;

                // Sum of sines at different frequencies
                let v1 = self.fast_sin(fx * 0.02 + t);
                let v2 = self.fast_sin(fy * 0.03 + t * 0.5);
                let v3 = self.fast_sin((fx + fy) * 0.02 + t * 0.7);
                let v4 = self.fast_sin(((fx * fx + fy * fy).sqrt() * 0.03) + t);

                let v = (v1 + v2 + v3 + v4 + 4.0) / 8.0;
                let idx = (v * 255.0) as usize;
                format.write(row, x, self.palette[idx.min(255)]);
            }
        }
        buffer
    }
}

impl Default for Plasma {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Two-color checkerboard with square cells of `cell` pixels
pub fn checkerboard(width: u32, height: u32, cell: u32, a: Rgb, b: Rgb, format: PixelFormat) -> PixelBuffer {
    let cell = cell.max(1);
    let mut buffer = PixelBuffer::new(width, height, format);
    for y in 0..height {
        let row = buffer.row_mut(y);
        for x in 0..width {
            let c = if (x / cell + y / cell) % 2 == 0 { a } else { b };
            format.write(row, x, c);
        }
    }
    buffer
}
