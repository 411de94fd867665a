use std::sync::OnceLock;

use super::format::Rgb;

const INVERSE_SIZE: usize = 1 << 15;

/// 256-color palette with a 5-5-5 inverse lookup
///
/// The inverse map is keyed by the top five bits of each channel and holds
/// the index of the nearest palette entry to that cell's color.
#[derive(Clone)]
pub struct Palette {
    colors: [Rgb; 256],
    inverse: Box<[u8]>,
}

impl Palette {
    /// Build a palette and its inverse map. Ties go to the lowest index.
    pub fn new(colors: [Rgb; 256]) -> Self {
        let mut inverse = vec![0u8; INVERSE_SIZE].into_boxed_slice();
        for (key, slot) in inverse.iter_mut().enumerate() {
            let probe = Rgb::new(
                widen((key >> 10) as u8 & 0x1F),
                widen((key >> 5) as u8 & 0x1F),
                widen(key as u8 & 0x1F),
            );
            *slot = nearest(&colors, probe);
        }
        Self { colors, inverse }
    }

    /// Shared default palette: gray ramp, 6x6x6 cube, then eight tints
    pub fn system() -> &'static Palette {
        static SYSTEM: OnceLock<Palette> = OnceLock::new();
        SYSTEM.get_or_init(|| Palette::new(system_colors()))
    }

    #[inline]
    pub fn color(&self, index: u8) -> Rgb {
        self.colors[index as usize]
    }

    pub fn colors(&self) -> &[Rgb; 256] {
        &self.colors
    }

    /// Nearest palette index for `c` via the inverse map
    #[inline]
    pub fn index_for(&self, c: Rgb) -> u8 {
        let key = ((c.r as usize >> 3) << 10) | ((c.g as usize >> 3) << 5) | (c.b as usize >> 3);
        self.inverse[key]
    }
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Palette")
            .field("first", &self.colors[0])
            .field("last", &self.colors[255])
            .finish_non_exhaustive()
    }
}

#[inline]
fn widen(v: u8) -> u8 {
    (v << 3) | (v >> 2)
}

fn nearest(colors: &[Rgb; 256], c: Rgb) -> u8 {
    let mut best = 0u8;
    let mut best_dist = u32::MAX;
    for (i, p) in colors.iter().enumerate() {
        let dr = p.r as i32 - c.r as i32;
        let dg = p.g as i32 - c.g as i32;
        let db = p.b as i32 - c.b as i32;
        let dist = (dr * dr + dg * dg + db * db) as u32;
        if dist < best_dist {
            best_dist = dist;
            best = i as u8;
            if dist == 0 {
                break;
            }
        }
    }
    best
}

fn system_colors() -> [Rgb; 256] {
    const TINTS: [Rgb; 8] = [
        Rgb::new(128, 0, 0),
        Rgb::new(0, 128, 0),
        Rgb::new(0, 0, 128),
        Rgb::new(128, 128, 0),
        Rgb::new(128, 0, 128),
        Rgb::new(0, 128, 128),
        Rgb::new(192, 192, 192),
        Rgb::new(255, 255, 255),
    ];

    let mut colors = [Rgb::BLACK; 256];
    for (i, slot) in colors.iter_mut().take(32).enumerate() {
        *slot = Rgb::gray((i * 255 / 31) as u8);
    }
    let mut i = 32;
    for r in 0..6u16 {
        for g in 0..6u16 {
            for b in 0..6u16 {
                colors[i] = Rgb::new((r * 51) as u8, (g * 51) as u8, (b * 51) as u8);
                i += 1;
            }
        }
    }
    colors[248..].copy_from_slice(&TINTS);
    colors
}
