use super::Effect;
use crate::bitmap::{Palette, PixelBuffer, PixelFormat};
use crate::blur::{LookupTable, TriangleBlur};
use crate::composite::blend;
use crate::config::EffectConfig;
use crate::dither::disperse;
use crate::error::{Error, Result};

/// Blur and cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub blurs: u64,
    pub cache_hits: u64,
}

/// Effective (horizontal, vertical) matrix sizes of one cached blur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlurKey {
    horizontal: u32,
    vertical: u32,
}

impl BlurKey {
    fn new(horizontal: u32, vertical: u32, coverage: f32) -> Self {
        Self {
            horizontal: LookupTable::new(horizontal, coverage).size(),
            vertical: LookupTable::new(vertical, coverage).size(),
        }
    }
}

struct CachedBlur {
    key: BlurKey,
    buffer: PixelBuffer,
}

// ============================================================================
// EffectSession
// ============================================================================

/// Defocus cross-fade between two images
///
/// At mix 0 the first image is shown sharp; as the mix grows it is smeared
/// (mostly horizontally) while the second image comes into focus and is
/// blended over it. At mix 1 only the sharp second image remains.
pub struct EffectSession {
    first: PixelBuffer,
    second: PixelBuffer,
    config: EffectConfig,
    blur: TriangleBlur,
    mix: f32,
    first_cache: Option<CachedBlur>,
    second_cache: Option<CachedBlur>,
    stats: SessionStats,
}

impl EffectSession {
    pub fn new(first: PixelBuffer, second: PixelBuffer, config: &EffectConfig) -> Result<Self> {
        config.validate()?;
        if first.is_empty() || !first.same_size(&second) {
            return Err(Error::invalid(format!(
                "sources must be non-empty and equal in size, got {}x{} and {}x{}",
                first.width(),
                first.height(),
                second.width(),
                second.height()
            )));
        }
        for source in [&first, &second] {
            if !source.format().is_truecolor() {
                return Err(Error::unsupported(source.format(), "effect source"));
            }
        }

        Ok(Self {
            blur: TriangleBlur::new(2, config.outside, config.coverage),
            first,
            second,
            config: config.clone(),
            mix: 0.0,
            first_cache: None,
            second_cache: None,
            stats: SessionStats::default(),
        })
    }

    pub fn config(&self) -> &EffectConfig {
        &self.config
    }

    /// Replace the configuration; cached blurs are dropped
    pub fn set_config(&mut self, config: &EffectConfig) -> Result<()> {
        config.validate()?;
        self.config = config.clone();
        self.first_cache = None;
        self.second_cache = None;
        Ok(())
    }

    /// Mix of the last composited frame
    pub fn mix(&self) -> f32 {
        self.mix
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn width(&self) -> u32 {
        self.first.width()
    }

    pub fn height(&self) -> u32 {
        self.first.height()
    }

    /// Blend the two blurred sources for `mix` into a new Rgb32 buffer
    pub fn composite(&mut self, mix: f32) -> Result<PixelBuffer> {
        let mix = if mix.is_nan() { 0.0 } else { mix.clamp(0.0, 1.0) };
        self.mix = mix;
        let max = self.config.max_spread as f32;

        let first_horizontal = (8.0 * max * mix) as u32;
        let first_vertical = (max * mix) as u32;
        let second_size = (max * (1.0 - mix)) as u32;

        refresh(
            &mut self.first_cache,
            &self.first,
            &mut self.blur,
            &self.config,
            (first_horizontal, first_vertical),
            &mut self.stats,
        )?;
        refresh(
            &mut self.second_cache,
            &self.second,
            &mut self.blur,
            &self.config,
            (second_size, second_size),
            &mut self.stats,
        )?;

        let (Some(first), Some(second)) = (&self.first_cache, &self.second_cache) else {
            return Err(Error::invalid("blur cache is empty after refresh"));
        };
        let mut frame = first.buffer.clone();
        blend(&mut frame, &second.buffer, mix)?;
        Ok(frame)
    }
}

impl Effect for EffectSession {
    /// Composite, then disperse to the configured target format
    fn render(&mut self, mix: f32) -> Result<PixelBuffer> {
        let frame = self.composite(mix)?;
        match self.config.target_format {
            PixelFormat::Rgb32 => Ok(frame),
            target => disperse(&frame, target, Palette::system()),
        }
    }

    fn name(&self) -> &str {
        "Defocus Cross-Fade"
    }
}

/// Recompute `cache` unless it already holds `source` blurred with `sizes`
fn refresh(
    cache: &mut Option<CachedBlur>,
    source: &PixelBuffer,
    blur: &mut TriangleBlur,
    config: &EffectConfig,
    sizes: (u32, u32),
    stats: &mut SessionStats,
) -> Result<()> {
    let key = BlurKey::new(sizes.0, sizes.1, config.coverage);
    if let Some(cached) = cache {
        if cached.key == key {
            stats.cache_hits += 1;
            log::trace!("blur cache hit for {:?}", key);
            return Ok(());
        }
    }

    log::debug!("blurring {}x{} source with {:?}", source.width(), source.height(), key);
    let mut buffer = PixelBuffer::new(source.width(), source.height(), PixelFormat::Rgb32);
    blur.set_spread_size(sizes.0, config.outside, config.coverage);
    blur.blur_horizontal(source, &mut buffer)?;
    blur.set_spread_size(sizes.1, config.outside, config.coverage);
    blur.blur_vertical_in_place(&mut buffer)?;
    stats.blurs += 1;
    *cache = Some(CachedBlur { key, buffer });
    Ok(())
}
