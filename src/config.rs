//! Effect configuration, persisted as JSON

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::bitmap::{PixelFormat, Rgb};
use crate::error::{Error, Result};

const DEFAULT_MAX_SPREAD: u32 = 50;
const DEFAULT_COVERAGE: f32 = 1.0;
const DEFAULT_PERIOD_FRAMES: u32 = 120;

/// Parameters of the cross-fade effect
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectConfig {
    /// Blur radius at the far end of the fade
    #[serde(default = "default_max_spread")]
    pub max_spread: u32,
    /// Color read for pixels beyond the image edge
    #[serde(default = "default_outside")]
    pub outside: Rgb,
    /// Brightness scale of the blur (1.0 keeps energy)
    #[serde(default = "default_coverage")]
    pub coverage: f32,
    /// Format `render` disperses to
    #[serde(default = "default_target_format")]
    pub target_format: PixelFormat,
    /// Frames for one 0 -> 1 -> 0 sweep of the mix
    #[serde(default = "default_period_frames")]
    pub period_frames: u32,
}

fn default_max_spread() -> u32 {
    DEFAULT_MAX_SPREAD
}

fn default_outside() -> Rgb {
    Rgb::WHITE
}

fn default_coverage() -> f32 {
    DEFAULT_COVERAGE
}

fn default_target_format() -> PixelFormat {
    PixelFormat::Rgb32
}

fn default_period_frames() -> u32 {
    DEFAULT_PERIOD_FRAMES
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            max_spread: DEFAULT_MAX_SPREAD,
            outside: default_outside(),
            coverage: DEFAULT_COVERAGE,
            target_format: default_target_format(),
            period_frames: DEFAULT_PERIOD_FRAMES,
        }
    }
}

impl EffectConfig {
    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if !self.coverage.is_finite() || self.coverage < 0.0 {
            return Err(Error::invalid(format!("coverage must be a non-negative number, got {}", self.coverage)));
        }
        if self.period_frames == 0 {
            return Err(Error::invalid("period_frames must be at least 1"));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
