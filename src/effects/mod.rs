mod patterns;
mod session;

pub use patterns::{checkerboard, Plasma};
pub use session::{EffectSession, SessionStats};

use crate::bitmap::PixelBuffer;
use crate::error::Result;

/// Trait for frame producers driven by a mix value
pub trait Effect {
    /// Produce the frame for `mix` in [0, 1]
    fn render(&mut self, mix: f32) -> Result<PixelBuffer>;

    /// Effect name for logging
    fn name(&self) -> &str;
}
