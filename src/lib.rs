//! Fixed-point blur, alpha mixing and Hilbert-curve dithering
//!
//! The building blocks of an animated "defocus" cross-fade between two
//! images:
//! - [`blur`]: an exact box blur and a fast fixed-point triangle blur
//! - [`composite`]: in-place linear blend of two buffers
//! - [`dither`]: error diffusion along a Hilbert curve down to 15/16-bit,
//!   8-bit indexed and gray formats
//! - [`effects::EffectSession`]: the cross-fade itself, with blur caching
//! - [`worker::FrameWorker`]: renders a session on a background thread

pub mod bitmap;
pub mod blur;
pub mod composite;
pub mod config;
pub mod dither;
pub mod effects;
pub mod error;
pub mod util;
pub mod worker;

pub use bitmap::{ClipRect, Palette, PixelBuffer, PixelFormat, Rgb};
pub use config::EffectConfig;
pub use effects::{Effect, EffectSession};
pub use error::{Error, Result};
pub use worker::{FrameWorker, MixClock};
