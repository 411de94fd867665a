//! Separable blurs
//!
//! Two flavours share this module:
//! - `box_blur`: exact box average that leaves the unblurrable border alone,
//!   with a clipped variant for drawing straight into a framebuffer
//! - `triangle`: fixed-point triangle filter driven by a lookup table, used
//!   by the cross-fade session

pub mod box_blur;
pub mod triangle;

pub use box_blur::{blur, blur_into, clip_rects, supported_input_format, supported_output_format};
pub use triangle::{LookupTable, Slope, TriangleBlur, MAX_MATRIX_SIZE};
