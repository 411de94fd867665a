//! Error type shared by every pixel operation.
//!
//! All validation happens before the first pixel is touched, so an `Err`
//! always means the destination buffer is unchanged.

use crate::bitmap::PixelFormat;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad kernel size, mismatched dimensions, empty or malformed buffer
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Pixel format outside the supported set of the requested operation
    #[error("{operation}: unsupported pixel format {format:?}")]
    UnsupportedFormat {
        format: PixelFormat,
        operation: &'static str,
    },

    /// Declared but deliberately unimplemented conversion
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("frame worker panicked")]
    WorkerPanicked,
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn unsupported(format: PixelFormat, operation: &'static str) -> Self {
        Error::UnsupportedFormat { format, operation }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
