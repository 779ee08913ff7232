//! Error types for tone-core.
//!
//! Most of this crate is total: malformed colors become black, out-of-range
//! parameters are clamped. Errors are reserved for malformed pixel buffers
//! supplied by the host and for the optional codec bridge.

use thiserror::Error;

/// Result type alias using [`ToneError`].
pub type ToneResult<T> = std::result::Result<T, ToneError>;

/// Errors raised by tone-core.
#[derive(Debug, Error)]
pub enum ToneError {
    /// Pixel buffer length does not match its declared dimensions.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        /// Bytes required by the dimensions
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },

    /// Zero-sized image.
    #[error("invalid dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),

    /// Container encoding failed.
    #[error("encode failed: {0}")]
    Encode(String),

    /// Container decoding failed.
    #[error("decode failed: {0}")]
    Decode(String),
}
