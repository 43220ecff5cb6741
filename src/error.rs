//! Error types and result utilities for PCM format handling.

use thiserror::Error;

/// Convenience type alias for results that may contain a [`FormatError`].
pub type FormatResult<T> = Result<T, FormatError>;

/// Errors raised while validating PCM formats, submitted regions and configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Only mono and stereo 16-bit PCM can be streamed.
    #[error("Unsupported channel count: {0}, expected 1 (mono) or 2 (stereo)")]
    UnsupportedChannels(u16),

    /// The sample rate lies outside the range the device accepts.
    #[error("Sample rate {rate} Hz out of range, valid range: {min} to {max} Hz")]
    SampleRateOutOfRange {
        /// Requested rate.
        rate: u32,
        /// Lowest accepted rate.
        min: u32,
        /// Highest accepted rate.
        max: u32,
    },

    /// The byte count does not cover a whole number of sample frames.
    #[error("Buffer length {len} is not a multiple of the block alignment {block_align}")]
    MisalignedLength {
        /// Submitted length in bytes.
        len: usize,
        /// Size of one frame in bytes.
        block_align: usize,
    },

    /// `offset..offset + count` does not lie within the caller's buffer.
    ///
    /// This also covers an empty region.
    #[error("Invalid range: offset {offset} + count {count} exceeds buffer of {len} bytes")]
    InvalidRange {
        /// Start of the region in bytes.
        offset: usize,
        /// Length of the region in bytes.
        count: usize,
        /// Length of the caller's buffer.
        len: usize,
    },

    /// A configuration value is invalid.
    #[error("Invalid parameter error: {0}")]
    InvalidParameter(String),
}

impl FormatError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(details: impl Into<String>) -> Self {
        Self::InvalidParameter(details.into())
    }
}
