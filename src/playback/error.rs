//! Error types reported by playback device backends.

use super::traits::{BufferHandle, VoiceId};

/// Errors a [`DeviceQueue`](super::DeviceQueue) backend reports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The backend rejected an operation with its own error code
    #[error("Backend error: {backend} - {details}")]
    Backend {
        /// Name of the backend
        backend: &'static str,
        /// Backend-specific description
        details: String,
    },

    /// The buffer handle is unknown to the device
    #[error("Invalid buffer handle: {0}")]
    InvalidBuffer(BufferHandle),

    /// The voice is unknown to the device or not owned by the caller
    #[error("Invalid voice: {0}")]
    InvalidVoice(VoiceId),

    /// An unqueue was requested but the voice has no finished buffer
    #[error("No processed buffer to unqueue on {0}")]
    NothingProcessed(VoiceId),

    /// The device is out of memory for buffer data
    #[error("Device out of memory: {0}")]
    OutOfMemory(String),
}

impl DeviceError {
    /// Create a backend error
    pub fn backend(backend: &'static str, details: impl Into<String>) -> Self {
        Self::Backend {
            backend,
            details: details.into(),
        }
    }

    /// Check if this error concerns a handle rather than the device itself
    pub fn is_handle_error(&self) -> bool {
        matches!(self, Self::InvalidBuffer(_) | Self::InvalidVoice(_))
    }
}

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;
