//! Error types for streaming operations.

use crate::error::FormatError;
use crate::playback::{BufferHandle, DeviceError, PlaybackState, VoiceId};

/// Streaming-specific error types.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StreamError {
    /// Every voice in the pool is in use
    #[error("Play limit exceeded: no free voice available")]
    PlayLimitExceeded,

    /// The device refused to queue a buffer
    #[error("Failed to queue {buffer} on {voice}: {source}")]
    DeviceQueueFailure {
        /// Voice the buffer was queued on
        voice: VoiceId,
        /// Buffer the device refused
        buffer: BufferHandle,
        /// What the device reported
        #[source]
        source: DeviceError,
    },

    /// The device reported a finished buffer the instance never queued
    #[error("Desynchronized: device reported {expected} consumed buffer(s) but none remain allocated")]
    Desynchronization {
        /// Consumed count the device reported in that poll
        expected: usize,
    },

    /// Unqueue returned something other than the oldest queued buffer
    #[error("Unqueue anomaly on {voice}: expected {expected}, device returned {actual:?}")]
    UnqueueAnomaly {
        /// Voice being drained
        voice: VoiceId,
        /// Oldest buffer in the allocated set
        expected: BufferHandle,
        /// What the device handed back, if anything
        actual: Option<BufferHandle>,
    },

    /// Submitted region or configuration is invalid
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Invalid playback state transition
    #[error("Invalid state transition from {from:?} to {to:?}")]
    InvalidState {
        /// State at the time of the request
        from: PlaybackState,
        /// Requested state
        to: PlaybackState,
    },

    /// No async runtime to host the streaming driver
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl StreamError {
    /// Create a device queue failure
    pub fn queue_failure(voice: VoiceId, buffer: BufferHandle, source: DeviceError) -> Self {
        Self::DeviceQueueFailure {
            voice,
            buffer,
            source,
        }
    }

    /// Create an invalid state transition error
    pub fn invalid_state(from: PlaybackState, to: PlaybackState) -> Self {
        Self::InvalidState { from, to }
    }

    /// Check if this is a recoverable error
    ///
    /// Recoverable errors leave the streaming session running or can be
    /// retried later without touching the instance.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::PlayLimitExceeded => true,
            Self::UnqueueAnomaly { .. } => true,
            Self::InvalidState { .. } => true,
            Self::DeviceQueueFailure { .. }
            | Self::Desynchronization { .. }
            | Self::Format(_)
            | Self::Runtime(_) => false,
        }
    }

    /// Check if this is a fatal error that should terminate the submission or session
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Check if this error indicates a device problem
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Self::DeviceQueueFailure { .. } | Self::UnqueueAnomaly { .. }
        )
    }
}

/// Result type for streaming operations
pub type StreamResult<T> = Result<T, StreamError>;
