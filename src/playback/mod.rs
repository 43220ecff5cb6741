//! Playback device abstraction consumed by the streaming core.
//!
//! This module defines the seams to an audio backend:
//! - [`DeviceQueue`]: buffer creation, data binding, queue/unqueue/play primitives
//! - [`VoicePool`]: the finite pool of hardware voices shared across sounds
//! - [`PcmFormat`] and [`AudioChannels`]: format tags and frame arithmetic
//!
//! # Example
//!
//! ```rust,ignore
//! use dynamic_sound::playback::*;
//!
//! struct AlDevice { /* backend context */ }
//!
//! impl DeviceQueue for AlDevice {
//!     fn generate_buffer(&self) -> BufferHandle { /* alGenBuffers */ }
//!     fn submit(&self, voice: VoiceId, buffer: BufferHandle) -> DeviceResult<()> {
//!         /* alSourceQueueBuffers, then check the error state */
//!     }
//!     // ...
//! }
//! ```

pub mod error;
pub mod traits;

pub use error::{DeviceError, DeviceResult};

pub use traits::{
    AudioChannels, BufferHandle, DeviceQueue, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE, PcmFormat,
    PlaybackState, VoiceId, VoicePool, VoiceState, validate_sample_rate,
};
