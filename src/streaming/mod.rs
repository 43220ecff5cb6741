//! Continuous streaming of application-supplied PCM to one playback voice.
//!
//! This module provides:
//! - A recycling pool of device buffers so steady-state streaming does not allocate
//! - A submission path that copies caller data and queues it on a lazily reserved voice
//! - A background driver that reclaims finished buffers, asks for more data
//!   and restarts the voice after an underrun
//!
//! # Features
//!
//! - **Lock-free hand-off**: submitted and reclaimed buffers move through
//!   `crossbeam` queues shared by the submitting thread and the driver task
//! - **Exact accounting**: the pending buffer count always matches what the
//!   device still has to play
//! - **Clean shutdown**: every session ends by returning its voice and
//!   disposing every buffer exactly once, whatever ended it
//!
//! # Example
//!
//! ```rust,ignore
//! use dynamic_sound::streaming::*;
//! use dynamic_sound::playback::AudioChannels;
//!
//! let sound = DynamicSoundInstance::new(device, pool, StreamConfig::new(44_100, AudioChannels::Mono))?;
//! sound.on_buffer_needed(move |sound| {
//!     let _ = sound.submit_samples(&next_chunk());
//! });
//! sound.play()?;
//! // ...
//! sound.stop();
//! sound.stopped().await;
//! ```

pub mod buffers;
pub mod config;
mod driver;
pub mod error;
pub mod stream;
pub mod voice;

#[cfg(test)]
mod tests;

// Re-export main types for convenience
pub use error::{StreamError, StreamResult};

pub use stream::{BufferNeededHandler, DynamicSoundInstance, SessionStats};

pub use config::{DEFAULT_TARGET_BUFFER_DEPTH, StarvationPolicy, StreamConfig};

pub use buffers::{AllocatedSet, BufferRecycler, PlaybackBuffer, RecyclerStats};

pub use voice::VoiceSlot;
