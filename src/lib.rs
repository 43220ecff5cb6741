// Correctness and logic
#![warn(clippy::unit_cmp)] // Detects comparing unit types
#![warn(clippy::match_same_arms)]
// Duplicate match arms

// Performance-focused
#![warn(clippy::inefficient_to_string)] // `format!("{}", x)` vs `x.to_string()`
#![warn(clippy::map_clone)] // Cloning inside `map()` unnecessarily
#![warn(clippy::unnecessary_to_owned)] // Detects redundant `.to_owned()` or `.clone()`
#![warn(clippy::box_collection)] // Warns on boxed `Vec`, `String`, etc.
#![warn(clippy::needless_collect)] // Avoids `.collect().iter()` chains

// Style and idiomatic Rust
#![warn(clippy::redundant_clone)] // Detects unnecessary `.clone()`
#![warn(clippy::needless_return)] // Avoids `return` at the end of functions
#![warn(clippy::let_unit_value)] // Avoids binding `()` to variables
#![warn(clippy::manual_map)] // Use `.map()` instead of manual `match`
#![warn(clippy::unwrap_used)] // Avoids using `unwrap()`

// Maintainability
#![warn(clippy::missing_panics_doc)] // Docs for functions that might panic
#![warn(clippy::missing_safety_doc)] // Docs for `unsafe` functions
#![deny(missing_docs)] // Documentation is a must for release

//! # dynamic_sound
//!
//! Continuous streaming playback of PCM audio that the application supplies
//! chunk by chunk while it plays.
//!
//! ## Overview
//!
//! A [`DynamicSoundInstance`] keeps a small number of device buffers queued
//! on a single hardware voice. The application submits raw 16-bit PCM; a
//! background driver task polls the device, recycles the buffers it has
//! finished with, and raises "buffer needed" notifications so the
//! application can top the queue back up. When the device runs dry while
//! data is still queued the driver restarts it.
//!
//! The crate does not talk to audio hardware itself. A backend implements
//! [`DeviceQueue`] (buffer objects and queue/unqueue/play primitives) and
//! [`VoicePool`] (the finite set of hardware voices shared by every sound).
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! dynamic_sound = "0.1"
//! ```
//!
//! Enable `serialization` to derive `serde` traits on configuration types.
//!
//! ## Error Handling
//!
//! Submission errors are returned synchronously:
//!
//! ```rust,ignore
//! use dynamic_sound::{StreamError, FormatError};
//!
//! match sound.submit_buffer(&chunk) {
//!     Ok(()) => {}
//!     Err(StreamError::PlayLimitExceeded) => eprintln!("all voices busy, try later"),
//!     Err(StreamError::Format(FormatError::MisalignedLength { .. })) => eprintln!("partial frame"),
//!     Err(other) => eprintln!("submission failed: {other}"),
//! }
//! ```
//!
//! Errors inside the driver never reach the caller. An underrun is healed by
//! restarting the voice, an unqueue mismatch is logged and counted, and a
//! desynchronization between the device and the instance ends the session.
//! Every session ends by returning its voice and disposing all buffers.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dynamic_sound::{AudioChannels, DynamicSoundInstance, StreamConfig};
//! use std::sync::Arc;
//!
//! let sound = DynamicSoundInstance::new(
//!     Arc::new(device),
//!     Arc::new(voices),
//!     StreamConfig::new(44_100, AudioChannels::Mono),
//! )?;
//!
//! sound.on_buffer_needed(|sound| {
//!     let chunk = render_next_chunk();
//!     if let Err(err) = sound.submit_samples(&chunk) {
//!         tracing::warn!(%err, "chunk dropped");
//!     }
//! });
//!
//! sound.play()?;
//! ```
//!
//! ## Logging
//!
//! The crate logs through `tracing`; install any subscriber to see session
//! starts and stops (`debug`), per-buffer activity (`trace`) and device
//! anomalies (`warn`/`error`).

mod error;

pub mod playback;
pub mod streaming;

pub use crate::error::{FormatError, FormatResult};

pub use crate::playback::{
    AudioChannels, BufferHandle, DeviceError, DeviceQueue, DeviceResult, PcmFormat, PlaybackState,
    VoiceId, VoicePool, VoiceState,
};

pub use crate::streaming::{
    DynamicSoundInstance, SessionStats, StarvationPolicy, StreamConfig, StreamError, StreamResult,
};
