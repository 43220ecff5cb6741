//! Device-facing traits and handle types for streamed playback.
//!
//! The crate never talks to an audio backend directly. A backend implements
//! [`DeviceQueue`] for buffer queueing and [`VoicePool`] for handing out the
//! finite set of hardware voices, and the streaming core drives both.

use super::error::{DeviceError, DeviceResult};
use crate::error::{FormatError, FormatResult};
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Lowest sample rate accepted for streamed PCM.
pub const MIN_SAMPLE_RATE: u32 = 8_000;

/// Highest sample rate accepted for streamed PCM.
pub const MAX_SAMPLE_RATE: u32 = 48_000;

/// A hardware playback voice on loan from a [`VoicePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(NonZeroU32);

impl VoiceId {
    /// Wrap a raw backend voice id. Zero is never a valid voice.
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// The raw backend id.
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

/// A device-level buffer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

/// What the device reports about a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    /// The voice is consuming queued buffers.
    Playing,
    /// The voice is idle, either never started or ran out of queued data.
    Stopped,
}

/// Playback state of a streamed sound instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// No streaming session is running
    #[default]
    Stopped,
    /// The streaming driver is feeding the voice
    Playing,
}

impl PlaybackState {
    pub(crate) const fn as_u8(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::Playing => 1,
        }
    }

    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Playing,
            _ => Self::Stopped,
        }
    }
}

/// Channel layout of streamed PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum AudioChannels {
    /// One channel
    Mono,
    /// Two interleaved channels
    Stereo,
}

impl AudioChannels {
    /// Number of interleaved channels.
    pub const fn count(self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

impl TryFrom<u16> for AudioChannels {
    type Error = FormatError;

    fn try_from(channels: u16) -> FormatResult<Self> {
        match channels {
            1 => Ok(Self::Mono),
            2 => Ok(Self::Stereo),
            other => Err(FormatError::UnsupportedChannels(other)),
        }
    }
}

/// Device format tag for a queued buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum PcmFormat {
    /// Signed 16-bit mono
    Mono16,
    /// Signed 16-bit interleaved stereo
    Stereo16,
}

impl PcmFormat {
    /// Select the format tag for a channel layout.
    pub const fn for_channels(channels: AudioChannels) -> Self {
        match channels {
            AudioChannels::Mono => Self::Mono16,
            AudioChannels::Stereo => Self::Stereo16,
        }
    }

    /// Channel layout of this format.
    pub const fn channels(self) -> AudioChannels {
        match self {
            Self::Mono16 => AudioChannels::Mono,
            Self::Stereo16 => AudioChannels::Stereo,
        }
    }

    /// Size of one sample of one channel in bytes.
    pub const fn bytes_per_sample(self) -> usize {
        2
    }

    /// Size of one frame (one sample for every channel) in bytes.
    pub const fn block_align(self) -> usize {
        self.bytes_per_sample() * self.channels().count() as usize
    }

    /// Playback duration of `size_in_bytes` at `sample_rate`.
    ///
    /// Trailing bytes that do not fill a whole frame are ignored. Saturates
    /// at [`Duration::MAX`].
    pub fn sample_duration(self, size_in_bytes: usize, sample_rate: u32) -> Duration {
        if sample_rate == 0 {
            return Duration::ZERO;
        }
        let frames = (size_in_bytes / self.block_align()) as u128;
        let nanos = frames * 1_000_000_000 / sample_rate as u128;
        u64::try_from(nanos).map_or(Duration::MAX, Duration::from_nanos)
    }

    /// Number of bytes needed to hold `duration` of audio at `sample_rate`,
    /// rounded down to a whole frame. Saturates at `usize::MAX`.
    pub fn sample_size_in_bytes(self, duration: Duration, sample_rate: u32) -> usize {
        let frames = duration.as_nanos() * sample_rate as u128 / 1_000_000_000;
        usize::try_from(frames)
            .unwrap_or(usize::MAX)
            .saturating_mul(self.block_align())
    }
}

/// Check that `sample_rate` lies within [`MIN_SAMPLE_RATE`]..=[`MAX_SAMPLE_RATE`].
pub fn validate_sample_rate(sample_rate: u32) -> FormatResult<u32> {
    if (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
        Ok(sample_rate)
    } else {
        Err(FormatError::SampleRateOutOfRange {
            rate: sample_rate,
            min: MIN_SAMPLE_RATE,
            max: MAX_SAMPLE_RATE,
        })
    }
}

/// Buffer queue primitives of a playback device.
///
/// All calls are synchronous and are expected to return promptly; they are
/// made from both the submitting thread and the streaming driver task.
pub trait DeviceQueue: Send + Sync + 'static {
    /// Create a new device buffer object.
    fn generate_buffer(&self) -> BufferHandle;

    /// Upload `data` into `buffer` with the given format and rate.
    fn bind_data(&self, buffer: BufferHandle, data: &[u8], format: PcmFormat, sample_rate: u32);

    /// Destroy a device buffer object. Called once per buffer.
    fn delete_buffer(&self, buffer: BufferHandle);

    /// Append `buffer` to the queue of `voice`.
    fn submit(&self, voice: VoiceId, buffer: BufferHandle) -> DeviceResult<()>;

    /// Number of queued buffers `voice` has finished since they were last unqueued.
    fn poll_consumed_count(&self, voice: VoiceId) -> usize;

    /// Remove the oldest finished buffer from the queue of `voice`, returning its handle.
    fn unqueue(&self, voice: VoiceId) -> DeviceResult<BufferHandle>;

    /// Start (or keep) `voice` playing. Idempotent.
    fn play(&self, voice: VoiceId);

    /// Current state of `voice`.
    fn query_state(&self, voice: VoiceId) -> VoiceState;

    /// The most recent device error, if one is pending. Reading it clears it.
    fn last_error(&self) -> Option<DeviceError>;
}

/// The finite pool of hardware voices shared by every playing sound.
pub trait VoicePool: Send + Sync + 'static {
    /// Lend out a free voice, or `None` when every voice is in use.
    fn reserve(&self) -> Option<VoiceId>;

    /// Return a voice. The pool stops the voice and detaches anything still queued on it.
    fn recycle(&self, voice: VoiceId);
}
