//! Configuration for streamed playback instances.

use crate::error::{FormatError, FormatResult};
use crate::playback::{AudioChannels, PcmFormat, validate_sample_rate};
use std::time::Duration;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Number of buffers the driver keeps queued ahead of playback by default.
pub const DEFAULT_TARGET_BUFFER_DEPTH: usize = 3;

/// What the driver does when every queued buffer has been consumed and the
/// application supplied nothing new.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum StarvationPolicy {
    /// End the session once the device itself reports it has stopped
    #[default]
    StopWhenDrained,
    /// Keep polling and requesting data until stopped externally
    KeepAlive,
}

/// Configuration for a [`DynamicSoundInstance`](super::DynamicSoundInstance).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct StreamConfig {
    /// Sample rate of submitted data in Hz
    pub sample_rate: u32,

    /// Channel layout of submitted data
    pub channels: AudioChannels,

    /// Number of buffers to keep queued ahead of playback
    pub target_buffer_depth: usize,

    /// Delay between device polls; `None` only yields to the scheduler
    pub poll_interval: Option<Duration>,

    /// Behaviour when the queue runs dry
    pub starvation_policy: StarvationPolicy,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: AudioChannels::Stereo,
            target_buffer_depth: DEFAULT_TARGET_BUFFER_DEPTH,
            poll_interval: Some(Duration::from_millis(1)),
            starvation_policy: StarvationPolicy::StopWhenDrained,
        }
    }
}

impl StreamConfig {
    /// Create a configuration for the given rate and layout.
    pub fn new(sample_rate: u32, channels: AudioChannels) -> Self {
        Self {
            sample_rate,
            channels,
            ..Self::default()
        }
    }

    /// Busy-poll the device, yielding between polls instead of sleeping.
    pub fn low_latency() -> Self {
        Self {
            poll_interval: None,
            ..Self::default()
        }
    }

    /// Deeper queue and a relaxed poll interval for background audio.
    pub fn power_saving() -> Self {
        Self {
            target_buffer_depth: 4,
            poll_interval: Some(Duration::from_millis(10)),
            ..Self::default()
        }
    }

    /// Set the target buffer depth.
    pub fn with_target_buffer_depth(mut self, depth: usize) -> Self {
        self.target_buffer_depth = depth;
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the starvation policy.
    pub fn with_starvation_policy(mut self, policy: StarvationPolicy) -> Self {
        self.starvation_policy = policy;
        self
    }

    /// Format tag for the configured channel layout.
    pub fn format(&self) -> PcmFormat {
        PcmFormat::for_channels(self.channels)
    }

    /// Check the configuration for values the driver cannot work with.
    pub fn validate(&self) -> FormatResult<()> {
        validate_sample_rate(self.sample_rate)?;
        if self.target_buffer_depth == 0 {
            return Err(FormatError::invalid_parameter(
                "target_buffer_depth must be at least 1",
            ));
        }
        Ok(())
    }
}
