//! Lazily acquired voice ownership.

use super::error::{StreamError, StreamResult};
use crate::playback::{VoiceId, VoicePool};
use parking_lot::{Mutex, MutexGuard};

/// The single voice an instance holds while it has buffers on the device.
///
/// The voice is reserved on the first submission after a full stop and
/// returned to the pool exactly once when the session ends. The slot lock
/// also serializes submissions so the device queue and the allocated set
/// see buffers in the same order.
#[derive(Debug, Default)]
pub struct VoiceSlot {
    voice: Mutex<Option<VoiceId>>,
}

impl VoiceSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The voice currently held, if any.
    pub fn current(&self) -> Option<VoiceId> {
        *self.voice.lock()
    }

    /// Check if a voice is held.
    pub fn is_held(&self) -> bool {
        self.voice.lock().is_some()
    }

    /// Lock the slot.
    pub(crate) fn lock(&self) -> VoiceGuard<'_> {
        VoiceGuard {
            slot: self.voice.lock(),
        }
    }
}

/// Exclusive access to a [`VoiceSlot`] for one submission or one cleanup.
pub(crate) struct VoiceGuard<'a> {
    slot: MutexGuard<'a, Option<VoiceId>>,
}

impl VoiceGuard<'_> {
    /// The held voice, reserving one from `pool` if none is held yet.
    pub(crate) fn ensure<P: VoicePool>(&mut self, pool: &P) -> StreamResult<VoiceId> {
        if let Some(voice) = *self.slot {
            return Ok(voice);
        }
        let voice = pool.reserve().ok_or(StreamError::PlayLimitExceeded)?;
        tracing::debug!(%voice, "voice reserved");
        *self.slot = Some(voice);
        Ok(voice)
    }

    /// Check if a voice is held.
    pub(crate) fn is_held(&self) -> bool {
        self.slot.is_some()
    }

    /// Give the voice back to `pool`. Returns the voice that was released.
    pub(crate) fn release<P: VoicePool>(&mut self, pool: &P) -> Option<VoiceId> {
        let voice = self.slot.take()?;
        pool.recycle(voice);
        tracing::debug!(%voice, "voice returned to pool");
        Some(voice)
    }
}
