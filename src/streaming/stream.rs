//! The streamed sound instance and its submission path.

use super::{
    buffers::{AllocatedSet, BufferRecycler},
    config::StreamConfig,
    error::{StreamError, StreamResult},
    voice::{VoiceGuard, VoiceSlot},
};
use crate::error::FormatError;
use crate::playback::{DeviceQueue, PcmFormat, PlaybackState, VoiceId, VoicePool};
use parking_lot::{Mutex, RwLock};
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU8, AtomicU64, AtomicUsize, Ordering},
};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handler invoked whenever the driver wants another buffer.
///
/// Handlers run synchronously on the driver task and are expected to call
/// one of the submission methods and return promptly.
pub type BufferNeededHandler<D, P> = Arc<dyn Fn(&DynamicSoundInstance<D, P>) + Send + Sync>;

/// A sound whose PCM data is supplied chunk by chunk while it plays.
///
/// The instance keeps up to [`StreamConfig::target_buffer_depth`] buffers
/// queued on one voice. Once [`play`](Self::play) is called a driver task
/// polls the device, recycles finished buffers and raises "buffer needed"
/// notifications so the application can submit the next chunk.
///
/// Cloning is cheap and every clone refers to the same instance. Handlers
/// receive the instance as an argument and should not capture a clone of it.
///
/// # Example
///
/// ```rust,ignore
/// let sound = DynamicSoundInstance::new(device, pool, StreamConfig::new(44_100, AudioChannels::Mono))?;
/// sound.on_buffer_needed(move |sound| {
///     let chunk = synth.next_chunk();
///     if let Err(err) = sound.submit_buffer(&chunk) {
///         tracing::warn!(%err, "dropped chunk");
///     }
/// });
/// sound.play()?;
/// ```
pub struct DynamicSoundInstance<D: DeviceQueue, P: VoicePool> {
    pub(crate) shared: Arc<Shared<D, P>>,
}

impl<D: DeviceQueue, P: VoicePool> Clone for DynamicSoundInstance<D, P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// State shared between the submitting side and the driver task.
pub(crate) struct Shared<D: DeviceQueue, P: VoicePool> {
    pub(crate) device: Arc<D>,
    pub(crate) pool: Arc<P>,
    pub(crate) config: StreamConfig,
    pub(crate) allocated: AllocatedSet,
    pub(crate) recycler: BufferRecycler,
    pub(crate) voice: VoiceSlot,
    pending: AtomicUsize,
    state: AtomicU8,
    pub(crate) session_active: AtomicBool,
    pub(crate) handlers: RwLock<Arc<[BufferNeededHandler<D, P>]>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    pub(crate) counters: SessionCounters,
}

impl<D: DeviceQueue, P: VoicePool> Shared<D, P> {
    pub(crate) fn state(&self) -> PlaybackState {
        PlaybackState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: PlaybackState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Decrement the pending count, never below zero.
    pub(crate) fn consume_pending(&self, count: usize) {
        // The closure never declines, so the update always succeeds.
        self.pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
                Some(pending.saturating_sub(count))
            })
            .ok();
    }

    /// Return the voice and dispose every buffer the instance still owns.
    ///
    /// The caller holds the voice slot so no submission can interleave.
    pub(crate) fn release_all(&self, slot: &mut VoiceGuard<'_>) {
        slot.release(self.pool.as_ref());

        let device = self.device.as_ref();
        let mut released = 0usize;
        for buffer in self.allocated.drain() {
            buffer.release(device);
            released += 1;
        }
        for buffer in self.recycler.drain() {
            buffer.release(device);
            released += 1;
        }
        self.pending.store(0, Ordering::Release);

        if released > 0 {
            tracing::debug!(released, "disposed playback buffers");
        }
    }
}

impl<D: DeviceQueue, P: VoicePool> Drop for Shared<D, P> {
    fn drop(&mut self) {
        let mut slot = self.voice.lock();
        self.release_all(&mut slot);
    }
}

impl<D: DeviceQueue, P: VoicePool> DynamicSoundInstance<D, P> {
    /// Create a new instance streaming through `device` with voices from `pool`.
    pub fn new(device: Arc<D>, pool: Arc<P>, config: StreamConfig) -> StreamResult<Self> {
        config.validate()?;

        Ok(Self {
            shared: Arc::new(Shared {
                device,
                pool,
                config,
                allocated: AllocatedSet::new(),
                recycler: BufferRecycler::new(),
                voice: VoiceSlot::new(),
                pending: AtomicUsize::new(0),
                state: AtomicU8::new(PlaybackState::Stopped.as_u8()),
                session_active: AtomicBool::new(false),
                handlers: RwLock::new(Arc::from(Vec::new())),
                driver: Mutex::new(None),
                counters: SessionCounters::default(),
            }),
        })
    }

    /// Get the instance configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.shared.config
    }

    /// Format tag used by the submission helpers.
    pub fn format(&self) -> PcmFormat {
        self.shared.config.format()
    }

    /// Register a handler for "buffer needed" notifications.
    pub fn on_buffer_needed<F>(&self, handler: F)
    where
        F: Fn(&Self) + Send + Sync + 'static,
    {
        let handler: BufferNeededHandler<D, P> = Arc::new(handler);
        let mut handlers = self.shared.handlers.write();
        let updated: Arc<[_]> = handlers.iter().cloned().chain([handler]).collect();
        *handlers = updated;
    }

    /// Remove every registered "buffer needed" handler.
    pub fn clear_buffer_needed_handlers(&self) {
        *self.shared.handlers.write() = Arc::from(Vec::new());
    }

    /// Copy `data[offset..offset + count]` into a recycled or new buffer and
    /// queue it on this instance's voice.
    ///
    /// The first submission after a full stop reserves a voice; when the
    /// pool has none left this fails with [`StreamError::PlayLimitExceeded`]
    /// and nothing changes. A device rejection fails with
    /// [`StreamError::DeviceQueueFailure`] and the buffer goes back to the
    /// pool. The caller's slice is never retained.
    pub fn queue_data_buffer(
        &self,
        data: &[u8],
        offset: usize,
        count: usize,
        format: PcmFormat,
        sample_rate: u32,
    ) -> StreamResult<()> {
        let chunk = offset
            .checked_add(count)
            .and_then(|end| data.get(offset..end))
            .ok_or(FormatError::InvalidRange {
                offset,
                count,
                len: data.len(),
            })?;

        let shared = &self.shared;
        let device = shared.device.as_ref();

        let mut slot = shared.voice.lock();
        let fresh_voice = !slot.is_held();
        let voice = match slot.ensure(shared.pool.as_ref()) {
            Ok(voice) => voice,
            Err(err) => {
                tracing::warn!(%err, "no voice available for submission");
                return Err(err);
            }
        };

        let mut buffer = shared.recycler.acquire(device);
        buffer.assign_voice(voice);
        buffer.bind(device, chunk, format, sample_rate);

        if let Err(source) = device.submit(voice, buffer.handle()) {
            let err = StreamError::queue_failure(voice, buffer.handle(), source);
            tracing::error!(%err, "failed to queue buffer");
            shared.recycler.recycle(buffer);
            if fresh_voice && shared.allocated.is_empty() {
                slot.release(shared.pool.as_ref());
            }
            return Err(err);
        }

        // Counted before it becomes visible so allocated never exceeds pending.
        shared.pending.fetch_add(1, Ordering::AcqRel);
        tracing::trace!(
            %voice,
            buffer = %buffer.handle(),
            size = buffer.size(),
            pending = shared.pending(),
            "queued buffer"
        );
        shared.allocated.push(buffer);
        shared.counters.submitted.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }

    /// Submit a whole buffer in the instance's format.
    pub fn submit_buffer(&self, data: &[u8]) -> StreamResult<()> {
        self.submit_buffer_range(data, 0, data.len())
    }

    /// Submit `count` bytes of `data` starting at `offset`.
    ///
    /// The region must be non-empty, lie within `data`, and cover a whole
    /// number of sample frames.
    pub fn submit_buffer_range(&self, data: &[u8], offset: usize, count: usize) -> StreamResult<()> {
        let out_of_range = offset
            .checked_add(count)
            .is_none_or(|end| end > data.len());
        if count == 0 || out_of_range {
            return Err(FormatError::InvalidRange {
                offset,
                count,
                len: data.len(),
            }
            .into());
        }

        let format = self.format();
        let block_align = format.block_align();
        if count % block_align != 0 {
            return Err(FormatError::MisalignedLength {
                len: count,
                block_align,
            }
            .into());
        }

        self.queue_data_buffer(data, offset, count, format, self.shared.config.sample_rate)
    }

    /// Submit interleaved 16-bit samples in native byte order.
    pub fn submit_samples(&self, samples: &[i16]) -> StreamResult<()> {
        self.submit_buffer(bytemuck::cast_slice(samples))
    }

    /// Start streaming.
    ///
    /// Spawns the driver task on the current tokio runtime. Calling this
    /// while a session is playing does nothing; calling it while a stopped
    /// session is still cleaning up is rejected.
    pub fn play(&self) -> StreamResult<()> {
        let shared = &self.shared;
        if shared
            .session_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return match shared.state() {
                PlaybackState::Playing => Ok(()),
                PlaybackState::Stopped => Err(StreamError::invalid_state(
                    PlaybackState::Stopped,
                    PlaybackState::Playing,
                )),
            };
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                shared.session_active.store(false, Ordering::Release);
                return Err(StreamError::Runtime(err.to_string()));
            }
        };

        shared.set_state(PlaybackState::Playing);
        shared.counters.sessions.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            allocated = shared.allocated.len(),
            pending = shared.pending(),
            "starting streaming session"
        );

        let handle = runtime.spawn(self.clone().drive());
        *shared.driver.lock() = Some(handle);
        Ok(())
    }

    /// Request the session to stop.
    ///
    /// The driver notices on its next iteration, then returns the voice and
    /// disposes every buffer. Await [`stopped`](Self::stopped) to wait for that.
    pub fn stop(&self) {
        if self.shared.state() == PlaybackState::Playing {
            tracing::debug!("stop requested");
        }
        self.shared.set_state(PlaybackState::Stopped);
    }

    /// Wait until the current driver task, if any, has finished its cleanup.
    pub async fn stopped(&self) {
        let handle = self.shared.driver.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                tracing::error!(%err, "streaming driver task failed");
            }
        }
    }

    /// Current playback state.
    pub fn state(&self) -> PlaybackState {
        self.shared.state()
    }

    /// Check if a session is playing.
    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    /// Buffers submitted to the device and not yet reported consumed.
    pub fn pending_buffer_count(&self) -> usize {
        self.shared.pending()
    }

    /// Buffers in the allocated set.
    pub fn allocated_count(&self) -> usize {
        self.shared.allocated.len()
    }

    /// Buffers reclaimed and waiting for reuse.
    pub fn processed_count(&self) -> usize {
        self.shared.recycler.len()
    }

    /// The voice currently held.
    pub fn voice(&self) -> Option<VoiceId> {
        self.shared.voice.current()
    }

    /// Check if a voice is held.
    pub fn has_voice(&self) -> bool {
        self.shared.voice.is_held()
    }

    /// Playback duration of `size_in_bytes` in this instance's format.
    pub fn sample_duration(&self, size_in_bytes: usize) -> Duration {
        self.format()
            .sample_duration(size_in_bytes, self.shared.config.sample_rate)
    }

    /// Bytes needed for `duration` of audio in this instance's format.
    pub fn sample_size_in_bytes(&self, duration: Duration) -> usize {
        self.format()
            .sample_size_in_bytes(duration, self.shared.config.sample_rate)
    }

    /// Snapshot of the instance's counters.
    pub fn stats(&self) -> SessionStats {
        let counters = &self.shared.counters;
        let recycler = self.shared.recycler.stats();
        SessionStats {
            sessions: counters.sessions.load(Ordering::Relaxed),
            buffers_submitted: counters.submitted.load(Ordering::Relaxed),
            buffers_consumed: counters.consumed.load(Ordering::Relaxed),
            pool_hits: recycler.hits,
            pool_misses: recycler.misses,
            notifications: counters.notifications.load(Ordering::Relaxed),
            underrun_restarts: counters.underrun_restarts.load(Ordering::Relaxed),
            unqueue_anomalies: counters.unqueue_anomalies.load(Ordering::Relaxed),
            desynchronizations: counters.desynchronizations.load(Ordering::Relaxed),
        }
    }
}

/// Live counters behind [`SessionStats`].
#[derive(Debug, Default)]
pub(crate) struct SessionCounters {
    pub(crate) sessions: AtomicU64,
    pub(crate) submitted: AtomicU64,
    pub(crate) consumed: AtomicU64,
    pub(crate) notifications: AtomicU64,
    pub(crate) underrun_restarts: AtomicU64,
    pub(crate) unqueue_anomalies: AtomicU64,
    pub(crate) desynchronizations: AtomicU64,
}

/// Statistics for monitoring a streamed instance over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Streaming sessions started
    pub sessions: u64,
    /// Buffers accepted by the device
    pub buffers_submitted: u64,
    /// Buffers the device reported finished
    pub buffers_consumed: u64,
    /// Submissions served by a recycled buffer
    pub pool_hits: u64,
    /// Submissions that created a device buffer
    pub pool_misses: u64,
    /// "Buffer needed" notifications raised
    pub notifications: u64,
    /// Times the voice was restarted after running dry
    pub underrun_restarts: u64,
    /// Unqueue calls that returned an unexpected buffer or failed
    pub unqueue_anomalies: u64,
    /// Sessions ended because the device and the allocated set disagreed
    pub desynchronizations: u64,
}
