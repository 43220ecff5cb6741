//! Buffer management for streamed playback.
//!
//! Buffers move between two lock-free sets: the [`AllocatedSet`] holds what
//! is queued on the device in submission order, and the [`BufferRecycler`]
//! holds what the device has finished with and can be rebound.

use crate::playback::{BufferHandle, DeviceQueue, PcmFormat, VoiceId};
use crossbeam::queue::SegQueue;
use std::sync::atomic::{AtomicU64, Ordering};

/// One device-bound chunk of PCM data.
///
/// The buffer owns its copy of the data. It is released through
/// [`PlaybackBuffer::release`], which consumes it, so a buffer can only ever
/// be disposed once.
#[derive(Debug)]
pub struct PlaybackBuffer {
    handle: BufferHandle,
    voice: Option<VoiceId>,
    data: Vec<u8>,
    format: PcmFormat,
    sample_rate: u32,
}

impl PlaybackBuffer {
    fn new(handle: BufferHandle) -> Self {
        Self {
            handle,
            voice: None,
            data: Vec::new(),
            format: PcmFormat::Mono16,
            sample_rate: 0,
        }
    }

    /// Device handle of this buffer.
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    /// Voice the buffer was last queued on.
    pub fn voice(&self) -> Option<VoiceId> {
        self.voice
    }

    /// Size of the bound data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Sample rate of the bound data.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Format tag of the bound data.
    pub fn format(&self) -> PcmFormat {
        self.format
    }

    /// The private copy of the bound data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn assign_voice(&mut self, voice: VoiceId) {
        self.voice = Some(voice);
    }

    /// Copy `chunk` into this buffer and upload it to the device.
    ///
    /// The previous allocation is reused, so recycled buffers do not
    /// allocate unless the chunk outgrows them.
    pub(crate) fn bind<D: DeviceQueue>(
        &mut self,
        device: &D,
        chunk: &[u8],
        format: PcmFormat,
        sample_rate: u32,
    ) {
        self.data.clear();
        self.data.extend_from_slice(chunk);
        self.format = format;
        self.sample_rate = sample_rate;
        device.bind_data(self.handle, &self.data, format, sample_rate);
    }

    /// Destroy the device buffer.
    pub(crate) fn release<D: DeviceQueue>(self, device: &D) {
        tracing::trace!(buffer = %self.handle, "releasing playback buffer");
        device.delete_buffer(self.handle);
    }
}

/// Buffers currently queued on the device, oldest first.
///
/// Entries are only removed after the device reports them consumed, so the
/// front of the set is always the next buffer the device will finish.
#[derive(Debug, Default)]
pub struct AllocatedSet {
    queue: SegQueue<PlaybackBuffer>,
}

impl AllocatedSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a buffer that has just been queued on the device.
    pub fn push(&self, buffer: PlaybackBuffer) {
        self.queue.push(buffer);
    }

    /// Remove the oldest queued buffer (non-blocking).
    pub fn pop_oldest(&self) -> Option<PlaybackBuffer> {
        self.queue.pop()
    }

    /// Number of buffers currently queued.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Remove every buffer, oldest first.
    pub fn drain(&self) -> impl Iterator<Item = PlaybackBuffer> + '_ {
        std::iter::from_fn(move || self.queue.pop())
    }
}

/// Pool of buffers reclaimed from the device and available for reuse.
///
/// Order is irrelevant; the pool only needs non-blocking push and try-pop.
#[derive(Debug, Default)]
pub struct BufferRecycler {
    processed: SegQueue<PlaybackBuffer>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl BufferRecycler {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a reclaimed buffer, or create a fresh one on the device when the pool is empty.
    pub fn acquire<D: DeviceQueue>(&self, device: &D) -> PlaybackBuffer {
        match self.processed.pop() {
            Some(buffer) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                buffer
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let buffer = PlaybackBuffer::new(device.generate_buffer());
                tracing::trace!(buffer = %buffer.handle, "created playback buffer");
                buffer
            }
        }
    }

    /// Return a buffer to the pool.
    pub fn recycle(&self, buffer: PlaybackBuffer) {
        self.processed.push(buffer);
    }

    /// Number of buffers available for reuse.
    pub fn len(&self) -> usize {
        self.processed.len()
    }

    /// Check if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }

    /// Remove every pooled buffer.
    pub fn drain(&self) -> impl Iterator<Item = PlaybackBuffer> + '_ {
        std::iter::from_fn(move || self.processed.pop())
    }

    /// Get pool statistics.
    pub fn stats(&self) -> RecyclerStats {
        RecyclerStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            available: self.processed.len(),
        }
    }
}

/// Statistics about buffer reuse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecyclerStats {
    /// Acquisitions served from the pool
    pub hits: u64,
    /// Acquisitions that created a new device buffer
    pub misses: u64,
    /// Buffers currently pooled
    pub available: usize,
}

impl RecyclerStats {
    /// Fraction of acquisitions served from the pool (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
