//! Tests for streaming functionality.
//!
//! The scenarios run against an in-memory device that behaves like a
//! buffer-queue audio API: submitted buffers wait in a queue, the test
//! decides when the device finishes them, and finished buffers stay on the
//! voice until they are unqueued.

use super::{DynamicSoundInstance, StreamConfig};
use crate::playback::{
    AudioChannels, BufferHandle, DeviceError, DeviceQueue, DeviceResult, PcmFormat, VoiceId,
    VoicePool, VoiceState,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

mod buffer_tests;

/// One `bind_data` call as the device saw it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BoundData {
    pub buffer: BufferHandle,
    pub data: Vec<u8>,
    pub format: PcmFormat,
    pub sample_rate: u32,
}

#[derive(Debug, Default)]
struct DeviceInner {
    next_handle: u32,
    generated: Vec<BufferHandle>,
    deleted: Vec<BufferHandle>,
    bound: Vec<BoundData>,
    submitted: Vec<(VoiceId, BufferHandle)>,
    queued: VecDeque<BufferHandle>,
    processed: VecDeque<BufferHandle>,
    phantom_processed: usize,
    playing: bool,
    play_calls: usize,
    fail_next_submit: Option<DeviceError>,
    corrupt_next_unqueue: bool,
    pending_error: Option<DeviceError>,
}

/// In-memory buffer-queue device.
#[derive(Debug, Default)]
pub(crate) struct MockDevice {
    inner: Mutex<DeviceInner>,
}

impl MockDevice {
    /// Finish up to `count` queued buffers. The voice stops when its queue runs dry.
    pub fn consume(&self, count: usize) -> usize {
        let mut inner = self.inner.lock();
        let mut finished = 0;
        while finished < count {
            let Some(buffer) = inner.queued.pop_front() else {
                break;
            };
            inner.processed.push_back(buffer);
            finished += 1;
        }
        if inner.queued.is_empty() {
            inner.playing = false;
        }
        finished
    }

    /// Stop the voice as if it had underrun, keeping its queue.
    pub fn force_stop(&self) {
        self.inner.lock().playing = false;
    }

    /// Make the next submit fail with `err`.
    pub fn fail_next_submit(&self, err: DeviceError) {
        self.inner.lock().fail_next_submit = Some(err);
    }

    /// Make the next unqueue hand back a handle nobody owns.
    pub fn corrupt_next_unqueue(&self) {
        self.inner.lock().corrupt_next_unqueue = true;
    }

    /// Report `count` more finished buffers than were ever queued.
    pub fn report_phantom(&self, count: usize) {
        self.inner.lock().phantom_processed += count;
    }

    pub fn generated(&self) -> Vec<BufferHandle> {
        self.inner.lock().generated.clone()
    }

    pub fn deleted(&self) -> Vec<BufferHandle> {
        self.inner.lock().deleted.clone()
    }

    pub fn bound(&self) -> Vec<BoundData> {
        self.inner.lock().bound.clone()
    }

    pub fn submitted(&self) -> Vec<(VoiceId, BufferHandle)> {
        self.inner.lock().submitted.clone()
    }

    pub fn queued_len(&self) -> usize {
        self.inner.lock().queued.len()
    }

    pub fn play_calls(&self) -> usize {
        self.inner.lock().play_calls
    }

    pub fn has_pending_error(&self) -> bool {
        self.inner.lock().pending_error.is_some()
    }
}

impl DeviceQueue for MockDevice {
    fn generate_buffer(&self) -> BufferHandle {
        let mut inner = self.inner.lock();
        inner.next_handle += 1;
        let buffer = BufferHandle(inner.next_handle);
        inner.generated.push(buffer);
        buffer
    }

    fn bind_data(&self, buffer: BufferHandle, data: &[u8], format: PcmFormat, sample_rate: u32) {
        self.inner.lock().bound.push(BoundData {
            buffer,
            data: data.to_vec(),
            format,
            sample_rate,
        });
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        self.inner.lock().deleted.push(buffer);
    }

    fn submit(&self, voice: VoiceId, buffer: BufferHandle) -> DeviceResult<()> {
        let mut inner = self.inner.lock();
        if let Some(err) = inner.fail_next_submit.take() {
            return Err(err);
        }
        inner.queued.push_back(buffer);
        inner.submitted.push((voice, buffer));
        Ok(())
    }

    fn poll_consumed_count(&self, _voice: VoiceId) -> usize {
        let inner = self.inner.lock();
        inner.processed.len() + inner.phantom_processed
    }

    fn unqueue(&self, voice: VoiceId) -> DeviceResult<BufferHandle> {
        let mut inner = self.inner.lock();
        if let Some(buffer) = inner.processed.pop_front() {
            if inner.corrupt_next_unqueue {
                inner.corrupt_next_unqueue = false;
                inner.pending_error = Some(DeviceError::InvalidBuffer(buffer));
                return Ok(BufferHandle(u32::MAX));
            }
            return Ok(buffer);
        }
        if inner.phantom_processed > 0 {
            inner.phantom_processed -= 1;
        }
        inner.pending_error = Some(DeviceError::NothingProcessed(voice));
        Err(DeviceError::NothingProcessed(voice))
    }

    fn play(&self, _voice: VoiceId) {
        let mut inner = self.inner.lock();
        inner.play_calls += 1;
        inner.playing = !inner.queued.is_empty();
    }

    fn query_state(&self, _voice: VoiceId) -> VoiceState {
        let inner = self.inner.lock();
        if inner.playing && !inner.queued.is_empty() {
            VoiceState::Playing
        } else {
            VoiceState::Stopped
        }
    }

    fn last_error(&self) -> Option<DeviceError> {
        self.inner.lock().pending_error.take()
    }
}

#[derive(Debug, Default)]
struct PoolInner {
    next: u32,
    in_use: Vec<VoiceId>,
    reserve_calls: usize,
    recycled: Vec<VoiceId>,
}

/// Voice pool with a fixed number of voices.
#[derive(Debug)]
pub(crate) struct MockPool {
    capacity: usize,
    inner: Mutex<PoolInner>,
}

impl MockPool {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(PoolInner::default()),
        }
    }

    pub fn reserve_calls(&self) -> usize {
        self.inner.lock().reserve_calls
    }

    pub fn recycled(&self) -> Vec<VoiceId> {
        self.inner.lock().recycled.clone()
    }

    pub fn in_use(&self) -> usize {
        self.inner.lock().in_use.len()
    }
}

impl VoicePool for MockPool {
    fn reserve(&self) -> Option<VoiceId> {
        let mut inner = self.inner.lock();
        inner.reserve_calls += 1;
        if inner.in_use.len() >= self.capacity {
            return None;
        }
        inner.next += 1;
        let voice = VoiceId::new(inner.next)?;
        inner.in_use.push(voice);
        Some(voice)
    }

    fn recycle(&self, voice: VoiceId) {
        let mut inner = self.inner.lock();
        inner.in_use.retain(|held| *held != voice);
        inner.recycled.push(voice);
    }
}

pub(crate) type TestInstance = DynamicSoundInstance<MockDevice, MockPool>;

/// Bytes in one test chunk: 2048 mono frames.
pub(crate) const CHUNK_BYTES: usize = 4096;

/// Mono 44.1 kHz with a short poll interval.
pub(crate) fn mono_config() -> StreamConfig {
    StreamConfig::new(44_100, AudioChannels::Mono).with_poll_interval(Some(Duration::from_millis(1)))
}

/// Create an instance over a fresh device and a pool of `voices` voices.
pub(crate) fn create_instance(
    config: StreamConfig,
    voices: usize,
) -> (TestInstance, Arc<MockDevice>, Arc<MockPool>) {
    let device = Arc::new(MockDevice::default());
    let pool = Arc::new(MockPool::with_capacity(voices));
    let sound = DynamicSoundInstance::new(Arc::clone(&device), Arc::clone(&pool), config)
        .expect("test config is valid");
    (sound, device, pool)
}

/// A chunk of recognisable PCM bytes.
pub(crate) fn create_chunk(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_add(seed)).collect()
}

/// Poll `condition` until it holds, yielding to the driver in between.
pub(crate) async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

/// Wait for the driver task to finish.
pub(crate) async fn wait_stopped(sound: &TestInstance) {
    tokio::time::timeout(Duration::from_secs(5), sound.stopped())
        .await
        .expect("streaming session should end");
}

/// Check that every generated device buffer was deleted exactly once.
pub(crate) fn assert_all_released_once(device: &MockDevice) {
    let mut generated = device.generated();
    let mut deleted = device.deleted();
    generated.sort_by_key(|buffer| buffer.0);
    deleted.sort_by_key(|buffer| buffer.0);
    assert_eq!(generated, deleted, "every buffer must be released exactly once");
}
