//! The streaming driver: the background loop that keeps a voice fed.
//!
//! ```text
//! application ──submit──► allocated set ──► device queue
//!      ▲                                         │
//!      └── buffer needed ◄── driver ◄── poll ────┘
//!                              │
//!                              └──► recycler (processed set)
//! ```
//!
//! One driver task runs per session. It only observes `stop()` between
//! polls, so cancellation is cooperative. Teardown runs from a drop guard,
//! so it also happens when the task unwinds or is dropped.

use super::config::StarvationPolicy;
use super::error::{StreamError, StreamResult};
use super::stream::DynamicSoundInstance;
use crate::playback::{DeviceQueue, PlaybackState, VoiceId, VoicePool, VoiceState};
use std::sync::{Arc, atomic::Ordering};

impl<D: DeviceQueue, P: VoicePool> DynamicSoundInstance<D, P> {
    /// Run one streaming session to completion.
    pub(crate) async fn drive(self) {
        // Teardown runs on every exit path, unwinding included.
        let _session = SessionGuard { sound: &self };

        let shared = &self.shared;
        let depth = shared.config.target_buffer_depth;

        if shared.state() != PlaybackState::Playing {
            tracing::debug!("stopped before the session started");
            return;
        }

        // Give the application a chance to queue data before the voice starts.
        if shared.allocated.len() < depth {
            self.notify_buffer_needed();
        }

        let voice = match shared.voice.current() {
            Some(voice) if !shared.allocated.is_empty() => voice,
            _ => {
                tracing::debug!("nothing queued, ending session");
                return;
            }
        };

        if shared.state() != PlaybackState::Playing {
            tracing::debug!("stopped before the voice started");
            return;
        }

        shared.device.play(voice);

        while shared.state() == PlaybackState::Playing {
            if let Err(err) = self.reclaim_consumed(voice) {
                tracing::error!(%err, %voice, "streaming session desynchronized");
                shared
                    .counters
                    .desynchronizations
                    .fetch_add(1, Ordering::Relaxed);
                shared.set_state(PlaybackState::Stopped);
                break;
            }

            for _ in shared.allocated.len()..depth {
                self.notify_buffer_needed();
            }

            if shared.device.query_state(voice) == VoiceState::Stopped {
                if !shared.allocated.is_empty() {
                    tracing::debug!(
                        %voice,
                        allocated = shared.allocated.len(),
                        "voice ran dry, restarting"
                    );
                    shared
                        .counters
                        .underrun_restarts
                        .fetch_add(1, Ordering::Relaxed);
                    shared.device.play(voice);
                } else if shared.config.starvation_policy == StarvationPolicy::StopWhenDrained {
                    tracing::debug!(%voice, "queue drained, ending session");
                    shared.set_state(PlaybackState::Stopped);
                    break;
                }
            }

            match shared.config.poll_interval {
                Some(interval) => tokio::time::sleep(interval).await,
                None => tokio::task::yield_now().await,
            }
        }
    }

    /// Move every buffer the device has finished from the allocated set to the recycler.
    fn reclaim_consumed(&self, voice: VoiceId) -> StreamResult<usize> {
        let shared = &self.shared;
        let device = shared.device.as_ref();

        let consumed = device.poll_consumed_count(voice);
        for _ in 0..consumed {
            let buffer = match shared.allocated.pop_oldest() {
                Some(buffer) => buffer,
                None => {
                    // A submission holding the slot may have reached the
                    // device but not the allocated set yet.
                    drop(shared.voice.lock());
                    shared
                        .allocated
                        .pop_oldest()
                        .ok_or(StreamError::Desynchronization { expected: consumed })?
                }
            };
            shared.consume_pending(1);

            let expected = buffer.handle();
            match device.unqueue(voice) {
                Ok(actual) if actual == expected => {}
                outcome => {
                    let anomaly = StreamError::UnqueueAnomaly {
                        voice,
                        expected,
                        actual: outcome.ok(),
                    };
                    let device_error = device.last_error();
                    tracing::warn!(%anomaly, ?device_error, "failed to unqueue buffer");
                    shared
                        .counters
                        .unqueue_anomalies
                        .fetch_add(1, Ordering::Relaxed);
                }
            }

            shared.recycler.recycle(buffer);
            shared.counters.consumed.fetch_add(1, Ordering::Relaxed);
        }

        if consumed > 0 {
            tracing::trace!(
                %voice,
                consumed,
                pending = shared.pending(),
                allocated = shared.allocated.len(),
                "reclaimed buffers"
            );
        }
        Ok(consumed)
    }

    /// Raise one "buffer needed" notification on the calling task.
    fn notify_buffer_needed(&self) {
        self.shared
            .counters
            .notifications
            .fetch_add(1, Ordering::Relaxed);

        // Handlers may register further handlers, so call them outside the lock.
        let handlers = Arc::clone(&self.shared.handlers.read());
        for handler in handlers.iter() {
            handler(self);
        }
    }

    /// Return the voice, dispose every buffer and allow the next session to start.
    fn finish_session(&self) {
        let shared = &self.shared;
        shared.set_state(PlaybackState::Stopped);
        {
            let mut slot = shared.voice.lock();
            shared.release_all(&mut slot);
        }
        shared.session_active.store(false, Ordering::Release);
        tracing::debug!("streaming session ended");
    }
}

/// Runs [`DynamicSoundInstance::finish_session`] when dropped.
struct SessionGuard<'a, D: DeviceQueue, P: VoicePool> {
    sound: &'a DynamicSoundInstance<D, P>,
}

impl<D: DeviceQueue, P: VoicePool> Drop for SessionGuard<'_, D, P> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!("streaming driver panicked, tearing down session");
        }
        self.sound.finish_session();
    }
}
