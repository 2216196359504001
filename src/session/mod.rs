//! Streaming Session
//!
//! The root component of the engine: owns one [`BufferPool`] and one
//! [`PlaybackState`], manages the device-voice lifecycle, and is the only
//! component that talks to the native device and to the coordinator
//! supplying sample data.
//!
//! Per audio tick the producer calls
//! [`calculate_samples_needed`](StreamingSession::calculate_samples_needed),
//! fills a block with that many fresh frames, and hands it to
//! [`write_samples`](StreamingSession::write_samples). Neither call blocks:
//! both only read device-maintained counters and issue non-blocking
//! submissions. Exactly one producer thread drives a session.

pub mod deficit;

pub use deficit::{DeficitEstimate, PlaybackState};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::coordinator::AudioCoordinator;
use crate::device::{AudioBackend, OutputVoice};
use crate::pool::BufferPool;
use crate::{Result, SoundOutError};

/// A read-only view of interleaved 16-bit PCM with a frame count.
///
/// The sample data is borrowed from the producer; this crate never owns it.
#[derive(Debug, Clone, Copy)]
pub struct SampleBlock<'a> {
    samples: &'a [i16],
    channels: u16,
}

impl<'a> SampleBlock<'a> {
    /// Wrap an interleaved sample slice.
    ///
    /// # Panics
    ///
    /// Panics if `channels` is zero or the slice length is not a whole
    /// number of frames.
    pub fn new(samples: &'a [i16], channels: u16) -> Self {
        assert!(channels > 0, "a sample block needs at least one channel");
        assert_eq!(
            samples.len() % channels as usize,
            0,
            "sample slice must hold a whole number of frames"
        );
        SampleBlock { samples, channels }
    }

    /// Number of frames in the block
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Number of interleaved channels
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Sub-slice covering `frame_count` frames starting at `offset_frames`.
    ///
    /// # Panics
    ///
    /// Panics if the window reaches past the end of the block.
    pub fn frame_window(&self, offset_frames: usize, frame_count: usize) -> &'a [i16] {
        let ch = self.channels as usize;
        &self.samples[offset_frames * ch..(offset_frames + frame_count) * ch]
    }
}

/// Session configuration passed into [`StreamingSession::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Target device queue depth in milliseconds of audio
    pub buffer_ms: u32,
}

impl SessionConfig {
    /// Configuration with an explicit queue depth
    pub fn new(buffer_ms: u32) -> Self {
        SessionConfig { buffer_ms }
    }

    /// Small queue for interactive use; less resilient to producer jitter
    pub fn low_latency() -> Self {
        SessionConfig { buffer_ms: 40 }
    }

    /// Deep queue that rides out scheduling hiccups at the cost of latency
    pub fn stable() -> Self {
        SessionConfig { buffer_ms: 250 }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig { buffer_ms: 100 }
    }
}

/// Counters for monitoring session health.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionMetrics {
    /// Underrun events detected since the session started
    pub underruns: u64,
    /// Samples submitted to the device since the session started
    pub samples_played: u64,
    /// Times the coordinator replaced the precomputed deficit
    pub coordinator_overrides: u64,
}

/// Adaptive streaming audio output session.
///
/// Lifecycle is `{Stopped} --start--> {Running} --stop--> {Stopped}`; the
/// target queue depth and the device voice are fixed for a session's
/// lifetime and reset only by a fresh [`start`](StreamingSession::start).
///
/// [`write_samples`](StreamingSession::write_samples),
/// [`calculate_samples_needed`](StreamingSession::calculate_samples_needed),
/// and [`apply_volume`](StreamingSession::apply_volume) are valid only while
/// running; calling them while stopped is a contract violation and panics.
pub struct StreamingSession<C: AudioCoordinator> {
    coordinator: C,
    backend: Box<dyn AudioBackend>,
    voice: Option<Box<dyn OutputVoice>>,
    pool: BufferPool,
    playback: PlaybackState,
    channels: u16,
    block_align: usize,
    metrics: SessionMetrics,
}

fn expect_running<T>(voice: Option<T>) -> T {
    match voice {
        Some(voice) => voice,
        None => panic!("streaming session used while stopped; call start() first"),
    }
}

impl<C: AudioCoordinator> StreamingSession<C> {
    /// Create a stopped session over the given coordinator and backend.
    ///
    /// The backend is chosen once here; no device is touched until
    /// [`start`](StreamingSession::start).
    pub fn new(coordinator: C, backend: Box<dyn AudioBackend>) -> Self {
        StreamingSession {
            coordinator,
            backend,
            voice: None,
            pool: BufferPool::new(),
            playback: PlaybackState::default(),
            channels: 0,
            block_align: 0,
            metrics: SessionMetrics::default(),
        }
    }

    /// Open a device voice and begin playback with an empty queue.
    ///
    /// The target queue depth is `config.buffer_ms` converted through the
    /// coordinator's sample rate; playback produces silence until the first
    /// [`write_samples`](StreamingSession::write_samples). Fails with
    /// [`SoundOutError::DeviceUnavailable`] when no device voice can be
    /// opened — the session does not retry, restart policy belongs to the
    /// caller.
    ///
    /// # Panics
    ///
    /// Panics if the session is already running.
    pub fn start(&mut self, config: SessionConfig) -> Result<()> {
        assert!(
            self.voice.is_none(),
            "streaming session already running; call stop() first"
        );
        let sample_rate = self.coordinator.sample_rate();
        let channels = self.coordinator.channel_count();
        let buffer_size_samples = self.coordinator.milliseconds_to_samples(config.buffer_ms);
        if buffer_size_samples == 0 {
            return Err(SoundOutError::ConfigError(format!(
                "a {} ms buffer holds no samples at {} Hz",
                config.buffer_ms, sample_rate
            )));
        }

        let mut voice = self.backend.create_voice(sample_rate, channels)?;
        voice.start()?;

        self.channels = channels;
        self.block_align = self.coordinator.block_align();
        self.playback = PlaybackState::new(buffer_size_samples);
        self.pool = BufferPool::new();
        self.metrics = SessionMetrics::default();
        self.voice = Some(voice);
        debug!(
            "streaming session started: {} Hz, {} channels, target queue depth {} samples",
            sample_rate, channels, buffer_size_samples
        );
        Ok(())
    }

    /// Stop playback and release the device voice.
    ///
    /// Safe to call at any time, including when already stopped (then a
    /// no-op). In-flight buffers are abandoned, not drained; the session is
    /// invalid for further writes until the next
    /// [`start`](StreamingSession::start).
    pub fn stop(&mut self) {
        if let Some(mut voice) = self.voice.take() {
            voice.stop();
            self.pool.dispose();
            debug!(
                "streaming session stopped after {} samples",
                self.playback.running_samples_queued()
            );
        }
    }

    /// Forward a volume setting to the device voice; stateless pass-through.
    ///
    /// # Panics
    ///
    /// Panics if the session is stopped.
    pub fn apply_volume(&mut self, volume: f32) {
        expect_running(self.voice.as_deref_mut()).set_volume(volume);
    }

    /// How many samples the producer should supply this tick.
    ///
    /// Polls the voice's progress counters and runs the deficit estimator.
    /// On cold start or after an underrun the coordinator's priming/recovery
    /// policy is consulted with the precomputed deficit and may replace it.
    /// Callers invoke this once per tick and then supply that many fresh
    /// frames via [`write_samples`](StreamingSession::write_samples).
    ///
    /// # Panics
    ///
    /// Panics if the session is stopped.
    pub fn calculate_samples_needed(&mut self) -> usize {
        let state = expect_running(self.voice.as_deref()).query_state();
        let estimate = self.playback.estimate(state.samples_played, state.buffers_queued);
        if !(estimate.is_initializing || estimate.detected_underrun) {
            return estimate.samples_needed;
        }

        if estimate.detected_underrun {
            self.metrics.underruns += 1;
            warn!(
                "playback underrun detected, requesting {} samples",
                estimate.samples_needed
            );
        } else {
            debug!(
                "priming cold playback queue with {} samples",
                estimate.samples_needed
            );
        }
        let response = self
            .coordinator
            .handle_initialization_or_underrun(estimate.detected_underrun, estimate.samples_needed);
        if response.overridden {
            self.metrics.coordinator_overrides += 1;
        }
        response.samples_needed
    }

    /// Copy a frame window to the device and advance the running counter.
    ///
    /// A `frame_count` of zero is a no-op. The order of operations is
    /// load-bearing: the pool is reconciled against the device queue depth
    /// *before* a buffer is obtained, so that consumed capacity is reclaimed
    /// ahead of every allocation decision and pool growth stays bounded.
    ///
    /// # Panics
    ///
    /// Panics if the session is stopped, if the block's channel count does
    /// not match the session format, or if the requested window reaches past
    /// the end of the block.
    pub fn write_samples(
        &mut self,
        block: &SampleBlock<'_>,
        offset_frames: usize,
        frame_count: usize,
    ) {
        if frame_count == 0 {
            return;
        }
        assert_eq!(
            block.channels(),
            self.channels,
            "sample block channel count must match the session format"
        );

        let voice = expect_running(self.voice.as_deref_mut());
        self.pool.release(voice.query_state().buffers_queued);

        let byte_count = frame_count * self.block_align;
        let buffer = self.pool.obtain(byte_count);
        buffer.write_samples(block.frame_window(offset_frames, frame_count));
        voice.submit_buffer(buffer.bytes());

        self.playback.record_queued(frame_count);
        self.metrics.samples_played += frame_count as u64;
    }

    /// Whether the session currently owns a device voice
    pub fn is_running(&self) -> bool {
        self.voice.is_some()
    }

    /// Largest deficit the estimator will report for this session
    pub fn max_samples_deficit(&self) -> usize {
        self.playback.max_samples_deficit()
    }

    /// Health counters accumulated since the last start
    pub fn metrics(&self) -> SessionMetrics {
        self.metrics
    }

    /// The coordinator this session was built over
    pub fn coordinator(&self) -> &C {
        &self.coordinator
    }

    /// Mutable access to the coordinator
    pub fn coordinator_mut(&mut self) -> &mut C {
        &mut self.coordinator
    }
}

impl<C: AudioCoordinator> Drop for StreamingSession<C> {
    fn drop(&mut self) {
        self.stop();
    }
}
