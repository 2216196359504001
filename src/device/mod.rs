//! Native Device Interface
//!
//! Polymorphic audio backend seam: one trait implementation per native
//! backend, selected once when the session is configured. The voice model is
//! queue-of-buffers shaped — discrete submissions played in order, with
//! monotonic counters the session polls at the top of each tick.

#[cfg(feature = "cpal-backend")]
pub mod cpal_backend;

use crate::Result;

/// Snapshot of a voice's playback progress.
///
/// Both counters are device-maintained and read without blocking:
/// `buffers_queued` counts submitted buffers not yet fully played (the one
/// currently being drained included), `samples_played` counts frames fully
/// consumed from submitted buffers since the voice was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoiceState {
    /// Submitted buffers the device has not finished playing
    pub buffers_queued: usize,
    /// Frames consumed from submitted buffers, monotonic per voice
    pub samples_played: u64,
}

/// A playback voice on a native audio device.
///
/// Buffers are played strictly in submission order. Submission never blocks;
/// an empty queue produces silence, not an error.
pub trait OutputVoice {
    /// Begin playback; silence until the first submission
    fn start(&mut self) -> Result<()>;

    /// Stop playback; queued buffers are abandoned, not drained
    fn stop(&mut self);

    /// Queue one buffer of interleaved little-endian 16-bit PCM bytes
    fn submit_buffer(&mut self, bytes: &[u8]);

    /// Set the playback volume multiplier
    fn set_volume(&mut self, volume: f32);

    /// Read the device-maintained progress counters
    fn query_state(&self) -> VoiceState;
}

/// Factory for playback voices on one native backend.
pub trait AudioBackend {
    /// Open a voice for the given fixed format.
    ///
    /// Fails with [`DeviceUnavailable`](crate::SoundOutError::DeviceUnavailable)
    /// when no device or no matching output configuration exists.
    fn create_voice(&self, sample_rate: u32, channels: u16) -> Result<Box<dyn OutputVoice>>;
}
