//! cpal Device Backend
//!
//! Native audio output via cpal. The callback-driven cpal stream is adapted
//! to the queue-of-buffers voice model: submissions land in a FIFO shared
//! with the device callback, which drains them in order and fills with
//! silence when the queue runs dry. Counters are maintained on the shared
//! state so the session can poll playback progress without blocking.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::{debug, error};

use super::{AudioBackend, OutputVoice, VoiceState};
use crate::{Result, SoundOutError};

/// One submitted buffer awaiting playback
struct PendingBuffer {
    samples: Vec<i16>,
    /// Samples already consumed by the callback
    cursor: usize,
}

/// State shared between the voice handle and the device callback
struct VoiceShared {
    queue: Mutex<VecDeque<PendingBuffer>>,
    /// Frames fully consumed from submitted buffers; silence fill not counted
    samples_played: AtomicU64,
    /// Volume multiplier as f32 bits
    volume_bits: AtomicU32,
    playing: AtomicBool,
}

impl VoiceShared {
    fn new() -> Self {
        VoiceShared {
            queue: Mutex::new(VecDeque::new()),
            samples_played: AtomicU64::new(0),
            volume_bits: AtomicU32::new(1.0f32.to_bits()),
            playing: AtomicBool::new(false),
        }
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    /// Drain queued samples into `out` via `convert`, returning the number of
    /// samples written; the caller fills the remainder with silence.
    fn drain_into<T>(&self, out: &mut [T], convert: impl Fn(i16, f32) -> T) -> usize {
        let volume = self.volume();
        let mut queue = self.queue.lock();
        let mut written = 0;
        while written < out.len() {
            let Some(front) = queue.front_mut() else {
                break;
            };
            let remaining = &front.samples[front.cursor..];
            let count = remaining.len().min(out.len() - written);
            for (slot, &sample) in out[written..written + count].iter_mut().zip(remaining) {
                *slot = convert(sample, volume);
            }
            front.cursor += count;
            written += count;
            if front.cursor == front.samples.len() {
                queue.pop_front();
            }
        }
        written
    }
}

/// Playback voice backed by a cpal output stream
pub struct CpalVoice {
    shared: Arc<VoiceShared>,
    stream: cpal::Stream,
    channels: usize,
}

impl OutputVoice for CpalVoice {
    fn start(&mut self) -> Result<()> {
        self.stream
            .play()
            .map_err(|e| SoundOutError::DeviceUnavailable(format!("failed to start stream: {e}")))?;
        self.shared.playing.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&mut self) {
        self.shared.playing.store(false, Ordering::Relaxed);
        self.shared.queue.lock().clear();
        let _ = self.stream.pause();
    }

    fn submit_buffer(&mut self, bytes: &[u8]) {
        let samples: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        if samples.is_empty() {
            return;
        }
        self.shared.queue.lock().push_back(PendingBuffer {
            samples,
            cursor: 0,
        });
    }

    fn set_volume(&mut self, volume: f32) {
        self.shared
            .volume_bits
            .store(volume.to_bits(), Ordering::Relaxed);
    }

    fn query_state(&self) -> VoiceState {
        VoiceState {
            buffers_queued: self.shared.queue.lock().len(),
            samples_played: self.shared.samples_played.load(Ordering::Relaxed)
                / self.channels as u64,
        }
    }
}

/// Audio backend over the host's default cpal output device
pub struct CpalBackend {
    host: cpal::Host,
}

impl CpalBackend {
    /// Use the platform's default audio host
    pub fn new() -> Self {
        CpalBackend {
            host: cpal::default_host(),
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn create_voice(&self, sample_rate: u32, channels: u16) -> Result<Box<dyn OutputVoice>> {
        let device = self.host.default_output_device().ok_or_else(|| {
            SoundOutError::DeviceUnavailable("no audio output device available".to_string())
        })?;

        let supported = device
            .supported_output_configs()
            .map_err(|e| {
                SoundOutError::DeviceUnavailable(format!("failed to query output configs: {e}"))
            })?
            .find(|range| {
                range.channels() == channels
                    && range.min_sample_rate().0 <= sample_rate
                    && sample_rate <= range.max_sample_rate().0
            })
            .ok_or_else(|| {
                SoundOutError::DeviceUnavailable(format!(
                    "no output config supports {} Hz / {} channels",
                    sample_rate, channels
                ))
            })?;

        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported
            .with_sample_rate(cpal::SampleRate(sample_rate))
            .into();

        let shared = Arc::new(VoiceShared::new());
        let err_fn = |err| error!("audio stream error: {}", err);

        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                let state = Arc::clone(&shared);
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                            if !state.playing.load(Ordering::Relaxed) {
                                data.fill(0.0);
                                return;
                            }
                            let written = state.drain_into(data, |sample, volume| {
                                sample as f32 / 32768.0 * volume
                            });
                            data[written..].fill(0.0);
                            state
                                .samples_played
                                .fetch_add(written as u64, Ordering::Relaxed);
                        },
                        err_fn,
                        None,
                    )
                    .map_err(|e| {
                        SoundOutError::DeviceUnavailable(format!("failed to build stream: {e}"))
                    })?
            }
            cpal::SampleFormat::I16 => {
                let state = Arc::clone(&shared);
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                            if !state.playing.load(Ordering::Relaxed) {
                                data.fill(0);
                                return;
                            }
                            let written = state.drain_into(data, |sample, volume| {
                                (sample as f32 * volume).clamp(-32768.0, 32767.0) as i16
                            });
                            data[written..].fill(0);
                            state
                                .samples_played
                                .fetch_add(written as u64, Ordering::Relaxed);
                        },
                        err_fn,
                        None,
                    )
                    .map_err(|e| {
                        SoundOutError::DeviceUnavailable(format!("failed to build stream: {e}"))
                    })?
            }
            other => {
                return Err(SoundOutError::DeviceUnavailable(format!(
                    "unsupported sample format: {other:?}"
                )));
            }
        };

        debug!(
            "opened cpal voice: {} Hz, {} channels, {:?}",
            sample_rate, channels, sample_format
        );

        Ok(Box::new(CpalVoice {
            shared,
            stream,
            channels: channels as usize,
        }))
    }
}
