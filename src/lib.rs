//! Adaptive Low-Latency Streaming Audio Output
//!
//! Takes finished interleaved PCM sample blocks produced by an emulation or
//! synthesis loop and delivers them to a native sound device without audible
//! glitches, reusing buffer memory and compensating for device underruns and
//! cold starts. The caller supplies finished sample blocks; this crate does
//! no resampling, mixing, or device selection.
//!
//! # Features
//! - Best-fit buffer pool: steady-state playback performs no per-tick
//!   allocations
//! - Self-correcting deficit estimator sized against the device's own
//!   playback counters
//! - Cold-start priming and underrun recovery routed through caller policy
//! - Non-blocking device interface, polled once per audio tick
//! - Pluggable device backends behind a small trait
//!
//! # Crate feature flags
//! - `cpal-backend` (default): native output voice via cpal
//!
//! # Quick start
//! ```no_run
//! # #[cfg(feature = "cpal-backend")]
//! # {
//! use soundout::{
//!     AudioCoordinator, CpalBackend, SampleBlock, SessionConfig, StreamingSession,
//!     UnderrunResponse,
//! };
//!
//! struct Silence;
//!
//! impl AudioCoordinator for Silence {
//!     fn sample_rate(&self) -> u32 {
//!         44_100
//!     }
//!
//!     fn channel_count(&self) -> u16 {
//!         2
//!     }
//!
//!     fn handle_initialization_or_underrun(
//!         &mut self,
//!         _is_underrun: bool,
//!         samples_needed: usize,
//!     ) -> UnderrunResponse {
//!         UnderrunResponse::unchanged(samples_needed)
//!     }
//! }
//!
//! let mut session = StreamingSession::new(Silence, Box::new(CpalBackend::new()));
//! session.start(SessionConfig::default()).unwrap();
//!
//! // Once per audio tick:
//! let needed = session.calculate_samples_needed();
//! let samples = vec![0i16; needed * 2];
//! session.write_samples(&SampleBlock::new(&samples, 2), 0, needed);
//!
//! session.stop();
//! # }
//! ```

#![warn(missing_docs)]

// Domain modules
pub mod coordinator; // Host-side capability set
pub mod device; // Native device seam and backends
pub mod pool; // Buffer reuse
pub mod session; // Streaming session (root component)

/// Error types for streaming output operations
#[derive(thiserror::Error, Debug)]
pub enum SoundOutError {
    /// Device lost, missing, or rejecting the requested format
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for SoundOutError {
    /// Converts a String into `SoundOutError::Other`.
    ///
    /// Convenience for generic string errors; prefer the specific variant
    /// constructors where the error kind is known.
    fn from(msg: String) -> Self {
        SoundOutError::Other(msg)
    }
}

impl From<&str> for SoundOutError {
    /// Converts a string slice into `SoundOutError::Other`.
    fn from(msg: &str) -> Self {
        SoundOutError::Other(msg.to_string())
    }
}

/// Result type for streaming output operations
pub type Result<T> = std::result::Result<T, SoundOutError>;

// Public API exports
pub use coordinator::{AudioCoordinator, UnderrunResponse};
#[cfg(feature = "cpal-backend")]
pub use device::cpal_backend::CpalBackend;
pub use device::{AudioBackend, OutputVoice, VoiceState};
pub use pool::BufferPool;
pub use session::{
    DeficitEstimate, PlaybackState, SampleBlock, SessionConfig, SessionMetrics, StreamingSession,
};
