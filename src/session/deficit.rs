//! Deficit Estimation
//!
//! Pure playback accounting: how many samples the device queue is short of
//! its target depth. No I/O, no side effects; the session feeds in the
//! device counters polled at the top of each tick.
//!
//! Throughout, a *sample* is one multi-channel frame, matching the device's
//! frame-granular counters.

/// Outcome of one deficit estimation.
///
/// `samples_needed` is the arithmetic shortfall; the flags tell the session
/// when priming/recovery policy must be consulted, because a catch-up write
/// sized only to the instantaneous gap would under-fill the device again on
/// the very next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeficitEstimate {
    /// Samples to request from the producer, always within
    /// `0..=buffer_size_samples`
    pub samples_needed: usize,
    /// No samples have been submitted yet this session
    pub is_initializing: bool,
    /// The device queue ran empty after playback had started
    pub detected_underrun: bool,
}

/// Playback counters and the deficit estimator over them.
///
/// `running_samples_queued` is monotonic for the session lifetime;
/// `buffer_size_samples` (the target steady-state queue depth) is fixed at
/// session start. A fresh session starts from zero via [`PlaybackState::new`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackState {
    /// Samples ever submitted this session
    running_samples_queued: u64,
    /// Target steady-state queue depth in samples
    buffer_size_samples: usize,
}

impl PlaybackState {
    /// Create counters for a session targeting the given queue depth
    pub fn new(buffer_size_samples: usize) -> Self {
        PlaybackState {
            running_samples_queued: 0,
            buffer_size_samples,
        }
    }

    /// Estimate how many samples are needed to restore the target queue depth.
    ///
    /// Deterministic in its inputs and idempotent between writes:
    ///
    /// ```text
    /// awaiting = running_samples_queued - device_played_samples
    /// needed   = clamp(buffer_size_samples - awaiting, 0, buffer_size_samples)
    /// ```
    ///
    /// A negative awaiting count (device counter wraparound or reset) is not
    /// an error; the clamp saturates the request at `buffer_size_samples` and
    /// the counters self-correct as submissions resume.
    pub fn estimate(&self, device_played_samples: u64, buffers_queued: usize) -> DeficitEstimate {
        let is_initializing = self.running_samples_queued == 0;
        let detected_underrun = !is_initializing && buffers_queued == 0;
        let samples_awaiting_playback =
            self.running_samples_queued as i64 - device_played_samples as i64;
        let samples_needed = (self.buffer_size_samples as i64 - samples_awaiting_playback)
            .clamp(0, self.buffer_size_samples as i64) as usize;
        DeficitEstimate {
            samples_needed,
            is_initializing,
            detected_underrun,
        }
    }

    /// Record a submission of `frames` samples
    pub fn record_queued(&mut self, frames: usize) {
        self.running_samples_queued += frames as u64;
    }

    /// Samples ever submitted this session
    pub fn running_samples_queued(&self) -> u64 {
        self.running_samples_queued
    }

    /// Target steady-state queue depth in samples
    pub fn buffer_size_samples(&self) -> usize {
        self.buffer_size_samples
    }

    /// Largest deficit the estimator will ever report
    pub fn max_samples_deficit(&self) -> usize {
        self.buffer_size_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(buffer_size: usize, running: u64) -> PlaybackState {
        let mut state = PlaybackState::new(buffer_size);
        state.record_queued(running as usize);
        state
    }

    #[test]
    fn test_cold_start_flags_initializing() {
        let state = PlaybackState::new(800);
        let estimate = state.estimate(0, 0);
        assert!(estimate.is_initializing);
        assert!(!estimate.detected_underrun, "cold start is not an underrun");
        assert_eq!(estimate.samples_needed, 800);

        // Initializing regardless of other counters.
        let estimate = state.estimate(12345, 3);
        assert!(estimate.is_initializing);
    }

    #[test]
    fn test_underrun_detected_when_queue_empties() {
        let state = state(800, 1000);
        let estimate = state.estimate(1000, 0);
        assert!(estimate.detected_underrun);
        assert!(!estimate.is_initializing);
        assert_eq!(
            estimate.samples_needed, 800,
            "nothing awaiting playback, so a full buffer is needed"
        );
    }

    #[test]
    fn test_steady_state_partial_deficit() {
        let state = state(800, 5000);
        let estimate = state.estimate(4400, 2);
        assert!(!estimate.is_initializing);
        assert!(!estimate.detected_underrun);
        // 600 awaiting playback against a target of 800.
        assert_eq!(estimate.samples_needed, 200);
    }

    #[test]
    fn test_full_queue_needs_nothing() {
        let state = state(800, 5000);
        let estimate = state.estimate(4200, 3);
        assert_eq!(estimate.samples_needed, 0);
    }

    #[test]
    fn test_overfull_queue_saturates_at_zero() {
        let state = state(800, 5000);
        let estimate = state.estimate(3000, 4);
        assert_eq!(estimate.samples_needed, 0, "never negative");
    }

    #[test]
    fn test_counter_wraparound_saturates_at_buffer_size() {
        // Device reports more played than was ever queued.
        let state = state(800, 1000);
        let estimate = state.estimate(5000, 1);
        assert_eq!(estimate.samples_needed, 800);
    }

    #[test]
    fn test_estimate_is_idempotent() {
        let state = state(800, 5000);
        let first = state.estimate(4400, 2);
        let second = state.estimate(4400, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_record_queued_accumulates() {
        let mut state = PlaybackState::new(800);
        state.record_queued(300);
        state.record_queued(500);
        assert_eq!(state.running_samples_queued(), 800);
        assert_eq!(state.max_samples_deficit(), 800);
    }
}
