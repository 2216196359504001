#[cfg(not(feature = "cpal-backend"))]
fn main() {
    eprintln!(
        "The soundout CLI requires the \"cpal-backend\" feature. Rebuild with `--features cpal-backend` to enable playback."
    );
}

#[cfg(feature = "cpal-backend")]
mod cli {
    use std::env;
    use std::f32::consts::TAU;
    use std::thread;
    use std::time::{Duration, Instant};

    use soundout::{
        AudioCoordinator, CpalBackend, SampleBlock, SessionConfig, StreamingSession,
        UnderrunResponse,
    };

    const SAMPLE_RATE: u32 = 44_100;
    const CHANNELS: u16 = 2;
    const TICK_MS: u64 = 10;

    /// Coordinator for a fixed-format tone generator.
    ///
    /// On cold start and underrun it accepts the precomputed deficit (a full
    /// target buffer); a host with a frame-paced producer would substitute
    /// its own priming policy here.
    struct ToneCoordinator {
        primes: u64,
        underruns: u64,
    }

    impl AudioCoordinator for ToneCoordinator {
        fn sample_rate(&self) -> u32 {
            SAMPLE_RATE
        }

        fn channel_count(&self) -> u16 {
            CHANNELS
        }

        fn handle_initialization_or_underrun(
            &mut self,
            is_underrun: bool,
            samples_needed: usize,
        ) -> UnderrunResponse {
            if is_underrun {
                self.underruns += 1;
            } else {
                self.primes += 1;
            }
            UnderrunResponse::unchanged(samples_needed)
        }
    }

    struct Options {
        frequency: f32,
        buffer_ms: u32,
        duration_secs: f32,
        volume: f32,
    }

    fn parse_options() -> soundout::Result<Option<Options>> {
        let mut options = Options {
            frequency: 440.0,
            buffer_ms: SessionConfig::default().buffer_ms,
            duration_secs: 3.0,
            volume: 0.5,
        };
        let mut show_help = false;

        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            let (flag, inline_value) = match arg.split_once('=') {
                Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
                None => (arg, None),
            };
            let mut value_for = |flag: &str| -> soundout::Result<String> {
                match inline_value.clone().or_else(|| args.next()) {
                    Some(value) => Ok(value),
                    None => Err(format!("{flag} requires a value").into()),
                }
            };
            match flag.as_str() {
                "--freq" => {
                    options.frequency = value_for("--freq")?
                        .parse()
                        .map_err(|e| format!("invalid --freq: {e}"))?;
                }
                "--buffer-ms" => {
                    options.buffer_ms = value_for("--buffer-ms")?
                        .parse()
                        .map_err(|e| format!("invalid --buffer-ms: {e}"))?;
                }
                "--duration" => {
                    options.duration_secs = value_for("--duration")?
                        .parse()
                        .map_err(|e| format!("invalid --duration: {e}"))?;
                }
                "--volume" => {
                    options.volume = value_for("--volume")?
                        .parse()
                        .map_err(|e| format!("invalid --volume: {e}"))?;
                }
                "--help" | "-h" => {
                    show_help = true;
                }
                _ => {
                    eprintln!("Unknown flag: {}", flag);
                    show_help = true;
                }
            }
        }

        if show_help {
            eprintln!(
                "Usage:\n  soundout [--freq <hz>] [--buffer-ms <ms>] [--duration <secs>] [--volume <0..1>]\n\nFlags:\n  --freq <hz>         Tone frequency (default 440)\n  --buffer-ms <ms>    Target device queue depth (default {})\n  --duration <secs>   Playback duration (default 3)\n  --volume <0..1>     Playback volume (default 0.5)\n  -h, --help          Show this help\n",
                SessionConfig::default().buffer_ms
            );
            return Ok(None);
        }
        Ok(Some(options))
    }

    pub fn run() -> soundout::Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();

        let Some(options) = parse_options()? else {
            return Ok(());
        };

        println!("soundout - Streaming Tone Playback");
        println!("==================================\n");

        let coordinator = ToneCoordinator {
            primes: 0,
            underruns: 0,
        };
        let mut session = StreamingSession::new(coordinator, Box::new(CpalBackend::new()));
        session.start(SessionConfig::new(options.buffer_ms))?;
        session.apply_volume(options.volume);

        println!("Streaming Configuration:");
        println!("  Sample rate:  {} Hz", SAMPLE_RATE);
        println!("  Channels:     {}", CHANNELS);
        println!(
            "  Queue depth:  {} samples ({} ms)",
            session.max_samples_deficit(),
            options.buffer_ms
        );
        println!("  Tone:         {:.1} Hz\n", options.frequency);

        let phase_step = TAU * options.frequency / SAMPLE_RATE as f32;
        let mut phase = 0.0f32;
        let mut scratch: Vec<i16> = Vec::new();

        let started = Instant::now();
        while started.elapsed().as_secs_f32() < options.duration_secs {
            let needed = session.calculate_samples_needed();
            if needed > 0 {
                scratch.clear();
                for _ in 0..needed {
                    let value = (phase.sin() * 0.25 * i16::MAX as f32) as i16;
                    phase = (phase + phase_step) % TAU;
                    for _ in 0..CHANNELS {
                        scratch.push(value);
                    }
                }
                let block = SampleBlock::new(&scratch, CHANNELS);
                session.write_samples(&block, 0, needed);
            }
            thread::sleep(Duration::from_millis(TICK_MS));
        }

        let metrics = session.metrics();
        let coordinator = session.coordinator();
        println!("=== Playback Statistics ===");
        println!("Duration:          {:.2} seconds", started.elapsed().as_secs_f32());
        println!("Samples submitted: {}", metrics.samples_played);
        println!("Cold-start primes: {}", coordinator.primes);
        println!("Underrun events:   {}", metrics.underruns);
        session.stop();
        println!("\nPlayback complete!");

        Ok(())
    }
}

#[cfg(feature = "cpal-backend")]
fn main() -> soundout::Result<()> {
    cli::run()
}
