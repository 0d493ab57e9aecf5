use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use choppa_app::demo;
use choppa_backend::audio_device::enumeration::list_output_devices;
use choppa_backend::{AudioEngine, AudioOutput, FxParams};
use choppa_core::{EngineConfig, Vibrato, Waveform};
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(name = "choppa")]
#[command(about = "Plays the chiptune engine demo on an audio device")]
#[command(version)]
struct Cli {
    /// Engine configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output device name, partial match allowed
    #[arg(short, long)]
    device: Option<String>,

    /// How long to play, in seconds
    #[arg(short, long, default_value_t = 12.0)]
    seconds: f32,

    #[arg(long, default_value_t = 0.7)]
    music_volume: f32,

    #[arg(long, default_value_t = 1.0)]
    fx_volume: f32,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
}

const TICK: Duration = Duration::from_millis(50);
const REPORT_EVERY: Duration = Duration::from_secs(2);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.list_devices {
        for device in list_output_devices()? {
            println!("{device}");
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let content = demo::build().context("building demo content")?;
    let (engine, control) = AudioEngine::new(config, Arc::new(content.bank))?;
    let output = AudioOutput::open(engine, cli.device.as_deref()).context("opening audio output")?;

    control.music_set_volume(cli.music_volume);
    control.fx_set_volume(cli.fx_volume);
    control.music_play(content.theme);

    let total = Duration::from_secs_f32(cli.seconds.max(0.0));
    let start = Instant::now();
    let mut last_report = start;
    let mut beat = 0u32;
    let mut paused = false;

    while start.elapsed() < total {
        thread::sleep(TICK);
        let elapsed = start.elapsed();

        // Fire one demo event every 0.75 s.
        let due = (elapsed.as_secs_f32() / 0.75) as u32;
        if due > beat {
            beat = due;
            match beat % 4 {
                0 => control.fx_play_group(&content.chord),
                1 => control.fx_play_id(content.zap),
                2 => control.fx_play(
                    FxParams::new(Waveform::Pulse, 660.0, 0.25)
                        .with_volume(0.5)
                        .with_sweep(-330.0)
                        .with_vibrato(Vibrato::new(12.0, 2400.0)),
                ),
                _ => control.fx_play(FxParams::new(Waveform::Noise, 8000.0, 0.08).with_volume(0.4)),
            }
        }

        // Pause the music for a moment halfway through.
        let half = total / 2;
        if !paused && elapsed >= half && elapsed < half + Duration::from_secs(1) {
            control.music_stop();
            paused = true;
        } else if paused && elapsed >= half + Duration::from_secs(1) {
            control.music_resume();
            paused = false;
        }

        if last_report.elapsed() >= REPORT_EVERY {
            last_report = Instant::now();
            let perf = output.performance(true);
            let (fx, level) = output.with_engine(|e| (e.active_fx_channels(), e.compressor_level()));
            info!(
                load_percent = perf.load_percent,
                max_refill_us = perf.max_refill_nanos.unwrap_or(0) / 1_000,
                silent_refills = perf.silent_refills,
                active_fx = fx,
                compressor_level = level,
                dropped_commands = control.dropped_commands(),
                "playback"
            );
        }
    }

    control.stop_all();
    thread::sleep(Duration::from_millis(100));
    info!(wall = ?start.elapsed(), played = ?output.playback_time(), "done");
    Ok(())
}
