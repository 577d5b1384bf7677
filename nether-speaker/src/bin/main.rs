//! nether-speaker - PC speaker renderer
//!
//! Plays or renders speaker edge streams: a generated square wave (`tone`)
//! or a recorded edge log (`play`). Without `--out` the audio goes to the
//! default output device in real time.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use nether_edgeq::Timestamp;
use tracing::info;

use nether_speaker::config::{self, EngineConfig};
use nether_speaker::edgelog::read_edge_log;
use nether_speaker::engine::{RenderSignal, RenderThread, SpeakerEngine, render_offline};
use nether_speaker::output::{WavSink, open_cpal};
use nether_speaker::render::SpeakerLevels;
use nether_speaker::tone::SquareWave;

/// Rest level appended after the last edge when rendering to a file
const TAIL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "nether-speaker")]
#[command(about = "PC speaker edge renderer")]
#[command(version)]
struct Cli {
    /// Configuration file (default: platform config dir, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output volume 0.0-1.0 (overrides the configuration)
    #[arg(long, global = true)]
    volume: Option<f32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a square wave
    Tone {
        /// Frequency in Hz
        #[arg(short, long, default_value_t = 440)]
        freq: u32,

        /// Duration in seconds
        #[arg(short, long, default_value_t = 1.0)]
        seconds: f32,

        /// Render to a WAV file instead of the audio device
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Play a recorded edge log
    Play {
        /// Edge log (one cycle timestamp per line)
        edges: PathBuf,

        /// Render to a WAV file instead of the audio device
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Tone { freq, seconds, out } => {
            if freq == 0 {
                bail!("Tone frequency must be non-zero");
            }
            let wave = SquareWave::new(config.timing.clock_hz, freq, seconds);
            info!("Tone: {} Hz for {:.2}s ({} edges)", freq, seconds, wave.edge_count());
            run(config, wave, out.as_deref())
        }
        Commands::Play { edges, out } => {
            let edges = read_edge_log(&edges)?;
            if edges.is_empty() {
                bail!("Edge log contains no timestamps");
            }
            info!("Edge log: {} edges", edges.len());
            run(config, edges, out.as_deref())
        }
    }
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => config::load(),
    };
    if let Some(volume) = cli.volume {
        config.render.volume = volume;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run(
    config: EngineConfig,
    edges: impl IntoIterator<Item = Timestamp>,
    out: Option<&Path>,
) -> Result<()> {
    match out {
        Some(path) => render_to_wav(config, edges, path),
        None => play_realtime(config, edges),
    }
}

/// Render as fast as possible into a WAV file
fn render_to_wav(
    config: EngineConfig,
    edges: impl IntoIterator<Item = Timestamp>,
    path: &Path,
) -> Result<()> {
    let sample_rate = config.timing.sample_rate;
    let sink = WavSink::create(path, sample_rate)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let (mut producer, mut engine) = SpeakerEngine::init(config, sink)?;

    let tail = (sample_rate as u128 * TAIL.as_millis() / 1000) as usize;
    let rendered = render_offline(&mut engine, &mut producer, edges, tail)?;
    let stats = engine.stats();
    engine.finish().context("Failed to finalize WAV output")?;

    info!(
        "Wrote {} ({:.2}s, {} edges, {} late)",
        path.display(),
        rendered as f64 / sample_rate as f64,
        stats.render.edges,
        stats.render.late_edges
    );
    Ok(())
}

/// Stream to the default audio device, paced by the render thread
fn play_realtime(config: EngineConfig, edges: impl IntoIterator<Item = Timestamp>) -> Result<()> {
    let timing = config.timing.clone();
    let latency_frames = config.output.latency_frames;

    // The speaker rests low until the first edge
    let rest_level = SpeakerLevels::from_volume(config.render.volume).low;

    let signal = RenderSignal::new();
    let (stream, sink) = open_cpal(
        timing.sample_rate,
        timing.samples_per_frame,
        latency_frames,
        rest_level,
        Some(signal.clone()),
    )
    .context("Failed to open audio output")?;
    info!("Audio device running at {} Hz", stream.device_rate());

    let (mut producer, engine) = SpeakerEngine::init(config, sink)?;
    let handle = RenderThread::spawn(engine, signal)?;

    // The render thread drains the queue at playback speed; a full queue
    // holds up publish, which paces this loop. If the thread dies the error
    // comes back from stop() below.
    for timestamp in edges {
        if !handle.publish(&mut producer, timestamp) {
            break;
        }
    }

    while !producer.is_empty() && handle.is_alive() {
        thread::sleep(Duration::from_millis(1));
    }

    // Let the last frames reach the device
    let frame =
        Duration::from_secs_f64(timing.samples_per_frame as f64 / timing.sample_rate as f64);
    thread::sleep(frame * (latency_frames as u32 + 2));

    let engine = handle.stop()?;
    let stats = engine.stats();
    drop(stream);

    info!(
        "Played {:.2}s: {} edges ({} late, {} resyncs), {} overruns, {} underruns, {} producer stalls",
        stats.render.samples as f64 / timing.sample_rate as f64,
        stats.render.edges,
        stats.render.late_edges,
        stats.render.resyncs,
        stats.output.overruns,
        stats.underruns,
        producer.stalls()
    );
    Ok(())
}
