use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;

use sanpo::replay::{CadenceReplay, MusicReplay};
use sanpo::sensor::read_trace;
use sanpo::session::SensorAccess;
use sanpo::SanpoConfig;

#[derive(Parser)]
#[command(name = "sanpo-replay")]
#[command(about = "Replay a recorded sensor trace offline and write what would have played")]
struct Args {
    /// Sensor trace, one JSON event per line
    #[arg()]
    trace: PathBuf,

    /// Which front end to replay
    #[arg(long, value_enum, default_value = "music")]
    mode: ReplayMode,

    /// Output file for the JSON report
    #[arg(short, long, default_value = "replay_report.json")]
    output: PathBuf,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Melody seed (music mode)
    #[arg(long)]
    seed: Option<u64>,

    /// Keep the music running this many milliseconds after the last event
    #[arg(long, default_value = "0")]
    tail_ms: u64,

    /// Replay as if motion access had been refused
    #[arg(long)]
    denied: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReplayMode {
    Music,
    Walk,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SanpoConfig::load_json(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SanpoConfig::default(),
    };
    if args.seed.is_some() {
        config.music.seed = args.seed;
    }
    let access = if args.denied {
        SensorAccess::Denied
    } else {
        SensorAccess::Granted
    };

    let file = File::open(&args.trace)
        .with_context(|| format!("opening trace {}", args.trace.display()))?;
    let events = read_trace(BufReader::new(file))?;
    info!("Loaded {} events from {}", events.len(), args.trace.display());

    let json = match args.mode {
        ReplayMode::Music => {
            let report = MusicReplay::new(&config, access)
                .with_tail(args.tail_ms)
                .run(&events)?;

            info!("\n=== MUSIC REPLAY ===");
            info!("Seed: {}", report.seed);
            info!("Duration: {:.2} seconds", report.duration_ms as f64 / 1000.0);
            info!("Triggers: {}", report.triggers.len());
            if let Some(peak) = report
                .tempo_curve
                .iter()
                .map(|p| p.tempo_bpm)
                .reduce(f32::max)
            {
                info!("Peak tempo: {:.1} BPM", peak);
            }
            info!("Final status: {}", report.final_status);
            serde_json::to_string_pretty(&report)?
        }
        ReplayMode::Walk => {
            let report = CadenceReplay::new(&config, access).run(&events);

            info!("\n=== WALK REPLAY ===");
            info!("Startup: {}", report.startup);
            for transition in &report.transitions {
                info!(
                    "{:>8} ms  {} -> {} (cadence {:.0})",
                    transition.t_ms,
                    transition.from.label(),
                    transition.to.label(),
                    transition.cadence
                );
            }
            info!("Final status: {}", report.final_status);
            serde_json::to_string_pretty(&report)?
        }
    };

    fs::write(&args.output, json)
        .with_context(|| format!("writing report {}", args.output.display()))?;
    info!("Report written to {}", args.output.display());
    Ok(())
}
