use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::time::Instant;

use sanpo::runtime::{self, RunOptions};
use sanpo::sensor::SensorFeed;
use sanpo::session::{SensorAccess, StartupStatus};
use sanpo::SanpoConfig;

#[derive(Parser)]
#[command(name = "sanpo")]
#[command(about = "Motion-reactive music for walks")]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// JSON config file; defaults are used for anything it leaves out
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Sensor trace (JSON lines) to play back in real time; '-' reads stdin
    #[arg(short, long, global = true)]
    trace: Option<PathBuf>,

    /// Pretend the host answered the motion permission prompt like this
    #[arg(long, value_enum, default_value = "granted", global = true)]
    sensor: Access,
}

#[derive(Subcommand)]
enum Mode {
    /// Generative music whose tempo follows how much the device moves
    Music {
        /// Fixed melody seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Crossfade between still, walking and fast-walking stems by cadence
    Walk {
        /// Directory containing the three stems
        #[arg(long)]
        stems: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Access {
    Granted,
    Denied,
    Unavailable,
}

impl From<Access> for SensorAccess {
    fn from(access: Access) -> Self {
        match access {
            Access::Granted => SensorAccess::Granted,
            Access::Denied => SensorAccess::Denied,
            Access::Unavailable => SensorAccess::Unavailable,
        }
    }
}

fn open_feed(trace: Option<&PathBuf>, epoch: Instant) -> Result<SensorFeed> {
    match trace {
        None => Ok(SensorFeed::silent()),
        Some(path) if path.as_os_str() == "-" => {
            Ok(SensorFeed::spawn(BufReader::new(io::stdin()), epoch))
        }
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("opening sensor trace {}", path.display()))?;
            Ok(SensorFeed::spawn(BufReader::new(file), epoch))
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SanpoConfig::load_json(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SanpoConfig::default(),
    };

    let epoch = Instant::now();
    let feed = open_feed(args.trace.as_ref(), epoch)?;
    let options = RunOptions {
        access: args.sensor.into(),
        stop_at_end_of_input: args.trace.is_some(),
    };

    let status = match args.mode {
        Mode::Music { seed } => {
            if seed.is_some() {
                config.music.seed = seed;
            }
            info!("Starting music mode");
            runtime::run_music(&config, feed, epoch, options).await?
        }
        Mode::Walk { stems } => {
            if let Some(dir) = stems {
                config.cadence.still_stem = dir.join(&config.cadence.still_stem);
                config.cadence.walking_stem = dir.join(&config.cadence.walking_stem);
                config.cadence.fast_stem = dir.join(&config.cadence.fast_stem);
            }
            info!("Starting walk mode");
            runtime::run_cadence(&config, feed, options).await?
        }
    };

    if let StartupStatus::Failed(reason) = status {
        anyhow::bail!("startup failed: {}", reason);
    }
    Ok(())
}
