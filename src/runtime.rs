//! Live driver: a frame task and a transport task multiplexed on one thread.
//!
//! Both tasks run inside a single `tokio::select!` loop, so the session is
//! only ever touched from one place and needs no locking. Sensor events
//! arrive from the reader thread over the feed channel and are drained at
//! the start of every frame.

use log::{error, info, warn};
use std::future;
use std::time::{Duration, Instant};
use tokio::time::{self, MissedTickBehavior};

use crate::audio::{RodioStemMixer, RodioSynth};
use crate::config::SanpoConfig;
use crate::engine::{LogStatus, StatusSink};
use crate::error::SanpoResult;
use crate::session::{CadenceSession, MusicSession, SensorAccess, StartupStatus};
use crate::sensor::SensorFeed;

/// Ticks are handed to the synth this far ahead of their slot.
const LOOKAHEAD_SECONDS: f64 = 0.1;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub access: SensorAccess,
    /// End the session once the sensor input is exhausted
    pub stop_at_end_of_input: bool,
}

async fn sleep_until_opt(deadline: Option<time::Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

fn frame_interval(config: &SanpoConfig) -> time::Interval {
    let mut frames = time::interval(Duration::from_millis(config.runtime.frame_interval_ms.max(1)));
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    frames
}

/// Play generative music until Ctrl-C or the end of input.
pub async fn run_music(
    config: &SanpoConfig,
    feed: SensorFeed,
    epoch: Instant,
    options: RunOptions,
) -> SanpoResult<StartupStatus> {
    let mut session = MusicSession::new(config)?;
    let mut synth = RodioSynth::open(epoch, config.music.base_bpm);
    let mut status = LogStatus::new(config.runtime.status_every_frames);

    let start_at = epoch.elapsed().as_secs_f64() + LOOKAHEAD_SECONDS;
    session.start(options.access, &mut synth, start_at);
    if let Some(notice) = session.take_notice() {
        warn!("{}", notice);
    }

    let tokio_epoch = time::Instant::from_std(epoch);
    let mut frames = frame_interval(config);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let next_tick = session.next_tick_time().map(|t| {
            tokio_epoch + Duration::from_secs_f64((t - LOOKAHEAD_SECONDS).max(0.0))
        });

        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            _ = frames.tick() => {
                for event in feed.drain() {
                    session.ingest(&event);
                }
                session.frame(&mut synth);
                status.show(&session.status());

                if options.stop_at_end_of_input && feed.is_exhausted() {
                    info!("Sensor input ended");
                    break;
                }
            }
            _ = sleep_until_opt(next_tick) => {
                let horizon = epoch.elapsed().as_secs_f64() + LOOKAHEAD_SECONDS;
                while session.tick_due(horizon) {
                    session.tick(&mut synth);
                }
            }
        }
    }

    let final_status = session.startup_status().clone();
    session.stop();
    info!("Played {} voices", synth.voices_started());
    Ok(final_status)
}

/// Crossfade walking stems until Ctrl-C or the end of input.
pub async fn run_cadence(
    config: &SanpoConfig,
    feed: SensorFeed,
    options: RunOptions,
) -> SanpoResult<StartupStatus> {
    let mut session = CadenceSession::new(&config.cadence);
    let mut mixer = RodioStemMixer::open();
    let mut status = LogStatus::new(config.runtime.status_every_frames);

    if !session.start(options.access, &mut mixer) {
        let failed = session.startup_status().clone();
        error!("Cadence session could not start: {}", failed);
        return Ok(failed);
    }

    let mut frames = frame_interval(config);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            _ = frames.tick() => {
                for event in feed.drain() {
                    session.ingest(&event, &mut mixer);
                }
                status.show(&session.status());

                if options.stop_at_end_of_input && feed.is_exhausted() {
                    info!("Sensor input ended");
                    break;
                }
            }
        }
    }

    let final_status = session.startup_status().clone();
    session.stop(&mut mixer);
    Ok(final_status)
}
