//! Offline replay of recorded sensor traces on a virtual clock.
//!
//! The replays drive the same sessions as the live runtime, with recording
//! collaborators in place of audio output and a fixed seed, so a trace
//! always produces the same report.

use log::{debug, info};
use serde::Serialize;

use crate::config::SanpoConfig;
use crate::engine::{DisplayStatus, MixerCommand, RecordingMixer, RecordingSynth, TriggerEvent};
use crate::error::SanpoResult;
use crate::mapping::AudioState;
use crate::session::{CadenceSession, MusicSession, SensorAccess, StartupStatus};
use crate::sensor::TimedEvent;

/// Seed used when the config does not pin one.
pub const DEFAULT_REPLAY_SEED: u64 = 0x5a4e_504f;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TempoPoint {
    pub t_ms: u64,
    pub tempo_bpm: f32,
    pub activity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MusicReport {
    pub seed: u64,
    pub duration_ms: u64,
    pub triggers: Vec<TriggerEvent>,
    pub tempo_curve: Vec<TempoPoint>,
    pub final_status: DisplayStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub t_ms: u64,
    pub from: AudioState,
    pub to: AudioState,
    pub cadence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CadenceReport {
    pub startup: StartupStatus,
    pub transitions: Vec<Transition>,
    pub gain_commands: Vec<MixerCommand>,
    pub final_status: DisplayStatus,
}

fn sorted(events: &[TimedEvent]) -> Vec<TimedEvent> {
    let mut events = events.to_vec();
    events.sort_by_key(|e| e.timestamp_ms);
    events
}

pub struct MusicReplay {
    config: SanpoConfig,
    access: SensorAccess,
    tail_ms: u64,
}

impl MusicReplay {
    pub fn new(config: &SanpoConfig, access: SensorAccess) -> Self {
        let mut config = config.clone();
        config.music.seed.get_or_insert(DEFAULT_REPLAY_SEED);
        Self {
            config,
            access,
            tail_ms: 0,
        }
    }

    /// Keep playing this long after the last event.
    pub fn with_tail(mut self, tail_ms: u64) -> Self {
        self.tail_ms = tail_ms;
        self
    }

    pub fn run(&self, events: &[TimedEvent]) -> SanpoResult<MusicReport> {
        let events = sorted(events);
        let mut session = MusicSession::new(&self.config)?;
        let mut synth = RecordingSynth::new();

        session.start(self.access, &mut synth, 0.0);
        if let Some(notice) = session.take_notice() {
            info!("{}", notice);
        }

        let step_ms = self.config.runtime.frame_interval_ms.max(1);
        let sample_every = self.config.runtime.status_every_frames.max(1);
        let end_ms = events.last().map_or(0, |e| e.timestamp_ms) + self.tail_ms;

        let mut pending = events.iter().peekable();
        let mut tempo_curve = Vec::new();
        let mut frame = 0u64;
        let mut now_ms = 0u64;

        while now_ms <= end_ms {
            while let Some(event) = pending.next_if(|e| e.timestamp_ms <= now_ms) {
                session.ingest(event);
            }
            session.frame(&mut synth);

            let now_s = now_ms as f64 / 1000.0;
            while session.tick_due(now_s) {
                session.tick(&mut synth);
            }

            if frame % sample_every == 0 {
                let control = session.control();
                tempo_curve.push(TempoPoint {
                    t_ms: now_ms,
                    tempo_bpm: control.tempo_bpm(),
                    activity: control.activity(),
                });
            }
            frame += 1;
            now_ms += step_ms;
        }

        let final_status = session.status();
        session.stop();
        debug!("Replayed {} frames, {} triggers", frame, synth.events.len());

        Ok(MusicReport {
            seed: self.config.music.seed.unwrap_or(DEFAULT_REPLAY_SEED),
            duration_ms: end_ms,
            triggers: synth.events,
            tempo_curve,
            final_status,
        })
    }
}

pub struct CadenceReplay {
    config: SanpoConfig,
    access: SensorAccess,
}

impl CadenceReplay {
    pub fn new(config: &SanpoConfig, access: SensorAccess) -> Self {
        Self {
            config: config.clone(),
            access,
        }
    }

    pub fn run(&self, events: &[TimedEvent]) -> CadenceReport {
        self.run_with(events, RecordingMixer::new())
    }

    /// Replay against a prepared mixer, e.g. one rigged to fail loading.
    pub fn run_with(&self, events: &[TimedEvent], mut mixer: RecordingMixer) -> CadenceReport {
        let mut session = CadenceSession::new(&self.config.cadence);
        let mut transitions = Vec::new();

        if session.start(self.access, &mut mixer) {
            for event in sorted(events) {
                if let Some(fade) = session.ingest(&event, &mut mixer) {
                    transitions.push(Transition {
                        t_ms: event.timestamp_ms,
                        from: fade.from,
                        to: fade.to,
                        cadence: session.cadence(),
                    });
                }
            }
        }

        let startup = session.startup_status().clone();
        let final_status = session.status();
        session.stop(&mut mixer);

        CadenceReport {
            startup,
            transitions,
            gain_commands: mixer.commands,
            final_status,
        }
    }
}
