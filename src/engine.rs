//! Seams to the sound-producing collaborators.
//!
//! The pipelines only ever talk to a synthesizer, a stem mixer and a status
//! display through these traits. The rodio implementations live in
//! `crate::audio`; the recording implementations here back the offline
//! replay and the tests.

use log::debug;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::error::{SanpoError, SanpoResult};
use crate::mapping::AudioState;
use crate::music::{Note, NoteValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Voice {
    Chord,
    Melody,
    Kick,
    Snare,
    HiHat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sound {
    Notes(Vec<Note>),
    Note(Note),
    Noise,
}

/// One note or drum hit at an absolute transport time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerEvent {
    pub voice: Voice,
    pub sound: Sound,
    pub duration: NoteValue,
    /// Seconds since the transport started
    pub time_s: f64,
    pub velocity: Option<f32>,
}

pub trait Synthesizer {
    fn set_tempo(&mut self, bpm: f32);

    fn trigger(&mut self, event: &TriggerEvent) -> SanpoResult<()>;
}

pub trait StemMixer {
    /// Fetch and decode one stem per state.
    fn load_stems(&mut self, stems: &[(AudioState, PathBuf)]) -> SanpoResult<()>;

    fn start_loop(&mut self, channel: AudioState) -> SanpoResult<()>;

    /// Ramp `channel` linearly to `target` (0..=1) over `ramp_seconds`.
    fn set_gain(&mut self, channel: AudioState, target: f32, ramp_seconds: f32);
}

/// Values a front end shows while playing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayStatus {
    pub phase: String,
    pub tempo_bpm: Option<i64>,
    pub activity_percent: Option<f32>,
    pub cadence: Option<i64>,
    pub state: Option<&'static str>,
    pub notice: Option<String>,
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.phase)?;
        if let Some(bpm) = self.tempo_bpm {
            write!(f, " {} BPM", bpm)?;
        }
        if let Some(activity) = self.activity_percent {
            write!(f, " activity {:.0}%", activity)?;
        }
        if let Some(cadence) = self.cadence {
            write!(f, " cadence {}", cadence)?;
        }
        if let Some(state) = self.state {
            write!(f, " {}", state)?;
        }
        if let Some(notice) = &self.notice {
            write!(f, " ({})", notice)?;
        }
        Ok(())
    }
}

pub trait StatusSink {
    fn show(&mut self, status: &DisplayStatus);
}

/// Logs every `every`-th status at info level.
pub struct LogStatus {
    every: u64,
    counter: u64,
}

impl LogStatus {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            counter: 0,
        }
    }
}

impl StatusSink for LogStatus {
    fn show(&mut self, status: &DisplayStatus) {
        if self.counter % self.every == 0 {
            log::info!("{}", status);
        }
        self.counter += 1;
    }
}

/// Synthesizer that keeps everything it is asked to play.
#[derive(Debug, Default)]
pub struct RecordingSynth {
    pub events: Vec<TriggerEvent>,
    pub tempo_changes: Vec<f32>,
}

impl RecordingSynth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, voice: Voice) -> usize {
        self.events.iter().filter(|e| e.voice == voice).count()
    }

    pub fn last_tempo(&self) -> Option<f32> {
        self.tempo_changes.last().copied()
    }
}

impl Synthesizer for RecordingSynth {
    fn set_tempo(&mut self, bpm: f32) {
        if self.tempo_changes.last() != Some(&bpm) {
            self.tempo_changes.push(bpm);
        }
    }

    fn trigger(&mut self, event: &TriggerEvent) -> SanpoResult<()> {
        debug!("{:?} {:?} at {:.3}s", event.voice, event.sound, event.time_s);
        self.events.push(event.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MixerCommand {
    Start(AudioState),
    Gain {
        channel: AudioState,
        target: f32,
        ramp_seconds: f32,
    },
}

/// Stem mixer that records commands; optionally fails to load a given stem.
#[derive(Debug, Default)]
pub struct RecordingMixer {
    pub commands: Vec<MixerCommand>,
    pub loaded: Vec<AudioState>,
    pub fail_on: Option<AudioState>,
    pub stall_on: Option<AudioState>,
}

impl RecordingMixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(state: AudioState) -> Self {
        Self {
            fail_on: Some(state),
            ..Self::default()
        }
    }

    /// Loads fine but the engine refuses to start this channel.
    pub fn stalling_on(state: AudioState) -> Self {
        Self {
            stall_on: Some(state),
            ..Self::default()
        }
    }

    pub fn gain_commands(&self) -> Vec<(AudioState, f32)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                MixerCommand::Gain {
                    channel, target, ..
                } => Some((*channel, *target)),
                MixerCommand::Start(_) => None,
            })
            .collect()
    }
}

impl StemMixer for RecordingMixer {
    fn load_stems(&mut self, stems: &[(AudioState, PathBuf)]) -> SanpoResult<()> {
        for (state, path) in stems {
            if self.fail_on == Some(*state) {
                return Err(SanpoError::resource_load(
                    path.display().to_string(),
                    "simulated fetch failure",
                ));
            }
            self.loaded.push(*state);
        }
        Ok(())
    }

    fn start_loop(&mut self, channel: AudioState) -> SanpoResult<()> {
        if self.stall_on == Some(channel) {
            return Err(SanpoError::AudioEngine(format!(
                "simulated stall on {}",
                channel.label()
            )));
        }
        self.commands.push(MixerCommand::Start(channel));
        Ok(())
    }

    fn set_gain(&mut self, channel: AudioState, target: f32, ramp_seconds: f32) {
        self.commands.push(MixerCommand::Gain {
            channel,
            target,
            ramp_seconds,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        let status = DisplayStatus {
            phase: "running".into(),
            tempo_bpm: Some(96),
            activity_percent: Some(41.6),
            cadence: None,
            state: None,
            notice: Some("pointer fallback".into()),
        };
        assert_eq!(
            status.to_string(),
            "[running] 96 BPM activity 42% (pointer fallback)"
        );
    }

    #[test]
    fn test_recording_synth_dedups_tempo() {
        let mut synth = RecordingSynth::new();
        synth.set_tempo(90.0);
        synth.set_tempo(90.0);
        synth.set_tempo(91.5);
        assert_eq!(synth.tempo_changes, vec![90.0, 91.5]);
    }

    #[test]
    fn test_recording_mixer_failure() {
        let mut mixer = RecordingMixer::failing_on(AudioState::Walking);
        let stems = vec![
            (AudioState::Still, PathBuf::from("a.mp3")),
            (AudioState::Walking, PathBuf::from("b.mp3")),
        ];
        let err = mixer.load_stems(&stems).unwrap_err();
        assert!(err.is_fatal_to_startup());
        assert_eq!(mixer.loaded, vec![AudioState::Still]);
    }
}
