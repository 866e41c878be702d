//! Control state shared between the sensor pipeline and the scheduler.
//!
//! Each field has exactly one writer. Writes go through a role port borrowed
//! from the state (`sensor_port`, `smoother_port`, `mapper_port`,
//! `scheduler_port`), and each port only exposes setters for the fields its
//! role owns. Reads are open to everyone.

use crate::mapping::AudioState;
use crate::music::Note;

#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    base_bpm: f32,
    raw_statistic: f32,
    smoothed_statistic: f32,
    activity: f32,
    tempo_bpm: f32,
    previous_pitch: Note,
    audio_state: AudioState,
}

impl ControlState {
    pub fn new(base_bpm: f32, initial_pitch: Note) -> Self {
        Self {
            base_bpm,
            raw_statistic: 0.0,
            smoothed_statistic: 0.0,
            activity: 0.0,
            tempo_bpm: base_bpm,
            previous_pitch: initial_pitch,
            audio_state: AudioState::Still,
        }
    }

    pub fn raw_statistic(&self) -> f32 {
        self.raw_statistic
    }

    pub fn smoothed_statistic(&self) -> f32 {
        self.smoothed_statistic
    }

    pub fn activity(&self) -> f32 {
        self.activity
    }

    pub fn tempo_bpm(&self) -> f32 {
        self.tempo_bpm
    }

    pub fn previous_pitch(&self) -> Note {
        self.previous_pitch
    }

    pub fn audio_state(&self) -> AudioState {
        self.audio_state
    }

    pub fn sensor_port(&mut self) -> SensorPort<'_> {
        SensorPort { state: self }
    }

    pub fn smoother_port(&mut self) -> SmootherPort<'_> {
        SmootherPort { state: self }
    }

    pub fn mapper_port(&mut self) -> MapperPort<'_> {
        MapperPort { state: self }
    }

    pub fn scheduler_port(&mut self) -> SchedulerPort<'_> {
        SchedulerPort { state: self }
    }

    /// Back to the startup values on stop/teardown. Only the melodic memory
    /// survives, so the next start picks up the line where it left off.
    pub fn reset_to_defaults(&mut self) {
        self.raw_statistic = 0.0;
        self.smoothed_statistic = 0.0;
        self.activity = 0.0;
        self.tempo_bpm = self.base_bpm;
        self.audio_state = AudioState::Still;
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new(90.0, Note::from_midi(60))
    }
}

/// Write access for the acquisition callback.
pub struct SensorPort<'a> {
    state: &'a mut ControlState,
}

impl SensorPort<'_> {
    pub fn set_raw_statistic(&mut self, value: f32) {
        self.state.raw_statistic = value;
    }
}

/// Write access for the per-frame smoother.
pub struct SmootherPort<'a> {
    state: &'a mut ControlState,
}

impl SmootherPort<'_> {
    pub fn set_smoothed_statistic(&mut self, value: f32) {
        self.state.smoothed_statistic = value;
    }
}

/// Write access for the decision mappers.
pub struct MapperPort<'a> {
    state: &'a mut ControlState,
}

impl MapperPort<'_> {
    pub fn set_tempo_bpm(&mut self, bpm: f32) {
        self.state.tempo_bpm = bpm;
    }

    pub fn set_activity(&mut self, activity: f32) {
        self.state.activity = activity;
    }

    pub fn set_audio_state(&mut self, state: AudioState) {
        self.state.audio_state = state;
    }
}

/// Write access for the event scheduler.
pub struct SchedulerPort<'a> {
    state: &'a mut ControlState,
}

impl SchedulerPort<'_> {
    pub fn set_previous_pitch(&mut self, pitch: Note) {
        self.state.previous_pitch = pitch;
    }
}
