use serde::{Deserialize, Serialize};

use crate::config::CadenceConfig;
use crate::control::ControlState;

/// Which stem is in front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioState {
    Still,
    Walking,
    FastWalking,
}

impl AudioState {
    pub const ALL: [AudioState; 3] = [
        AudioState::Still,
        AudioState::Walking,
        AudioState::FastWalking,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AudioState::Still => "still",
            AudioState::Walking => "walking",
            AudioState::FastWalking => "fast walking",
        }
    }
}

/// A state change that requires fading `from` out and `to` in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Crossfade {
    pub from: AudioState,
    pub to: AudioState,
}

/// Threshold state machine over cadence.
///
/// There is no hysteresis band: a cadence hovering on a threshold switches
/// state, and fades, every time it crosses.
#[derive(Debug, Clone)]
pub struct CadenceMapper {
    still_threshold: f32,
    walk_threshold: f32,
    state: AudioState,
}

impl CadenceMapper {
    pub fn new(config: &CadenceConfig) -> Self {
        Self {
            still_threshold: config.still_threshold,
            walk_threshold: config.walk_threshold,
            state: AudioState::Still,
        }
    }

    pub fn classify(&self, cadence: f32) -> AudioState {
        if cadence < self.still_threshold {
            AudioState::Still
        } else if cadence < self.walk_threshold {
            AudioState::Walking
        } else {
            AudioState::FastWalking
        }
    }

    /// Classify `cadence`; returns the crossfade to perform if the state changed.
    pub fn update(&mut self, cadence: f32) -> Option<Crossfade> {
        let next = self.classify(cadence);
        if next == self.state {
            return None;
        }
        let fade = Crossfade {
            from: self.state,
            to: next,
        };
        self.state = next;
        Some(fade)
    }

    /// `update`, also publishing the new state.
    pub fn apply(&mut self, cadence: f32, control: &mut ControlState) -> Option<Crossfade> {
        let fade = self.update(cadence);
        if fade.is_some() {
            control.mapper_port().set_audio_state(self.state);
        }
        fade
    }

    pub fn state(&self) -> AudioState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = AudioState::Still;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::Note;

    fn mapper() -> CadenceMapper {
        CadenceMapper::new(&CadenceConfig::default())
    }

    #[test]
    fn test_classify() {
        let mapper = mapper();
        assert_eq!(mapper.classify(0.0), AudioState::Still);
        assert_eq!(mapper.classify(29.9), AudioState::Still);
        assert_eq!(mapper.classify(30.0), AudioState::Walking);
        assert_eq!(mapper.classify(50.0), AudioState::Walking);
        assert_eq!(mapper.classify(110.0), AudioState::FastWalking);
        assert_eq!(mapper.classify(150.0), AudioState::FastWalking);
    }

    #[test]
    fn test_update_only_fires_on_change() {
        let mut mapper = mapper();
        assert_eq!(mapper.update(12.0), None);
        assert_eq!(
            mapper.update(60.0),
            Some(Crossfade {
                from: AudioState::Still,
                to: AudioState::Walking,
            })
        );
        assert_eq!(mapper.update(72.0), None);
        assert_eq!(
            mapper.update(120.0),
            Some(Crossfade {
                from: AudioState::Walking,
                to: AudioState::FastWalking,
            })
        );
        assert_eq!(mapper.state(), AudioState::FastWalking);
    }

    #[test]
    fn test_oscillation_retriggers() {
        let mut mapper = mapper();
        let fades = [24.0, 36.0, 24.0, 36.0, 24.0]
            .iter()
            .filter_map(|&c| mapper.update(c))
            .count();
        assert_eq!(fades, 4);
    }

    #[test]
    fn test_apply_publishes_state() {
        let mut mapper = mapper();
        let mut control = ControlState::new(90.0, Note::from_midi(60));
        mapper.apply(150.0, &mut control);
        assert_eq!(control.audio_state(), AudioState::FastWalking);
        assert_eq!(AudioState::FastWalking.label(), "fast walking");
    }
}
