use rand::Rng;
use serde::Serialize;

use crate::config::MusicConfig;
use crate::control::ControlState;
use crate::music::NoteValue;

/// Drum triggers for one sixteenth step. Hi-hat carries its velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DrumHits {
    pub kick: bool,
    pub snare: bool,
    pub hihat: Option<f32>,
}

/// Coarse activity band used for drum pattern selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityBand {
    Calm,
    Moving,
    Energetic,
}

const ACCENT_VELOCITY: f32 = 1.0;
const GHOST_VELOCITY: f32 = 0.3;

/// Maps smoothed motion variance to tempo, activity and per-tick musical
/// choices.
#[derive(Debug, Clone)]
pub struct MusicMapper {
    config: MusicConfig,
}

impl MusicMapper {
    pub fn new(config: MusicConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MusicConfig {
        &self.config
    }

    pub fn tempo(&self, smoothed: f32) -> f32 {
        (self.config.base_bpm + smoothed * self.config.tempo_gain)
            .clamp(self.config.min_bpm, self.config.max_bpm)
    }

    pub fn activity(&self, smoothed: f32) -> f32 {
        (smoothed / self.config.activity_divisor).clamp(0.0, 1.0)
    }

    /// Derive tempo and activity from the current smoothed statistic and
    /// publish them. Returns `(tempo_bpm, activity)`.
    pub fn apply(&self, state: &mut ControlState) -> (f32, f32) {
        let smoothed = state.smoothed_statistic();
        let tempo = self.tempo(smoothed);
        let activity = self.activity(smoothed);

        let mut port = state.mapper_port();
        port.set_tempo_bpm(tempo);
        port.set_activity(activity);
        (tempo, activity)
    }

    pub fn band(&self, activity: f32) -> ActivityBand {
        if activity < self.config.low_activity {
            ActivityBand::Calm
        } else if activity < self.config.high_activity {
            ActivityBand::Moving
        } else {
            ActivityBand::Energetic
        }
    }

    /// Number of sixteenth ticks until the next melody decision.
    pub fn melody_step<R: Rng + ?Sized>(&self, activity: f32, rng: &mut R) -> u64 {
        let step = if activity < self.config.low_activity {
            4
        } else if activity <= self.config.high_activity {
            2
        } else {
            1
        };

        if rng.gen::<f32>() < self.config.step_double_chance {
            step * 2
        } else {
            step
        }
    }

    pub fn note_duration(step: u64) -> NoteValue {
        if step >= 4 {
            NoteValue::Quarter
        } else {
            NoteValue::Eighth
        }
    }

    /// Chance that an eligible melody tick sounds a note.
    pub fn note_probability(&self, activity: f32) -> f32 {
        1.0 - self.rest_chance(activity)
    }

    fn rest_chance(&self, activity: f32) -> f32 {
        if activity > self.config.busy_activity {
            self.config.busy_rest_chance
        } else {
            self.config.rest_chance
        }
    }

    pub fn should_play_note<R: Rng + ?Sized>(&self, activity: f32, rng: &mut R) -> bool {
        rng.gen::<f32>() > self.rest_chance(activity)
    }

    /// Kick/snare/hi-hat for position `step` of the bar. Patterns are laid
    /// out on quarter-note beats of `steps_per_bar / 4` steps each.
    pub fn drum_hits(&self, activity: f32, step: u64) -> DrumHits {
        let step = step % self.config.steps_per_bar.max(1);
        let beat = (self.config.steps_per_bar / 4).max(1);
        let half_beat = (beat / 2).max(1);
        let on_beat = step % beat == 0;
        let backbeat = on_beat && (step / beat) % 2 == 1;

        let (kick, snare, hat) = match self.band(activity) {
            ActivityBand::Calm => (on_beat && (step / beat) % 2 == 0, false, on_beat),
            ActivityBand::Moving => (
                step == 0 || step == 2 * beat + half_beat,
                backbeat,
                step % half_beat == 0,
            ),
            ActivityBand::Energetic => (on_beat, backbeat, true),
        };

        let velocity = if on_beat {
            ACCENT_VELOCITY
        } else {
            GHOST_VELOCITY
        };

        DrumHits {
            kick,
            snare,
            hihat: hat.then_some(velocity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::Note;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn mapper() -> MusicMapper {
        MusicMapper::new(MusicConfig::default())
    }

    #[test]
    fn test_tempo_clamped() {
        let mapper = mapper();
        assert_eq!(mapper.tempo(0.0), 90.0);
        assert_eq!(mapper.tempo(5.0), 120.0);
        assert_eq!(mapper.tempo(10.0), 150.0);
        assert_eq!(mapper.tempo(1e6), 150.0);
        for i in 0..1000 {
            let tempo = mapper.tempo(i as f32 * 0.013);
            assert!((90.0..=150.0).contains(&tempo));
        }
    }

    #[test]
    fn test_activity_normalised() {
        let mapper = mapper();
        assert_eq!(mapper.activity(0.0), 0.0);
        assert_eq!(mapper.activity(3.0), 0.5);
        assert_eq!(mapper.activity(12.0), 1.0);
    }

    #[test]
    fn test_apply_publishes() {
        let mapper = mapper();
        let mut state = ControlState::new(90.0, Note::from_midi(60));
        state.smoother_port().set_smoothed_statistic(1.8634 * 0.05);
        let (tempo, activity) = mapper.apply(&mut state);
        assert!((tempo - 90.559).abs() < 1e-3);
        assert_eq!(state.tempo_bpm(), tempo);
        assert_eq!(state.activity(), activity);
    }

    #[test]
    fn test_melody_step_bands() {
        let mapper = mapper();
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..200 {
            assert!(matches!(mapper.melody_step(0.1, &mut rng), 4 | 8));
            assert!(matches!(mapper.melody_step(0.7, &mut rng), 2 | 4));
            assert!(matches!(mapper.melody_step(0.9, &mut rng), 1 | 2));
        }
    }

    #[test]
    fn test_melody_step_doubles_about_a_third_of_the_time() {
        let mapper = mapper();
        let mut rng = Pcg32::seed_from_u64(42);
        let doubled = (0..10_000)
            .filter(|_| mapper.melody_step(0.5, &mut rng) == 4)
            .count();
        assert!((2_700..3_300).contains(&doubled), "doubled {}", doubled);
    }

    #[test]
    fn test_note_probability() {
        let mapper = mapper();
        assert!((mapper.note_probability(0.5) - 0.8).abs() < 1e-6);
        assert!((mapper.note_probability(0.8) - 0.8).abs() < 1e-6);
        assert!((mapper.note_probability(0.81) - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_note_duration() {
        assert_eq!(MusicMapper::note_duration(8), NoteValue::Quarter);
        assert_eq!(MusicMapper::note_duration(4), NoteValue::Quarter);
        assert_eq!(MusicMapper::note_duration(2), NoteValue::Eighth);
        assert_eq!(MusicMapper::note_duration(1), NoteValue::Eighth);
    }

    #[test]
    fn test_calm_drums() {
        let mapper = mapper();
        let hits: Vec<DrumHits> = (0..16).map(|s| mapper.drum_hits(0.1, s)).collect();
        let kicks: Vec<u64> = (0..16).filter(|&s| hits[s as usize].kick).collect();
        let hats: Vec<u64> = (0..16).filter(|&s| hits[s as usize].hihat.is_some()).collect();
        assert_eq!(kicks, vec![0, 8]);
        assert_eq!(hats, vec![0, 4, 8, 12]);
        assert!(hits.iter().all(|h| !h.snare));
    }

    #[test]
    fn test_moving_drums() {
        let mapper = mapper();
        let hits: Vec<DrumHits> = (0..16).map(|s| mapper.drum_hits(0.5, s)).collect();
        let kicks: Vec<usize> = (0..16).filter(|&s| hits[s].kick).collect();
        let snares: Vec<usize> = (0..16).filter(|&s| hits[s].snare).collect();
        assert_eq!(kicks, vec![0, 10]);
        assert_eq!(snares, vec![4, 12]);
        assert_eq!(hits[2].hihat, Some(0.3));
        assert_eq!(hits[4].hihat, Some(1.0));
        assert_eq!(hits[3].hihat, None);
    }

    #[test]
    fn test_drums_follow_bar_length() {
        let mapper = MusicMapper::new(MusicConfig {
            steps_per_bar: 8,
            ..MusicConfig::default()
        });
        let calm: Vec<DrumHits> = (0..8).map(|s| mapper.drum_hits(0.1, s)).collect();
        let kicks: Vec<usize> = (0..8).filter(|&s| calm[s].kick).collect();
        let hats: Vec<usize> = (0..8).filter(|&s| calm[s].hihat.is_some()).collect();
        assert_eq!(kicks, vec![0, 4]);
        assert_eq!(hats, vec![0, 2, 4, 6]);
        assert_eq!(mapper.drum_hits(0.1, 8), calm[0]);

        let moving: Vec<DrumHits> = (0..8).map(|s| mapper.drum_hits(0.5, s)).collect();
        let kicks: Vec<usize> = (0..8).filter(|&s| moving[s].kick).collect();
        let snares: Vec<usize> = (0..8).filter(|&s| moving[s].snare).collect();
        assert_eq!(kicks, vec![0, 5]);
        assert_eq!(snares, vec![2, 6]);
        assert_eq!(moving[1].hihat, Some(0.3));
    }

    #[test]
    fn test_energetic_drums() {
        let mapper = mapper();
        let hits: Vec<DrumHits> = (0..16).map(|s| mapper.drum_hits(0.7, s)).collect();
        let kicks: Vec<usize> = (0..16).filter(|&s| hits[s].kick).collect();
        assert_eq!(kicks, vec![0, 4, 8, 12]);
        assert!(hits.iter().all(|h| h.hihat.is_some()));
        assert_eq!(hits[13].hihat, Some(0.3));
        assert_eq!(mapper.drum_hits(0.7, 20), hits[4]);
    }
}
