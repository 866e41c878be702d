use log::{debug, info, warn};
use rodio::{OutputStream, OutputStreamHandle, Source};
use std::time::{Duration, Instant};

use super::voice::{ToneVoice, Waveform};
use crate::engine::{Sound, Synthesizer, TriggerEvent, Voice};
use crate::error::{SanpoError, SanpoResult};

fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Keeps the summed voices clear of clipping.
const MASTER_GAIN: f32 = 0.5;

/// Plays scheduler triggers on the default output device.
///
/// Trigger times are transport seconds measured from `epoch`; each voice is
/// delayed until its slot. Without an output device the synth stays silent
/// and accepts every trigger.
pub struct RodioSynth {
    output: Option<(OutputStream, OutputStreamHandle)>,
    epoch: Instant,
    tempo_bpm: f32,
    voices_started: u64,
}

impl RodioSynth {
    pub fn open(epoch: Instant, base_bpm: f32) -> Self {
        let output = match OutputStream::try_default() {
            Ok(output) => {
                info!("Audio output opened");
                Some(output)
            }
            Err(e) => {
                warn!("Audio engine failed to start ({}), continuing silently", e);
                None
            }
        };
        Self {
            output,
            epoch,
            tempo_bpm: base_bpm,
            voices_started: 0,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.output.is_none()
    }

    pub fn voices_started(&self) -> u64 {
        self.voices_started
    }

    fn build_voices(&self, event: &TriggerEvent) -> Vec<ToneVoice> {
        let seconds = event.duration.seconds(self.tempo_bpm);
        let velocity = event.velocity.unwrap_or(1.0);

        match (&event.voice, &event.sound) {
            (Voice::Chord, Sound::Notes(notes)) => {
                let gain = db_to_gain(-10.0) / notes.len().max(1) as f32;
                notes
                    .iter()
                    .map(|note| {
                        ToneVoice::new(Waveform::Sine, note.frequency_hz(), seconds, gain)
                            .with_decay(seconds * 2.0)
                    })
                    .collect()
            }
            (Voice::Melody, Sound::Note(note)) => vec![ToneVoice::new(
                Waveform::Triangle,
                note.frequency_hz(),
                seconds,
                db_to_gain(-2.0) * 0.5,
            )
            .with_decay(seconds.max(0.2))],
            (Voice::Kick, Sound::Note(note)) => vec![ToneVoice::new(
                Waveform::Sine,
                note.frequency_hz(),
                seconds,
                db_to_gain(-4.0),
            )
            .with_pitch_drop(8.0, 0.05)
            .with_decay(0.2)],
            (Voice::Snare, _) => vec![ToneVoice::new(
                Waveform::Noise,
                0.0,
                seconds.min(0.2),
                db_to_gain(-12.0),
            )
            .with_decay(0.07)],
            (Voice::HiHat, _) => vec![ToneVoice::new(
                Waveform::Metallic,
                200.0,
                seconds,
                db_to_gain(-15.0) * velocity,
            )
            .with_decay(0.03)],
            (voice, sound) => {
                debug!("No patch for {:?} playing {:?}", voice, sound);
                Vec::new()
            }
        }
    }
}

impl Synthesizer for RodioSynth {
    fn set_tempo(&mut self, bpm: f32) {
        self.tempo_bpm = bpm;
    }

    fn trigger(&mut self, event: &TriggerEvent) -> SanpoResult<()> {
        let Some((_, handle)) = &self.output else {
            return Ok(());
        };

        let due = self.epoch + Duration::from_secs_f64(event.time_s.max(0.0));
        let delay = due.saturating_duration_since(Instant::now());

        for voice in self.build_voices(event) {
            handle
                .play_raw(voice.amplify(MASTER_GAIN).delay(delay))
                .map_err(|e| SanpoError::AudioEngine(e.to_string()))?;
            self.voices_started += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::{Note, NoteValue};

    fn silent_synth() -> RodioSynth {
        RodioSynth {
            output: None,
            epoch: Instant::now(),
            tempo_bpm: 120.0,
            voices_started: 0,
        }
    }

    #[test]
    fn test_chord_builds_one_voice_per_note() {
        let synth = silent_synth();
        let event = TriggerEvent {
            voice: Voice::Chord,
            sound: Sound::Notes(vec![
                Note::from_midi(60),
                Note::from_midi(64),
                Note::from_midi(67),
            ]),
            duration: NoteValue::Whole,
            time_s: 0.0,
            velocity: None,
        };
        assert_eq!(synth.build_voices(&event).len(), 3);
    }

    #[test]
    fn test_silent_synth_accepts_triggers() {
        let mut synth = silent_synth();
        let event = TriggerEvent {
            voice: Voice::Snare,
            sound: Sound::Noise,
            duration: NoteValue::Eighth,
            time_s: 1.0,
            velocity: None,
        };
        assert!(synth.trigger(&event).is_ok());
        assert!(synth.is_silent());
        assert_eq!(synth.voices_started(), 0);
    }

    #[test]
    fn test_db_to_gain() {
        assert!((db_to_gain(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_gain(-20.0) - 0.1).abs() < 1e-6);
    }
}
