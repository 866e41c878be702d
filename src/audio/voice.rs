use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use rodio::Source;
use std::f32::consts::TAU;
use std::time::Duration;

pub const SAMPLE_RATE: u32 = 44_100;

const ATTACK_SECONDS: f32 = 0.005;
const RELEASE_SECONDS: f32 = 0.08;

/// Inharmonic partial ratios of a cymbal-like metallic tone.
const METALLIC_PARTIALS: [f32; 6] = [1.0, 1.4471, 1.617, 1.9265, 2.5028, 2.6637];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Noise,
    Metallic,
}

/// One-shot mono oscillator with an attack, exponential decay and release.
///
/// The sound lasts for `seconds` plus a short release tail.
pub struct ToneVoice {
    waveform: Waveform,
    frequency: f32,
    gain: f32,
    seconds: f32,
    decay_seconds: Option<f32>,
    pitch_drop: Option<(f32, f32)>,
    phases: [f32; METALLIC_PARTIALS.len()],
    position: u64,
    total_samples: u64,
    noise: Pcg32,
}

impl ToneVoice {
    pub fn new(waveform: Waveform, frequency: f32, seconds: f32, gain: f32) -> Self {
        let seconds = seconds.max(0.0);
        Self {
            waveform,
            frequency,
            gain,
            seconds,
            decay_seconds: None,
            pitch_drop: None,
            phases: [0.0; METALLIC_PARTIALS.len()],
            position: 0,
            total_samples: ((seconds + RELEASE_SECONDS) * SAMPLE_RATE as f32) as u64,
            noise: Pcg32::seed_from_u64(frequency.to_bits() as u64),
        }
    }

    /// Exponential decay with time constant `seconds`.
    pub fn with_decay(mut self, seconds: f32) -> Self {
        self.decay_seconds = Some(seconds.max(1e-4));
        self
    }

    /// Start `ratio` times higher and fall to the base pitch with time
    /// constant `seconds`.
    pub fn with_pitch_drop(mut self, ratio: f32, seconds: f32) -> Self {
        self.pitch_drop = Some((ratio, seconds.max(1e-4)));
        self
    }

    fn elapsed(&self) -> f32 {
        self.position as f32 / SAMPLE_RATE as f32
    }

    fn envelope(&self, t: f32) -> f32 {
        let attack = (t / ATTACK_SECONDS).min(1.0);
        let decay = self.decay_seconds.map_or(1.0, |tau| (-t / tau).exp());
        let release = if t > self.seconds {
            (1.0 - (t - self.seconds) / RELEASE_SECONDS).max(0.0)
        } else {
            1.0
        };
        attack * decay * release
    }

    fn frequency_at(&self, t: f32) -> f32 {
        match self.pitch_drop {
            Some((ratio, tau)) => {
                self.frequency * (1.0 + (ratio - 1.0) * (-t / tau).exp())
            }
            None => self.frequency,
        }
    }

    fn advance_phase(&mut self, index: usize, frequency: f32) -> f32 {
        let phase = self.phases[index];
        self.phases[index] = (phase + frequency / SAMPLE_RATE as f32).fract();
        phase
    }

    fn oscillate(&mut self, t: f32) -> f32 {
        match self.waveform {
            Waveform::Sine => {
                let phase = self.advance_phase(0, self.frequency_at(t));
                (phase * TAU).sin()
            }
            Waveform::Triangle => {
                let phase = self.advance_phase(0, self.frequency_at(t));
                1.0 - 4.0 * (phase - 0.5).abs()
            }
            Waveform::Noise => self.noise.gen_range(-1.0..1.0),
            Waveform::Metallic => {
                let base = self.frequency;
                let mut sum = 0.0;
                for (index, ratio) in METALLIC_PARTIALS.iter().enumerate() {
                    let phase = self.advance_phase(index, base * ratio);
                    sum += if phase < 0.5 { 1.0 } else { -1.0 };
                }
                sum / METALLIC_PARTIALS.len() as f32
            }
        }
    }
}

impl Iterator for ToneVoice {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.position >= self.total_samples {
            return None;
        }
        let t = self.elapsed();
        let sample = self.oscillate(t) * self.envelope(t) * self.gain;
        self.position += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total_samples - self.position) as usize;
        (remaining, Some(remaining))
    }
}

impl Source for ToneVoice {
    fn current_frame_len(&self) -> Option<usize> {
        Some((self.total_samples - self.position) as usize)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(self.seconds + RELEASE_SECONDS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_includes_release() {
        let voice = ToneVoice::new(Waveform::Sine, 440.0, 0.5, 1.0);
        let expected = ((0.5 + RELEASE_SECONDS) * SAMPLE_RATE as f32) as usize;
        assert_eq!(voice.count(), expected);
    }

    #[test]
    fn test_output_is_bounded_by_gain() {
        for waveform in [
            Waveform::Sine,
            Waveform::Triangle,
            Waveform::Noise,
            Waveform::Metallic,
        ] {
            let voice = ToneVoice::new(waveform, 220.0, 0.1, 0.5);
            assert!(voice.into_iter().all(|s| s.abs() <= 0.5 + 1e-6));
        }
    }

    #[test]
    fn test_decay_fades_out() {
        let samples: Vec<f32> = ToneVoice::new(Waveform::Noise, 1.0, 1.0, 1.0)
            .with_decay(0.05)
            .collect();
        let early: f32 = samples[400..800].iter().map(|s| s.abs()).sum();
        let late: f32 = samples[40_000..40_400].iter().map(|s| s.abs()).sum();
        assert!(late < early * 0.01);
    }

    #[test]
    fn test_pitch_drop_settles() {
        let voice = ToneVoice::new(Waveform::Sine, 32.7, 0.5, 1.0).with_pitch_drop(8.0, 0.05);
        assert!((voice.frequency_at(0.0) - 32.7 * 8.0).abs() < 1e-3);
        assert!((voice.frequency_at(0.5) - 32.7).abs() < 0.01);
    }

    #[test]
    fn test_ends_silent() {
        let last = ToneVoice::new(Waveform::Triangle, 440.0, 0.2, 1.0)
            .last()
            .unwrap();
        assert!(last.abs() < 0.01);
    }
}
