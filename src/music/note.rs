//! Note names, MIDI numbers and note lengths.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{SanpoError, SanpoResult};

/// Semitone offsets for note letters (C=0 ... B=11).
const SEMITONE_MAP: [(char, i32); 7] = [
    ('C', 0),
    ('D', 2),
    ('E', 4),
    ('F', 5),
    ('G', 7),
    ('A', 9),
    ('B', 11),
];

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A pitch as a MIDI note number (C4 = 60, A4 = 69).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Note(u8);

impl Note {
    pub const fn from_midi(midi: u8) -> Self {
        Self(midi)
    }

    /// Parse scientific pitch notation: letter, optional `#`/`b`, octave
    /// (`C4`, `F#3`, `Bb2`, `C-1`).
    pub fn parse(name: &str) -> SanpoResult<Self> {
        let invalid = || SanpoError::InvalidNote(name.to_string());
        let mut chars = name.trim().chars();

        let letter = chars.next().ok_or_else(invalid)?.to_ascii_uppercase();
        let mut semitone = SEMITONE_MAP
            .iter()
            .find(|(c, _)| *c == letter)
            .map(|(_, s)| *s)
            .ok_or_else(invalid)?;

        let rest: String = chars.collect();
        let octave_str = if let Some(stripped) = rest.strip_prefix('#') {
            semitone += 1;
            stripped
        } else if let Some(stripped) = rest.strip_prefix('b') {
            semitone -= 1;
            stripped
        } else {
            rest.as_str()
        };

        let octave: i32 = octave_str.parse().map_err(|_| invalid())?;
        let midi = (octave + 1) * 12 + semitone;
        u8::try_from(midi)
            .ok()
            .filter(|m| *m <= 127)
            .map(Self)
            .ok_or_else(invalid)
    }

    pub fn midi(self) -> u8 {
        self.0
    }

    /// Equal-tempered frequency with A4 = 440 Hz.
    pub fn frequency_hz(self) -> f32 {
        440.0 * 2f32.powf((self.0 as f32 - 69.0) / 12.0)
    }

    /// Absolute distance in semitones.
    pub fn interval_to(self, other: Note) -> u8 {
        self.0.abs_diff(other.0)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let octave = self.0 as i32 / 12 - 1;
        write!(f, "{}{}", NOTE_NAMES[(self.0 % 12) as usize], octave)
    }
}

impl std::str::FromStr for Note {
    type Err = SanpoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Note lengths used by the scheduler, relative to a quarter-note beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteValue {
    Whole,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl NoteValue {
    pub fn beats(self) -> f32 {
        match self {
            NoteValue::Whole => 4.0,
            NoteValue::Quarter => 1.0,
            NoteValue::Eighth => 0.5,
            NoteValue::Sixteenth => 0.25,
            NoteValue::ThirtySecond => 0.125,
        }
    }

    pub fn seconds(self, bpm: f32) -> f32 {
        self.beats() * 60.0 / bpm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!(Note::parse("C4").unwrap().midi(), 60);
        assert_eq!(Note::parse("A4").unwrap().midi(), 69);
        assert_eq!(Note::parse("B2").unwrap().midi(), 47);
        assert_eq!(Note::parse("F#3").unwrap().midi(), 54);
        assert_eq!(Note::parse("Bb3").unwrap().midi(), 58);
        assert_eq!(Note::parse("C1").unwrap().midi(), 24);
        assert_eq!(Note::parse("C-1").unwrap().midi(), 0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for name in ["", "H4", "C", "C#x", "G10"] {
            assert!(Note::parse(name).is_err(), "{} should not parse", name);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Note::from_midi(60).to_string(), "C4");
        assert_eq!(Note::from_midi(54).to_string(), "F#3");
        let parsed: Note = "G3".parse().unwrap();
        assert_eq!(parsed.to_string(), "G3");
    }

    #[test]
    fn test_frequency() {
        assert!((Note::from_midi(69).frequency_hz() - 440.0).abs() < 1e-3);
        assert!((Note::from_midi(60).frequency_hz() - 261.63).abs() < 0.01);
    }

    #[test]
    fn test_note_values() {
        assert_eq!(NoteValue::Whole.seconds(120.0), 2.0);
        assert_eq!(NoteValue::Eighth.seconds(120.0), 0.25);
        assert_eq!(NoteValue::Sixteenth.seconds(90.0), 60.0 / 90.0 / 4.0);
    }
}
