//! The fixed eight-bar progression and its per-bar melody scales.

use super::Note;

const fn n(midi: u8) -> Note {
    Note::from_midi(midi)
}

// C3=48 ... see Note::parse for the mapping
const CHORDS: [[Note; 3]; 8] = [
    [n(48), n(52), n(55)], // C3 E3 G3
    [n(47), n(50), n(55)], // B2 D3 G3
    [n(45), n(48), n(52)], // A2 C3 E3
    [n(43), n(47), n(52)], // G2 B2 E3
    [n(41), n(45), n(48)], // F2 A2 C3
    [n(40), n(43), n(48)], // E2 G2 C3
    [n(41), n(45), n(48)], // F2 A2 C3
    [n(43), n(47), n(50)], // G2 B2 D3
];

const SCALES: [[Note; 5]; 8] = [
    [n(60), n(62), n(64), n(67), n(69)], // C4 D4 E4 G4 A4
    [n(59), n(62), n(67), n(69), n(71)], // B3 D4 G4 A4 B4
    [n(57), n(60), n(64), n(67), n(69)], // A3 C4 E4 G4 A4
    [n(55), n(59), n(64), n(67), n(71)], // G3 B3 E4 G4 B4
    [n(53), n(57), n(60), n(65), n(67)], // F3 A3 C4 F4 G4
    [n(52), n(55), n(60), n(64), n(67)], // E3 G3 C4 E4 G4
    [n(53), n(57), n(60), n(65), n(69)], // F3 A3 C4 F4 A4
    [n(55), n(59), n(62), n(67), n(69)], // G3 B3 D4 G4 A4
];

/// Chord voicing for a bar; bars wrap around the progression.
pub fn chord_for_bar(bar: usize) -> &'static [Note] {
    &CHORDS[bar % CHORDS.len()]
}

/// Candidate melody pitches for a bar, low to high.
pub fn scale_for_bar(bar: usize) -> &'static [Note] {
    &SCALES[bar % SCALES.len()]
}

/// Pick the candidate whose interval from `prev` is closest to
/// `1 + activity * 4` semitones. Ties go to the earliest candidate.
///
/// Calm motion favours steps of a semitone or two, lively motion favours
/// leaps of up to a fifth.
pub fn next_note(prev: Note, candidates: &[Note], activity: f32) -> Option<Note> {
    let bias = 1.0 + activity * 4.0;
    let mut best: Option<(Note, f32)> = None;

    for &candidate in candidates {
        let score = (prev.interval_to(candidate) as f32 - bias).abs();
        match best {
            Some((_, best_score)) if score >= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }

    best.map(|(note, _)| note)
}
