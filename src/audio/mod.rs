//! rodio output backends for the synthesizer and stem mixer seams.

pub mod gain;
pub mod stems;
pub mod synth;
pub mod voice;

pub use gain::{GainCommand, GainRamp, RampedGain};
pub use stems::RodioStemMixer;
pub use synth::RodioSynth;
pub use voice::{ToneVoice, Waveform};
