pub mod cadence;
pub mod music;

pub use cadence::{AudioState, CadenceMapper, Crossfade};
pub use music::{ActivityBand, DrumHits, MusicMapper};
