//! Motion-reactive music: accelerometer readings drive either a generative
//! music pipeline (tempo and note density follow how much the device is
//! shaken) or a stem crossfader (walking cadence picks which loop is heard).

pub mod analysis;
pub mod audio;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod music;
pub mod replay;
pub mod runtime;
pub mod scheduler;
pub mod sensor;
pub mod session;
pub mod smoother;

pub use config::SanpoConfig;
pub use error::{SanpoError, SanpoResult};
