//! Error types shared by the sensor pipeline, the sessions and the audio backends.

use thiserror::Error;

/// Result type for library operations.
pub type SanpoResult<T> = Result<T, SanpoError>;

/// Errors that can occur while acquiring sensor data or driving playback.
#[derive(Debug, Error)]
pub enum SanpoError {
    /// Motion sensor access was refused by the host.
    #[error("motion sensor permission denied")]
    PermissionDenied,

    /// No motion sensor is present on this host.
    #[error("motion sensor unavailable")]
    SensorUnavailable,

    /// An audio resource could not be fetched or decoded.
    #[error("failed to load '{path}': {reason}")]
    ResourceLoad {
        /// Path of the resource.
        path: String,
        /// Underlying cause.
        reason: String,
    },

    /// The audio output engine failed to start or to accept a voice.
    #[error("audio engine error: {0}")]
    AudioEngine(String),

    /// A configuration value is out of range.
    #[error("invalid config '{field}': {message}")]
    InvalidConfig {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A note name could not be parsed.
    #[error("invalid note name: {0}")]
    InvalidNote(String),

    /// A sensor trace line could not be parsed.
    #[error("trace line {line}: {reason}")]
    TraceParse {
        /// 1-based line number.
        line: usize,
        /// Parser message.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SanpoError {
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn resource_load(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::ResourceLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error must abort a session start. Permission problems and
    /// engine hiccups only degrade the session.
    pub fn is_fatal_to_startup(&self) -> bool {
        matches!(self, Self::ResourceLoad { .. })
    }
}
