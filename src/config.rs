use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SanpoError, SanpoResult};

/// Complete tuning for both pipelines and the live driver.
///
/// Every section falls back to its defaults when missing from a JSON file, so
/// a config on disk only needs to carry the values that differ.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SanpoConfig {
    pub motion: MotionConfig,
    pub music: MusicConfig,
    pub cadence: CadenceConfig,
    pub runtime: RuntimeConfig,
}

/// Variance engine and smoothing parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MotionConfig {
    /// Trailing horizon of the sample buffer
    pub window_ms: u64,
    /// Below this many samples the variance engine reports 0
    pub min_samples: usize,
    /// EMA factor applied once per frame, in (0, 1)
    pub smoothing_factor: f32,
    /// Upper bound (exclusive) of the pointer fallback signal
    pub fallback_range: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            window_ms: 2000,
            min_samples: 5,
            smoothing_factor: 0.05,
            fallback_range: 8.0,
        }
    }
}

/// Mapping from smoothed variance to tempo, activity and note choices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MusicConfig {
    pub base_bpm: f32,
    pub min_bpm: f32,
    pub max_bpm: f32,
    /// BPM added per unit of smoothed variance
    pub tempo_gain: f32,
    /// Smoothed variance that maps to full activity
    pub activity_divisor: f32,

    // Activity bands
    pub low_activity: f32,
    pub high_activity: f32,
    pub busy_activity: f32,

    // Melody probabilities
    pub step_double_chance: f32,
    pub rest_chance: f32,
    pub busy_rest_chance: f32,

    pub bars: usize,
    pub steps_per_bar: u64,

    /// Fixed RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
    pub initial_pitch: String,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            base_bpm: 90.0,
            min_bpm: 90.0,
            max_bpm: 150.0,
            tempo_gain: 6.0,
            activity_divisor: 6.0,
            low_activity: 0.3,
            high_activity: 0.7,
            busy_activity: 0.8,
            step_double_chance: 0.3,
            rest_chance: 0.2,
            busy_rest_chance: 0.1,
            bars: 8,
            steps_per_bar: 16,
            seed: None,
            initial_pitch: "C4".to_string(),
        }
    }
}

/// Step counting and stem crossfade parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CadenceConfig {
    /// Gravity-free acceleration magnitude that counts as a peak (m/s²)
    pub peak_threshold: f32,
    /// Peaks closer than this are chatter
    pub step_interval_ms: u64,
    pub history_window_ms: u64,
    /// Cadence (steps/min) below which the walker is still
    pub still_threshold: f32,
    /// Cadence below which the walker is walking, fast walking above
    pub walk_threshold: f32,
    pub crossfade_seconds: f32,
    pub still_stem: PathBuf,
    pub walking_stem: PathBuf,
    pub fast_stem: PathBuf,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            peak_threshold: 1.8,
            step_interval_ms: 350,
            history_window_ms: 5000,
            still_threshold: 30.0,
            walk_threshold: 110.0,
            crossfade_seconds: 2.0,
            still_stem: PathBuf::from("sanpo_bass.mp3"),
            walking_stem: PathBuf::from("sanpo_drums.mp3"),
            fast_stem: PathBuf::from("sanpo_other.mp3"),
        }
    }
}

/// Live driver cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Period of the frame task (~60 fps)
    pub frame_interval_ms: u64,
    /// Status line is emitted once every this many frames
    pub status_every_frames: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            status_every_frames: 60,
        }
    }
}

impl SanpoConfig {
    /// Load a config from a JSON file and validate it.
    pub fn load_json<P: AsRef<Path>>(path: P) -> SanpoResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the config as pretty-printed JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> SanpoResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> SanpoResult<()> {
        let motion = &self.motion;
        if !(motion.smoothing_factor > 0.0 && motion.smoothing_factor < 1.0) {
            return Err(SanpoError::invalid_config(
                "motion.smoothing_factor",
                "must be in (0, 1)",
            ));
        }
        if motion.window_ms == 0 {
            return Err(SanpoError::invalid_config("motion.window_ms", "must be > 0"));
        }
        if motion.fallback_range <= 0.0 {
            return Err(SanpoError::invalid_config(
                "motion.fallback_range",
                "must be > 0",
            ));
        }

        let music = &self.music;
        if music.min_bpm <= 0.0 || music.min_bpm > music.max_bpm {
            return Err(SanpoError::invalid_config(
                "music.min_bpm",
                format!("must be in (0, max_bpm={}]", music.max_bpm),
            ));
        }
        if music.activity_divisor <= 0.0 {
            return Err(SanpoError::invalid_config(
                "music.activity_divisor",
                "must be > 0",
            ));
        }
        if music.bars == 0 {
            return Err(SanpoError::invalid_config("music.bars", "must be > 0"));
        }
        if music.steps_per_bar == 0 || music.steps_per_bar % 4 != 0 {
            return Err(SanpoError::invalid_config(
                "music.steps_per_bar",
                "must be a positive multiple of 4",
            ));
        }
        crate::music::Note::parse(&music.initial_pitch)?;

        let cadence = &self.cadence;
        if cadence.history_window_ms == 0 {
            return Err(SanpoError::invalid_config(
                "cadence.history_window_ms",
                "must be > 0",
            ));
        }
        if cadence.still_threshold >= cadence.walk_threshold {
            return Err(SanpoError::invalid_config(
                "cadence.still_threshold",
                "must be below walk_threshold",
            ));
        }
        if cadence.crossfade_seconds <= 0.0 {
            return Err(SanpoError::invalid_config(
                "cadence.crossfade_seconds",
                "must be > 0",
            ));
        }

        if self.runtime.frame_interval_ms == 0 {
            return Err(SanpoError::invalid_config(
                "runtime.frame_interval_ms",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        SanpoConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SanpoConfig =
            serde_json::from_str(r#"{ "music": { "max_bpm": 140.0, "seed": 7 } }"#).unwrap();
        assert_eq!(config.music.max_bpm, 140.0);
        assert_eq!(config.music.seed, Some(7));
        assert_eq!(config.music.base_bpm, 90.0);
        assert_eq!(config.motion, MotionConfig::default());
    }

    #[test]
    fn test_rejects_bad_smoothing() {
        let mut config = SanpoConfig::default();
        config.motion.smoothing_factor = 1.0;
        assert!(matches!(
            config.validate(),
            Err(SanpoError::InvalidConfig { ref field, .. }) if field == "motion.smoothing_factor"
        ));
    }

    #[test]
    fn test_rejects_inverted_cadence_thresholds() {
        let mut config = SanpoConfig::default();
        config.cadence.still_threshold = 120.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bar_length_must_split_into_beats() {
        let mut config = SanpoConfig::default();
        config.music.steps_per_bar = 12;
        assert!(config.validate().is_ok());
        config.music.steps_per_bar = 10;
        assert!(matches!(
            config.validate(),
            Err(SanpoError::InvalidConfig { ref field, .. }) if field == "music.steps_per_bar"
        ));
    }

    #[test]
    fn test_rejects_bad_initial_pitch() {
        let mut config = SanpoConfig::default();
        config.music.initial_pitch = "H9".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("sanpo-config-{}.json", std::process::id()));
        let mut config = SanpoConfig::default();
        config.cadence.walk_threshold = 100.0;
        config.save_json(&path).unwrap();
        let loaded = SanpoConfig::load_json(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }
}
