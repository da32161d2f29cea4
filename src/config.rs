//! Configuration management for the measurement pipeline
//!
//! This module provides runtime configuration loading from JSON files so
//! timing constants and calibrated thresholds can be adjusted without
//! recompilation. Thresholds are loaded once at process start and handed to
//! the classifiers read-only.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::calibration::ThresholdSet;

/// Environment variable naming an alternate config file
pub const CONFIG_PATH_ENV: &str = "SURFACE_DETECTOR_CONFIG";

/// Config file used when [`CONFIG_PATH_ENV`] is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/detector.json";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub measurement: MeasurementConfig,
    #[serde(default)]
    pub thresholds: ThresholdSet,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

/// Distance acquisition parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementConfig {
    /// Lower bound of the valid range in cm (exclusive)
    pub min_distance_cm: f64,
    /// Upper bound of the valid range in cm (exclusive)
    pub max_distance_cm: f64,
    /// Settling delay before each raw draw
    pub settle_delay_ms: u64,
    /// Raw samples behind one stable reading during a scan
    pub samples_per_reading: usize,
    /// Pause between stable readings of a scan
    pub repetition_delay_ms: u64,
    /// Repetitions used when the caller does not ask for a count
    pub default_repetitions: usize,
    /// Upper clamp for caller-supplied repetitions
    pub max_repetitions: usize,
    /// Upper clamp for caller-supplied samples in a single check
    pub max_samples: usize,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            min_distance_cm: 2.0,
            max_distance_cm: 400.0,
            settle_delay_ms: 10,
            samples_per_reading: 10,
            repetition_delay_ms: 50,
            default_repetitions: 20,
            max_repetitions: 100,
            max_samples: 100,
        }
    }
}

impl MeasurementConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn repetition_delay(&self) -> Duration {
        Duration::from_millis(self.repetition_delay_ms)
    }

    /// Clamp a requested repetition count into `[1, max_repetitions]`
    pub fn clamp_repetitions(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_repetitions.max(1))
    }

    /// Clamp a requested sample count into `[1, max_samples]`
    pub fn clamp_samples(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_samples.max(1))
    }
}

/// Calibration procedure configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Stable readings collected per reference class
    pub readings_per_class: usize,
    /// Length of the completion beep after each class
    pub completion_beep_ms: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            readings_per_class: 50,
            completion_beep_ms: 200,
        }
    }
}

/// Display/buzzer side effect configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Disable to skip spawning the feedback worker entirely
    pub enabled: bool,
    /// Bounded queue size; events beyond it are dropped
    pub queue_capacity: usize,
    /// Beep length for the dashboard buzzer button
    pub beep_ms: u64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_capacity: 8,
            beep_ms: 50,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration. If the file doesn't exist or the JSON is
    /// invalid, logs a warning and returns the default config.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from `SURFACE_DETECTOR_CONFIG` or the default path
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load_from_file(path)
    }

    /// Write configuration as pretty JSON, creating parent directories
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        use anyhow::Context;

        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("[Config] Saved configuration to {:?}", path);
        Ok(())
    }
}
