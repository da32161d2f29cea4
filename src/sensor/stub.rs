use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{EnvironmentSource, Pacer, SampleSource, Temperatures};

/// Sample source replaying a fixed script of raw draws.
///
/// The script wraps around once exhausted so long scans can be fed from a
/// short pattern. An empty script yields `None` forever.
#[derive(Debug, Clone)]
pub struct ScriptedSampleSource {
    script: Vec<Option<f64>>,
    cursor: usize,
    draws: Arc<AtomicU64>,
}

impl ScriptedSampleSource {
    pub fn new(script: Vec<Option<f64>>) -> Self {
        Self {
            script,
            cursor: 0,
            draws: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Script where every draw succeeds with the given values
    pub fn from_values(values: &[f64]) -> Self {
        Self::new(values.iter().copied().map(Some).collect())
    }

    /// Shared counter of draws performed, readable after the source moved
    pub fn draw_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.draws)
    }
}

impl SampleSource for ScriptedSampleSource {
    fn draw_sample(&mut self) -> Option<f64> {
        self.draws.fetch_add(1, Ordering::Relaxed);
        if self.script.is_empty() {
            return None;
        }
        let value = self.script[self.cursor % self.script.len()];
        self.cursor += 1;
        value
    }
}

/// Environment source returning constant readings.
#[derive(Debug, Clone)]
pub struct FixedEnvironment {
    pub temperatures: Temperatures,
    pub color: String,
}

impl FixedEnvironment {
    pub fn new(ambient: f64, object: f64, color: impl Into<String>) -> Self {
        Self {
            temperatures: Temperatures { ambient, object },
            color: color.into(),
        }
    }
}

impl Default for FixedEnvironment {
    /// Values reported when no temperature sensor is attached
    fn default() -> Self {
        Self::new(25.0, 25.0, "N/A")
    }
}

impl EnvironmentSource for FixedEnvironment {
    fn read_temperatures(&mut self) -> Temperatures {
        self.temperatures
    }

    fn read_color(&mut self) -> String {
        self.color.clone()
    }
}

/// Pacer that never sleeps and only accumulates the requested time.
#[derive(Debug, Default, Clone)]
pub struct RecordingPacer {
    total_micros: Arc<AtomicU64>,
    pauses: Arc<AtomicU64>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> Duration {
        Duration::from_micros(self.total_micros.load(Ordering::Relaxed))
    }

    pub fn pause_count(&self) -> u64 {
        self.pauses.load(Ordering::Relaxed)
    }
}

impl Pacer for RecordingPacer {
    fn pause(&self, duration: Duration) {
        self.total_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.pauses.fetch_add(1, Ordering::Relaxed);
    }
}
