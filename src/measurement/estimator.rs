// DistanceEstimator - one stable reading from a burst of raw draws
//
// Draws are strictly sequential with a settling delay before each one. Draws
// that fail or fall outside the valid range shrink the effective sample size;
// there is no retry.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::stats::{mean, round_to, sample_std_dev};
use crate::config::MeasurementConfig;
use crate::sensor::{Pacer, SampleSource};

/// Open interval of distances the ranger can report reliably
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidRange {
    pub min_cm: f64,
    pub max_cm: f64,
}

impl ValidRange {
    pub fn new(min_cm: f64, max_cm: f64) -> Self {
        Self { min_cm, max_cm }
    }

    /// Both endpoints are excluded
    pub fn contains(&self, distance_cm: f64) -> bool {
        self.min_cm < distance_cm && distance_cm < self.max_cm
    }
}

impl Default for ValidRange {
    fn default() -> Self {
        Self::new(2.0, 400.0)
    }
}

/// Mean and local sigma of one burst of draws
///
/// `mean == 0.0` is the "no reading" marker, not a physical distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StableReading {
    pub mean: f64,
    pub local_sigma: f64,
    pub valid_samples: usize,
}

impl StableReading {
    /// Marker returned when every draw was rejected
    pub const NO_READING: StableReading = StableReading {
        mean: 0.0,
        local_sigma: 0.0,
        valid_samples: 0,
    };

    pub fn has_distance(&self) -> bool {
        self.mean > 0.0
    }
}

/// Reduces raw ultrasonic draws to a [`StableReading`]
pub struct DistanceEstimator<S> {
    source: S,
    pacer: Arc<dyn Pacer>,
    range: ValidRange,
    settle_delay: Duration,
}

impl<S: SampleSource> DistanceEstimator<S> {
    pub fn new(source: S, pacer: Arc<dyn Pacer>, config: &MeasurementConfig) -> Self {
        Self {
            source,
            pacer,
            range: ValidRange::new(config.min_distance_cm, config.max_distance_cm),
            settle_delay: config.settle_delay(),
        }
    }

    /// Draw `sample_count` raw samples and reduce the in-range subset
    ///
    /// # Returns
    /// * `NO_READING` when no draw landed in range
    /// * `(sample, 0.0)` when exactly one did
    /// * `(mean, sample stdev)` otherwise, both rounded to 2 decimals
    pub fn measure(&mut self, sample_count: usize) -> StableReading {
        let mut readings = Vec::new();
        for _ in 0..sample_count {
            self.pacer.pause(self.settle_delay);
            match self.source.draw_sample() {
                Some(distance) if self.range.contains(distance) => readings.push(distance),
                Some(distance) => {
                    tracing::trace!(distance, "discarding out-of-range sample");
                }
                None => {
                    tracing::trace!("sample draw failed");
                }
            }
        }

        let Some(avg) = mean(&readings) else {
            tracing::debug!(sample_count, "no valid samples in burst");
            return StableReading::NO_READING;
        };
        let sigma = sample_std_dev(&readings).unwrap_or(0.0);

        StableReading {
            mean: round_to(avg, 2),
            local_sigma: round_to(sigma, 2),
            valid_samples: readings.len(),
        }
    }

    pub fn pacer(&self) -> &Arc<dyn Pacer> {
        &self.pacer
    }
}
