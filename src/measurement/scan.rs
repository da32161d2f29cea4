// ScanAggregator - macro sigma across repeated stable readings
//
// Surface irregularity shows up as repetition-to-repetition instability
// rather than single-burst noise, so the scan keeps one mean per repetition
// and computes the dispersion of those means.

use serde::{Deserialize, Serialize};

use super::estimator::{DistanceEstimator, StableReading};
use super::stats::{mean, round_to, sample_std_dev};
use crate::config::MeasurementConfig;
use crate::error::MeasurementError;
use crate::sensor::SampleSource;
use std::time::Duration;

/// Valid readings needed before an overall sigma is defined
pub const MIN_SCAN_READINGS: usize = 2;

/// One plotted point of a scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanPoint {
    /// 1-based index among the valid readings
    pub reading: usize,
    pub distance: f64,
}

/// Valid per-repetition means plus their overall statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Repetitions attempted, including those without a distance
    pub repetitions: usize,
    pub readings: Vec<f64>,
    /// Rounded to 2 decimals
    pub overall_mean: f64,
    /// Rounded to 3 decimals
    pub overall_sigma: f64,
}

impl ScanResult {
    /// Compute overall statistics from collected means
    ///
    /// # Errors
    /// `InsufficientReadings` when fewer than [`MIN_SCAN_READINGS`] means
    /// were collected; an under-sampled scan is never reported as sigma 0.
    pub fn from_readings(readings: Vec<f64>, repetitions: usize) -> Result<Self, MeasurementError> {
        let insufficient = || MeasurementError::InsufficientReadings {
            required: MIN_SCAN_READINGS,
            collected: readings.len(),
        };
        let sigma = sample_std_dev(&readings).ok_or_else(insufficient)?;
        let avg = mean(&readings).ok_or_else(insufficient)?;

        Ok(Self {
            repetitions,
            overall_mean: round_to(avg, 2),
            overall_sigma: round_to(sigma, 3),
            readings,
        })
    }

    pub fn points(&self) -> Vec<ScanPoint> {
        self.readings
            .iter()
            .enumerate()
            .map(|(i, &distance)| ScanPoint {
                reading: i + 1,
                distance,
            })
            .collect()
    }

    pub fn valid_readings(&self) -> usize {
        self.readings.len()
    }
}

/// Drives a [`DistanceEstimator`] through a whole scan
pub struct ScanAggregator<'a, S> {
    estimator: &'a mut DistanceEstimator<S>,
    samples_per_reading: usize,
    repetition_delay: Duration,
}

impl<'a, S: SampleSource> ScanAggregator<'a, S> {
    pub fn new(estimator: &'a mut DistanceEstimator<S>, config: &MeasurementConfig) -> Self {
        Self {
            estimator,
            samples_per_reading: config.samples_per_reading,
            repetition_delay: config.repetition_delay(),
        }
    }

    /// Take one stable reading and let the target settle afterwards
    pub fn next_reading(&mut self) -> StableReading {
        let reading = self.estimator.measure(self.samples_per_reading);
        self.estimator.pacer().pause(self.repetition_delay);
        reading
    }

    /// Run `repetitions` stable readings (callers guarantee `>= 1`)
    ///
    /// Repetitions without a distance are skipped, not counted as zero.
    pub fn run(&mut self, repetitions: usize) -> Result<ScanResult, MeasurementError> {
        let mut readings = Vec::with_capacity(repetitions);
        for _ in 0..repetitions {
            let reading = self.next_reading();
            if reading.has_distance() {
                readings.push(reading.mean);
            }
        }

        let collected = readings.len();
        let result = ScanResult::from_readings(readings, repetitions)?;
        tracing::debug!(
            repetitions,
            collected,
            mean = result.overall_mean,
            sigma = result.overall_sigma,
            "scan complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{RecordingPacer, ScriptedSampleSource};
    use std::sync::Arc;

    fn estimator(
        script: Vec<Option<f64>>,
    ) -> (DistanceEstimator<ScriptedSampleSource>, RecordingPacer) {
        let pacer = RecordingPacer::new();
        let estimator = DistanceEstimator::new(
            ScriptedSampleSource::new(script),
            Arc::new(pacer.clone()),
            &MeasurementConfig::default(),
        );
        (estimator, pacer)
    }

    /// Script where repetition `i` reads `values[i]` for all 10 samples
    fn per_repetition(values: &[Option<f64>]) -> Vec<Option<f64>> {
        values
            .iter()
            .flat_map(|v| std::iter::repeat(*v).take(10))
            .collect()
    }

    #[test]
    fn overall_sigma_is_stdev_of_means() {
        let means: Vec<f64> = (0..20).map(|i| 20.0 + (i % 4) as f64 * 0.1).collect();
        let script = per_repetition(&means.iter().copied().map(Some).collect::<Vec<_>>());
        let (mut est, _) = estimator(script);
        let config = MeasurementConfig::default();

        let result = ScanAggregator::new(&mut est, &config).run(20).unwrap();

        let expected = round_to(sample_std_dev(&means).unwrap(), 3);
        assert_eq!(result.valid_readings(), 20);
        assert_eq!(result.overall_sigma, expected);
        assert_eq!(result.overall_mean, round_to(mean(&means).unwrap(), 2));
    }

    #[test]
    fn failed_repetitions_are_skipped() {
        let script = per_repetition(&[Some(20.0), None, Some(22.0), Some(900.0), Some(24.0)]);
        let (mut est, _) = estimator(script);
        let config = MeasurementConfig::default();

        let result = ScanAggregator::new(&mut est, &config).run(5).unwrap();
        assert_eq!(result.repetitions, 5);
        assert_eq!(result.readings, vec![20.0, 22.0, 24.0]);
        assert_eq!(result.overall_mean, 22.0);
        assert_eq!(result.overall_sigma, 2.0);
    }

    #[test]
    fn single_valid_repetition_fails() {
        let script = per_repetition(&[Some(20.0), None, None]);
        let (mut est, _) = estimator(script);
        let config = MeasurementConfig::default();

        let err = ScanAggregator::new(&mut est, &config).run(3).unwrap_err();
        assert_eq!(
            err,
            MeasurementError::InsufficientReadings {
                required: 2,
                collected: 1
            }
        );
    }

    #[test]
    fn no_valid_repetitions_fails() {
        let (mut est, _) = estimator(vec![None]);
        let config = MeasurementConfig::default();

        let result = ScanAggregator::new(&mut est, &config).run(4);
        assert!(matches!(
            result,
            Err(MeasurementError::InsufficientReadings { collected: 0, .. })
        ));
    }

    #[test]
    fn constant_surface_yields_zero_sigma() {
        let (mut est, _) = estimator(vec![Some(30.0)]);
        let config = MeasurementConfig::default();

        let result = ScanAggregator::new(&mut est, &config).run(3).unwrap();
        assert_eq!(result.overall_sigma, 0.0);
    }

    #[test]
    fn scan_duration_matches_fixed_delays() {
        let (mut est, pacer) = estimator(vec![Some(30.0)]);
        let config = MeasurementConfig::default();

        ScanAggregator::new(&mut est, &config).run(4).unwrap();
        // r * (10 * 10ms + 50ms)
        assert_eq!(pacer.total(), Duration::from_millis(600));
    }

    #[test]
    fn points_are_numbered_from_one() {
        let result = ScanResult::from_readings(vec![20.5, 21.0], 3).unwrap();
        let points = result.points();
        assert_eq!(points[0], ScanPoint { reading: 1, distance: 20.5 });
        assert_eq!(points[1].reading, 2);
    }
}
