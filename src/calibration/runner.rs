// CalibrationRunner - drives a CalibrationSession with live readings
//
// The runner owns the loop the operator sees: announce a reference, wait for
// confirmation, take `readings_per_class` stable readings through the scan
// aggregator, beep, move on. The session decides when a class is complete.

use std::time::Duration;

use super::progress::{
    CalibrationKind, CalibrationProgress, ReferenceClass, SessionPhase, SessionPhaseKind,
};
use super::session::{CalibrationOutcome, CalibrationSession};
use crate::config::{CalibrationConfig, MeasurementConfig};
use crate::error::CalibrationError;
use crate::feedback::{FeedbackDispatcher, FeedbackEvent};
use crate::measurement::{DistanceEstimator, ScanAggregator, StableReading};
use crate::sensor::SampleSource;
use crate::telemetry;

/// Operator-facing hooks of a calibration run
pub trait CalibrationOperator {
    /// Block until the reference for `class` is in place
    fn await_ready(&mut self, class: ReferenceClass);

    /// Called after every recorded reading
    fn on_reading(&mut self, _progress: &CalibrationProgress, _reading: &StableReading) {}

    /// Called once a class has been reduced to its overall sigma
    fn on_class_complete(&mut self, _class: ReferenceClass, _sigma: f64) {}
}

/// Operator that logs the instructions and proceeds immediately
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl CalibrationOperator for AutoConfirm {
    fn await_ready(&mut self, class: ReferenceClass) {
        log::info!(
            "[Calibration] {}: {}",
            class.display_name(),
            class.instructions()
        );
    }
}

/// Runs calibration sessions against an estimator
pub struct CalibrationRunner<'a> {
    measurement: &'a MeasurementConfig,
    calibration: &'a CalibrationConfig,
    feedback: Option<&'a FeedbackDispatcher>,
}

impl<'a> CalibrationRunner<'a> {
    pub fn new(measurement: &'a MeasurementConfig, calibration: &'a CalibrationConfig) -> Self {
        Self {
            measurement,
            calibration,
            feedback: None,
        }
    }

    /// Beep through `dispatcher` after each completed class
    pub fn with_feedback(mut self, dispatcher: &'a FeedbackDispatcher) -> Self {
        self.feedback = Some(dispatcher);
        self
    }

    /// Collect every reference class of `kind` and derive its thresholds
    ///
    /// # Errors
    /// * `DegenerateCalibrationData` - a class produced a sigma of exactly 0
    /// * `InsufficientReadings` - a class produced fewer than 2 valid means
    pub fn run<S: SampleSource>(
        &self,
        kind: CalibrationKind,
        estimator: &mut DistanceEstimator<S>,
        operator: &mut dyn CalibrationOperator,
    ) -> Result<CalibrationOutcome, CalibrationError> {
        let mut session = CalibrationSession::new(kind, self.calibration.readings_per_class);
        let mut aggregator = ScanAggregator::new(estimator, self.measurement);

        loop {
            match session.phase() {
                SessionPhase::AwaitingUser { class } => {
                    operator.await_ready(class);
                    session.begin_collection()?;
                }
                SessionPhase::Collecting { class, .. } => {
                    let reading = aggregator.next_reading();
                    let phase = match session.record_reading(&reading) {
                        Ok(phase) => phase,
                        Err(err) => {
                            // The class still finished collecting
                            self.completion_beep();
                            return Err(err);
                        }
                    };
                    operator.on_reading(&session.progress(), &reading);

                    if !matches!(phase, SessionPhase::Collecting { .. }) {
                        if let Some(done) = session.class_sigmas().last() {
                            operator.on_class_complete(class, done.sigma);
                        }
                        self.completion_beep();
                    }
                }
                SessionPhase::Computed => break,
                SessionPhase::Halted { .. } => {
                    return Err(CalibrationError::InvalidPhase {
                        expected: SessionPhaseKind::Collecting,
                        actual: SessionPhaseKind::Halted,
                    })
                }
            }
        }

        let outcome = session.into_outcome()?;
        for warning in &outcome.warnings {
            telemetry::hub().record_calibration_warning(*warning);
        }
        Ok(outcome)
    }

    fn completion_beep(&self) {
        if let Some(feedback) = self.feedback {
            feedback.dispatch(FeedbackEvent::Beep {
                duration: Duration::from_millis(self.calibration.completion_beep_ms),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{DerivedThresholds, MaterialThreshold};
    use crate::feedback::RecordingSink;
    use crate::sensor::{RecordingPacer, ScriptedSampleSource};
    use std::sync::Arc;

    #[derive(Default)]
    struct ScriptedOperator {
        prompted: Vec<ReferenceClass>,
        readings: usize,
        completed: Vec<(ReferenceClass, f64)>,
    }

    impl CalibrationOperator for ScriptedOperator {
        fn await_ready(&mut self, class: ReferenceClass) {
            self.prompted.push(class);
        }

        fn on_reading(&mut self, _progress: &CalibrationProgress, _reading: &StableReading) {
            self.readings += 1;
        }

        fn on_class_complete(&mut self, class: ReferenceClass, sigma: f64) {
            self.completed.push((class, sigma));
        }
    }

    fn configs() -> (MeasurementConfig, CalibrationConfig) {
        let measurement = MeasurementConfig {
            samples_per_reading: 2,
            ..MeasurementConfig::default()
        };
        let calibration = CalibrationConfig {
            readings_per_class: 3,
            ..CalibrationConfig::default()
        };
        (measurement, calibration)
    }

    /// Reflective means 20.0/20.1/20.2 (sigma 0.1), absorbent 20.0/20.3/20.6 (sigma 0.3)
    fn material_script() -> ScriptedSampleSource {
        ScriptedSampleSource::from_values(&[
            20.0, 20.0, 20.1, 20.1, 20.2, 20.2, 20.0, 20.0, 20.3, 20.3, 20.6, 20.6,
        ])
    }

    #[test]
    fn test_material_run_derives_midpoint() {
        let (measurement, calibration) = configs();
        let pacer = RecordingPacer::new();
        let mut estimator =
            DistanceEstimator::new(material_script(), Arc::new(pacer.clone()), &measurement);
        let mut operator = ScriptedOperator::default();

        let outcome = CalibrationRunner::new(&measurement, &calibration)
            .run(CalibrationKind::Material, &mut estimator, &mut operator)
            .unwrap();

        assert_eq!(
            outcome.thresholds,
            DerivedThresholds::Material(MaterialThreshold { tm: 0.2 })
        );
        assert_eq!(
            operator.prompted,
            vec![ReferenceClass::Reflective, ReferenceClass::Absorbent]
        );
        assert_eq!(operator.readings, 6);
        assert_eq!(operator.completed.len(), 2);
        assert!((operator.completed[0].1 - 0.1).abs() < 1e-9);
        assert!(outcome.warnings.is_empty());

        // 12 settle pauses plus 6 repetition pauses
        assert_eq!(pacer.pause_count(), 18);
    }

    #[test]
    fn test_completion_beep_per_class() {
        let (measurement, calibration) = configs();
        let sink = RecordingSink::new();
        let dispatcher = FeedbackDispatcher::spawn(sink.clone(), 8);
        let mut estimator = DistanceEstimator::new(
            material_script(),
            Arc::new(RecordingPacer::new()),
            &measurement,
        );

        CalibrationRunner::new(&measurement, &calibration)
            .with_feedback(&dispatcher)
            .run(CalibrationKind::Material, &mut estimator, &mut AutoConfirm)
            .unwrap();
        dispatcher.shutdown();

        let beep = FeedbackEvent::Beep {
            duration: Duration::from_millis(200),
        };
        assert_eq!(sink.events(), vec![beep.clone(), beep]);
    }

    #[test]
    fn test_constant_reference_halts_run() {
        let (measurement, calibration) = configs();
        let mut estimator = DistanceEstimator::new(
            ScriptedSampleSource::from_values(&[25.0]),
            Arc::new(RecordingPacer::new()),
            &measurement,
        );
        let mut operator = ScriptedOperator::default();

        let err = CalibrationRunner::new(&measurement, &calibration)
            .run(CalibrationKind::Shape, &mut estimator, &mut operator)
            .unwrap_err();

        assert_eq!(
            err,
            CalibrationError::DegenerateCalibrationData {
                class: ReferenceClass::Flat
            }
        );
        assert!(operator.completed.is_empty());
    }

    #[test]
    fn test_silent_sensor_reports_insufficient_readings() {
        let (measurement, calibration) = configs();
        let mut estimator = DistanceEstimator::new(
            ScriptedSampleSource::new(vec![None]),
            Arc::new(RecordingPacer::new()),
            &measurement,
        );

        let err = CalibrationRunner::new(&measurement, &calibration)
            .run(CalibrationKind::Material, &mut estimator, &mut AutoConfirm)
            .unwrap_err();

        assert_eq!(
            err,
            CalibrationError::InsufficientReadings {
                class: ReferenceClass::Reflective,
                collected: 0
            }
        );
    }

    #[test]
    fn test_failed_class_still_beeps() {
        let (measurement, calibration) = configs();
        let sink = RecordingSink::new();
        let dispatcher = FeedbackDispatcher::spawn(sink.clone(), 8);
        let mut estimator = DistanceEstimator::new(
            ScriptedSampleSource::new(vec![None]),
            Arc::new(RecordingPacer::new()),
            &measurement,
        );

        CalibrationRunner::new(&measurement, &calibration)
            .with_feedback(&dispatcher)
            .run(CalibrationKind::Material, &mut estimator, &mut AutoConfirm)
            .unwrap_err();
        dispatcher.shutdown();

        assert_eq!(
            sink.events(),
            vec![FeedbackEvent::Beep {
                duration: Duration::from_millis(200),
            }]
        );
    }
}
