// DetectorContext: boundary object owning the sensor bus and shared state
//
// Every request-handling surface (CLI today) goes through this context. It
// serializes access to the single ultrasonic bus, holds the live threshold
// set, and fans results out to the feedback queue and telemetry.

use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

use crate::analysis::SurfaceClassifier;
use crate::calibration::{
    CalibrationKind, CalibrationOperator, CalibrationOutcome, CalibrationRunner, ThresholdSet,
};
use crate::config::AppConfig;
use crate::error::{
    log_calibration_error, log_measurement_error, CalibrationError, MeasurementError,
};
use crate::feedback::{FeedbackDispatcher, FeedbackEvent};
use crate::measurement::{DistanceEstimator, ScanAggregator};
use crate::report::{EnvironmentReport, ScanReport, SingleCheckReport};
use crate::sensor::{EnvironmentSource, Pacer, SampleSource};
use crate::telemetry::{self, DiagnosticError};

/// Estimator over a type-erased sample source
pub type BusEstimator = DistanceEstimator<Box<dyn SampleSource>>;

/// DetectorContext: shared state behind every measurement request
///
/// Concurrent callers are serialized on the bus mutex for the whole scan, so
/// draws from two requests never interleave. Side effects are queued after
/// the measurement completes and never awaited.
pub struct DetectorContext {
    config: AppConfig,
    bus: Mutex<BusEstimator>,
    environment: Mutex<Box<dyn EnvironmentSource>>,
    thresholds: RwLock<ThresholdSet>,
    feedback: Option<FeedbackDispatcher>,
}

impl DetectorContext {
    /// Create a context without a feedback worker
    ///
    /// The live threshold set starts from `config.thresholds`.
    pub fn new(
        config: AppConfig,
        source: Box<dyn SampleSource>,
        environment: Box<dyn EnvironmentSource>,
        pacer: Arc<dyn Pacer>,
    ) -> Self {
        let estimator = DistanceEstimator::new(source, pacer, &config.measurement);
        let thresholds = config.thresholds;
        Self {
            config,
            bus: Mutex::new(estimator),
            environment: Mutex::new(environment),
            thresholds: RwLock::new(thresholds),
            feedback: None,
        }
    }

    /// Attach a feedback dispatcher for display and buzzer events
    pub fn with_feedback(mut self, dispatcher: FeedbackDispatcher) -> Self {
        self.feedback = Some(dispatcher);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    // ========================================================================
    // LOCK HELPER METHODS
    // ========================================================================

    fn lock_bus(&self) -> Result<MutexGuard<'_, BusEstimator>, MeasurementError> {
        self.bus.lock().map_err(|_| {
            telemetry::hub().record_error(DiagnosticError::BusPoisoned, "sensor_bus");
            MeasurementError::BusPoisoned {
                component: "sensor_bus".to_string(),
            }
        })
    }

    fn lock_environment(
        &self,
    ) -> Result<MutexGuard<'_, Box<dyn EnvironmentSource>>, MeasurementError> {
        self.environment
            .lock()
            .map_err(|_| MeasurementError::BusPoisoned {
                component: "environment".to_string(),
            })
    }

    /// Current live thresholds
    pub fn thresholds(&self) -> Result<ThresholdSet, CalibrationError> {
        self.thresholds
            .read()
            .map(|set| *set)
            .map_err(|_| CalibrationError::StatePoisoned)
    }

    /// Replace the live thresholds wholesale
    pub fn apply_thresholds(&self, set: ThresholdSet) -> Result<(), CalibrationError> {
        let mut guard = self
            .thresholds
            .write()
            .map_err(|_| CalibrationError::StatePoisoned)?;
        *guard = set;
        log::info!(
            "[Calibration] Applied threshold set v{} (t1={}, t2={}, tm={})",
            set.version,
            set.shape.t1,
            set.shape.t2,
            set.material.tm
        );
        Ok(())
    }

    // ========================================================================
    // MEASUREMENT REQUESTS
    // ========================================================================

    /// Run a macro-sigma scan and classify the surface
    ///
    /// # Arguments
    /// * `repetitions` - Stable readings to take, clamped to `[1, max_repetitions]`
    ///
    /// # Errors
    /// * `InsufficientReadings` - fewer than 2 repetitions produced a distance
    /// * `BusPoisoned` - a previous request panicked while holding the bus
    /// * `StatePoisoned` - a writer panicked while replacing the thresholds
    pub fn scan(&self, repetitions: usize) -> Result<ScanReport, MeasurementError> {
        let repetitions = self.config.measurement.clamp_repetitions(repetitions);
        let started = Instant::now();

        let result = {
            let mut estimator = self.lock_bus()?;
            let mut aggregator = ScanAggregator::new(&mut *estimator, &self.config.measurement);
            aggregator.run(repetitions)
        };
        let scan = match result {
            Ok(scan) => scan,
            Err(err) => {
                log_measurement_error(&err, "scan");
                if let MeasurementError::InsufficientReadings { collected, .. } = err {
                    telemetry::hub().record_scan_failure(repetitions, collected);
                }
                return Err(err);
            }
        };

        let thresholds = self
            .thresholds
            .read()
            .map(|set| *set)
            .map_err(|_| MeasurementError::StatePoisoned {
                component: "thresholds".to_string(),
            })?;
        let classification = SurfaceClassifier::new(&thresholds).classify(scan.overall_sigma);

        let environment = {
            let mut source = self.lock_environment()?;
            let temperatures = source.read_temperatures();
            EnvironmentReport::from_readings(temperatures, source.read_color())
        };

        let report = ScanReport::assemble(&scan, classification, environment);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        telemetry::hub().record_scan(&scan, &classification, elapsed_ms);
        log::info!(
            "[Scan] {} reps, avg {} cm, sigma {} -> {} / {}",
            repetitions,
            scan.overall_mean,
            scan.overall_sigma,
            classification.shape,
            classification.material
        );

        self.dispatch(FeedbackEvent::Display(report.display_summary()));
        Ok(report)
    }

    /// Take one stable reading ("check distance")
    ///
    /// A burst with no valid sample reports distance 0, the no-reading marker.
    pub fn single_check(&self, sample_count: usize) -> Result<SingleCheckReport, MeasurementError> {
        let sample_count = self.config.measurement.clamp_samples(sample_count);
        let reading = self.lock_bus()?.measure(sample_count);
        if !reading.has_distance() {
            log::debug!("[Scan] Single check produced no valid samples");
        }
        telemetry::hub().record_single_check(&reading);

        let report = SingleCheckReport::from_reading(&reading);
        self.dispatch(FeedbackEvent::Display(report.display_summary()));
        Ok(report)
    }

    /// Sound the buzzer without waiting for it
    ///
    /// # Returns
    /// `true` if the beep was queued
    pub fn buzz(&self) -> bool {
        self.dispatch(FeedbackEvent::Beep {
            duration: Duration::from_millis(self.config.feedback.beep_ms),
        })
    }

    // ========================================================================
    // CALIBRATION
    // ========================================================================

    /// Run a guided calibration session on the bus
    ///
    /// Derived thresholds replace the live ones (bumping the version) only
    /// when the session computes successfully.
    pub fn calibrate(
        &self,
        kind: CalibrationKind,
        operator: &mut dyn CalibrationOperator,
    ) -> Result<CalibrationOutcome, CalibrationError> {
        let outcome = {
            let mut estimator = self.lock_bus()?;
            let mut runner =
                CalibrationRunner::new(&self.config.measurement, &self.config.calibration);
            if let Some(feedback) = self.feedback.as_ref() {
                runner = runner.with_feedback(feedback);
            }
            runner.run(kind, &mut *estimator, operator)
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                log_calibration_error(&err, "calibrate");
                telemetry::hub().record_error(DiagnosticError::CalibrationFailed, err.to_string());
                return Err(err);
            }
        };

        let version = {
            let mut guard = self
                .thresholds
                .write()
                .map_err(|_| CalibrationError::StatePoisoned)?;
            guard.apply(&outcome.thresholds);
            guard.version
        };
        telemetry::hub().record_calibration(kind, version);
        log::info!("[Calibration] {:?} thresholds now at v{}", kind, version);

        Ok(outcome)
    }

    fn dispatch(&self, event: FeedbackEvent) -> bool {
        match self.feedback.as_ref() {
            Some(feedback) => feedback.dispatch(event),
            None => false,
        }
    }

    /// Stop the feedback worker after draining queued events
    pub fn shutdown(self) {
        if let Some(feedback) = self.feedback {
            feedback.shutdown();
        }
    }
}
