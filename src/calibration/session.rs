// CalibrationSession - guided reference collection state machine
//
// One pass per reference class of the chosen kind:
//   AwaitingUser{class} -> Collecting{class, k/N} -> next class ... -> Computed
//
// Each class is reduced to a single overall sigma across all of its stable
// readings (the macro sigma method), then the thresholds are derived from the
// per-class sigmas. Zero sigma or too few valid readings halt the session.

use serde::{Deserialize, Serialize};

use super::derivation::{derive, CalibrationWarning, ClassSigma, DerivedThresholds};
use super::progress::{
    CalibrationKind, CalibrationProgress, ReferenceClass, SessionPhase, SessionPhaseKind,
};
use crate::error::{CalibrationError, MeasurementError};
use crate::measurement::{ScanResult, StableReading};

/// Result of a computed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub kind: CalibrationKind,
    pub thresholds: DerivedThresholds,
    pub class_sigmas: Vec<ClassSigma>,
    pub warnings: Vec<CalibrationWarning>,
}

/// Calibration state machine for one kind of threshold set
pub struct CalibrationSession {
    kind: CalibrationKind,
    readings_per_class: usize,
    class_index: usize,
    phase: SessionPhase,
    distances: Vec<f64>,
    class_sigmas: Vec<ClassSigma>,
    outcome: Option<CalibrationOutcome>,
}

impl CalibrationSession {
    /// Create a session awaiting the first reference of `kind`
    ///
    /// # Arguments
    /// * `readings_per_class` - Stable readings taken per reference (default 50)
    pub fn new(kind: CalibrationKind, readings_per_class: usize) -> Self {
        Self {
            kind,
            readings_per_class: readings_per_class.max(1),
            class_index: 0,
            phase: SessionPhase::AwaitingUser {
                class: kind.classes()[0],
            },
            distances: Vec::new(),
            class_sigmas: Vec::new(),
            outcome: None,
        }
    }

    pub fn kind(&self) -> CalibrationKind {
        self.kind
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn readings_per_class(&self) -> usize {
        self.readings_per_class
    }

    /// Sigmas of the classes completed so far, in collection order
    pub fn class_sigmas(&self) -> &[ClassSigma] {
        &self.class_sigmas
    }

    pub fn progress(&self) -> CalibrationProgress {
        CalibrationProgress {
            kind: self.kind,
            phase: self.phase,
            class_index: self.class_index,
            class_count: self.kind.classes().len(),
        }
    }

    /// Operator confirmed the reference is in place
    pub fn begin_collection(&mut self) -> Result<ReferenceClass, CalibrationError> {
        match self.phase {
            SessionPhase::AwaitingUser { class } => {
                self.distances.clear();
                self.phase = SessionPhase::Collecting {
                    class,
                    collected: 0,
                    needed: self.readings_per_class,
                };
                log::info!(
                    "[Calibration] Collecting {} readings for {}",
                    self.readings_per_class,
                    class.display_name()
                );
                Ok(class)
            }
            other => Err(self.invalid_phase(SessionPhaseKind::AwaitingUser, other)),
        }
    }

    /// Record one stable reading for the current class
    ///
    /// Readings without a distance count towards `needed` but contribute no
    /// mean, exactly like a failed scan repetition. The class completes when
    /// `needed` readings were recorded.
    pub fn record_reading(
        &mut self,
        reading: &StableReading,
    ) -> Result<SessionPhase, CalibrationError> {
        let SessionPhase::Collecting {
            class,
            collected,
            needed,
        } = self.phase
        else {
            return Err(self.invalid_phase(SessionPhaseKind::Collecting, self.phase));
        };

        if reading.has_distance() {
            self.distances.push(reading.mean);
        }
        let collected = collected + 1;
        if collected < needed {
            self.phase = SessionPhase::Collecting {
                class,
                collected,
                needed,
            };
            return Ok(self.phase);
        }

        let distances = std::mem::take(&mut self.distances);
        match ScanResult::from_readings(distances, needed) {
            Ok(scan) => self.complete_class(class, scan.overall_sigma),
            Err(MeasurementError::InsufficientReadings { collected, .. }) => {
                self.phase = SessionPhase::Halted { class };
                Err(CalibrationError::InsufficientReadings { class, collected })
            }
            Err(other) => {
                self.phase = SessionPhase::Halted { class };
                Err(other.into())
            }
        }
    }

    /// Record a class sigma measured elsewhere (one full scan per class)
    pub fn record_class_sigma(&mut self, sigma: f64) -> Result<SessionPhase, CalibrationError> {
        match self.phase {
            SessionPhase::Collecting { class, .. } => self.complete_class(class, sigma),
            other => Err(self.invalid_phase(SessionPhaseKind::Collecting, other)),
        }
    }

    /// Mark the current class as failed by the measurement layer
    pub fn halt(&mut self) {
        if let SessionPhase::AwaitingUser { class } | SessionPhase::Collecting { class, .. } =
            self.phase
        {
            self.phase = SessionPhase::Halted { class };
        }
    }

    fn complete_class(
        &mut self,
        class: ReferenceClass,
        sigma: f64,
    ) -> Result<SessionPhase, CalibrationError> {
        if sigma == 0.0 {
            log::warn!(
                "[Calibration] {} produced an overall sigma of 0.0; halting session",
                class.display_name()
            );
            self.phase = SessionPhase::Halted { class };
            return Err(CalibrationError::DegenerateCalibrationData { class });
        }

        log::info!(
            "[Calibration] {} overall sigma = {:.3}",
            class.display_name(),
            sigma
        );
        self.class_sigmas.push(ClassSigma { class, sigma });
        self.class_index += 1;

        match self.kind.classes().get(self.class_index) {
            Some(&next) => {
                self.phase = SessionPhase::AwaitingUser { class: next };
            }
            None => self.compute()?,
        }
        Ok(self.phase)
    }

    fn compute(&mut self) -> Result<(), CalibrationError> {
        let derivation = derive(self.kind, &self.class_sigmas)?;
        log::info!(
            "[Calibration] Derived {:?} with {} warning(s)",
            derivation.thresholds,
            derivation.warnings.len()
        );
        self.outcome = Some(CalibrationOutcome {
            kind: self.kind,
            thresholds: derivation.thresholds,
            class_sigmas: self.class_sigmas.clone(),
            warnings: derivation.warnings,
        });
        self.phase = SessionPhase::Computed;
        Ok(())
    }

    /// Outcome of a computed session
    pub fn outcome(&self) -> Result<&CalibrationOutcome, CalibrationError> {
        self.outcome.as_ref().ok_or(CalibrationError::NotComplete)
    }

    pub fn into_outcome(self) -> Result<CalibrationOutcome, CalibrationError> {
        self.outcome.ok_or(CalibrationError::NotComplete)
    }

    /// Discard all collected data and await the first reference again
    pub fn reset(&mut self) {
        *self = Self::new(self.kind, self.readings_per_class);
    }

    fn invalid_phase(&self, expected: SessionPhaseKind, actual: SessionPhase) -> CalibrationError {
        CalibrationError::InvalidPhase {
            expected,
            actual: actual.kind(),
        }
    }
}

/// Run a complete session from a per-class sigma function
///
/// `per_class_scan` is called once per reference class, in collection order,
/// and returns that class's overall sigma (typically one full scan).
///
/// # Returns
/// * `Ok(CalibrationOutcome)` - thresholds plus any ordering warnings
/// * `Err(CalibrationError)` - degenerate or under-sampled reference data
pub fn run_calibration_session<F>(
    kind: CalibrationKind,
    mut per_class_scan: F,
) -> Result<CalibrationOutcome, CalibrationError>
where
    F: FnMut(ReferenceClass) -> Result<f64, MeasurementError>,
{
    let mut session = CalibrationSession::new(kind, 1);

    while let SessionPhase::AwaitingUser { class } = session.phase() {
        session.begin_collection()?;
        let sigma = per_class_scan(class).map_err(|err| {
            session.halt();
            match err {
                MeasurementError::InsufficientReadings { collected, .. } => {
                    CalibrationError::InsufficientReadings { class, collected }
                }
                other => other.into(),
            }
        })?;
        session.record_class_sigma(sigma)?;
    }

    session.into_outcome()
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
