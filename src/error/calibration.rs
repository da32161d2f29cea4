// Calibration error types and constants

use crate::calibration::{ReferenceClass, SessionPhaseKind};
use crate::error::{ErrorCode, MeasurementError};
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Error code range: 2001-2006
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// A reference class produced an overall sigma of exactly zero
    pub const DEGENERATE_DATA: i32 = 2001;

    /// A reference class produced fewer than two valid readings
    pub const INSUFFICIENT_READINGS: i32 = 2002;

    /// Operation not allowed in the current session phase
    pub const INVALID_PHASE: i32 = 2003;

    /// Calibration not complete
    pub const NOT_COMPLETE: i32 = 2004;

    /// Threshold state RwLock was poisoned
    pub const STATE_POISONED: i32 = 2005;

    /// Sensor bus failure while collecting readings
    pub const MEASUREMENT: i32 = 2006;
}

/// Log a calibration error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationSession, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// Every variant halts the session. Ordering anomalies are not errors; they
/// travel as [`crate::calibration::CalibrationWarning`] next to the result.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// A reference class scan produced sigma 0.0
    DegenerateCalibrationData { class: ReferenceClass },

    /// A reference class scan produced fewer than two valid readings
    InsufficientReadings {
        class: ReferenceClass,
        collected: usize,
    },

    /// Operation requested in the wrong session phase
    InvalidPhase {
        expected: SessionPhaseKind,
        actual: SessionPhaseKind,
    },

    /// Calibration not complete
    NotComplete,

    /// Threshold state RwLock was poisoned
    StatePoisoned,

    /// Measurement layer failed underneath the session
    Measurement { source: MeasurementError },
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::DegenerateCalibrationData { .. } => {
                CalibrationErrorCodes::DEGENERATE_DATA
            }
            CalibrationError::InsufficientReadings { .. } => {
                CalibrationErrorCodes::INSUFFICIENT_READINGS
            }
            CalibrationError::InvalidPhase { .. } => CalibrationErrorCodes::INVALID_PHASE,
            CalibrationError::NotComplete => CalibrationErrorCodes::NOT_COMPLETE,
            CalibrationError::StatePoisoned => CalibrationErrorCodes::STATE_POISONED,
            CalibrationError::Measurement { .. } => CalibrationErrorCodes::MEASUREMENT,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::DegenerateCalibrationData { class } => {
                format!(
                    "{} test resulted in a sigma of 0.0. Ensure different references were used.",
                    class.display_name()
                )
            }
            CalibrationError::InsufficientReadings { class, collected } => {
                format!(
                    "Not enough valid readings for {}: need 2, got {}",
                    class.display_name(),
                    collected
                )
            }
            CalibrationError::InvalidPhase { expected, actual } => {
                format!("Invalid session phase: expected {:?}, was {:?}", expected, actual)
            }
            CalibrationError::NotComplete => "Calibration not complete".to_string(),
            CalibrationError::StatePoisoned => "Threshold state lock poisoned".to_string(),
            CalibrationError::Measurement { source } => {
                format!("Measurement failed: {}", source.message())
            }
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}

impl From<MeasurementError> for CalibrationError {
    fn from(source: MeasurementError) -> Self {
        CalibrationError::Measurement { source }
    }
}
