// Measurement error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Measurement error code constants
///
/// Single source of truth for the numeric codes reported by the CLI and
/// recorded in telemetry.
///
/// Error code range: 1001-1003
pub struct MeasurementErrorCodes {}

impl MeasurementErrorCodes {
    /// Fewer than two valid stable readings in a scan
    pub const INSUFFICIENT_READINGS: i32 = 1001;

    /// Sensor bus lock was poisoned by a panicking holder
    pub const BUS_POISONED: i32 = 1002;

    /// Live threshold lock was poisoned mid-scan
    pub const STATE_POISONED: i32 = 1003;
}

/// Log a measurement error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_measurement_error(err: &MeasurementError, context: &str) {
    error!(
        "Measurement error in {}: code={}, component=ScanAggregator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Measurement-related errors
///
/// A scan that cannot produce a trustworthy macro sigma fails with one of
/// these instead of returning a degenerate zero.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementError {
    /// Too few repetitions produced a valid stable reading
    InsufficientReadings { required: usize, collected: usize },

    /// Lock guarding a sensor bus (ultrasonic or environment) was poisoned
    BusPoisoned { component: String },

    /// Lock guarding shared detector state was poisoned
    StatePoisoned { component: String },
}

impl ErrorCode for MeasurementError {
    fn code(&self) -> i32 {
        match self {
            MeasurementError::InsufficientReadings { .. } => {
                MeasurementErrorCodes::INSUFFICIENT_READINGS
            }
            MeasurementError::BusPoisoned { .. } => MeasurementErrorCodes::BUS_POISONED,
            MeasurementError::StatePoisoned { .. } => MeasurementErrorCodes::STATE_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            MeasurementError::InsufficientReadings {
                required,
                collected,
            } => {
                format!(
                    "Failed to get enough valid readings: need {}, got {}. Try again.",
                    required, collected
                )
            }
            MeasurementError::BusPoisoned { component } => {
                format!("Lock poisoned for sensor bus: {}", component)
            }
            MeasurementError::StatePoisoned { component } => {
                format!("Lock poisoned for detector state: {}", component)
            }
        }
    }
}

impl fmt::Display for MeasurementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MeasurementError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for MeasurementError {}
