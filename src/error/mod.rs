// Error types for the surface detector
//
// This module defines custom error types for measurement and calibration
// operations, providing structured error handling with numeric codes that the
// CLI and any hosting boundary can map to user-visible conditions.

mod calibration;
mod measurement;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use measurement::{log_measurement_error, MeasurementError, MeasurementErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the library boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
