//! Metric event types published by the measurement boundary and exposed to
//! CLI surfaces and async subscribers.

use serde::{Deserialize, Serialize};

use crate::analysis::{MaterialLabel, ShapeLabel};
use crate::calibration::{CalibrationKind, CalibrationWarning};

/// Diagnostic error codes surfaced via telemetry metrics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticError {
    BusPoisoned,
    CalibrationFailed,
}

/// Events covering scans, spot checks, calibration and feedback health.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    ScanCompleted {
        repetitions: usize,
        valid_readings: usize,
        average: f64,
        sigma: f64,
        shape: ShapeLabel,
        material: MaterialLabel,
        duration_ms: u64,
    },
    ScanFailed {
        repetitions: usize,
        collected: usize,
    },
    SingleCheck {
        distance: f64,
        sigma: f64,
        valid_samples: usize,
    },
    CalibrationComputed {
        kind: CalibrationKind,
        version: u32,
    },
    CalibrationWarning {
        warning: CalibrationWarning,
    },
    FeedbackDropped {
        reason: String,
    },
    Error {
        code: DiagnosticError,
        context: String,
    },
}
