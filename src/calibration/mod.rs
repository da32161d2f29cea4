// Calibration module - reference collection workflow and threshold storage
//
// This module provides:
// 1. ThresholdSet: versioned shape/material thresholds used by the classifiers
// 2. CalibrationSession: the per-class collection state machine
// 3. CalibrationRunner: drives a session against a live DistanceEstimator
//
// The calibration workflow:
// 1. Pick a kind (shape or material)
// 2. For each reference class, place the object and collect N stable readings
// 3. Reduce each class to its overall sigma and derive midpoint thresholds

pub mod derivation;
pub mod progress;
pub mod runner;
pub mod session;
pub mod state;

pub use derivation::{CalibrationWarning, ClassSigma, DerivedThresholds};
pub use progress::{
    CalibrationKind, CalibrationProgress, ReferenceClass, SessionPhase, SessionPhaseKind,
};
pub use runner::{AutoConfirm, CalibrationOperator, CalibrationRunner};
pub use session::{run_calibration_session, CalibrationOutcome, CalibrationSession};
pub use state::{MaterialThreshold, ShapeThresholds, ThresholdSet};
