// Measurement module - distance acquisition and macro sigma aggregation
//
// DistanceEstimator reduces a burst of raw draws to one StableReading.
// ScanAggregator repeats that across a scan and computes the overall sigma of
// the per-repetition means, which is the only input the classifiers see.

pub mod estimator;
pub mod scan;
pub mod stats;

pub use estimator::{DistanceEstimator, StableReading, ValidRange};
pub use scan::{ScanAggregator, ScanPoint, ScanResult, MIN_SCAN_READINGS};
