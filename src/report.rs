//! Response payloads combining classifier output with environment readings.
//!
//! Field names match the dashboard JSON: `scan_data`, `statistics`,
//! `shape_analysis`, `material_analysis`, `environment`.

use serde::{Deserialize, Serialize};

use crate::analysis::{MaterialLabel, ShapeLabel, SurfaceClassification};
use crate::feedback::DisplaySummary;
use crate::measurement::stats::round_to;
use crate::measurement::{ScanPoint, ScanResult, StableReading};
use crate::sensor::Temperatures;

/// Speed of sound in dry air at 0 °C, m/s
const SPEED_OF_SOUND_0C: f64 = 331.3;
/// Increase in speed of sound per °C, m/s
const SPEED_OF_SOUND_PER_C: f64 = 0.606;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub average: f64,
    pub sigma: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentReport {
    pub color: String,
    /// Object minus ambient temperature, °C, 1 decimal
    pub temp_difference: f64,
    /// m/s at the ambient temperature, 1 decimal
    pub ultrasonic_speed: f64,
}

impl EnvironmentReport {
    pub fn from_readings(temperatures: Temperatures, color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            temp_difference: round_to(temperatures.object - temperatures.ambient, 1),
            ultrasonic_speed: round_to(
                SPEED_OF_SOUND_0C + SPEED_OF_SOUND_PER_C * temperatures.ambient,
                1,
            ),
        }
    }
}

/// Full result of a scan request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_data: Vec<ScanPoint>,
    pub statistics: Statistics,
    pub shape_analysis: ShapeLabel,
    pub material_analysis: MaterialLabel,
    pub environment: EnvironmentReport,
}

impl ScanReport {
    pub fn assemble(
        scan: &ScanResult,
        classification: SurfaceClassification,
        environment: EnvironmentReport,
    ) -> Self {
        Self {
            scan_data: scan.points(),
            statistics: Statistics {
                average: scan.overall_mean,
                sigma: scan.overall_sigma,
            },
            shape_analysis: classification.shape,
            material_analysis: classification.material,
            environment,
        }
    }

    /// Lines pushed to the display after the scan
    pub fn display_summary(&self) -> DisplaySummary {
        DisplaySummary::new(
            format_distance(self.statistics.average),
            self.shape_analysis.as_str(),
            self.material_analysis.as_str(),
        )
    }
}

/// Result of a single "check distance" request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SingleCheckReport {
    pub distance: f64,
    pub sigma: f64,
}

impl SingleCheckReport {
    pub fn from_reading(reading: &StableReading) -> Self {
        Self {
            distance: reading.mean,
            sigma: reading.local_sigma,
        }
    }

    pub fn display_summary(&self) -> DisplaySummary {
        DisplaySummary::new(format_distance(self.distance), "N/A", "N/A")
    }
}

/// `"<distance> cm"`, always with at least one decimal
pub fn format_distance(distance: f64) -> String {
    if distance.fract() == 0.0 {
        format!("{:.1} cm", distance)
    } else {
        format!("{} cm", distance)
    }
}
