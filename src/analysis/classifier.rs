// Classifier - threshold classification of scan sigma
//
// Shape: sigma < t1 -> Flat, t1 <= sigma < t2 -> Slightly Curved,
// otherwise Curved / Irregular.
// Material: sigma <= tm -> Reflective, otherwise Absorbing.
//
// Material classification assumes the scan was taken against a flat surface.
// On a curved surface shape-induced dispersion inflates sigma and the
// material verdict is meaningless; callers own that precondition.

use std::fmt;

use super::SurfaceClassification;
use crate::calibration::state::{MaterialThreshold, ShapeThresholds, ThresholdSet};

/// Surface shape inferred from scan sigma
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ShapeLabel {
    #[serde(rename = "Flat Surface")]
    FlatSurface,
    #[serde(rename = "Slightly Curved")]
    SlightlyCurved,
    #[serde(rename = "Curved / Irregular")]
    CurvedIrregular,
}

impl ShapeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeLabel::FlatSurface => "Flat Surface",
            ShapeLabel::SlightlyCurved => "Slightly Curved",
            ShapeLabel::CurvedIrregular => "Curved / Irregular",
        }
    }
}

impl fmt::Display for ShapeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acoustic behaviour of the surface material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MaterialLabel {
    /// Hard surface returning a clean echo (low sigma)
    Reflective,
    /// Soft surface scattering the echo (high sigma)
    Absorbing,
}

impl MaterialLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialLabel::Reflective => "Reflective",
            MaterialLabel::Absorbing => "Absorbing",
        }
    }
}

impl fmt::Display for MaterialLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps sigma to a [`ShapeLabel`] with two calibrated thresholds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShapeClassifier {
    thresholds: ShapeThresholds,
}

impl ShapeClassifier {
    pub fn new(thresholds: ShapeThresholds) -> Self {
        Self { thresholds }
    }

    /// Total over all non-negative sigma; boundaries belong to the upper class
    pub fn classify(&self, sigma: f64) -> ShapeLabel {
        if sigma < self.thresholds.t1 {
            ShapeLabel::FlatSurface
        } else if sigma < self.thresholds.t2 {
            ShapeLabel::SlightlyCurved
        } else {
            ShapeLabel::CurvedIrregular
        }
    }
}

/// Maps sigma to a [`MaterialLabel`] with one calibrated threshold
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MaterialClassifier {
    threshold: MaterialThreshold,
}

impl MaterialClassifier {
    pub fn new(threshold: MaterialThreshold) -> Self {
        Self { threshold }
    }

    /// Sigma equal to the threshold still counts as reflective
    pub fn classify(&self, sigma: f64) -> MaterialLabel {
        if sigma > self.threshold.tm {
            MaterialLabel::Absorbing
        } else {
            MaterialLabel::Reflective
        }
    }
}

/// Both classifiers configured from one [`ThresholdSet`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceClassifier {
    shape: ShapeClassifier,
    material: MaterialClassifier,
}

impl SurfaceClassifier {
    pub fn new(thresholds: &ThresholdSet) -> Self {
        Self {
            shape: ShapeClassifier::new(thresholds.shape),
            material: MaterialClassifier::new(thresholds.material),
        }
    }

    pub fn classify_shape(&self, sigma: f64) -> ShapeLabel {
        self.shape.classify(sigma)
    }

    pub fn classify_material(&self, sigma: f64) -> MaterialLabel {
        self.material.classify(sigma)
    }

    pub fn classify(&self, sigma: f64) -> SurfaceClassification {
        SurfaceClassification {
            shape: self.classify_shape(sigma),
            material: self.classify_material(sigma),
        }
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
