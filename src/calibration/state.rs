// ThresholdSet - versioned threshold storage for sigma classification
//
// Thresholds are either the factory defaults tuned on the reference rig or
// values derived by a calibration session. The set is loaded once at startup
// (see AppConfig) and consumed read-only by the classifiers.

use serde::{Deserialize, Serialize};

use super::derivation::DerivedThresholds;

/// Two ordered sigma cut points for shape classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeThresholds {
    /// Flat below, Slightly Curved from here
    pub t1: f64,
    /// Curved / Irregular from here
    pub t2: f64,
}

impl Default for ShapeThresholds {
    fn default() -> Self {
        Self {
            t1: 0.175,
            t2: 0.204,
        }
    }
}

/// Single sigma cut point for material classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialThreshold {
    /// Reflective at or below, Absorbing above
    pub tm: f64,
}

impl Default for MaterialThreshold {
    fn default() -> Self {
        Self { tm: 0.096 }
    }
}

/// Complete threshold configuration consumed by the classifiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    /// Incremented every time calibrated values are applied
    #[serde(default = "default_version")]
    pub version: u32,
    /// Whether any value came from a calibration session
    #[serde(default)]
    pub is_calibrated: bool,
    #[serde(default)]
    pub shape: ShapeThresholds,
    #[serde(default)]
    pub material: MaterialThreshold,
}

fn default_version() -> u32 {
    1
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self::new_default()
    }
}

impl ThresholdSet {
    /// Factory thresholds: t1 = 0.175, t2 = 0.204, tm = 0.096
    pub fn new_default() -> Self {
        Self {
            version: default_version(),
            is_calibrated: false,
            shape: ShapeThresholds::default(),
            material: MaterialThreshold::default(),
        }
    }

    /// Replace the thresholds a session derived, leaving the others intact
    pub fn apply(&mut self, derived: &DerivedThresholds) {
        match derived {
            DerivedThresholds::Shape(shape) => self.shape = *shape,
            DerivedThresholds::Material(material) => self.material = *material,
        }
        self.is_calibrated = true;
        self.version = self.version.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_default() {
        let set = ThresholdSet::new_default();
        assert_eq!(set.version, 1);
        assert!(!set.is_calibrated);
        assert_eq!(set.shape.t1, 0.175);
        assert_eq!(set.shape.t2, 0.204);
        assert_eq!(set.material.tm, 0.096);
    }

    #[test]
    fn test_apply_shape_keeps_material() {
        let mut set = ThresholdSet::new_default();
        set.apply(&DerivedThresholds::Shape(ShapeThresholds { t1: 0.15, t2: 0.25 }));

        assert_eq!(set.shape.t1, 0.15);
        assert_eq!(set.shape.t2, 0.25);
        assert_eq!(set.material.tm, 0.096);
        assert!(set.is_calibrated);
        assert_eq!(set.version, 2);
    }

    #[test]
    fn test_apply_material_bumps_version() {
        let mut set = ThresholdSet::new_default();
        set.apply(&DerivedThresholds::Material(MaterialThreshold { tm: 0.12 }));
        set.apply(&DerivedThresholds::Material(MaterialThreshold { tm: 0.11 }));
        assert_eq!(set.material.tm, 0.11);
        assert_eq!(set.version, 3);
    }

    #[test]
    fn test_serde_defaults_for_missing_fields() {
        let set: ThresholdSet = serde_json::from_str(r#"{"shape":{"t1":0.1,"t2":0.2}}"#).unwrap();
        assert_eq!(set.version, 1);
        assert!(!set.is_calibrated);
        assert_eq!(set.material.tm, 0.096);
    }
}
