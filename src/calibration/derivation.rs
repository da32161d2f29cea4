// Threshold derivation from per-class overall sigmas
//
// Shape:    t1 = (flat + slight) / 2, t2 = (slight + irregular) / 2
// Material: tm = (reflective + absorbent) / 2
// All rounded to 3 decimals.
//
// A class sigma of exactly 0.0 halts derivation. Classes out of the expected
// order only produce warnings; thresholds are still computed from the same
// midpoints, never reordered.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::progress::{CalibrationKind, ReferenceClass};
use super::state::{MaterialThreshold, ShapeThresholds};
use crate::error::CalibrationError;
use crate::measurement::stats::round_to;

/// Overall sigma observed for one reference class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassSigma {
    pub class: ReferenceClass,
    pub sigma: f64,
}

/// Non-fatal finding reported alongside derived thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CalibrationWarning {
    /// `lower` was expected to produce a smaller sigma than `upper`
    OrderingAnomaly {
        lower: ReferenceClass,
        upper: ReferenceClass,
        lower_sigma: f64,
        upper_sigma: f64,
    },
}

impl fmt::Display for CalibrationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationWarning::OrderingAnomaly {
                lower,
                upper,
                lower_sigma,
                upper_sigma,
            } => write!(
                f,
                "sigma for {} ({:.3}) is not below {} ({:.3}); thresholds computed anyway",
                lower.display_name(),
                lower_sigma,
                upper.display_name(),
                upper_sigma
            ),
        }
    }
}

/// Thresholds produced by one session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivedThresholds {
    Shape(ShapeThresholds),
    Material(MaterialThreshold),
}

/// Derived value plus any warnings raised while deriving it
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation<T> {
    pub thresholds: T,
    pub warnings: Vec<CalibrationWarning>,
}

fn guard_zero(samples: &[ClassSigma]) -> Result<(), CalibrationError> {
    match samples.iter().find(|s| s.sigma == 0.0) {
        Some(degenerate) => {
            log::warn!(
                "[Calibration] {} produced a sigma of 0.0; refusing to derive thresholds",
                degenerate.class.display_name()
            );
            Err(CalibrationError::DegenerateCalibrationData {
                class: degenerate.class,
            })
        }
        None => Ok(()),
    }
}

fn check_order(lower: ClassSigma, upper: ClassSigma, warnings: &mut Vec<CalibrationWarning>) {
    if lower.sigma >= upper.sigma {
        let warning = CalibrationWarning::OrderingAnomaly {
            lower: lower.class,
            upper: upper.class,
            lower_sigma: lower.sigma,
            upper_sigma: upper.sigma,
        };
        log::warn!("[Calibration] {}", warning);
        warnings.push(warning);
    }
}

fn midpoint(a: f64, b: f64) -> f64 {
    round_to((a + b) / 2.0, 3)
}

/// Two-threshold derivation from flat, slightly curved and irregular sigmas
pub fn derive_shape_thresholds(
    flat: f64,
    slight: f64,
    irregular: f64,
) -> Result<Derivation<ShapeThresholds>, CalibrationError> {
    let flat = ClassSigma {
        class: ReferenceClass::Flat,
        sigma: flat,
    };
    let slight = ClassSigma {
        class: ReferenceClass::SlightlyCurved,
        sigma: slight,
    };
    let irregular = ClassSigma {
        class: ReferenceClass::CurvedIrregular,
        sigma: irregular,
    };
    guard_zero(&[flat, slight, irregular])?;

    let mut warnings = Vec::new();
    check_order(flat, slight, &mut warnings);
    check_order(slight, irregular, &mut warnings);

    Ok(Derivation {
        thresholds: ShapeThresholds {
            t1: midpoint(flat.sigma, slight.sigma),
            t2: midpoint(slight.sigma, irregular.sigma),
        },
        warnings,
    })
}

/// Single-threshold derivation from reflective and absorbent sigmas
pub fn derive_material_threshold(
    reflective: f64,
    absorbent: f64,
) -> Result<Derivation<MaterialThreshold>, CalibrationError> {
    let reflective = ClassSigma {
        class: ReferenceClass::Reflective,
        sigma: reflective,
    };
    let absorbent = ClassSigma {
        class: ReferenceClass::Absorbent,
        sigma: absorbent,
    };
    guard_zero(&[reflective, absorbent])?;

    let mut warnings = Vec::new();
    check_order(reflective, absorbent, &mut warnings);

    Ok(Derivation {
        thresholds: MaterialThreshold {
            tm: midpoint(reflective.sigma, absorbent.sigma),
        },
        warnings,
    })
}

/// Derive the thresholds of `kind` from labeled class sigmas
///
/// # Errors
/// * `NotComplete` - a class of `kind` has no sigma
/// * `DegenerateCalibrationData` - a class sigma is exactly 0.0
pub fn derive(
    kind: CalibrationKind,
    sigmas: &[ClassSigma],
) -> Result<Derivation<DerivedThresholds>, CalibrationError> {
    let lookup = |class: ReferenceClass| {
        sigmas
            .iter()
            .find(|s| s.class == class)
            .map(|s| s.sigma)
            .ok_or(CalibrationError::NotComplete)
    };

    match kind {
        CalibrationKind::Shape => {
            let derivation = derive_shape_thresholds(
                lookup(ReferenceClass::Flat)?,
                lookup(ReferenceClass::SlightlyCurved)?,
                lookup(ReferenceClass::CurvedIrregular)?,
            )?;
            Ok(Derivation {
                thresholds: DerivedThresholds::Shape(derivation.thresholds),
                warnings: derivation.warnings,
            })
        }
        CalibrationKind::Material => {
            let derivation = derive_material_threshold(
                lookup(ReferenceClass::Reflective)?,
                lookup(ReferenceClass::Absorbent)?,
            )?;
            Ok(Derivation {
                thresholds: DerivedThresholds::Material(derivation.thresholds),
                warnings: derivation.warnings,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_midpoints() {
        let derivation = derive_shape_thresholds(0.10, 0.20, 0.30).unwrap();
        assert_eq!(derivation.thresholds.t1, 0.15);
        assert_eq!(derivation.thresholds.t2, 0.25);
        assert!(derivation.warnings.is_empty());
    }

    #[test]
    fn test_shape_rounds_to_three_decimals() {
        let derivation = derive_shape_thresholds(0.1234, 0.2001, 0.3111).unwrap();
        assert_eq!(derivation.thresholds.t1, 0.162);
        assert_eq!(derivation.thresholds.t2, 0.256);
    }

    #[test]
    fn test_shape_zero_sigma_halts() {
        for (flat, slight, irregular, class) in [
            (0.0, 0.2, 0.3, ReferenceClass::Flat),
            (0.1, 0.0, 0.3, ReferenceClass::SlightlyCurved),
            (0.1, 0.2, 0.0, ReferenceClass::CurvedIrregular),
        ] {
            let err = derive_shape_thresholds(flat, slight, irregular).unwrap_err();
            assert_eq!(err, CalibrationError::DegenerateCalibrationData { class });
        }
    }

    #[test]
    fn test_shape_ordering_anomaly_warns_but_computes() {
        let derivation = derive_shape_thresholds(0.20, 0.20, 0.30).unwrap();
        assert_eq!(derivation.thresholds.t1, 0.2);
        assert_eq!(derivation.thresholds.t2, 0.25);
        assert_eq!(
            derivation.warnings,
            vec![CalibrationWarning::OrderingAnomaly {
                lower: ReferenceClass::Flat,
                upper: ReferenceClass::SlightlyCurved,
                lower_sigma: 0.20,
                upper_sigma: 0.20,
            }]
        );
    }

    #[test]
    fn test_shape_fully_reversed_reports_both_pairs() {
        let derivation = derive_shape_thresholds(0.30, 0.20, 0.10).unwrap();
        assert_eq!(derivation.warnings.len(), 2);
        // Same formula, no silent reordering
        assert_eq!(derivation.thresholds.t1, 0.25);
        assert_eq!(derivation.thresholds.t2, 0.15);
    }

    #[test]
    fn test_material_midpoint() {
        let derivation = derive_material_threshold(0.05, 0.142).unwrap();
        assert_eq!(derivation.thresholds.tm, 0.096);
        assert!(derivation.warnings.is_empty());
    }

    #[test]
    fn test_material_zero_guard() {
        assert_eq!(
            derive_material_threshold(0.05, 0.0).unwrap_err(),
            CalibrationError::DegenerateCalibrationData {
                class: ReferenceClass::Absorbent
            }
        );
    }

    #[test]
    fn test_material_reflective_not_lower_warns() {
        let derivation = derive_material_threshold(0.2, 0.1).unwrap();
        assert_eq!(derivation.thresholds.tm, 0.15);
        assert_eq!(derivation.warnings.len(), 1);
        assert!(derivation.warnings[0].to_string().contains("REFLECTIVE"));
    }

    #[test]
    fn test_derive_requires_every_class() {
        let sigmas = [ClassSigma {
            class: ReferenceClass::Reflective,
            sigma: 0.05,
        }];
        assert_eq!(
            derive(CalibrationKind::Material, &sigmas).unwrap_err(),
            CalibrationError::NotComplete
        );
    }

    #[test]
    fn test_derive_by_kind() {
        let sigmas = [
            ClassSigma {
                class: ReferenceClass::CurvedIrregular,
                sigma: 0.3,
            },
            ClassSigma {
                class: ReferenceClass::Flat,
                sigma: 0.1,
            },
            ClassSigma {
                class: ReferenceClass::SlightlyCurved,
                sigma: 0.2,
            },
        ];
        let derivation = derive(CalibrationKind::Shape, &sigmas).unwrap();
        assert_eq!(
            derivation.thresholds,
            DerivedThresholds::Shape(ShapeThresholds { t1: 0.15, t2: 0.25 })
        );
    }
}
