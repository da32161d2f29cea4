// Progress tracking for calibration sessions
//
// Reference classes, the session phase machine and the progress snapshot an
// operator-facing surface renders.

use serde::{Deserialize, Serialize};

/// Which threshold set a session calibrates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationKind {
    Shape,
    Material,
}

impl CalibrationKind {
    /// Reference classes in collection order
    pub fn classes(&self) -> &'static [ReferenceClass] {
        match self {
            CalibrationKind::Shape => &[
                ReferenceClass::Flat,
                ReferenceClass::SlightlyCurved,
                ReferenceClass::CurvedIrregular,
            ],
            CalibrationKind::Material => &[ReferenceClass::Reflective, ReferenceClass::Absorbent],
        }
    }
}

/// Labeled physical reference used to anchor thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceClass {
    Flat,
    SlightlyCurved,
    CurvedIrregular,
    Reflective,
    Absorbent,
}

impl ReferenceClass {
    pub fn display_name(&self) -> &'static str {
        match self {
            ReferenceClass::Flat => "FLAT",
            ReferenceClass::SlightlyCurved => "SLIGHTLY CURVED",
            ReferenceClass::CurvedIrregular => "CURVED/IRREGULAR",
            ReferenceClass::Reflective => "REFLECTIVE",
            ReferenceClass::Absorbent => "ABSORBENT",
        }
    }

    /// What the operator should place in front of the sensor
    pub fn instructions(&self) -> &'static str {
        match self {
            ReferenceClass::Flat => {
                "Place a hard, flat object (a large book or a piece of wood) 20-30 cm from the sensor."
            }
            ReferenceClass::SlightlyCurved => {
                "Place a gently curved object (a large can, bottle or pipe) in front of the sensor."
            }
            ReferenceClass::CurvedIrregular => {
                "Place a very curved or irregular object (a ball or crumpled paper) in front of the sensor."
            }
            ReferenceClass::Reflective => {
                "Place a hard, FLAT object (wood, plastic, metal or a thick book) 20-30 cm away."
            }
            ReferenceClass::Absorbent => {
                "Place a soft, FLAT object (sponge, thick towel or foam block) in the same position."
            }
        }
    }

    pub fn kind(&self) -> CalibrationKind {
        match self {
            ReferenceClass::Flat | ReferenceClass::SlightlyCurved | ReferenceClass::CurvedIrregular => {
                CalibrationKind::Shape
            }
            ReferenceClass::Reflective | ReferenceClass::Absorbent => CalibrationKind::Material,
        }
    }
}

/// Session phase: AwaitingUser -> Collecting(k/N) -> ... -> Computed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    /// Waiting for the operator to place the reference and confirm
    AwaitingUser { class: ReferenceClass },
    /// Taking readings against the current reference
    Collecting {
        class: ReferenceClass,
        collected: usize,
        needed: usize,
    },
    /// Thresholds derived; the outcome is available
    Computed,
    /// Degenerate or under-sampled data stopped the session
    Halted { class: ReferenceClass },
}

impl SessionPhase {
    pub fn kind(&self) -> SessionPhaseKind {
        match self {
            SessionPhase::AwaitingUser { .. } => SessionPhaseKind::AwaitingUser,
            SessionPhase::Collecting { .. } => SessionPhaseKind::Collecting,
            SessionPhase::Computed => SessionPhaseKind::Computed,
            SessionPhase::Halted { .. } => SessionPhaseKind::Halted,
        }
    }
}

/// Data-free discriminant of [`SessionPhase`] for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhaseKind {
    AwaitingUser,
    Collecting,
    Computed,
    Halted,
}

/// Snapshot of a session for operator display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationProgress {
    pub kind: CalibrationKind,
    pub phase: SessionPhase,
    /// 0-based index of the class in progress
    pub class_index: usize,
    pub class_count: usize,
}

impl CalibrationProgress {
    /// Percentage of readings collected for the current class (0-100)
    pub fn percentage(&self) -> u8 {
        match self.phase {
            SessionPhase::Collecting {
                collected, needed, ..
            } if needed > 0 => ((collected as f64 / needed as f64) * 100.0) as u8,
            SessionPhase::Computed => 100,
            _ => 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Computed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classes_in_order() {
        assert_eq!(
            CalibrationKind::Shape.classes(),
            &[
                ReferenceClass::Flat,
                ReferenceClass::SlightlyCurved,
                ReferenceClass::CurvedIrregular
            ]
        );
        assert_eq!(
            CalibrationKind::Material.classes(),
            &[ReferenceClass::Reflective, ReferenceClass::Absorbent]
        );
    }

    #[test]
    fn test_class_kind_roundtrip() {
        for kind in [CalibrationKind::Shape, CalibrationKind::Material] {
            for class in kind.classes() {
                assert_eq!(class.kind(), kind);
            }
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(ReferenceClass::Flat.display_name(), "FLAT");
        assert_eq!(ReferenceClass::Absorbent.display_name(), "ABSORBENT");
    }

    #[test]
    fn test_progress_percentage() {
        let progress = CalibrationProgress {
            kind: CalibrationKind::Material,
            phase: SessionPhase::Collecting {
                class: ReferenceClass::Reflective,
                collected: 25,
                needed: 50,
            },
            class_index: 0,
            class_count: 2,
        };
        assert_eq!(progress.percentage(), 50);
        assert!(!progress.is_complete());

        let done = CalibrationProgress {
            phase: SessionPhase::Computed,
            ..progress
        };
        assert_eq!(done.percentage(), 100);
        assert!(done.is_complete());
    }

    #[test]
    fn test_phase_serializes_with_tag() {
        let json = serde_json::to_string(&SessionPhase::AwaitingUser {
            class: ReferenceClass::Flat,
        })
        .unwrap();
        assert_eq!(json, r#"{"phase":"awaiting_user","class":"flat"}"#);
    }
}
