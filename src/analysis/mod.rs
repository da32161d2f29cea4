// Analysis module - sigma-based surface classification
//
// Both classifiers consume the overall (macro) sigma of a scan. They are pure
// threshold lookups over a ThresholdSet loaded at startup or produced by a
// calibration session.

pub mod classifier;

pub use classifier::{
    MaterialClassifier, MaterialLabel, ShapeClassifier, ShapeLabel, SurfaceClassifier,
};

/// Shape and material verdict for one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SurfaceClassification {
    pub shape: ShapeLabel,
    pub material: MaterialLabel,
}
