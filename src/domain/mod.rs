//! Domain layer: Core clinical types and the score engine.
//!
//! Pure Rust with no I/O. Everything here is deterministic except the
//! identifier and timestamp attached to an [`Evaluation`].

mod clinical;
mod prognosis;
mod record;
mod scores;

pub use clinical::{
    ClinicalInput, CodeError, Flag, Grade, Sex, Stage, TumourCount, TumourSize, MAX_AGE,
};
pub use prognosis::{
    to_display_percent, CurveError, Evaluation, FeatureVector, Prognosis, SurvivalCurve,
    FEATURE_NAMES, HORIZON_1Y, HORIZON_5Y, NUM_FEATURES,
};
pub use record::ExportRecord;
pub use scores::{compute_scores, CuaRiskGroup, ScoreResult, CUA_MAX_LABEL, EAU_MAX_POINTS};
