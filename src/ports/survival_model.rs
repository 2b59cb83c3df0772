//! Survival model port: Trait for the pretrained progression model.
//!
//! This trait abstracts the trained artifact from the prognosis service so
//! that any model (or a test stub) can be injected.

use crate::domain::{CurveError, FeatureVector, SurvivalCurve};

/// Errors raised when invoking a survival model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// The feature vector does not match the schema the model was trained on.
    #[error("feature schema mismatch: model expects {expected:?}, got {attempted:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        attempted: Vec<String>,
    },

    #[error("model produced an invalid survival curve: {0}")]
    InvalidCurve(#[from] CurveError),

    #[error("model invocation failed: {0}")]
    Invocation(String),
}

/// Trait for survival model inference.
///
/// Implementations are stateless at inference time: the same feature vector
/// always yields the same curve.
pub trait SurvivalModel: Send + Sync {
    /// Predict the progression-free survival function for a single row.
    ///
    /// # Errors
    /// Returns `ModelError::SchemaMismatch` if the vector's fields differ from
    /// the trained schema.
    fn predict_survival(&self, features: &FeatureVector) -> Result<SurvivalCurve, ModelError>;
}
