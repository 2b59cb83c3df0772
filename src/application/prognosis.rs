//! Prognosis service: Orchestrates one evaluation.
//!
//! This service coordinates:
//! - Input validation
//! - Risk scoring
//! - Feature assembly and survival model inference
//! - Reading 1- and 5-year survival off the curve
//! - Handing the record to an exporter

use std::sync::Arc;

use crate::domain::{
    ClinicalInput, Evaluation, ExportRecord, FeatureVector, Prognosis, ScoreResult, HORIZON_1Y,
    HORIZON_5Y,
};
use crate::ports::{RecordExporter, SurvivalModel};
use crate::NimbleError;

/// Service for progression prognosis at initial diagnosis.
///
/// The model is loaded once by the host and injected here; the service holds
/// no other state, so one instance can serve any number of evaluations.
pub struct PrognosisService<M>
where
    M: SurvivalModel,
{
    model: Arc<M>,
}

impl<M> PrognosisService<M>
where
    M: SurvivalModel,
{
    /// Create a new prognosis service.
    pub fn new(model: Arc<M>) -> Self {
        Self { model }
    }

    /// Compute the risk scores for an input.
    #[must_use]
    pub fn compute_scores(&self, input: &ClinicalInput) -> ScoreResult {
        ScoreResult::from(input)
    }

    /// Run the survival model for a scored input.
    ///
    /// Horizons past the curve's last time point use its final plateau; this
    /// is logged as a warning, not an error.
    ///
    /// # Errors
    /// Returns `NimbleError::Model` if the model rejects the feature vector.
    pub fn predict(
        &self,
        input: &ClinicalInput,
        scores: &ScoreResult,
    ) -> Result<Prognosis, NimbleError> {
        let features = FeatureVector::assemble(input, scores);
        tracing::debug!("Invoking survival model with {} features", features.values().len());

        let curve = self.model.predict_survival(&features).map_err(|e| {
            tracing::error!(
                "Survival model rejected feature vector {:?}: {}",
                features.names(),
                e
            );
            NimbleError::Model(e)
        })?;

        for horizon in [HORIZON_1Y, HORIZON_5Y] {
            if horizon > curve.max_time() {
                tracing::warn!(
                    "Horizon {} y is past the last curve time {} y; using plateau value",
                    horizon,
                    curve.max_time()
                );
            }
        }

        Ok(Prognosis::from_curve(curve))
    }

    /// Validate, score and predict in one pass.
    ///
    /// # Errors
    /// Returns `NimbleError::Validation` for out-of-domain input, or any
    /// error from [`Self::predict`].
    pub fn evaluate(&self, input: ClinicalInput) -> Result<Evaluation, NimbleError> {
        input
            .validate()
            .map_err(|errors| NimbleError::Validation(errors.join("; ")))?;

        tracing::info!("Starting prognosis evaluation...");

        tracing::debug!("Step 1: Computing risk scores...");
        let scores = self.compute_scores(&input);

        tracing::debug!("Step 2: Predicting survival...");
        let prognosis = self.predict(&input, &scores)?;

        let evaluation = Evaluation::new(input, scores, prognosis);
        tracing::info!(
            "Prognosis complete: 1y={:.1}%, 5y={:.1}%, CUA group {}",
            evaluation.prognosis.p1_pct(),
            evaluation.prognosis.p5_pct(),
            evaluation.scores.cua_risk_group
        );

        Ok(evaluation)
    }

    /// Export an evaluation through the given sink.
    ///
    /// # Errors
    /// Returns `NimbleError::Export` if the sink fails.
    pub fn export<E: RecordExporter>(
        &self,
        evaluation: &Evaluation,
        exporter: &E,
    ) -> Result<ExportRecord, NimbleError> {
        let record = ExportRecord::from(evaluation);
        exporter.export(&record)?;
        Ok(record)
    }
}
