//! Initial-diagnosis record handed to the export collaborator.
//!
//! The column names are the ones the follow-up tool imports, so they are
//! kept verbatim (including the historical "Concomittant" spelling).

use serde::{Deserialize, Serialize};

use super::clinical::{ClinicalInput, Flag, Grade, Sex, Stage, TumourCount, TumourSize};
use super::prognosis::Evaluation;

/// Flat mapping of raw inputs plus the two rounded percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    #[serde(rename = "Age at Initial Diagnosis")]
    pub age: u8,

    #[serde(rename = "Sex")]
    pub sex: Sex,

    #[serde(rename = "Tumour Stage")]
    pub stage: Stage,

    #[serde(rename = "Concomittant CIS")]
    pub cis: Flag,

    #[serde(rename = "Tumour Grade (WHO 1973)")]
    pub grade: Grade,

    #[serde(rename = "Number of Tumours")]
    pub number: TumourCount,

    #[serde(rename = "Tumour Diameter")]
    pub size: TumourSize,

    #[serde(rename = "Treated with BCG")]
    pub bcg: Flag,

    #[serde(rename = "Treated with MMC")]
    pub mmc: Flag,

    #[serde(rename = "Progression-free survival at 1 year (%)")]
    pub survival_1y_pct: f64,

    #[serde(rename = "Progression-free survival at 5 years (%)")]
    pub survival_5y_pct: f64,
}

impl ExportRecord {
    /// Raw covariates carried by this record.
    #[must_use]
    pub fn clinical_input(&self) -> ClinicalInput {
        ClinicalInput {
            age: self.age,
            sex: self.sex,
            stage: self.stage,
            cis: self.cis,
            grade: self.grade,
            number: self.number,
            size: self.size,
            bcg: self.bcg,
            mmc: self.mmc,
        }
    }
}

impl From<&Evaluation> for ExportRecord {
    fn from(evaluation: &Evaluation) -> Self {
        let input = &evaluation.input;
        Self {
            age: input.age,
            sex: input.sex,
            stage: input.stage,
            cis: input.cis,
            grade: input.grade,
            number: input.number,
            size: input.size,
            bcg: input.bcg,
            mmc: input.mmc,
            survival_1y_pct: evaluation.prognosis.p1_pct(),
            survival_5y_pct: evaluation.prognosis.p5_pct(),
        }
    }
}
