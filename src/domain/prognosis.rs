//! Survival model inputs and outputs.
//!
//! - [`FeatureVector`]: the fixed 10-field row the survival forest was trained on
//! - [`SurvivalCurve`]: progression-free survival step function returned by the model
//! - [`Prognosis`] / [`Evaluation`]: what the host displays and exports

use serde::{Deserialize, Serialize};

use super::clinical::ClinicalInput;
use super::scores::ScoreResult;

/// Feature names and order expected by the survival model.
///
/// This is the trained schema. Renaming or reordering breaks every
/// exported model.
pub const FEATURE_NAMES: [&str; 10] = [
    "Age at Initial Diagnosis",
    "Tumour Grade",
    "Treated with BCG",
    "Treated with MMC",
    "EORTC - Recurrence Score",
    "EORTC - Progression Score",
    "CUETO - Recurrence Score",
    "CUETO - Progression Score",
    "EAU - Progression Ratio",
    "CUA - Risk Group",
];

/// Number of model features.
pub const NUM_FEATURES: usize = FEATURE_NAMES.len();

/// Time horizons (years) reported to the patient.
pub const HORIZON_1Y: f64 = 1.0;
pub const HORIZON_5Y: f64 = 5.0;

/// Single-row model input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: [f64; NUM_FEATURES],
}

impl FeatureVector {
    /// Assemble the model row from the raw covariates and derived scores.
    #[must_use]
    pub fn assemble(input: &ClinicalInput, scores: &ScoreResult) -> Self {
        Self {
            values: [
                f64::from(input.age),
                f64::from(input.grade.code()),
                f64::from(input.bcg.code()),
                f64::from(input.mmc.code()),
                f64::from(scores.eortc_recurrence),
                f64::from(scores.eortc_progression),
                f64::from(scores.cueto_recurrence),
                f64::from(scores.cueto_progression),
                scores.eau_progression_ratio,
                f64::from(scores.cua_risk_group.label()),
            ],
        }
    }

    /// Field names, in order.
    #[must_use]
    pub fn names(&self) -> &'static [&'static str; NUM_FEATURES] {
        &FEATURE_NAMES
    }

    /// Field values, in order.
    #[must_use]
    pub fn values(&self) -> &[f64; NUM_FEATURES] {
        &self.values
    }

    /// Look up a value by field name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }

    /// `(name, value)` pairs in model order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }
}

/// Reasons a set of breakpoints is not a survival function.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurveError {
    #[error("survival curve has no breakpoints")]
    Empty,

    #[error("times and probabilities differ in length ({times} vs {probabilities})")]
    LengthMismatch { times: usize, probabilities: usize },

    #[error("time {time} at index {index} is negative, non-finite or not increasing")]
    InvalidTime { index: usize, time: f64 },

    #[error("probability {probability} at index {index} is outside [0, 1] or increases")]
    InvalidProbability { index: usize, probability: f64 },
}

/// Tolerance for floating point noise when averaging leaf curves.
const MONOTONE_EPS: f64 = 1e-9;

/// Progression-free survival step function S(t).
///
/// Breakpoints are kept as `(time, probability)` with strictly increasing
/// times and non-increasing probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCurve")]
pub struct SurvivalCurve {
    times: Vec<f64>,
    probabilities: Vec<f64>,
}

/// Unchecked wire form of a [`SurvivalCurve`].
#[derive(Deserialize)]
struct RawCurve {
    times: Vec<f64>,
    probabilities: Vec<f64>,
}

impl TryFrom<RawCurve> for SurvivalCurve {
    type Error = CurveError;

    fn try_from(raw: RawCurve) -> Result<Self, Self::Error> {
        SurvivalCurve::new(raw.times, raw.probabilities)
    }
}

impl SurvivalCurve {
    /// Build a curve from breakpoints.
    ///
    /// # Errors
    /// Returns `CurveError` if the breakpoints do not describe a survival function.
    pub fn new(times: Vec<f64>, probabilities: Vec<f64>) -> Result<Self, CurveError> {
        if times.len() != probabilities.len() {
            return Err(CurveError::LengthMismatch {
                times: times.len(),
                probabilities: probabilities.len(),
            });
        }
        if times.is_empty() {
            return Err(CurveError::Empty);
        }

        for (index, &time) in times.iter().enumerate() {
            let increasing = index == 0 || time > times[index - 1];
            if !time.is_finite() || time < 0.0 || !increasing {
                return Err(CurveError::InvalidTime { index, time });
            }
        }
        for (index, &probability) in probabilities.iter().enumerate() {
            let in_range = (0.0..=1.0 + MONOTONE_EPS).contains(&probability);
            let non_increasing =
                index == 0 || probability <= probabilities[index - 1] + MONOTONE_EPS;
            if !in_range || !non_increasing {
                return Err(CurveError::InvalidProbability { index, probability });
            }
        }

        Ok(Self {
            times,
            probabilities,
        })
    }

    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    #[must_use]
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// `(time, probability)` breakpoints.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.probabilities.iter().copied())
    }

    /// Last observed time.
    #[must_use]
    pub fn max_time(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Piecewise-linear interpolation of S at `t`.
    ///
    /// Clamped to the curve's domain: before the first breakpoint the first
    /// probability is returned, after the last one the final plateau.
    #[must_use]
    pub fn interpolate(&self, t: f64) -> f64 {
        let n = self.times.len();
        if t <= self.times[0] {
            return self.probabilities[0];
        }
        if t >= self.times[n - 1] {
            return self.probabilities[n - 1];
        }

        // First breakpoint strictly after t; 1 <= hi <= n - 1 here.
        let hi = self.times.partition_point(|&x| x <= t);
        let lo = hi - 1;
        let (t0, t1) = (self.times[lo], self.times[hi]);
        let (s0, s1) = (self.probabilities[lo], self.probabilities[hi]);
        s0 + (s1 - s0) * (t - t0) / (t1 - t0)
    }
}

/// Convert a probability to a percentage rounded to one decimal place.
///
/// Ties on the tenth digit round to even.
#[must_use]
pub fn to_display_percent(probability: f64) -> f64 {
    (probability * 100.0 * 10.0).round_ties_even() / 10.0
}

/// Model output for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prognosis {
    /// Unrounded curve, kept for plotting
    pub curve: SurvivalCurve,

    /// Progression-free survival at 1 year, unrounded probability
    pub survival_1y: f64,

    /// Progression-free survival at 5 years, unrounded probability
    pub survival_5y: f64,
}

impl Prognosis {
    /// Evaluate the curve at the reporting horizons.
    #[must_use]
    pub fn from_curve(curve: SurvivalCurve) -> Self {
        let survival_1y = curve.interpolate(HORIZON_1Y);
        let survival_5y = curve.interpolate(HORIZON_5Y);
        Self {
            curve,
            survival_1y,
            survival_5y,
        }
    }

    /// 1-year progression-free survival, percent with one decimal.
    #[must_use]
    pub fn p1_pct(&self) -> f64 {
        to_display_percent(self.survival_1y)
    }

    /// 5-year progression-free survival, percent with one decimal.
    #[must_use]
    pub fn p5_pct(&self) -> f64 {
        to_display_percent(self.survival_5y)
    }
}

/// One complete evaluation: inputs, scores and model output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    /// Unique identifier
    pub id: String,

    pub input: ClinicalInput,

    pub scores: ScoreResult,

    pub prognosis: Prognosis,

    /// Timestamp of evaluation
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Evaluation {
    #[must_use]
    pub fn new(input: ClinicalInput, scores: ScoreResult, prognosis: Prognosis) -> Self {
        Self {
            id: uuid_v4(),
            input,
            scores,
            prognosis,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Generate a random UUID v4 string from a ChaCha20 CSPRNG seeded by the OS.
fn uuid_v4() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 16] = rng.gen();

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        (bytes[6] & 0x0f) | 0x40, bytes[7],
        (bytes[8] & 0x3f) | 0x80, bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}
