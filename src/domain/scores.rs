//! Clinical risk scores for NMIBC recurrence and progression.
//!
//! EORTC, CUETO and EAU are point systems over the same covariates; each has
//! its own weight table below. The literal weights are the published ones and
//! must not be re-derived. CUA is a rule-based risk grouping.

use serde::{Deserialize, Serialize};

use super::clinical::{ClinicalInput, CodeError, Flag, Grade, Sex, Stage, TumourCount, TumourSize};

/// Normalizer for the EAU progression points: the maximum attainable score.
pub const EAU_MAX_POINTS: u32 = 317;

/// 0/1 indicator terms shared by all point systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Indicators {
    female: u32,
    age_60_or_over: u32,
    age_over_70: u32,
    multiple: u32,
    large: u32,
    t1: u32,
    cis: u32,
    /// grade - 1 (0, 1 or 2)
    grade_linear: u32,
    grade_2: u32,
    grade_3: u32,
}

impl Indicators {
    fn new(
        sex: Sex,
        age: u8,
        number: TumourCount,
        size: TumourSize,
        stage: Stage,
        cis: Flag,
        grade: Grade,
    ) -> Self {
        Self {
            female: u32::from(sex == Sex::Female),
            age_60_or_over: u32::from(age >= 60),
            age_over_70: u32::from(age > 70),
            multiple: u32::from(number == TumourCount::Multiple),
            large: u32::from(size == TumourSize::Large),
            t1: u32::from(stage == Stage::T1),
            cis: u32::from(cis.is_yes()),
            grade_linear: u32::from(grade.code()) - 1,
            grade_2: u32::from(grade == Grade::G2),
            grade_3: u32::from(grade == Grade::G3),
        }
    }
}

/// Per-covariate weights of one point system.
#[derive(Debug, Clone, Copy)]
struct Weights {
    female: u32,
    age_60_or_over: u32,
    age_over_70: u32,
    multiple: u32,
    large: u32,
    t1: u32,
    cis: u32,
    grade_linear: u32,
    grade_2: u32,
    grade_3: u32,
}

impl Weights {
    const ZERO: Weights = Weights {
        female: 0,
        age_60_or_over: 0,
        age_over_70: 0,
        multiple: 0,
        large: 0,
        t1: 0,
        cis: 0,
        grade_linear: 0,
        grade_2: 0,
        grade_3: 0,
    };

    fn points(&self, x: &Indicators) -> u32 {
        self.female * x.female
            + self.age_60_or_over * x.age_60_or_over
            + self.age_over_70 * x.age_over_70
            + self.multiple * x.multiple
            + self.large * x.large
            + self.t1 * x.t1
            + self.cis * x.cis
            + self.grade_linear * x.grade_linear
            + self.grade_2 * x.grade_2
            + self.grade_3 * x.grade_3
    }
}

const EORTC_RECURRENCE: Weights = Weights {
    multiple: 3,
    large: 3,
    t1: 1,
    cis: 1,
    grade_linear: 1,
    ..Weights::ZERO
};

const EORTC_PROGRESSION: Weights = Weights {
    multiple: 3,
    large: 3,
    t1: 4,
    cis: 6,
    grade_3: 5,
    ..Weights::ZERO
};

const CUETO_RECURRENCE: Weights = Weights {
    female: 3,
    age_60_or_over: 1,
    age_over_70: 1,
    multiple: 2,
    cis: 2,
    grade_2: 1,
    grade_3: 3,
    ..Weights::ZERO
};

const CUETO_PROGRESSION: Weights = Weights {
    age_over_70: 2,
    multiple: 1,
    t1: 2,
    cis: 1,
    grade_2: 2,
    grade_3: 6,
    ..Weights::ZERO
};

const EAU_PROGRESSION: Weights = Weights {
    age_over_70: 32,
    multiple: 32,
    large: 43,
    t1: 52,
    cis: 58,
    grade_2: 58,
    grade_3: 100,
    ..Weights::ZERO
};

/// CUA risk group label (0..=5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CuaRiskGroup(u8);

/// Highest CUA risk group label.
pub const CUA_MAX_LABEL: u8 = 5;

impl TryFrom<u8> for CuaRiskGroup {
    type Error = CodeError;

    fn try_from(label: u8) -> Result<Self, Self::Error> {
        if label <= CUA_MAX_LABEL {
            Ok(Self(label))
        } else {
            Err(CodeError {
                field: "cua_risk_group",
                code: label,
                allowed: "{0, 1, 2, 3, 4, 5}",
            })
        }
    }
}

impl From<CuaRiskGroup> for u8 {
    fn from(group: CuaRiskGroup) -> u8 {
        group.0
    }
}

impl CuaRiskGroup {
    #[must_use]
    pub const fn label(self) -> u8 {
        self.0
    }

    /// Classify a tumour into its CUA risk group.
    ///
    /// The rules overlap; they are tested in order and the first match wins.
    #[must_use]
    pub fn classify(
        number: TumourCount,
        size: TumourSize,
        stage: Stage,
        cis: Flag,
        grade: Grade,
    ) -> Self {
        let multiple = number == TumourCount::Multiple;
        let large = size == TumourSize::Large;
        let t1 = stage == Stage::T1;
        let g3 = grade == Grade::G3;

        let label = if !multiple && !large && !t1 && !cis.is_yes() && !g3 {
            0
        } else if t1 && g3 && ((multiple && large) || cis.is_yes()) {
            5
        } else if t1 || (!t1 && g3 && (multiple || large)) {
            4
        } else if !t1 && g3 && !multiple && !large {
            3
        } else if multiple || large {
            2
        } else {
            1
        };

        Self(label)
    }
}

impl std::fmt::Display for CuaRiskGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The six derived indices for one patient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub eortc_recurrence: u32,
    pub eortc_progression: u32,
    pub cueto_recurrence: u32,
    pub cueto_progression: u32,
    /// EAU progression points divided by [`EAU_MAX_POINTS`], in [0, 1]
    pub eau_progression_ratio: f64,
    pub cua_risk_group: CuaRiskGroup,
}

/// Compute every risk index from the seven scoring covariates.
///
/// Inputs are assumed to be in domain; treatment flags play no part.
#[must_use]
pub fn compute_scores(
    sex: Sex,
    age: u8,
    number: TumourCount,
    size: TumourSize,
    stage: Stage,
    cis: Flag,
    grade: Grade,
) -> ScoreResult {
    let x = Indicators::new(sex, age, number, size, stage, cis, grade);

    ScoreResult {
        eortc_recurrence: EORTC_RECURRENCE.points(&x),
        eortc_progression: EORTC_PROGRESSION.points(&x),
        cueto_recurrence: CUETO_RECURRENCE.points(&x),
        cueto_progression: CUETO_PROGRESSION.points(&x),
        eau_progression_ratio: f64::from(EAU_PROGRESSION.points(&x)) / f64::from(EAU_MAX_POINTS),
        cua_risk_group: CuaRiskGroup::classify(number, size, stage, cis, grade),
    }
}

impl From<&ClinicalInput> for ScoreResult {
    fn from(input: &ClinicalInput) -> Self {
        compute_scores(
            input.sex,
            input.age,
            input.number,
            input.size,
            input.stage,
            input.cis,
            input.grade,
        )
    }
}
