//! Clinical covariates collected at initial diagnosis.
//!
//! Every categorical covariate is carried as a small enum and serialized as
//! the integer code used by the scoring systems and the survival model
//! (e.g. `Stage::T1` <-> `1`). Decoding an unknown code fails, so an
//! out-of-domain value is rejected before it can reach the score engine.

use serde::{Deserialize, Serialize};

/// Error raised when an integer code does not belong to a covariate's domain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: code {code} is not one of {allowed}")]
pub struct CodeError {
    pub field: &'static str,
    pub code: u8,
    pub allowed: &'static str,
}

/// Defines a coded covariate: the enum, its integer code and the fallible
/// conversion back from that code.
macro_rules! coded {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal, $allowed:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u8", into = "u8")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// All values in code order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Integer code of this value.
            #[must_use]
            pub const fn code(self) -> u8 {
                match self {
                    $( $name::$variant => $code ),+
                }
            }
        }

        impl TryFrom<u8> for $name {
            type Error = CodeError;

            fn try_from(code: u8) -> Result<Self, Self::Error> {
                match code {
                    $( $code => Ok($name::$variant), )+
                    _ => Err(CodeError { field: $field, code, allowed: $allowed }),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value.code()
            }
        }
    };
}

coded! {
    /// Patient sex.
    Sex, "sex", "{0 = male, 1 = female}" {
        Male = 0,
        Female = 1,
    }
}

coded! {
    /// Primary tumour stage.
    Stage, "stage", "{0 = Ta, 1 = T1}" {
        /// Non-invasive papillary carcinoma
        Ta = 0,
        /// Tumour infiltrating the lamina propria
        T1 = 1,
    }
}

coded! {
    /// WHO 1973 histologic grade.
    Grade, "grade", "{1, 2, 3}" {
        G1 = 1,
        G2 = 2,
        G3 = 3,
    }
}

coded! {
    /// Number of tumours found at resection.
    TumourCount, "number", "{0 = single, 1 = multiple}" {
        Single = 0,
        Multiple = 1,
    }
}

coded! {
    /// Tumour diameter category.
    TumourSize, "size", "{0 = < 3 cm, 1 = >= 3 cm}" {
        /// Less than 3 cm
        Small = 0,
        /// 3 cm or greater
        Large = 1,
    }
}

coded! {
    /// Yes/no covariate (concomitant CIS, BCG, MMC).
    Flag, "flag", "{0 = no, 1 = yes}" {
        No = 0,
        Yes = 1,
    }
}

impl Flag {
    #[must_use]
    pub const fn is_yes(self) -> bool {
        matches!(self, Flag::Yes)
    }
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        if value {
            Flag::Yes
        } else {
            Flag::No
        }
    }
}

/// Upper bound of the age domain accepted by the input form.
pub const MAX_AGE: u8 = 100;

/// Raw covariates for one patient at initial diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalInput {
    /// Age in years at initial diagnosis, [0, 100]
    pub age: u8,
    pub sex: Sex,
    pub stage: Stage,
    /// Concomitant carcinoma in situ
    pub cis: Flag,
    pub grade: Grade,
    pub number: TumourCount,
    pub size: TumourSize,
    /// Treated with intravesical Bacillus Calmette-Guerin
    pub bcg: Flag,
    /// Treated with intravesical Mitomycin C
    pub mmc: Flag,
}

impl Default for ClinicalInput {
    /// The form defaults: 72-year-old male, T1 grade 3 with CIS, single
    /// tumour of 3 cm or more, no intravesical therapy.
    fn default() -> Self {
        Self {
            age: 72,
            sex: Sex::Male,
            stage: Stage::T1,
            cis: Flag::Yes,
            grade: Grade::G3,
            number: TumourCount::Single,
            size: TumourSize::Large,
            bcg: Flag::No,
            mmc: Flag::No,
        }
    }
}

impl ClinicalInput {
    /// Validate the parts of the input that the type system does not cover.
    ///
    /// # Errors
    /// Returns every violation found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.age > MAX_AGE {
            errors.push(format!("Age {} out of range [0, {MAX_AGE}]", self.age));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
