//! Environment-driven settings for the command line host.
//!
//! | variable                               | meaning                                  |
//! |----------------------------------------|------------------------------------------|
//! | `NIMBLE_MODEL_DIR`                     | model directory (default `model`)        |
//! | `NIMBLE_EXPORT_PATH`                   | write the CSV export here when set       |
//! | `NIMBLE_LOG_MODE`                      | `file`, `stderr` or `auto` (stderr)      |
//! | `NIMBLE_LOG_FILE`                      | log path in file mode                    |
//! | `NIMBLE_MODEL_SIGNING_PUBKEY_B64_FILE` | file holding the base64 verifying key    |
//! | `NIMBLE_MODEL_SIGNING_PUBKEY_B64`      | base64 verifying key                     |
//! | `NIMBLE_ALLOW_UNSIGNED_MODELS`         | skip model signatures (debug builds only)|

use std::path::PathBuf;

use crate::adapters::forest::ModelTrust;
use crate::NimbleError;

pub const MODEL_DIR_ENV: &str = "NIMBLE_MODEL_DIR";
pub const EXPORT_PATH_ENV: &str = "NIMBLE_EXPORT_PATH";
pub const LOG_MODE_ENV: &str = "NIMBLE_LOG_MODE";
pub const LOG_FILE_ENV: &str = "NIMBLE_LOG_FILE";
pub const PUBKEY_FILE_ENV: &str = "NIMBLE_MODEL_SIGNING_PUBKEY_B64_FILE";
pub const PUBKEY_ENV: &str = "NIMBLE_MODEL_SIGNING_PUBKEY_B64";
pub const ALLOW_UNSIGNED_MODELS_ENV: &str = "NIMBLE_ALLOW_UNSIGNED_MODELS";

const DEFAULT_MODEL_DIR: &str = "model";
const DEFAULT_LOG_FILE: &str = "nimble.log";

/// Where log output goes. Stdout is reserved for the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogMode {
    Stderr,
    File(PathBuf),
}

/// Host settings resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub model_dir: PathBuf,
    pub export_path: Option<PathBuf>,
    pub log_mode: LogMode,
    pub public_key_b64: Option<String>,
    pub allow_unsigned_models: bool,
}

/// Interpret a boolean flag value.
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES")
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    /// Returns `NimbleError::Config` if a referenced key file cannot be read.
    pub fn from_env() -> Result<Self, NimbleError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns `NimbleError::Config` if a referenced key file cannot be read.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, NimbleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_dir = lookup(MODEL_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR));

        let export_path = lookup(EXPORT_PATH_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let log_mode = match lookup(LOG_MODE_ENV).as_deref() {
            Some("file") => LogMode::File(
                lookup(LOG_FILE_ENV)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            ),
            // stderr, auto
            _ => LogMode::Stderr,
        };

        let public_key_b64 = match lookup(PUBKEY_FILE_ENV) {
            Some(path) => Some(std::fs::read_to_string(path.trim()).map_err(|e| {
                NimbleError::Config(format!("Failed reading {PUBKEY_FILE_ENV}: {e}"))
            })?),
            None => lookup(PUBKEY_ENV),
        };

        let allow_unsigned_models = lookup(ALLOW_UNSIGNED_MODELS_ENV)
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        Ok(Self {
            model_dir,
            export_path,
            log_mode,
            public_key_b64,
            allow_unsigned_models,
        })
    }

    /// Resolve the model trust policy.
    ///
    /// A configured verifying key always wins. Without one, release builds
    /// refuse to continue; debug builds may opt out of verification.
    ///
    /// # Errors
    /// Returns error if no usable key is configured.
    pub fn model_trust(&self) -> Result<ModelTrust, NimbleError> {
        if let Some(b64) = &self.public_key_b64 {
            return Ok(ModelTrust::from_public_key_b64(b64)?);
        }

        #[cfg(debug_assertions)]
        if self.allow_unsigned_models {
            return Ok(ModelTrust::Unsigned);
        }

        Err(NimbleError::Config(format!(
            "No model verifying key: set {PUBKEY_FILE_ENV} or {PUBKEY_ENV}"
        )))
    }
}
