//! # NIMBLE
//!
//! Non-muscle invasive bladder cancer longitudinal evaluation: progression
//! risk scoring and individualized progression-free survival at initial
//! diagnosis.
//!
//! This crate provides:
//! - The EORTC, CUETO and EAU point scores and the CUA risk group
//! - Feature assembly and inference against a pretrained survival forest
//! - 1- and 5-year progression-free survival read off the predicted curve
//! - Export of the initial-diagnosis record for follow-up evaluation
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Clinical covariates, score engine, survival curves
//! - `ports`: Trait definitions for the survival model and export sink
//! - `adapters`: Concrete implementations (survival forest, CSV, log sanitizer)
//! - `application`: The prognosis use case
//! - `config`: Environment-driven settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{compute_scores, ClinicalInput, Evaluation, Prognosis, ScoreResult};

/// Result type for NIMBLE operations
pub type Result<T> = std::result::Result<T, NimbleError>;

/// Main error type for NIMBLE
#[derive(Debug, thiserror::Error)]
pub enum NimbleError {
    #[error("Invalid clinical input: {0}")]
    Validation(String),

    #[error("Survival model invocation failed: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Model could not be loaded: {0}")]
    ModelLoad(#[from] adapters::ModelLoadError),

    #[error("Export failed: {0}")]
    Export(#[from] ports::ExportError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
