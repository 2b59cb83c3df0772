//! Application layer: Use cases and services.
//!
//! This module orchestrates the score engine with the survival model and
//! export ports.

mod prognosis;

pub use prognosis::PrognosisService;
