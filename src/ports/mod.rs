//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the prognosis core and the trained model and export sink.

mod export;
mod survival_model;

pub use export::{ExportError, RecordExporter};
pub use survival_model::{ModelError, SurvivalModel};
