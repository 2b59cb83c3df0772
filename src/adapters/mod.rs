//! Adapters layer: Concrete implementations of ports.
//!
//! - `forest`: exported random survival forest (signed model artifact)
//! - `csv_export`: CSV export/import of the initial-diagnosis record
//! - `sanitize`: identifier filtering for logs

pub mod csv_export;
pub mod forest;
pub mod sanitize;

// Re-export model loading error for lib.rs
pub use forest::ModelLoadError;
