//! Export port: Trait for handing the initial-diagnosis record to its sink.

use crate::domain::ExportRecord;

/// Errors that can occur while exporting or importing a record.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Record not found: {0}")]
    MissingRecord(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// Trait for record export.
///
/// The encoding is the implementation's concern.
pub trait RecordExporter {
    /// Export a single record.
    ///
    /// # Errors
    /// Returns error if the record cannot be written.
    fn export(&self, record: &ExportRecord) -> Result<(), ExportError>;
}
