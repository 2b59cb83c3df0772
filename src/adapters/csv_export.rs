//! CSV adapter: Implementation of `RecordExporter`.
//!
//! Writes the initial-diagnosis record as a header row plus one data row, and
//! reads such a file back for the follow-up evaluation.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};

use crate::domain::ExportRecord;
use crate::ports::{ExportError, RecordExporter};

/// Default export file name offered to the user.
pub const DEFAULT_EXPORT_FILE: &str = "initial_diagnosis.csv";

/// Exports records to a CSV file on disk.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    path: PathBuf,
}

impl CsvExporter {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordExporter for CsvExporter {
    fn export(&self, record: &ExportRecord) -> Result<(), ExportError> {
        let file = std::fs::File::create(&self.path)?;
        write_record(file, record)?;
        tracing::info!("Exported initial diagnosis record to {:?}", self.path);
        Ok(())
    }
}

/// Serialize one record (header + row) to any writer.
///
/// # Errors
/// Returns error if writing fails.
pub fn write_record<W: Write>(writer: W, record: &ExportRecord) -> Result<(), ExportError> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(writer);
    wtr.serialize(record)?;
    wtr.flush()?;
    Ok(())
}

/// Read an exported initial-diagnosis record.
///
/// Coded columns are validated while decoding; an out-of-domain code is a
/// CSV deserialization error.
///
/// # Errors
/// Returns `ExportError::MissingRecord` if the file has a header but no row,
/// and `ExportError::InvalidRecord` if the age is out of range.
pub fn read_initial_diagnosis<R: Read>(reader: R) -> Result<ExportRecord, ExportError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let record: ExportRecord = match rdr.deserialize().next() {
        Some(row) => row?,
        None => {
            return Err(ExportError::MissingRecord(
                "initial diagnosis file contains no data row".into(),
            ))
        }
    };

    record
        .clinical_input()
        .validate()
        .map_err(|errors| ExportError::InvalidRecord(errors.join("; ")))?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Flag, Grade, Sex, Stage, TumourCount, TumourSize};

    fn record() -> ExportRecord {
        ExportRecord {
            age: 72,
            sex: Sex::Male,
            stage: Stage::T1,
            cis: Flag::Yes,
            grade: Grade::G3,
            number: TumourCount::Single,
            size: TumourSize::Large,
            bcg: Flag::No,
            mmc: Flag::No,
            survival_1y_pct: 91.3,
            survival_5y_pct: 64.0,
        }
    }

    #[test]
    fn test_write_uses_export_column_names() {
        let mut buf = Vec::new();
        write_record(&mut buf, &record()).expect("Should write");
        let text = String::from_utf8(buf).expect("utf8");
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some(
                "Age at Initial Diagnosis,Sex,Tumour Stage,Concomittant CIS,\
                 Tumour Grade (WHO 1973),Number of Tumours,Tumour Diameter,\
                 Treated with BCG,Treated with MMC,\
                 Progression-free survival at 1 year (%),\
                 Progression-free survival at 5 years (%)"
            )
        );
        assert_eq!(lines.next(), Some("72,0,1,1,3,0,1,0,0,91.3,64.0"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_import_exported_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let exporter = CsvExporter::new(temp.path().join(DEFAULT_EXPORT_FILE));
        exporter.export(&record()).expect("Should export");

        let file = std::fs::File::open(exporter.path()).expect("open export");
        let imported = read_initial_diagnosis(file).expect("Should import");
        assert_eq!(imported, record());
        assert_eq!(imported.clinical_input().grade, Grade::G3);
    }

    #[test]
    fn test_import_rejects_out_of_domain_code() {
        let mut buf = Vec::new();
        write_record(&mut buf, &record()).expect("Should write");
        let text = String::from_utf8(buf)
            .expect("utf8")
            .replace("72,0,1,1,3,", "72,0,1,1,4,");
        assert!(matches!(
            read_initial_diagnosis(text.as_bytes()),
            Err(ExportError::Csv(_))
        ));
    }

    #[test]
    fn test_import_rejects_out_of_range_age() {
        let mut buf = Vec::new();
        write_record(&mut buf, &record()).expect("Should write");
        let text = String::from_utf8(buf)
            .expect("utf8")
            .replace("\n72,0,", "\n150,0,");
        match read_initial_diagnosis(text.as_bytes()) {
            Err(ExportError::InvalidRecord(msg)) => assert!(msg.contains("150")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_import_requires_a_row() {
        let header_only = "Age at Initial Diagnosis,Sex\n";
        assert!(matches!(
            read_initial_diagnosis(header_only.as_bytes()),
            Err(ExportError::MissingRecord(_))
        ));
    }
}
