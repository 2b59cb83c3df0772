//! NIMBLE-1: progression prognosis at initial diagnosis.
//!
//! Reads one `ClinicalInput` as JSON (from the file given as the first
//! argument, or stdin), prints the evaluation as JSON on stdout and, when
//! `NIMBLE_EXPORT_PATH` is set, writes the initial-diagnosis CSV there.

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nimble::adapters::csv_export::{CsvExporter, DEFAULT_EXPORT_FILE};
use nimble::adapters::forest::ForestSurvivalModel;
use nimble::adapters::sanitize::SanitizingMakeWriter;
use nimble::application::PrognosisService;
use nimble::config::{LogMode, Settings};
use nimble::ClinicalInput;

fn main() -> Result<()> {
    let settings = Settings::from_env()?;

    // Logs never go to stdout: it carries the report.
    let (writer, _guard) = match &settings.log_mode {
        LogMode::File(path) => {
            if let Some(parent) = path.parent() {
                // Best-effort: the open below reports the real error.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting NIMBLE-1...");

    let input = read_input(std::env::args().nth(1))?;

    // Loaded once and shared read-only for the life of the process.
    let trust = settings.model_trust()?;
    let model = ForestSurvivalModel::load(&settings.model_dir, &trust)
        .with_context(|| format!("loading model from {}", settings.model_dir.display()))?;
    let service = PrognosisService::new(Arc::new(model));

    let evaluation = service.evaluate(input)?;
    println!("{}", serde_json::to_string_pretty(&evaluation)?);

    if let Some(path) = &settings.export_path {
        let path = if path.is_dir() {
            path.join(DEFAULT_EXPORT_FILE)
        } else {
            path.clone()
        };
        service.export(&evaluation, &CsvExporter::new(path))?;
    }

    tracing::info!("NIMBLE-1 finished.");
    Ok(())
}

fn read_input(path: Option<String>) -> Result<ClinicalInput> {
    let text = match path.as_deref() {
        Some("-") | None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading clinical input from stdin")?;
            buf
        }
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("reading {p}"))?,
    };
    serde_json::from_str(&text).context("parsing clinical input JSON")
}
