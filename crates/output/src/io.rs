//! I/O operations for tuning reports.
//!
//! Writes a [`TuningReport`] to a directory as JSON, CSV and Markdown, and
//! reads summaries back for re-selection.

use crate::csv;
use crate::error::{Error, Result};
use crate::markdown;
use crate::result::TuningReport;
use power_tuner_core::{ConfigurationSummary, MetricRecord};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default output directory path.
pub const OUTPUT_DIR: &str = "power-tuner-output";

/// Report file name.
pub const REPORT_FILE: &str = "report.json";

/// Summaries table file name.
pub const SUMMARIES_FILE: &str = "summaries.csv";

/// Markdown summary file name.
pub const SUMMARY_FILE: &str = "summary.md";

/// Extracted records file name.
pub const RECORDS_FILE: &str = "records.jsonl";

/// Records written between flushes.
pub const RECORD_CHUNK_SIZE: usize = 10;

/// Files produced by [`write_all_outputs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Pretty JSON report.
    pub report: PathBuf,
    /// CSV table.
    pub summaries: PathBuf,
    /// Markdown summary.
    pub summary: PathBuf,
}

/// Ensure the output directory exists.
pub fn ensure_output_dir(dir: impl AsRef<Path>) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Write any serializable value as pretty JSON.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Write the report as pretty JSON.
pub fn write_report_json(report: &TuningReport, path: impl AsRef<Path>) -> Result<()> {
    write_json(report, path)
}

/// Write the summaries table.
pub fn write_summaries_csv(
    summaries: &[ConfigurationSummary],
    path: impl AsRef<Path>,
) -> Result<()> {
    fs::write(path, csv::generate_csv(summaries))?;
    Ok(())
}

/// Write the markdown summary.
pub fn write_summary(report: &TuningReport, path: impl AsRef<Path>) -> Result<()> {
    fs::write(path, markdown::generate_summary(report))?;
    Ok(())
}

/// Write every report output into `dir`.
pub fn write_all_outputs(dir: impl AsRef<Path>, report: &TuningReport) -> Result<OutputPaths> {
    let dir = dir.as_ref();
    ensure_output_dir(dir)?;

    let paths = OutputPaths {
        report: dir.join(REPORT_FILE),
        summaries: dir.join(SUMMARIES_FILE),
        summary: dir.join(SUMMARY_FILE),
    };

    write_report_json(report, &paths.report)?;
    write_summaries_csv(&report.summaries, &paths.summaries)?;
    write_summary(report, &paths.summary)?;

    info!(
        run_id = %report.run_id,
        dir = %dir.display(),
        "Wrote tuning outputs"
    );
    Ok(paths)
}

/// Write records as JSON lines, flushing every `chunk_size` records.
///
/// Returns the number of records written.
pub fn write_records_jsonl(
    records: &[MetricRecord],
    path: impl AsRef<Path>,
    chunk_size: usize,
) -> Result<usize> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut written = 0;

    for (idx, chunk) in records.chunks(chunk_size.max(1)).enumerate() {
        for record in chunk {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        written += chunk.len();
        debug!(chunk = idx, records = chunk.len(), "Flushed record chunk");
    }

    Ok(written)
}

/// Read a report from a JSON file.
pub fn read_report_json(path: impl AsRef<Path>) -> Result<TuningReport> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Read pre-aggregated summaries.
///
/// Accepts either a JSON array of summaries or a full report.
pub fn read_summaries_json(path: impl AsRef<Path>) -> Result<Vec<ConfigurationSummary>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;

    let summaries: Vec<ConfigurationSummary> = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        serde_json::Value::Object(ref object) if object.contains_key("summaries") => {
            serde_json::from_value(value["summaries"].clone())?
        }
        _ => {
            return Err(Error::InvalidContent {
                path: path.to_path_buf(),
                reason: "expected an array of summaries or a report".to_string(),
            })
        }
    };
    Ok(summaries)
}
