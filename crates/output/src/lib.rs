//! Output layer for power tuning results.
//!
//! Wraps an analysis run into a [`TuningReport`] and writes it to disk.
//!
//! # Quick Start
//!
//! ```no_run
//! use power_tuner_output::{io, TuningReport};
//! # fn demo(outcome: &power_tuner_analytics::TuningOutcome) -> power_tuner_output::Result<()> {
//! let report = TuningReport::from_outcome("my-function", outcome);
//! let paths = io::write_all_outputs("power-tuner-output", &report)?;
//! println!("{}", paths.summary.display());
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`result`] - The `TuningReport` envelope
//! - [`io`] - Writing and reading report files
//! - [`markdown`] - Markdown summary generation
//! - [`csv`] - CSV table generation
//! - [`visualization`] - Chart link encoding

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod csv;
pub mod error;
pub mod io;
pub mod markdown;
pub mod result;
pub mod visualization;

pub use error::{Error, Result};
pub use result::TuningReport;
pub use visualization::{build_visualization_url, DEFAULT_VISUALIZATION_URL};

use power_tuner_analytics::TuningOutcome;
use std::path::Path;

/// Build the report for an outcome, attach its chart link and write every output.
pub fn write_outcome(
    dir: impl AsRef<Path>,
    function: &str,
    outcome: &TuningOutcome,
    visualization_url: Option<&str>,
) -> Result<(TuningReport, io::OutputPaths)> {
    let base_url = visualization_url.unwrap_or(DEFAULT_VISUALIZATION_URL);
    let report = TuningReport::from_outcome(function, outcome).with_visualization(
        build_visualization_url(&outcome.summaries, base_url, &outcome.region),
    );
    let paths = io::write_all_outputs(dir, &report)?;
    Ok((report, paths))
}
