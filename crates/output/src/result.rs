//! Tuning report envelope.
//!
//! A [`TuningReport`] wraps the recommendation of one analysis run with the
//! identifiers needed to store and compare runs.

use chrono::{DateTime, Utc};
use power_tuner_analytics::{Diagnostic, ExtractionStats, TuningOutcome};
use power_tuner_core::{ConfigurationSummary, OptimizationResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of one tuning run, as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningReport {
    /// Unique identifier of the run.
    pub run_id: Uuid,
    /// Label of the tuned function.
    pub function: String,
    /// When the report was created.
    pub timestamp: DateTime<Utc>,
    /// The recommendation.
    pub result: OptimizationResult,
    /// Per-configuration statistics, ordered by configuration value.
    pub summaries: Vec<ConfigurationSummary>,
    /// Aggregation diagnostics.
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    /// Extraction counters, when the run started from raw reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionStats>,
    /// Link to the results chart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization: Option<String>,
}

impl TuningReport {
    /// Create a report for pre-aggregated summaries.
    pub fn new(
        function: impl Into<String>,
        result: OptimizationResult,
        mut summaries: Vec<ConfigurationSummary>,
    ) -> Self {
        summaries.sort_by_key(|s| s.configuration_key);
        Self {
            run_id: Uuid::new_v4(),
            function: function.into(),
            timestamp: Utc::now(),
            result,
            summaries,
            diagnostics: Vec::new(),
            extraction: None,
            visualization: None,
        }
    }

    /// Create a report from a full analysis run.
    pub fn from_outcome(function: impl Into<String>, outcome: &TuningOutcome) -> Self {
        let mut report = Self::new(function, outcome.result.clone(), outcome.summaries.clone());
        report.diagnostics = outcome.diagnostics.clone();
        report.extraction = Some(outcome.extraction.clone());
        report
    }

    /// Attach a visualization link.
    pub fn with_visualization(mut self, url: impl Into<String>) -> Self {
        self.visualization = Some(url.into());
        self
    }
}
