//! Markdown output generation for tuning reports.

use crate::result::TuningReport;
use std::fmt::{self, Write};

fn write_summary(output: &mut String, report: &TuningReport) -> fmt::Result {
    let chosen = &report.result.chosen_configuration;

    writeln!(output, "# Power Tuning Summary: {}", report.function)?;
    writeln!(output)?;
    writeln!(output, "Run: `{}`", report.run_id)?;
    writeln!(output, "Generated: {}", report.timestamp.to_rfc3339())?;
    writeln!(output)?;
    writeln!(output, "## Recommendation")?;
    writeln!(output)?;
    writeln!(output, "- **Strategy:** {}", report.result.strategy)?;
    if let Some(weight) = report.result.balanced_weight {
        writeln!(output, "- **Balanced weight:** {}", weight)?;
    }
    writeln!(output, "- **Configuration:** {} MB", chosen.configuration_key)?;
    writeln!(output, "- **Average duration:** {:.2} ms", chosen.average_duration_ms)?;
    writeln!(output, "- **Unit price:** ${:.10}", chosen.unit_price)?;
    writeln!(output, "- **Search cost:** ${:.5}", report.result.search_cost)?;
    writeln!(
        output,
        "- **Benchmarked function cost:** ${:.10}",
        report.result.total_lambda_cost
    )?;
    if let Some(url) = &report.visualization {
        writeln!(output, "- **Chart:** [open]({})", url)?;
    }
    writeln!(output)?;

    writeln!(output, "## Results")?;
    writeln!(output)?;
    writeln!(output, "| Configuration | Avg Duration (ms) | Unit Price | Total Cost | Samples | Errors | Trimmed |")?;
    writeln!(output, "|---------------|-------------------|------------|------------|---------|--------|---------|")?;
    for summary in &report.summaries {
        let marker = if summary.configuration_key == chosen.configuration_key {
            " *"
        } else {
            ""
        };
        writeln!(
            output,
            "| {} MB{} | {:.2} | {:.10} | {:.10} | {} | {} | {} |",
            summary.configuration_key,
            marker,
            summary.average_duration_ms,
            summary.unit_price,
            summary.total_cost,
            summary.sample_count,
            summary.error_count,
            summary.trimmed_count
        )?;
    }
    writeln!(output)?;

    if let Some(stats) = &report.extraction {
        writeln!(output, "## Extraction")?;
        writeln!(output)?;
        writeln!(output, "- Lines seen: {}", stats.lines_seen)?;
        writeln!(output, "- Text reports: {}", stats.reports_parsed)?;
        writeln!(output, "- Structured reports: {}", stats.structured_reports)?;
        writeln!(output, "- Error lines: {}", stats.error_lines)?;
        writeln!(output, "- Rejected lines: {}", stats.rejected())?;
        writeln!(output)?;
    }

    if !report.diagnostics.is_empty() {
        writeln!(output, "## Diagnostics")?;
        writeln!(output)?;
        for diagnostic in &report.diagnostics {
            writeln!(output, "- {}", diagnostic)?;
        }
        writeln!(output)?;
    }

    writeln!(output, "---")?;
    writeln!(output, "Configurations ranked: {}", report.summaries.len())?;
    Ok(())
}

/// Generate a markdown summary of a tuning report.
pub fn generate_summary(report: &TuningReport) -> String {
    let mut output = String::new();
    // Writing into a String cannot fail.
    let _ = write_summary(&mut output, report);
    output
}
