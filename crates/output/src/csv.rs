//! CSV table of per-configuration statistics.

use power_tuner_core::ConfigurationSummary;
use std::fmt::{self, Write};

/// Header row of the summaries table.
pub const CSV_HEADER: &str =
    "configuration_mb,average_duration_ms,unit_price,total_cost,samples,errors";

fn write_rows(output: &mut String, summaries: &[ConfigurationSummary]) -> fmt::Result {
    writeln!(output, "{}", CSV_HEADER)?;
    for summary in summaries {
        writeln!(
            output,
            "{},{},{},{},{},{}",
            summary.configuration_key,
            summary.average_duration_ms,
            summary.unit_price,
            summary.total_cost,
            summary.sample_count,
            summary.error_count
        )?;
    }
    Ok(())
}

/// Render summaries as CSV, one row per configuration, in the given order.
///
/// Every field is numeric, so no quoting is needed.
pub fn generate_csv(summaries: &[ConfigurationSummary]) -> String {
    let mut output = String::new();
    // Writing into a String cannot fail.
    let _ = write_rows(&mut output, summaries);
    output
}
