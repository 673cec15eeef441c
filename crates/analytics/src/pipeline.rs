// Copyright 2025 Power Tuner Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end analysis of one batch of tagged reports.

use crate::aggregate::{Diagnostic, MetricAggregator};
use crate::pricing::{PriceLookup, PricingTable};
use crate::report::{ExtractionStats, ReportExtractor, TaggedReport};
use crate::selector::optimize;
use crate::settings::{all_power_values, TunerSettings};
use power_tuner_core::{
    ConfigurationKey, ConfigurationSummary, Error, MetricRecord, OptimizationResult, Result,
};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Everything an analysis run produced.
#[derive(Debug, Clone, Serialize)]
pub struct TuningOutcome {
    /// The recommendation.
    pub result: OptimizationResult,
    /// Per-configuration statistics, ordered by configuration value.
    pub summaries: Vec<ConfigurationSummary>,
    /// Extracted records, in first-seen order.
    #[serde(skip)]
    pub records: Vec<MetricRecord>,
    /// Extraction counters.
    pub extraction: ExtractionStats,
    /// Aggregation diagnostics.
    pub diagnostics: Vec<Diagnostic>,
    /// Configured candidates with no report in the batch.
    pub missing_candidates: Vec<ConfigurationKey>,
    /// Region the price was resolved for.
    pub region: String,
    /// Whether the price came from the `default` entry.
    pub price_fell_back: bool,
    /// The resolved price.
    #[serde(skip)]
    pub price: PriceLookup,
}

/// Run extraction, aggregation and selection over a batch.
///
/// Record-level problems end up in [`TuningOutcome::extraction`] and
/// [`TuningOutcome::diagnostics`]. Invalid settings, an unknown architecture
/// or a batch with no usable configuration fail the call.
pub fn analyze(
    batch: &[TaggedReport],
    settings: &TunerSettings,
    pricing: &PricingTable,
) -> Result<TuningOutcome> {
    settings.validate()?;

    let mut extractor = ReportExtractor::new();
    extractor.ingest_all(batch);
    let (records, extraction) = extractor.finish();
    if extraction.rejected() > 0 {
        warn!(
            rejected = extraction.rejected(),
            malformed_json = extraction.malformed_json,
            "Some report lines were not usable"
        );
    }

    let (cost_model, price) = settings.cost_model(pricing)?;
    let aggregator = MetricAggregator::new(cost_model, settings.aggregation_options()?);
    let aggregation = aggregator.aggregate(&records);

    let seen: BTreeSet<ConfigurationKey> = batch.iter().map(|r| r.configuration_key).collect();
    let missing_candidates: Vec<ConfigurationKey> = settings
        .candidates
        .iter()
        .filter(|key| !seen.contains(key))
        .copied()
        .collect();
    if !missing_candidates.is_empty() && !seen.is_empty() {
        // Default candidates span the whole power range.
        if settings.candidates == all_power_values() {
            debug!(
                missing = missing_candidates.len(),
                "Batch covers part of the default power range"
            );
        } else {
            warn!(
                missing = missing_candidates.len(),
                "Batch has no reports for some configured candidates"
            );
        }
    }

    let summaries = aggregation.summary_list();
    if summaries.is_empty() {
        let excluded: Vec<String> = aggregation.excluded().map(|key| key.to_string()).collect();
        return Err(if excluded.is_empty() {
            Error::invalid_input("batch contains no usable reports")
        } else {
            Error::invalid_input(format!(
                "no configuration has valid samples (excluded: {} MB)",
                excluded.join(", ")
            ))
        });
    }

    let request = settings
        .selection_request()
        .with_tested_configurations(seen.len());
    let result = optimize(&summaries, &request)?;

    info!(
        records = aggregation.record_count,
        errors = aggregation.error_count,
        configurations = summaries.len(),
        "Analysis complete"
    );

    Ok(TuningOutcome {
        result,
        summaries,
        records,
        extraction,
        diagnostics: aggregation.diagnostics,
        missing_candidates,
        region: price.requested_region.clone(),
        price_fell_back: price.fell_back,
        price,
    })
}
