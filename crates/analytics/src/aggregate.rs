// Copyright 2025 Power Tuner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-configuration aggregation of execution records.
//!
//! Groups [`MetricRecord`]s by configuration, drops errored invocations from
//! the averages, and produces one [`ConfigurationSummary`] per configuration.
//!
//! # Features
//!
//! - Order-independent results keyed by configuration value
//! - Optional trimmed mean (discard the slowest and fastest samples)
//! - Exact per-record cost sums through a [`CostModel`]
//! - Diagnostics for missing data instead of hard failures
//!
//! # Example
//!
//! ```ignore
//! use power_tuner_analytics::aggregate::{AggregationOptions, MetricAggregator};
//!
//! let aggregator = MetricAggregator::new(cost_model, AggregationOptions::new(0.2)?);
//! let report = aggregator.aggregate(&records);
//! for summary in report.summaries.values() {
//!     println!("{} MB: {:.1} ms", summary.configuration_key, summary.average_duration_ms);
//! }
//! ```

use crate::pricing::CostModel;
use power_tuner_core::{ConfigurationKey, ConfigurationSummary, Error, MetricRecord, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Default share of samples discarded from each end.
pub const DEFAULT_DISCARD_FRACTION: f64 = 0.2;

/// Largest accepted discard fraction.
pub const MAX_DISCARD_FRACTION: f64 = 0.4;

/// Aggregation knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregationOptions {
    discard_fraction: f64,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            discard_fraction: DEFAULT_DISCARD_FRACTION,
        }
    }
}

impl AggregationOptions {
    /// Options with a discard fraction.
    ///
    /// Values outside `[0, 0.4]` are clamped with a warning. NaN is rejected.
    pub fn new(discard_fraction: f64) -> Result<Self> {
        if discard_fraction.is_nan() {
            return Err(Error::invalid_input("discard fraction must be a number"));
        }
        let clamped = discard_fraction.clamp(0.0, MAX_DISCARD_FRACTION);
        if clamped != discard_fraction {
            warn!(
                requested = discard_fraction,
                applied = clamped,
                "Discard fraction out of range, clamping"
            );
        }
        Ok(Self {
            discard_fraction: clamped,
        })
    }

    /// Plain arithmetic mean.
    pub fn untrimmed() -> Self {
        Self {
            discard_fraction: 0.0,
        }
    }

    /// Applied discard fraction.
    pub fn discard_fraction(&self) -> f64 {
        self.discard_fraction
    }
}

/// Something worth telling the user about an aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// No usable samples; the configuration was excluded.
    InsufficientData {
        /// Affected configuration.
        key: ConfigurationKey,
        /// Errored samples seen for it.
        errored: usize,
    },
    /// Non-error records without a billed duration.
    MissingDuration {
        /// Affected configuration.
        key: ConfigurationKey,
        /// Records skipped.
        count: usize,
    },
    /// Invocations that signaled a functional error.
    FunctionalErrors {
        /// Affected configuration.
        key: ConfigurationKey,
        /// Errored records.
        count: usize,
    },
    /// Too few samples to discard any.
    TrimSkipped {
        /// Affected configuration.
        key: ConfigurationKey,
        /// Samples available.
        samples: usize,
    },
    /// Trimming would have removed every sample; the plain mean was used.
    TrimFallback {
        /// Affected configuration.
        key: ConfigurationKey,
        /// Samples available.
        samples: usize,
    },
}

impl Diagnostic {
    /// Configuration the diagnostic is about.
    pub fn key(&self) -> ConfigurationKey {
        match self {
            Diagnostic::InsufficientData { key, .. }
            | Diagnostic::MissingDuration { key, .. }
            | Diagnostic::FunctionalErrors { key, .. }
            | Diagnostic::TrimSkipped { key, .. }
            | Diagnostic::TrimFallback { key, .. } => *key,
        }
    }

    /// The matching error value, for diagnostics that exclude a configuration.
    pub fn as_error(&self) -> Option<Error> {
        match self {
            Diagnostic::InsufficientData { key, errored } => Some(Error::insufficient_data(
                *key,
                format!("no successful samples ({} errored)", errored),
            )),
            _ => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::InsufficientData { key, errored } => write!(
                f,
                "{} MB: no successful samples ({} errored), excluded",
                key, errored
            ),
            Diagnostic::MissingDuration { key, count } => {
                write!(f, "{} MB: {} records without a billed duration", key, count)
            }
            Diagnostic::FunctionalErrors { key, count } => {
                write!(f, "{} MB: {} invocations reported errors", key, count)
            }
            Diagnostic::TrimSkipped { key, samples } => write!(
                f,
                "{} MB: not enough samples to trim ({})",
                key, samples
            ),
            Diagnostic::TrimFallback { key, samples } => write!(
                f,
                "{} MB: trimming would discard all {} samples, using plain mean",
                key, samples
            ),
        }
    }
}

/// Output of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationReport {
    /// Summaries keyed by configuration.
    pub summaries: BTreeMap<ConfigurationKey, ConfigurationSummary>,
    /// Records considered.
    pub record_count: usize,
    /// Records flagged as errors.
    pub error_count: usize,
    /// Diagnostics, ordered by configuration.
    pub diagnostics: Vec<Diagnostic>,
}

impl AggregationReport {
    /// Summaries ordered by configuration value.
    pub fn summary_list(&self) -> Vec<ConfigurationSummary> {
        self.summaries.values().cloned().collect()
    }

    /// Configurations excluded for lack of data.
    pub fn excluded(&self) -> impl Iterator<Item = ConfigurationKey> + '_ {
        self.diagnostics.iter().filter_map(|d| match d {
            Diagnostic::InsufficientData { key, .. } => Some(*key),
            _ => None,
        })
    }
}

/// Result of a (possibly trimmed) mean over sorted samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimmedMean {
    /// The mean.
    pub mean: f64,
    /// Samples discarded in total, both ends.
    pub discarded: usize,
    /// Whether trimming was requested but nothing could be discarded.
    pub skipped: bool,
    /// Whether trimming would have emptied the set.
    pub fell_back: bool,
}

/// Mean of `sorted` after removing `floor(len * fraction)` values from each end.
///
/// `sorted` must be ascending. Returns `None` for an empty slice.
pub fn trimmed_mean(sorted: &[u64], fraction: f64) -> Option<TrimmedMean> {
    if sorted.is_empty() {
        return None;
    }

    let n = sorted.len();
    let per_side = (n as f64 * fraction).floor() as usize;
    let mean_of = |samples: &[u64]| {
        let sum: u128 = samples.iter().map(|&d| u128::from(d)).sum();
        sum as f64 / samples.len() as f64
    };

    if per_side == 0 {
        return Some(TrimmedMean {
            mean: mean_of(sorted),
            discarded: 0,
            skipped: fraction > 0.0,
            fell_back: false,
        });
    }

    if per_side * 2 >= n {
        return Some(TrimmedMean {
            mean: mean_of(sorted),
            discarded: 0,
            skipped: false,
            fell_back: true,
        });
    }

    Some(TrimmedMean {
        mean: mean_of(&sorted[per_side..n - per_side]),
        discarded: per_side * 2,
        skipped: false,
        fell_back: false,
    })
}

#[derive(Default)]
struct Partition {
    durations: Vec<u64>,
    errored: usize,
    missing_duration: usize,
}

/// Groups records by configuration and computes summaries.
#[derive(Debug, Clone)]
pub struct MetricAggregator {
    cost_model: CostModel,
    options: AggregationOptions,
}

impl MetricAggregator {
    /// Create an aggregator.
    pub fn new(cost_model: CostModel, options: AggregationOptions) -> Self {
        Self {
            cost_model,
            options,
        }
    }

    /// Cost model in use.
    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    /// Options in use.
    pub fn options(&self) -> &AggregationOptions {
        &self.options
    }

    /// Aggregate a batch of records.
    pub fn aggregate(&self, records: &[MetricRecord]) -> AggregationReport {
        let mut partitions: BTreeMap<ConfigurationKey, Partition> = BTreeMap::new();
        let mut error_count = 0;

        for record in records {
            let partition = partitions.entry(record.configuration_key).or_default();
            if let Some(err) = record.functional_error() {
                debug!(
                    configuration = %record.configuration_key,
                    error = %err,
                    "Excluding errored invocation"
                );
                partition.errored += 1;
                error_count += 1;
            } else {
                match record.duration_ms {
                    Some(duration) => partition.durations.push(duration),
                    None => partition.missing_duration += 1,
                }
            }
        }

        let mut summaries = BTreeMap::new();
        let mut diagnostics = Vec::new();

        for (key, mut partition) in partitions {
            if partition.errored > 0 {
                diagnostics.push(Diagnostic::FunctionalErrors {
                    key,
                    count: partition.errored,
                });
            }
            if partition.missing_duration > 0 {
                diagnostics.push(Diagnostic::MissingDuration {
                    key,
                    count: partition.missing_duration,
                });
            }

            partition.durations.sort();
            let Some(mean) = trimmed_mean(&partition.durations, self.options.discard_fraction)
            else {
                warn!(
                    configuration = %key,
                    errored = partition.errored,
                    "No successful samples, excluding configuration"
                );
                diagnostics.push(Diagnostic::InsufficientData {
                    key,
                    errored: partition.errored,
                });
                continue;
            };

            let samples = partition.durations.len();
            if mean.skipped {
                diagnostics.push(Diagnostic::TrimSkipped { key, samples });
            }
            if mean.fell_back {
                diagnostics.push(Diagnostic::TrimFallback { key, samples });
            }

            let total_cost: f64 = partition
                .durations
                .iter()
                .map(|&d| self.cost_model.cost(key, d as f64))
                .sum();

            let summary = ConfigurationSummary {
                configuration_key: key,
                average_duration_ms: mean.mean,
                unit_price: self.cost_model.cost(key, mean.mean),
                total_cost,
                sample_count: samples,
                error_count: partition.errored,
                trimmed_count: mean.discarded,
            };

            debug!(
                configuration = %key,
                samples,
                average_duration_ms = summary.average_duration_ms,
                unit_price = summary.unit_price,
                "Aggregated configuration"
            );
            summaries.insert(key, summary);
        }

        AggregationReport {
            summaries,
            record_count: records.len(),
            error_count,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::PriceQuote;

    fn model() -> CostModel {
        CostModel::new(PriceQuote::per_unit_time(1.0), 128).unwrap()
    }

    fn record(key: u32, id: &str, duration: Option<u64>) -> MetricRecord {
        MetricRecord::builder()
            .configuration_key(ConfigurationKey::new(key))
            .request_id(id)
            .maybe_duration_ms(duration)
            .build()
            .unwrap()
    }

    fn errored(key: u32, id: &str, duration: Option<u64>) -> MetricRecord {
        let mut r = record(key, id, duration);
        r.is_error = true;
        r
    }

    #[test]
    fn test_options_clamp_and_reject_nan() {
        assert_eq!(AggregationOptions::new(0.9).unwrap().discard_fraction(), 0.4);
        assert_eq!(AggregationOptions::new(-1.0).unwrap().discard_fraction(), 0.0);
        assert_eq!(AggregationOptions::new(0.1).unwrap().discard_fraction(), 0.1);
        assert!(matches!(
            AggregationOptions::new(f64::NAN),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(AggregationOptions::default().discard_fraction(), 0.2);
    }

    #[test]
    fn test_trimmed_mean_discards_outliers() {
        let mut samples = vec![100, 120, 110, 5000, 90];
        samples.sort_unstable();
        let mean = trimmed_mean(&samples, 0.2).unwrap();
        assert_eq!(mean.mean, 110.0);
        assert_eq!(mean.discarded, 2);
        assert!(!mean.skipped);
    }

    #[test]
    fn test_trimmed_mean_zero_fraction_is_plain_mean() {
        let samples = vec![90, 100, 110, 120, 5000];
        let mean = trimmed_mean(&samples, 0.0).unwrap();
        assert_eq!(mean.mean, 1084.0);
        assert!(!mean.skipped);
    }

    #[test]
    fn test_trimmed_mean_skips_small_sets() {
        let mean = trimmed_mean(&[100, 200], 0.2).unwrap();
        assert_eq!(mean.mean, 150.0);
        assert!(mean.skipped);
        assert_eq!(mean.discarded, 0);
    }

    #[test]
    fn test_trimmed_mean_falls_back_when_emptied() {
        let mean = trimmed_mean(&[100, 200], 0.5).unwrap();
        assert_eq!(mean.mean, 150.0);
        assert!(mean.fell_back);
        assert!(trimmed_mean(&[], 0.2).is_none());
    }

    #[test]
    fn test_trimmed_mean_of_huge_durations() {
        let mean = trimmed_mean(&[u64::MAX, u64::MAX], 0.0).unwrap();
        assert_eq!(mean.mean, u64::MAX as f64);
    }

    #[test]
    fn test_aggregate_huge_durations() {
        let records = vec![
            record(128, "a", Some(u64::MAX)),
            record(128, "b", Some(u64::MAX)),
        ];
        let report = MetricAggregator::new(model(), AggregationOptions::default()).aggregate(&records);

        let summary = &report.summaries[&ConfigurationKey::new(128)];
        assert_eq!(summary.average_duration_ms, u64::MAX as f64);
        assert_eq!(summary.sample_count, 2);
        assert!(summary.is_finite());
    }

    #[test]
    fn test_aggregate_excludes_errors() {
        let records = vec![
            record(512, "a", Some(100)),
            record(512, "b", Some(300)),
            errored(512, "c", Some(9_000)),
        ];
        let report = MetricAggregator::new(model(), AggregationOptions::untrimmed())
            .aggregate(&records);

        let summary = &report.summaries[&ConfigurationKey::new(512)];
        assert_eq!(summary.average_duration_ms, 200.0);
        assert_eq!(summary.sample_count, 2);
        assert_eq!(summary.error_count, 1);
        // 2 records * 1 billed second * (512 / 128)
        assert_eq!(summary.total_cost, 8.0);
        assert_eq!(summary.unit_price, 4.0);
        assert_eq!(report.record_count, 3);
        assert_eq!(report.error_count, 1);
        assert!(report
            .diagnostics
            .contains(&Diagnostic::FunctionalErrors { key: ConfigurationKey::new(512), count: 1 }));
    }

    #[test]
    fn test_aggregate_all_errors_is_insufficient_data() {
        let records = vec![errored(256, "a", Some(100)), record(128, "b", Some(100))];
        let report = MetricAggregator::new(model(), AggregationOptions::default())
            .aggregate(&records);

        assert!(!report.summaries.contains_key(&ConfigurationKey::new(256)));
        assert_eq!(report.excluded().collect::<Vec<_>>(), vec![ConfigurationKey::new(256)]);
        let diagnostic = report
            .diagnostics
            .iter()
            .find(|d| matches!(d, Diagnostic::InsufficientData { .. }))
            .unwrap();
        assert!(matches!(
            diagnostic.as_error(),
            Some(Error::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_aggregate_counts_missing_durations() {
        let records = vec![record(128, "a", None), record(128, "b", Some(50))];
        let report = MetricAggregator::new(model(), AggregationOptions::untrimmed())
            .aggregate(&records);

        assert_eq!(report.summaries[&ConfigurationKey::new(128)].sample_count, 1);
        assert!(report.diagnostics.contains(&Diagnostic::MissingDuration {
            key: ConfigurationKey::new(128),
            count: 1
        }));
    }

    #[test]
    fn test_aggregate_reports_trim_skipped() {
        let records = vec![record(128, "a", Some(10)), record(128, "b", Some(20))];
        let report = MetricAggregator::new(model(), AggregationOptions::default())
            .aggregate(&records);
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::TrimSkipped { key: ConfigurationKey::new(128), samples: 2 }]
        );
    }

    #[test]
    fn test_summaries_ordered_by_configuration() {
        let records = vec![
            record(1024, "a", Some(10)),
            record(128, "b", Some(10)),
            record(512, "c", Some(10)),
        ];
        let report = MetricAggregator::new(model(), AggregationOptions::untrimmed())
            .aggregate(&records);
        let keys: Vec<u32> = report
            .summary_list()
            .iter()
            .map(|s| s.configuration_key.memory_mb())
            .collect();
        assert_eq!(keys, vec![128, 512, 1024]);
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::TrimSkipped { key: ConfigurationKey::new(256), samples: 3 };
        assert_eq!(d.to_string(), "256 MB: not enough samples to trim (3)");
        assert_eq!(d.key(), ConfigurationKey::new(256));
    }
}
