// Copyright 2025 Power Tuner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Derived, read-only results of an aggregation and selection pass.

use crate::types::ConfigurationKey;
use serde::{Deserialize, Serialize};

/// Aggregated statistics for one configuration.
///
/// Accepts the camelCase field names used by executor stats payloads
/// (`value`, `averageDuration`, `averagePrice`, `totalCost`) on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSummary {
    /// Configuration these statistics belong to.
    #[serde(alias = "value", alias = "configurationKey")]
    pub configuration_key: ConfigurationKey,
    /// Mean billed duration of the non-error samples, after trimming.
    #[serde(alias = "averageDuration", alias = "averageDurationMs")]
    pub average_duration_ms: f64,
    /// Cost of one invocation at the average duration.
    #[serde(alias = "averagePrice", alias = "unitPrice")]
    pub unit_price: f64,
    /// Exact sum of per-record costs.
    #[serde(alias = "totalCost")]
    pub total_cost: f64,
    /// Non-error samples with a duration.
    #[serde(default)]
    pub sample_count: usize,
    /// Samples flagged as functional errors.
    #[serde(default)]
    pub error_count: usize,
    /// Samples dropped by the trimmed mean.
    #[serde(default)]
    pub trimmed_count: usize,
}

impl ConfigurationSummary {
    /// Create a summary without sample counters.
    pub fn new(
        configuration_key: ConfigurationKey,
        average_duration_ms: f64,
        unit_price: f64,
        total_cost: f64,
    ) -> Self {
        Self {
            configuration_key,
            average_duration_ms,
            unit_price,
            total_cost,
            sample_count: 0,
            error_count: 0,
            trimmed_count: 0,
        }
    }

    /// Whether every statistic is a finite number.
    pub fn is_finite(&self) -> bool {
        self.average_duration_ms.is_finite()
            && self.unit_price.is_finite()
            && self.total_cost.is_finite()
    }
}

/// The configuration picked by the selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChosenConfiguration {
    /// Selected configuration.
    pub configuration_key: ConfigurationKey,
    /// Its unit price.
    pub unit_price: f64,
    /// Its average duration in milliseconds.
    pub average_duration_ms: f64,
}

impl From<&ConfigurationSummary> for ChosenConfiguration {
    fn from(summary: &ConfigurationSummary) -> Self {
        Self {
            configuration_key: summary.configuration_key,
            unit_price: summary.unit_price,
            average_duration_ms: summary.average_duration_ms,
        }
    }
}

/// Final recommendation of a tuning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// The winning configuration.
    pub chosen_configuration: ChosenConfiguration,
    /// Cost of running the profiling workflow itself.
    pub search_cost: f64,
    /// Sum of `total_cost` over every candidate.
    pub total_lambda_cost: f64,
    /// Strategy name that produced the choice.
    pub strategy: String,
    /// Weight used by the balanced strategy, when it ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balanced_weight: Option<f64>,
}
