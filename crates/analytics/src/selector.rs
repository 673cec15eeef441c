// Copyright 2025 Power Tuner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration selection.
//!
//! Ranks [`ConfigurationSummary`] candidates under one of three strategies and
//! returns the winner:
//!
//! - `cost`: cheapest unit price, then fastest
//! - `speed`: fastest, then cheapest
//! - `balanced`: weighted sum of price and duration, each normalized by its maximum
//!
//! Ties go to the candidate listed first.
//!
//! # Example
//!
//! ```
//! use power_tuner_analytics::selector::{select, OptimizationStrategy};
//! use power_tuner_core::{ConfigurationKey, ConfigurationSummary};
//!
//! let summaries = vec![
//!     ConfigurationSummary::new(ConfigurationKey::new(128), 800.0, 0.9, 9.0),
//!     ConfigurationSummary::new(ConfigurationKey::new(256), 400.0, 1.1, 11.0),
//! ];
//!
//! let chosen = select(&summaries, OptimizationStrategy::Speed, 0.5).unwrap();
//! assert_eq!(chosen.configuration_key, ConfigurationKey::new(256));
//! ```

use crate::pricing::{default_transition_prices, search_cost, RegionMap, DEFAULT_REGION};
use power_tuner_core::{
    ChosenConfiguration, ConfigurationSummary, Error, OptimizationResult, Result,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Default weight of price against duration for the balanced strategy.
pub const DEFAULT_BALANCED_WEIGHT: f64 = 0.5;

/// How the winning configuration is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationStrategy {
    /// Minimize unit price, then duration.
    #[default]
    Cost,
    /// Minimize duration, then unit price.
    Speed,
    /// Minimize a weighted blend of normalized price and duration.
    Balanced,
}

impl OptimizationStrategy {
    /// Every strategy, in declaration order.
    pub const ALL: [OptimizationStrategy; 3] = [
        OptimizationStrategy::Cost,
        OptimizationStrategy::Speed,
        OptimizationStrategy::Balanced,
    ];

    /// Identifier used in settings and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationStrategy::Cost => "cost",
            OptimizationStrategy::Speed => "speed",
            OptimizationStrategy::Balanced => "balanced",
        }
    }
}

impl fmt::Display for OptimizationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cost" => Ok(OptimizationStrategy::Cost),
            "speed" => Ok(OptimizationStrategy::Speed),
            "balanced" => Ok(OptimizationStrategy::Balanced),
            other => Err(Error::invalid_input(format!(
                "unknown optimization strategy: {}",
                other
            ))),
        }
    }
}

/// Everything [`optimize`] needs besides the summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRequest {
    /// Ranking strategy.
    pub strategy: OptimizationStrategy,
    /// Price weight for the balanced strategy.
    pub balanced_weight: f64,
    /// Region used for the search cost.
    pub region: String,
    /// Per-transition workflow prices by region.
    pub transition_prices: RegionMap<f64>,
    /// Configurations the run exercised, including ones excluded before
    /// selection. Defaults to the number of summaries.
    pub tested_configurations: Option<usize>,
}

impl Default for SelectionRequest {
    fn default() -> Self {
        Self {
            strategy: OptimizationStrategy::default(),
            balanced_weight: DEFAULT_BALANCED_WEIGHT,
            region: DEFAULT_REGION.to_string(),
            transition_prices: default_transition_prices(),
            tested_configurations: None,
        }
    }
}

impl SelectionRequest {
    /// Request with a strategy and defaults for everything else.
    pub fn new(strategy: OptimizationStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// Set the balanced weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.balanced_weight = weight;
        self
    }

    /// Set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the transition price map.
    pub fn with_transition_prices(mut self, prices: RegionMap<f64>) -> Self {
        self.transition_prices = prices;
        self
    }

    /// Set how many configurations the run exercised.
    pub fn with_tested_configurations(mut self, count: usize) -> Self {
        self.tested_configurations = Some(count);
        self
    }
}

/// Validate a balanced weight, clamping finite values into `[0, 1]`.
pub fn normalize_weight(weight: f64) -> Result<f64> {
    if !weight.is_finite() {
        return Err(Error::invalid_input(format!(
            "balanced weight must be a finite number, got {}",
            weight
        )));
    }
    let clamped = weight.clamp(0.0, 1.0);
    if clamped != weight {
        warn!(
            requested = weight,
            applied = clamped,
            "Balanced weight out of range, clamping"
        );
    }
    Ok(clamped)
}

fn validate(summaries: &[ConfigurationSummary]) -> Result<()> {
    if summaries.is_empty() {
        return Err(Error::invalid_input("no configurations to choose from"));
    }
    if let Some(bad) = summaries.iter().find(|s| !s.is_finite()) {
        return Err(Error::invalid_input(format!(
            "configuration {} has non-finite statistics",
            bad.configuration_key
        )));
    }
    Ok(())
}

/// Index of the smallest element; the first one wins ties.
fn first_min_by<T, F>(items: &[T], mut compare: F) -> usize
where
    F: FnMut(&T, &T) -> Ordering,
{
    let mut best = 0;
    for (idx, item) in items.iter().enumerate().skip(1) {
        if compare(item, &items[best]) == Ordering::Less {
            best = idx;
        }
    }
    best
}

fn by_cost(a: &ConfigurationSummary, b: &ConfigurationSummary) -> Ordering {
    a.unit_price
        .total_cmp(&b.unit_price)
        .then(a.average_duration_ms.total_cmp(&b.average_duration_ms))
}

fn by_speed(a: &ConfigurationSummary, b: &ConfigurationSummary) -> Ordering {
    a.average_duration_ms
        .total_cmp(&b.average_duration_ms)
        .then(a.unit_price.total_cmp(&b.unit_price))
}

/// Normalizer for one balanced term; `None` means the term contributes zero.
fn term_scale(values: impl Iterator<Item = f64> + Clone) -> Option<f64> {
    let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
    let min = values.fold(f64::INFINITY, f64::min);
    if max == min || max == 0.0 {
        None
    } else {
        Some(max)
    }
}

/// Balanced scores for every candidate, in input order.
///
/// `weight` must already be in `[0, 1]`.
pub fn balanced_scores(summaries: &[ConfigurationSummary], weight: f64) -> Vec<f64> {
    let price_scale = term_scale(summaries.iter().map(|s| s.unit_price));
    let duration_scale = term_scale(summaries.iter().map(|s| s.average_duration_ms));

    summaries
        .iter()
        .map(|s| {
            let price = price_scale.map_or(0.0, |max| s.unit_price / max);
            let duration = duration_scale.map_or(0.0, |max| s.average_duration_ms / max);
            weight * price + (1.0 - weight) * duration
        })
        .collect()
}

/// Pick one summary.
///
/// Fails with [`Error::InvalidInput`] for an empty list, non-finite statistics
/// or a non-finite weight. The weight is ignored unless the strategy is
/// balanced.
pub fn select(
    summaries: &[ConfigurationSummary],
    strategy: OptimizationStrategy,
    weight: f64,
) -> Result<&ConfigurationSummary> {
    validate(summaries)?;

    let idx = match strategy {
        OptimizationStrategy::Cost => first_min_by(summaries, by_cost),
        OptimizationStrategy::Speed => first_min_by(summaries, by_speed),
        OptimizationStrategy::Balanced => {
            let weight = normalize_weight(weight)?;
            let scores = balanced_scores(summaries, weight);
            first_min_by(&scores, |a, b| a.total_cmp(b))
        }
    };

    Ok(&summaries[idx])
}

/// Pick one summary and price the tuning run.
pub fn optimize(
    summaries: &[ConfigurationSummary],
    request: &SelectionRequest,
) -> Result<OptimizationResult> {
    let balanced_weight = match request.strategy {
        OptimizationStrategy::Balanced => Some(normalize_weight(request.balanced_weight)?),
        _ => None,
    };

    let chosen = select(
        summaries,
        request.strategy,
        balanced_weight.unwrap_or(DEFAULT_BALANCED_WEIGHT),
    )?;
    let tested = request
        .tested_configurations
        .map_or(summaries.len(), |count| count.max(summaries.len()));
    let search_cost = search_cost(&request.transition_prices, &request.region, tested);
    let total_lambda_cost: f64 = summaries.iter().map(|s| s.total_cost).sum();

    info!(
        strategy = %request.strategy,
        configuration = %chosen.configuration_key,
        unit_price = chosen.unit_price,
        average_duration_ms = chosen.average_duration_ms,
        search_cost,
        "Selected configuration"
    );

    Ok(OptimizationResult {
        chosen_configuration: ChosenConfiguration::from(chosen),
        search_cost,
        total_lambda_cost,
        strategy: request.strategy.to_string(),
        balanced_weight,
    })
}
