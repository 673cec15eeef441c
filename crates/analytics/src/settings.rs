// Copyright 2025 Power Tuner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tuning settings.
//!
//! [`TunerSettings`] carries every knob of an analysis run. It is plain data:
//! loading from files and the environment happens in the CLI, which layers
//! sources on top of [`TunerSettings::default`].
//!
//! # Example
//!
//! ```
//! use power_tuner_analytics::settings::{SettingKey, TunerSettings};
//!
//! let settings = TunerSettings::default();
//! assert_eq!(settings.discard_fraction, 0.2);
//! assert_eq!(SettingKey::Strategy.env_var(), "POWER_TUNER_STRATEGY");
//! ```

use crate::aggregate::{AggregationOptions, DEFAULT_DISCARD_FRACTION};
use crate::pricing::{
    default_transition_prices, CostModel, PriceLookup, PricingTable, RegionMap,
    DEFAULT_MIN_BILLING_UNIT_MB, DEFAULT_REGION,
};
use crate::selector::{
    normalize_weight, OptimizationStrategy, SelectionRequest, DEFAULT_BALANCED_WEIGHT,
};
use power_tuner_core::{Architecture, ConfigurationKey, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix of every environment variable read by the loader.
pub const ENV_PREFIX: &str = "POWER_TUNER";

/// Smallest memory size offered by the platform, in MB.
pub const MIN_POWER_VALUE: u32 = 128;
/// Largest memory size offered by the platform, in MB.
pub const MAX_POWER_VALUE: u32 = 3008;
/// Step between consecutive memory sizes, in MB.
pub const POWER_VALUE_STEP: u32 = 64;

/// Every memory size the platform accepts, smallest first.
pub fn all_power_values() -> Vec<ConfigurationKey> {
    (MIN_POWER_VALUE..=MAX_POWER_VALUE)
        .step_by(POWER_VALUE_STEP as usize)
        .map(ConfigurationKey::new)
        .collect()
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(Error::invalid_input(format!("unknown log format: {}", other))),
        }
    }
}

/// Settings of one tuning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerSettings {
    /// Ranking strategy.
    pub strategy: OptimizationStrategy,
    /// Price weight for the balanced strategy, in `[0, 1]`.
    pub balanced_weight: f64,
    /// Share of samples discarded from each end, in `[0, 0.4]`.
    pub discard_fraction: f64,
    /// Memory size the base price refers to, in MB.
    pub min_billing_unit_mb: u32,
    /// Region used for price lookups.
    pub region: String,
    /// Architecture used for price lookups.
    pub architecture: Architecture,
    /// Configurations expected in a batch.
    pub candidates: Vec<ConfigurationKey>,
    /// Default log filter.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Base URL of the results visualization page.
    pub visualization_url: Option<String>,
    /// Per-transition workflow prices by region.
    pub transition_prices: RegionMap<f64>,
}

impl Default for TunerSettings {
    fn default() -> Self {
        Self {
            strategy: OptimizationStrategy::default(),
            balanced_weight: DEFAULT_BALANCED_WEIGHT,
            discard_fraction: DEFAULT_DISCARD_FRACTION,
            min_billing_unit_mb: DEFAULT_MIN_BILLING_UNIT_MB,
            region: DEFAULT_REGION.to_string(),
            architecture: Architecture::default(),
            candidates: all_power_values(),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            visualization_url: None,
            transition_prices: default_transition_prices(),
        }
    }
}

impl TunerSettings {
    /// Check every value that would otherwise fail later.
    ///
    /// The balanced weight is only checked when the strategy is balanced.
    pub fn validate(&self) -> Result<()> {
        if self.strategy == OptimizationStrategy::Balanced {
            normalize_weight(self.balanced_weight)?;
        }
        AggregationOptions::new(self.discard_fraction)?;
        if self.min_billing_unit_mb == 0 {
            return Err(Error::invalid_input("min_billing_unit_mb must be positive"));
        }
        if self.region.trim().is_empty() {
            return Err(Error::invalid_input("region must not be empty"));
        }
        Ok(())
    }

    /// Aggregation options derived from these settings.
    pub fn aggregation_options(&self) -> Result<AggregationOptions> {
        AggregationOptions::new(self.discard_fraction)
    }

    /// Selection request derived from these settings.
    pub fn selection_request(&self) -> SelectionRequest {
        SelectionRequest {
            strategy: self.strategy,
            balanced_weight: self.balanced_weight,
            region: self.region.clone(),
            transition_prices: self.transition_prices.clone(),
            tested_configurations: None,
        }
    }

    /// Resolve the price for the configured region and architecture.
    pub fn cost_model(&self, pricing: &PricingTable) -> Result<(CostModel, PriceLookup)> {
        let lookup = pricing.lookup(&self.region, self.architecture)?;
        let model = CostModel::new(lookup.quote, self.min_billing_unit_mb)?;
        Ok((model, lookup))
    }
}

/// Keys understood by the settings loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// Ranking strategy
    Strategy,
    /// Balanced price weight
    BalancedWeight,
    /// Trimmed mean discard fraction
    DiscardFraction,
    /// Minimum billing unit
    MinBillingUnitMb,
    /// Pricing region
    Region,
    /// Pricing architecture
    Architecture,
    /// Candidate configurations
    Candidates,
    /// Log filter
    LogLevel,
    /// Log format
    LogFormat,
    /// Visualization base URL
    VisualizationUrl,
    /// Transition prices
    TransitionPrices,
}

impl SettingKey {
    /// Every key, in display order.
    pub const ALL: [SettingKey; 11] = [
        SettingKey::Strategy,
        SettingKey::BalancedWeight,
        SettingKey::DiscardFraction,
        SettingKey::MinBillingUnitMb,
        SettingKey::Region,
        SettingKey::Architecture,
        SettingKey::Candidates,
        SettingKey::LogLevel,
        SettingKey::LogFormat,
        SettingKey::VisualizationUrl,
        SettingKey::TransitionPrices,
    ];

    /// Group the key belongs to.
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::Strategy | Self::BalancedWeight => "selection",
            Self::DiscardFraction => "aggregation",
            Self::MinBillingUnitMb | Self::Region | Self::Architecture | Self::TransitionPrices => {
                "pricing"
            }
            Self::Candidates => "candidates",
            Self::LogLevel | Self::LogFormat => "observability",
            Self::VisualizationUrl => "output",
        }
    }

    /// Field name in settings files.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Strategy => "strategy",
            Self::BalancedWeight => "balanced_weight",
            Self::DiscardFraction => "discard_fraction",
            Self::MinBillingUnitMb => "min_billing_unit_mb",
            Self::Region => "region",
            Self::Architecture => "architecture",
            Self::Candidates => "candidates",
            Self::LogLevel => "log_level",
            Self::LogFormat => "log_format",
            Self::VisualizationUrl => "visualization_url",
            Self::TransitionPrices => "transition_prices",
        }
    }

    /// Environment variable overriding the key.
    pub fn env_var(&self) -> String {
        format!("{}_{}", ENV_PREFIX, self.key().to_ascii_uppercase())
    }

    /// Whether the environment value is a comma-separated list.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::Candidates)
    }

    /// Current value of the key in `settings`, as JSON.
    pub fn value_in(&self, settings: &TunerSettings) -> serde_json::Value {
        serde_json::to_value(settings)
            .ok()
            .and_then(|mut v| v.get_mut(self.key()).map(serde_json::Value::take))
            .unwrap_or(serde_json::Value::Null)
    }

    /// Default value of the key, as JSON.
    pub fn default_value(&self) -> serde_json::Value {
        self.value_in(&TunerSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_power_values() {
        let values = all_power_values();
        assert_eq!(values.len(), 46);
        assert_eq!(values.first(), Some(&ConfigurationKey::new(128)));
        assert_eq!(values.last(), Some(&ConfigurationKey::new(3008)));
        assert_eq!(values[1], ConfigurationKey::new(192));
    }

    #[test]
    fn test_default_settings() {
        let settings = TunerSettings::default();
        assert_eq!(settings.strategy, OptimizationStrategy::Cost);
        assert_eq!(settings.balanced_weight, 0.5);
        assert_eq!(settings.min_billing_unit_mb, 128);
        assert_eq!(settings.region, "default");
        assert_eq!(settings.architecture, Architecture::X86_64);
        assert_eq!(settings.log_format, LogFormat::Text);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: TunerSettings =
            serde_json::from_value(json!({"strategy": "speed", "candidates": [256, 512]})).unwrap();
        assert_eq!(settings.strategy, OptimizationStrategy::Speed);
        assert_eq!(
            settings.candidates,
            vec![ConfigurationKey::new(256), ConfigurationKey::new(512)]
        );
        assert_eq!(settings.discard_fraction, 0.2);
    }

    #[test]
    fn test_transition_prices_require_default() {
        let result: std::result::Result<TunerSettings, _> =
            serde_json::from_value(json!({"transition_prices": {"eu-west-1": 0.00003}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_nan() {
        let settings = TunerSettings {
            strategy: OptimizationStrategy::Balanced,
            balanced_weight: f64::NAN,
            ..TunerSettings::default()
        };
        assert!(settings.validate().is_err());

        let settings = TunerSettings {
            discard_fraction: f64::NAN,
            ..TunerSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_weight_ignored_outside_balanced() {
        for strategy in [OptimizationStrategy::Cost, OptimizationStrategy::Speed] {
            let settings = TunerSettings {
                strategy,
                balanced_weight: f64::NAN,
                ..TunerSettings::default()
            };
            assert!(settings.validate().is_ok());
        }
    }

    #[test]
    fn test_cost_model_from_settings() {
        let settings = TunerSettings {
            region: "ap-east-1".to_string(),
            ..TunerSettings::default()
        };
        let (model, lookup) = settings.cost_model(&PricingTable::default()).unwrap();
        assert!(!lookup.fell_back);
        assert_eq!(model.base().per_unit_time_price, 2.9e-6);
    }

    #[test]
    fn test_setting_keys() {
        assert_eq!(SettingKey::DiscardFraction.env_var(), "POWER_TUNER_DISCARD_FRACTION");
        assert_eq!(SettingKey::Region.namespace(), "pricing");
        assert_eq!(SettingKey::Strategy.default_value(), json!("cost"));
        assert_eq!(SettingKey::VisualizationUrl.default_value(), json!(null));
        assert!(SettingKey::Candidates.is_list());
        for key in SettingKey::ALL {
            if key != SettingKey::VisualizationUrl {
                assert_ne!(key.default_value(), serde_json::Value::Null, "{:?}", key);
            }
        }
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
