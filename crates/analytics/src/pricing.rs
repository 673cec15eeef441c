// Copyright 2025 Power Tuner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pricing tables and the billing cost model.
//!
//! # Features
//!
//! - Region-keyed price maps with a mandatory `default` fallback
//! - Per-architecture pricing tables
//! - Billed-second cost calculation with per-request charges
//! - Search (workflow) cost estimation
//!
//! # Example
//!
//! ```
//! use power_tuner_analytics::pricing::{CostModel, PricingTable};
//! use power_tuner_core::{Architecture, ConfigurationKey};
//!
//! let table = PricingTable::default();
//! let lookup = table.lookup("eu-west-1", Architecture::X86_64).unwrap();
//! assert!(lookup.fell_back);
//!
//! let model = CostModel::new(lookup.quote, 128).unwrap();
//! let cost = model.cost(ConfigurationKey::new(256), 1_200.0);
//! assert!(cost > 0.0);
//! ```

use power_tuner_core::{Architecture, ConfigurationKey, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Name of the fallback entry every region map must carry.
pub const DEFAULT_REGION: &str = "default";

/// Length of one billing unit in milliseconds.
pub const BILLING_UNIT_MS: f64 = 1_000.0;

/// Memory block the per-unit-time price refers to, in MB.
pub const DEFAULT_MIN_BILLING_UNIT_MB: u32 = 128;

/// Default price of one state transition of the tuning workflow.
pub const DEFAULT_TRANSITION_PRICE: f64 = 0.000025;

/// Fixed number of workflow transitions on top of one per candidate.
const BASE_TRANSITIONS: usize = 6;

/// Base price of one configuration unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Price of one billed second at the minimum billing unit.
    pub per_unit_time_price: f64,
    /// Flat price charged once per invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_request_price: Option<f64>,
}

impl PriceQuote {
    /// Quote with a time component only.
    pub const fn per_unit_time(price: f64) -> Self {
        Self {
            per_unit_time_price: price,
            per_request_price: None,
        }
    }

    /// Add a flat per-request component.
    pub fn with_request_price(mut self, price: f64) -> Self {
        self.per_request_price = Some(price);
        self
    }

    fn validate(&self) -> Result<()> {
        let request_ok = self
            .per_request_price
            .map_or(true, |p| p.is_finite() && p >= 0.0);
        if !(self.per_unit_time_price.is_finite() && self.per_unit_time_price >= 0.0) || !request_ok {
            return Err(Error::invalid_input(format!(
                "prices must be finite and non-negative: {:?}",
                self
            )));
        }
        Ok(())
    }
}

/// Outcome of a region lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    /// The value found.
    pub value: T,
    /// Region that was asked for.
    pub requested_region: String,
    /// Whether the `default` entry was used instead.
    pub fell_back: bool,
}

/// Region-keyed values with a mandatory `default` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, T>", into = "BTreeMap<String, T>")]
#[serde(bound(
    serialize = "T: Clone + Serialize",
    deserialize = "T: Clone + Deserialize<'de>"
))]
pub struct RegionMap<T> {
    entries: BTreeMap<String, T>,
}

impl<T: Clone> RegionMap<T> {
    /// Create a map, rejecting one without a `default` entry.
    pub fn new(entries: BTreeMap<String, T>) -> Result<Self> {
        if !entries.contains_key(DEFAULT_REGION) {
            return Err(Error::invalid_input(format!(
                "region map has no '{}' entry",
                DEFAULT_REGION
            )));
        }
        Ok(Self { entries })
    }

    /// Map holding only a default value.
    pub fn with_default(value: T) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(DEFAULT_REGION.to_string(), value);
        Self { entries }
    }

    /// Add or replace a region entry.
    pub fn insert(&mut self, region: impl Into<String>, value: T) {
        self.entries.insert(region.into(), value);
    }

    /// Resolve a region, falling back to `default` for unknown regions.
    pub fn resolve(&self, region: &str) -> Resolved<T> {
        if let Some(value) = self.entries.get(region) {
            return Resolved {
                value: value.clone(),
                requested_region: region.to_string(),
                fell_back: false,
            };
        }

        // Invariant: `default` is present, checked at construction.
        let value = self.entries[DEFAULT_REGION].clone();
        if region != DEFAULT_REGION {
            warn!(region = %region, "Region not found in price map, using default");
        }
        Resolved {
            value,
            requested_region: region.to_string(),
            fell_back: region != DEFAULT_REGION,
        }
    }

    /// Regions with an explicit entry, `default` included.
    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Every stored value.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }
}

impl<T: Clone> TryFrom<BTreeMap<String, T>> for RegionMap<T> {
    type Error = Error;

    fn try_from(entries: BTreeMap<String, T>) -> Result<Self> {
        Self::new(entries)
    }
}

impl<T> From<RegionMap<T>> for BTreeMap<String, T> {
    fn from(map: RegionMap<T>) -> Self {
        map.entries
    }
}

/// Result of resolving a price for a region and architecture.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceLookup {
    /// Resolved price.
    pub quote: PriceQuote,
    /// Architecture priced.
    pub architecture: Architecture,
    /// Region asked for.
    pub requested_region: String,
    /// Whether the `default` entry was used.
    pub fell_back: bool,
}

/// Price lists per architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PricingTable {
    architectures: BTreeMap<Architecture, RegionMap<PriceQuote>>,
}

impl Default for PricingTable {
    fn default() -> Self {
        // Per billed second at 128 MB, i.e. the per-millisecond list prices * 1000.
        const REQUEST_PRICE: f64 = 0.20 / 1_000_000.0;
        let x86 = |price: f64| PriceQuote::per_unit_time(price).with_request_price(REQUEST_PRICE);

        let mut x86_64 = RegionMap::with_default(x86(2.1e-6));
        x86_64.insert("ap-east-1", x86(2.9e-6));
        x86_64.insert("af-south-1", x86(2.8e-6));
        x86_64.insert("me-south-1", x86(2.6e-6));
        x86_64.insert("eu-south-1", x86(2.4e-6));
        x86_64.insert("ap-northeast-3", x86(2.7e-6));
        x86_64.insert("cn-north-1", x86(1.42e-5));
        x86_64.insert("cn-northwest-1", x86(1.42e-5));

        let arm64 = RegionMap::with_default(
            PriceQuote::per_unit_time(1.7e-6).with_request_price(REQUEST_PRICE),
        );

        let mut architectures = BTreeMap::new();
        architectures.insert(Architecture::X86_64, x86_64);
        architectures.insert(Architecture::Arm64, arm64);
        Self { architectures }
    }
}

impl PricingTable {
    /// Create a table from per-architecture region maps.
    pub fn new(architectures: BTreeMap<Architecture, RegionMap<PriceQuote>>) -> Result<Self> {
        let table = Self { architectures };
        table.validate()?;
        Ok(table)
    }

    /// Parse a table from JSON and validate every price.
    pub fn from_json(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)
            .map_err(|e| Error::invalid_input(format!("invalid pricing table: {}", e)))?;
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        for map in self.architectures.values() {
            for quote in map.values() {
                quote.validate()?;
            }
        }
        Ok(())
    }

    /// Resolve the price for a region and architecture.
    ///
    /// Unknown regions fall back to the architecture's `default` entry.
    /// An architecture absent from the table is rejected.
    pub fn lookup(&self, region: &str, architecture: Architecture) -> Result<PriceLookup> {
        let map = self.architectures.get(&architecture).ok_or_else(|| {
            let known: Vec<String> = self.architectures().map(|a| a.to_string()).collect();
            Error::invalid_input(format!(
                "no pricing for architecture {} (table has: {})",
                architecture,
                known.join(", ")
            ))
        })?;
        let resolved = map.resolve(region);

        Ok(PriceLookup {
            quote: resolved.value,
            architecture,
            requested_region: resolved.requested_region,
            fell_back: resolved.fell_back,
        })
    }

    /// Architectures the table can price.
    pub fn architectures(&self) -> impl Iterator<Item = Architecture> + '_ {
        self.architectures.keys().copied()
    }

    /// Regions with an explicit price for an architecture, `default` included.
    pub fn regions(&self, architecture: Architecture) -> Vec<&str> {
        self.architectures
            .get(&architecture)
            .map(|map| map.regions().collect())
            .unwrap_or_default()
    }
}

/// Number of billing units for a duration, rounded up.
pub fn billed_units(duration_ms: f64) -> f64 {
    (duration_ms / BILLING_UNIT_MS).ceil().max(0.0)
}

/// Cost of one invocation.
///
/// `per_unit_time_price * ceil(duration / 1s) * (configuration_value / min_billing_unit)`,
/// plus the per-request price when the quote has one.
pub fn compute_cost(
    base: &PriceQuote,
    min_billing_unit: u32,
    configuration_value: f64,
    duration_ms: f64,
) -> f64 {
    let time_cost = base.per_unit_time_price
        * billed_units(duration_ms)
        * (configuration_value / f64::from(min_billing_unit));
    time_cost + base.per_request_price.unwrap_or(0.0)
}

/// Cost model bound to one base price and billing unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    base: PriceQuote,
    min_billing_unit_mb: u32,
}

impl CostModel {
    /// Create a cost model.
    pub fn new(base: PriceQuote, min_billing_unit_mb: u32) -> Result<Self> {
        if min_billing_unit_mb == 0 {
            return Err(Error::invalid_input("minimum billing unit must be positive"));
        }
        base.validate()?;
        Ok(Self {
            base,
            min_billing_unit_mb,
        })
    }

    /// Base price.
    pub fn base(&self) -> &PriceQuote {
        &self.base
    }

    /// Minimum billing unit in MB.
    pub fn min_billing_unit_mb(&self) -> u32 {
        self.min_billing_unit_mb
    }

    /// Cost of one invocation of `key` lasting `duration_ms`.
    pub fn cost(&self, key: ConfigurationKey, duration_ms: f64) -> f64 {
        compute_cost(&self.base, self.min_billing_unit_mb, key.value(), duration_ms)
    }
}

/// Round to five decimals, the precision search costs are reported at.
fn round5(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}

/// Cost of running the tuning workflow over `candidate_count` configurations.
pub fn search_cost(transition_prices: &RegionMap<f64>, region: &str, candidate_count: usize) -> f64 {
    let price = transition_prices.resolve(region).value;
    round5(price * (BASE_TRANSITIONS + candidate_count) as f64)
}

/// Default transition price map.
pub fn default_transition_prices() -> RegionMap<f64> {
    RegionMap::with_default(DEFAULT_TRANSITION_PRICE)
}
