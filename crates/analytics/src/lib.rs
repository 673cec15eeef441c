// Copyright 2025 Power Tuner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Analytics engine for power tuning.
//!
//! Turns raw invocation reports into a cost-aware configuration choice:
//!
//! 1. [`report`] extracts [`MetricRecord`](power_tuner_core::MetricRecord)s
//!    from text and JSON execution reports
//! 2. [`aggregate`] groups them per configuration and computes summaries
//! 3. [`pricing`] prices invocations and the tuning run itself
//! 4. [`selector`] picks a configuration under the cost, speed or balanced strategy
//!
//! [`pipeline::analyze`] chains the four stages. Everything here is pure
//! computation over caller-supplied data; file and network access live in the
//! output crate and the CLI.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod pipeline;
pub mod pricing;
pub mod report;
pub mod selector;
pub mod settings;

pub use aggregate::{AggregationOptions, AggregationReport, Diagnostic, MetricAggregator};
pub use pipeline::{analyze, TuningOutcome};
pub use pricing::{CostModel, PriceLookup, PriceQuote, PricingTable, RegionMap};
pub use report::{ExtractionStats, ReportExtractor, TaggedReport};
pub use selector::{optimize, select, OptimizationStrategy, SelectionRequest};
pub use settings::{all_power_values, LogFormat, SettingKey, TunerSettings};
