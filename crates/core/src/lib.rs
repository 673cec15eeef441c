// Copyright 2025 Power Tuner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for the power tuner analytics engine.
//!
//! This crate holds the data model shared by the extractor, aggregator and
//! selector:
//!
//! - [`record`] - per-invocation [`MetricRecord`] evidence and its merge rules
//! - [`summary`] - per-configuration statistics and the final recommendation
//! - [`types`] - configuration keys and architectures
//! - [`error`] - the error taxonomy
//!
//! Nothing here performs I/O or holds process-wide state.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod error;
pub mod record;
pub mod summary;
pub mod types;

pub use error::{Error, Result};
pub use record::{MetricRecord, MetricRecordBuilder, RequestId};
pub use summary::{ChosenConfiguration, ConfigurationSummary, OptimizationResult};
pub use types::{Architecture, ConfigurationKey};
