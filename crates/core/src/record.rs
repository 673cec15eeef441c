// Copyright 2025 Power Tuner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-invocation execution evidence.
//!
//! A [`MetricRecord`] is what the report extractor produces for one
//! invocation of the benchmarked function. Every measured field is an
//! `Option`: an absent value means the report did not carry it, which is
//! different from a measured zero.
//!
//! Records for the same request can arrive in pieces (an error line before
//! the `REPORT` line, or a structured insights line after it). They are
//! combined with [`MetricRecord::merge`], which only ever adds information.

use crate::error::{Error, Result};
use crate::types::ConfigurationKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Correlation identifier of one invocation.
pub type RequestId = String;

/// One execution's evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Configuration that produced this invocation.
    pub configuration_key: ConfigurationKey,
    /// Invocation correlation id.
    pub request_id: RequestId,
    /// Billed duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Cold-start initialization duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_duration_ms: Option<f64>,
    /// Configured memory limit in MB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_mb: Option<u32>,
    /// Peak memory used in MB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_used_mb: Option<u32>,
    /// Whether the invocation signaled a functional error.
    #[serde(default)]
    pub is_error: bool,
    /// Error text captured from the log, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Cold start flag from structured reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cold_start: Option<bool>,
    /// Extended telemetry, carried through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub telemetry: BTreeMap<String, serde_json::Value>,
}

impl MetricRecord {
    /// Create a new builder.
    pub fn builder() -> MetricRecordBuilder {
        MetricRecordBuilder::default()
    }

    /// Create a record that only carries the error flag.
    ///
    /// Used when an error line is seen before the request's report.
    pub fn error_only(
        configuration_key: ConfigurationKey,
        request_id: impl Into<RequestId>,
        message: Option<String>,
    ) -> Self {
        Self {
            configuration_key,
            request_id: request_id.into(),
            duration_ms: None,
            init_duration_ms: None,
            memory_limit_mb: None,
            memory_used_mb: None,
            is_error: true,
            error_message: message,
            cold_start: None,
            telemetry: BTreeMap::new(),
        }
    }

    /// Fold another piece of evidence for the same request into this one.
    ///
    /// Present values in `other` replace the current ones; absent values never
    /// clear a field. The error flag is sticky. The configuration key of the
    /// first record wins.
    pub fn merge(&mut self, other: MetricRecord) -> Result<()> {
        if other.request_id != self.request_id {
            return Err(Error::invalid_input(format!(
                "cannot merge request {} into request {}",
                other.request_id, self.request_id
            )));
        }

        self.duration_ms = other.duration_ms.or(self.duration_ms);
        self.init_duration_ms = other.init_duration_ms.or(self.init_duration_ms);
        self.memory_limit_mb = other.memory_limit_mb.or(self.memory_limit_mb);
        self.memory_used_mb = other.memory_used_mb.or(self.memory_used_mb);
        self.cold_start = other.cold_start.or(self.cold_start);
        self.is_error |= other.is_error;
        if other.error_message.is_some() {
            self.error_message = other.error_message;
        }
        self.telemetry.extend(other.telemetry);
        Ok(())
    }

    /// Record a functional error as a typed error value.
    pub fn functional_error(&self) -> Option<Error> {
        self.is_error.then(|| Error::FunctionalInvocation {
            request_id: self.request_id.clone(),
            message: self
                .error_message
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}

/// Builder for [`MetricRecord`] instances.
#[derive(Default)]
pub struct MetricRecordBuilder {
    configuration_key: Option<ConfigurationKey>,
    request_id: Option<RequestId>,
    duration_ms: Option<u64>,
    init_duration_ms: Option<f64>,
    memory_limit_mb: Option<u32>,
    memory_used_mb: Option<u32>,
    is_error: bool,
    error_message: Option<String>,
    cold_start: Option<bool>,
    telemetry: BTreeMap<String, serde_json::Value>,
}

impl MetricRecordBuilder {
    /// Set the configuration key (required).
    pub fn configuration_key(mut self, key: ConfigurationKey) -> Self {
        self.configuration_key = Some(key);
        self
    }

    /// Set the request id (required).
    pub fn request_id(mut self, id: impl Into<RequestId>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Set billed duration in milliseconds.
    pub fn duration_ms(mut self, duration: u64) -> Self {
        self.duration_ms = Some(duration);
        self
    }

    /// Set an optional billed duration.
    pub fn maybe_duration_ms(mut self, duration: Option<u64>) -> Self {
        self.duration_ms = duration;
        self
    }

    /// Set an optional init duration.
    pub fn init_duration_ms(mut self, duration: Option<f64>) -> Self {
        self.init_duration_ms = duration;
        self
    }

    /// Set an optional memory limit.
    pub fn memory_limit_mb(mut self, memory: Option<u32>) -> Self {
        self.memory_limit_mb = memory;
        self
    }

    /// Set an optional memory usage.
    pub fn memory_used_mb(mut self, memory: Option<u32>) -> Self {
        self.memory_used_mb = memory;
        self
    }

    /// Flag the invocation as errored.
    pub fn error(mut self, message: Option<String>) -> Self {
        self.is_error = true;
        self.error_message = message;
        self
    }

    /// Set the cold start flag.
    pub fn cold_start(mut self, cold_start: Option<bool>) -> Self {
        self.cold_start = cold_start;
        self
    }

    /// Add a pass-through telemetry value.
    pub fn telemetry(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.telemetry.insert(key.into(), value);
        self
    }

    /// Build the [`MetricRecord`]. Returns `Err` if required fields are missing.
    pub fn build(self) -> Result<MetricRecord> {
        let configuration_key = self
            .configuration_key
            .ok_or_else(|| Error::invalid_input("configuration_key is required"))?;
        let request_id = self
            .request_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::invalid_input("request_id is required"))?;

        Ok(MetricRecord {
            configuration_key,
            request_id,
            duration_ms: self.duration_ms,
            init_duration_ms: self.init_duration_ms,
            memory_limit_mb: self.memory_limit_mb,
            memory_used_mb: self.memory_used_mb,
            is_error: self.is_error,
            error_message: self.error_message,
            cold_start: self.cold_start,
            telemetry: self.telemetry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(request_id: &str) -> MetricRecord {
        MetricRecord::builder()
            .configuration_key(ConfigurationKey::new(512))
            .request_id(request_id)
            .duration_ms(120)
            .memory_limit_mb(Some(512))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_configuration_key() {
        let result = MetricRecord::builder().request_id("req-1").build();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("configuration_key"));
    }

    #[test]
    fn test_builder_requires_request_id() {
        let result = MetricRecord::builder()
            .configuration_key(ConfigurationKey::new(128))
            .build();
        assert!(result.unwrap_err().to_string().contains("request_id"));

        let result = MetricRecord::builder()
            .configuration_key(ConfigurationKey::new(128))
            .request_id("")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_absent_fields_stay_absent() {
        let record = make_record("req-1");
        assert_eq!(record.duration_ms, Some(120));
        assert_eq!(record.memory_used_mb, None);
        assert_eq!(record.init_duration_ms, None);
        assert!(!record.is_error);
    }

    #[test]
    fn test_merge_error_only_then_report() {
        let mut record = MetricRecord::error_only(
            ConfigurationKey::new(512),
            "req-1",
            Some("Task timed out".to_string()),
        );
        record.merge(make_record("req-1")).unwrap();

        assert!(record.is_error);
        assert_eq!(record.duration_ms, Some(120));
        assert_eq!(record.memory_limit_mb, Some(512));
        assert_eq!(record.error_message.as_deref(), Some("Task timed out"));
    }

    #[test]
    fn test_merge_never_overwrites_with_absent() {
        let mut record = make_record("req-1");
        let partial = MetricRecord::builder()
            .configuration_key(ConfigurationKey::new(512))
            .request_id("req-1")
            .memory_used_mb(Some(77))
            .build()
            .unwrap();
        record.merge(partial).unwrap();

        assert_eq!(record.duration_ms, Some(120));
        assert_eq!(record.memory_used_mb, Some(77));
    }

    #[test]
    fn test_merge_keeps_first_configuration_key() {
        let mut record = make_record("req-1");
        let other = MetricRecord::builder()
            .configuration_key(ConfigurationKey::new(1024))
            .request_id("req-1")
            .build()
            .unwrap();
        record.merge(other).unwrap();
        assert_eq!(record.configuration_key, ConfigurationKey::new(512));
    }

    #[test]
    fn test_merge_rejects_different_request() {
        let mut record = make_record("req-1");
        assert!(record.merge(make_record("req-2")).is_err());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut once = make_record("req-1");
        once.merge(make_record("req-1")).unwrap();
        let mut twice = once.clone();
        twice.merge(make_record("req-1")).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_functional_error_surface() {
        assert!(make_record("req-1").functional_error().is_none());

        let errored = MetricRecord::error_only(ConfigurationKey::new(128), "req-9", None);
        match errored.functional_error() {
            Some(Error::FunctionalInvocation { request_id, .. }) => assert_eq!(request_id, "req-9"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_serialization_skips_absent_fields() {
        let json = serde_json::to_value(make_record("req-1")).unwrap();
        assert!(json.get("memory_used_mb").is_none());
        assert_eq!(json["duration_ms"], 120);
        let back: MetricRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, make_record("req-1"));
    }
}
