// Copyright 2025 Power Tuner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Execution report extraction.
//!
//! Turns raw invocation logs into [`MetricRecord`]s. Three input shapes are
//! recognized:
//!
//! - plain-text `REPORT RequestId: ...` lines with tab-separated labeled fields
//! - structured insights lines (`{"request_id": ..., "billed_duration": ...}`)
//! - structured platform reports (`{"type": "platform.report", "record": {...}}`)
//!
//! Error lines (`Error`, `Exception`, `error`) carrying a `RequestId:` token are
//! folded into the record of the same request, creating an error-only record
//! when the report has not been seen yet.
//!
//! # Example
//!
//! ```
//! use power_tuner_analytics::report::{ReportExtractor, TaggedReport};
//! use power_tuner_core::ConfigurationKey;
//!
//! let mut extractor = ReportExtractor::new();
//! extractor.ingest(&TaggedReport::new(
//!     ConfigurationKey::new(512),
//!     "REPORT RequestId: 6f1c2b3a-0000-4000-8000-000000000001\tDuration: 101.52 ms\t\
//!      Billed Duration: 102 ms\tMemory Size: 512 MB\tMax Memory Used: 71 MB",
//! ));
//!
//! let (records, stats) = extractor.finish();
//! assert_eq!(records[0].duration_ms, Some(102));
//! assert_eq!(stats.reports_parsed, 1);
//! ```

use once_cell::sync::Lazy;
use power_tuner_core::{ConfigurationKey, Error, MetricRecord, RequestId, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

static REPORT_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^REPORT RequestId:\s+([A-Fa-f0-9-]+)").expect("REPORT_MARKER regex should compile")
});
static BILLED_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Billed Duration: (\d+) ms").expect("BILLED_DURATION regex should compile")
});
static INIT_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Init Duration: (\d+(?:\.\d+)?)").expect("INIT_DURATION regex should compile")
});
static MEMORY_SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Memory Size: (\d+) MB").expect("MEMORY_SIZE regex should compile")
});
static MEMORY_USED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Memory Used: (\d+) MB").expect("MEMORY_USED regex should compile")
});
static ERROR_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Error|Exception|error").expect("ERROR_MARKER regex should compile"));
static ERROR_MESSAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Error: (?P<upper>.*)|Exception: (?P<exception>.*)|error: (?P<lower>.*)")
        .expect("ERROR_MESSAGE regex should compile")
});
static ERROR_REQUEST_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"RequestId:\s+([A-Fa-f0-9-]+)").expect("ERROR_REQUEST_ID regex should compile")
});

/// Insights keys mapped onto [`MetricRecord`] fields; everything else is telemetry.
const INSIGHTS_CORE_KEYS: &[&str] = &[
    "request_id",
    "billed_duration",
    "init_duration",
    "total_memory",
    "used_memory_max",
    "cold_start",
];

/// One raw report stamped with the configuration that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedReport {
    /// Configuration the invocation ran under.
    #[serde(alias = "configuration", alias = "memory_size")]
    pub configuration_key: ConfigurationKey,
    /// Raw log text; may hold several lines.
    #[serde(alias = "message", alias = "log")]
    pub line: String,
    /// Function error reported by the invoker alongside the log tail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_error: Option<String>,
}

impl TaggedReport {
    /// Tag a raw report.
    pub fn new(configuration_key: ConfigurationKey, line: impl Into<String>) -> Self {
        Self {
            configuration_key,
            line: line.into(),
            function_error: None,
        }
    }

    /// Attach the invoker's function error.
    pub fn with_function_error(mut self, error: impl Into<String>) -> Self {
        self.function_error = Some(error.into());
        self
    }
}

/// Counters for one extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Non-empty lines looked at.
    pub lines_seen: u64,
    /// Text `REPORT` lines parsed.
    pub reports_parsed: u64,
    /// Structured JSON reports parsed.
    pub structured_reports: u64,
    /// Lines that flagged a request as errored.
    pub error_lines: u64,
    /// Lines matching no grammar.
    pub parse_failures: u64,
    /// Lines that looked like JSON but did not parse.
    pub malformed_json: u64,
}

impl ExtractionStats {
    /// Every line that could not be used.
    pub fn rejected(&self) -> u64 {
        self.parse_failures + self.malformed_json
    }
}

fn capture<'a>(regex: &Regex, text: &'a str) -> Option<&'a str> {
    regex
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn capture_u64(regex: &Regex, text: &str) -> Option<u64> {
    capture(regex, text).and_then(|v| v.parse().ok())
}

fn capture_u32(regex: &Regex, text: &str) -> Option<u32> {
    capture(regex, text).and_then(|v| v.parse().ok())
}

/// Text following `Error: `, `Exception: ` or `error: `, whichever comes first.
pub fn extract_error_message(line: &str) -> Option<String> {
    let captures = ERROR_MESSAGE.captures(line)?;
    ["upper", "exception", "lower"]
        .iter()
        .find_map(|name| captures.name(name))
        .map(|m| m.as_str().trim().to_string())
}

/// Whether a line signals a functional error.
pub fn is_error_line(line: &str) -> bool {
    ERROR_MARKER.is_match(line)
}

/// Parse a plain-text `REPORT` line.
///
/// Each labeled field is extracted independently; missing ones stay `None`.
pub fn parse_text_report(key: ConfigurationKey, line: &str) -> Result<MetricRecord> {
    let request_id = capture(&REPORT_MARKER, line)
        .ok_or_else(|| Error::parse("no REPORT RequestId marker"))?;

    MetricRecord::builder()
        .configuration_key(key)
        .request_id(request_id)
        .maybe_duration_ms(capture_u64(&BILLED_DURATION, line))
        .init_duration_ms(capture(&INIT_DURATION, line).and_then(|v| v.parse().ok()))
        .memory_limit_mb(capture_u32(&MEMORY_SIZE, line))
        .memory_used_mb(capture_u32(&MEMORY_USED, line))
        .build()
}

/// Parse an error line into an error-only record for its request.
pub fn parse_error_line(key: ConfigurationKey, line: &str) -> Result<MetricRecord> {
    if !is_error_line(line) {
        return Err(Error::parse("no error marker"));
    }
    let request_id = capture(&ERROR_REQUEST_ID, line)
        .ok_or_else(|| Error::parse("error line without RequestId"))?;
    Ok(MetricRecord::error_only(
        key,
        request_id,
        extract_error_message(line),
    ))
}

fn json_u64(value: Option<&Value>) -> Option<u64> {
    let value = value?;
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.ceil() as u64)
    })
}

fn json_u32(value: Option<&Value>) -> Option<u32> {
    json_u64(value).and_then(|v| u32::try_from(v).ok())
}

fn json_f64(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|f| f.is_finite())
}

fn json_bool(value: Option<&Value>) -> Option<bool> {
    let value = value?;
    value.as_bool().or_else(|| value.as_u64().map(|v| v != 0))
}

fn parse_insights(key: ConfigurationKey, json: &Value) -> Result<MetricRecord> {
    let request_id = json
        .get("request_id")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::parse("insights report without request_id"))?;

    let mut builder = MetricRecord::builder()
        .configuration_key(key)
        .request_id(request_id)
        .maybe_duration_ms(json_u64(json.get("billed_duration")))
        .init_duration_ms(json_f64(json.get("init_duration")))
        .memory_limit_mb(json_u32(json.get("total_memory")))
        .memory_used_mb(json_u32(json.get("used_memory_max")))
        .cold_start(json_bool(json.get("cold_start")));

    if let Some(object) = json.as_object() {
        for (name, value) in object {
            if !INSIGHTS_CORE_KEYS.contains(&name.as_str()) {
                builder = builder.telemetry(name.clone(), value.clone());
            }
        }
    }

    builder.build()
}

fn parse_platform_report(key: ConfigurationKey, json: &Value) -> Result<MetricRecord> {
    let record = json
        .get("record")
        .ok_or_else(|| Error::parse("platform.report without record"))?;
    let request_id = record
        .get("requestId")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::parse("platform.report without requestId"))?;
    let metrics = record.get("metrics");
    let metric = |name: &str| metrics.and_then(|m| m.get(name));

    let init_duration = json_f64(metric("initDurationMs"));
    let mut builder = MetricRecord::builder()
        .configuration_key(key)
        .request_id(request_id)
        .maybe_duration_ms(json_u64(metric("billedDurationMs")))
        .init_duration_ms(init_duration)
        .memory_limit_mb(json_u32(metric("memorySizeMB")))
        .memory_used_mb(json_u32(metric("maxMemoryUsedMB")))
        .cold_start(init_duration.map(|_| true));

    if let Some(duration) = metric("durationMs") {
        builder = builder.telemetry("duration", duration.clone());
    }

    match record.get("status").and_then(Value::as_str) {
        None | Some("success") => {}
        Some(status) => {
            let message = record
                .get("errorType")
                .and_then(Value::as_str)
                .unwrap_or(status)
                .to_string();
            builder = builder.error(Some(message));
        }
    }

    builder.build()
}

/// Parse one structured JSON report.
pub fn parse_structured_report(key: ConfigurationKey, json: &Value) -> Result<MetricRecord> {
    match json.get("type").and_then(Value::as_str) {
        Some("platform.report") => parse_platform_report(key, json),
        Some(other) if json.get("request_id").is_none() => Err(Error::parse(format!(
            "unsupported structured record type: {}",
            other
        ))),
        _ => parse_insights(key, json),
    }
}

/// Parse a single report line of any supported shape.
///
/// Text lines get both the report pass and the error pass; the results are
/// merged. Returns [`Error::Parse`] when neither pass recognizes the line.
pub fn parse_report(key: ConfigurationKey, line: &str) -> Result<MetricRecord> {
    let trimmed = line.trim();
    if trimmed.starts_with('{') {
        let json: Value = serde_json::from_str(trimmed)
            .map_err(|e| Error::parse(format!("malformed JSON report: {}", e)))?;
        return parse_structured_report(key, &json);
    }

    let report = parse_text_report(key, trimmed);
    let error = parse_error_line(key, trimmed);
    match (report, error) {
        (Ok(mut record), Ok(error)) => {
            record.merge(error)?;
            Ok(record)
        }
        (Ok(record), Err(_)) => Ok(record),
        (Err(_), Ok(error)) => Ok(error),
        (Err(_), Err(_)) => Err(Error::parse(format!(
            "unrecognized report line: {}",
            truncate(trimmed, 80)
        ))),
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Accumulates records across a batch, merging evidence by request id.
///
/// Record-level failures are logged and counted, never returned, so one bad
/// line cannot abort a batch.
#[derive(Debug, Default)]
pub struct ReportExtractor {
    records: Vec<MetricRecord>,
    index: HashMap<RequestId, usize>,
    stats: ExtractionStats,
}

impl ReportExtractor {
    /// Create an empty extractor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one tagged report, which may span several lines.
    pub fn ingest(&mut self, report: &TaggedReport) {
        let mut touched: Vec<RequestId> = Vec::new();

        for line in report.line.lines().map(str::trim).filter(|l| !l.is_empty()) {
            self.stats.lines_seen += 1;
            match parse_report(report.configuration_key, line) {
                Ok(record) => {
                    self.count(line, &record);
                    debug!(
                        request_id = %record.request_id,
                        configuration = %record.configuration_key,
                        is_error = record.is_error,
                        "Extracted report line"
                    );
                    touched.push(record.request_id.clone());
                    self.upsert(record);
                }
                Err(e) if line.starts_with('{') => {
                    self.stats.malformed_json += 1;
                    warn!(error = %e, "Skipping structured report");
                }
                Err(e) => {
                    self.stats.parse_failures += 1;
                    debug!(error = %e, "Skipping unrecognized line");
                }
            }
        }

        if let Some(function_error) = &report.function_error {
            if touched.is_empty() {
                warn!(
                    configuration = %report.configuration_key,
                    "Function error reported without a correlatable request"
                );
            }
            for request_id in touched {
                let record = MetricRecord::error_only(
                    report.configuration_key,
                    request_id,
                    Some(function_error.clone()),
                );
                self.upsert(record);
            }
        }
    }

    /// Ingest every report of a batch.
    pub fn ingest_all<'a, I>(&mut self, reports: I)
    where
        I: IntoIterator<Item = &'a TaggedReport>,
    {
        for report in reports {
            self.ingest(report);
        }
    }

    fn count(&mut self, line: &str, record: &MetricRecord) {
        if line.starts_with('{') {
            self.stats.structured_reports += 1;
        } else if REPORT_MARKER.is_match(line) {
            self.stats.reports_parsed += 1;
        }
        if record.is_error && !line.starts_with('{') && is_error_line(line) {
            self.stats.error_lines += 1;
        }
    }

    fn upsert(&mut self, record: MetricRecord) {
        match self.index.get(&record.request_id) {
            Some(&idx) => {
                // Same request id by construction, merge cannot fail.
                if let Err(e) = self.records[idx].merge(record) {
                    warn!(error = %e, "Failed to merge report");
                }
            }
            None => {
                self.index
                    .insert(record.request_id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    /// Consume the extractor.
    pub fn finish(self) -> (Vec<MetricRecord>, ExtractionStats) {
        (self.records, self.stats)
    }
}

/// Extract every record of a batch in one call.
pub fn extract_batch(reports: &[TaggedReport]) -> (Vec<MetricRecord>, ExtractionStats) {
    let mut extractor = ReportExtractor::new();
    extractor.ingest_all(reports);
    extractor.finish()
}
