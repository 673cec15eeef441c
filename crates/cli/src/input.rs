//! Batch input parsing for `analyze`.
//!
//! Two line shapes are accepted and may be mixed:
//!
//! - `{"configuration": 512, "line": "<raw report>"}` tagged JSON lines
//! - raw report lines following a `# configuration=<mb>` section marker
//!
//! Untagged JSON lines (structured reports) inside a section are tagged with
//! the section's configuration.

use power_tuner_analytics::TaggedReport;
use power_tuner_core::ConfigurationKey;
use tracing::warn;

const SECTION_MARKER: &str = "# configuration=";

/// Parsed batch plus the lines that could not be tagged.
#[derive(Debug, Default)]
pub struct Batch {
    /// Tagged reports in file order.
    pub reports: Vec<TaggedReport>,
    /// Lines with no configuration to attach to.
    pub untagged: usize,
}

/// Parse a batch file's contents.
pub fn parse_batch(content: &str) -> Batch {
    let mut batch = Batch::default();
    let mut section: Option<ConfigurationKey> = None;

    for (number, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(value) = line.strip_prefix(SECTION_MARKER) {
            match value.parse::<ConfigurationKey>() {
                Ok(key) => section = Some(key),
                Err(e) => {
                    warn!(line = number + 1, error = %e, "Ignoring bad section marker");
                    section = None;
                }
            }
            continue;
        }

        if line.starts_with('{') {
            if let Ok(tagged) = serde_json::from_str::<TaggedReport>(line) {
                batch.reports.push(tagged);
                continue;
            }
        }

        match section {
            Some(key) => batch.reports.push(TaggedReport::new(key, line)),
            None => {
                batch.untagged += 1;
                warn!(line = number + 1, "Line outside any configuration section");
            }
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_json_lines() {
        let content = r#"{"configuration": 512, "line": "REPORT RequestId: ab\tBilled Duration: 3 ms"}
{"configuration": 1024, "line": "REPORT RequestId: cd\tBilled Duration: 2 ms", "function_error": "Unhandled"}"#;
        let batch = parse_batch(content);
        assert_eq!(batch.reports.len(), 2);
        assert_eq!(batch.reports[0].configuration_key, ConfigurationKey::new(512));
        assert_eq!(batch.reports[1].function_error.as_deref(), Some("Unhandled"));
        assert_eq!(batch.untagged, 0);
    }

    #[test]
    fn test_parse_sections() {
        let content = "\
orphan line
# configuration=256
REPORT RequestId: aa\tBilled Duration: 10 ms

{\"request_id\": \"bb\", \"billed_duration\": 12}
# configuration=512MB
REPORT RequestId: cc\tBilled Duration: 5 ms
";
        let batch = parse_batch(content);
        assert_eq!(batch.untagged, 1);
        assert_eq!(batch.reports.len(), 3);
        assert_eq!(batch.reports[1].configuration_key, ConfigurationKey::new(256));
        assert!(batch.reports[1].line.starts_with("{\"request_id\""));
        assert_eq!(batch.reports[2].configuration_key, ConfigurationKey::new(512));
    }

    #[test]
    fn test_bad_marker_clears_section() {
        let batch = parse_batch("# configuration=256\n# configuration=big\nREPORT RequestId: aa");
        assert!(batch.reports.is_empty());
        assert_eq!(batch.untagged, 1);
    }
}
