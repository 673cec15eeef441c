//! Visualization link encoding.
//!
//! The chart page reads three parallel arrays from the URL fragment:
//! configuration sizes as little-endian `i16`, average durations and unit
//! prices as little-endian `f32`. Each array is base64-encoded and the three
//! are joined with `;`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use power_tuner_core::ConfigurationSummary;
use tracing::warn;

/// Public chart page used when no URL is configured.
pub const DEFAULT_VISUALIZATION_URL: &str = "https://lambda-power-tuning.show/";

/// Regions prefixed with this are billed in CNY.
const CNY_REGION_PREFIX: &str = "cn-";

fn encode_sizes(summaries: &[ConfigurationSummary]) -> String {
    let bytes: Vec<u8> = summaries
        .iter()
        .flat_map(|s| {
            let mb = s.configuration_key.memory_mb();
            let size = i16::try_from(mb).unwrap_or_else(|_| {
                warn!(configuration = mb, "Configuration does not fit the chart encoding");
                i16::MAX
            });
            size.to_le_bytes()
        })
        .collect();
    STANDARD.encode(bytes)
}

fn encode_floats(values: impl Iterator<Item = f64>) -> String {
    let bytes: Vec<u8> = values.flat_map(|v| (v as f32).to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

/// Encode summaries into the chart fragment, sorted by configuration value.
pub fn encode_fragment(summaries: &[ConfigurationSummary]) -> String {
    let mut sorted = summaries.to_vec();
    sorted.sort_by_key(|s| s.configuration_key);

    [
        encode_sizes(&sorted),
        encode_floats(sorted.iter().map(|s| s.average_duration_ms)),
        encode_floats(sorted.iter().map(|s| s.unit_price)),
    ]
    .join(";")
}

/// Full chart link for `summaries`.
///
/// Regions billed in CNY get `?currency=CNY` before the fragment.
pub fn build_visualization_url(
    summaries: &[ConfigurationSummary],
    base_url: &str,
    region: &str,
) -> String {
    let mut url = base_url.to_string();
    if region.starts_with(CNY_REGION_PREFIX) {
        url.push_str("?currency=CNY");
    }
    url.push('#');
    url.push_str(&encode_fragment(summaries));
    url
}
