//! End-to-end tuning scenarios and order/monotonicity properties.

use power_tuner_analytics::aggregate::{AggregationOptions, MetricAggregator};
use power_tuner_analytics::pricing::{compute_cost, CostModel, PriceQuote, PricingTable};
use power_tuner_analytics::report::{extract_batch, parse_report, TaggedReport};
use power_tuner_analytics::selector::{optimize, select, OptimizationStrategy, SelectionRequest};
use power_tuner_analytics::settings::TunerSettings;
use power_tuner_analytics::analyze;
use power_tuner_core::{Architecture, ConfigurationKey, ConfigurationSummary, MetricRecord};
use proptest::prelude::*;

fn request_id(n: usize) -> String {
    format!("{:08x}-1111-4222-8333-444455556666", n)
}

fn report(n: usize, billed: u64, memory: u32) -> String {
    format!(
        "REPORT RequestId: {}\tDuration: {}.12 ms\tBilled Duration: {} ms\tMemory Size: {} MB\tMax Memory Used: 64 MB",
        request_id(n),
        billed.saturating_sub(1),
        billed,
        memory
    )
}

fn records(durations: &[(u32, u64)]) -> Vec<MetricRecord> {
    durations
        .iter()
        .enumerate()
        .map(|(n, (memory, billed))| {
            MetricRecord::builder()
                .configuration_key(ConfigurationKey::new(*memory))
                .request_id(request_id(n))
                .duration_ms(*billed)
                .build()
                .unwrap()
        })
        .collect()
}

fn unit_model() -> CostModel {
    CostModel::new(PriceQuote::per_unit_time(1.0), 128).unwrap()
}

#[test]
fn test_trimmed_mean_scenario() {
    let batch: Vec<TaggedReport> = [100u64, 120, 110, 5000, 90]
        .iter()
        .enumerate()
        .map(|(n, billed)| TaggedReport::new(ConfigurationKey::new(512), report(n, *billed, 512)))
        .collect();
    let (records, stats) = extract_batch(&batch);
    assert_eq!(stats.reports_parsed, 5);

    let aggregator = MetricAggregator::new(unit_model(), AggregationOptions::new(0.2).unwrap());
    let report = aggregator.aggregate(&records);
    let summary = &report.summaries[&ConfigurationKey::new(512)];
    assert_eq!(summary.average_duration_ms, 110.0);
    assert_eq!(summary.trimmed_count, 2);
    assert_eq!(summary.sample_count, 5);
}

#[test]
fn test_errored_configuration_is_excluded_from_ranking() {
    let batch = vec![
        TaggedReport::new(ConfigurationKey::new(128), report(0, 2_000, 128)),
        TaggedReport::new(ConfigurationKey::new(128), report(1, 2_100, 128)),
        TaggedReport::new(ConfigurationKey::new(256), report(2, 90, 256))
            .with_function_error("Unhandled"),
        TaggedReport::new(
            ConfigurationKey::new(256),
            format!("RequestId: {} Error: Runtime exited", request_id(3)),
        ),
    ];
    let settings = TunerSettings {
        strategy: OptimizationStrategy::Speed,
        candidates: vec![ConfigurationKey::new(128), ConfigurationKey::new(256)],
        ..TunerSettings::default()
    };

    let outcome = analyze(&batch, &settings, &PricingTable::default()).unwrap();
    assert_eq!(
        outcome.result.chosen_configuration.configuration_key,
        ConfigurationKey::new(128)
    );
    assert_eq!(outcome.summaries.len(), 1);
    assert!(outcome
        .diagnostics
        .iter()
        .any(|d| d.key() == ConfigurationKey::new(256) && d.as_error().is_some()));
}

#[test]
fn test_speed_and_balanced_end_to_end() {
    let mut batch = Vec::new();
    for n in 0..4 {
        batch.push(TaggedReport::new(ConfigurationKey::new(128), report(n, 3_900, 128)));
        batch.push(TaggedReport::new(ConfigurationKey::new(1024), report(10 + n, 450, 1024)));
    }
    let base = TunerSettings {
        candidates: vec![ConfigurationKey::new(128), ConfigurationKey::new(1024)],
        ..TunerSettings::default()
    };

    let cost = analyze(&batch, &base, &PricingTable::default()).unwrap();
    // 128 MB: 4 billed seconds at 1x, 1024 MB: 1 billed second at 8x.
    assert_eq!(cost.result.chosen_configuration.configuration_key.memory_mb(), 128);

    let speed_settings = TunerSettings {
        strategy: OptimizationStrategy::Speed,
        ..base.clone()
    };
    let speed = analyze(&batch, &speed_settings, &PricingTable::default()).unwrap();
    assert_eq!(speed.result.chosen_configuration.configuration_key.memory_mb(), 1024);
    assert_eq!(speed.result.search_cost, 0.0002);
}

#[test]
fn test_unknown_region_falls_back() {
    let settings = TunerSettings {
        region: "xx-nowhere-1".to_string(),
        architecture: Architecture::Arm64,
        ..TunerSettings::default()
    };
    let batch = vec![TaggedReport::new(ConfigurationKey::new(128), report(0, 10, 128))];
    let outcome = analyze(&batch, &settings, &PricingTable::default()).unwrap();
    assert!(outcome.price_fell_back);
    assert_eq!(outcome.price.quote.per_unit_time_price, 1.7e-6);
}

#[test]
fn test_select_from_executor_stats_payload() {
    let json = r#"[
        {"value": 128, "averagePrice": 0.9, "averageDuration": 800, "totalCost": 9},
        {"value": 256, "averagePrice": 1.1, "averageDuration": 400, "totalCost": 11}
    ]"#;
    let summaries: Vec<ConfigurationSummary> = serde_json::from_str(json).unwrap();
    let request = SelectionRequest::new(OptimizationStrategy::Balanced);
    let result = optimize(&summaries, &request).unwrap();
    assert_eq!(result.chosen_configuration.configuration_key.memory_mb(), 256);
    assert_eq!(result.total_lambda_cost, 20.0);
    assert_eq!(result.search_cost, 0.0002);
}

#[test]
fn test_report_parsing_is_deterministic_across_batches() {
    let line = report(7, 333, 640);
    let first = parse_report(ConfigurationKey::new(640), &line).unwrap();
    let second = parse_report(ConfigurationKey::new(640), &line).unwrap();
    assert_eq!(first, second);
}

fn summaries_strategy() -> impl Strategy<Value = Vec<ConfigurationSummary>> {
    prop::collection::vec((1u32..=46, 0.01f64..100.0, 1.0f64..10_000.0), 1..8).prop_map(|rows| {
        rows.into_iter()
            .map(|(step, price, duration)| {
                ConfigurationSummary::new(ConfigurationKey::new(64 + step * 64), duration, price, price)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_aggregation_is_order_independent(
        samples in prop::collection::vec((prop::sample::select(vec![128u32, 256, 512]), 1u64..20_000), 1..40),
        seed in any::<u64>(),
    ) {
        let forward = records(&samples);
        let mut shuffled = forward.clone();
        // deterministic rotation plus reversal
        let len = shuffled.len();
        shuffled.rotate_left((seed as usize) % len);
        shuffled.reverse();

        let aggregator = MetricAggregator::new(unit_model(), AggregationOptions::default());
        prop_assert_eq!(aggregator.aggregate(&forward), aggregator.aggregate(&shuffled));
    }

    #[test]
    fn prop_cost_is_monotonic(
        duration in 0.0f64..100_000.0,
        extra in 0.0f64..10_000.0,
        memory in 128u32..10_240,
        more_memory in 0u32..1_024,
    ) {
        let quote = PriceQuote::per_unit_time(2.1e-6).with_request_price(2e-7);
        let base = compute_cost(&quote, 128, f64::from(memory), duration);
        prop_assert!(compute_cost(&quote, 128, f64::from(memory), duration + extra) >= base);
        prop_assert!(compute_cost(&quote, 128, f64::from(memory + more_memory), duration) >= base);
    }

    #[test]
    fn prop_zero_discard_is_plain_mean(durations in prop::collection::vec(1u64..50_000, 1..30)) {
        let samples: Vec<(u32, u64)> = durations.iter().map(|d| (256, *d)).collect();
        let aggregator = MetricAggregator::new(unit_model(), AggregationOptions::untrimmed());
        let report = aggregator.aggregate(&records(&samples));
        let expected = durations.iter().sum::<u64>() as f64 / durations.len() as f64;
        prop_assert_eq!(report.summaries[&ConfigurationKey::new(256)].average_duration_ms, expected);
    }

    #[test]
    fn prop_selection_returns_a_candidate(summaries in summaries_strategy(), weight in 0.0f64..=1.0) {
        for strategy in OptimizationStrategy::ALL {
            let chosen = select(&summaries, strategy, weight).unwrap();
            prop_assert!(summaries.iter().any(|s| s == chosen));
        }
    }

    #[test]
    fn prop_balanced_extremes_match_pure_strategies(summaries in summaries_strategy()) {
        let by_cost = select(&summaries, OptimizationStrategy::Cost, 0.5).unwrap();
        let weighted = select(&summaries, OptimizationStrategy::Balanced, 1.0).unwrap();
        prop_assert_eq!(by_cost.unit_price, weighted.unit_price);

        let by_speed = select(&summaries, OptimizationStrategy::Speed, 0.5).unwrap();
        let weighted = select(&summaries, OptimizationStrategy::Balanced, 0.0).unwrap();
        prop_assert_eq!(by_speed.average_duration_ms, weighted.average_duration_ms);
    }
}
