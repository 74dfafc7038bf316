//! Property tests for Sentinel bookkeeping and order independence.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use sentinel_core::{EvaluationContext, EvaluationResult, Sentinel, SentinelConfig};

fn batches() -> impl Strategy<Value = Vec<Vec<EvaluationResult>>> {
    let batch = prop::collection::vec((0usize..5, -1.0f64..1.0, 0.0f64..1.0), 0..12).prop_map(|rows| {
        rows.into_iter()
            .map(|(agent, score, confidence)| EvaluationResult::new(format!("agent-{agent}"), score, confidence))
            .collect::<Vec<_>>()
    });
    prop::collection::vec(batch, 1..20)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: histories and counters stay bounded across 500+ calls.
    #[test]
    fn prop_history_bounded(batches in batches()) {
        let mut sentinel = Sentinel::with_seed(SentinelConfig::default(), 9).unwrap();
        let context = EvaluationContext::new("prop");
        let capacity = sentinel.config().correction.history_capacity;
        let detector_capacity = sentinel.config().bias.history_capacity();

        for call in 0..520 {
            let batch = &batches[call % batches.len()];
            let evaluation = sentinel.evaluate(batch, &context);
            prop_assert!((0.0..=1.0).contains(&evaluation.confidence));

            prop_assert!(sentinel.history().len() <= capacity);
            prop_assert!(sentinel.bias_detector().history().len() <= detector_capacity);
            prop_assert!(sentinel.intervention_count() <= sentinel.total_analyses());
        }

        let stats = sentinel.statistics();
        prop_assert_eq!(stats.total_analyses, 520);
        prop_assert_eq!(stats.retained_analyses, capacity);
        prop_assert!((0.0..=1.0).contains(&stats.intervention_rate));
        prop_assert!((0.0..=1.0).contains(&stats.bias_detection_rate));
        prop_assert_eq!(stats.recent_performance.window, 10);
    }

    /// Property: diversity and adjustments do not depend on batch order.
    #[test]
    fn prop_evaluation_order_independent(batches in batches()) {
        // Distinct timestamps so per-agent sequences have one true order.
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let batch: Vec<EvaluationResult> = batches
            .concat()
            .into_iter()
            .enumerate()
            .map(|(i, e)| e.with_timestamp(base + Duration::seconds(i as i64)))
            .collect();
        let mut reversed = batch.clone();
        reversed.reverse();

        let context = EvaluationContext::new("order");
        let forward = Sentinel::with_seed(SentinelConfig::default(), 1).unwrap().evaluate(&batch, &context);
        let backward = Sentinel::with_seed(SentinelConfig::default(), 1).unwrap().evaluate(&reversed, &context);

        prop_assert!((forward.diversity_score - backward.diversity_score).abs() < 1e-9);
        prop_assert_eq!(
            forward.score_adjustments.keys().collect::<Vec<_>>(),
            backward.score_adjustments.keys().collect::<Vec<_>>()
        );
        for (agent, value) in &forward.score_adjustments {
            prop_assert!((value - backward.score_adjustments[agent]).abs() < 1e-9);
        }
    }
}
