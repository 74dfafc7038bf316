//! # Sentinel Integration Tests
//!
//! End-to-end tests from agent fan-out through bias and diversity analysis
//! to score correction.
//!
//! ## Coverage
//!
//! | Scenario | Components | Test |
//! |----------|------------|------|
//! | Failing agent | Aggregator, Sentinel | `test_failing_agent_does_not_abort_session` |
//! | Outlier agent | Bias Detector, Corrector | `test_outlier_agent_is_corrected` |
//! | Echo chamber | Diversity Analyzer | `test_echo_chamber_triggers_groupthink` |
//! | Drift | Bias Detector history | `test_session_drift_becomes_temporal_bias` |
//! | Depth scoring | Bias Detector | `test_depth_contexts_enable_positional_bias` |
//! | Replay | Config, Sentinel | `test_seeded_replay_is_reproducible` |

use std::collections::BTreeMap;

use async_trait::async_trait;
use sentinel_core::{
    BiasType, EvaluationContext, EvaluationResult, EvaluationSession, EvaluatorAgent,
    ExecutionMode, Sentinel, SentinelConfig,
};
use sentinel_council::{CouncilError, Result as CouncilResult};

/// Agent that scores a numeric state with a fixed offset.
struct OffsetAgent {
    id: String,
    offset: f64,
    confidence: f64,
}

impl OffsetAgent {
    fn boxed(id: &str, offset: f64, confidence: f64) -> Box<dyn EvaluatorAgent<f64>> {
        Box::new(Self {
            id: id.to_string(),
            offset,
            confidence,
        })
    }
}

#[async_trait]
impl EvaluatorAgent<f64> for OffsetAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn provider_type(&self) -> &str {
        "offset"
    }

    async fn evaluate(&self, state: &f64, _context: &EvaluationContext) -> CouncilResult<EvaluationResult> {
        Ok(EvaluationResult::new(self.id.clone(), state + self.offset, self.confidence)
            .with_reasoning(format!("state value {state:.2} adjusted by {:.2}", self.offset)))
    }
}

struct TimeoutAgent;

#[async_trait]
impl EvaluatorAgent<f64> for TimeoutAgent {
    fn id(&self) -> &str {
        "slow"
    }

    fn provider_type(&self) -> &str {
        "remote"
    }

    async fn evaluate(&self, _state: &f64, _context: &EvaluationContext) -> CouncilResult<EvaluationResult> {
        Err(CouncilError::Timeout {
            agent: "slow".to_string(),
            elapsed_ms: 30_000,
        })
    }
}

fn eval(agent: &str, score: f64, confidence: f64) -> EvaluationResult {
    EvaluationResult::new(agent, score, confidence)
}

// =============================================================================
// AGGREGATION
// =============================================================================

#[tokio::test]
async fn test_failing_agent_does_not_abort_session() {
    let agents: Vec<Box<dyn EvaluatorAgent<f64>>> =
        vec![OffsetAgent::boxed("steady", 0.0, 0.8), Box::new(TimeoutAgent)];
    let mut session = EvaluationSession::new(SentinelConfig::default()).unwrap();

    let outcome = session
        .run(&agents, &0.4, &EvaluationContext::new("s0"), ExecutionMode::Parallel)
        .await;

    assert_eq!(outcome.batch.summary.successful_agents, 1);
    assert_eq!(outcome.batch.summary.failed_agents, 1);
    let failed = &outcome.batch.agent_outputs[1];
    assert!(failed.error.has_error);
    assert_eq!(failed.error.error_type.as_deref(), Some("timeout"));
    assert!(outcome.evaluation.is_some());
}

#[tokio::test]
async fn test_modes_agree_on_statistics() {
    let agents = vec![
        OffsetAgent::boxed("a", -0.2, 0.6),
        OffsetAgent::boxed("b", 0.0, 0.7),
        OffsetAgent::boxed("c", 0.3, 0.9),
    ];
    let mut parallel = EvaluationSession::new(SentinelConfig::default()).unwrap();
    let mut sequential = EvaluationSession::new(SentinelConfig::default()).unwrap();
    let context = EvaluationContext::new("s0");

    let p = parallel.run(&agents, &0.5, &context, ExecutionMode::Parallel).await;
    let s = sequential.run(&agents, &0.5, &context, ExecutionMode::Sequential).await;

    assert_eq!(p.batch.summary.successful_agents, s.batch.summary.successful_agents);
    assert_eq!(p.batch.diversity, s.batch.diversity);
    let (pe, se) = (p.evaluation.unwrap(), s.evaluation.unwrap());
    assert_eq!(pe.diversity_analysis, se.diversity_analysis);
    assert_eq!(pe.score_adjustments, se.score_adjustments);
}

// =============================================================================
// BIAS
// =============================================================================

#[tokio::test]
async fn test_outlier_agent_is_corrected() {
    let agents = vec![
        OffsetAgent::boxed("a", 0.00, 0.8),
        OffsetAgent::boxed("b", 0.01, 0.8),
        OffsetAgent::boxed("c", -0.01, 0.8),
        OffsetAgent::boxed("booster", 0.45, 0.8),
    ];
    let mut session = EvaluationSession::new(SentinelConfig::default()).unwrap();

    // One batch per state; the detector judges the pooled evaluations.
    let mut pooled = Vec::new();
    for (i, state) in [0.40, 0.41, 0.39, 0.40].iter().enumerate() {
        let outcome = session
            .run(&agents, state, &EvaluationContext::new(format!("s{i}")), ExecutionMode::Parallel)
            .await;
        pooled.extend(outcome.batch.successful_evaluations());
    }

    let mut sentinel = Sentinel::with_seed(SentinelConfig::default(), 11).unwrap();
    let evaluation = sentinel.evaluate(&pooled, &EvaluationContext::new("pooled"));

    assert!(evaluation.bias_detected);
    assert!(evaluation.score_adjustments["booster"] < 0.0);

    let raw: BTreeMap<String, f64> = pooled
        .iter()
        .rev()
        .take(4)
        .map(|e| (e.agent_id.clone(), e.score))
        .collect();
    let corrected = sentinel.adjust_agent_scores(&raw, &evaluation);
    assert!(corrected["booster"] < raw["booster"]);
}

#[test]
fn test_session_drift_becomes_temporal_bias() {
    let mut config = SentinelConfig::default();
    config.bias.temporal_window = 4;
    let mut sentinel = Sentinel::with_seed(config, 1).unwrap();
    let context = EvaluationContext::new("drift");

    // Each batch is one window; scores climb batch after batch.
    for step in 0..2 {
        let level = 0.3 * step as f64;
        let batch: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|agent| eval(agent, level, 0.7))
            .collect();
        let evaluation = sentinel.evaluate(&batch, &context);
        assert!(evaluation.bias_reports.iter().all(|r| r.bias_type != BiasType::Temporal));
    }

    let evaluation = sentinel.evaluate(&[eval("a", 0.9, 0.7)], &context);
    assert!(evaluation
        .bias_reports
        .iter()
        .any(|r| r.bias_type == BiasType::Temporal));
}

#[test]
fn test_depth_contexts_enable_positional_bias() {
    let mut sentinel = Sentinel::with_seed(SentinelConfig::default(), 2).unwrap();
    let mut evaluations = Vec::new();
    let mut contexts = Vec::new();
    for depth in 0..3u32 {
        for agent in ["a", "b", "c"] {
            evaluations.push(eval(agent, 0.2 + 0.3 * f64::from(depth), 0.7));
            contexts.push(EvaluationContext::new(format!("d{depth}")).with_depth(depth));
        }
    }

    let with_contexts = sentinel.evaluate_with_contexts(&evaluations, &contexts);
    assert!(with_contexts
        .bias_reports
        .iter()
        .any(|r| r.bias_type == BiasType::Positional));

    let shared = sentinel.evaluate(&evaluations, &contexts[0]);
    assert!(shared
        .bias_reports
        .iter()
        .all(|r| r.bias_type != BiasType::Positional));
}

// =============================================================================
// DIVERSITY
// =============================================================================

#[test]
fn test_echo_chamber_triggers_groupthink() {
    let mut sentinel = Sentinel::with_seed(SentinelConfig::default(), 3).unwrap();
    let batch: Vec<_> = [("a", 0.70, 0.9), ("b", 0.71, 0.85), ("c", 0.69, 0.95), ("d", 0.70, 0.9), ("e", 0.70, 0.88)]
        .iter()
        .map(|(agent, score, confidence)| eval(agent, *score, *confidence))
        .collect();

    let evaluation = sentinel.evaluate(&batch, &EvaluationContext::new("echo"));
    assert!(evaluation.diversity_analysis.group_think_detected);
    assert!(evaluation.is_significant_intervention());
    assert!(evaluation
        .recommendations
        .iter()
        .any(|r| r.contains("groupthink")));

    // Low diversity with high confidence passes the correction gate.
    assert!(evaluation.confidence >= 0.6);
    let raw = vec![0.70, 0.71, 0.69, 0.70, 0.70];
    let adjusted = sentinel.adjust_scores(&raw, &evaluation);
    assert!(adjusted
        .iter()
        .zip(&raw)
        .all(|(a, r)| (a - r).abs() <= 0.1 * 0.3 * 0.5 + 1e-12));
}

// =============================================================================
// CONFIGURATION & REPLAY
// =============================================================================

#[test]
fn test_seeded_replay_is_reproducible() {
    let config = SentinelConfig::from_toml_str(
        r#"
        [correction]
        seed = 1234

        [diversity]
        diversity_threshold = 0.9
        "#,
    )
    .unwrap();

    let batch = vec![eval("a", 0.4, 0.9), eval("b", 0.45, 0.9), eval("c", 0.5, 0.9)];
    let run = |config: SentinelConfig| {
        let mut sentinel = Sentinel::new(config).unwrap();
        let evaluation = sentinel.evaluate(&batch, &EvaluationContext::new("r"));
        sentinel.adjust_scores(&[0.4, 0.45, 0.5], &evaluation)
    };

    assert_eq!(run(config.clone()), run(config));
}

#[test]
fn test_evaluation_round_trip() {
    let mut sentinel = Sentinel::with_seed(SentinelConfig::default(), 4).unwrap();
    let batch: Vec<_> = (0..8)
        .map(|i| eval(["a", "b"][i % 2], 0.1 * i as f64, 0.6))
        .collect();
    let evaluation = sentinel.evaluate(&batch, &EvaluationContext::new("rt"));

    let json = serde_json::to_string(&evaluation).unwrap();
    let parsed: sentinel_core::SentinelEvaluation = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, evaluation);

    let stats = sentinel.statistics();
    let json = serde_json::to_string(&stats).unwrap();
    assert_eq!(serde_json::from_str::<sentinel_core::SentinelStatistics>(&json).unwrap(), stats);
}
