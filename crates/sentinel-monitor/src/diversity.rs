//! # Diversity Analyzer
//!
//! Measures how independent a batch of evaluations really is.
//!
//! ## Metrics
//!
//! | Metric | Meaning |
//! |--------|---------|
//! | `overall_score` | Weighted blend of score spread, confidence spread and participation balance |
//! | `entropy` | Normalized Shannon entropy of scores over 10 equal-width bins |
//! | `variance` | Population variance of raw scores |
//! | `disagreement_level` | Mean absolute deviation of scores, clamped to [0, 1] |
//! | `group_think_detected` | Tight agreement combined with high confidence |
//!
//! ```text
//! overall = sw·min(2·σ_score, 1) + cw·min(4·σ_conf, 1) + (1 − sw − cw)·(1 − dominance)
//! ```
//!
//! Analysis is a pure function of its input: the analyzer holds only its
//! configuration, so analyzing the same slice twice gives bit-identical
//! output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use sentinel_council::EvaluationResult;

use crate::error::{check_range, MonitorError, Result};
use crate::stats;

/// Number of equal-width bins used for score entropy.
const ENTROPY_BINS: usize = 10;
/// Largest meaningful spread of scores around their mean.
const MAX_SPREAD: f64 = 1.0;
/// Score variance below which agreement counts as tight.
const GROUPTHINK_VARIANCE: f64 = 0.01;
/// Mean confidence above which tight agreement is suspicious.
const GROUPTHINK_CONFIDENCE: f64 = 0.8;
/// Dominance index above which one agent crowds out the rest.
const DOMINANCE_LIMIT: f64 = 0.7;
/// Participation rate below which the pool is underused.
const PARTICIPATION_FLOOR: f64 = 0.5;

/// Thresholds and weights for diversity analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversityConfig {
    /// Evaluations needed for a non-degenerate analysis.
    pub min_evaluations: usize,
    /// Overall score below which diversity is considered low.
    pub diversity_threshold: f64,
    /// Overall score at or below which groupthink is possible.
    pub groupthink_threshold: f64,
    /// Weight of score spread in the overall score.
    pub score_weight: f64,
    /// Weight of confidence spread in the overall score.
    pub confidence_weight: f64,
    /// Size of the configured agent roster. When unset, the participation
    /// rate is computed against the agents seen in the batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roster_size: Option<usize>,
}

impl DiversityConfig {
    /// Creates a config with default values.
    ///
    /// Defaults:
    /// - Minimum evaluations: 3
    /// - Diversity threshold: 0.3
    /// - Groupthink threshold: 0.2
    /// - Score weight: 0.5, confidence weight: 0.4 (participation gets 0.1)
    /// - No roster
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_evaluations: 3,
            diversity_threshold: 0.3,
            groupthink_threshold: 0.2,
            score_weight: 0.5,
            confidence_weight: 0.4,
            roster_size: None,
        }
    }

    /// Sets the minimum batch size.
    #[must_use]
    pub const fn with_min_evaluations(mut self, min: usize) -> Self {
        self.min_evaluations = min;
        self
    }

    /// Sets the low-diversity threshold.
    #[must_use]
    pub const fn with_diversity_threshold(mut self, threshold: f64) -> Self {
        self.diversity_threshold = threshold;
        self
    }

    /// Sets the groupthink threshold.
    #[must_use]
    pub const fn with_groupthink_threshold(mut self, threshold: f64) -> Self {
        self.groupthink_threshold = threshold;
        self
    }

    /// Sets the score and confidence weights.
    #[must_use]
    pub const fn with_weights(mut self, score_weight: f64, confidence_weight: f64) -> Self {
        self.score_weight = score_weight;
        self.confidence_weight = confidence_weight;
        self
    }

    /// Sets the configured roster size.
    #[must_use]
    pub const fn with_roster_size(mut self, size: usize) -> Self {
        self.roster_size = Some(size);
        self
    }

    /// Checks every field for a usable value.
    pub fn validate(&self) -> Result<()> {
        if self.min_evaluations == 0 {
            return Err(MonitorError::invalid("min_evaluations", "must be at least 1"));
        }
        if self.roster_size == Some(0) {
            return Err(MonitorError::invalid("roster_size", "must be at least 1"));
        }
        check_range("diversity_threshold", self.diversity_threshold, 0.0, 1.0)?;
        check_range("groupthink_threshold", self.groupthink_threshold, 0.0, 1.0)?;
        check_range("score_weight", self.score_weight, 0.0, 1.0)?;
        check_range("confidence_weight", self.confidence_weight, 0.0, 1.0)?;
        if self.score_weight + self.confidence_weight > 1.0 {
            return Err(MonitorError::invalid(
                "confidence_weight",
                format!(
                    "score_weight + confidence_weight = {} exceeds 1",
                    self.score_weight + self.confidence_weight
                ),
            ));
        }
        Ok(())
    }
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Spread of scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreMetrics {
    /// Mean score.
    pub mean: f64,
    /// Highest minus lowest score.
    pub range: f64,
    /// Population standard deviation of scores.
    pub standard_deviation: f64,
    /// Standard deviation over the absolute mean, 0 when the mean is 0.
    pub coefficient_of_variation: f64,
}

/// Spread of confidences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceMetrics {
    /// Mean confidence.
    pub average_confidence: f64,
    /// Highest minus lowest confidence.
    pub range: f64,
    /// Population standard deviation of confidences.
    pub standard_deviation: f64,
    /// Standard deviation over the mean confidence, 0 when the mean is 0.
    pub coefficient_of_variation: f64,
}

/// How evenly agents contributed to the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipationMetrics {
    /// Distinct agents in the batch.
    pub active_agents: usize,
    /// Roster size, or `active_agents` when no roster is configured.
    pub total_agents: usize,
    /// Share of evaluations from the most active agent.
    pub dominance_index: f64,
    /// `active_agents / total_agents`, capped at 1.
    pub participation_rate: f64,
    /// Evaluation count per agent.
    pub evaluations_per_agent: BTreeMap<String, usize>,
}

/// Metric sub-records behind a [`DiversityAnalysis`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiversityBreakdown {
    /// Spread of scores.
    pub score_metrics: ScoreMetrics,
    /// Spread of confidences.
    pub confidence_metrics: ConfidenceMetrics,
    /// Per-agent participation.
    pub participation_metrics: ParticipationMetrics,
}

/// Result of one diversity analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiversityAnalysis {
    /// Weighted diversity score (0.0 to 1.0).
    pub overall_score: f64,
    /// Normalized score entropy (0.0 to 1.0).
    pub entropy: f64,
    /// Population variance of scores.
    pub variance: f64,
    /// Clamped mean absolute deviation of scores.
    pub disagreement_level: f64,
    /// Tight agreement with high confidence.
    pub group_think_detected: bool,
    /// Confidence in the analysis itself.
    pub confidence: f64,
    /// Rule-based suggestions.
    pub recommendations: Vec<String>,
    /// Metrics the score was derived from.
    pub breakdown: DiversityBreakdown,
}

/// Computes [`DiversityAnalysis`] for evaluation batches.
#[derive(Debug, Clone, Default)]
pub struct DiversityAnalyzer {
    config: DiversityConfig,
}

impl DiversityAnalyzer {
    /// Creates an analyzer with default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            config: DiversityConfig::new(),
        }
    }

    /// Creates an analyzer with a validated configuration.
    pub fn with_config(config: DiversityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &DiversityConfig {
        &self.config
    }

    /// Analyzes one batch.
    ///
    /// Batches smaller than `min_evaluations` yield a degenerate analysis
    /// with every metric at 0 and a single recommendation.
    #[must_use]
    pub fn analyze(&self, evaluations: &[EvaluationResult]) -> DiversityAnalysis {
        let n = evaluations.len();
        if n < self.config.min_evaluations {
            debug!(
                "Diversity analysis degenerate: {} evaluations, need {}",
                n, self.config.min_evaluations
            );
            return DiversityAnalysis {
                recommendations: vec![format!(
                    "Insufficient data for diversity analysis: {} evaluations, need at least {}",
                    n, self.config.min_evaluations
                )],
                ..DiversityAnalysis::default()
            };
        }

        let scores: Vec<f64> = evaluations.iter().map(|e| e.score).collect();
        let confidences: Vec<f64> = evaluations.iter().map(|e| e.confidence).collect();

        let score_metrics = ScoreMetrics {
            mean: stats::mean(&scores),
            range: stats::range(&scores),
            standard_deviation: stats::std_dev(&scores),
            coefficient_of_variation: stats::coefficient_of_variation(&scores),
        };
        let confidence_metrics = ConfidenceMetrics {
            average_confidence: stats::mean(&confidences),
            range: stats::range(&confidences),
            standard_deviation: stats::std_dev(&confidences),
            coefficient_of_variation: stats::coefficient_of_variation(&confidences),
        };
        let participation_metrics = self.participation(evaluations);

        let participation_weight = 1.0 - self.config.score_weight - self.config.confidence_weight;
        let overall_score = self.config.score_weight * (2.0 * score_metrics.standard_deviation).min(1.0)
            + self.config.confidence_weight * (4.0 * confidence_metrics.standard_deviation).min(1.0)
            + participation_weight * (1.0 - participation_metrics.dominance_index);

        let variance = stats::variance(&scores);
        let group_think_detected = overall_score <= self.config.groupthink_threshold
            && variance < GROUPTHINK_VARIANCE
            && confidence_metrics.average_confidence > GROUPTHINK_CONFIDENCE;

        let sample = (n as f64 / self.config.min_evaluations as f64).min(1.0);
        let confidence = (sample + participation_metrics.participation_rate) / 2.0;

        let recommendations = self.recommend(overall_score, group_think_detected, &participation_metrics);

        debug!(
            "Diversity analysis: overall {:.3}, variance {:.4}, groupthink {}",
            overall_score, variance, group_think_detected
        );

        DiversityAnalysis {
            overall_score,
            entropy: score_entropy(&scores),
            variance,
            disagreement_level: (stats::mean_absolute_deviation(&scores) / MAX_SPREAD).clamp(0.0, 1.0),
            group_think_detected,
            confidence,
            recommendations,
            breakdown: DiversityBreakdown {
                score_metrics,
                confidence_metrics,
                participation_metrics,
            },
        }
    }

    fn participation(&self, evaluations: &[EvaluationResult]) -> ParticipationMetrics {
        let mut evaluations_per_agent: BTreeMap<String, usize> = BTreeMap::new();
        for evaluation in evaluations {
            *evaluations_per_agent.entry(evaluation.agent_id.clone()).or_default() += 1;
        }

        let active_agents = evaluations_per_agent.len();
        let total_agents = self.config.roster_size.unwrap_or(active_agents);
        let max_count = evaluations_per_agent.values().copied().max().unwrap_or(0);

        let dominance_index = if evaluations.is_empty() {
            0.0
        } else {
            max_count as f64 / evaluations.len() as f64
        };
        let participation_rate = if total_agents == 0 {
            0.0
        } else {
            (active_agents as f64 / total_agents as f64).min(1.0)
        };

        ParticipationMetrics {
            active_agents,
            total_agents,
            dominance_index,
            participation_rate,
            evaluations_per_agent,
        }
    }

    fn recommend(
        &self,
        overall_score: f64,
        group_think_detected: bool,
        participation: &ParticipationMetrics,
    ) -> Vec<String> {
        let mut recommendations = Vec::new();

        if overall_score < self.config.diversity_threshold {
            recommendations.push(format!(
                "Diversity score {:.2} is below {:.2}: add agents with different models, prompts or strategies",
                overall_score, self.config.diversity_threshold
            ));
        }
        if group_think_detected {
            recommendations.push(
                "Possible groupthink: agents agree closely with high confidence; add a contrarian or devil's-advocate agent"
                    .to_string(),
            );
        }
        if participation.dominance_index > DOMINANCE_LIMIT {
            recommendations.push(format!(
                "One agent contributes {:.0}% of evaluations: rebalance participation across agents",
                participation.dominance_index * 100.0
            ));
        }
        if participation.participation_rate < PARTICIPATION_FLOOR {
            recommendations.push(format!(
                "Only {} of {} agents participated: make fuller use of the agent pool",
                participation.active_agents, participation.total_agents
            ));
        }
        if recommendations.is_empty() {
            recommendations.push("Agent diversity is healthy".to_string());
        }
        recommendations
    }
}

/// Shannon entropy of scores over equal-width bins, normalized to [0, 1].
fn score_entropy(scores: &[f64]) -> f64 {
    let Some((min, max)) = stats::min_max(scores) else {
        return 0.0;
    };
    let width = max - min;
    if width <= 0.0 {
        return 0.0;
    }

    let mut bins = [0usize; ENTROPY_BINS];
    for score in scores {
        let index = (((score - min) / width) * ENTROPY_BINS as f64) as usize;
        bins[index.min(ENTROPY_BINS - 1)] += 1;
    }

    let total = scores.len() as f64;
    let entropy: f64 = bins
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();
    entropy / (ENTROPY_BINS as f64).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(scores: &[f64], confidences: &[f64]) -> Vec<EvaluationResult> {
        scores
            .iter()
            .zip(confidences)
            .enumerate()
            .map(|(i, (s, c))| EvaluationResult::new(format!("agent-{i}"), *s, *c))
            .collect()
    }

    #[test]
    fn test_config_defaults_are_valid() {
        let config = DiversityConfig::default();
        assert_eq!(config.min_evaluations, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_weights_above_one() {
        let config = DiversityConfig::new().with_weights(0.7, 0.5);
        assert!(DiversityAnalyzer::with_config(config).is_err());
    }

    #[test]
    fn test_config_rejects_out_of_range_thresholds() {
        assert!(DiversityConfig::new().with_diversity_threshold(1.5).validate().is_err());
        assert!(DiversityConfig::new().with_groupthink_threshold(-0.1).validate().is_err());
        assert!(DiversityConfig::new().with_min_evaluations(0).validate().is_err());
        assert!(DiversityConfig::new().with_roster_size(0).validate().is_err());
    }

    #[test]
    fn test_degenerate_below_min_evaluations() {
        let analysis = DiversityAnalyzer::new().analyze(&batch(&[0.1, 0.9], &[0.5, 0.5]));
        assert_eq!(analysis.overall_score, 0.0);
        assert_eq!(analysis.confidence, 0.0);
        assert_eq!(analysis.recommendations.len(), 1);
        assert!(analysis.recommendations[0].contains("Insufficient data"));
    }

    #[test]
    fn test_identical_scores_have_zero_entropy() {
        let analysis = DiversityAnalyzer::new().analyze(&batch(&[0.4; 4], &[0.6; 4]));
        assert_eq!(analysis.entropy, 0.0);
        assert_eq!(analysis.disagreement_level, 0.0);
        assert_eq!(analysis.variance, 0.0);
    }

    #[test]
    fn test_groupthink_detected() {
        let analysis = DiversityAnalyzer::new().analyze(&batch(
            &[0.70, 0.71, 0.69, 0.70, 0.70],
            &[0.9, 0.85, 0.95, 0.9, 0.88],
        ));
        assert!(analysis.overall_score <= 0.2);
        assert!(analysis.group_think_detected);
        assert!(analysis
            .recommendations
            .iter()
            .any(|r| r.contains("groupthink")));
    }

    #[test]
    fn test_spread_batch_is_healthy() {
        let analysis = DiversityAnalyzer::new().analyze(&batch(
            &[-0.8, -0.2, 0.3, 0.9],
            &[0.2, 0.9, 0.5, 0.7],
        ));
        assert!(!analysis.group_think_detected);
        assert!(analysis.overall_score > 0.3);
        assert!(analysis.entropy > 0.0);
        assert_eq!(analysis.recommendations, vec!["Agent diversity is healthy".to_string()]);
    }

    #[test]
    fn test_entropy_uniform_over_bins() {
        let scores: Vec<f64> = (0..10).map(|i| i as f64 / 9.0).collect();
        let analysis = DiversityAnalyzer::new().analyze(&batch(&scores, &[0.5; 10]));
        assert!((analysis.entropy - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_dominance_recommendation() {
        let mut evaluations: Vec<_> = (0..8).map(|_| EvaluationResult::new("loud", 0.5, 0.5)).collect();
        evaluations.push(EvaluationResult::new("quiet", 0.5, 0.5));
        let analysis = DiversityAnalyzer::new().analyze(&evaluations);

        let participation = &analysis.breakdown.participation_metrics;
        assert_eq!(participation.active_agents, 2);
        assert!((participation.dominance_index - 8.0 / 9.0).abs() < 1e-12);
        assert!(analysis.recommendations.iter().any(|r| r.contains("rebalance")));
    }

    #[test]
    fn test_participation_rate_literal_without_roster() {
        let analysis = DiversityAnalyzer::new().analyze(&batch(&[0.1, 0.5, 0.9], &[0.5; 3]));
        let participation = &analysis.breakdown.participation_metrics;
        assert_eq!(participation.total_agents, 3);
        assert_eq!(participation.participation_rate, 1.0);
    }

    #[test]
    fn test_participation_rate_against_roster() {
        let analyzer = DiversityAnalyzer::with_config(DiversityConfig::new().with_roster_size(8)).unwrap();
        let analysis = analyzer.analyze(&batch(&[0.1, 0.5, 0.9], &[0.5; 3]));
        let participation = &analysis.breakdown.participation_metrics;

        assert_eq!(participation.total_agents, 8);
        assert!((participation.participation_rate - 0.375).abs() < 1e-12);
        assert!(analysis.recommendations.iter().any(|r| r.contains("3 of 8")));
        assert!((analysis.confidence - (1.0 + 0.375) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_disagreement_is_clamped() {
        let analysis = DiversityAnalyzer::new().analyze(&batch(&[-5.0, 5.0, -5.0, 5.0], &[0.5; 4]));
        assert_eq!(analysis.disagreement_level, 1.0);
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let evaluations = batch(&[0.2, 0.4, 0.9, -0.3], &[0.3, 0.8, 0.6, 0.9]);
        let analyzer = DiversityAnalyzer::new();
        assert_eq!(analyzer.analyze(&evaluations), analyzer.analyze(&evaluations));
    }

    #[test]
    fn test_analysis_round_trip() {
        let analysis = DiversityAnalyzer::new().analyze(&batch(&[0.2, 0.4, 0.9], &[0.3, 0.8, 0.6]));
        let json = serde_json::to_string(&analysis).unwrap();
        let back: DiversityAnalysis = serde_json::from_str(&json).unwrap();
        assert_eq!(back, analysis);
    }
}
