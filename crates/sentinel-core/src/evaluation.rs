//! Records produced by the Sentinel.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sentinel_monitor::{BiasReport, DiversityAnalysis};

/// The Sentinel's verdict on one evaluation batch.
///
/// Raw evaluations are never rewritten: corrections live in
/// `score_adjustments` and are applied by the caller through
/// [`Sentinel::adjust_scores`](crate::Sentinel::adjust_scores) or
/// [`Sentinel::adjust_agent_scores`](crate::Sentinel::adjust_agent_scores).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentinelEvaluation {
    /// True if any bias detector reported.
    pub bias_detected: bool,

    /// Overall diversity score of the batch.
    pub diversity_score: f64,

    /// Deduplicated recommendations, in first-seen order.
    pub recommendations: Vec<String>,

    /// Suggested per-agent score adjustment.
    pub score_adjustments: BTreeMap<String, f64>,

    /// Confidence in this evaluation (0.0 to 1.0).
    pub confidence: f64,

    /// Reports from every detector that fired.
    pub bias_reports: Vec<BiasReport>,

    /// Full diversity analysis of the batch.
    pub diversity_analysis: DiversityAnalysis,

    /// Counts and timing.
    pub metadata: EvaluationMetadata,
}

impl SentinelEvaluation {
    /// Returns true if this evaluation counted as a significant intervention.
    #[inline]
    #[must_use]
    pub const fn is_significant_intervention(&self) -> bool {
        self.metadata.significant_intervention
    }

    /// Largest absolute score adjustment (0 if none).
    #[must_use]
    pub fn max_adjustment(&self) -> f64 {
        self.score_adjustments
            .values()
            .map(|a| a.abs())
            .fold(0.0, f64::max)
    }
}

/// Bookkeeping attached to a [`SentinelEvaluation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetadata {
    /// Evaluations in the batch.
    pub total_evaluations: usize,
    /// Bias reports produced.
    pub bias_reports_count: usize,
    /// Distinct agents in the batch.
    pub unique_agents: usize,
    /// Whether the evaluation counted as a significant intervention.
    pub significant_intervention: bool,
    /// When the evaluation was produced.
    pub timestamp: DateTime<Utc>,
}

/// Aggregate statistics over a Sentinel's lifetime and retained history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentinelStatistics {
    /// Evaluations performed since construction or the last reset.
    pub total_analyses: u64,
    /// Evaluations currently held in the analysis history.
    pub retained_analyses: usize,
    /// Significant interventions since construction or the last reset.
    pub intervention_count: u64,
    /// `intervention_count / total_analyses`.
    pub intervention_rate: f64,
    /// Mean diversity score over the retained history.
    pub average_diversity_score: f64,
    /// Fraction of retained evaluations with bias detected.
    pub bias_detection_rate: f64,
    /// Mean confidence over the retained history.
    pub average_confidence: f64,
    /// Trends over the most recent evaluations.
    pub recent_performance: RecentPerformance,
}

/// Least-squares slopes over the most recent evaluations.
///
/// Positive slopes mean the quantity is rising from one evaluation to the
/// next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentPerformance {
    /// Evaluations the trends were computed over (at most 10).
    pub window: usize,
    /// Slope of the diversity score.
    pub diversity_trend: f64,
    /// Slope of the significant-intervention flag (0 or 1).
    pub intervention_trend: f64,
    /// Slope of the confidence.
    pub confidence_trend: f64,
}
