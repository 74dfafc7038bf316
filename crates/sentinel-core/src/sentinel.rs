//! The Sentinel orchestrator.
//!
//! This module provides the meta-evaluation entry point. The [`Sentinel`]
//! struct drives the bias detector and diversity analyzer over each batch,
//! turns their findings into score adjustments and recommendations, and
//! keeps a bounded history for trend statistics.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use tracing::{debug, info};

use sentinel_council::{EvaluationContext, EvaluationResult};
use sentinel_monitor::{
    stats, BiasDetector, BiasReport, BoundedHistory, DiversityAnalysis, DiversityAnalyzer,
};

use crate::{
    config::SentinelConfig,
    correction::ScoreCorrector,
    evaluation::{EvaluationMetadata, RecentPerformance, SentinelEvaluation, SentinelStatistics},
    Result,
};

/// Adjustment per unit of bias severity for each affected agent.
const BIAS_PENALTY: f64 = 0.1;
/// Boost for under-represented agents when diversity is low.
const PARTICIPATION_BOOST: f64 = 0.05;
/// Participation share below which an agent counts as under-represented.
const PARTICIPATION_SHARE: f64 = 0.2;
/// Evaluations at which sample confidence saturates.
const SAMPLE_SATURATION: f64 = 5.0;
/// Bias confidence when no detector reports.
const NO_BIAS_CONFIDENCE: f64 = 0.8;
/// Fraction of the diversity threshold below which diversity alone is a
/// significant intervention.
const INTERVENTION_DIVERSITY_FACTOR: f64 = 0.8;
/// Number of recent evaluations used for trend statistics.
const TREND_WINDOW: usize = 10;

/// Meta-evaluator over evaluator agent batches.
///
/// Owns one [`BiasDetector`], one [`DiversityAnalyzer`], the score corrector
/// and a bounded analysis history.
///
/// # Pipeline
///
/// For every batch:
/// 1. Run all four bias detectors
/// 2. Analyze diversity
/// 3. Derive per-agent score adjustments
/// 4. Merge recommendations
/// 5. Score confidence and decide whether this is a significant intervention
/// 6. Record the evaluation
///
/// # Thread Safety
///
/// Single writer. Histories are mutated through `&mut self`; one Sentinel
/// belongs to one session. Share it behind a lock if several tasks must
/// reach it.
///
/// # Example
///
/// ```rust
/// use sentinel_core::{Sentinel, SentinelConfig};
/// use sentinel_council::{EvaluationContext, EvaluationResult};
///
/// let mut sentinel = Sentinel::with_seed(SentinelConfig::default(), 7)?;
/// let batch = vec![
///     EvaluationResult::new("alpha", 0.2, 0.7),
///     EvaluationResult::new("beta", 0.6, 0.8),
///     EvaluationResult::new("gamma", 0.9, 0.6),
/// ];
///
/// let evaluation = sentinel.evaluate(&batch, &EvaluationContext::new("root"));
/// let corrected = sentinel.adjust_scores(&[0.2, 0.6, 0.9], &evaluation);
///
/// assert_eq!(corrected.len(), 3);
/// assert_eq!(sentinel.statistics().total_analyses, 1);
/// # Ok::<(), sentinel_core::SentinelError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Sentinel {
    /// Configuration.
    config: SentinelConfig,

    /// Bias detection with its rolling evaluation history.
    detector: BiasDetector,

    /// Diversity analysis.
    analyzer: DiversityAnalyzer,

    /// Score correction policy and random source.
    corrector: ScoreCorrector,

    /// Past evaluations, oldest first.
    history: BoundedHistory<SentinelEvaluation>,

    /// Evaluations performed.
    total_analyses: u64,

    /// Significant interventions performed.
    intervention_count: u64,
}

impl Sentinel {
    /// Create a new Sentinel with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration section is invalid.
    pub fn new(config: SentinelConfig) -> Result<Self> {
        config.validate()?;

        let detector = BiasDetector::with_config(config.bias.clone())?;
        let analyzer = DiversityAnalyzer::with_config(config.diversity.clone())?;
        let corrector = ScoreCorrector::new(
            config.correction.clone(),
            config.diversity.diversity_threshold,
        );
        let history = BoundedHistory::new(config.correction.history_capacity);

        info!(
            "Sentinel initialized: temporal window {}, diversity threshold {}, history {}",
            config.bias.temporal_window,
            config.diversity.diversity_threshold,
            config.correction.history_capacity
        );

        Ok(Self {
            config,
            detector,
            analyzer,
            corrector,
            history,
            total_analyses: 0,
            intervention_count: 0,
        })
    }

    /// Create a Sentinel whose score perturbation is seeded with `seed`.
    pub fn with_seed(mut config: SentinelConfig, seed: u64) -> Result<Self> {
        config.correction.seed = Some(seed);
        Self::new(config)
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SentinelConfig {
        &self.config
    }

    /// Returns the bias detector.
    #[must_use]
    pub const fn bias_detector(&self) -> &BiasDetector {
        &self.detector
    }

    /// Returns the diversity analyzer.
    #[must_use]
    pub const fn diversity_analyzer(&self) -> &DiversityAnalyzer {
        &self.analyzer
    }

    /// Returns the analysis history, oldest first.
    #[must_use]
    pub const fn history(&self) -> &BoundedHistory<SentinelEvaluation> {
        &self.history
    }

    /// Returns the most recent evaluation.
    #[must_use]
    pub fn last_evaluation(&self) -> Option<&SentinelEvaluation> {
        self.history.last()
    }

    /// Returns the number of evaluations performed.
    #[inline]
    #[must_use]
    pub const fn total_analyses(&self) -> u64 {
        self.total_analyses
    }

    /// Returns the number of significant interventions.
    #[inline]
    #[must_use]
    pub const fn intervention_count(&self) -> u64 {
        self.intervention_count
    }

    /// Evaluate a batch that shares one context.
    ///
    /// Positional bias needs one context per evaluation, so it only runs
    /// here for single-evaluation batches; use
    /// [`evaluate_with_contexts`](Self::evaluate_with_contexts) to enable it.
    pub fn evaluate(
        &mut self,
        evaluations: &[EvaluationResult],
        context: &EvaluationContext,
    ) -> SentinelEvaluation {
        self.evaluate_with_contexts(evaluations, std::slice::from_ref(context))
    }

    /// Evaluate a batch where `contexts[i]` accompanies `evaluations[i]`.
    ///
    /// Positional bias is skipped when the lengths differ.
    pub fn evaluate_with_contexts(
        &mut self,
        evaluations: &[EvaluationResult],
        contexts: &[EvaluationContext],
    ) -> SentinelEvaluation {
        debug!("Sentinel evaluating {} evaluations", evaluations.len());

        let bias_reports = self.detector.detect_all(evaluations, contexts);
        self.detector.add_to_history(evaluations);

        let diversity_analysis = self.analyzer.analyze(evaluations);
        let score_adjustments = self.score_adjustments(evaluations, &bias_reports, &diversity_analysis);
        let recommendations = merge_recommendations(&bias_reports, &diversity_analysis);
        let confidence = evaluation_confidence(evaluations.len(), &bias_reports, &diversity_analysis);

        let bias_detected = !bias_reports.is_empty();
        let diversity_score = diversity_analysis.overall_score;
        let max_adjustment = score_adjustments.values().map(|a| a.abs()).fold(0.0, f64::max);
        let significant_intervention = bias_detected
            || diversity_score < self.config.diversity.diversity_threshold * INTERVENTION_DIVERSITY_FACTOR
            || max_adjustment > self.config.correction.max_correction;

        self.total_analyses += 1;
        if significant_intervention {
            self.intervention_count += 1;
            info!(
                "Significant intervention: {} bias report(s), diversity {:.3}, max adjustment {:.3}",
                bias_reports.len(),
                diversity_score,
                max_adjustment
            );
        }

        let unique_agents = evaluations
            .iter()
            .map(|e| e.agent_id.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        let evaluation = SentinelEvaluation {
            bias_detected,
            diversity_score,
            recommendations,
            score_adjustments,
            confidence,
            metadata: EvaluationMetadata {
                total_evaluations: evaluations.len(),
                bias_reports_count: bias_reports.len(),
                unique_agents,
                significant_intervention,
                timestamp: Utc::now(),
            },
            bias_reports,
            diversity_analysis,
        };

        self.history.push(evaluation.clone());
        evaluation
    }

    /// Apply an evaluation's corrections to raw scores.
    ///
    /// Returns the scores unchanged unless the evaluation is confident
    /// enough and found bias or low diversity.
    pub fn adjust_scores(&mut self, raw_scores: &[f64], evaluation: &SentinelEvaluation) -> Vec<f64> {
        self.corrector.adjust_scores(raw_scores, evaluation)
    }

    /// Apply an evaluation's per-agent corrections to scores keyed by agent.
    pub fn adjust_agent_scores(
        &mut self,
        raw_scores: &BTreeMap<String, f64>,
        evaluation: &SentinelEvaluation,
    ) -> BTreeMap<String, f64> {
        self.corrector.adjust_agent_scores(raw_scores, evaluation)
    }

    /// Aggregate statistics over the lifetime counters and retained history.
    #[must_use]
    pub fn statistics(&self) -> SentinelStatistics {
        let retained = self.history.len();
        let intervention_rate = if self.total_analyses == 0 {
            0.0
        } else {
            self.intervention_count as f64 / self.total_analyses as f64
        };

        let diversity: Vec<f64> = self.history.iter().map(|e| e.diversity_score).collect();
        let confidence: Vec<f64> = self.history.iter().map(|e| e.confidence).collect();
        let biased = self.history.iter().filter(|e| e.bias_detected).count();

        SentinelStatistics {
            total_analyses: self.total_analyses,
            retained_analyses: retained,
            intervention_count: self.intervention_count,
            intervention_rate,
            average_diversity_score: stats::mean(&diversity),
            bias_detection_rate: if retained == 0 {
                0.0
            } else {
                biased as f64 / retained as f64
            },
            average_confidence: stats::mean(&confidence),
            recent_performance: self.recent_performance(),
        }
    }

    /// Clear every history and counter for a new session.
    ///
    /// A configured seed restarts the perturbation sequence.
    pub fn reset(&mut self) {
        self.history.clear();
        self.detector.clear_history();
        self.total_analyses = 0;
        self.intervention_count = 0;
        if let Some(seed) = self.config.correction.seed {
            self.corrector.reseed(seed);
        }
        debug!("Sentinel reset");
    }

    fn score_adjustments(
        &self,
        evaluations: &[EvaluationResult],
        bias_reports: &[BiasReport],
        diversity: &DiversityAnalysis,
    ) -> BTreeMap<String, f64> {
        let mut adjustments: BTreeMap<String, f64> = BTreeMap::new();

        for report in bias_reports {
            for agent in &report.affected_agents {
                *adjustments.entry(agent.clone()).or_default() -= report.severity * BIAS_PENALTY;
            }
        }

        if diversity.overall_score < self.config.diversity.diversity_threshold && !evaluations.is_empty() {
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for evaluation in evaluations {
                *counts.entry(evaluation.agent_id.as_str()).or_default() += 1;
            }
            let total = evaluations.len() as f64;
            for (agent, count) in counts {
                if (count as f64 / total) < PARTICIPATION_SHARE {
                    *adjustments.entry(agent.to_string()).or_default() += PARTICIPATION_BOOST;
                }
            }
        }

        adjustments
    }

    fn recent_performance(&self) -> RecentPerformance {
        let recent: Vec<&SentinelEvaluation> = self.history.latest(TREND_WINDOW).collect();
        let series = |f: fn(&SentinelEvaluation) -> f64| -> Vec<f64> {
            recent.iter().map(|e| f(e)).collect()
        };

        RecentPerformance {
            window: recent.len(),
            diversity_trend: stats::least_squares_slope(&series(|e| e.diversity_score)),
            intervention_trend: stats::least_squares_slope(&series(|e| {
                if e.metadata.significant_intervention {
                    1.0
                } else {
                    0.0
                }
            })),
            confidence_trend: stats::least_squares_slope(&series(|e| e.confidence)),
        }
    }
}

/// Union of report and diversity recommendations, first occurrence wins.
fn merge_recommendations(reports: &[BiasReport], diversity: &DiversityAnalysis) -> Vec<String> {
    let mut seen = BTreeSet::new();
    reports
        .iter()
        .flat_map(|r| r.recommendations.iter())
        .chain(diversity.recommendations.iter())
        .filter(|r| seen.insert(r.as_str()))
        .cloned()
        .collect()
}

fn evaluation_confidence(n: usize, reports: &[BiasReport], diversity: &DiversityAnalysis) -> f64 {
    let sample = (n as f64 / SAMPLE_SATURATION).min(1.0);
    let bias = if reports.is_empty() {
        NO_BIAS_CONFIDENCE
    } else {
        reports.iter().map(|r| r.confidence).sum::<f64>() / reports.len() as f64
    };
    (sample + diversity.confidence + bias) / 3.0
}
