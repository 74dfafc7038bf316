//! Score correction policy.
//!
//! Corrections are only applied when the Sentinel is confident enough in its
//! own evaluation and the evaluation found something worth correcting:
//!
//! ```text
//! gate = confidence ≥ intervention_threshold
//!        ∧ (bias_detected ∨ diversity_score < diversity_threshold)
//! ```
//!
//! Past the gate, each score receives the bias delta (scaled by
//! `correction_strength` and clamped to `±max_correction`) and, when
//! diversity is low, a small perturbation proportional to the diversity
//! deficit. The perturbation draws from a seedable [`StdRng`] so replays are
//! reproducible. Corrected scores are clamped to [-2, 2].

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::CorrectionConfig;
use crate::evaluation::SentinelEvaluation;

/// Bounds for corrected scores.
const SCORE_BOUND: f64 = 2.0;
/// Scale of the diversity perturbation relative to the deficit.
const PERTURBATION_SCALE: f64 = 0.1;

/// Applies [`SentinelEvaluation`] adjustments to raw scores.
#[derive(Debug, Clone)]
pub struct ScoreCorrector {
    config: CorrectionConfig,
    diversity_threshold: f64,
    rng: StdRng,
}

impl ScoreCorrector {
    /// Creates a corrector. The random source is seeded from `config.seed`
    /// when set, otherwise from OS entropy.
    #[must_use]
    pub fn new(config: CorrectionConfig, diversity_threshold: f64) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            diversity_threshold,
            rng,
        }
    }

    /// Returns the correction policy.
    #[must_use]
    pub const fn config(&self) -> &CorrectionConfig {
        &self.config
    }

    /// Restarts the random source from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Returns true if `evaluation` passes the correction gate.
    #[must_use]
    pub fn should_correct(&self, evaluation: &SentinelEvaluation) -> bool {
        evaluation.confidence >= self.config.intervention_threshold
            && (evaluation.bias_detected || self.diversity_is_low(evaluation))
    }

    /// Corrects a list of raw scores.
    ///
    /// The scores carry no agent identity, so every score receives the mean
    /// of the evaluation's per-agent adjustments, unflagged agents included.
    /// Callers that know which agent produced each score should use
    /// [`adjust_agent_scores`](Self::adjust_agent_scores) instead.
    ///
    /// The bias delta is clamped to `max_correction`.
    pub fn adjust_scores(&mut self, raw_scores: &[f64], evaluation: &SentinelEvaluation) -> Vec<f64> {
        if !self.should_correct(evaluation) {
            return raw_scores.to_vec();
        }

        let adjustments: Vec<f64> = evaluation.score_adjustments.values().copied().collect();
        let mean_adjustment = if adjustments.is_empty() {
            0.0
        } else {
            adjustments.iter().sum::<f64>() / adjustments.len() as f64
        };
        let delta = self.bias_delta(mean_adjustment);
        debug!(
            "Correcting {} scores: bias delta {:.4}",
            raw_scores.len(),
            delta
        );

        raw_scores
            .iter()
            .map(|score| {
                let perturbation = self.perturbation(evaluation);
                (score + delta + perturbation).clamp(-SCORE_BOUND, SCORE_BOUND)
            })
            .collect()
    }

    /// Corrects scores keyed by agent, applying each agent's own adjustment.
    ///
    /// Agents without an adjustment only receive the diversity perturbation.
    pub fn adjust_agent_scores(
        &mut self,
        raw_scores: &BTreeMap<String, f64>,
        evaluation: &SentinelEvaluation,
    ) -> BTreeMap<String, f64> {
        if !self.should_correct(evaluation) {
            return raw_scores.clone();
        }

        raw_scores
            .iter()
            .map(|(agent, score)| {
                let adjustment = evaluation.score_adjustments.get(agent).copied().unwrap_or(0.0);
                let delta = self.bias_delta(adjustment);
                let perturbation = self.perturbation(evaluation);
                let corrected = (score + delta + perturbation).clamp(-SCORE_BOUND, SCORE_BOUND);
                (agent.clone(), corrected)
            })
            .collect()
    }

    fn diversity_is_low(&self, evaluation: &SentinelEvaluation) -> bool {
        evaluation.diversity_score < self.diversity_threshold
    }

    fn bias_delta(&self, adjustment: f64) -> f64 {
        (adjustment * self.config.correction_strength)
            .clamp(-self.config.max_correction, self.config.max_correction)
    }

    fn perturbation(&mut self, evaluation: &SentinelEvaluation) -> f64 {
        if !self.diversity_is_low(evaluation) {
            return 0.0;
        }
        let deficit = self.diversity_threshold - evaluation.diversity_score;
        let u: f64 = self.rng.gen();
        (u - 0.5) * deficit * PERTURBATION_SCALE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::EvaluationMetadata;
    use chrono::Utc;
    use sentinel_monitor::DiversityAnalysis;

    fn evaluation(
        bias_detected: bool,
        diversity_score: f64,
        confidence: f64,
        adjustments: &[(&str, f64)],
    ) -> SentinelEvaluation {
        SentinelEvaluation {
            bias_detected,
            diversity_score,
            recommendations: Vec::new(),
            score_adjustments: adjustments
                .iter()
                .map(|(a, v)| ((*a).to_string(), *v))
                .collect(),
            confidence,
            bias_reports: Vec::new(),
            diversity_analysis: DiversityAnalysis::default(),
            metadata: EvaluationMetadata {
                total_evaluations: 0,
                bias_reports_count: 0,
                unique_agents: 0,
                significant_intervention: false,
                timestamp: Utc::now(),
            },
        }
    }

    fn corrector(seed: u64) -> ScoreCorrector {
        ScoreCorrector::new(CorrectionConfig::new().with_seed(seed), 0.3)
    }

    #[test]
    fn test_gate_requires_confidence() {
        let mut c = corrector(1);
        let eval = evaluation(true, 0.9, 0.5, &[("a", -0.1)]);
        assert!(!c.should_correct(&eval));
        assert_eq!(c.adjust_scores(&[0.4, 0.6], &eval), vec![0.4, 0.6]);
    }

    #[test]
    fn test_gate_requires_a_finding() {
        let c = corrector(1);
        assert!(!c.should_correct(&evaluation(false, 0.9, 0.95, &[])));
        assert!(c.should_correct(&evaluation(true, 0.9, 0.95, &[])));
        assert!(c.should_correct(&evaluation(false, 0.1, 0.95, &[])));
    }

    #[test]
    fn test_bias_delta_scaled_by_strength() {
        let mut c = corrector(1);
        let eval = evaluation(true, 0.9, 0.9, &[("a", -0.2), ("b", 0.0)]);
        let adjusted = c.adjust_scores(&[0.5], &eval);
        // mean -0.1, strength 0.5
        assert!((adjusted[0] - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_list_scores_share_one_delta() {
        let mut c = corrector(1);
        let eval = evaluation(true, 0.9, 0.9, &[("biased", -0.2), ("fair", 0.0)]);
        let adjusted = c.adjust_scores(&[0.8, 0.5], &eval);
        assert!((adjusted[0] - 0.75).abs() < 1e-12);
        assert!((adjusted[1] - 0.45).abs() < 1e-12);

        let keyed = BTreeMap::from([("biased".to_string(), 0.8), ("fair".to_string(), 0.5)]);
        let adjusted = corrector(1).adjust_agent_scores(&keyed, &eval);
        assert!((adjusted["fair"] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_bias_delta_clamped_to_max_correction() {
        let mut c = ScoreCorrector::new(
            CorrectionConfig::new().with_strength(1.0).with_max_correction(0.05),
            0.3,
        );
        let eval = evaluation(true, 0.9, 0.9, &[("a", -0.5)]);
        let adjusted = c.adjust_scores(&[0.5], &eval);
        assert!((adjusted[0] - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_results_clamped() {
        let mut c = ScoreCorrector::new(CorrectionConfig::new().with_strength(1.0), 0.3);
        let eval = evaluation(true, 0.9, 0.9, &[("a", 0.2)]);
        assert_eq!(c.adjust_scores(&[1.95, -5.0], &eval), vec![2.0, -2.0]);
    }

    #[test]
    fn test_perturbation_bounded_and_seeded() {
        let eval = evaluation(false, 0.1, 0.9, &[]);
        let raw = vec![0.5; 50];

        let first = corrector(99).adjust_scores(&raw, &eval);
        let second = corrector(99).adjust_scores(&raw, &eval);
        assert_eq!(first, second);

        // deficit 0.2 → perturbation within ±0.01
        assert!(first.iter().all(|s| (s - 0.5).abs() <= 0.01));
        assert!(first.iter().any(|s| (s - 0.5).abs() > 0.0));
    }

    #[test]
    fn test_reseed_restarts_sequence() {
        let eval = evaluation(false, 0.0, 0.9, &[]);
        let mut c = corrector(5);
        let first = c.adjust_scores(&[0.0, 0.0], &eval);
        c.reseed(5);
        assert_eq!(c.adjust_scores(&[0.0, 0.0], &eval), first);
    }

    #[test]
    fn test_agent_scores_use_own_adjustment() {
        let mut c = corrector(3);
        let eval = evaluation(true, 0.9, 0.9, &[("biased", -0.2)]);
        let raw = BTreeMap::from([("biased".to_string(), 0.8), ("fair".to_string(), 0.5)]);

        let adjusted = c.adjust_agent_scores(&raw, &eval);
        assert!((adjusted["biased"] - 0.7).abs() < 1e-12);
        assert!((adjusted["fair"] - 0.5).abs() < 1e-12);
    }
}
