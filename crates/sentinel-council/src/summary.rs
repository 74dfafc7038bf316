//! Batch summary and quick diversity metrics.
//!
//! These are cheap, unified statistics attached to every
//! [`BatchResult`](crate::BatchResult). The full diversity analysis lives in
//! `sentinel-monitor`; the numbers here only give the caller a first look at
//! whether a batch is usable.
//!
//! Failed outputs count toward totals and processing time but never toward
//! confidence or diversity, so a batch where every agent failed reports zero
//! for all of them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::council::AgentOutput;

/// Counts and timing for one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Number of agents consulted.
    pub total_agents: usize,
    /// Agents that returned a usable evaluation.
    pub successful_agents: usize,
    /// Agents whose output was replaced by a fallback.
    pub failed_agents: usize,
    /// Sum of processing time over all outputs.
    pub total_processing_time_ms: u64,
    /// Mean confidence over successful outputs (0 if none).
    pub average_confidence: f64,
}

impl BatchSummary {
    /// Summarizes a set of agent outputs.
    pub fn from_outputs(outputs: &[AgentOutput]) -> Self {
        let successful: Vec<&AgentOutput> = outputs.iter().filter(|o| o.is_success()).collect();
        let total_processing_time_ms = outputs.iter().map(|o| o.processing.duration_ms).sum();

        let average_confidence = if successful.is_empty() {
            0.0
        } else {
            successful.iter().map(|o| o.result.confidence).sum::<f64>() / successful.len() as f64
        };

        Self {
            total_agents: outputs.len(),
            successful_agents: successful.len(),
            failed_agents: outputs.len() - successful.len(),
            total_processing_time_ms,
            average_confidence,
        }
    }
}

/// Quick diversity metrics over successful outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuickDiversity {
    /// Population standard deviation of scores (0 with fewer than 2).
    pub score_variance: f64,
    /// Distinct words longer than 3 characters over total word count.
    pub opinion_divergence: f64,
    /// Distinct provider types over total outputs.
    pub approach_diversity: f64,
}

impl QuickDiversity {
    /// Computes quick diversity metrics for a set of agent outputs.
    pub fn from_outputs(outputs: &[AgentOutput]) -> Self {
        let successful: Vec<&AgentOutput> = outputs.iter().filter(|o| o.is_success()).collect();
        if successful.is_empty() {
            return Self::default();
        }

        let scores: Vec<f64> = successful.iter().map(|o| o.result.score).collect();
        let providers: BTreeSet<&str> = successful.iter().map(|o| o.provider_type.as_str()).collect();

        Self {
            score_variance: population_std_dev(&scores),
            opinion_divergence: opinion_divergence(
                successful.iter().filter_map(|o| o.result.reasoning.as_deref()),
            ),
            approach_diversity: providers.len() as f64 / outputs.len() as f64,
        }
    }
}

fn population_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Ratio of distinct long words to total words across reasoning texts.
///
/// Words are split on whitespace, stripped of surrounding punctuation and
/// compared case-insensitively.
fn opinion_divergence<'a>(texts: impl Iterator<Item = &'a str>) -> f64 {
    let mut total = 0usize;
    let mut distinct = BTreeSet::new();

    for word in texts.flat_map(str::split_whitespace) {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric());
        if word.is_empty() {
            continue;
        }
        total += 1;
        if word.chars().count() > 3 {
            distinct.insert(word.to_lowercase());
        }
    }

    if total == 0 {
        0.0
    } else {
        distinct.len() as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::council::{AgentError, Processing};
    use crate::EvaluationResult;

    fn ok(agent: &str, provider: &str, score: f64, confidence: f64, reasoning: Option<&str>) -> AgentOutput {
        let mut result = EvaluationResult::new(agent, score, confidence);
        result.reasoning = reasoning.map(str::to_string);
        AgentOutput {
            result,
            provider_type: provider.to_string(),
            error: AgentError::none(),
            processing: Processing::new(10),
        }
    }

    fn failed(agent: &str) -> AgentOutput {
        AgentOutput {
            result: EvaluationResult::fallback(agent),
            provider_type: "remote".to_string(),
            error: AgentError::fallback("timeout", "deadline exceeded"),
            processing: Processing::new(40),
        }
    }

    #[test]
    fn test_summary_counts() {
        let outputs = vec![ok("a", "p", 0.4, 0.8, None), failed("b"), ok("c", "p", 0.6, 0.6, None)];
        let summary = BatchSummary::from_outputs(&outputs);
        assert_eq!(summary.total_agents, 3);
        assert_eq!(summary.successful_agents, 2);
        assert_eq!(summary.failed_agents, 1);
        assert_eq!(summary.total_processing_time_ms, 60);
        assert!((summary.average_confidence - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_summary_all_failed() {
        let summary = BatchSummary::from_outputs(&[failed("a"), failed("b")]);
        assert_eq!(summary.successful_agents, 0);
        assert!(summary.average_confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn test_quick_diversity_all_failed_is_zero() {
        let diversity = QuickDiversity::from_outputs(&[failed("a"), failed("b")]);
        assert_eq!(diversity, QuickDiversity::default());
    }

    #[test]
    fn test_score_variance_single_output() {
        let diversity = QuickDiversity::from_outputs(&[ok("a", "p", 0.9, 0.5, None)]);
        assert!(diversity.score_variance.abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_variance_is_population_std_dev() {
        let outputs = vec![ok("a", "p", 0.2, 0.5, None), ok("b", "p", 0.6, 0.5, None)];
        let diversity = QuickDiversity::from_outputs(&outputs);
        assert!((diversity.score_variance - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_opinion_divergence() {
        // 6 words, distinct long words: "strong", "opening", "weak" -> 3
        let outputs = vec![
            ok("a", "p", 0.5, 0.5, Some("Strong opening.")),
            ok("b", "p", 0.5, 0.5, Some("a weak opening, strong")),
        ];
        let diversity = QuickDiversity::from_outputs(&outputs);
        assert!((diversity.opinion_divergence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_opinion_divergence_without_text() {
        let outputs = vec![ok("a", "p", 0.5, 0.5, None), ok("b", "p", 0.5, 0.5, Some("   "))];
        assert!(QuickDiversity::from_outputs(&outputs).opinion_divergence.abs() < f64::EPSILON);
    }

    #[test]
    fn test_approach_diversity() {
        let outputs = vec![
            ok("a", "openai", 0.5, 0.5, None),
            ok("b", "anthropic", 0.5, 0.5, None),
            ok("c", "openai", 0.5, 0.5, None),
            failed("d"),
        ];
        let diversity = QuickDiversity::from_outputs(&outputs);
        assert!((diversity.approach_diversity - 0.5).abs() < 1e-12);
    }
}
