//! # Bias Detector
//!
//! Statistical bias detection over evaluator agent output.
//!
//! ## Detectors
//!
//! | Bias | Input | Signal |
//! |------|-------|--------|
//! | Systematic | current batch | agent mean far from the group mean |
//! | Temporal | rolling history | window averages drift more than raw scores |
//! | Positional | batch + contexts | scores cluster by search depth |
//! | Confirmation | current batch | an agent's successive scores autocorrelate |
//!
//! Each detector is independent and returns `None` when its data
//! requirements are not met or nothing crosses its threshold. Insufficient
//! data is never an error.
//!
//! ## Rolling History
//!
//! The detector owns a bounded FIFO history of `temporal_window × 10`
//! evaluations. Only the temporal detector reads it, and only the owner
//! appends to it (after detection has run on a batch), so temporal bias is
//! always judged against evaluations that came before the current batch.
//!
//! ## Example
//!
//! ```rust
//! use sentinel_council::EvaluationResult;
//! use sentinel_monitor::{BiasConfig, BiasDetector};
//!
//! let detector = BiasDetector::with_config(BiasConfig::new().with_min_evaluations(3))?;
//! let batch: Vec<EvaluationResult> = (0..6)
//!     .map(|i| EvaluationResult::new(format!("agent-{}", i % 2), 0.5, 0.8))
//!     .collect();
//!
//! assert!(detector.detect_systematic_bias(&batch).is_none());
//! # Ok::<(), sentinel_monitor::MonitorError>(())
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use sentinel_council::{EvaluationContext, EvaluationResult};

use crate::error::{check_non_negative, MonitorError, Result};
use crate::history::BoundedHistory;
use crate::stats::{self, EPSILON};

/// Minimum evaluations an agent needs to be judged for systematic bias.
const SYSTEMATIC_MIN_PER_AGENT: usize = 3;
/// Minimum evaluations a depth bucket needs to count.
const POSITIONAL_MIN_PER_BUCKET: usize = 3;
/// Minimum paired evaluations for an agent's score/depth correlation.
const POSITIONAL_MIN_PER_AGENT: usize = 5;
/// Correlation magnitude above which an agent is depth-sensitive.
const POSITIONAL_CORRELATION: f64 = 0.6;
/// Minimum evaluations an agent needs for the autocorrelation test.
const CONFIRMATION_MIN_PER_AGENT: usize = 5;
/// Autocorrelation above which an agent is anchoring.
const CONFIRMATION_CORRELATION: f64 = 0.7;
/// Multiple of the mean per-agent drift above which an agent is flagged.
const TEMPORAL_AGENT_FACTOR: f64 = 1.5;
/// History capacity per temporal window.
const HISTORY_WINDOWS: usize = 10;

/// Kind of bias a report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BiasType {
    /// Persistent per-agent deviation from the group consensus.
    Systematic,
    /// Drift of the agent pool across time windows.
    Temporal,
    /// Scores that depend on search depth.
    Positional,
    /// Anchoring on an agent's own previous output.
    Confirmation,
}

impl fmt::Display for BiasType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Systematic => write!(f, "systematic"),
            Self::Temporal => write!(f, "temporal"),
            Self::Positional => write!(f, "positional"),
            Self::Confirmation => write!(f, "confirmation"),
        }
    }
}

/// Findings of one detector for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasReport {
    /// Kind of bias detected.
    pub bias_type: BiasType,
    /// Severity (0.0 to 1.0).
    pub severity: f64,
    /// Human-readable summary.
    pub description: String,
    /// Agents implicated by the detector.
    pub affected_agents: BTreeSet<String>,
    /// Suggested remediations.
    pub recommendations: Vec<String>,
    /// Numbers the finding is based on.
    pub evidence: BTreeMap<String, f64>,
    /// Confidence in the finding (0.0 to 1.0).
    pub confidence: f64,
}

/// Thresholds and windows for bias detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasConfig {
    /// Evaluations a batch needs before systematic or positional detection.
    pub min_evaluations: usize,
    /// Normalized deviation above which an agent is systematically biased.
    pub systematic_bias_threshold: f64,
    /// Window/overall variance ratio that signals temporal bias.
    pub temporal_bias_threshold: f64,
    /// Bucket/overall variance ratio that signals positional bias.
    pub positional_bias_threshold: f64,
    /// Evaluations per temporal window.
    pub temporal_window: usize,
}

impl BiasConfig {
    /// Creates a config with default values.
    ///
    /// Defaults:
    /// - Minimum evaluations: 5
    /// - Systematic threshold: 1.0 standard deviations
    /// - Temporal threshold: 0.5
    /// - Positional threshold: 0.5
    /// - Temporal window: 10 evaluations
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_evaluations: 5,
            systematic_bias_threshold: 1.0,
            temporal_bias_threshold: 0.5,
            positional_bias_threshold: 0.5,
            temporal_window: 10,
        }
    }

    /// Sets the minimum batch size.
    #[must_use]
    pub const fn with_min_evaluations(mut self, min: usize) -> Self {
        self.min_evaluations = min;
        self
    }

    /// Sets the systematic bias threshold.
    #[must_use]
    pub const fn with_systematic_threshold(mut self, threshold: f64) -> Self {
        self.systematic_bias_threshold = threshold;
        self
    }

    /// Sets the temporal bias threshold.
    #[must_use]
    pub const fn with_temporal_threshold(mut self, threshold: f64) -> Self {
        self.temporal_bias_threshold = threshold;
        self
    }

    /// Sets the positional bias threshold.
    #[must_use]
    pub const fn with_positional_threshold(mut self, threshold: f64) -> Self {
        self.positional_bias_threshold = threshold;
        self
    }

    /// Sets the temporal window size.
    #[must_use]
    pub const fn with_temporal_window(mut self, window: usize) -> Self {
        self.temporal_window = window;
        self
    }

    /// Capacity of the rolling history implied by the window size.
    #[must_use]
    pub const fn history_capacity(&self) -> usize {
        self.temporal_window.saturating_mul(HISTORY_WINDOWS)
    }

    /// Checks every field for a usable value.
    pub fn validate(&self) -> Result<()> {
        if self.min_evaluations == 0 {
            return Err(MonitorError::invalid("min_evaluations", "must be at least 1"));
        }
        if self.temporal_window == 0 {
            return Err(MonitorError::invalid("temporal_window", "must be at least 1"));
        }
        if self.temporal_window.checked_mul(HISTORY_WINDOWS).is_none() {
            return Err(MonitorError::invalid(
                "temporal_window",
                format!("{} overflows the history capacity", self.temporal_window),
            ));
        }
        check_non_negative("systematic_bias_threshold", self.systematic_bias_threshold)?;
        check_non_negative("temporal_bias_threshold", self.temporal_bias_threshold)?;
        check_non_negative("positional_bias_threshold", self.positional_bias_threshold)?;
        Ok(())
    }
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Detects systematic, temporal, positional and confirmation bias.
///
/// # Thread Safety
///
/// Single writer. The history is mutated through `&mut self`; share the
/// owning sentinel behind a lock if it must be reached from several tasks.
#[derive(Debug, Clone)]
pub struct BiasDetector {
    config: BiasConfig,
    history: BoundedHistory<EvaluationResult>,
}

impl Default for BiasDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl BiasDetector {
    /// Creates a detector with default configuration.
    #[must_use]
    pub fn new() -> Self {
        let config = BiasConfig::default();
        let history = BoundedHistory::new(config.history_capacity());
        Self { config, history }
    }

    /// Creates a detector with a validated configuration.
    pub fn with_config(config: BiasConfig) -> Result<Self> {
        config.validate()?;
        let history = BoundedHistory::new(config.history_capacity());
        Ok(Self { config, history })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &BiasConfig {
        &self.config
    }

    /// Appends evaluations to the rolling history, evicting the oldest.
    pub fn add_to_history(&mut self, evaluations: &[EvaluationResult]) {
        let evicted = self.history.extend(evaluations.iter().cloned());
        if evicted > 0 {
            debug!("Bias history trimmed by {} evaluations", evicted);
        }
    }

    /// Returns the rolling history.
    #[must_use]
    pub const fn history(&self) -> &BoundedHistory<EvaluationResult> {
        &self.history
    }

    /// Empties the rolling history.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Runs all four detectors and collects their reports.
    ///
    /// Positional detection runs only when `contexts` pairs 1:1 with
    /// `evaluations`.
    #[must_use]
    pub fn detect_all(
        &self,
        evaluations: &[EvaluationResult],
        contexts: &[EvaluationContext],
    ) -> Vec<BiasReport> {
        [
            self.detect_systematic_bias(evaluations),
            self.detect_temporal_bias(),
            self.detect_positional_bias(evaluations, contexts),
            self.detect_confirmation_bias(evaluations),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Flags agents whose mean score sits far from the batch mean.
    ///
    /// An agent's bias score is `|agent_mean - overall_mean| / overall_std`.
    /// Only agents with at least 3 evaluations are judged.
    #[must_use]
    pub fn detect_systematic_bias(&self, evaluations: &[EvaluationResult]) -> Option<BiasReport> {
        if evaluations.len() < self.config.min_evaluations {
            debug!(
                "Systematic bias skipped: {} evaluations, need {}",
                evaluations.len(),
                self.config.min_evaluations
            );
            return None;
        }

        let scores: Vec<f64> = evaluations.iter().map(|e| e.score).collect();
        let overall_mean = stats::mean(&scores);
        let overall_std = stats::std_dev(&scores);

        let flagged: BTreeMap<&str, f64> = group_scores_by_agent(evaluations)
            .into_iter()
            .filter(|(_, agent_scores)| agent_scores.len() >= SYSTEMATIC_MIN_PER_AGENT)
            .map(|(agent, agent_scores)| {
                let bias = (stats::mean(&agent_scores) - overall_mean).abs() / (overall_std + EPSILON);
                (agent, bias)
            })
            .filter(|(_, bias)| *bias > self.config.systematic_bias_threshold)
            .collect();

        let max_bias = flagged.values().copied().fold(0.0, f64::max);
        if flagged.is_empty() {
            return None;
        }

        let severity = max_bias.min(1.0);
        let mut evidence = BTreeMap::from([
            ("overall_mean".to_string(), overall_mean),
            ("overall_std_dev".to_string(), overall_std),
            ("max_bias_score".to_string(), max_bias),
            ("flagged_agents".to_string(), flagged.len() as f64),
        ]);
        for (agent, bias) in &flagged {
            evidence.insert(format!("bias_score:{agent}"), *bias);
        }

        let affected: BTreeSet<String> = flagged.keys().map(|a| (*a).to_string()).collect();
        debug!("Systematic bias detected for {:?} (max score {:.3})", affected, max_bias);

        Some(BiasReport {
            bias_type: BiasType::Systematic,
            severity,
            description: format!(
                "{} agent(s) deviate from the consensus mean of {:.3} by up to {:.2} standard deviations",
                affected.len(),
                overall_mean,
                max_bias
            ),
            recommendations: vec![
                format!(
                    "Review evaluation criteria of {}: their scores deviate persistently from the group",
                    join_agents(&affected)
                ),
                "Recalibrate or down-weight consistently deviating agents".to_string(),
            ],
            affected_agents: affected,
            evidence,
            confidence: (severity * 1.2).min(1.0),
        })
    }

    /// Compares the spread of window averages in the rolling history to the
    /// spread of the raw scores.
    ///
    /// The history is split into consecutive windows of `temporal_window`
    /// evaluations; a trailing partial window is ignored.
    #[must_use]
    pub fn detect_temporal_bias(&self) -> Option<BiasReport> {
        let window = self.config.temporal_window;
        if self.history.len() < window * 2 {
            debug!(
                "Temporal bias skipped: history holds {}, need {}",
                self.history.len(),
                window * 2
            );
            return None;
        }

        let history: Vec<&EvaluationResult> = self.history.iter().collect();
        let window_count = history.len() / window;
        let windows: Vec<&[&EvaluationResult]> = history[..window_count * window].chunks(window).collect();
        if windows.len() < 2 {
            return None;
        }

        let window_averages: Vec<f64> = windows
            .iter()
            .map(|w| stats::mean(&w.iter().map(|e| e.score).collect::<Vec<_>>()))
            .collect();
        let all_scores: Vec<f64> = history.iter().map(|e| e.score).collect();

        let window_variance = stats::variance(&window_averages);
        let overall_variance = stats::variance(&all_scores);
        let ratio = window_variance / (overall_variance + EPSILON);

        if ratio < self.config.temporal_bias_threshold {
            debug!("No temporal bias: variance ratio {:.3}", ratio);
            return None;
        }

        let affected = drifting_agents(&windows);
        let severity = (ratio / 5.0).min(1.0);
        debug!("Temporal bias detected: variance ratio {:.3}", ratio);

        Some(BiasReport {
            bias_type: BiasType::Temporal,
            severity,
            description: format!(
                "Average scores drift across {} windows of {} evaluations (variance ratio {:.2})",
                windows.len(),
                window,
                ratio
            ),
            recommendations: vec![
                "Check for changes in agent prompts, models or inputs over the session".to_string(),
                "Periodically re-baseline agents against a fixed reference set".to_string(),
            ],
            affected_agents: affected,
            evidence: BTreeMap::from([
                ("window_variance".to_string(), window_variance),
                ("overall_variance".to_string(), overall_variance),
                ("variance_ratio".to_string(), ratio),
                ("window_count".to_string(), windows.len() as f64),
            ]),
            confidence: (windows.len() as f64 / 5.0).min(1.0),
        })
    }

    /// Checks whether scores cluster by search depth.
    ///
    /// `contexts[i]` supplies the depth of `evaluations[i]`; when the lengths
    /// differ the detector is skipped.
    #[must_use]
    pub fn detect_positional_bias(
        &self,
        evaluations: &[EvaluationResult],
        contexts: &[EvaluationContext],
    ) -> Option<BiasReport> {
        if evaluations.len() != contexts.len() {
            debug!(
                "Positional bias skipped: {} evaluations but {} contexts",
                evaluations.len(),
                contexts.len()
            );
            return None;
        }
        if evaluations.len() < self.config.min_evaluations {
            return None;
        }

        let mut buckets: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for (evaluation, context) in evaluations.iter().zip(contexts) {
            buckets.entry(context.depth).or_default().push(evaluation.score);
        }

        let bucket_averages: Vec<f64> = buckets
            .values()
            .filter(|scores| scores.len() >= POSITIONAL_MIN_PER_BUCKET)
            .map(|scores| stats::mean(scores))
            .collect();
        if bucket_averages.len() < 2 {
            return None;
        }

        let all_scores: Vec<f64> = evaluations.iter().map(|e| e.score).collect();
        let bucket_variance = stats::variance(&bucket_averages);
        let overall_variance = stats::variance(&all_scores);
        let ratio = bucket_variance / (overall_variance + EPSILON);

        if ratio < self.config.positional_bias_threshold {
            debug!("No positional bias: variance ratio {:.3}", ratio);
            return None;
        }

        let mut per_agent: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
        for (evaluation, context) in evaluations.iter().zip(contexts) {
            let (scores, depths) = per_agent.entry(evaluation.agent_id.as_str()).or_default();
            scores.push(evaluation.score);
            depths.push(f64::from(context.depth));
        }
        let affected: BTreeSet<String> = per_agent
            .into_iter()
            .filter(|(_, (scores, _))| scores.len() >= POSITIONAL_MIN_PER_AGENT)
            .filter(|(_, (scores, depths))| stats::pearson(scores, depths).abs() > POSITIONAL_CORRELATION)
            .map(|(agent, _)| agent.to_string())
            .collect();

        let severity = (ratio / 3.0).min(1.0);
        debug!("Positional bias detected: variance ratio {:.3}", ratio);

        Some(BiasReport {
            bias_type: BiasType::Positional,
            severity,
            description: format!(
                "Scores differ systematically across {} depth buckets (variance ratio {:.2})",
                bucket_averages.len(),
                ratio
            ),
            recommendations: vec![
                "Evaluate states independently of their search depth".to_string(),
                "Normalize scores per depth before comparing candidates".to_string(),
            ],
            affected_agents: affected,
            evidence: BTreeMap::from([
                ("bucket_variance".to_string(), bucket_variance),
                ("overall_variance".to_string(), overall_variance),
                ("variance_ratio".to_string(), ratio),
                ("bucket_count".to_string(), bucket_averages.len() as f64),
            ]),
            confidence: (bucket_averages.len() as f64 / 3.0).min(1.0),
        })
    }

    /// Flags agents whose successive scores are strongly autocorrelated.
    ///
    /// Each agent's evaluations are ordered by timestamp (ties keep input
    /// order) before computing the lag-1 autocorrelation.
    #[must_use]
    pub fn detect_confirmation_bias(&self, evaluations: &[EvaluationResult]) -> Option<BiasReport> {
        let mut grouped: BTreeMap<&str, Vec<&EvaluationResult>> = BTreeMap::new();
        for evaluation in evaluations {
            grouped.entry(evaluation.agent_id.as_str()).or_default().push(evaluation);
        }

        let mut flagged: BTreeMap<&str, f64> = BTreeMap::new();
        let mut longest = 0usize;
        for (agent, mut sequence) in grouped {
            if sequence.len() < CONFIRMATION_MIN_PER_AGENT {
                continue;
            }
            sequence.sort_by_key(|e| e.timestamp);
            let scores: Vec<f64> = sequence.iter().map(|e| e.score).collect();
            let correlation = stats::lag_one_autocorrelation(&scores);
            if correlation > CONFIRMATION_CORRELATION {
                flagged.insert(agent, correlation);
                longest = longest.max(scores.len());
            }
        }

        if flagged.is_empty() {
            return None;
        }

        let max_correlation = flagged.values().copied().fold(0.0, f64::max);
        let affected: BTreeSet<String> = flagged.keys().map(|a| (*a).to_string()).collect();
        let mut evidence = BTreeMap::from([
            ("max_autocorrelation".to_string(), max_correlation),
            ("flagged_agents".to_string(), flagged.len() as f64),
        ]);
        for (agent, correlation) in &flagged {
            evidence.insert(format!("autocorrelation:{agent}"), *correlation);
        }
        debug!("Confirmation bias detected for {:?}", affected);

        Some(BiasReport {
            bias_type: BiasType::Confirmation,
            severity: max_correlation.min(1.0),
            description: format!(
                "{} agent(s) anchor on their previous evaluations (lag-1 autocorrelation up to {:.2})",
                affected.len(),
                max_correlation
            ),
            recommendations: vec![
                format!(
                    "Evaluate each state without exposing {} to their earlier scores",
                    join_agents(&affected)
                ),
                "Shuffle evaluation order to break anchoring".to_string(),
            ],
            affected_agents: affected,
            evidence,
            confidence: (longest as f64 / 10.0).min(1.0),
        })
    }
}

fn group_scores_by_agent(evaluations: &[EvaluationResult]) -> BTreeMap<&str, Vec<f64>> {
    let mut grouped: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for evaluation in evaluations {
        grouped.entry(evaluation.agent_id.as_str()).or_default().push(evaluation.score);
    }
    grouped
}

/// Agents whose per-window averages vary more than 1.5× the mean per-agent
/// variance. Agents seen in fewer than two windows are not judged.
fn drifting_agents(windows: &[&[&EvaluationResult]]) -> BTreeSet<String> {
    let mut per_agent: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for window in windows {
        for (agent, scores) in group_scores_by_agent_refs(window) {
            per_agent.entry(agent).or_default().push(stats::mean(&scores));
        }
    }

    let variances: BTreeMap<&str, f64> = per_agent
        .into_iter()
        .filter(|(_, averages)| averages.len() >= 2)
        .map(|(agent, averages)| (agent, stats::variance(&averages)))
        .collect();
    if variances.is_empty() {
        return BTreeSet::new();
    }

    let mean_variance = variances.values().sum::<f64>() / variances.len() as f64;
    variances
        .into_iter()
        .filter(|(_, v)| *v > mean_variance * TEMPORAL_AGENT_FACTOR)
        .map(|(agent, _)| agent.to_string())
        .collect()
}

fn group_scores_by_agent_refs<'a>(window: &[&'a EvaluationResult]) -> BTreeMap<&'a str, Vec<f64>> {
    let mut grouped: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for evaluation in window {
        grouped.entry(evaluation.agent_id.as_str()).or_default().push(evaluation.score);
    }
    grouped
}

fn join_agents(agents: &BTreeSet<String>) -> String {
    agents.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
