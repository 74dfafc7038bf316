//! Evaluation records and the evaluator agent capability.
//!
//! Defines the [`EvaluatorAgent`] trait implemented by external scorers and
//! the records they exchange with the rest of the system:
//!
//! | Type | Role |
//! |------|------|
//! | [`EvaluationResult`] | One agent's score for one decision point |
//! | [`EvaluationContext`] | Decision point metadata shared by a batch |
//!
//! Results are immutable once created. Corrections produced downstream are
//! kept as separate adjustment values and never written back into a result.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Score assigned to a fallback result when an agent fails.
pub const FALLBACK_SCORE: f64 = 0.5;

/// Confidence assigned to a fallback result when an agent fails.
pub const FALLBACK_CONFIDENCE: f64 = 0.1;

/// Declared score range for evaluation results.
pub const SCORE_RANGE: std::ops::RangeInclusive<f64> = -1.0..=1.0;

/// A single agent's evaluation of a decision point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Identity of the agent that produced this result.
    pub agent_id: String,
    /// Score, nominally in [-1, 1] and 0.5-centered in practice.
    pub score: f64,
    /// Confidence in the score (0.0 to 1.0).
    pub confidence: f64,
    /// Free-text justification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// When the evaluation was produced. Defaults to now when absent.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Time the agent spent producing the evaluation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_time_ms: Option<u64>,
    /// Open metadata supplied by the agent.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl EvaluationResult {
    /// Creates a result stamped with the current time.
    pub fn new(agent_id: impl Into<String>, score: f64, confidence: f64) -> Self {
        Self {
            agent_id: agent_id.into(),
            score,
            confidence,
            reasoning: None,
            timestamp: Utc::now(),
            evaluation_time_ms: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Creates the neutral result used in place of a failed evaluation.
    pub fn fallback(agent_id: impl Into<String>) -> Self {
        Self::new(agent_id, FALLBACK_SCORE, FALLBACK_CONFIDENCE)
    }

    /// Attaches reasoning text.
    #[must_use]
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Overrides the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Records the time the agent spent.
    #[must_use]
    pub fn with_evaluation_time(mut self, millis: u64) -> Self {
        self.evaluation_time_ms = Some(millis);
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns true if score and confidence are finite and in range.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.score.is_finite()
            && SCORE_RANGE.contains(&self.score)
            && self.confidence.is_finite()
            && (0.0..=1.0).contains(&self.confidence)
    }

    /// Replaces out-of-range values with safe defaults.
    ///
    /// A non-finite or out-of-range score becomes [`FALLBACK_SCORE`]. A
    /// non-finite confidence becomes [`FALLBACK_CONFIDENCE`]; a finite one is
    /// clamped into [0, 1]. Returns the repaired result and a description of
    /// each repair, empty when nothing changed.
    #[must_use]
    pub fn sanitized(mut self) -> (Self, Vec<String>) {
        let mut repairs = Vec::new();

        if !self.score.is_finite() || !SCORE_RANGE.contains(&self.score) {
            repairs.push(format!("score {} replaced with {}", self.score, FALLBACK_SCORE));
            self.score = FALLBACK_SCORE;
        }

        if !self.confidence.is_finite() {
            repairs.push(format!(
                "confidence {} replaced with {}",
                self.confidence, FALLBACK_CONFIDENCE
            ));
            self.confidence = FALLBACK_CONFIDENCE;
        } else if !(0.0..=1.0).contains(&self.confidence) {
            let clamped = self.confidence.clamp(0.0, 1.0);
            repairs.push(format!("confidence {} clamped to {}", self.confidence, clamped));
            self.confidence = clamped;
        }

        (self, repairs)
    }
}

/// Decision point metadata accompanying an evaluation batch.
///
/// `depth` doubles as the position bucket for positional-bias detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// Identifier of the state being evaluated.
    pub state_id: String,
    /// Search depth of the state.
    #[serde(default)]
    pub depth: u32,
    /// Actions available from the state.
    #[serde(default)]
    pub available_action_ids: Vec<String>,
    /// Prior results supplied by the caller.
    #[serde(default)]
    pub evaluation_history: Vec<EvaluationResult>,
}

impl EvaluationContext {
    /// Creates a context at depth 0.
    pub fn new(state_id: impl Into<String>) -> Self {
        Self {
            state_id: state_id.into(),
            depth: 0,
            available_action_ids: Vec::new(),
            evaluation_history: Vec::new(),
        }
    }

    /// Sets the search depth.
    #[must_use]
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Adds an available action.
    #[must_use]
    pub fn with_action(mut self, action_id: impl Into<String>) -> Self {
        self.available_action_ids.push(action_id.into());
        self
    }

    /// Replaces the prior evaluation history.
    #[must_use]
    pub fn with_history(mut self, history: Vec<EvaluationResult>) -> Self {
        self.evaluation_history = history;
        self
    }
}

/// An external scorer consulted by the batch aggregator.
///
/// Implementations typically call out to a model provider. They may fail in
/// any way; the aggregator isolates each failure and substitutes a fallback
/// result, so implementations should return errors rather than retrying
/// indefinitely.
///
/// `S` is the caller's decision state. It is only borrowed for the duration
/// of the call.
#[async_trait]
pub trait EvaluatorAgent<S: ?Sized + Sync>: Send + Sync {
    /// Stable identity of this agent.
    fn id(&self) -> &str;

    /// Provider family, used to measure approach diversity.
    fn provider_type(&self) -> &str;

    /// Scores `state` in `context`.
    async fn evaluate(&self, state: &S, context: &EvaluationContext) -> Result<EvaluationResult>;
}
