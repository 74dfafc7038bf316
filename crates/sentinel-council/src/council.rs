//! Batch aggregator fanning out to evaluator agents.
//!
//! The aggregator is the only place where agent calls happen. It consults
//! every agent, isolates each failure and condenses the outputs into a
//! [`BatchResult`].
//!
//! ## Failure Isolation
//!
//! | Agent behavior | Output |
//! |----------------|--------|
//! | Returns a valid result | Success, result kept as-is |
//! | Returns an out-of-range result | Success, result sanitized and logged |
//! | Returns an error | Fallback result, `error.has_error = true` |
//! | Panics inside its future | Fallback result, `error.type = "panic"` |
//!
//! `run_batch` itself never fails.
//!
//! ## Time Limits
//!
//! [`BatchConfig::time_limit_ms`] is advisory. Agent calls are never
//! cancelled by the aggregator; a batch that overruns the limit is logged
//! and marked with [`BatchResult::exceeded_time_limit`]. Callers that need a
//! hard deadline wrap `run_batch` in their executor's timeout.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::CouncilError;
use crate::evaluator::{EvaluationContext, EvaluationResult, EvaluatorAgent};
use crate::summary::{BatchSummary, QuickDiversity};
use crate::Result;

/// How agent calls within a batch are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// All calls issued concurrently, joined when every call completes.
    #[default]
    Parallel,
    /// Calls issued one at a time in input order.
    Sequential,
}

/// Configuration for the batch aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Mode used by [`BatchAggregator::run`].
    pub default_mode: ExecutionMode,
    /// Advisory wall-clock budget for a batch.
    pub time_limit_ms: Option<u64>,
    /// Repair out-of-range scores and confidences on ingestion.
    pub sanitize_outputs: bool,
}

impl BatchConfig {
    /// Creates a config with default values.
    ///
    /// Defaults: parallel mode, no time limit, sanitization enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            default_mode: ExecutionMode::Parallel,
            time_limit_ms: None,
            sanitize_outputs: true,
        }
    }

    /// Sets the default execution mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// Sets the advisory time limit.
    #[must_use]
    pub const fn with_time_limit(mut self, millis: u64) -> Self {
        self.time_limit_ms = Some(millis);
        self
    }

    /// Enables or disables output sanitization.
    #[must_use]
    pub const fn with_sanitize(mut self, enabled: bool) -> Self {
        self.sanitize_outputs = enabled;
        self
    }

    /// Checks the configuration for invalid values.
    pub fn validate(&self) -> Result<()> {
        if self.time_limit_ms == Some(0) {
            return Err(CouncilError::InvalidConfig(
                "time_limit_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Error details attached to an agent output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentError {
    /// Whether the agent failed.
    pub has_error: bool,
    /// Failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failure kind, see [`CouncilError::kind`].
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Whether the carried result is a fallback.
    pub is_fallback: bool,
}

impl AgentError {
    /// No error.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            has_error: false,
            message: None,
            error_type: None,
            is_fallback: false,
        }
    }

    /// An error whose output carries a fallback result.
    pub fn fallback(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            has_error: true,
            message: Some(message.into()),
            error_type: Some(kind.into()),
            is_fallback: true,
        }
    }

    fn from_error(err: &CouncilError) -> Self {
        Self::fallback(err.kind(), err.to_string())
    }
}

impl Default for AgentError {
    fn default() -> Self {
        Self::none()
    }
}

/// Timing recorded for one agent call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Processing {
    /// When the call was issued.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the call.
    pub duration_ms: u64,
    /// Extra processing details.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl Processing {
    /// Creates a processing record started now.
    #[must_use]
    pub fn new(duration_ms: u64) -> Self {
        Self {
            started_at: Utc::now(),
            duration_ms,
            metadata: BTreeMap::new(),
        }
    }
}

/// One agent's contribution to a batch.
///
/// Failed agents still carry a neutral fallback result so downstream code
/// never has to branch on missing data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    /// The evaluation, or a fallback when the agent failed.
    pub result: EvaluationResult,
    /// Provider family of the agent.
    pub provider_type: String,
    /// Error details.
    pub error: AgentError,
    /// Timing details.
    pub processing: Processing,
}

impl AgentOutput {
    /// Returns true if the agent produced its own result.
    #[inline]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !self.error.has_error
    }
}

/// Outputs and statistics for one decision point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// One output per agent, in input order.
    pub agent_outputs: Vec<AgentOutput>,
    /// Counts and timing.
    pub summary: BatchSummary,
    /// Quick diversity metrics.
    pub diversity: QuickDiversity,
    /// Mode the batch ran in.
    pub mode: ExecutionMode,
    /// True if the batch overran the advisory time limit.
    #[serde(default)]
    pub exceeded_time_limit: bool,
}

impl BatchResult {
    /// Builds a result and its statistics from agent outputs.
    #[must_use]
    pub fn from_outputs(agent_outputs: Vec<AgentOutput>, mode: ExecutionMode) -> Self {
        let summary = BatchSummary::from_outputs(&agent_outputs);
        let diversity = QuickDiversity::from_outputs(&agent_outputs);
        Self {
            agent_outputs,
            summary,
            diversity,
            mode,
            exceeded_time_limit: false,
        }
    }

    /// Returns true if at least one agent succeeded.
    ///
    /// A batch without successes carries no usable recommendation.
    #[must_use]
    pub fn has_usable_evaluations(&self) -> bool {
        self.summary.successful_agents > 0
    }

    /// Results of successful agents, in input order.
    #[must_use]
    pub fn successful_evaluations(&self) -> Vec<EvaluationResult> {
        self.agent_outputs
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.result.clone())
            .collect()
    }

    /// Results of every agent including fallbacks, in input order.
    #[must_use]
    pub fn all_evaluations(&self) -> Vec<EvaluationResult> {
        self.agent_outputs.iter().map(|o| o.result.clone()).collect()
    }
}

/// Fans out to evaluator agents and aggregates their outputs.
///
/// # Example
///
/// ```rust,ignore
/// let aggregator = BatchAggregator::new();
/// let batch = aggregator
///     .run_batch(&agents, &state, &context, ExecutionMode::Parallel)
///     .await;
///
/// if !batch.has_usable_evaluations() {
///     // every agent failed; nothing to recommend
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct BatchAggregator {
    config: BatchConfig,
}

impl BatchAggregator {
    /// Creates an aggregator with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an aggregator with a validated configuration.
    pub fn with_config(config: BatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Runs a batch in the configured default mode.
    pub async fn run<S>(
        &self,
        agents: &[Box<dyn EvaluatorAgent<S>>],
        state: &S,
        context: &EvaluationContext,
    ) -> BatchResult
    where
        S: ?Sized + Sync,
    {
        self.run_batch(agents, state, context, self.config.default_mode)
            .await
    }

    /// Consults every agent and aggregates the outputs.
    ///
    /// Outputs are returned in the order of `agents` regardless of mode.
    pub async fn run_batch<S>(
        &self,
        agents: &[Box<dyn EvaluatorAgent<S>>],
        state: &S,
        context: &EvaluationContext,
        mode: ExecutionMode,
    ) -> BatchResult
    where
        S: ?Sized + Sync,
    {
        debug!(
            "Running batch for state '{}' with {} agents ({:?})",
            context.state_id,
            agents.len(),
            mode
        );
        let start = Instant::now();

        let outputs = match mode {
            ExecutionMode::Parallel => {
                join_all(
                    agents
                        .iter()
                        .map(|agent| self.invoke(agent.as_ref(), state, context)),
                )
                .await
            }
            ExecutionMode::Sequential => {
                let mut outputs = Vec::with_capacity(agents.len());
                for agent in agents {
                    outputs.push(self.invoke(agent.as_ref(), state, context).await);
                }
                outputs
            }
        };

        let mut batch = BatchResult::from_outputs(outputs, mode);
        let elapsed_ms = elapsed_millis(start);

        if let Some(limit) = self.config.time_limit_ms {
            if elapsed_ms > limit {
                warn!(
                    "Batch for state '{}' took {}ms, over the advisory limit of {}ms",
                    context.state_id, elapsed_ms, limit
                );
                batch.exceeded_time_limit = true;
            }
        }

        debug!(
            "Batch complete: {}/{} agents succeeded in {}ms",
            batch.summary.successful_agents, batch.summary.total_agents, elapsed_ms
        );
        batch
    }

    async fn invoke<S>(
        &self,
        agent: &dyn EvaluatorAgent<S>,
        state: &S,
        context: &EvaluationContext,
    ) -> AgentOutput
    where
        S: ?Sized + Sync,
    {
        let started_at = Utc::now();
        let start = Instant::now();

        let outcome = AssertUnwindSafe(agent.evaluate(state, context))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                Err(CouncilError::Panicked {
                    agent: agent.id().to_string(),
                    message: panic_message(payload.as_ref()),
                })
            });
        let duration_ms = elapsed_millis(start);

        let processing = Processing {
            started_at,
            duration_ms,
            metadata: BTreeMap::new(),
        };

        match outcome {
            Ok(result) => AgentOutput {
                result: self.ingest(agent.id(), result, duration_ms),
                provider_type: agent.provider_type().to_string(),
                error: AgentError::none(),
                processing,
            },
            Err(err) => {
                warn!(agent = agent.id(), kind = err.kind(), "{}; using fallback", err);
                AgentOutput {
                    result: EvaluationResult::fallback(agent.id()),
                    provider_type: agent.provider_type().to_string(),
                    error: AgentError::from_error(&err),
                    processing,
                }
            }
        }
    }

    fn ingest(&self, agent_id: &str, mut result: EvaluationResult, duration_ms: u64) -> EvaluationResult {
        if result.agent_id.is_empty() {
            result.agent_id = agent_id.to_string();
        }
        if result.evaluation_time_ms.is_none() {
            result.evaluation_time_ms = Some(duration_ms);
        }
        if !self.config.sanitize_outputs {
            return result;
        }

        let (result, repairs) = result.sanitized();
        for repair in &repairs {
            warn!(agent = agent_id, "Sanitized evaluation: {}", repair);
        }
        result
    }
}

fn elapsed_millis(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
