//! Evaluation sessions.
//!
//! A session binds one [`BatchAggregator`] and one [`Sentinel`] to a single
//! decision process, so concurrent sessions never share history.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sentinel_council::{
    BatchAggregator, BatchResult, EvaluationContext, EvaluatorAgent, ExecutionMode,
};

use crate::{config::SentinelConfig, evaluation::SentinelEvaluation, sentinel::Sentinel, Result};

/// Output of one session step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    /// Raw batch from the aggregator.
    pub batch: BatchResult,
    /// Sentinel verdict on the successful evaluations. `None` when every
    /// agent failed and there is nothing to recommend.
    pub evaluation: Option<SentinelEvaluation>,
}

impl SessionOutcome {
    /// Returns true if the step produced a Sentinel evaluation.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        self.evaluation.is_some()
    }
}

/// Aggregator and Sentinel scoped to one decision session.
///
/// # Example
///
/// ```rust,ignore
/// let mut session = EvaluationSession::new(SentinelConfig::default())?;
/// let outcome = session
///     .run(&agents, &state, &context, ExecutionMode::Parallel)
///     .await;
///
/// if let Some(evaluation) = &outcome.evaluation {
///     let scores: Vec<f64> = outcome.batch.successful_evaluations().iter().map(|e| e.score).collect();
///     let corrected = session.sentinel_mut().adjust_scores(&scores, evaluation);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct EvaluationSession {
    aggregator: BatchAggregator,
    sentinel: Sentinel,
}

impl EvaluationSession {
    /// Create a session from one configuration.
    pub fn new(config: SentinelConfig) -> Result<Self> {
        let aggregator = BatchAggregator::with_config(config.batch.clone())?;
        let sentinel = Sentinel::new(config)?;
        Ok(Self {
            aggregator,
            sentinel,
        })
    }

    /// Create a session from pre-built parts.
    #[must_use]
    pub const fn from_parts(aggregator: BatchAggregator, sentinel: Sentinel) -> Self {
        Self {
            aggregator,
            sentinel,
        }
    }

    /// Returns the aggregator.
    #[must_use]
    pub const fn aggregator(&self) -> &BatchAggregator {
        &self.aggregator
    }

    /// Returns the Sentinel.
    #[must_use]
    pub const fn sentinel(&self) -> &Sentinel {
        &self.sentinel
    }

    /// Returns the Sentinel mutably, for corrections and resets.
    pub fn sentinel_mut(&mut self) -> &mut Sentinel {
        &mut self.sentinel
    }

    /// Consult every agent, then evaluate the successful outputs.
    pub async fn run<S>(
        &mut self,
        agents: &[Box<dyn EvaluatorAgent<S>>],
        state: &S,
        context: &EvaluationContext,
        mode: ExecutionMode,
    ) -> SessionOutcome
    where
        S: ?Sized + Sync,
    {
        let batch = self.aggregator.run_batch(agents, state, context, mode).await;

        if !batch.has_usable_evaluations() {
            warn!(
                "No agent produced a usable evaluation for state '{}'; skipping sentinel",
                context.state_id
            );
            return SessionOutcome {
                batch,
                evaluation: None,
            };
        }

        let evaluations = batch.successful_evaluations();
        let evaluation = self.sentinel.evaluate(&evaluations, context);
        debug!(
            "Session step for '{}': {} evaluations, bias {}, diversity {:.3}",
            context.state_id,
            evaluations.len(),
            evaluation.bias_detected,
            evaluation.diversity_score
        );

        SessionOutcome {
            batch,
            evaluation: Some(evaluation),
        }
    }

    /// Run with the aggregator's default mode.
    pub async fn run_default<S>(
        &mut self,
        agents: &[Box<dyn EvaluatorAgent<S>>],
        state: &S,
        context: &EvaluationContext,
    ) -> SessionOutcome
    where
        S: ?Sized + Sync,
    {
        let mode = self.aggregator.config().default_mode;
        self.run(agents, state, context, mode).await
    }
}
