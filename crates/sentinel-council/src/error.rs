//! Error types for the evaluator council.
//!
//! Agent failures are values, not control flow: the batch aggregator
//! converts every [`CouncilError`] returned by an agent into a fallback
//! output instead of propagating it.

use thiserror::Error;

/// Errors that can occur while collecting evaluations.
#[derive(Debug, Error)]
pub enum CouncilError {
    /// An evaluator agent failed to produce an evaluation.
    #[error("Evaluator '{agent}' failed: {message}")]
    EvaluatorFailure {
        /// Identity of the failing agent.
        agent: String,
        /// Failure description.
        message: String,
    },

    /// The agent's response could not be interpreted.
    #[error("Malformed response from '{agent}': {message}")]
    MalformedResponse {
        /// Identity of the agent.
        agent: String,
        /// What was wrong with the response.
        message: String,
    },

    /// The agent gave up after its own time budget.
    #[error("Evaluator '{agent}' timed out after {elapsed_ms}ms")]
    Timeout {
        /// Identity of the agent.
        agent: String,
        /// Elapsed time before the agent gave up.
        elapsed_ms: u64,
    },

    /// The agent's evaluation future panicked.
    #[error("Evaluator '{agent}' panicked: {message}")]
    Panicked {
        /// Identity of the agent.
        agent: String,
        /// Panic payload, if it was a string.
        message: String,
    },

    /// Batch configuration is invalid.
    #[error("Invalid batch configuration: {0}")]
    InvalidConfig(String),
}

impl CouncilError {
    /// Short machine-readable name of the error kind.
    ///
    /// Stored in [`AgentError::error_type`](crate::AgentError) so failures can
    /// be grouped without parsing messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EvaluatorFailure { .. } => "evaluator_failure",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Timeout { .. } => "timeout",
            Self::Panicked { .. } => "panic",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}
