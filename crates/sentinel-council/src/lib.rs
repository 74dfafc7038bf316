//! # Evaluator Council
//!
//! Collects independent evaluations of a decision point from multiple
//! evaluator agents and condenses them into a single batch.
//!
//! ## Overview
//!
//! Each agent scores the same state on its own. The [`BatchAggregator`]
//! consults all of them, either concurrently or one by one, and never lets a
//! single misbehaving agent take the batch down: errors, panics and
//! out-of-range outputs are all absorbed at this boundary.
//!
//! ## Architecture
//!
//! ```text
//!  ┌─────────┐  ┌─────────┐  ┌─────────┐
//!  │ Agent A │  │ Agent B │  │ Agent C │   EvaluatorAgent
//!  └────┬────┘  └────┬────┘  └────┬────┘
//!       └────────────┼────────────┘
//!                    ▼
//!           ┌─────────────────┐
//!           │ BatchAggregator │   failure isolation
//!           └────────┬────────┘
//!                    ▼
//!           ┌─────────────────┐
//!           │   BatchResult   │   summary + quick diversity
//!           └─────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sentinel_council::{BatchAggregator, EvaluationContext, ExecutionMode};
//!
//! let aggregator = BatchAggregator::new();
//! let context = EvaluationContext::new("position-17").with_depth(4);
//! let batch = aggregator
//!     .run_batch(&agents, &state, &context, ExecutionMode::Parallel)
//!     .await;
//!
//! println!(
//!     "{}/{} agents answered",
//!     batch.summary.successful_agents, batch.summary.total_agents
//! );
//! ```

pub mod council;
pub mod error;
pub mod evaluator;
pub mod summary;

pub use council::{
    AgentError, AgentOutput, BatchAggregator, BatchConfig, BatchResult, ExecutionMode, Processing,
};
pub use error::CouncilError;
pub use evaluator::{
    EvaluationContext, EvaluationResult, EvaluatorAgent, FALLBACK_CONFIDENCE, FALLBACK_SCORE,
};
pub use summary::{BatchSummary, QuickDiversity};

/// Result type for council operations.
pub type Result<T> = std::result::Result<T, CouncilError>;
