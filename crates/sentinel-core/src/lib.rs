//! # Evaluation Sentinel Core
//!
//! Meta-evaluation over a pool of evaluator agents. Orchestrates the batch
//! aggregator, bias detector and diversity analyzer, and turns their
//! findings into score corrections and recommendations.
//!
//! ## Coverage
//!
//! | Failure mode | Component | Response |
//! |--------------|-----------|----------|
//! | Agent errors, panics, bad output | Batch Aggregator | Fallback result, batch continues |
//! | Persistent outlier agent | Bias Detector | Negative adjustment for that agent |
//! | Drift over the session | Bias Detector | Temporal report, recommendations |
//! | Depth-dependent scoring | Bias Detector | Positional report |
//! | Anchoring on prior output | Bias Detector | Confirmation report |
//! | Groupthink, one dominant agent | Diversity Analyzer | Boost for quiet agents, perturbation |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     EVALUATION SESSION                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   agents ──► BatchAggregator ──► BatchResult                    │
//! │                                       │                         │
//! │                                       ▼                         │
//! │                              ┌─────────────────┐                │
//! │                              │    Sentinel     │                │
//! │                              └────────┬────────┘                │
//! │                   ┌───────────────────┼───────────────┐         │
//! │                   ▼                   ▼               ▼         │
//! │           ┌─────────────┐    ┌─────────────┐   ┌────────────┐   │
//! │           │    Bias     │    │  Diversity  │   │   Score    │   │
//! │           │  Detector   │    │  Analyzer   │   │ Corrector  │   │
//! │           └─────────────┘    └─────────────┘   └────────────┘   │
//! │                                       │                         │
//! │                                       ▼                         │
//! │                              SentinelEvaluation                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sentinel_core::{EvaluationSession, SentinelConfig};
//! use sentinel_council::{EvaluationContext, ExecutionMode};
//!
//! let mut session = EvaluationSession::new(SentinelConfig::load("sentinel.toml")?)?;
//! let outcome = session
//!     .run(&agents, &state, &EvaluationContext::new("root"), ExecutionMode::Parallel)
//!     .await;
//!
//! if let Some(evaluation) = outcome.evaluation {
//!     for recommendation in &evaluation.recommendations {
//!         println!("{recommendation}");
//!     }
//! }
//! ```
//!
//! ## Notes
//!
//! - Raw evaluations are never rewritten; corrections are separate values
//! - Insufficient data never fails; it lowers confidence instead
//! - Invalid configuration is the only hard failure
//! - One Sentinel per session; there is no global instance

mod config;
mod correction;
mod error;
mod evaluation;
mod sentinel;
mod session;

pub use config::{CorrectionConfig, SentinelConfig};
pub use correction::ScoreCorrector;
pub use error::SentinelError;
pub use evaluation::{EvaluationMetadata, RecentPerformance, SentinelEvaluation, SentinelStatistics};
pub use sentinel::Sentinel;
pub use session::{EvaluationSession, SessionOutcome};

// Re-export component types for convenience
pub use sentinel_council::{
    BatchAggregator, BatchConfig, BatchResult, EvaluationContext, EvaluationResult, EvaluatorAgent,
    ExecutionMode,
};
pub use sentinel_monitor::{
    BiasConfig, BiasReport, BiasType, DiversityAnalysis, DiversityConfig,
};

/// Core result type for sentinel operations.
pub type Result<T> = std::result::Result<T, SentinelError>;
