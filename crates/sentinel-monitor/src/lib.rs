//! # Bias & Diversity Monitor
//!
//! Statistical checks over batches of evaluator agent output: does any
//! agent deviate, drift, depend on search depth or anchor on itself, and is
//! the pool diverse enough to trust its agreement?
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`BiasDetector`] | Systematic, temporal, positional and confirmation bias |
//! | [`DiversityAnalyzer`] | Entropy, variance, participation and groupthink detection |
//! | [`BoundedHistory`] | Fixed-capacity FIFO used for every rolling history |
//! | [`stats`] | Population statistics shared by the detectors |
//!
//! ## Quick Start
//!
//! ```rust
//! use sentinel_council::EvaluationResult;
//! use sentinel_monitor::{BiasDetector, DiversityAnalyzer};
//!
//! let batch = vec![
//!     EvaluationResult::new("alpha", 0.70, 0.90),
//!     EvaluationResult::new("beta", 0.71, 0.85),
//!     EvaluationResult::new("gamma", 0.69, 0.95),
//!     EvaluationResult::new("delta", 0.70, 0.90),
//!     EvaluationResult::new("omega", 0.70, 0.88),
//! ];
//!
//! let analysis = DiversityAnalyzer::new().analyze(&batch);
//! assert!(analysis.group_think_detected);
//!
//! let mut detector = BiasDetector::new();
//! let reports = detector.detect_all(&batch, &[]);
//! detector.add_to_history(&batch);
//! assert!(reports.is_empty());
//! ```
//!
//! ## Failure Model
//!
//! Insufficient data is never an error. Detectors return `None` and the
//! analyzer returns a degenerate analysis, so callers can always inspect
//! the output unconditionally. Only construction with an invalid config
//! fails.

#![warn(missing_docs)]

mod bias;
mod diversity;
mod error;
mod history;
pub mod stats;

pub use bias::{BiasConfig, BiasDetector, BiasReport, BiasType};
pub use diversity::{
    ConfidenceMetrics, DiversityAnalysis, DiversityAnalyzer, DiversityBreakdown, DiversityConfig,
    ParticipationMetrics, ScoreMetrics,
};
pub use error::{MonitorError, Result};
pub use history::BoundedHistory;
