//! Offline replay of recorded evaluation batches through one Sentinel.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sentinel_core::{
    EvaluationContext, EvaluationResult, Sentinel, SentinelEvaluation, SentinelStatistics,
};

/// Recorded session: batches in the order they were produced.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayInput {
    /// Batches, oldest first.
    pub batches: Vec<ReplayBatch>,
}

/// One recorded batch.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayBatch {
    /// Context shared by the whole batch.
    #[serde(default)]
    pub context: Option<EvaluationContext>,
    /// One context per evaluation; enables positional bias detection.
    #[serde(default)]
    pub contexts: Vec<EvaluationContext>,
    /// Recorded agent evaluations.
    pub evaluations: Vec<EvaluationResult>,
}

/// Sentinel output for one replayed batch.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayStep {
    /// Position of the batch in the input.
    pub index: usize,
    /// Sentinel verdict on the batch.
    pub evaluation: SentinelEvaluation,
    /// Batch scores after correction, in input order.
    pub corrected_scores: Vec<f64>,
}

/// Full replay output.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    /// One step per batch.
    pub steps: Vec<ReplayStep>,
    /// Sentinel statistics after the last batch.
    pub statistics: SentinelStatistics,
}

/// Runs every batch through `sentinel` in order.
pub fn run(sentinel: &mut Sentinel, input: &ReplayInput) -> ReplayReport {
    let mut steps = Vec::with_capacity(input.batches.len());

    for (index, batch) in input.batches.iter().enumerate() {
        let evaluation = if batch.contexts.is_empty() {
            let context = batch
                .context
                .clone()
                .unwrap_or_else(|| EvaluationContext::new(format!("batch-{index}")));
            sentinel.evaluate(&batch.evaluations, &context)
        } else {
            sentinel.evaluate_with_contexts(&batch.evaluations, &batch.contexts)
        };

        let raw: Vec<f64> = batch.evaluations.iter().map(|e| e.score).collect();
        let corrected_scores = sentinel.adjust_scores(&raw, &evaluation);
        debug!(
            "Replayed batch {}: {} evaluations, {} bias report(s)",
            index,
            raw.len(),
            evaluation.bias_reports.len()
        );

        steps.push(ReplayStep {
            index,
            evaluation,
            corrected_scores,
        });
    }

    let statistics = sentinel.statistics();
    info!(
        "Replay complete: {} batches, {} interventions",
        statistics.total_analyses, statistics.intervention_count
    );
    ReplayReport { steps, statistics }
}
