use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use reloop_critic::Critique;

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Hit the configured iteration limit
    MaxIterations,
    /// Score delta or answer similarity signalled no further useful change
    Converged,
    /// A critique scored at or above the quality threshold
    ThresholdMet,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::MaxIterations => write!(f, "max iterations"),
            StopReason::Converged => write!(f, "converged"),
            StopReason::ThresholdMet => write!(f, "threshold met"),
        }
    }
}

/// Record of a single loop pass: the answer that was critiqued plus
/// bookkeeping. Append-only; never retracted once pushed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based, monotonic
    pub iteration_number: usize,
    /// The candidate answer evaluated at this step
    pub answer: String,
    pub critique: Critique,
    /// Model that acted as critic this step
    pub critic_model: String,
    /// Model that produced (or would produce) the next answer
    pub generator_model: String,
    pub duration_secs: f64,
    /// `(score_i - score_{i-1}) / score_{i-1}`; None for iteration 1
    pub improvement_from_previous: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// The terminal result of a completed refinement run
///
/// Materialized once after the loop's stopping criterion fires, then
/// immutable. `iterations` is never empty and never longer than the
/// configured maximum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub iterations: Vec<IterationRecord>,
    /// The answer carried after the last accepted improvement
    pub final_answer: String,
    pub stop_reason: StopReason,
    pub convergence_detected: bool,
    pub total_duration_secs: f64,
}

impl RunResult {
    /// Quality score of the first critique
    pub fn initial_score(&self) -> f64 {
        self.iterations
            .first()
            .map(|it| it.critique.quality_score)
            .unwrap_or(0.0)
    }

    /// Quality score of the last critique
    pub fn final_score(&self) -> f64 {
        self.iterations
            .last()
            .map(|it| it.critique.quality_score)
            .unwrap_or(0.0)
    }

    /// Total score movement across the run, as an absolute delta
    pub fn score_delta(&self) -> f64 {
        self.final_score() - self.initial_score()
    }
}
