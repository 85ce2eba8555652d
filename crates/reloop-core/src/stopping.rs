use crate::similarity::similarity;
use crate::{IterationRecord, RunConfig, StopReason};

/// Answer similarity above which two consecutive answers are treated as the
/// same for convergence purposes
pub const SIMILARITY_CONVERGENCE_BOUND: f64 = 0.95;

/// Verdict of the stopping-criteria evaluation after one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopDecision {
    Continue,
    Stop(StopReason),
}

/// Relative score improvement between two consecutive critiques.
///
/// `(current - previous) / previous`, guarded against a zero baseline:
/// +inf when the score rose from zero, 0.0 when it stayed there. Critique
/// validation keeps scores at 1.0 or above, so the guard is for callers
/// feeding raw numbers. A negative result (regression) is legitimate.
pub fn improvement_ratio(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    } else {
        (current - previous) / previous
    }
}

/// Evaluate the stopping criteria against the history so far.
///
/// Criteria are checked in fixed priority order; the first match wins:
/// 1. iteration limit (always checked, guarantees termination)
/// 2. quality threshold
/// 3. convergence - small score delta OR near-identical consecutive
///    answers; a regressing score also counts, the loop does not keep
///    iterating on an answer that is getting worse
pub fn evaluate_stop(history: &[IterationRecord], config: &RunConfig) -> StopDecision {
    let last = match history.last() {
        Some(last) => last,
        None => return StopDecision::Continue,
    };

    if last.iteration_number >= config.max_iterations {
        return StopDecision::Stop(StopReason::MaxIterations);
    }

    if let Some(threshold) = config.quality_threshold {
        if last.critique.quality_score >= threshold {
            return StopDecision::Stop(StopReason::ThresholdMet);
        }
    }

    if config.check_convergence && last.iteration_number > 1 {
        if let Some(improvement) = last.improvement_from_previous {
            if improvement < config.convergence_threshold {
                return StopDecision::Stop(StopReason::Converged);
            }
        }
        if let Some(previous) = history.len().checked_sub(2).and_then(|i| history.get(i)) {
            if similarity(&last.answer, &previous.answer) > SIMILARITY_CONVERGENCE_BOUND {
                return StopDecision::Stop(StopReason::Converged);
            }
        }
    }

    StopDecision::Continue
}
