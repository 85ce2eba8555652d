use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::RunResult;

/// How a refinement run ended
///
/// Cancellation is a distinct outcome, not an error: no partial `RunResult`
/// is produced, only the count of iterations that had completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The loop ran to a stopping criterion
    Completed(RunResult),
    /// Caller-initiated cancellation honored at a suspension point
    Cancelled {
        iterations: usize,
        total_duration_secs: f64,
    },
}

impl RunOutcome {
    pub fn cancelled(iterations: usize, duration: Duration) -> Self {
        Self::Cancelled {
            iterations,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn iterations(&self) -> usize {
        match self {
            Self::Completed(result) => result.iterations.len(),
            Self::Cancelled { iterations, .. } => *iterations,
        }
    }

    /// The result, if the run completed
    pub fn result(&self) -> Option<&RunResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Cancelled { .. } => None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed(_) => 0,
            Self::Cancelled { .. } => 130,
        }
    }
}
