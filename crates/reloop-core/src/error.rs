use thiserror::Error;

use crate::ConfigError;

/// Errors that abort a refinement run.
///
/// Model and critique failures are fail-fast: the run aborts immediately and
/// partial history is discarded, never surfaced as a `RunResult`.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Model error: {0}")]
    Model(#[from] reloop_model::ModelError),

    #[error("Critique error: {0}")]
    Critique(#[from] reloop_critic::EvaluationError),
}
