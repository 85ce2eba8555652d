mod critique;
mod prompts;
pub mod step;

pub use critique::{Critique, CritiqueParseError, MAX_QUALITY_SCORE, MIN_QUALITY_SCORE};
pub use prompts::CritiquePrompts;
pub use step::{CritiqueInput, CritiqueStep, EvaluationError};
