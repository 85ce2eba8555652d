use reloop_model::{GenerationRequest, ModelError, TextModel};
use tracing::{debug, info};

use crate::{Critique, CritiqueParseError, CritiquePrompts};

/// Inputs required to run one critique step
#[derive(Clone, Copy)]
pub struct CritiqueInput<'a> {
    pub task: &'a str,
    pub answer: &'a str,
    pub criteria: &'a [String],
    pub iteration: usize,
    pub temperature: f64,
    pub system_prompt: Option<&'a str>,
    pub max_tokens: Option<u32>,
}

/// Runs a critic-role model against a candidate answer
pub struct CritiqueStep<'a> {
    model: &'a dyn TextModel,
}

impl<'a> CritiqueStep<'a> {
    pub fn new(model: &'a dyn TextModel) -> Self {
        Self { model }
    }

    /// Evaluate the candidate answer, returning a validated critique
    pub async fn evaluate(
        &self,
        input: CritiqueInput<'_>,
    ) -> Result<Critique, EvaluationError> {
        let prompt = CritiquePrompts::build_critique_prompt(
            input.task,
            input.answer,
            input.criteria,
            input.iteration,
        );

        debug!(
            prompt_len = prompt.len(),
            iteration = input.iteration,
            model = self.model.name(),
            "Running critique step"
        );

        let request = GenerationRequest::new(&prompt, input.temperature)
            .with_system_prompt(input.system_prompt)
            .with_max_tokens(input.max_tokens);
        let output = self.model.generate(&request).await?;

        info!(
            duration_secs = output.duration.as_secs_f64(),
            iteration = input.iteration,
            "Critique step completed"
        );

        Critique::parse(&output.text).map_err(EvaluationError::ParseError)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Model invocation error: {0}")]
    ModelError(#[from] ModelError),

    #[error("Failed to parse critique: {0}")]
    ParseError(#[from] CritiqueParseError),
}
