use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

use crate::{GeneratedText, GenerationRequest, ModelError, ProcessSpawner, TextModel};

/// Backend that shells out to the `llm` CLI
///
/// Unlike the claude CLI, `llm` accepts sampling options, so this backend
/// honors the scheduled temperature and max_tokens.
pub struct LlmCliModel {
    binary_path: PathBuf,
    model: Option<String>,
    name: String,
}

impl LlmCliModel {
    pub fn new(model: Option<String>) -> Self {
        let name = match model {
            Some(ref m) => format!("llm:{}", m),
            None => "llm".to_string(),
        };
        Self {
            binary_path: PathBuf::from("llm"),
            model,
            name,
        }
    }

    pub fn with_binary_path(mut self, path: PathBuf) -> Self {
        self.binary_path = path;
        self
    }
}

impl Default for LlmCliModel {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl TextModel for LlmCliModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary_path)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<GeneratedText, ModelError> {
        debug!(
            model = self.name(),
            prompt_len = request.prompt.len(),
            temperature = request.temperature,
            "Invoking llm CLI"
        );

        let mut args = vec!["prompt"];

        let model_arg;
        if let Some(ref model) = self.model {
            args.push("-m");
            model_arg = model.clone();
            args.push(&model_arg);
        }

        if let Some(system) = request.system_prompt {
            args.push("-s");
            args.push(system);
        }

        let temperature_arg = format!("{}", request.temperature);
        args.push("-o");
        args.push("temperature");
        args.push(&temperature_arg);

        let max_tokens_arg;
        if let Some(max_tokens) = request.max_tokens {
            max_tokens_arg = max_tokens.to_string();
            args.push("-o");
            args.push("max_tokens");
            args.push(&max_tokens_arg);
        }

        args.push("--");
        args.push(request.prompt);

        ProcessSpawner::spawn(&self.binary_path, &args).await
    }
}
