use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

use crate::{GeneratedText, GenerationRequest, ModelError, ProcessSpawner, TextModel};

/// Backend that shells out to the claude CLI in print mode
pub struct ClaudeCliModel {
    binary_path: PathBuf,
    model: Option<String>,
    name: String,
}

impl ClaudeCliModel {
    pub fn new(model: Option<String>) -> Self {
        let name = match model {
            Some(ref m) => format!("claude:{}", m),
            None => "claude".to_string(),
        };
        Self {
            binary_path: PathBuf::from("claude"),
            model,
            name,
        }
    }

    pub fn with_binary_path(mut self, path: PathBuf) -> Self {
        self.binary_path = path;
        self
    }
}

impl Default for ClaudeCliModel {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl TextModel for ClaudeCliModel {
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
            "Invoking claude CLI"
        );

        // The claude CLI exposes no sampling temperature control; the
        // scheduled temperature is ignored for this backend.
        let mut args = vec!["--print"];

        let model_arg;
        if let Some(ref model) = self.model {
            args.push("--model");
            model_arg = model.clone();
            args.push(&model_arg);
        }

        if let Some(system) = request.system_prompt {
            args.push("--append-system-prompt");
            args.push(system);
        }

        // -- prevents prompts starting with '-' from being read as options
        args.push("--");
        args.push(request.prompt);

        ProcessSpawner::spawn(&self.binary_path, &args).await
    }
}
