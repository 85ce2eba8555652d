mod claude;
mod llm;
mod output;
mod spawner;
mod traits;

pub use claude::ClaudeCliModel;
pub use llm::LlmCliModel;
pub use output::GeneratedText;
pub use spawner::ProcessSpawner;
pub use traits::{BackendKind, GenerationRequest, ModelError, TextModel};

use std::sync::Arc;

/// Create a model backend by kind
pub fn create_model(kind: BackendKind, model: Option<String>) -> Arc<dyn TextModel> {
    match kind {
        BackendKind::ClaudeCli => Arc::new(ClaudeCliModel::new(model)),
        BackendKind::LlmCli => Arc::new(LlmCliModel::new(model)),
    }
}
