//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod mcp;
mod serve;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use mcp::run_mcp;
pub use serve::run_serve;

use crate::config::{LlmBackendKind, Settings};
use crate::error::Result;
use crate::llm::{ModelBackend, OllamaBackend, OpenAiBackend};
use crate::moodle::MoodleGateway;
use crate::tools::ToolRegistry;
use std::sync::Arc;

/// Build the model backend, honoring a per-invocation model override.
fn build_backend(settings: &Settings, model: Option<String>) -> Arc<dyn ModelBackend> {
    let mut llm = settings.llm.clone();
    if let Some(model) = model {
        llm.model = model;
    }
    match llm.backend {
        LlmBackendKind::Openai => Arc::new(OpenAiBackend::new(&llm)),
        LlmBackendKind::Ollama => Arc::new(OllamaBackend::new(&llm)),
    }
}

/// Build the in-process tool registry against the configured Moodle site.
fn build_registry(settings: &Settings) -> Result<Arc<ToolRegistry>> {
    let gateway = Arc::new(MoodleGateway::new(&settings.moodle)?);
    Ok(Arc::new(ToolRegistry::new(gateway)))
}
