//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is present before starting
//! operations that would otherwise fail midway.

use crate::config::{LlmBackendKind, Settings};
use crate::error::{ManabuError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering queries needs Moodle credentials and a model backend.
    Ask,
    /// Chatting against a remote tool server only needs a model backend.
    RemoteChat,
    /// Serving tools over MCP needs Moodle credentials only.
    Tools,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ask => {
            check_moodle(settings)?;
            check_model(settings)?;
        }
        Operation::RemoteChat => {
            check_model(settings)?;
        }
        Operation::Tools => {
            check_moodle(settings)?;
        }
    }
    Ok(())
}

/// Check that the Moodle site and token are configured.
fn check_moodle(settings: &Settings) -> Result<()> {
    if settings.moodle.base_url.is_empty() {
        return Err(ManabuError::Config(
            "Moodle site URL not set. Add it to the config file or set MOODLE_URL.".to_string(),
        ));
    }
    if settings.moodle.token.is_empty() {
        return Err(ManabuError::Config(
            "Moodle token not set. Add it to the config file or set MOODLE_TOKEN.".to_string(),
        ));
    }
    Ok(())
}

/// Check that the configured model backend has what it needs.
fn check_model(settings: &Settings) -> Result<()> {
    match settings.llm.backend {
        LlmBackendKind::Openai => {
            if settings.llm.api_key.is_some() {
                return Ok(());
            }
            match std::env::var("OPENAI_API_KEY") {
                Ok(key) if !key.is_empty() => Ok(()),
                _ => Err(ManabuError::Config(
                    "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'"
                        .to_string(),
                )),
            }
        }
        // The local backend is unauthenticated
        LlmBackendKind::Ollama => Ok(()),
    }
}
