//! Local model backend over an Ollama inference server.
//!
//! Ollama's generate endpoint has no native tool calling, so the tool
//! catalog is embedded into the prompt and the model is asked to reply with
//! a JSON decision. Malformed decision JSON is rejected strictly rather than
//! salvaged; the orchestrator turns the rejection into an apology.

use super::{Decision, Message, ModelBackend, Role, ToolCallPayload};
use crate::config::LlmSettings;
use crate::error::{ManabuError, Result};
use crate::tools::ToolDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// Timeout for generate requests. Local generation is slow, but it must
/// never block indefinitely.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Backend using a local Ollama server.
pub struct OllamaBackend {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// The JSON decision shape the model is instructed to emit.
#[derive(Deserialize)]
struct RawDecision {
    tool_name: String,
    #[serde(default)]
    parameters: Map<String, Value>,
    #[serde(default)]
    answer: Option<String>,
}

impl OllamaBackend {
    pub fn new(settings: &LlmSettings) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.endpoint);
        let response = self
            .http
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| ManabuError::ModelUnavailable(format!("Ollama request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ManabuError::ModelUnavailable(format!(
                "Ollama returned status {}",
                status.as_u16()
            )));
        }

        let payload: GenerateResponse = response.json().await.map_err(|e| {
            ManabuError::ModelUnavailable(format!("Malformed Ollama response: {}", e))
        })?;
        Ok(payload.response)
    }
}

#[async_trait::async_trait]
impl ModelBackend for OllamaBackend {
    async fn decide(
        &self,
        conversation: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<Decision> {
        let query = conversation
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let text = self.generate(&decision_prompt(tools, query)).await?;
        debug!("Ollama decision text: {}", text);
        parse_decision(&text)
    }

    async fn respond(&self, conversation: &[Message]) -> Result<String> {
        self.generate(&final_prompt(conversation)).await
    }
}

/// Build the decision prompt: a numbered tool list plus the output contract.
fn decision_prompt(tools: &[ToolDescriptor], query: &str) -> String {
    let mut prompt = String::from(
        "You can use the following tools. If a tool is needed, reply with the \
         tool name and arguments as JSON.\n\nTools:\n",
    );

    for (i, tool) in tools.iter().enumerate() {
        prompt.push_str(&format!("{}. name: {}\n", i + 1, tool.name));
        prompt.push_str(&format!("   description: {}\n", tool.description.trim()));
        if tool.parameters.is_empty() {
            prompt.push_str("   parameters: none\n");
        } else {
            prompt.push_str("   parameters:\n");
            for (name, spec) in &tool.parameters {
                let requirement = if spec.required { "required" } else { "optional" };
                prompt.push_str(&format!(
                    "     - {} ({}, {}): {}\n",
                    name,
                    spec.param_type.as_str(),
                    requirement,
                    spec.description
                ));
            }
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("User input: {}\n\n", query));
    prompt.push_str(
        "Reply with JSON only, in exactly one of these forms:\n\
         1. Tool needed: {\"tool_name\": ..., \"parameters\": {...}}\n\
         2. No tool needed: {\"tool_name\": \"none\", \"answer\": \"...\"}",
    );
    prompt
}

/// Parse the model's decision JSON, strictly.
///
/// Anything that is not a single valid JSON object of the instructed shape
/// (including valid JSON followed by commentary) is rejected.
fn parse_decision(text: &str) -> Result<Decision> {
    let raw: RawDecision = serde_json::from_str(text.trim())
        .map_err(|e| ManabuError::MalformedDecision(format!("{}", e)))?;

    if raw.tool_name == "none" {
        return Ok(Decision::Answer(raw.answer.unwrap_or_else(|| {
            "The model chose not to use a tool but returned no answer.".to_string()
        })));
    }

    Ok(Decision::ToolCall(ToolCallPayload {
        id: "local-call".to_string(),
        name: raw.tool_name,
        arguments: serde_json::to_string(&raw.parameters)?,
    }))
}

/// Build the final-answer prompt from the whole conversation.
fn final_prompt(conversation: &[Message]) -> String {
    let mut prompt = String::new();
    for message in conversation {
        match (message.role, &message.tool_call) {
            (Role::System, _) => prompt.push_str(&format!("Instructions: {}\n", message.content)),
            (Role::User, _) => prompt.push_str(&format!("User question: {}\n", message.content)),
            (Role::Assistant, Some(call)) => {
                prompt.push_str(&format!("(You decided to call the tool '{}'.)\n", call.name))
            }
            (Role::Assistant, None) => prompt.push_str(&format!("You said: {}\n", message.content)),
            (Role::Tool, call) => {
                let name = call.as_ref().map(|c| c.name.as_str()).unwrap_or("tool");
                prompt.push_str(&format!(
                    "Result of tool '{}':\n{}\n",
                    name, message.content
                ));
            }
        }
        prompt.push('\n');
    }
    prompt.push_str("Compose a natural, helpful reply to the user based on the information above.");
    prompt
}
