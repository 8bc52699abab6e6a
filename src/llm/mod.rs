//! Model backends and conversation types.
//!
//! One trait covers both variants: the hosted OpenAI backend with native
//! tool calling and the local Ollama backend with a prompt-embedded tool
//! list. The backend decides; it never executes tools itself.

mod ollama;
mod openai;

pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

use crate::error::Result;
use crate::tools::ToolDescriptor;
use async_trait::async_trait;

/// Message roles within one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    /// A tool result folded back into the conversation.
    Tool,
}

/// The model's structured request to invoke a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallPayload {
    /// Backend-assigned call id (echoed back with the tool result).
    pub id: String,
    pub name: String,
    /// Raw argument text as emitted by the model; parsed leniently later.
    pub arguments: String,
}

/// One conversation message. Append-only within an exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// For an assistant tool request or a tool result, the call it belongs to.
    pub tool_call: Option<ToolCallPayload>,
}

impl Message {
    pub fn system(content: &str) -> Self {
        Self {
            role: Role::System,
            content: content.to_string(),
            tool_call: None,
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
            tool_call: None,
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
            tool_call: None,
        }
    }

    /// The assistant's decision to call a tool.
    pub fn assistant_tool_call(call: ToolCallPayload) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_call: Some(call),
        }
    }

    /// A tool result, carrying the tool's name and its rendered output.
    pub fn tool_result(call: &ToolCallPayload, content: String) -> Self {
        Self {
            role: Role::Tool,
            content,
            tool_call: Some(call.clone()),
        }
    }
}

/// What the model decided to do with a user utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Answer directly; the text is returned to the user verbatim.
    Answer(String),
    /// Invoke the named tool with the given raw arguments.
    ToolCall(ToolCallPayload),
}

/// A language-model backend.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// First call: the conversation plus the tool catalog; the model either
    /// answers directly or picks a tool.
    async fn decide(&self, conversation: &[Message], tools: &[ToolDescriptor])
        -> Result<Decision>;

    /// Second call: the conversation including the tool result, no tool
    /// list; the model composes the final reply.
    async fn respond(&self, conversation: &[Message]) -> Result<String>;
}
