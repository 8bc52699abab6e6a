//! Hosted model backend over the OpenAI chat completions API.

use super::{Decision, Message, ModelBackend, Role, ToolCallPayload};
use crate::config::LlmSettings;
use crate::error::{ManabuError, Result};
use crate::tools::ToolDescriptor;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall,
    FunctionObject,
};
use async_openai::Client;
use std::time::Duration;
use tracing::debug;

/// Timeout for chat completion requests.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Backend using hosted OpenAI models with native tool calling.
pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiBackend {
    /// Create a backend from settings. The API key falls back to the
    /// OPENAI_API_KEY environment variable when not configured.
    pub fn new(settings: &LlmSettings) -> Self {
        let config = match &settings.api_key {
            Some(key) => OpenAIConfig::default().with_api_key(key),
            None => OpenAIConfig::default(),
        };
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client: Client::with_config(config).with_http_client(http_client),
            model: settings.model.clone(),
        }
    }

    async fn create(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        tools: Option<Vec<ChatCompletionTool>>,
    ) -> Result<async_openai::types::ChatCompletionResponseMessage> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model).messages(messages);
        if let Some(tools) = tools {
            builder.tools(tools);
        }
        let request = builder
            .build()
            .map_err(|e| ManabuError::ModelUnavailable(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ManabuError::ModelUnavailable(format!("Chat API error: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| ManabuError::ModelUnavailable("No response from model".to_string()))
    }
}

#[async_trait::async_trait]
impl ModelBackend for OpenAiBackend {
    async fn decide(
        &self,
        conversation: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<Decision> {
        let chat_tools = (!tools.is_empty()).then(|| to_chat_tools(tools));
        let message = self.create(to_request_messages(conversation)?, chat_tools).await?;

        if let Some(call) = message.tool_calls.as_ref().and_then(|calls| calls.first()) {
            debug!("Model selected tool {}", call.function.name);
            return Ok(Decision::ToolCall(ToolCallPayload {
                id: call.id.clone(),
                name: call.function.name.clone(),
                arguments: call.function.arguments.clone(),
            }));
        }

        match message.content {
            Some(content) => Ok(Decision::Answer(content)),
            None => Err(ManabuError::MalformedDecision(
                "neither content nor a tool call".to_string(),
            )),
        }
    }

    async fn respond(&self, conversation: &[Message]) -> Result<String> {
        let message = self.create(to_request_messages(conversation)?, None).await?;
        Ok(message.content.unwrap_or_default())
    }
}

/// Map the conversation to the chat completions request message types.
fn to_request_messages(conversation: &[Message]) -> Result<Vec<ChatCompletionRequestMessage>> {
    let build_err = |e: async_openai::error::OpenAIError| {
        ManabuError::ModelUnavailable(format!("Failed to build message: {}", e))
    };

    conversation
        .iter()
        .map(|message| {
            Ok(match (message.role, &message.tool_call) {
                (Role::System, _) => ChatCompletionRequestSystemMessageArgs::default()
                    .content(message.content.clone())
                    .build()
                    .map_err(build_err)?
                    .into(),
                (Role::User, _) => ChatCompletionRequestUserMessageArgs::default()
                    .content(message.content.clone())
                    .build()
                    .map_err(build_err)?
                    .into(),
                (Role::Assistant, Some(call)) => {
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .tool_calls(vec![ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        }])
                        .build()
                        .map_err(build_err)?
                        .into()
                }
                (Role::Assistant, None) => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(message.content.clone())
                    .build()
                    .map_err(build_err)?
                    .into(),
                (Role::Tool, call) => {
                    let id = call.as_ref().map(|c| c.id.clone()).unwrap_or_default();
                    ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(id)
                        .content(message.content.clone())
                        .build()
                        .map_err(build_err)?
                        .into()
                }
            })
        })
        .collect()
}

/// Map descriptors to the OpenAI tool definition shape.
fn to_chat_tools(tools: &[ToolDescriptor]) -> Vec<ChatCompletionTool> {
    tools
        .iter()
        .map(|tool| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                parameters: Some(tool.input_schema()),
                strict: None,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::catalog;

    #[test]
    fn test_chat_tools_carry_names_and_schemas() {
        let tools = to_chat_tools(&catalog());
        assert_eq!(tools.len(), 5);
        assert_eq!(tools[1].function.name, "get_due_assignments");
        let schema = tools[1].function.parameters.as_ref().unwrap();
        assert_eq!(schema["properties"]["days"]["type"], "integer");
    }

    #[test]
    fn test_conversation_maps_to_request_messages() {
        let call = ToolCallPayload {
            id: "call_1".to_string(),
            name: "get_my_courses".to_string(),
            arguments: "{}".to_string(),
        };
        let conversation = vec![
            Message::user("What courses am I in?"),
            Message::assistant_tool_call(call.clone()),
            Message::tool_result(&call, "Enrolled courses:\n- Databases".to_string()),
        ];

        let messages = to_request_messages(&conversation).unwrap();
        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(
            messages[1],
            ChatCompletionRequestMessage::Assistant(_)
        ));
        assert!(matches!(messages[2], ChatCompletionRequestMessage::Tool(_)));
    }
}
