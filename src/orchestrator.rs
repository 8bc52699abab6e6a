//! The orchestration loop: decide, invoke at most one tool, respond.
//!
//! States: AwaitingDecision -> {DirectAnswer | ToolSelected} ->
//! AwaitingFinalAnswer -> Done. The loop never re-enters AwaitingDecision
//! after a tool result is produced: one tool call per query is a deliberate
//! design cap, not an optimization.
//!
//! Failure policy: tool-side failures (unknown tool, invalid arguments,
//! malformed decision) degrade to a fixed apology; a failed second model
//! call degrades to a fallback that still carries the tool result. Only a
//! failed first model call surfaces to the caller, because without the
//! model there is no sensible text answer at all.

use crate::error::{ManabuError, Result};
use crate::llm::{Decision, Message, ModelBackend};
use crate::tools::ToolHost;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Fixed reply when a tool decision cannot be honored.
pub const APOLOGY_REPLY: &str =
    "Sorry, I could not complete that request. Could you rephrase your question?";

/// Prefix of the fixed fallback when the final model call fails. The tool
/// result is appended so the fetched data is not discarded.
const FALLBACK_PREFIX: &str = "I could not compose a reply, but here is what I found:";

/// Drives one user utterance through the decide/invoke/respond cycle.
pub struct Orchestrator {
    backend: Arc<dyn ModelBackend>,
    tools: Arc<dyn ToolHost>,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn ModelBackend>, tools: Arc<dyn ToolHost>) -> Self {
        Self { backend, tools }
    }

    /// Answer one user utterance.
    pub async fn answer(&self, question: &str) -> Result<String> {
        let mut conversation = vec![Message::user(question)];

        let catalog = match self.tools.list_tools().await {
            Ok(catalog) => catalog,
            Err(e) => {
                // Without a catalog the model can still answer directly.
                warn!("Tool listing failed, continuing without tools: {}", e);
                Vec::new()
            }
        };

        let decision = match self.backend.decide(&conversation, &catalog).await {
            Ok(decision) => decision,
            Err(ManabuError::MalformedDecision(reason)) => {
                warn!("Unusable model decision: {}", reason);
                return Ok(APOLOGY_REPLY.to_string());
            }
            Err(e) => return Err(e),
        };

        let call = match decision {
            Decision::Answer(text) => {
                debug!("Model answered directly, no tool invoked");
                return Ok(text);
            }
            Decision::ToolCall(call) => call,
        };

        info!("Model selected tool {} with args {}", call.name, call.arguments);

        let arguments = parse_arguments(&call.arguments);
        let rendered = match self.tools.invoke(&call.name, &arguments).await {
            Ok(rendered) => rendered,
            Err(e @ ManabuError::UnknownTool(_)) | Err(e @ ManabuError::InvalidArguments(_)) => {
                warn!("Tool invocation rejected: {}", e);
                return Ok(APOLOGY_REPLY.to_string());
            }
            Err(e) => {
                warn!("Tool invocation failed: {}", e);
                return Ok(APOLOGY_REPLY.to_string());
            }
        };

        conversation.push(Message::assistant_tool_call(call.clone()));
        conversation.push(Message::tool_result(&call, rendered.clone()));

        match self.backend.respond(&conversation).await {
            Ok(text) => Ok(text),
            Err(e) => {
                error!("Final model call failed: {}", e);
                Ok(format!("{}\n{}", FALLBACK_PREFIX, rendered))
            }
        }
    }
}

/// Parse raw tool-call arguments leniently.
///
/// The model sometimes emits broken argument JSON; an unparseable payload
/// becomes an empty map so invocation is still attempted, and schema
/// validation decides whether that is acceptable.
fn parse_arguments(raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => {
            debug!("Unparseable tool arguments, proceeding with empty set");
            Map::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCallPayload;
    use crate::tools::{catalog, ToolDescriptor};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct StubBackend {
        decision: Mutex<Option<Result<Decision>>>,
        response: Mutex<Option<Result<String>>>,
        respond_conversations: Mutex<Vec<Vec<Message>>>,
    }

    impl StubBackend {
        fn new(decision: Result<Decision>, response: Result<String>) -> Self {
            Self {
                decision: Mutex::new(Some(decision)),
                response: Mutex::new(Some(response)),
                respond_conversations: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelBackend for StubBackend {
        async fn decide(
            &self,
            _conversation: &[Message],
            _tools: &[ToolDescriptor],
        ) -> Result<Decision> {
            self.decision.lock().unwrap().take().expect("one decision")
        }

        async fn respond(&self, conversation: &[Message]) -> Result<String> {
            self.respond_conversations
                .lock()
                .unwrap()
                .push(conversation.to_vec());
            self.response.lock().unwrap().take().expect("one response")
        }
    }

    struct StubHost {
        result: Mutex<Option<Result<String>>>,
        invocations: Mutex<Vec<(String, Map<String, Value>)>>,
    }

    impl StubHost {
        fn new(result: Result<String>) -> Self {
            Self {
                result: Mutex::new(Some(result)),
                invocations: Mutex::new(Vec::new()),
            }
        }

        fn invocations(&self) -> Vec<(String, Map<String, Value>)> {
            self.invocations.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolHost for StubHost {
        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
            Ok(catalog())
        }

        async fn invoke(&self, name: &str, arguments: &Map<String, Value>) -> Result<String> {
            self.invocations
                .lock()
                .unwrap()
                .push((name.to_string(), arguments.clone()));
            self.result.lock().unwrap().take().expect("one invocation")
        }
    }

    fn tool_call(name: &str, arguments: &str) -> Decision {
        Decision::ToolCall(ToolCallPayload {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        })
    }

    // Scenario D: "none" decision path — the gateway is never touched.
    #[tokio::test]
    async fn test_direct_answer_skips_tools() {
        let backend = Arc::new(StubBackend::new(
            Ok(Decision::Answer("Moodle is your university LMS.".to_string())),
            Err(ManabuError::ModelUnavailable("unused".to_string())),
        ));
        let host = Arc::new(StubHost::new(Ok("unused".to_string())));
        let orchestrator = Orchestrator::new(backend, host.clone());

        let reply = orchestrator.answer("What is Moodle?").await.unwrap();
        assert_eq!(reply, "Moodle is your university LMS.");
        assert!(host.invocations().is_empty());
    }

    // Scenario A: tool selected, result folded into the final reply.
    #[tokio::test]
    async fn test_tool_result_flows_into_final_reply() {
        let backend = Arc::new(StubBackend::new(
            Ok(tool_call("get_due_assignments", r#"{"days": 3}"#)),
            Ok("One assignment is due: ER modelling on 2025-06-03.".to_string()),
        ));
        let host = Arc::new(StubHost::new(Ok(
            "Assignments due soon:\n- Databases / ER modelling: due 2025-06-03".to_string(),
        )));
        let orchestrator = Orchestrator::new(backend.clone(), host.clone());

        let reply = orchestrator
            .answer("list assignments due in 3 days")
            .await
            .unwrap();
        assert_eq!(reply, "One assignment is due: ER modelling on 2025-06-03.");

        let invocations = host.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].0, "get_due_assignments");
        assert_eq!(invocations[0].1.get("days"), Some(&json!(3)));

        // The second model call sees the tool result appended.
        let conversations = backend.respond_conversations.lock().unwrap();
        let final_conversation = conversations.last().unwrap();
        assert_eq!(final_conversation.len(), 3);
        assert!(final_conversation[2].content.contains("ER modelling"));
    }

    // Scenario B: unparseable argument payload — invocation is still
    // attempted with empty arguments and the rejection becomes the apology.
    #[tokio::test]
    async fn test_malformed_arguments_degrade_to_apology() {
        let backend = Arc::new(StubBackend::new(
            Ok(tool_call("get_due_assignments", "due in about three days")),
            Err(ManabuError::ModelUnavailable("unused".to_string())),
        ));
        let host = Arc::new(StubHost::new(Err(ManabuError::InvalidArguments(
            "missing required parameter 'days'".to_string(),
        ))));
        let orchestrator = Orchestrator::new(backend, host.clone());

        let reply = orchestrator.answer("what is due?").await.unwrap();
        assert_eq!(reply, APOLOGY_REPLY);

        let invocations = host.invocations();
        assert_eq!(invocations.len(), 1);
        assert!(invocations[0].1.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_degrades_to_apology() {
        let backend = Arc::new(StubBackend::new(
            Ok(tool_call("get_my_grades", "{}")),
            Err(ManabuError::ModelUnavailable("unused".to_string())),
        ));
        let host = Arc::new(StubHost::new(Err(ManabuError::UnknownTool(
            "get_my_grades".to_string(),
        ))));
        let orchestrator = Orchestrator::new(backend, host);

        let reply = orchestrator.answer("what are my grades?").await.unwrap();
        assert_eq!(reply, APOLOGY_REPLY);
    }

    // Scenario C: the gateway could not supply data; the host renders the
    // "could not retrieve" text and the final call still runs.
    #[tokio::test]
    async fn test_gateway_outage_still_produces_a_reply() {
        let backend = Arc::new(StubBackend::new(
            Ok(tool_call("get_due_assignments", r#"{"days": 3}"#)),
            Ok("I could not retrieve your assignments right now.".to_string()),
        ));
        let host = Arc::new(StubHost::new(Ok(
            "Could not retrieve assignments.".to_string()
        )));
        let orchestrator = Orchestrator::new(backend.clone(), host);

        let reply = orchestrator.answer("what is due?").await.unwrap();
        assert!(reply.contains("could not retrieve"));

        let conversations = backend.respond_conversations.lock().unwrap();
        assert!(conversations.last().unwrap()[2]
            .content
            .contains("Could not retrieve assignments."));
    }

    #[tokio::test]
    async fn test_failed_final_call_keeps_tool_result() {
        let backend = Arc::new(StubBackend::new(
            Ok(tool_call("get_my_courses", "{}")),
            Err(ManabuError::ModelUnavailable("connection refused".to_string())),
        ));
        let host = Arc::new(StubHost::new(Ok(
            "Enrolled courses:\n- Databases".to_string()
        )));
        let orchestrator = Orchestrator::new(backend, host);

        let reply = orchestrator.answer("my courses?").await.unwrap();
        assert!(reply.starts_with(FALLBACK_PREFIX));
        assert!(reply.contains("- Databases"));
    }

    #[tokio::test]
    async fn test_failed_first_call_is_a_hard_error() {
        let backend = Arc::new(StubBackend::new(
            Err(ManabuError::ModelUnavailable("connection refused".to_string())),
            Err(ManabuError::ModelUnavailable("unused".to_string())),
        ));
        let host = Arc::new(StubHost::new(Ok("unused".to_string())));
        let orchestrator = Orchestrator::new(backend, host);

        let result = orchestrator.answer("anything").await;
        assert!(matches!(result, Err(ManabuError::ModelUnavailable(_))));
    }

    #[tokio::test]
    async fn test_malformed_decision_degrades_to_apology() {
        let backend = Arc::new(StubBackend::new(
            Err(ManabuError::MalformedDecision("trailing commentary".to_string())),
            Err(ManabuError::ModelUnavailable("unused".to_string())),
        ));
        let host = Arc::new(StubHost::new(Ok("unused".to_string())));
        let orchestrator = Orchestrator::new(backend, host.clone());

        let reply = orchestrator.answer("anything").await.unwrap();
        assert_eq!(reply, APOLOGY_REPLY);
        assert!(host.invocations().is_empty());
    }

    #[test]
    fn test_parse_arguments_lenient() {
        assert_eq!(
            parse_arguments(r#"{"days": 3}"#).get("days"),
            Some(&json!(3))
        );
        assert!(parse_arguments("not json at all").is_empty());
        assert!(parse_arguments("[1, 2, 3]").is_empty());
    }
}
