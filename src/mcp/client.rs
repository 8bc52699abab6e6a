//! The conversation session's transport side: an MCP client over the stdio
//! of a spawned server process.
//!
//! The handshake must complete before tools can be listed or called. The
//! child is spawned with kill-on-drop so the process is released even if the
//! loop above unwinds; `close()` is idempotent.

use super::protocol::{JsonRpcRequest, JsonRpcResponse, ToolCallResult};
use crate::error::{ManabuError, Result};
use crate::tools::{ToolDescriptor, ToolHost};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;
use tracing::debug;

/// Bound on every read from the server; no response may block forever.
const RESPONSE_TIMEOUT_SECS: u64 = 30;

const PROTOCOL_VERSION: &str = "2024-11-05";

/// A connected MCP session over a child process's stdio.
pub struct McpSession {
    child: Option<Child>,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u64,
}

impl McpSession {
    /// Spawn the server process and complete the initialize handshake.
    pub async fn connect(command: &str, args: &[String]) -> Result<Self> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ManabuError::Session(format!("Failed to spawn '{}': {}", command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ManabuError::Session("Child stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ManabuError::Session("Child stdout unavailable".to_string()))?;

        let mut session = Self {
            child: Some(child),
            stdin,
            reader: BufReader::new(stdout),
            next_id: 1,
        };

        session
            .request(
                "initialize",
                Some(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "manabu",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                })),
            )
            .await?;
        session.notify("initialized").await?;

        debug!("MCP session established with '{}'", command);
        Ok(session)
    }

    /// Fetch the tool catalog from the server.
    pub async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>> {
        let result = self.request("tools/list", None).await?;
        parse_tool_listing(&result)
    }

    /// Call one tool and return its concatenated text content.
    pub async fn call_tool(&mut self, name: &str, arguments: Map<String, Value>) -> Result<String> {
        let result = self
            .request(
                "tools/call",
                Some(json!({ "name": name, "arguments": arguments })),
            )
            .await?;
        let call_result: ToolCallResult = serde_json::from_value(result)
            .map_err(|e| ManabuError::Session(format!("Malformed tool result: {}", e)))?;
        Ok(call_result.joined_text())
    }

    /// Release the server process. Safe to call more than once.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill().await;
            debug!("MCP session closed");
        }
        Ok(())
    }

    async fn request(&mut self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;

        self.write_line(&JsonRpcRequest::new(id, method, params))
            .await?;

        loop {
            let mut line = String::new();
            let read = timeout(
                Duration::from_secs(RESPONSE_TIMEOUT_SECS),
                self.reader.read_line(&mut line),
            )
            .await
            .map_err(|_| ManabuError::Session(format!("Timed out waiting for {}", method)))?
            .map_err(|e| ManabuError::Session(format!("Read failed: {}", e)))?;

            if read == 0 {
                return Err(ManabuError::Session(
                    "Server closed the connection".to_string(),
                ));
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response: JsonRpcResponse = serde_json::from_str(line)
                .map_err(|e| ManabuError::Session(format!("Malformed response: {}", e)))?;

            // Skip responses that don't belong to this request
            if response.id != Some(Value::from(id)) {
                continue;
            }

            if let Some(error) = response.error {
                return Err(ManabuError::Session(format!(
                    "Server error {}: {}",
                    error.code, error.message
                )));
            }
            return Ok(response.result.unwrap_or(Value::Null));
        }
    }

    async fn notify(&mut self, method: &str) -> Result<()> {
        self.write_line(&JsonRpcRequest::notification(method)).await
    }

    async fn write_line(&mut self, request: &JsonRpcRequest) -> Result<()> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ManabuError::Session(format!("Write failed: {}", e)))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| ManabuError::Session(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

/// Parse a tools/list result into descriptors.
fn parse_tool_listing(result: &Value) -> Result<Vec<ToolDescriptor>> {
    let tools = result
        .get("tools")
        .and_then(Value::as_array)
        .ok_or_else(|| ManabuError::Session("Tool listing missing 'tools'".to_string()))?;

    tools
        .iter()
        .map(|tool| {
            let name = tool
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| ManabuError::Session("Tool without a name".to_string()))?;
            let description = tool
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let schema = tool.get("inputSchema").cloned().unwrap_or(Value::Null);
            Ok(ToolDescriptor::from_input_schema(name, description, &schema))
        })
        .collect()
}

/// Adapter exposing a remote session as a tool host for the orchestrator.
///
/// Requests are serialized through a mutex; the loop above is single-flight
/// per query anyway.
pub struct RemoteToolHost {
    session: tokio::sync::Mutex<McpSession>,
}

impl RemoteToolHost {
    pub fn new(session: McpSession) -> Self {
        Self {
            session: tokio::sync::Mutex::new(session),
        }
    }

    /// Close the underlying session.
    pub async fn close(&self) -> Result<()> {
        self.session.lock().await.close().await
    }
}

#[async_trait]
impl ToolHost for RemoteToolHost {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        self.session.lock().await.list_tools().await
    }

    async fn invoke(&self, name: &str, arguments: &Map<String, Value>) -> Result<String> {
        self.session
            .lock()
            .await
            .call_tool(name, arguments.clone())
            .await
    }
}
