//! MCP (Model Context Protocol) support.
//!
//! `server` exposes the tool registry over JSON-RPC 2.0 on stdio so other
//! assistants can call the Moodle tools; `client` is the session the chat
//! loop uses to run tools in a separate server process.

mod client;
mod protocol;
mod server;

pub use client::{McpSession, RemoteToolHost};
pub use server::McpServer;
