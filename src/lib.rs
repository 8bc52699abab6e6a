//! Manabu - a Moodle assistant
//!
//! Answers natural-language questions about a Moodle site by letting a
//! language model pick one of a handful of read-only query tools, executing
//! it against the Moodle web-service API, and composing a reply from the
//! result.
//!
//! The name "Manabu" comes from the Japanese word for "to learn."
//!
//! # Overview
//!
//! Manabu lets you:
//! - Ask about assignments due within the next N days
//! - Check unread messages (HTML-stripped, timestamps rendered in JST)
//! - Find quizzes you have not completed yet
//! - List the courses you are enrolled in
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `moodle` - Moodle web-service gateway and result shaping
//! - `tools` - Tool catalog, argument validation, and dispatch
//! - `llm` - Model backends (OpenAI, Ollama) behind one trait
//! - `orchestrator` - The decide / invoke / respond loop
//! - `mcp` - MCP stdio server and client session
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use manabu::config::Settings;
//! use manabu::llm::OpenAiBackend;
//! use manabu::moodle::MoodleGateway;
//! use manabu::orchestrator::Orchestrator;
//! use manabu::tools::ToolRegistry;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let gateway = Arc::new(MoodleGateway::new(&settings.moodle)?);
//!     let registry = Arc::new(ToolRegistry::new(gateway));
//!     let backend = Arc::new(OpenAiBackend::new(&settings.llm));
//!     let orchestrator = Orchestrator::new(backend, registry);
//!
//!     let reply = orchestrator.answer("What is due in the next 3 days?").await?;
//!     println!("{}", reply);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod mcp;
pub mod moodle;
pub mod orchestrator;
pub mod tools;

pub use error::{ManabuError, Result};
