//! Tool catalog, validation, and dispatch.
//!
//! The registry is the single source of truth mapping tool names to their
//! gateway/shaper implementations. The `ToolHost` trait is the seam that
//! lets the orchestrator execute tools either in-process (the registry) or
//! through a remote stdio session.

mod catalog;
mod descriptor;
mod registry;
mod result;

pub use catalog::catalog;
pub use descriptor::{ParamSpec, ParamType, ToolDescriptor};
pub use registry::ToolRegistry;
pub use result::ToolResult;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Something that can advertise and execute tools.
#[async_trait]
pub trait ToolHost: Send + Sync {
    /// The tools available to the model, in stable order.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Execute one tool and return its text-serialized result.
    async fn invoke(&self, name: &str, arguments: &Map<String, Value>) -> Result<String>;
}
