//! MCP command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::mcp::McpServer;
use anyhow::Result;

/// Run the MCP server.
pub async fn run_mcp(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Tools, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let registry = super::build_registry(&settings)?;
    let server = McpServer::new(registry);
    server.run().await
}
