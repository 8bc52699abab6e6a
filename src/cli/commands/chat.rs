//! Interactive chat command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::{ManabuError, Result};
use crate::mcp::{McpSession, RemoteToolHost};
use crate::orchestrator::Orchestrator;
use crate::tools::ToolHost;
use console::style;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Run the interactive chat command.
///
/// With `--server`, tools run in a separate MCP server process instead of
/// in-process; the session is closed when the loop ends, errors included.
pub async fn run_chat(
    model: Option<String>,
    server: Option<String>,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks; with a remote server the Moodle credentials live
    // on the server side
    let operation = if server.is_some() {
        Operation::RemoteChat
    } else {
        Operation::Ask
    };
    if let Err(e) = preflight::check(operation, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'manabu config show' to inspect the current configuration.");
        return Err(e);
    }

    let backend = super::build_backend(&settings, model);

    let remote = match &server {
        Some(command_line) => {
            let mut parts = command_line.split_whitespace();
            let command = parts
                .next()
                .ok_or_else(|| ManabuError::Session("Empty server command".to_string()))?;
            let args: Vec<String> = parts.map(str::to_string).collect();

            let session = McpSession::connect(command, &args).await?;
            Some(Arc::new(RemoteToolHost::new(session)))
        }
        None => None,
    };

    let tools: Arc<dyn ToolHost> = match &remote {
        Some(host) => host.clone(),
        None => super::build_registry(&settings)?,
    };

    if let Some(host) = &remote {
        match host.list_tools().await {
            Ok(listed) => {
                Output::success(&format!("Connected to tool server ({} tools)", listed.len()));
                for tool in &listed {
                    Output::list_item(&tool.name);
                }
            }
            Err(e) => Output::warning(&format!("Could not list server tools: {}", e)),
        }
    }

    let orchestrator = Orchestrator::new(backend, tools);

    println!("\n{}", style("Manabu Chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask about your courses, or 'exit' to quit.").dim()
    );

    let result = chat_loop(&orchestrator).await;

    if let Some(host) = &remote {
        if let Err(e) = host.close().await {
            Output::warning(&format!("Failed to close tool server: {}", e));
        }
    }

    result
}

async fn chat_loop(orchestrator: &Orchestrator) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        match orchestrator.answer(input).await {
            Ok(response) => {
                println!("\n{} {}\n", style("Manabu:").cyan().bold(), response);
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
