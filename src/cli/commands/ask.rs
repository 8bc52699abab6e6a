//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, model: Option<String>, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'manabu config show' to inspect the current configuration.");
        return Err(e.into());
    }

    let backend = super::build_backend(&settings, model);
    let registry = super::build_registry(&settings)?;
    let orchestrator = Orchestrator::new(backend, registry);

    let spinner = Output::spinner("Thinking...");

    match orchestrator.answer(question).await {
        Ok(response) => {
            spinner.finish_and_clear();
            println!("\n{}\n", response);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
