//! Gradewise - rubric-driven grading CLI
//!
//! Grades submissions against a rubric with a generative model and prints
//! the normalized report as JSON.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use gradewise_core::ErrorReport;

fn init_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()?;

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    match commands::dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            let report = ErrorReport {
                error: e.to_string(),
                detail: e.chain().nth(1).map(|cause| cause.to_string()),
            };
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(_) => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
