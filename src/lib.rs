pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod shared;

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use crate::interfaces::cli::{self, Cli};

pub fn run() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    // Pick up OPENAI_API_KEY and REPORT_BUILDER_* from a local .env file.
    let _ = dotenvy::dotenv();

    let args = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "Failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(cli::execute(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_query_rejection() => {
            error!(error = %err, "Query rejected");
            eprintln!("Query rejected: {}", err);
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(error = %err, "Report failed");
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
