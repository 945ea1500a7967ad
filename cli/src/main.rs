use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match cli::run(&args).await {
        Ok(summary) => {
            tracing::debug!(units = summary.reaped.len(), "demo finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
