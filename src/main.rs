use std::process::ExitCode;

use clap::Parser;
use todo_stations::{Config, run, shutdown_signal};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("todo_stations=info")),
        )
        .init();

    let config = Config::parse();

    match run(config, shutdown_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("failed to exit successfully: {e}");
            ExitCode::FAILURE
        }
    }
}
