use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use llama_search::cli::Args;
use llama_search::launch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mode = args.run_mode();
    let config = args.into_config()?;

    launch(&config, mode).await
}
