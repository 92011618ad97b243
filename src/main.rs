use anyhow::Result;
use checkup::cli::Cli;
use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();
    let has_issues = cli.run().await?;

    // Issues surface through the exit code so CI pipelines can gate on it
    Ok(if has_issues {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    // Log level is controlled through RUST_LOG, e.g. RUST_LOG=checkup=debug
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
