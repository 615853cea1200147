//! ESS portal command-line client
//!
//! ```bash
//! ess login --email ada@example.com   # prompts for password and, if asked, a code
//! ess whoami
//! ess get payslips --param year=2025
//! ess clock-in
//! ess logout
//! ```
//!
//! The session survives between invocations in a sealed file under `~/.ess`.
//! Set `RUST_LOG=ess_core=debug` (or pass `--verbose`) to trace requests.

mod args;
mod commands;
mod console;
mod router;

use args::Cli;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("ess_core=debug,ess_sdk=debug,ess=debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    router::route(cli).await
}
