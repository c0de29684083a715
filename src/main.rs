//! justqr - build, preview and export QR codes from the terminal.

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.load_config()?;

    match cli.command {
        Command::Build(args) => args.execute(),
        Command::Preview(args) => args.execute(&config).await,
        Command::Export(args) => args.execute(&config).await,
        Command::Live(args) => args.execute(&config).await,
    }
}
