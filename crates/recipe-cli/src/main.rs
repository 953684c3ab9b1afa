//! recipe - package recipe host driver

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use recipe_cli::cmd;
use recipe_cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; --verbose only lowers the fallback
    let fallback = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { recipe } => cmd::inspect::inspect(&recipe),
        Commands::Create { recipe, build_dir } => {
            cmd::create::create(&recipe, build_dir.as_deref(), cli.verbose)
        }
    }
}
