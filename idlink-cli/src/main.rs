//! `idlink`: inspect and drive an association table from the command line.

mod cli;
mod commands;
mod gateway;

use clap::Parser;
use eyre::Result;

use crate::cli::Cli;
use crate::commands::Context;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = commands::load_settings(cli.settings.as_deref())?;
    let data_dir = commands::data_dir(cli.data_dir)?;
    let context = Context::open(&data_dir, settings)?;

    let output = commands::run(cli.command, &context).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
