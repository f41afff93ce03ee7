use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "idlink")]
#[command(bin_name = "idlink")]
#[command(about = "Dev tools for idlink association tables", long_about = None)]
pub struct Cli {
    /// Directory holding the association table.
    #[arg(long, env = "IDLINK_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// JSON settings file; defaults apply when omitted.
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate and normalize identifiers.
    Validate {
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
    /// Start a handshake and print the provider redirect.
    Begin {
        identifier: String,
        /// Where the provider should send the user agent back.
        #[arg(long)]
        return_url: Option<String>,
    },
    /// Interpret a provider response read from a JSON file.
    Complete {
        /// `HandshakeOutcome` JSON.
        #[arg(long)]
        outcome: PathBuf,
        /// The logged in account, if any.
        #[arg(long)]
        account: Option<String>,
        #[arg(long)]
        return_url: Option<String>,
    },
    /// List associations.
    List {
        /// Only associations of this account.
        #[arg(long)]
        account: Option<String>,
    },
    /// Remove one association.
    Remove {
        identifier: String,
        #[command(flatten)]
        requester: Requester,
    },
    /// Remove several associations.
    BulkRemove {
        #[arg(required = true)]
        identifiers: Vec<String>,
        #[command(flatten)]
        requester: Requester,
    },
}

#[derive(Debug, clap::Args)]
pub struct Requester {
    /// Account performing the removal.
    #[arg(long, default_value = "cli")]
    pub account: String,
    /// Act with permission to manage associations.
    #[arg(long)]
    pub manage: bool,
}
