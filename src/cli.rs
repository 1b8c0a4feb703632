//! CLI argument definitions.

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `claim`.
#[derive(Debug, Parser)]
#[command(name = "claim", version, about = "A command line tool to manage Crossplane Claims")]
pub struct Cli {
    /// Verbose logging.
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Migrate Crossplane Claims to a new namespace.
    Migrate {
        /// Kind of the Crossplane Claim, accepts the `TYPE[.VERSION][.GROUP][/NAME]` format.
        claim: String,

        /// Name of the Crossplane Claim, unless passed as part of CLAIM.
        name: Option<String>,

        /// Namespace of the existing Claim.
        #[arg(short = 'n', long, default_value = "default")]
        namespace: String,

        /// Destination namespace for the Claim.
        #[arg(long)]
        dest_namespace: String,
    },
}
