//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI parser for `ldap-pve-sync`.
#[derive(Debug, Parser)]
#[command(
    name = "ldap-pve-sync",
    version,
    about = "Mirror LDAP group membership into Proxmox VE"
)]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command that runs a sync pass.
#[derive(Debug, Clone, Default, Args)]
pub struct PassArgs {
    /// Compute and print the plan without writing to the backend.
    #[arg(long)]
    pub dry_run: bool,
    /// Exit with status 2 if any backend write fails.
    #[arg(long)]
    pub strict: bool,
    /// Load variables from this file instead of `./.env`.
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one reconciliation pass against the live directory and backend.
    Sync {
        /// Shared pass options.
        #[command(flatten)]
        pass: PassArgs,
        /// Record all port interactions to cassettes below this directory.
        #[arg(long, value_name = "DIR")]
        record: Option<PathBuf>,
    },
    /// Re-run a pass offline from a recorded session directory.
    Replay {
        /// Session directory written by `sync --record`.
        session: PathBuf,
        /// Shared pass options.
        #[command(flatten)]
        pass: PassArgs,
    },
}
