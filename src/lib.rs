//! Mirror LDAP group membership into Proxmox VE users and groups.
//!
//! A run resolves every configured directory group to its (nested) member
//! users, snapshots the backend's managed users and groups, and issues the
//! creates and group-list updates needed to converge. It never deletes.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod ports;
pub mod sync;

use clap::Parser;

pub use error::SyncError;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns a [`SyncError`] when the selected command fails. Argument errors
/// (including `--help`) are handled by clap before this returns.
pub fn run<I, T>(args: I) -> Result<(), SyncError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::parse_from(args);
    commands::dispatch(&cli.command)
}
