//! Command dispatch and handlers.

pub mod replay;
pub mod sync;

use crate::cli::{Command, PassArgs};
use crate::error::SyncError;
use crate::sync::reconcile::format_actions;
use crate::sync::SyncOutcome;

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns the fatal error that ended the command.
pub fn dispatch(command: &Command) -> Result<(), SyncError> {
    match command {
        Command::Sync { pass, record } => sync::run(pass, record.as_deref()),
        Command::Replay { session, pass } => replay::run(session, pass),
    }
}

/// Prints the outcome of a pass and applies the `--strict` policy.
fn finish_pass(outcome: &SyncOutcome, pass: &PassArgs) -> Result<(), SyncError> {
    let Some(report) = &outcome.report else {
        println!("Dry run, would perform:");
        println!("{}", format_actions(&outcome.actions));
        return Ok(());
    };

    println!(
        "Sync complete: {} groups, {} users, {} of {} operations applied",
        outcome.resolution.groups.len(),
        outcome.resolution.membership.len(),
        report.applied,
        report.attempted(),
    );
    for failure in &report.failures {
        eprintln!("  FAILED {}: {}", failure.action.target(), failure.error);
    }

    if pass.strict && !report.is_clean() {
        return Err(SyncError::ApplyFailed {
            failed: report.failures.len(),
            total: report.attempted(),
        });
    }
    Ok(())
}
