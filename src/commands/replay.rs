//! `ldap-pve-sync replay` command.

use std::path::Path;

use tracing::warn;

use super::finish_pass;
use crate::cassette::config::CassetteConfig;
use crate::cli::PassArgs;
use crate::config::SyncConfig;
use crate::context::ServiceContext;
use crate::error::SyncError;

/// Re-run a pass from the cassettes of a recorded session.
///
/// The configuration must match the recording: every directory search and
/// backend write is checked against the recorded inputs. Recorded calls the
/// pass never made are reported as warnings.
///
/// # Errors
///
/// Returns a [`SyncError`] if the cassettes cannot be loaded, the replayed
/// setup phase fails, or strict mode sees apply failures.
pub fn run(session: &Path, pass: &PassArgs) -> Result<(), SyncError> {
    let config = SyncConfig::from_env(pass.env_file.as_deref())?;
    let cassettes = CassetteConfig::from_session_dir(session)?;
    let (ctx, replay) = ServiceContext::replaying(&cassettes)?;
    let outcome = crate::sync::run(&ctx, &config, pass.dry_run)?;

    for (port, remaining) in replay.unconsumed() {
        warn!(port, remaining, "Recorded interactions were not replayed");
    }
    finish_pass(&outcome, pass)
}
