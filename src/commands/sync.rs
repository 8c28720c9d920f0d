//! `ldap-pve-sync sync` command.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use super::finish_pass;
use crate::cassette::session::RecordingSession;
use crate::cli::PassArgs;
use crate::config::SyncConfig;
use crate::context::ServiceContext;
use crate::error::SyncError;

/// Execute the `sync` command against the live directory and backend.
///
/// With `record` (or `SYNC_RECORD` when `record` is `None`), every port
/// interaction is written to a new cassette session below that directory,
/// even when the pass fails.
///
/// # Errors
///
/// Returns a [`SyncError`] for configuration, setup, or strict-mode apply
/// failures.
pub fn run(pass: &PassArgs, record: Option<&Path>) -> Result<(), SyncError> {
    let config = SyncConfig::from_env(pass.env_file.as_deref())?;

    let Some(root) = record.or(config.record_dir.as_deref()) else {
        let ctx = ServiceContext::live(&config)?;
        let outcome = crate::sync::run(&ctx, &config, pass.dry_run)?;
        return finish_pass(&outcome, pass);
    };

    let (ctx, session) = ServiceContext::recording(&config, root)?;
    let result = crate::sync::run(&ctx, &config, pass.dry_run);

    // Release the adapters' recorder handles before writing cassettes.
    drop(ctx);
    if let Some(dir) = save_recording(session) {
        eprintln!("Recording saved to: {}", dir.display());
    }

    finish_pass(&result?, pass)
}

/// Writes the session's cassettes.
///
/// The pass may already have written to the backend, so a failure here is
/// logged and never replaces the pass result.
fn save_recording(session: RecordingSession) -> Option<PathBuf> {
    match session.finish() {
        Ok(dir) => {
            info!(dir = %dir.display(), "Recording saved");
            Some(dir)
        }
        Err(e) => {
            error!(error = %e, "Failed to save recording");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn saved_recording_returns_session_dir() {
        let root = std::env::temp_dir().join("ldap_pve_sync_save_recording");
        let _ = std::fs::remove_dir_all(&root);

        let session = RecordingSession::new(&root).unwrap();
        let expected = session.output_dir().to_path_buf();
        assert_eq!(save_recording(session), Some(expected));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn failed_save_is_reported_without_error() {
        let root = std::env::temp_dir().join("ldap_pve_sync_save_recording_shared");
        let _ = std::fs::remove_dir_all(&root);

        let session = RecordingSession::new(&root).unwrap();
        let _held = Arc::clone(&session.directory);
        assert_eq!(save_recording(session), None);

        let _ = std::fs::remove_dir_all(&root);
    }
}
