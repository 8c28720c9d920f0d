//! Service context bundling the port trait objects.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::adapters::live::{LdapDirectory, ProxmoxBackend};
use crate::adapters::recording::{RecordingBackend, RecordingDirectory};
use crate::adapters::replaying::{ReplayingBackend, ReplayingDirectory};
use crate::cassette::config::CassetteConfig;
use crate::cassette::session::{RecordingSession, ReplaySession};
use crate::cassette::CassetteError;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::ports::backend::IdentityBackend;
use crate::ports::directory::Directory;

/// Bundles the two external boundaries of a sync run.
///
/// Constructors wire up different adapter implementations (live,
/// recording, replaying, or caller-supplied fakes).
pub struct ServiceContext {
    /// Directory service holding the source groups.
    pub directory: Box<dyn Directory>,
    /// Identity backend receiving users and groups.
    pub backend: Box<dyn IdentityBackend>,
}

impl ServiceContext {
    /// Creates a context from explicit port implementations.
    #[must_use]
    pub fn new(directory: Box<dyn Directory>, backend: Box<dyn IdentityBackend>) -> Self {
        Self { directory, backend }
    }

    /// Connects to the directory and prepares the backend client.
    ///
    /// The directory connection is opened here; the backend is not
    /// contacted until the first port call.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Directory`] if the directory is unreachable and
    /// [`SyncError::BackendSetup`] if the HTTP client cannot be built.
    pub fn live(config: &SyncConfig) -> Result<Self, SyncError> {
        let directory = LdapDirectory::connect(&config.directory.uri, &config.tls)?;
        let backend =
            ProxmoxBackend::new(&config.backend, &config.tls).map_err(SyncError::BackendSetup)?;
        Ok(Self::new(Box::new(directory), Box::new(backend)))
    }

    /// Creates a live context whose interactions are recorded below `root`.
    ///
    /// The returned session must be finished after the context is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the session directory cannot be created or the
    /// live context cannot be built.
    pub fn recording(
        config: &SyncConfig,
        root: &Path,
    ) -> Result<(Self, RecordingSession), SyncError> {
        let live = Self::live(config)?;
        let session = RecordingSession::new(root)?;
        info!(dir = %session.output_dir().display(), "Recording port interactions");

        let directory = RecordingDirectory::new(live.directory, Arc::clone(&session.directory));
        let backend = RecordingBackend::new(live.backend, Arc::clone(&session.backend));
        Ok((Self::new(Box::new(directory), Box::new(backend)), session))
    }

    /// Creates a context that answers from recorded cassettes.
    ///
    /// Ports without a cassette fail every call with a clear error. The
    /// returned session tells what the pass left unreplayed.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured cassette cannot be read or parsed.
    pub fn replaying(config: &CassetteConfig) -> Result<(Self, ReplaySession), CassetteError> {
        let session = ReplaySession::load(config)?;
        let directory = match &session.directory {
            Some(replayer) => ReplayingDirectory::new(Arc::clone(replayer)),
            None => ReplayingDirectory::unconfigured(),
        };
        let backend = match &session.backend {
            Some(replayer) => ReplayingBackend::new(Arc::clone(replayer)),
            None => ReplayingBackend::unconfigured(),
        };
        Ok((Self::new(Box::new(directory), Box::new(backend)), session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::config::{BACKEND_CASSETTE, DIRECTORY_CASSETTE};
    use crate::cassette::recorder::CassetteRecorder;
    use serde_json::json;

    #[test]
    fn replaying_context_serves_both_ports() {
        let dir = std::env::temp_dir().join("ldap_pve_sync_ctx_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let mut directory = CassetteRecorder::new(dir.join(DIRECTORY_CASSETTE), "directory");
        directory.record(
            "directory",
            "bind",
            json!({"user": "cn=sync"}),
            json!({"Ok": null}),
        );
        directory.finish().unwrap();
        let mut backend = CassetteRecorder::new(dir.join(BACKEND_CASSETTE), "backend");
        backend.record(
            "backend",
            "list_groups",
            json!({}),
            json!({"Ok": [{"id": "eng-ldap"}]}),
        );
        backend.finish().unwrap();

        let config = CassetteConfig::from_session_dir(&dir).unwrap();
        let (ctx, session) = ServiceContext::replaying(&config).unwrap();
        ctx.directory.bind("cn=sync", "whatever").unwrap();
        assert_eq!(ctx.backend.list_groups().unwrap()[0].id, "eng-ldap");
        assert!(session.unconsumed().is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn replaying_without_backend_cassette_errors_on_backend_calls() {
        let (ctx, _) = ServiceContext::replaying(&CassetteConfig::default()).unwrap();
        let err = ctx.backend.list_users().unwrap_err();
        assert!(err.message.contains("no cassette loaded for port backend"));
    }
}
