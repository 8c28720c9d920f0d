//! Error types for every phase of a sync run.
//!
//! Setup failures (configuration, directory access, identifier derivation,
//! backend snapshot) abort the run. [`BackendApiError`] is also produced by
//! individual writes, where it is recoverable and only reported.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cassette::CassetteError;

/// Convenience alias used by the directory port.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Convenience alias used by the backend port.
pub type BackendResult<T> = Result<T, BackendApiError>;

/// Missing or invalid configuration. Raised before any network call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable was not set or was empty.
    #[error("{hint} required (set {var})")]
    Missing {
        /// Environment variable name.
        var: &'static str,
        /// Human-readable description of the setting.
        hint: &'static str,
    },

    /// A variable was set to a value that cannot be used.
    #[error("invalid value for {var}: {message}")]
    Invalid {
        /// Environment variable name.
        var: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// An env file exists but could not be loaded.
    #[error("failed to load env file {path}: {message}")]
    EnvFile {
        /// Path that was requested.
        path: String,
        /// Loader error text.
        message: String,
    },
}

/// Failures talking to the directory service.
#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum DirectoryError {
    /// The connection (or TLS setup) could not be established.
    #[error("failed to connect to directory at {uri}: {message}")]
    Connection {
        /// Directory URI.
        uri: String,
        /// Underlying error text.
        message: String,
    },

    /// The bind was rejected because the credentials are invalid.
    #[error("Invalid credentials for {user}")]
    Auth {
        /// Bind DN that was rejected.
        user: String,
    },

    /// Any other protocol-level failure (bind or search).
    #[error("directory query failed: {0}")]
    Query(String),
}

/// A DN whose first component cannot be turned into a local name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed DN {dn:?}: {reason}")]
pub struct MalformedDnError {
    /// The offending DN.
    pub dn: String,
    /// What was wrong with it.
    pub reason: &'static str,
}

/// A failed call against the identity backend API.
#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct BackendApiError {
    /// HTTP status, absent for transport failures.
    pub status: Option<u16>,
    /// Message returned by the backend or the transport.
    pub message: String,
}

impl std::fmt::Display for BackendApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(code) => write!(f, "backend API error ({code}): {}", self.message),
            None => write!(f, "backend request failed: {}", self.message),
        }
    }
}

impl BackendApiError {
    /// Builds an error carrying an HTTP status.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Builds an error for a failure that never produced a response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Returns `true` when the backend rejected a create because the
    /// resource already exists.
    ///
    /// Proxmox answers duplicate creates with a 500 and an
    /// "already exists" message rather than a 409.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status == Some(409) || self.message.contains("already exists")
    }
}

/// A fatal error that ends the run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration was missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The directory could not be reached, bound or searched.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// A directory DN could not be mapped to a target identifier.
    #[error(transparent)]
    MalformedDn(#[from] MalformedDnError),

    /// The backend snapshot could not be fetched.
    #[error("failed to read backend {resource}: {source}")]
    Snapshot {
        /// Which listing failed (`users` or `groups`).
        resource: &'static str,
        /// Underlying API error.
        #[source]
        source: BackendApiError,
    },

    /// The backend client could not be set up.
    #[error("failed to set up backend client: {0}")]
    BackendSetup(#[source] BackendApiError),

    /// Cassette recording or replay could not be set up or finished.
    #[error(transparent)]
    Cassette(#[from] CassetteError),

    /// `--strict` was requested and some writes failed.
    #[error("{failed} of {total} backend operations failed")]
    ApplyFailed {
        /// Number of failed operations.
        failed: usize,
        /// Number of attempted operations.
        total: usize,
    },
}

impl SyncError {
    /// Process exit status for this error.
    ///
    /// Every setup failure exits with 1. Strict-mode apply failures exit
    /// with 2 so schedulers can tell them apart.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ApplyFailed { .. } => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_realm_message_is_operator_friendly() {
        let err = ConfigError::Missing {
            var: "PVE_DEST_REALM",
            hint: "Destination realm",
        };
        assert_eq!(
            err.to_string(),
            "Destination realm required (set PVE_DEST_REALM)"
        );
    }

    #[test]
    fn auth_error_mentions_invalid_credentials() {
        let err = DirectoryError::Auth {
            user: "cn=admin,dc=x".into(),
        };
        assert!(err.to_string().starts_with("Invalid credentials"));
    }

    #[test]
    fn conflict_detection_matches_proxmox_wording() {
        let err = BackendApiError::status(
            500,
            "create group failed: group 'eng-ldap' already exists",
        );
        assert!(err.is_conflict());
        assert!(BackendApiError::status(409, "conflict").is_conflict());
        assert!(!BackendApiError::status(403, "permission check failed").is_conflict());
    }

    #[test]
    fn backend_error_display_includes_status() {
        assert_eq!(
            BackendApiError::status(403, "denied").to_string(),
            "backend API error (403): denied"
        );
        assert_eq!(
            BackendApiError::transport("timed out").to_string(),
            "backend request failed: timed out"
        );
    }

    #[test]
    fn exit_codes_separate_setup_from_apply_failures() {
        let setup: SyncError = DirectoryError::Query("no such object".into()).into();
        assert_eq!(setup.exit_code(), 1);
        let apply = SyncError::ApplyFailed {
            failed: 1,
            total: 3,
        };
        assert_eq!(apply.exit_code(), 2);
    }
}
