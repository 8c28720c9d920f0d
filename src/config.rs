//! Run configuration read once from the environment.
//!
//! Core logic never reads environment variables itself; it receives a
//! [`SyncConfig`] built here.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::sync::resolve::MemberStrategy;

/// Comment attached to every group created by a sync run.
pub const MANAGED_GROUP_COMMENT: &str = "LDAP/OpenID Sync Managed DO NOT EDIT";

/// Default realm type of backend users managed by the sync.
pub const DEFAULT_REALM_TYPE: &str = "openid";

/// Certificate verification policy shared by the directory and backend clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsPolicy {
    /// Verify against the PEM bundle at this path.
    CustomCa(PathBuf),
    /// Skip certificate verification entirely.
    Insecure,
    /// Verify against the platform trust store.
    SystemDefault,
}

impl TlsPolicy {
    /// Picks the policy from the optional CA bundle and verify toggle.
    ///
    /// A CA bundle always wins; disabling verification only applies when
    /// no bundle is configured.
    #[must_use]
    pub fn select(ca_bundle: Option<PathBuf>, verify: bool) -> Self {
        match ca_bundle {
            Some(path) => Self::CustomCa(path),
            None if !verify => Self::Insecure,
            None => Self::SystemDefault,
        }
    }
}

/// Directory connection and search settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    /// Directory URI (`ldap://` or `ldaps://`).
    pub uri: String,
    /// Bind DN. Empty for anonymous binds.
    pub bind_user: String,
    /// Bind password.
    pub bind_password: String,
    /// Base DN for both the group search and the member searches.
    pub base_dn: String,
    /// Filter selecting the groups to mirror.
    pub group_filter: String,
    /// How nested members are looked up.
    pub member_strategy: MemberStrategy,
}

/// Proxmox VE API access settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Host name, optionally with `:port`.
    pub host: String,
    /// API user including its realm (e.g. `root@pam`).
    pub user: String,
    /// API password.
    pub password: String,
}

/// Immutable configuration for one sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Realm suffix used to build target identifiers.
    pub dest_realm: String,
    /// Realm type of backend users considered managed.
    pub realm_type: String,
    /// Directory settings.
    pub directory: DirectoryConfig,
    /// Backend settings.
    pub backend: BackendConfig,
    /// TLS policy for both remote systems.
    pub tls: TlsPolicy,
    /// Directory to record cassettes below when `--record` is not given.
    pub record_dir: Option<PathBuf>,
}

impl SyncConfig {
    /// Loads `.env` (or `env_file` when given) and reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an env file cannot be parsed, an explicit
    /// env file is missing, or a required variable is missing.
    pub fn from_env(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path)
                    .map_err(|e| env_file_error(path, &e))?;
            }
            None => match dotenvy::dotenv() {
                Ok(_) => {}
                // A missing default .env is fine.
                Err(e) if e.not_found() => {}
                Err(e) => return Err(env_file_error(Path::new(".env"), &e)),
            },
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// The destination realm is checked first so a missing realm is always
    /// the reported error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |var: &'static str, hint: &'static str| {
            get(var).ok_or(ConfigError::Missing { var, hint })
        };

        let dest_realm = require("PVE_DEST_REALM", "Destination realm")?;

        let member_strategy = match get("LDAP_MEMBER_STRATEGY") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::Invalid {
                var: "LDAP_MEMBER_STRATEGY",
                message,
            })?,
            None => MemberStrategy::default(),
        };

        let directory = DirectoryConfig {
            uri: require("LDAP_URI", "Directory URI")?,
            bind_user: get("LDAP_USER").unwrap_or_default(),
            bind_password: get("LDAP_PASS").unwrap_or_default(),
            base_dn: require("LDAP_BASE_DN", "Directory base DN")?,
            group_filter: require("LDAP_SEARCH_FILTER", "Group search filter")?,
            member_strategy,
        };

        let backend = BackendConfig {
            host: require("PVE_HOST", "Proxmox host")?,
            user: require("PVE_USER", "Proxmox user")?,
            password: require("PVE_PASS", "Proxmox password")?,
        };

        let ca_bundle = get("CA_BUNDLE").map(|raw| resolve_path(&raw));
        let verify = get("TLS_VERIFY").is_none_or(|raw| parse_toggle(&raw));

        Ok(Self {
            dest_realm,
            realm_type: get("PVE_REALM_TYPE")
                .unwrap_or_else(|| DEFAULT_REALM_TYPE.to_string()),
            directory,
            backend,
            tls: TlsPolicy::select(ca_bundle, verify),
            record_dir: get("SYNC_RECORD").map(|raw| resolve_path(&raw)),
        })
    }
}

fn env_file_error(path: &Path, err: &dotenvy::Error) -> ConfigError {
    ConfigError::EnvFile {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

/// Interprets a boolean-ish environment value. Anything that is not an
/// explicit "off" keeps verification enabled.
fn parse_toggle(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

/// Makes a configured path absolute without requiring it to exist yet.
fn resolve_path(raw: &str) -> PathBuf {
    let path = PathBuf::from(raw.trim());
    std::path::absolute(&path).unwrap_or(path)
}
