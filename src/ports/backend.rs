//! Identity backend port for Proxmox-style user and group records.

use serde::{Deserialize, Serialize};

use crate::error::BackendResult;

/// A user as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendUser {
    /// User identifier (`name@realm`).
    pub id: String,
    /// Type of the realm the user belongs to (`openid`, `pam`, `ldap`, ...).
    pub realm_type: String,
}

/// A group as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendGroup {
    /// Group identifier.
    pub id: String,
}

/// Reads and writes users and groups in the identity backend.
///
/// Every write is an independent call; a failed write never poisons the
/// session for later calls.
pub trait IdentityBackend: Send + Sync {
    /// Lists every user known to the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    fn list_users(&self) -> BackendResult<Vec<BackendUser>>;

    /// Lists every group known to the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    fn list_groups(&self) -> BackendResult<Vec<BackendGroup>>;

    /// Creates a group with the given comment.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the create, including when
    /// the group already exists.
    fn create_group(&self, id: &str, comment: &str) -> BackendResult<()>;

    /// Creates a user that is a member of `groups`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the create.
    fn create_user(&self, id: &str, enabled: bool, groups: &[String]) -> BackendResult<()>;

    /// Replaces the user's group membership with `groups`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    fn update_user_groups(&self, id: &str, groups: &[String]) -> BackendResult<()>;
}
