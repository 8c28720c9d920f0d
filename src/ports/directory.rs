//! Directory port for bind and subtree searches.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::DirectoryResult;

/// One entry returned by a directory search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Requested attributes and their values.
    #[serde(default)]
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// Creates an entry with no attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
        }
    }
}

/// Authenticated, synchronous access to an LDAP-style directory.
///
/// Connecting is the adapter's constructor; once built, the session is
/// bound and then searched for the rest of the run. All searches use
/// subtree scope.
pub trait Directory: Send + Sync {
    /// Performs a simple bind with the given credentials.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Auth`](crate::error::DirectoryError::Auth)
    /// for invalid credentials and
    /// [`DirectoryError::Query`](crate::error::DirectoryError::Query) for
    /// any other protocol failure.
    fn bind(&self, user: &str, password: &str) -> DirectoryResult<()>;

    /// Returns every entry below `base_dn` matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Query`](crate::error::DirectoryError::Query)
    /// when the search cannot be completed.
    fn search(
        &self,
        base_dn: &str,
        filter: &str,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<DirectoryEntry>>;
}
