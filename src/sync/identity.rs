//! Target identifiers derived from directory DNs.
//!
//! Derivation is a pure function of the DN and the destination realm, so
//! the same directory state always maps to the same backend identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MalformedDnError;

/// Returns the value of the leftmost RDN of `dn`.
///
/// The RDN ends at the first comma not escaped with a backslash. The value
/// is trimmed and left otherwise untouched.
///
/// # Errors
///
/// Returns [`MalformedDnError`] when the first component has no `=` or an
/// empty value.
pub fn local_name(dn: &str) -> Result<&str, MalformedDnError> {
    let rdn = first_rdn(dn);
    let (_, value) = rdn.split_once('=').ok_or(MalformedDnError {
        dn: dn.to_string(),
        reason: "first component has no '='",
    })?;
    let value = value.trim();
    if value.is_empty() {
        return Err(MalformedDnError {
            dn: dn.to_string(),
            reason: "first component has no value",
        });
    }
    Ok(value)
}

fn first_rdn(dn: &str) -> &str {
    let mut escaped = false;
    for (idx, ch) in dn.char_indices() {
        match ch {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => return &dn[..idx],
            _ => escaped = false,
        }
    }
    dn
}

/// Backend group identifier, `{localName}-{realm}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetGroupId(String);

impl TargetGroupId {
    /// Derives the group identifier for a directory group DN.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedDnError`] if the DN has no usable local name.
    pub fn from_dn(dn: &str, realm: &str) -> Result<Self, MalformedDnError> {
        Ok(Self(format!("{}-{realm}", local_name(dn)?)))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetGroupId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Backend user identifier, `{localName}@{realm}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetUserId(String);

impl TargetUserId {
    /// Derives the user identifier for a directory user DN.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedDnError`] if the DN has no usable local name.
    pub fn from_dn(dn: &str, realm: &str) -> Result<Self, MalformedDnError> {
        Ok(Self(format!("{}@{realm}", local_name(dn)?)))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetUserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
