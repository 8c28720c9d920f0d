//! Resolve directory groups into a flat user → groups membership table.
//!
//! The backend has no notion of nested groups, so each directory group is
//! flattened to the users that belong to it directly or transitively. How
//! that flattening is done lives behind [`MemberResolver`].

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::identity::{TargetGroupId, TargetUserId};
use crate::config::DirectoryConfig;
use crate::error::{DirectoryResult, SyncError};
use crate::ports::directory::Directory;

/// Matching rule OID for transitive membership on Active Directory.
const IN_CHAIN_RULE: &str = "1.2.840.113556.1.4.1941";

/// Query strategy for finding the (nested) members of a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MemberStrategy {
    /// `memberOf=<dn>`; relies on the server already reporting nested
    /// membership in `memberOf`.
    #[default]
    MemberOf,
    /// `memberOf:1.2.840.113556.1.4.1941:=<dn>`; asks the server to walk
    /// the group chain.
    InChain,
}

impl MemberStrategy {
    /// Builds the person filter selecting members of `group_dn`.
    #[must_use]
    pub fn filter(self, group_dn: &str) -> String {
        let escaped = ldap3::ldap_escape(group_dn);
        match self {
            Self::MemberOf => format!("(&(objectClass=person)(memberOf={escaped}))"),
            Self::InChain => {
                format!("(&(objectClass=person)(memberOf:{IN_CHAIN_RULE}:={escaped}))")
            }
        }
    }
}

impl FromStr for MemberStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member-of" | "memberof" => Ok(Self::MemberOf),
            "in-chain" | "inchain" => Ok(Self::InChain),
            other => Err(format!(
                "unknown member strategy {other:?} (expected member-of or in-chain)"
            )),
        }
    }
}

/// Flattens a directory group to the DNs of its member users.
pub trait MemberResolver {
    /// Returns the DNs of every user that is a direct or nested member of
    /// `group_dn`.
    ///
    /// # Errors
    ///
    /// Returns a directory error if the lookup fails.
    fn resolve_members(&self, group_dn: &str) -> DirectoryResult<Vec<String>>;
}

/// Resolves members with one subtree search per group.
pub struct SearchMemberResolver<'a> {
    directory: &'a dyn Directory,
    base_dn: &'a str,
    strategy: MemberStrategy,
}

impl<'a> SearchMemberResolver<'a> {
    /// Creates a resolver searching below `base_dn`.
    #[must_use]
    pub fn new(directory: &'a dyn Directory, base_dn: &'a str, strategy: MemberStrategy) -> Self {
        Self {
            directory,
            base_dn,
            strategy,
        }
    }
}

impl MemberResolver for SearchMemberResolver<'_> {
    fn resolve_members(&self, group_dn: &str) -> DirectoryResult<Vec<String>> {
        let filter = self.strategy.filter(group_dn);
        let entries = self.directory.search(self.base_dn, &filter, &["dn"])?;
        Ok(entries.into_iter().map(|entry| entry.dn).collect())
    }
}

/// Users mapped to the groups they should belong to.
///
/// Keys iterate in sorted order. Each user's group list keeps first-seen
/// order and never holds the same group twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipTable(BTreeMap<TargetUserId, Vec<TargetGroupId>>);

impl MembershipTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `group` to `user`'s entry, creating the entry if needed.
    pub fn add(&mut self, user: TargetUserId, group: TargetGroupId) {
        let groups = self.0.entry(user).or_default();
        if !groups.contains(&group) {
            groups.push(group);
        }
    }

    /// Returns the groups recorded for `user`.
    #[cfg(test)]
    pub fn groups_of(&self, user: &TargetUserId) -> Option<&[TargetGroupId]> {
        self.0.get(user).map(Vec::as_slice)
    }

    /// Number of users in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no user was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates users and their groups in user order.
    pub fn iter(&self) -> btree_map::Iter<'_, TargetUserId, Vec<TargetGroupId>> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a MembershipTable {
    type Item = (&'a TargetUserId, &'a Vec<TargetGroupId>);
    type IntoIter = btree_map::Iter<'a, TargetUserId, Vec<TargetGroupId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Outcome of resolving the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Every group matched by the group search, in search order, once each.
    pub groups: Vec<TargetGroupId>,
    /// Flattened membership.
    pub membership: MembershipTable,
}

/// Runs the group search and flattens every matched group.
///
/// # Errors
///
/// Returns [`SyncError::Directory`] if a search fails and
/// [`SyncError::MalformedDn`] if a group or member DN has no local name.
pub fn resolve(
    directory: &dyn Directory,
    config: &DirectoryConfig,
    realm: &str,
    members: &dyn MemberResolver,
) -> Result<Resolution, SyncError> {
    let entries = directory.search(&config.base_dn, &config.group_filter, &["dn"])?;
    info!(count = entries.len(), filter = %config.group_filter, "Found directory groups");

    let mut resolution = Resolution::default();
    for entry in &entries {
        let group_id = TargetGroupId::from_dn(&entry.dn, realm)?;
        if !resolution.groups.contains(&group_id) {
            resolution.groups.push(group_id.clone());
        }

        let member_dns = members.resolve_members(&entry.dn)?;
        debug!(group = %group_id, members = member_dns.len(), "Resolved group members");
        for member_dn in &member_dns {
            let user_id = TargetUserId::from_dn(member_dn, realm)?;
            resolution.membership.add(user_id, group_id.clone());
        }
    }

    Ok(resolution)
}
