//! Converge backend users and groups onto the resolved membership.
//!
//! Idempotent: re-running against a converged backend creates nothing and
//! rewrites every managed user's groups with the same list. Nothing is
//! ever deleted.

use std::collections::BTreeSet;

use tracing::{error, info, warn};

use super::identity::{TargetGroupId, TargetUserId};
use super::resolve::Resolution;
use crate::config::MANAGED_GROUP_COMMENT;
use crate::error::{BackendApiError, SyncError};
use crate::ports::backend::IdentityBackend;

/// Managed backend state read once at the start of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendSnapshot {
    /// Existing groups belonging to the destination realm.
    pub groups: BTreeSet<String>,
    /// Existing users of the managed realm type.
    pub users: BTreeSet<String>,
}

impl BackendSnapshot {
    /// Lists users and groups and keeps only the ones this sync manages.
    ///
    /// Groups are managed when their id ends with `-{realm}`; users when
    /// their realm type equals `realm_type`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Snapshot`] if either listing fails.
    pub fn fetch(
        backend: &dyn IdentityBackend,
        realm: &str,
        realm_type: &str,
    ) -> Result<Self, SyncError> {
        let suffix = format!("-{realm}");
        let groups = backend
            .list_groups()
            .map_err(|source| SyncError::Snapshot {
                resource: "groups",
                source,
            })?
            .into_iter()
            .filter(|group| group.id.ends_with(&suffix))
            .map(|group| group.id)
            .collect();
        let users = backend
            .list_users()
            .map_err(|source| SyncError::Snapshot {
                resource: "users",
                source,
            })?
            .into_iter()
            .filter(|user| user.realm_type == realm_type)
            .map(|user| user.id)
            .collect();
        Ok(Self { groups, users })
    }
}

/// One backend write the sync will perform (or performed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Create a group that is missing from the backend.
    CreateGroup {
        /// Group to create.
        group: TargetGroupId,
    },
    /// Create a user with its groups.
    CreateUser {
        /// User to create.
        user: TargetUserId,
        /// Groups the new user belongs to.
        groups: Vec<TargetGroupId>,
    },
    /// Replace an existing user's group list.
    UpdateUserGroups {
        /// User to update.
        user: TargetUserId,
        /// Full replacement group list.
        groups: Vec<TargetGroupId>,
    },
}

impl SyncAction {
    /// Identifier of the record the action touches.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::CreateGroup { group } => group.as_str(),
            Self::CreateUser { user, .. } | Self::UpdateUserGroups { user, .. } => user.as_str(),
        }
    }
}

/// A write that the backend rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyFailure {
    /// The action that failed.
    pub action: SyncAction,
    /// Error returned by the backend.
    pub error: BackendApiError,
}

/// Result of applying a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Number of actions the backend accepted.
    pub applied: usize,
    /// Actions the backend rejected, in attempt order.
    pub failures: Vec<ApplyFailure>,
}

impl ApplyReport {
    /// Total number of attempted actions.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.applied + self.failures.len()
    }

    /// Returns `true` when every action succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Plans the writes needed to converge the backend on `resolution`.
///
/// Group creates come first so user writes can reference them. Users are
/// emitted in identifier order.
#[must_use]
pub fn plan_sync(resolution: &Resolution, snapshot: &BackendSnapshot) -> Vec<SyncAction> {
    let creates = resolution
        .groups
        .iter()
        .filter(|group| !snapshot.groups.contains(group.as_str()))
        .map(|group| SyncAction::CreateGroup {
            group: group.clone(),
        });

    let users = resolution.membership.iter().map(|(user, groups)| {
        if snapshot.users.contains(user.as_str()) {
            SyncAction::UpdateUserGroups {
                user: user.clone(),
                groups: groups.clone(),
            }
        } else {
            SyncAction::CreateUser {
                user: user.clone(),
                groups: groups.clone(),
            }
        }
    });

    creates.chain(users).collect()
}

/// Applies planned actions in order, continuing past failures.
///
/// Each failure is logged with the identifier it concerns and collected in
/// the returned report. "Already exists" rejections are logged as warnings
/// since they only mean the backend changed after the snapshot.
pub fn execute_sync(backend: &dyn IdentityBackend, actions: &[SyncAction]) -> ApplyReport {
    let mut report = ApplyReport::default();

    for action in actions {
        let result = match action {
            SyncAction::CreateGroup { group } => {
                info!(group = %group, "Creating group");
                backend.create_group(group.as_str(), MANAGED_GROUP_COMMENT)
            }
            SyncAction::CreateUser { user, groups } => {
                info!(user = %user, groups = %join(groups), "Creating user");
                backend.create_user(user.as_str(), true, &to_strings(groups))
            }
            SyncAction::UpdateUserGroups { user, groups } => {
                info!(user = %user, groups = %join(groups), "Syncing user groups");
                backend.update_user_groups(user.as_str(), &to_strings(groups))
            }
        };

        match result {
            Ok(()) => report.applied += 1,
            Err(err) => {
                if err.is_conflict() {
                    warn!(target_id = action.target(), error = %err, "Already exists, continuing");
                } else {
                    error!(target_id = action.target(), error = %err, "Backend write failed");
                }
                report.failures.push(ApplyFailure {
                    action: action.clone(),
                    error: err,
                });
            }
        }
    }

    report
}

fn to_strings(groups: &[TargetGroupId]) -> Vec<String> {
    groups.iter().map(ToString::to_string).collect()
}

fn join(groups: &[TargetGroupId]) -> String {
    to_strings(groups).join(",")
}

/// Formats planned actions as a human-readable report.
#[must_use]
pub fn format_actions(actions: &[SyncAction]) -> String {
    if actions.is_empty() {
        return "Nothing to sync.".to_string();
    }

    actions
        .iter()
        .map(|action| match action {
            SyncAction::CreateGroup { group } => format!("  CREATE GROUP {group}"),
            SyncAction::CreateUser { user, groups } => {
                format!("  CREATE USER {user}: [{}]", join(groups))
            }
            SyncAction::UpdateUserGroups { user, groups } => {
                format!("  UPDATE USER {user}: [{}]", join(groups))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
