//! Replaying adapter for the `IdentityBackend` port.

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::replay_result;
use crate::adapters::recording::backend::{
    CreateGroupInput, CreateUserInput, NoInput, UpdateUserGroupsInput,
};
use crate::cassette::replayer::CassetteReplayer;
use crate::error::{BackendApiError, BackendResult};
use crate::ports::backend::{BackendGroup, BackendUser, IdentityBackend};

/// Serves recorded backend results from a cassette.
pub struct ReplayingBackend {
    replayer: Option<Arc<Mutex<CassetteReplayer>>>,
}

impl ReplayingBackend {
    /// Create a replaying backend backed by the given replayer.
    ///
    /// The replayer is shared so the caller can inspect what was left
    /// unconsumed after the pass.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self {
            replayer: Some(replayer),
        }
    }

    /// Create a replaying backend with no cassette. Every call fails.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { replayer: None }
    }

    fn replay<T, I>(&self, method: &str, input: &I) -> BackendResult<T>
    where
        T: DeserializeOwned,
        I: Serialize,
    {
        replay_result(self.replayer.as_deref(), "backend", method, input)
            .unwrap_or_else(|e| Err(BackendApiError::transport(format!("replay: {e}"))))
    }
}

impl IdentityBackend for ReplayingBackend {
    fn list_users(&self) -> BackendResult<Vec<BackendUser>> {
        self.replay("list_users", &NoInput {})
    }

    fn list_groups(&self) -> BackendResult<Vec<BackendGroup>> {
        self.replay("list_groups", &NoInput {})
    }

    fn create_group(&self, id: &str, comment: &str) -> BackendResult<()> {
        self.replay("create_group", &CreateGroupInput { id, comment })
    }

    fn create_user(&self, id: &str, enabled: bool, groups: &[String]) -> BackendResult<()> {
        let input = CreateUserInput {
            id,
            enabled,
            groups,
        };
        self.replay("create_user", &input)
    }

    fn update_user_groups(&self, id: &str, groups: &[String]) -> BackendResult<()> {
        self.replay("update_user_groups", &UpdateUserGroupsInput { id, groups })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use chrono::Utc;
    use serde_json::json;

    fn backend_with(interactions: Vec<Interaction>) -> ReplayingBackend {
        let replayer = CassetteReplayer::new(&Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            tool_version: "0.1.0".into(),
            interactions,
        });
        ReplayingBackend::new(Arc::new(Mutex::new(replayer)))
    }

    #[test]
    fn replays_listings() {
        let backend = backend_with(vec![Interaction {
            seq: 0,
            port: "backend".into(),
            method: "list_users".into(),
            input: json!({}),
            output: json!({"Ok": [{"id": "alice@ldap", "realm_type": "openid"}]}),
        }]);

        let users = backend.list_users().unwrap();
        assert_eq!(
            users,
            vec![BackendUser {
                id: "alice@ldap".into(),
                realm_type: "openid".into()
            }]
        );
    }

    #[test]
    fn replays_recorded_conflict() {
        let backend = backend_with(vec![Interaction {
            seq: 0,
            port: "backend".into(),
            method: "create_group".into(),
            input: json!({"id": "eng-ldap", "comment": "c"}),
            output: json!({"Err": {"status": 500, "message": "group 'eng-ldap' already exists"}}),
        }]);

        let err = backend.create_group("eng-ldap", "c").unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(err.status, Some(500));
    }

    #[test]
    fn unrecorded_write_is_a_transport_error() {
        let backend = backend_with(vec![]);
        let err = backend.update_user_groups("bob@ldap", &[]).unwrap_err();
        assert_eq!(err.status, None);
        assert!(err.message.contains("cassette exhausted"));
    }
}
