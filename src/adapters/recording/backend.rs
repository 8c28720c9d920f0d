//! Recording adapter for the `IdentityBackend` port.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::error::BackendResult;
use crate::ports::backend::{BackendGroup, BackendUser, IdentityBackend};

/// Records backend interactions while delegating to an inner implementation.
pub struct RecordingBackend {
    inner: Box<dyn IdentityBackend>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingBackend {
    /// Creates a recording backend wrapping the given implementation.
    pub fn new(inner: Box<dyn IdentityBackend>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
pub(crate) struct NoInput {}

#[derive(Serialize)]
pub(crate) struct CreateGroupInput<'a> {
    pub(crate) id: &'a str,
    pub(crate) comment: &'a str,
}

#[derive(Serialize)]
pub(crate) struct CreateUserInput<'a> {
    pub(crate) id: &'a str,
    pub(crate) enabled: bool,
    pub(crate) groups: &'a [String],
}

#[derive(Serialize)]
pub(crate) struct UpdateUserGroupsInput<'a> {
    pub(crate) id: &'a str,
    pub(crate) groups: &'a [String],
}

impl IdentityBackend for RecordingBackend {
    fn list_users(&self) -> BackendResult<Vec<BackendUser>> {
        let result = self.inner.list_users();
        record_result(
            &self.recorder,
            "backend",
            "list_users",
            &NoInput {},
            &result,
        );
        result
    }

    fn list_groups(&self) -> BackendResult<Vec<BackendGroup>> {
        let result = self.inner.list_groups();
        record_result(
            &self.recorder,
            "backend",
            "list_groups",
            &NoInput {},
            &result,
        );
        result
    }

    fn create_group(&self, id: &str, comment: &str) -> BackendResult<()> {
        let result = self.inner.create_group(id, comment);
        let input = CreateGroupInput { id, comment };
        record_result(&self.recorder, "backend", "create_group", &input, &result);
        result
    }

    fn create_user(&self, id: &str, enabled: bool, groups: &[String]) -> BackendResult<()> {
        let result = self.inner.create_user(id, enabled, groups);
        let input = CreateUserInput {
            id,
            enabled,
            groups,
        };
        record_result(&self.recorder, "backend", "create_user", &input, &result);
        result
    }

    fn update_user_groups(&self, id: &str, groups: &[String]) -> BackendResult<()> {
        let result = self.inner.update_user_groups(id, groups);
        let input = UpdateUserGroupsInput { id, groups };
        record_result(
            &self.recorder,
            "backend",
            "update_user_groups",
            &input,
            &result,
        );
        result
    }
}
