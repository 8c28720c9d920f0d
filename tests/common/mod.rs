//! Shared in-memory ports for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use ldap_pve_sync::config::{BackendConfig, DirectoryConfig, SyncConfig, TlsPolicy};
use ldap_pve_sync::error::{BackendApiError, BackendResult, DirectoryError, DirectoryResult};
use ldap_pve_sync::ports::{
    BackendGroup, BackendUser, Directory, DirectoryEntry, IdentityBackend,
};
use ldap_pve_sync::sync::resolve::MemberStrategy;

pub const BIND_USER: &str = "cn=sync,dc=x";
pub const BASE_DN: &str = "dc=x";
pub const GROUP_FILTER: &str = "(cn=pve-*)";
pub const ENG: &str = "cn=eng,ou=groups,dc=x";
pub const OPS: &str = "cn=ops,ou=groups,dc=x";
pub const ALICE: &str = "cn=alice,ou=people,dc=x";
pub const BOB: &str = "cn=bob,ou=people,dc=x";

pub fn config() -> SyncConfig {
    SyncConfig {
        dest_realm: "ldap".into(),
        realm_type: "openid".into(),
        directory: DirectoryConfig {
            uri: "ldap://directory.test".into(),
            bind_user: BIND_USER.into(),
            bind_password: "secret".into(),
            base_dn: BASE_DN.into(),
            group_filter: GROUP_FILTER.into(),
            member_strategy: MemberStrategy::MemberOf,
        },
        backend: BackendConfig {
            host: "pve.test".into(),
            user: "root@pam".into(),
            password: "secret".into(),
        },
        tls: TlsPolicy::SystemDefault,
        record_dir: None,
    }
}

/// Directory answering searches from a filter → DNs table.
#[derive(Clone, Default)]
pub struct FakeDirectory {
    answers: HashMap<String, Vec<String>>,
    reject_bind: bool,
    pub searches: Arc<Mutex<Vec<String>>>,
}

impl FakeDirectory {
    /// The eng/ops scenario: alice in both groups, bob in ops.
    pub fn scenario() -> Self {
        Self::default()
            .groups(&[ENG, OPS])
            .members(ENG, &[ALICE])
            .members(OPS, &[ALICE, BOB])
    }

    pub fn groups(self, dns: &[&str]) -> Self {
        self.answer(GROUP_FILTER.to_string(), dns)
    }

    /// Members found through a plain `memberOf` search.
    pub fn members(self, group: &str, dns: &[&str]) -> Self {
        self.answer(MemberStrategy::MemberOf.filter(group), dns)
    }

    /// Members found through the transitive in-chain search.
    pub fn chain_members(self, group: &str, dns: &[&str]) -> Self {
        self.answer(MemberStrategy::InChain.filter(group), dns)
    }

    fn answer(mut self, filter: String, dns: &[&str]) -> Self {
        self.answers
            .insert(filter, dns.iter().map(ToString::to_string).collect());
        self
    }

    pub fn rejecting_bind(mut self) -> Self {
        self.reject_bind = true;
        self
    }
}

impl Directory for FakeDirectory {
    fn bind(&self, user: &str, _password: &str) -> DirectoryResult<()> {
        if self.reject_bind {
            return Err(DirectoryError::Auth {
                user: user.to_string(),
            });
        }
        Ok(())
    }

    fn search(
        &self,
        _base_dn: &str,
        filter: &str,
        _attributes: &[&str],
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        self.searches.lock().unwrap().push(filter.to_string());
        let dns = self
            .answers
            .get(filter)
            .ok_or_else(|| DirectoryError::Query(format!("no such filter {filter}")))?;
        Ok(dns.iter().map(DirectoryEntry::new).collect())
    }
}

#[derive(Default)]
pub struct BackendState {
    pub groups: BTreeSet<String>,
    pub users: BTreeMap<String, (String, Vec<String>)>,
    pub reject_groups: BTreeSet<String>,
    pub calls: Vec<String>,
}

/// Backend applying writes to shared state, cloneable so tests keep a handle.
#[derive(Clone, Default)]
pub struct FakeBackend {
    pub state: Arc<Mutex<BackendState>>,
}

impl FakeBackend {
    pub fn with_group(self, id: &str) -> Self {
        self.state.lock().unwrap().groups.insert(id.to_string());
        self
    }

    pub fn with_user(self, id: &str, realm_type: &str, groups: &[&str]) -> Self {
        self.state.lock().unwrap().users.insert(
            id.to_string(),
            (realm_type.to_string(), groups.iter().map(ToString::to_string).collect()),
        );
        self
    }

    pub fn rejecting_group(self, id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .reject_groups
            .insert(id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn user_groups(&self, id: &str) -> Option<Vec<String>> {
        let state = self.state.lock().unwrap();
        state.users.get(id).map(|(_, groups)| groups.clone())
    }
}

impl IdentityBackend for FakeBackend {
    fn list_users(&self) -> BackendResult<Vec<BackendUser>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_users".into());
        Ok(state
            .users
            .iter()
            .map(|(id, (realm_type, _))| BackendUser {
                id: id.clone(),
                realm_type: realm_type.clone(),
            })
            .collect())
    }

    fn list_groups(&self) -> BackendResult<Vec<BackendGroup>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_groups".into());
        Ok(state
            .groups
            .iter()
            .map(|id| BackendGroup { id: id.clone() })
            .collect())
    }

    fn create_group(&self, id: &str, _comment: &str) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create_group {id}"));
        if state.reject_groups.contains(id) || !state.groups.insert(id.to_string()) {
            return Err(BackendApiError::status(500, format!("group '{id}' already exists")));
        }
        Ok(())
    }

    fn create_user(&self, id: &str, _enabled: bool, groups: &[String]) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create_user {id}"));
        state.users.insert(id.to_string(), ("openid".to_string(), groups.to_vec()));
        Ok(())
    }

    fn update_user_groups(&self, id: &str, groups: &[String]) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("update_user_groups {id}"));
        match state.users.get_mut(id) {
            Some(user) => {
                user.1 = groups.to_vec();
                Ok(())
            }
            None => Err(BackendApiError::status(500, format!("no such user '{id}'"))),
        }
    }
}

/// Fresh scratch directory unique to `name`.
pub fn scratch_dir(name: &str) -> std::path::PathBuf {
    let unique = format!("ldap_pve_sync_{name}_{}", std::process::id());
    let dir = std::env::temp_dir().join(unique);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Runs one recorded pass over the given fakes and returns the session dir.
pub fn record_pass(
    root: &std::path::Path,
    directory: FakeDirectory,
    backend: FakeBackend,
    dry_run: bool,
) -> (ldap_pve_sync::sync::SyncOutcome, std::path::PathBuf) {
    use ldap_pve_sync::adapters::recording::{RecordingBackend, RecordingDirectory};
    use ldap_pve_sync::cassette::session::RecordingSession;
    use ldap_pve_sync::context::ServiceContext;

    let session = RecordingSession::new(root).unwrap();
    let directory = RecordingDirectory::new(Box::new(directory), Arc::clone(&session.directory));
    let backend = RecordingBackend::new(Box::new(backend), Arc::clone(&session.backend));
    let ctx = ServiceContext::new(Box::new(directory), Box::new(backend));
    let outcome = ldap_pve_sync::sync::run(&ctx, &config(), dry_run).unwrap();
    drop(ctx);
    (outcome, session.finish().unwrap())
}
