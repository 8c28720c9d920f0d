//! Replaying adapter for the `Directory` port.

use std::sync::{Arc, Mutex};

use super::replay_result;
use crate::adapters::recording::directory::{BindInput, SearchInput};
use crate::cassette::replayer::CassetteReplayer;
use crate::error::{DirectoryError, DirectoryResult};
use crate::ports::directory::{Directory, DirectoryEntry};

/// Serves recorded directory results from a cassette.
pub struct ReplayingDirectory {
    replayer: Option<Arc<Mutex<CassetteReplayer>>>,
}

impl ReplayingDirectory {
    /// Create a replaying directory backed by the given replayer.
    ///
    /// The replayer is shared so the caller can inspect what was left
    /// unconsumed after the pass.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self {
            replayer: Some(replayer),
        }
    }

    /// Create a replaying directory with no cassette. Every call fails.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { replayer: None }
    }
}

fn replay_error(err: &crate::cassette::CassetteError) -> DirectoryError {
    DirectoryError::Query(format!("replay: {err}"))
}

impl Directory for ReplayingDirectory {
    fn bind(&self, user: &str, _password: &str) -> DirectoryResult<()> {
        let input = BindInput { user };
        replay_result(self.replayer.as_deref(), "directory", "bind", &input)
            .unwrap_or_else(|e| Err(replay_error(&e)))
    }

    fn search(
        &self,
        base_dn: &str,
        filter: &str,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let input = SearchInput {
            base_dn,
            filter,
            attributes,
        };
        replay_result(self.replayer.as_deref(), "directory", "search", &input)
            .unwrap_or_else(|e| Err(replay_error(&e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use chrono::Utc;
    use serde_json::json;

    fn directory_with(interaction: Interaction) -> ReplayingDirectory {
        let replayer = CassetteReplayer::new(&Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            tool_version: "0.1.0".into(),
            interactions: vec![interaction],
        });
        ReplayingDirectory::new(Arc::new(Mutex::new(replayer)))
    }

    #[test]
    fn replays_auth_failure_as_auth_error() {
        let directory = directory_with(Interaction {
            seq: 0,
            port: "directory".into(),
            method: "bind".into(),
            input: json!({"user": "cn=sync,dc=x"}),
            output: json!({"Err": {"Auth": {"user": "cn=sync,dc=x"}}}),
        });

        let err = directory.bind("cn=sync,dc=x", "ignored").unwrap_err();
        assert_eq!(
            err,
            DirectoryError::Auth {
                user: "cn=sync,dc=x".into()
            }
        );
    }

    #[test]
    fn replays_search_entries() {
        let directory = directory_with(Interaction {
            seq: 0,
            port: "directory".into(),
            method: "search".into(),
            input: json!({"base_dn": "dc=x", "filter": "(cn=*)", "attributes": ["dn"]}),
            output: json!({"Ok": [{"dn": "cn=eng,dc=x"}]}),
        });

        let entries = directory.search("dc=x", "(cn=*)", &["dn"]).unwrap();
        assert_eq!(entries, vec![DirectoryEntry::new("cn=eng,dc=x")]);
    }

    #[test]
    fn changed_filter_fails_as_query_error() {
        let directory = directory_with(Interaction {
            seq: 0,
            port: "directory".into(),
            method: "search".into(),
            input: json!({"base_dn": "dc=x", "filter": "(cn=*)", "attributes": ["dn"]}),
            output: json!({"Ok": []}),
        });

        let err = directory.search("dc=x", "(cn=eng)", &["dn"]).unwrap_err();
        assert!(matches!(
            err,
            DirectoryError::Query(ref msg) if msg.contains("replayed with")
        ));
    }

    #[test]
    fn unconfigured_directory_fails_every_call() {
        let directory = ReplayingDirectory::unconfigured();
        let err = directory.bind("", "").unwrap_err();
        assert!(err
            .to_string()
            .contains("no cassette loaded for port directory"));
    }
}
