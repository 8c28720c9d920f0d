//! Recording adapter for the `Directory` port.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::error::DirectoryResult;
use crate::ports::directory::{Directory, DirectoryEntry};

/// Records directory interactions while delegating to an inner implementation.
///
/// Bind passwords are never written to the cassette.
pub struct RecordingDirectory {
    inner: Box<dyn Directory>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingDirectory {
    /// Creates a recording directory wrapping the given implementation.
    pub fn new(inner: Box<dyn Directory>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
pub(crate) struct BindInput<'a> {
    pub(crate) user: &'a str,
}

#[derive(Serialize)]
pub(crate) struct SearchInput<'a> {
    pub(crate) base_dn: &'a str,
    pub(crate) filter: &'a str,
    pub(crate) attributes: &'a [&'a str],
}

impl Directory for RecordingDirectory {
    fn bind(&self, user: &str, password: &str) -> DirectoryResult<()> {
        let result = self.inner.bind(user, password);
        record_result(
            &self.recorder,
            "directory",
            "bind",
            &BindInput { user },
            &result,
        );
        result
    }

    fn search(
        &self,
        base_dn: &str,
        filter: &str,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let result = self.inner.search(base_dn, filter, attributes);
        let input = SearchInput {
            base_dn,
            filter,
            attributes,
        };
        record_result(&self.recorder, "directory", "search", &input, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DirectoryError;

    struct RejectingDirectory;

    impl Directory for RejectingDirectory {
        fn bind(&self, user: &str, _password: &str) -> DirectoryResult<()> {
            Err(DirectoryError::Auth {
                user: user.to_string(),
            })
        }

        fn search(&self, _: &str, _: &str, _: &[&str]) -> DirectoryResult<Vec<DirectoryEntry>> {
            Ok(vec![DirectoryEntry::new("cn=eng,dc=x")])
        }
    }

    #[test]
    fn records_calls_without_password() {
        let dir = std::env::temp_dir().join("ldap_pve_sync_rec_directory_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("directory.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(&path, "test")));

        {
            let directory =
                RecordingDirectory::new(Box::new(RejectingDirectory), Arc::clone(&recorder));
            assert!(directory.bind("cn=sync,dc=x", "s3cr3t-pass").is_err());
            let entries = directory.search("dc=x", "(cn=*)", &["dn"]).unwrap();
            assert_eq!(entries.len(), 1);
        }

        let recorder = Arc::try_unwrap(recorder).unwrap().into_inner().unwrap();
        recorder.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("cn=sync,dc=x"));
        assert!(content.contains("Auth"));
        assert!(content.contains("cn=eng,dc=x"));
        assert!(!content.contains("s3cr3t-pass"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
