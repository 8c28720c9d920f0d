//! Live adapter for the `Directory` port using the synchronous `ldap3` client.

use std::sync::{Mutex, MutexGuard};

use ldap3::{LdapConn, LdapConnSettings, LdapError, Scope, SearchEntry};
use tracing::{debug, info, warn};

use crate::config::TlsPolicy;
use crate::error::{DirectoryError, DirectoryResult};
use crate::ports::directory::{Directory, DirectoryEntry};

/// LDAP result code for a rejected simple bind.
const INVALID_CREDENTIALS: u32 = 49;

/// Live directory backed by a single `ldap3` connection.
pub struct LdapDirectory {
    conn: Mutex<LdapConn>,
}

impl LdapDirectory {
    /// Opens a connection to `uri` with the given TLS policy.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Connection`] if the CA bundle cannot be
    /// loaded or the server cannot be reached.
    pub fn connect(uri: &str, tls: &TlsPolicy) -> DirectoryResult<Self> {
        let connection_error = |message: String| DirectoryError::Connection {
            uri: uri.to_string(),
            message,
        };

        let settings = tls_settings(tls).map_err(connection_error)?;
        debug!(uri, "Connecting to directory");
        let conn = LdapConn::with_settings(settings, uri)
            .map_err(|e| connection_error(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> DirectoryResult<MutexGuard<'_, LdapConn>> {
        self.conn
            .lock()
            .map_err(|_| DirectoryError::Query("directory connection lock poisoned".into()))
    }
}

fn tls_settings(tls: &TlsPolicy) -> Result<LdapConnSettings, String> {
    let settings = LdapConnSettings::new();
    match tls {
        TlsPolicy::SystemDefault => Ok(settings),
        TlsPolicy::Insecure => Ok(settings.set_no_tls_verify(true)),
        TlsPolicy::CustomCa(path) => {
            let pem = std::fs::read(path)
                .map_err(|e| format!("failed to read CA bundle {}: {e}", path.display()))?;
            let certs = native_tls::Certificate::stack_from_pem(&pem)
                .map_err(|e| format!("invalid CA bundle {}: {e}", path.display()))?;
            let mut builder = native_tls::TlsConnector::builder();
            for cert in certs {
                builder.add_root_certificate(cert);
            }
            let connector = builder
                .build()
                .map_err(|e| format!("TLS setup failed: {e}"))?;
            Ok(settings.set_connector(connector))
        }
    }
}

fn query_error(err: &LdapError) -> DirectoryError {
    DirectoryError::Query(err.to_string())
}

impl Directory for LdapDirectory {
    fn bind(&self, user: &str, password: &str) -> DirectoryResult<()> {
        let result = self
            .conn()?
            .simple_bind(user, password)
            .map_err(|e| query_error(&e))?;
        if result.rc == INVALID_CREDENTIALS {
            return Err(DirectoryError::Auth {
                user: user.to_string(),
            });
        }
        result.success().map_err(|e| query_error(&e))?;
        info!(user, "Bound to directory");
        Ok(())
    }

    fn search(
        &self,
        base_dn: &str,
        filter: &str,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let (entries, _) = self
            .conn()?
            .search(base_dn, Scope::Subtree, filter, attributes.to_vec())
            .and_then(ldap3::SearchResult::success)
            .map_err(|e| query_error(&e))?;
        debug!(
            base_dn,
            filter,
            count = entries.len(),
            "Directory search finished"
        );

        Ok(entries
            .into_iter()
            .map(|raw| {
                let entry = SearchEntry::construct(raw);
                DirectoryEntry {
                    dn: entry.dn,
                    attrs: entry.attrs,
                }
            })
            .collect())
    }
}

impl Drop for LdapDirectory {
    fn drop(&mut self) {
        if let Ok(conn) = self.conn.get_mut() {
            if let Err(e) = conn.unbind() {
                warn!(error = %e, "Directory unbind failed");
            }
        }
    }
}
