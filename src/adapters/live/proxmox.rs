//! Live adapter for the `IdentityBackend` port using the Proxmox VE REST API.

use std::sync::Mutex;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::{BackendConfig, TlsPolicy};
use crate::error::{BackendApiError, BackendResult};
use crate::ports::backend::{BackendGroup, BackendUser, IdentityBackend};

const DEFAULT_PORT: u16 = 8006;

/// Live Proxmox VE client.
///
/// Logs in on first use and reuses the ticket for the rest of the run.
pub struct ProxmoxBackend {
    client: Client,
    base_url: String,
    user: String,
    password: String,
    session: Mutex<Option<Session>>,
}

/// Authentication state returned by `/access/ticket`.
#[derive(Clone)]
struct Session {
    ticket: String,
    csrf_token: String,
}

/// Every API response wraps its payload in `data`.
#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct TicketData {
    ticket: String,
    #[serde(rename = "CSRFPreventionToken")]
    csrf_token: String,
}

#[derive(Deserialize)]
struct UserRecord {
    userid: String,
    #[serde(rename = "realm-type", default)]
    realm_type: String,
}

#[derive(Deserialize)]
struct GroupRecord {
    groupid: String,
}

/// Error body Proxmox sends alongside non-2xx statuses.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    errors: Option<serde_json::Value>,
}

impl ProxmoxBackend {
    /// Creates a client for `config.host`. No request is sent until the
    /// first port call.
    ///
    /// # Errors
    ///
    /// Returns an error if the CA bundle cannot be loaded or the HTTP
    /// client cannot be built.
    pub fn new(config: &BackendConfig, tls: &TlsPolicy) -> BackendResult<Self> {
        let mut builder = Client::builder();
        match tls {
            TlsPolicy::SystemDefault => {}
            TlsPolicy::Insecure => builder = builder.danger_accept_invalid_certs(true),
            TlsPolicy::CustomCa(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    BackendApiError::transport(format!(
                        "failed to read CA bundle {}: {e}",
                        path.display()
                    ))
                })?;
                let certs = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
                    BackendApiError::transport(format!("invalid CA bundle {}: {e}", path.display()))
                })?;
                for cert in certs {
                    builder = builder.add_root_certificate(cert);
                }
            }
        }
        let client = builder
            .build()
            .map_err(|e| BackendApiError::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url(&config.host),
            user: config.user.clone(),
            password: config.password.clone(),
            session: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn session(&self) -> BackendResult<Session> {
        let mut guard = self
            .session
            .lock()
            .map_err(|_| BackendApiError::transport("session lock poisoned"))?;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        debug!(user = %self.user, "Requesting Proxmox ticket");
        let response = self
            .client
            .post(self.url("/access/ticket"))
            .form(&[
                ("username", self.user.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .map_err(|e| BackendApiError::transport(e.to_string()))?;
        let data: TicketData = read_data(response)?;
        let session = Session {
            ticket: data.ticket,
            csrf_token: data.csrf_token,
        };
        *guard = Some(session.clone());
        Ok(session)
    }

    fn authed(&self, request: RequestBuilder, write: bool) -> BackendResult<RequestBuilder> {
        let session = self.session()?;
        let request = request.header("Cookie", format!("PVEAuthCookie={}", session.ticket));
        Ok(if write {
            request.header("CSRFPreventionToken", session.csrf_token)
        } else {
            request
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> BackendResult<T> {
        let request = self.authed(self.client.get(self.url(path)), false)?;
        let response = request
            .send()
            .map_err(|e| BackendApiError::transport(e.to_string()))?;
        read_data(response)
    }

    fn write(&self, request: RequestBuilder, form: &[(&str, String)]) -> BackendResult<()> {
        let response = self
            .authed(request, true)?
            .form(form)
            .send()
            .map_err(|e| BackendApiError::transport(e.to_string()))?;
        read_data::<serde_json::Value>(response).map(drop)
    }
}

/// Builds the API root for a host, adding the default port when absent.
fn base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.contains("://") {
        return format!("{host}/api2/json");
    }
    if host.contains(':') {
        format!("https://{host}/api2/json")
    } else {
        format!("https://{host}:{DEFAULT_PORT}/api2/json")
    }
}

/// Builds `/access/users/{id}` with `id` percent-encoded as one path
/// segment. Directory-derived ids may carry `\`, spaces or `/`.
fn user_url(base_url: &str, id: &str) -> BackendResult<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| BackendApiError::transport(format!("invalid API URL {base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| BackendApiError::transport(format!("invalid API URL {base_url}")))?
        .pop_if_empty()
        .extend(["access", "users", id]);
    Ok(url)
}

fn read_data<T: DeserializeOwned>(response: Response) -> BackendResult<T> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| BackendApiError::transport(e.to_string()))?;

    if !status.is_success() {
        let message = error_message(&body)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or(body);
        return Err(BackendApiError::status(status.as_u16(), message));
    }

    serde_json::from_str::<Envelope<T>>(&body)
        .map(|envelope| envelope.data)
        .map_err(|e| BackendApiError::status(status.as_u16(), format!("unexpected response: {e}")))
}

fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match (parsed.message, parsed.errors) {
        (Some(message), _) if !message.trim().is_empty() => Some(message.trim().to_string()),
        (_, Some(errors)) if !errors.is_null() => Some(errors.to_string()),
        _ => None,
    }
}

fn join_groups(groups: &[String]) -> String {
    groups.join(",")
}

impl IdentityBackend for ProxmoxBackend {
    fn list_users(&self) -> BackendResult<Vec<BackendUser>> {
        let records: Vec<UserRecord> = self.get("/access/users")?;
        Ok(records
            .into_iter()
            .map(|r| BackendUser {
                id: r.userid,
                realm_type: r.realm_type,
            })
            .collect())
    }

    fn list_groups(&self) -> BackendResult<Vec<BackendGroup>> {
        let records: Vec<GroupRecord> = self.get("/access/groups")?;
        Ok(records
            .into_iter()
            .map(|r| BackendGroup { id: r.groupid })
            .collect())
    }

    fn create_group(&self, id: &str, comment: &str) -> BackendResult<()> {
        self.write(
            self.client.post(self.url("/access/groups")),
            &[
                ("groupid", id.to_string()),
                ("comment", comment.to_string()),
            ],
        )
    }

    fn create_user(&self, id: &str, enabled: bool, groups: &[String]) -> BackendResult<()> {
        self.write(
            self.client.post(self.url("/access/users")),
            &[
                ("userid", id.to_string()),
                ("enable", u8::from(enabled).to_string()),
                ("groups", join_groups(groups)),
            ],
        )
    }

    fn update_user_groups(&self, id: &str, groups: &[String]) -> BackendResult<()> {
        let url = user_url(&self.base_url, id)?;
        self.write(self.client.put(url), &[("groups", join_groups(groups))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_adds_default_port() {
        assert_eq!(
            base_url("pve.example.com"),
            "https://pve.example.com:8006/api2/json"
        );
    }

    #[test]
    fn base_url_keeps_explicit_port_and_scheme() {
        assert_eq!(
            base_url("pve.example.com:443"),
            "https://pve.example.com:443/api2/json"
        );
        assert_eq!(
            base_url("http://127.0.0.1:8006/"),
            "http://127.0.0.1:8006/api2/json"
        );
    }

    #[test]
    fn error_message_prefers_message_field() {
        let body =
            r#"{"data":null,"message":"create group failed: group 'eng-ldap' already exists\n"}"#;
        assert_eq!(
            error_message(body).as_deref(),
            Some("create group failed: group 'eng-ldap' already exists")
        );
    }

    #[test]
    fn error_message_falls_back_to_field_errors() {
        let body = r#"{"data":null,"errors":{"groupid":"invalid format"}}"#;
        assert_eq!(
            error_message(body).as_deref(),
            Some(r#"{"groupid":"invalid format"}"#)
        );
        assert_eq!(error_message("<html>bad gateway</html>"), None);
    }

    #[test]
    fn user_url_encodes_the_id_as_one_segment() {
        let base = base_url("pve.example.com");
        let url = user_url(&base, r"Smith\, John@ldap").unwrap();
        assert_eq!(
            url.as_str(),
            "https://pve.example.com:8006/api2/json/access/users/Smith%5C,%20John@ldap"
        );

        let url = user_url(&base, "a/b@ldap").unwrap();
        assert!(url.path().ends_with("/access/users/a%2Fb@ldap"));
    }

    #[test]
    fn user_records_default_missing_realm_type() {
        let body = r#"{"data":[{"userid":"root@pam","realm-type":"pam"},{"userid":"x@y"}]}"#;
        let parsed: Envelope<Vec<UserRecord>> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data[0].realm_type, "pam");
        assert_eq!(parsed.data[1].realm_type, "");
    }

    #[test]
    fn unreadable_ca_bundle_fails_client_setup() {
        let config = BackendConfig {
            host: "pve.example.com".into(),
            user: "root@pam".into(),
            password: "x".into(),
        };
        let tls = TlsPolicy::CustomCa("/nonexistent/ldap-pve-sync/ca.pem".into());
        let Err(err) = ProxmoxBackend::new(&config, &tls) else {
            panic!("client setup should fail");
        };
        assert!(err.message.contains("failed to read CA bundle"));
    }

    #[test]
    fn unreachable_host_surfaces_transport_error() {
        let config = BackendConfig {
            host: "127.0.0.1:1".into(),
            user: "root@pam".into(),
            password: "x".into(),
        };
        let backend = ProxmoxBackend::new(&config, &TlsPolicy::Insecure).unwrap();
        let err = backend.list_groups().unwrap_err();
        assert_eq!(err.status, None);
    }
}
