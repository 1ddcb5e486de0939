// In-process backend double shared by the integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tokio::sync::Notify;
use veeamly_api::{ApiVersion, Capabilities, TokenResponse};
use veeamly_core::{Action, Backend, CoreError, Session};

pub const USERNAME: &str = "administrator";
pub const PASSWORD: &str = "Passw0rd!";

/// Mutable server state and call counters.
#[derive(Debug)]
pub struct FakeState {
    pub jobs: Vec<Value>,
    pub server_info: Value,
    pub license: Value,
    pub repositories: Vec<Value>,
    pub repository_states: Vec<Value>,
    pub sobrs: Vec<Value>,
    /// Sections that answer with a 500.
    pub failing: HashSet<&'static str>,
    pub unreachable: bool,
    /// Access tokens the server answers with a 401.
    pub revoked_tokens: HashSet<String>,
    pub refresh_rejected: bool,
    pub expires_in: Option<i64>,
    pub issue_refresh_token: bool,
    pub action_error: Option<String>,

    pub password_grants: usize,
    pub refresh_grants: usize,
    pub logouts: usize,
    pub job_fetches: usize,
    pub performed: Vec<Action>,
    pub tokens_seen: Vec<String>,
}

pub struct FakeBackend {
    state: Mutex<FakeState>,
    capabilities: Capabilities,
    /// When set, `fetch_jobs` waits for a notification before answering.
    gate: Mutex<Option<Arc<Notify>>>,
}

pub fn job(id: &str, name: &str, status: &str, last_result: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "type": "Backup",
        "status": status,
        "lastResult": last_result,
        "lastRun": "2025-06-01T22:00:00Z",
        "nextRun": "2025-06-02T22:00:00Z"
    })
}

pub fn repository(id: &str, name: &str) -> (Value, Value) {
    (
        json!({
            "id": id,
            "name": name,
            "description": format!("{name} storage"),
            "type": "WinLocal",
            "uniqueId": format!("u-{id}")
        }),
        json!({
            "id": id,
            "name": name,
            "type": "WinLocal",
            "capacityGB": 1000.0,
            "freeGB": 400.0,
            "usedSpaceGB": 600.0,
            "isOnline": true,
            "isOutOfDate": false
        }),
    )
}

/// A SOBR whose extents carry at most one status flag each.
pub fn sobr(id: &str, extents: &[(&str, Option<&str>)]) -> Value {
    let extents: Vec<Value> = extents
        .iter()
        .map(|(eid, status)| {
            let status: Vec<&str> = status.iter().copied().collect();
            json!({ "id": eid, "name": format!("Extent {eid}"), "status": status })
        })
        .collect();
    json!({ "id": id, "name": format!("SOBR {id}"), "extents": extents })
}

impl FakeState {
    fn populated() -> Self {
        let (r1_config, r1_state) = repository("r1", "Main");
        Self {
            jobs: vec![
                job("j1", "Daily SQL", "Inactive", "Success"),
                job("j2", "Weekly Files", "Running", "Unset"),
            ],
            server_info: json!({
                "vbrId": "6745a759-2205-4cd2-b172-8ec8f7e60ef8",
                "name": "vbr01",
                "buildVersion": "12.3.1.1139",
                "patches": [],
                "platform": "Windows",
                "databaseVendor": "PostgreSql"
            }),
            license: json!({
                "status": "Valid",
                "edition": "EnterprisePlus",
                "type": "Subscription",
                "expirationDate": "2027-01-01T00:00:00Z",
                "autoUpdateEnabled": false
            }),
            repositories: vec![r1_config],
            repository_states: vec![r1_state],
            sobrs: vec![sobr("s1", &[("e1", None), ("e2", Some("Sealed"))])],
            failing: HashSet::new(),
            unreachable: false,
            revoked_tokens: HashSet::new(),
            refresh_rejected: false,
            expires_in: Some(900),
            issue_refresh_token: true,
            action_error: None,
            password_grants: 0,
            refresh_grants: 0,
            logouts: 0,
            job_fetches: 0,
            performed: Vec::new(),
            tokens_seen: Vec::new(),
        }
    }
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Self::with_version(ApiVersion::default())
    }

    pub fn with_version(version: ApiVersion) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState::populated()),
            capabilities: version.capabilities(),
            gate: Mutex::new(None),
        })
    }

    /// Mutate the fake server's state.
    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn hold_jobs(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn release_jobs(&self) {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.notify_one();
        }
    }

    fn unreachable(&self) -> CoreError {
        CoreError::ConnectionFailed {
            url: self.endpoint(),
            reason: "connection refused".into(),
        }
    }

    fn check(&self, section: &'static str, session: &Session) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(self.unreachable());
        }
        let token = session.access_token().expose_secret().to_owned();
        state.tokens_seen.push(token.clone());
        if state.revoked_tokens.contains(&token) {
            return Err(CoreError::AuthenticationFailed {
                message: "token revoked".into(),
            });
        }
        if state.failing.contains(section) {
            return Err(CoreError::Api {
                message: format!("{section} unavailable"),
                code: Some("UnexpectedError".into()),
                status: Some(500),
            });
        }
        Ok(())
    }

    fn issue(&self, kind: &str, n: usize) -> TokenResponse {
        let state = self.state.lock().unwrap();
        TokenResponse {
            access_token: SecretString::from(format!("{kind}-access-{n}")),
            refresh_token: state
                .issue_refresh_token
                .then(|| SecretString::from(format!("{kind}-refresh-{n}"))),
            expires_in: state.expires_in,
            token_type: Some("bearer".into()),
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn endpoint(&self) -> String {
        "https://vbr.test:9419".into()
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<TokenResponse, CoreError> {
        let n = self.with(|s| {
            s.password_grants += 1;
            s.password_grants
        });
        if self.with(|s| s.unreachable) {
            return Err(self.unreachable());
        }
        if username != USERNAME || password.expose_secret() != PASSWORD {
            return Err(CoreError::AuthenticationFailed {
                message: "invalid username or password".into(),
            });
        }
        Ok(self.issue("password", n))
    }

    async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenResponse, CoreError> {
        let (n, rejected) = self.with(|s| {
            s.refresh_grants += 1;
            (s.refresh_grants, s.refresh_rejected)
        });
        if rejected || refresh_token.expose_secret().is_empty() {
            return Err(CoreError::AuthenticationFailed {
                message: "refresh token expired".into(),
            });
        }
        Ok(self.issue("refresh", n))
    }

    async fn logout(&self, _session: &Session) -> Result<(), CoreError> {
        self.with(|s| s.logouts += 1);
        Ok(())
    }

    async fn fetch_jobs(&self, session: &Session) -> Result<Vec<Value>, CoreError> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.with(|s| s.job_fetches += 1);
        self.check("jobs", session)?;
        Ok(self.with(|s| s.jobs.clone()))
    }

    async fn fetch_server_info(&self, session: &Session) -> Result<Value, CoreError> {
        self.check("server_info", session)?;
        Ok(self.with(|s| s.server_info.clone()))
    }

    async fn fetch_license(&self, session: &Session) -> Result<Value, CoreError> {
        self.check("license", session)?;
        Ok(self.with(|s| s.license.clone()))
    }

    async fn fetch_repositories(&self, session: &Session) -> Result<Vec<Value>, CoreError> {
        self.check("repositories", session)?;
        Ok(self.with(|s| s.repositories.clone()))
    }

    async fn fetch_repository_states(&self, session: &Session) -> Result<Vec<Value>, CoreError> {
        self.check("repository_states", session)?;
        Ok(self.with(|s| s.repository_states.clone()))
    }

    async fn fetch_scale_out_repositories(
        &self,
        session: &Session,
    ) -> Result<Vec<Value>, CoreError> {
        self.check("sobrs", session)?;
        Ok(self.with(|s| s.sobrs.clone()))
    }

    async fn perform(&self, session: &Session, action: &Action) -> Result<(), CoreError> {
        self.check("actions", session)?;
        self.with(|s| {
            s.performed.push(action.clone());
            match &s.action_error {
                Some(message) => Err(CoreError::Api {
                    message: message.clone(),
                    code: Some("InvalidOperation".into()),
                    status: Some(200),
                }),
                None => Ok(()),
            }
        })
    }
}
