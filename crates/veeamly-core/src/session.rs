// ── Credential / session manager ──
//
// Owns the OAuth2 token pair for one server. Callers ask for a valid
// session; the manager refreshes (refresh token first, password grant
// second) when the current one is within a minute of expiry.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use veeamly_api::TokenResponse;

use crate::backend::Backend;
use crate::error::CoreError;

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME: TimeDelta = TimeDelta::seconds(900);
/// A session this close to expiry is refreshed before use.
pub const REFRESH_BUFFER: TimeDelta = TimeDelta::seconds(60);

/// One access/refresh token pair.
#[derive(Debug, Clone)]
pub struct Session {
    access_token: SecretString,
    refresh_token: Option<SecretString>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        access_token: SecretString,
        refresh_token: Option<SecretString>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// Build from a token response received at `now`.
    pub fn from_token(resp: TokenResponse, now: DateTime<Utc>) -> Self {
        let lifetime = resp
            .expires_in
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_TOKEN_LIFETIME, TimeDelta::seconds);
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            expires_at: Some(now + lifetime),
        }
    }

    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&SecretString> {
        self.refresh_token.as_ref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Stale when there is no token, no expiry, or expiry is within
    /// [`REFRESH_BUFFER`] of `now`.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.expose_secret().is_empty() {
            return true;
        }
        match self.expires_at {
            Some(expires_at) => now >= expires_at - REFRESH_BUFFER,
            None => true,
        }
    }

    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh_at(Utc::now())
    }
}

/// Redacted view of the session for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub has_access_token: bool,
    pub has_refresh_token: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub needs_refresh: bool,
}

/// Hands out valid sessions, serializing grants behind one mutex.
pub struct SessionManager {
    backend: Arc<dyn Backend>,
    username: String,
    password: SecretString,
    session: Mutex<Option<Session>>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn Backend>, username: String, password: SecretString) -> Self {
        Self {
            backend,
            username,
            password,
            session: Mutex::new(None),
        }
    }

    /// A session valid for at least [`REFRESH_BUFFER`].
    ///
    /// Tries the refresh token once, then the password grant once. On
    /// failure the stored session is cleared and the error returned:
    /// `AuthenticationFailed` for rejected credentials, `ConnectionFailed`
    /// when the server could not be reached.
    pub async fn ensure_session(&self) -> Result<Session, CoreError> {
        let mut guard = self.session.lock().await;

        if let Some(session) = guard.as_ref().filter(|s| !s.needs_refresh()) {
            return Ok(session.clone());
        }

        let refresh_token = guard.as_ref().and_then(|s| s.refresh_token.clone());
        if let Some(refresh_token) = refresh_token {
            match self.backend.refresh(&refresh_token).await {
                Ok(resp) => {
                    let mut session = Session::from_token(resp, Utc::now());
                    // Keep the old refresh token when the server did not rotate it.
                    if session.refresh_token.is_none() {
                        session.refresh_token = Some(refresh_token);
                    }
                    debug!(expires_at = ?session.expires_at, "session refreshed");
                    *guard = Some(session.clone());
                    return Ok(session);
                }
                Err(e) => {
                    warn!(error = %e, "token refresh failed, falling back to password grant");
                }
            }
        }

        match self.backend.authenticate(&self.username, &self.password).await {
            Ok(resp) => {
                let session = Session::from_token(resp, Utc::now());
                info!(username = %self.username, "authenticated");
                *guard = Some(session.clone());
                Ok(session)
            }
            Err(e) => {
                *guard = None;
                Err(self.classify(e))
            }
        }
    }

    /// Password-grant failures are either bad credentials or an
    /// unreachable server; nothing else leaves this module.
    fn classify(&self, err: CoreError) -> CoreError {
        match err {
            CoreError::AuthenticationFailed { .. } | CoreError::ConnectionFailed { .. } => err,
            other => CoreError::ConnectionFailed {
                url: self.backend.endpoint(),
                reason: other.to_string(),
            },
        }
    }

    /// Replace the stored session.
    pub async fn set_session(&self, session: Session) {
        *self.session.lock().await = Some(session);
    }

    /// The stored session, fresh or not.
    pub async fn current(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    /// Drop the stored session; the next caller re-authenticates.
    pub async fn invalidate(&self) {
        *self.session.lock().await = None;
    }

    pub async fn token_info(&self) -> TokenInfo {
        let guard = self.session.lock().await;
        match guard.as_ref() {
            Some(s) => TokenInfo {
                has_access_token: !s.access_token.expose_secret().is_empty(),
                has_refresh_token: s.refresh_token.is_some(),
                expires_at: s.expires_at,
                needs_refresh: s.needs_refresh(),
            },
            None => TokenInfo {
                needs_refresh: true,
                ..TokenInfo::default()
            },
        }
    }

    /// Revoke the current session, if any. Failures are logged only.
    pub async fn logout(&self) {
        let Some(session) = self.session.lock().await.take() else {
            return;
        };
        if let Err(e) = self.backend.logout(&session).await {
            warn!(error = %e, "logout failed (non-fatal)");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn session(expires_in: Option<TimeDelta>) -> Session {
        Session::new(
            SecretString::from("token"),
            None,
            expires_in.map(|d| Utc::now() + d),
        )
    }

    #[test]
    fn freshness_uses_sixty_second_buffer() {
        assert!(!session(Some(TimeDelta::seconds(300))).needs_refresh());
        assert!(session(Some(TimeDelta::seconds(30))).needs_refresh());
        assert!(session(Some(TimeDelta::seconds(-5))).needs_refresh());
        assert!(session(None).needs_refresh());
    }

    #[test]
    fn empty_access_token_is_stale() {
        let s = Session::new(
            SecretString::from(""),
            None,
            Some(Utc::now() + TimeDelta::hours(1)),
        );
        assert!(s.needs_refresh());
    }

    #[test]
    fn missing_expiry_defaults_to_fifteen_minutes() {
        let now = Utc::now();
        let resp = TokenResponse {
            access_token: SecretString::from("a"),
            refresh_token: None,
            expires_in: None,
            token_type: None,
        };
        let s = Session::from_token(resp, now);
        assert_eq!(s.expires_at(), Some(now + TimeDelta::seconds(900)));
        assert!(!s.needs_refresh_at(now));
        assert!(s.needs_refresh_at(now + TimeDelta::seconds(840)));
    }
}
