// OAuth2 token endpoint
//
// VBR issues bearer tokens from `POST /api/oauth2/token` (form encoded)
// for both the password grant and the refresh-token grant. Logout revokes
// the current token pair.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::client::{API_VERSION_HEADER, ErrorPayload, VeeamClient, parse_response};
use crate::error::Error;

const TOKEN_PATH: &str = "/api/oauth2/token";
const LOGOUT_PATH: &str = "/api/oauth2/logout";

/// The grant used to obtain a token pair.
#[derive(Debug, Clone)]
pub enum TokenGrant {
    /// Full username/password login.
    Password {
        username: String,
        password: SecretString,
    },
    /// Exchange a refresh token for a new pair.
    RefreshToken(SecretString),
}

impl TokenGrant {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::RefreshToken(_) => "refresh_token",
        }
    }

    fn form(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Password { username, password } => vec![
                ("grant_type", "password"),
                ("username", username.as_str()),
                ("password", password.expose_secret()),
            ],
            Self::RefreshToken(token) => vec![
                ("grant_type", "refresh_token"),
                ("refresh_token", token.expose_secret()),
            ],
        }
    }
}

/// Successful token endpoint response.
///
/// `expires_in` is optional; callers apply their own default lifetime.
#[derive(Debug)]
pub struct TokenResponse {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
}

#[derive(Deserialize)]
struct RawTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}

impl From<RawTokenResponse> for TokenResponse {
    fn from(raw: RawTokenResponse) -> Self {
        Self {
            access_token: raw.access_token.into(),
            refresh_token: raw
                .refresh_token
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
            expires_in: raw.expires_in,
            token_type: raw.token_type,
        }
    }
}

impl VeeamClient {
    /// Exchange a grant for a token pair.
    ///
    /// A 400/401 from the token endpoint is an `Error::Authentication`;
    /// connection problems surface as `Error::Transport`.
    pub async fn request_token(&self, grant: &TokenGrant) -> Result<TokenResponse, Error> {
        let url = self.api_url(TOKEN_PATH)?;
        debug!(grant = grant.kind(), "requesting token at {}", url);

        let resp = self
            .http()
            .post(url)
            .header(API_VERSION_HEADER, self.api_version().header_value())
            .form(&grant.form())
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if status == reqwest::StatusCode::BAD_REQUEST
            || status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorPayload>(&body)
                .ok()
                .and_then(|p| p.message)
                .unwrap_or_else(|| format!("{} grant rejected (HTTP {status})", grant.kind()));
            return Err(Error::Authentication { message });
        }

        let body = parse_response(resp).await?;
        let token: TokenResponse = serde_json::from_value::<RawTokenResponse>(body)
            .map_err(|e| Error::Authentication {
                message: format!("malformed token response: {e}"),
            })?
            .into();
        if token.access_token.expose_secret().is_empty() {
            return Err(Error::Authentication {
                message: "token response carried no access token".into(),
            });
        }

        debug!(grant = grant.kind(), expires_in = ?token.expires_in, "token issued");
        Ok(token)
    }

    /// Revoke the current token pair.
    pub async fn logout(&self, token: &SecretString) -> Result<(), Error> {
        let url = self.api_url(LOGOUT_PATH)?;
        debug!("logging out at {}", url);

        let resp = self
            .http()
            .post(url)
            .bearer_auth(token.expose_secret())
            .header(API_VERSION_HEADER, self.api_version().header_value())
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_response(resp).await?;
        debug!("logout complete");
        Ok(())
    }
}
