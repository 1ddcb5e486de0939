// VBR REST client
//
// Wraps `reqwest::Client` with bearer-token requests, the `x-api-version`
// header, `{ data: [...] }` list unwrapping and structured error payload
// detection. Endpoint groups (jobs, repositories, system, auth) are
// implemented as inherent methods in separate files.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::version::{ApiVersion, Capabilities, Capability};

/// Header carrying the negotiated REST API revision.
pub const API_VERSION_HEADER: &str = "x-api-version";

/// VBR error body: `{"errorCode": "...", "message": "..."}`.
///
/// Returned for 4xx/5xx and occasionally with a 2xx status.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorPayload {
    pub(crate) error_code: Option<String>,
    pub(crate) message: Option<String>,
}

/// Raw HTTP client for the Veeam Backup & Replication REST API.
///
/// Read methods return loosely typed `serde_json::Value` records; the
/// normalization into domain types happens in `veeamly-core`. Every call
/// takes the access token explicitly: token lifetime is owned by the
/// caller's session manager, not by this client.
pub struct VeeamClient {
    http: reqwest::Client,
    base_url: Url,
    api_version: ApiVersion,
    capabilities: Capabilities,
}

impl VeeamClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the server root, e.g. `https://vbr.example.com:9419`.
    pub fn new(
        base_url: Url,
        api_version: ApiVersion,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, api_version))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, api_version: ApiVersion) -> Self {
        Self {
            http,
            base_url,
            api_version,
            capabilities: api_version.capabilities(),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    /// Capabilities of the selected API version, resolved once at construction.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for an absolute API path (`/api/v1/...`).
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// Build a URL from path segments, percent-encoding each one so ids
    /// containing `/`, `?` or `#` stay inside their segment.
    pub(crate) fn api_url_segments(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .clear()
            .extend(segments);
        Ok(url)
    }

    /// Fail with `Unsupported` when the selected version lacks `capability`.
    pub(crate) fn require(
        &self,
        capability: Capability,
        operation: &'static str,
    ) -> Result<(), Error> {
        if self.capabilities.supports(capability) {
            Ok(())
        } else {
            Err(Error::Unsupported {
                operation,
                version: self.api_version,
            })
        }
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Authenticated GET returning the decoded JSON body.
    pub(crate) async fn get_json(&self, token: &SecretString, path: &str) -> Result<Value, Error> {
        let url = self.api_url(path)?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .header(API_VERSION_HEADER, self.api_version.header_value())
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_response(resp).await
    }

    /// Authenticated GET of a list endpoint, unwrapping `{ data: [...] }`.
    pub(crate) async fn get_list(
        &self,
        token: &SecretString,
        path: &str,
    ) -> Result<Vec<Value>, Error> {
        let body = self.get_json(token, path).await?;
        unwrap_data(body)
    }

    /// Authenticated POST with a JSON body.
    pub(crate) async fn post_json(
        &self,
        token: &SecretString,
        url: Url,
        body: &impl Serialize,
    ) -> Result<Value, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .bearer_auth(token.expose_secret())
            .header(API_VERSION_HEADER, self.api_version.header_value())
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_response(resp).await
    }
}

/// Decode a VBR response, turning HTTP failures and structured error
/// payloads into `Error::Api` / `Error::Authentication`.
pub(crate) async fn parse_response(resp: reqwest::Response) -> Result<Value, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;
    trace!(status = status.as_u16(), body_len = body.len(), "response received");

    if status == reqwest::StatusCode::UNAUTHORIZED {
        let message = serde_json::from_str::<ErrorPayload>(&body)
            .ok()
            .and_then(|p| p.message)
            .unwrap_or_else(|| "access token expired or invalid".into());
        return Err(Error::Authentication { message });
    }

    if !status.is_success() {
        return Err(match serde_json::from_str::<ErrorPayload>(&body) {
            Ok(payload) => Error::Api {
                status: status.as_u16(),
                message: payload
                    .message
                    .unwrap_or_else(|| format!("HTTP {status}")),
                error_code: payload.error_code,
            },
            Err(_) => Error::Api {
                status: status.as_u16(),
                message: format!("HTTP {status}: {}", preview(&body)),
                error_code: None,
            },
        });
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    let value: Value = serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body: body.clone(),
    })?;

    // Some endpoints report failures as `{errorCode, message}` with HTTP 200.
    if value
        .as_object()
        .is_some_and(|obj| obj.contains_key("errorCode"))
    {
        let payload: ErrorPayload =
            serde_json::from_value(value).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;
        return Err(Error::Api {
            status: status.as_u16(),
            message: payload.message.unwrap_or_else(|| "unknown error".into()),
            error_code: payload.error_code,
        });
    }

    Ok(value)
}

/// Extract the record list from a `{ data: [...] }` envelope.
///
/// A bare array is accepted as-is; a missing or null `data` is an empty list.
fn unwrap_data(body: Value) -> Result<Vec<Value>, Error> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(other) => Err(Error::Deserialization {
                message: "expected `data` to be an array".into(),
                body: other.to_string(),
            }),
        },
        other => Err(Error::Deserialization {
            message: "expected a list envelope".into(),
            body: other.to_string(),
        }),
    }
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}
