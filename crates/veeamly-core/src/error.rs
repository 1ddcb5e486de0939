// ── Core error types ──
//
// Errors surfaced by veeamly-core. Consumers never see raw HTTP status
// codes or JSON parse failures; `From<veeamly_api::Error>` translates the
// transport layer into these kinds.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to backup server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Backup server request timed out")]
    Timeout,

    #[error("Controller is not connected")]
    ControllerDisconnected,

    // ── Poll errors ──────────────────────────────────────────────────
    /// A mandatory section of the poll cycle failed; no snapshot produced.
    #[error("Update failed: {message}")]
    UpdateFailed { message: String },

    /// A best-effort section failed. Logged, never returned from `poll`.
    #[error("Failed to fetch {section}: {message}")]
    PartialFetch {
        section: &'static str,
        message: String,
    },

    /// One record could not be normalized. Logged and skipped.
    #[error("Unparseable {section} record: {message}")]
    RecordParse {
        section: &'static str,
        message: String,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("{action} failed: {message}")]
    ActionFailed { action: String, message: String },

    #[error("Operation not supported: {operation} (requires {required})")]
    Unsupported { operation: String, required: String },

    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// VBR `errorCode` from the structured error payload.
        code: Option<String>,
        status: Option<u16>,
    },

    // ── Persistence / configuration ──────────────────────────────────
    #[error("Entity registry error: {message}")]
    Registry { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` for the two connectivity kinds a caller would
    /// report as "cannot connect".
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Timeout)
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<veeamly_api::Error> for CoreError {
    fn from(err: veeamly_api::Error) -> Self {
        match err {
            veeamly_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            veeamly_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() || e.is_request() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.origin().ascii_serialization())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            veeamly_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            veeamly_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            veeamly_api::Error::Api {
                status: 401,
                message,
                ..
            } => CoreError::AuthenticationFailed { message },
            veeamly_api::Error::Api {
                status: 404,
                message,
                ..
            } => CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: message,
            },
            veeamly_api::Error::Api {
                status,
                message,
                error_code,
            } => CoreError::Api {
                message,
                code: error_code,
                status: Some(status),
            },
            veeamly_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            veeamly_api::Error::Unsupported { operation, version } => CoreError::Unsupported {
                operation: operation.to_string(),
                required: format!("a newer API version than {version}"),
            },
        }
    }
}
