//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use veeamly_config::ConfigError;
use veeamly_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const ACTION: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to backup server at {url}: {reason}")]
    #[diagnostic(
        code(veeamly::connection_failed),
        help(
            "Check that the server is reachable and the REST API service is running.\n\
             URL: {url}\n\
             Self-signed certificate? Try: veeamly server info --insecure"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(veeamly::timeout),
        help("Increase the timeout with --timeout or check the server's load.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(veeamly::auth_failed),
        help(
            "Verify the username and password for profile '{profile}'.\n\
             Run: veeamly config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(veeamly::no_credentials),
        help(
            "Configure credentials with: veeamly config init\n\
             Or set VEEAMLY_USERNAME and VEEAMLY_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(veeamly::not_found),
        help("Run: veeamly {list_command} to see what the server reports")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Operations ───────────────────────────────────────────────────
    #[error("{action} failed: {message}")]
    #[diagnostic(code(veeamly::action_failed))]
    ActionFailed { action: String, message: String },

    #[error("Operation '{operation}' is not supported by this server")]
    #[diagnostic(
        code(veeamly::unsupported),
        help(
            "It requires {required}.\n\
             Select a newer API with --api-version if the server supports one."
        )
    )]
    Unsupported { operation: String, required: String },

    #[error("API error ({code}): {message}")]
    #[diagnostic(code(veeamly::api_error))]
    Api { code: String, message: String },

    #[error("Poll failed: {message}")]
    #[diagnostic(code(veeamly::update_failed))]
    UpdateFailed { message: String },

    #[error("Registry error: {message}")]
    #[diagnostic(
        code(veeamly::registry),
        help("Pass a different file with --registry or remove the corrupt one.")
    )]
    Registry { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(veeamly::validation))]
    Validation { field: String, reason: String },

    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(veeamly::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(veeamly::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: veeamly config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No backup server configured")]
    #[diagnostic(
        code(veeamly::no_config),
        help(
            "Create a profile with: veeamly config init\n\
             Or pass --host. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(veeamly::config))]
    Config(String),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::ActionFailed { .. } => exit_code::ACTION,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the active profile name to authentication failures.
    pub fn with_profile(self, name: &str) -> Self {
        match self {
            Self::AuthFailed { message, .. } => Self::AuthFailed {
                profile: name.to_owned(),
                message,
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

fn list_command(entity_type: &str) -> &'static str {
    match entity_type {
        "job" => "jobs list",
        "repository" => "repos list",
        "extent" => "sobrs list",
        "license" => "license",
        _ => "server info",
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::ControllerDisconnected => Self::ConnectionFailed {
                url: "(disconnected)".into(),
                reason: "the connection was shut down".into(),
            },
            CoreError::Timeout => Self::Timeout,
            CoreError::AuthenticationFailed { message } => Self::AuthFailed {
                profile: "default".into(),
                message,
            },
            CoreError::NotFound {
                entity_type,
                identifier,
            } => Self::NotFound {
                list_command: list_command(&entity_type).into(),
                resource_type: entity_type,
                identifier,
            },
            CoreError::ActionFailed { action, message } => Self::ActionFailed { action, message },
            CoreError::Unsupported {
                operation,
                required,
            } => Self::Unsupported {
                operation,
                required,
            },
            CoreError::Api { message, code, .. } => Self::Api {
                code: code.unwrap_or_else(|| "unknown".into()),
                message,
            },
            CoreError::UpdateFailed { message }
            | CoreError::PartialFetch { message, .. }
            | CoreError::RecordParse { message, .. } => Self::UpdateFailed { message },
            CoreError::Registry { message } => Self::Registry { message },
            CoreError::Config { message } => Self::Config(message),
            CoreError::Internal(message) => Self::Api {
                code: "internal".into(),
                message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::UnknownProfile(name) => Self::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config(other.to_string()),
        }
    }
}
