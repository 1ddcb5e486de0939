// ── Runtime connection configuration ──
//
// Describes *how* to reach one Veeam Backup & Replication server.
// Carries resolved credentials and tuning but never touches disk; the
// CLI builds a `ServerConfig` from its profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;
use veeamly_api::ApiVersion;

use crate::error::CoreError;

/// Default VBR REST API port.
pub const DEFAULT_PORT: u16 = 9419;

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed VBR certificate).
    DangerAcceptInvalid,
}

/// Configuration for one backup server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Hostname or IP of the backup server.
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub tls: TlsVerification,
    /// Value of the `x-api-version` header.
    pub api_version: ApiVersion,
    /// Interval between background poll cycles.
    pub poll_interval: Duration,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: DEFAULT_PORT,
            username: "administrator".into(),
            password: SecretString::from(String::new()),
            tls: TlsVerification::default(),
            api_version: ApiVersion::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// `https://{host}:{port}`
    pub fn base_url(&self) -> Result<Url, CoreError> {
        // An explicit scheme in `host` is honoured (handy for plain-HTTP test servers).
        let raw = if self.host.contains("://") {
            self.host.clone()
        } else {
            format!("https://{}:{}", self.host, self.port)
        };
        Url::parse(&raw).map_err(|e| CoreError::Config {
            message: format!("invalid server address '{raw}': {e}"),
        })
    }

    /// Human-readable title for this server (host plus port).
    pub fn title(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
