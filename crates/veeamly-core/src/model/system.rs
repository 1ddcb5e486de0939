// ── Server-level domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Extra;

/// Installation details of the backup server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub vbr_id: Option<String>,
    pub name: Option<String>,
    pub build_version: Option<String>,
    pub patches: Vec<String>,
    pub platform: Option<String>,
    pub database_vendor: Option<String>,
    pub sql_server_edition: Option<String>,
    pub sql_server_version: Option<String>,
}

/// Installed license summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LicenseInfo {
    pub status: Option<String>,
    pub edition: Option<String>,
    pub license_type: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub support_expiration_date: Option<DateTime<Utc>>,
    pub licensed_to: Option<String>,
    pub support_id: Option<String>,
    pub auto_update_enabled: Option<bool>,
    pub cloud_connect: Option<String>,
    #[serde(default, skip_serializing_if = "Extra::is_empty")]
    pub extra: Extra,
}
