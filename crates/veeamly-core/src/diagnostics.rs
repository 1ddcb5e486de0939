// ── Diagnostics report ──
//
// A redacted, serializable summary of one entry for support requests:
// connection settings without credentials, coordinator health, session
// freshness and a digest of the current snapshot.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{ServerConfig, TlsVerification};
use crate::coordinator::CoordinatorStatus;
use crate::model::{Diagnostics, Snapshot};
use crate::session::TokenInfo;

/// Placeholder for redacted values.
pub const REDACTED: &str = "**REDACTED**";

#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub entry_id: String,
    pub title: String,
    pub host: String,
    pub port: u16,
    pub username: &'static str,
    pub verify_tls: bool,
    pub api_version: String,
    pub poll_interval_secs: u64,
}

impl EntryInfo {
    pub fn new(entry_id: &str, config: &ServerConfig) -> Self {
        Self {
            entry_id: entry_id.to_owned(),
            title: config.title(),
            host: config.host.clone(),
            port: config.port,
            username: REDACTED,
            verify_tls: config.tls != TlsVerification::DangerAcceptInvalid,
            api_version: config.api_version.to_string(),
            poll_interval_secs: config.poll_interval.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataCounts {
    pub jobs: usize,
    pub repositories: usize,
    pub sobrs: usize,
    pub extents: usize,
    pub has_server_info: bool,
    pub has_license_info: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerSummary {
    pub build_version: Option<String>,
    pub platform: Option<String>,
    pub database_vendor: Option<String>,
    pub sql_server_edition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseSummary {
    pub status: Option<String>,
    pub edition: Option<String>,
    pub license_type: Option<String>,
}

/// Everything `veeamly diagnostics` prints.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    pub entry: EntryInfo,
    pub coordinator: CoordinatorStatus,
    pub session: TokenInfo,
    pub data: DataCounts,
    pub server: Option<ServerSummary>,
    pub license: Option<LicenseSummary>,
    /// Job count per raw status.
    pub jobs_summary: BTreeMap<String, usize>,
    /// Repository count per type.
    pub repositories_summary: BTreeMap<String, usize>,
    pub integration: Diagnostics,
}

pub fn report(
    entry: EntryInfo,
    coordinator: CoordinatorStatus,
    snapshot: Option<&Snapshot>,
    session: TokenInfo,
) -> DiagnosticsReport {
    let Some(snapshot) = snapshot else {
        return DiagnosticsReport {
            entry,
            coordinator,
            session,
            data: DataCounts::default(),
            server: None,
            license: None,
            jobs_summary: BTreeMap::new(),
            repositories_summary: BTreeMap::new(),
            integration: Diagnostics::default(),
        };
    };

    let mut jobs_summary = BTreeMap::new();
    for job in &snapshot.jobs {
        *jobs_summary.entry(job.status.clone()).or_insert(0) += 1;
    }
    let mut repositories_summary = BTreeMap::new();
    for repo in &snapshot.repositories {
        let kind = repo.repo_type.clone().unwrap_or_else(|| "unknown".into());
        *repositories_summary.entry(kind).or_insert(0) += 1;
    }

    DiagnosticsReport {
        entry,
        coordinator,
        session,
        data: DataCounts {
            jobs: snapshot.jobs.len(),
            repositories: snapshot.repositories.len(),
            sobrs: snapshot.sobrs.len(),
            extents: snapshot.sobrs.iter().map(|s| s.extents.len()).sum(),
            has_server_info: snapshot.server_info.is_some(),
            has_license_info: snapshot.license_info.is_some(),
        },
        server: snapshot.server_info.as_ref().map(|s| ServerSummary {
            build_version: s.build_version.clone(),
            platform: s.platform.clone(),
            database_vendor: s.database_vendor.clone(),
            sql_server_edition: s.sql_server_edition.clone(),
        }),
        license: snapshot.license_info.as_ref().map(|l| LicenseSummary {
            status: l.status.clone(),
            edition: l.edition.clone(),
            license_type: l.license_type.clone(),
        }),
        jobs_summary,
        repositories_summary,
        integration: snapshot.diagnostics.clone(),
    }
}
