// ── Entity state derivation ──
//
// Maps (snapshot, source, suffix) to the value an entity reports and to
// whether it is currently available.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::key::SourceKey;
use crate::model::{Record, Snapshot};

/// Value reported by one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntityState {
    Text(String),
    Number(f64),
    Flag(bool),
    Timestamp(DateTime<Utc>),
    /// No value (record missing, field not reported, or a button).
    Unknown,
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Flag(true) => f.write_str("on"),
            Self::Flag(false) => f.write_str("off"),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

fn text(v: Option<&String>) -> EntityState {
    v.map_or(EntityState::Unknown, |s| EntityState::Text(s.clone()))
}

fn number(v: Option<f64>) -> EntityState {
    v.map_or(EntityState::Unknown, EntityState::Number)
}

fn flag(v: Option<bool>) -> EntityState {
    v.map_or(EntityState::Unknown, EntityState::Flag)
}

fn timestamp(v: Option<DateTime<Utc>>) -> EntityState {
    v.map_or(EntityState::Unknown, EntityState::Timestamp)
}

/// Current value of the entity `suffix` derived from `source`.
pub fn state_of(snapshot: &Snapshot, source: &SourceKey, suffix: &str) -> EntityState {
    let Some(record) = snapshot.find(source) else {
        // Integration health sensors live on the server device but read diagnostics.
        return match (source, suffix) {
            (SourceKey::Server, "health_ok") => EntityState::Flag(snapshot.diagnostics.health_ok),
            (SourceKey::Server, "connected") => EntityState::Flag(snapshot.diagnostics.connected),
            _ => EntityState::Unknown,
        };
    };

    match record {
        Record::Job(job) => match suffix {
            "status" => EntityState::Text(job.display_status().to_owned()),
            "type" => EntityState::Text(job.job_type.clone()),
            "last_run" => timestamp(job.last_run),
            "next_run" => timestamp(job.next_run),
            _ => EntityState::Unknown,
        },
        Record::Repository(repo) => match suffix {
            "type" => EntityState::Text(
                repo.repo_type.clone().unwrap_or_else(|| "unknown".into()),
            ),
            "description" => EntityState::Text(repo.description.clone().unwrap_or_default()),
            "capacity" => number(repo.capacity_gb),
            "free_space" => number(repo.free_gb),
            "used_space" => number(repo.used_space_gb),
            "used_space_percent" => number(repo.used_percent()),
            "online" => flag(repo.is_online),
            "out_of_date" => flag(repo.is_out_of_date),
            "immutable" => flag(repo.is_immutable),
            "object_lock" => flag(repo.is_object_lock),
            "hardened" => flag(repo.is_hardened),
            "accessible" => flag(repo.is_accessible),
            "mounted" => flag(repo.is_mounted),
            "capacity_warning" => flag(repo.capacity_warning()),
            "capacity_critical" => flag(repo.capacity_critical()),
            _ => EntityState::Unknown,
        },
        Record::Extent { .. } => EntityState::Unknown,
        Record::Server(server) => match suffix {
            "build_version" => text(server.build_version.as_ref()),
            "server_name" => text(server.name.as_ref()),
            "platform" => text(server.platform.as_ref()),
            "database_vendor" => text(server.database_vendor.as_ref()),
            "sql_edition" => text(server.sql_server_edition.as_ref()),
            "sql_version" => text(server.sql_server_version.as_ref()),
            "last_successful_poll" => timestamp(snapshot.diagnostics.last_successful_poll),
            "health_ok" => EntityState::Flag(snapshot.diagnostics.health_ok),
            "connected" => EntityState::Flag(snapshot.diagnostics.connected),
            _ => EntityState::Unknown,
        },
        Record::License(license) => match suffix {
            "status" => text(license.status.as_ref()),
            "edition" => text(license.edition.as_ref()),
            "type" => text(license.license_type.as_ref()),
            "expiration" => timestamp(license.expiration_date),
            "support_expiration" => timestamp(license.support_expiration_date),
            "licensed_to" => text(license.licensed_to.as_ref()),
            "support_id" => text(license.support_id.as_ref()),
            "auto_update" => flag(license.auto_update_enabled),
            "cloud_connect" => text(license.cloud_connect.as_ref()),
            _ => EntityState::Unknown,
        },
    }
}

/// Whether the entity can currently be used.
///
/// Sensors are available while their record exists. Buttons add
/// state-dependent rules: start only while idle, stop only while running,
/// retry only after a failed or warning result, seal/unseal and
/// maintenance toggles only from the opposite mode.
pub fn is_available(snapshot: &Snapshot, source: &SourceKey, suffix: &str) -> bool {
    match snapshot.find(source) {
        Some(Record::Job(job)) => match suffix {
            "start" => !job.is_running(),
            "stop" => job.is_running(),
            "retry" => job.can_retry(),
            _ => true,
        },
        Some(Record::Extent { extent, .. }) => match suffix {
            "enable_sealed_mode" => !extent.is_sealed(),
            "disable_sealed_mode" => extent.is_sealed(),
            "enable_maintenance_mode" => !extent.in_maintenance(),
            "disable_maintenance_mode" => extent.in_maintenance(),
            _ => true,
        },
        Some(_) => true,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Extent, Extra, Job, Repository, ScaleOutRepository};

    fn snapshot(status: &str, last_result: &str, extent_status: &[&str]) -> Snapshot {
        Snapshot {
            jobs: vec![Job {
                id: "j1".into(),
                name: "Daily".into(),
                job_type: "Backup".into(),
                status: status.into(),
                last_result: last_result.into(),
                last_run: None,
                next_run: None,
                extra: Extra::new(),
            }],
            repositories: vec![Repository {
                id: "r1".into(),
                name: "Main".into(),
                capacity_gb: Some(100.0),
                free_gb: Some(4.0),
                used_space_gb: Some(96.0),
                is_online: Some(true),
                is_accessible: Some(true),
                ..Repository::default()
            }],
            sobrs: vec![ScaleOutRepository {
                id: "s1".into(),
                name: "SOBR".into(),
                extents: vec![Extent {
                    id: "e1".into(),
                    name: "Extent".into(),
                    status: extent_status.iter().map(|s| (*s).to_owned()).collect(),
                }],
                ..ScaleOutRepository::default()
            }],
            ..Snapshot::default()
        }
    }

    fn job() -> SourceKey {
        SourceKey::Job("j1".into())
    }

    fn extent() -> SourceKey {
        SourceKey::Extent {
            sobr_id: "s1".into(),
            extent_id: "e1".into(),
        }
    }

    #[test]
    fn job_status_uses_display_rule() {
        let snap = snapshot("running", "failed", &[]);
        assert_eq!(
            state_of(&snap, &job(), "status"),
            EntityState::Text("running".into())
        );
        let snap = snapshot("inactive", "warning", &[]);
        assert_eq!(
            state_of(&snap, &job(), "status"),
            EntityState::Text("warning".into())
        );
    }

    #[test]
    fn repository_derived_values() {
        let snap = snapshot("inactive", "success", &[]);
        let repo = SourceKey::Repository("r1".into());
        assert_eq!(
            state_of(&snap, &repo, "used_space_percent"),
            EntityState::Number(96.0)
        );
        assert_eq!(
            state_of(&snap, &repo, "capacity_critical"),
            EntityState::Flag(true)
        );
        assert_eq!(state_of(&snap, &repo, "immutable"), EntityState::Unknown);
        assert_eq!(
            state_of(&snap, &repo, "accessible"),
            state_of(&snap, &repo, "online")
        );
    }

    #[test]
    fn unreported_repository_flags_stay_unknown() {
        let mut snap = snapshot("inactive", "success", &[]);
        snap.repositories[0].is_hardened = Some(false);
        let repo = SourceKey::Repository("r1".into());
        for suffix in ["out_of_date", "immutable", "object_lock", "mounted"] {
            assert_eq!(state_of(&snap, &repo, suffix), EntityState::Unknown, "{suffix}");
        }
        assert_eq!(state_of(&snap, &repo, "hardened"), EntityState::Flag(false));
    }

    #[test]
    fn job_button_availability() {
        let running = snapshot("working", "none", &[]);
        assert!(!is_available(&running, &job(), "start"));
        assert!(is_available(&running, &job(), "stop"));
        assert!(!is_available(&running, &job(), "retry"));

        let failed = snapshot("inactive", "failed", &[]);
        assert!(is_available(&failed, &job(), "start"));
        assert!(!is_available(&failed, &job(), "stop"));
        assert!(is_available(&failed, &job(), "retry"));
        assert!(is_available(&failed, &job(), "disable"));
    }

    #[test]
    fn extent_button_availability() {
        let sealed = snapshot("inactive", "success", &["Sealed"]);
        assert!(!is_available(&sealed, &extent(), "enable_sealed_mode"));
        assert!(is_available(&sealed, &extent(), "disable_sealed_mode"));
        assert!(is_available(&sealed, &extent(), "enable_maintenance_mode"));

        let maintenance = snapshot("inactive", "success", &["maintenanceMode"]);
        assert!(is_available(&maintenance, &extent(), "disable_maintenance_mode"));
        assert!(!is_available(&maintenance, &extent(), "enable_maintenance_mode"));
    }

    #[test]
    fn missing_record_is_unavailable() {
        let snap = snapshot("inactive", "success", &[]);
        let gone = SourceKey::Job("zz".into());
        assert!(!is_available(&snap, &gone, "start"));
        assert_eq!(state_of(&snap, &gone, "status"), EntityState::Unknown);
    }
}
