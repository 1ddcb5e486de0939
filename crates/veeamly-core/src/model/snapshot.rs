// ── Poll snapshot ──
//
// One immutable result of a poll cycle, shared as `Arc<Snapshot>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Extent, Job, LicenseInfo, Repository, ScaleOutRepository, ServerInfo};
use crate::entity::{Category, SourceKey};

/// Health of the integration itself, as of this snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// A session was established for this cycle.
    pub connected: bool,
    /// The mandatory jobs section was fetched.
    pub health_ok: bool,
    pub last_successful_poll: Option<DateTime<Utc>>,
    /// Categories whose best-effort read failed this cycle. Their records
    /// are unknown, not absent.
    #[serde(default)]
    pub failed_sections: Vec<Category>,
}

impl Diagnostics {
    pub fn section_failed(&self, category: Category) -> bool {
        self.failed_sections.contains(&category)
    }
}

/// Everything one poll cycle learned about the backup server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub jobs: Vec<Job>,
    pub repositories: Vec<Repository>,
    pub sobrs: Vec<ScaleOutRepository>,
    pub server_info: Option<ServerInfo>,
    pub license_info: Option<LicenseInfo>,
    pub diagnostics: Diagnostics,
}

/// A borrowed record located by [`Snapshot::find`].
#[derive(Debug, Clone, Copy)]
pub enum Record<'a> {
    Job(&'a Job),
    Repository(&'a Repository),
    Extent {
        sobr: &'a ScaleOutRepository,
        extent: &'a Extent,
    },
    Server(&'a ServerInfo),
    License(&'a LicenseInfo),
}

impl Snapshot {
    /// Locate the backing record for any entity source.
    pub fn find(&self, key: &SourceKey) -> Option<Record<'_>> {
        match key {
            SourceKey::Job(id) => self.job(id).map(Record::Job),
            SourceKey::Repository(id) => self.repository(id).map(Record::Repository),
            SourceKey::Extent { sobr_id, extent_id } => {
                let sobr = self.sobr(sobr_id)?;
                let extent = sobr.extent(extent_id)?;
                Some(Record::Extent { sobr, extent })
            }
            SourceKey::Server => self.server_info.as_ref().map(Record::Server),
            SourceKey::License => self.license_info.as_ref().map(Record::License),
        }
    }

    pub fn job(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn repository(&self, id: &str) -> Option<&Repository> {
        self.repositories.iter().find(|r| r.id == id)
    }

    pub fn sobr(&self, id: &str) -> Option<&ScaleOutRepository> {
        self.sobrs.iter().find(|s| s.id == id)
    }

    /// Every source key present in this snapshot, singletons included.
    pub fn source_keys(&self) -> Vec<SourceKey> {
        let mut keys: Vec<SourceKey> = Vec::new();
        keys.extend(self.jobs.iter().map(|j| SourceKey::Job(j.id.clone())));
        keys.extend(
            self.repositories
                .iter()
                .map(|r| SourceKey::Repository(r.id.clone())),
        );
        for sobr in &self.sobrs {
            keys.extend(sobr.extents.iter().map(|e| SourceKey::Extent {
                sobr_id: sobr.id.clone(),
                extent_id: e.id.clone(),
            }));
        }
        if self.server_info.is_some() {
            keys.push(SourceKey::Server);
        }
        if self.license_info.is_some() {
            keys.push(SourceKey::License);
        }
        keys
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        Snapshot {
            jobs: vec![Job {
                id: "j1".into(),
                name: "Daily".into(),
                job_type: "Backup".into(),
                status: "inactive".into(),
                last_result: "success".into(),
                last_run: None,
                next_run: None,
                extra: super::super::Extra::new(),
            }],
            sobrs: vec![ScaleOutRepository {
                id: "s1".into(),
                name: "SOBR".into(),
                extents: vec![Extent {
                    id: "e1".into(),
                    name: "Extent".into(),
                    status: vec![],
                }],
                ..ScaleOutRepository::default()
            }],
            ..Snapshot::default()
        }
    }

    #[test]
    fn find_locates_each_category() {
        let snap = sample();
        assert!(matches!(
            snap.find(&SourceKey::Job("j1".into())),
            Some(Record::Job(j)) if j.name == "Daily"
        ));
        assert!(matches!(
            snap.find(&SourceKey::Extent {
                sobr_id: "s1".into(),
                extent_id: "e1".into()
            }),
            Some(Record::Extent { sobr, extent }) if sobr.id == "s1" && extent.id == "e1"
        ));
        assert!(snap.find(&SourceKey::Repository("r1".into())).is_none());
        assert!(snap.find(&SourceKey::Server).is_none());
    }

    #[test]
    fn source_keys_skip_missing_singletons() {
        let keys = sample().source_keys();
        assert_eq!(keys.len(), 2);
        assert!(!keys.contains(&SourceKey::License));
    }
}
