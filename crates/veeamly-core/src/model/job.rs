// ── Job domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Extra;

/// Run states in which a job is actively doing work.
pub const RUNNING_STATUSES: &[&str] = &["running", "working", "postprocessing", "waitingtape"];

/// A backup job merged with its current run state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    /// Server job type, verbatim (e.g. `Backup`, `BackupCopy`).
    pub job_type: String,
    /// Lowercased run status (`running`, `inactive`, `unknown`, ...).
    pub status: String,
    /// Lowercased result of the last session (`success`, `warning`, `failed`, `none`, ...).
    pub last_result: String,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Extra::is_empty")]
    pub extra: Extra,
}

impl Job {
    /// Whether the job is in one of the [`RUNNING_STATUSES`].
    pub fn is_running(&self) -> bool {
        RUNNING_STATUSES.contains(&self.status.as_str())
    }

    /// Status shown to users: `running` while running or starting,
    /// otherwise the last result, otherwise `unknown`.
    pub fn display_status(&self) -> &str {
        if matches!(self.status.as_str(), "running" | "starting") {
            "running"
        } else if self.last_result.is_empty() {
            "unknown"
        } else {
            &self.last_result
        }
    }

    /// Whether a retry makes sense: idle, and the last run did not succeed cleanly.
    pub fn can_retry(&self) -> bool {
        !self.is_running() && matches!(self.last_result.as_str(), "failed" | "warning")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(status: &str, last_result: &str) -> Job {
        Job {
            id: "j1".into(),
            name: "Daily".into(),
            job_type: "Backup".into(),
            status: status.into(),
            last_result: last_result.into(),
            last_run: None,
            next_run: None,
            extra: Extra::new(),
        }
    }

    #[test]
    fn display_status_prefers_running() {
        assert_eq!(job("running", "failed").display_status(), "running");
        assert_eq!(job("starting", "success").display_status(), "running");
        assert_eq!(job("inactive", "warning").display_status(), "warning");
        assert_eq!(job("inactive", "").display_status(), "unknown");
    }

    #[test]
    fn working_counts_as_running() {
        assert!(job("working", "none").is_running());
        assert!(job("waitingtape", "none").is_running());
        assert!(!job("starting", "none").is_running());
    }

    #[test]
    fn retry_only_after_failure_while_idle() {
        assert!(job("inactive", "failed").can_retry());
        assert!(job("stopped", "warning").can_retry());
        assert!(!job("inactive", "success").can_retry());
        assert!(!job("running", "failed").can_retry());
    }
}
