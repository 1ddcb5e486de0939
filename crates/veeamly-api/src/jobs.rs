// Job endpoints
//
// Job state listing plus the start / stop / retry / enable / disable
// actions under `/api/v1/jobs/{id}`.

use secrecy::SecretString;
use serde_json::{Value, json};
use tracing::debug;

use crate::client::VeeamClient;
use crate::error::Error;
use crate::version::Capability;

impl VeeamClient {
    fn job_url(&self, job_id: &str, verb: &str) -> Result<url::Url, Error> {
        self.api_url_segments(&["api", "v1", "jobs", job_id, verb])
    }

    /// List all jobs merged with their current run state.
    ///
    /// `GET /api/v1/jobs/states`
    pub async fn list_job_states(&self, token: &SecretString) -> Result<Vec<Value>, Error> {
        self.get_list(token, "/api/v1/jobs/states").await
    }

    /// Start a job. `active_full` forces an active full backup.
    ///
    /// `POST /api/v1/jobs/{id}/start`
    pub async fn start_job(
        &self,
        token: &SecretString,
        job_id: &str,
        active_full: bool,
    ) -> Result<(), Error> {
        self.require(Capability::JobControl, "start job")?;
        debug!(job_id, active_full, "starting job");
        self.post_json(
            token,
            self.job_url(job_id, "start")?,
            &json!({ "performActiveFull": active_full }),
        )
        .await?;
        Ok(())
    }

    /// Stop a running job.
    ///
    /// `POST /api/v1/jobs/{id}/stop`
    pub async fn stop_job(
        &self,
        token: &SecretString,
        job_id: &str,
        graceful: bool,
    ) -> Result<(), Error> {
        self.require(Capability::JobControl, "stop job")?;
        debug!(job_id, graceful, "stopping job");
        self.post_json(
            token,
            self.job_url(job_id, "stop")?,
            &json!({ "gracefulStop": graceful }),
        )
        .await?;
        Ok(())
    }

    /// Retry the failed objects of the last run.
    ///
    /// `POST /api/v1/jobs/{id}/retry`
    pub async fn retry_job(&self, token: &SecretString, job_id: &str) -> Result<(), Error> {
        self.require(Capability::JobControl, "retry job")?;
        debug!(job_id, "retrying job");
        self.post_json(token, self.job_url(job_id, "retry")?, &json!({}))
            .await?;
        Ok(())
    }

    /// `POST /api/v1/jobs/{id}/enable`
    pub async fn enable_job(&self, token: &SecretString, job_id: &str) -> Result<(), Error> {
        self.require(Capability::JobToggle, "enable job")?;
        debug!(job_id, "enabling job");
        self.post_json(token, self.job_url(job_id, "enable")?, &json!({}))
            .await?;
        Ok(())
    }

    /// `POST /api/v1/jobs/{id}/disable`
    pub async fn disable_job(&self, token: &SecretString, job_id: &str) -> Result<(), Error> {
        self.require(Capability::JobToggle, "disable job")?;
        debug!(job_id, "disabling job");
        self.post_json(token, self.job_url(job_id, "disable")?, &json!({}))
            .await?;
        Ok(())
    }
}
