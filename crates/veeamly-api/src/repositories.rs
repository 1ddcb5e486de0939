// Backup infrastructure endpoints
//
// Repositories, their runtime states, scale-out repositories and the
// rescan / extent mode actions.

use secrecy::SecretString;
use serde_json::{Value, json};
use tracing::debug;

use crate::client::VeeamClient;
use crate::error::Error;
use crate::version::Capability;

const REPOSITORIES: &str = "/api/v1/backupInfrastructure/repositories";
const SCALE_OUT: &str = "/api/v1/backupInfrastructure/scaleOutRepositories";

/// Which extent mode switch to flip on a scale-out repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtentMode {
    /// Sealed: no new backups land on the extent.
    Sealed,
    /// Maintenance: the extent is unavailable for reads and writes.
    Maintenance,
}

impl ExtentMode {
    fn path_suffix(self, enable: bool) -> &'static str {
        match (self, enable) {
            (Self::Sealed, true) => "enableSealedMode",
            (Self::Sealed, false) => "disableSealedMode",
            (Self::Maintenance, true) => "enableMaintenanceMode",
            (Self::Maintenance, false) => "disableMaintenanceMode",
        }
    }

    fn capability(self) -> Capability {
        match self {
            Self::Sealed => Capability::ExtentSealedMode,
            Self::Maintenance => Capability::ExtentMaintenanceMode,
        }
    }
}

impl VeeamClient {
    /// Repository configuration (description, uniqueId, immutability settings).
    ///
    /// `GET /api/v1/backupInfrastructure/repositories`
    pub async fn list_repositories(&self, token: &SecretString) -> Result<Vec<Value>, Error> {
        self.get_list(token, REPOSITORIES).await
    }

    /// Repository runtime state (capacity, free space, online).
    ///
    /// `GET /api/v1/backupInfrastructure/repositories/states`
    pub async fn list_repository_states(
        &self,
        token: &SecretString,
    ) -> Result<Vec<Value>, Error> {
        self.get_list(token, &format!("{REPOSITORIES}/states")).await
    }

    /// `GET /api/v1/backupInfrastructure/scaleOutRepositories`
    pub async fn list_scale_out_repositories(
        &self,
        token: &SecretString,
    ) -> Result<Vec<Value>, Error> {
        self.get_list(token, SCALE_OUT).await
    }

    /// Trigger a rescan of the given repositories.
    ///
    /// `POST /api/v1/backupInfrastructure/repositories/rescan`
    pub async fn rescan_repositories(
        &self,
        token: &SecretString,
        repository_ids: &[String],
    ) -> Result<(), Error> {
        self.require(Capability::RepositoryRescan, "rescan repository")?;
        debug!(?repository_ids, "rescanning repositories");
        self.post_json(
            token,
            self.api_url(&format!("{REPOSITORIES}/rescan"))?,
            &json!({ "repositoryIds": repository_ids }),
        )
        .await?;
        Ok(())
    }

    /// Enable or disable sealed / maintenance mode on one SOBR extent.
    ///
    /// `POST /api/v1/backupInfrastructure/scaleOutRepositories/{id}/{enable|disable}{Sealed|Maintenance}Mode`
    pub async fn set_extent_mode(
        &self,
        token: &SecretString,
        sobr_id: &str,
        extent_id: &str,
        mode: ExtentMode,
        enable: bool,
    ) -> Result<(), Error> {
        let suffix = mode.path_suffix(enable);
        self.require(mode.capability(), suffix)?;
        debug!(sobr_id, extent_id, suffix, "switching extent mode");
        self.post_json(
            token,
            self.api_url_segments(&[
                "api",
                "v1",
                "backupInfrastructure",
                "scaleOutRepositories",
                sobr_id,
                suffix,
            ])?,
            &json!({ "repositoryIds": [extent_id] }),
        )
        .await?;
        Ok(())
    }
}
