// ── Backend seam ──
//
// Everything the core needs from a backup server, as one async trait.
// `VeeamClient` is the production implementation; tests drive the core
// through an in-process fake.

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use veeamly_api::{Capabilities, TokenGrant, TokenResponse, VeeamClient};

use crate::action::Action;
use crate::error::CoreError;
use crate::session::Session;

/// Outbound interface to the backup server.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Write actions the negotiated API version offers.
    fn capabilities(&self) -> Capabilities;

    /// Human-readable server address for error messages.
    fn endpoint(&self) -> String;

    async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<TokenResponse, CoreError>;

    async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenResponse, CoreError>;

    async fn logout(&self, session: &Session) -> Result<(), CoreError>;

    /// Jobs with their runtime state.
    async fn fetch_jobs(&self, session: &Session) -> Result<Vec<Value>, CoreError>;

    async fn fetch_server_info(&self, session: &Session) -> Result<Value, CoreError>;

    async fn fetch_license(&self, session: &Session) -> Result<Value, CoreError>;

    /// Repository configuration records.
    async fn fetch_repositories(&self, session: &Session) -> Result<Vec<Value>, CoreError>;

    async fn fetch_repository_states(&self, session: &Session) -> Result<Vec<Value>, CoreError>;

    async fn fetch_scale_out_repositories(
        &self,
        session: &Session,
    ) -> Result<Vec<Value>, CoreError>;

    async fn perform(&self, session: &Session, action: &Action) -> Result<(), CoreError>;
}

#[async_trait]
impl Backend for VeeamClient {
    fn capabilities(&self) -> Capabilities {
        *VeeamClient::capabilities(self)
    }

    fn endpoint(&self) -> String {
        self.base_url().origin().ascii_serialization()
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<TokenResponse, CoreError> {
        let grant = TokenGrant::Password {
            username: username.to_owned(),
            password: password.clone(),
        };
        Ok(self.request_token(&grant).await?)
    }

    async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenResponse, CoreError> {
        let grant = TokenGrant::RefreshToken(refresh_token.clone());
        Ok(self.request_token(&grant).await?)
    }

    async fn logout(&self, session: &Session) -> Result<(), CoreError> {
        Ok(VeeamClient::logout(self, session.access_token()).await?)
    }

    async fn fetch_jobs(&self, session: &Session) -> Result<Vec<Value>, CoreError> {
        Ok(self.list_job_states(session.access_token()).await?)
    }

    async fn fetch_server_info(&self, session: &Session) -> Result<Value, CoreError> {
        Ok(self.server_info(session.access_token()).await?)
    }

    async fn fetch_license(&self, session: &Session) -> Result<Value, CoreError> {
        Ok(self.license(session.access_token()).await?)
    }

    async fn fetch_repositories(&self, session: &Session) -> Result<Vec<Value>, CoreError> {
        Ok(self.list_repositories(session.access_token()).await?)
    }

    async fn fetch_repository_states(&self, session: &Session) -> Result<Vec<Value>, CoreError> {
        Ok(self.list_repository_states(session.access_token()).await?)
    }

    async fn fetch_scale_out_repositories(
        &self,
        session: &Session,
    ) -> Result<Vec<Value>, CoreError> {
        Ok(self.list_scale_out_repositories(session.access_token()).await?)
    }

    async fn perform(&self, session: &Session, action: &Action) -> Result<(), CoreError> {
        let token = session.access_token();
        match action {
            Action::StartJob { id, active_full } => self.start_job(token, id, *active_full).await?,
            Action::StopJob { id, graceful } => self.stop_job(token, id, *graceful).await?,
            Action::RetryJob { id } => self.retry_job(token, id).await?,
            Action::EnableJob { id } => self.enable_job(token, id).await?,
            Action::DisableJob { id } => self.disable_job(token, id).await?,
            Action::RescanRepository { id } => {
                self.rescan_repositories(token, std::slice::from_ref(id))
                    .await?;
            }
            Action::EnableExtentSealedMode { sobr_id, extent_id }
            | Action::DisableExtentSealedMode { sobr_id, extent_id }
            | Action::EnableExtentMaintenanceMode { sobr_id, extent_id }
            | Action::DisableExtentMaintenanceMode { sobr_id, extent_id } => {
                let Some((mode, enable)) = action.extent_mode() else {
                    return Err(CoreError::Internal(format!("{action} has no extent mode")));
                };
                self.set_extent_mode(token, sobr_id, extent_id, mode, enable)
                    .await?;
            }
        }
        Ok(())
    }
}
