// Server-level endpoints: installation info and license.

use secrecy::SecretString;
use serde_json::Value;

use crate::client::VeeamClient;
use crate::error::Error;

impl VeeamClient {
    /// Build, platform and database details of the backup server.
    ///
    /// `GET /api/v1/serverInfo`
    pub async fn server_info(&self, token: &SecretString) -> Result<Value, Error> {
        self.get_json(token, "/api/v1/serverInfo").await
    }

    /// Installed license.
    ///
    /// `GET /api/v1/license`
    pub async fn license(&self, token: &SecretString) -> Result<Value, Error> {
        self.get_json(token, "/api/v1/license").await
    }
}
