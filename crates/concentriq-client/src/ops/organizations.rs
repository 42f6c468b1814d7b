//! Organization endpoints.

use concentriq_model::Organization;

use crate::client::Client;
use crate::error::ClientError;

impl Client {
    /// List organizations; requires an admin account.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn organization_list(&self) -> Result<Vec<Organization>, ClientError> {
        let data = self.get("organizations", &[]).await?;
        Ok(serde_json::from_value(data)?)
    }
}
