//! Folder endpoints.

use concentriq_model::{Folder, FolderFilters};

use crate::client::Client;
use crate::envelope::take_member;
use crate::error::ClientError;

impl Client {
    /// List folders, optionally filtered and with per-folder metadata.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn folder_list(
        &self,
        filters: Option<&FolderFilters>,
        include_metadata: bool,
    ) -> Result<Vec<Folder>, ClientError> {
        let mut params = Vec::new();
        if let Some(filters) = filters {
            params.push(("filters".to_owned(), serde_json::to_string(filters)?));
        }
        if include_metadata {
            params.push(("includeMetadata".to_owned(), "true".to_owned()));
        }

        let data = self.get("folders", &params).await?;
        Ok(serde_json::from_value(take_member(data, "folders")?)?)
    }
}
