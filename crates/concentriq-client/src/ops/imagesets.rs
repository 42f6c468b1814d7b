//! Image-set endpoints (the web UI calls them repositories).

use serde::Serialize;

use concentriq_model::ImageSet;

use crate::client::Client;
use crate::envelope::take_member;
use crate::error::ClientError;

impl Client {
    /// List image sets visible to the account.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn imageset_list(&self) -> Result<Vec<ImageSet>, ClientError> {
        let data = self.get("imageSets", &[]).await?;
        Ok(serde_json::from_value(take_member(data, "imageSets")?)?)
    }

    /// Fetch one image set.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn imageset_get(&self, imageset_id: i64) -> Result<ImageSet, ClientError> {
        let data = self.get(&format!("imageSets/{imageset_id}"), &[]).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Create an image set inside a group.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn imageset_create(
        &self,
        name: &str,
        group_id: i64,
    ) -> Result<ImageSet, ClientError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct CreateImageSet<'a> {
            name: &'a str,
            group_id: i64,
        }

        let data = self
            .post_form("imageSets", &CreateImageSet { name, group_id })
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Delete an image set; returns whether the platform acknowledged.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn imageset_delete(&self, imageset_id: i64) -> Result<bool, ClientError> {
        let data = self.delete(&format!("imageSets/{imageset_id}")).await?;
        Ok(data.get("success").is_some())
    }

    /// Export an image set's metadata as CSV.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn imageset_export_metadata_csv(
        &self,
        imageset_id: i64,
    ) -> Result<String, ClientError> {
        self.get_text(&format!("imageSets/{imageset_id}/export/csv"), &[])
            .await
    }
}
