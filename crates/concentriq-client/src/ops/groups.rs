//! Group endpoints (the API calls them `imageSetGroups`).

use concentriq_model::Group;

use crate::client::Client;
use crate::envelope::take_member;
use crate::error::ClientError;

impl Client {
    /// List the groups the account belongs to.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn group_list(&self) -> Result<Vec<Group>, ClientError> {
        let data = self.get("imageSetGroups", &[]).await?;
        Ok(serde_json::from_value(take_member(data, "groups")?)?)
    }

    /// Fetch one group.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn group_get(&self, group_id: i64) -> Result<Group, ClientError> {
        let mut data = self.get(&format!("imageSetGroups/{group_id}"), &[]).await?;

        // The detail endpoint misnames the image-set counter as `imageCount`;
        // rename it so the shared model applies.
        if let Some(object) = data.as_object_mut() {
            if let Some(count) = object.remove("imageCount") {
                object.insert("imageSetCount".to_owned(), count);
            }
        }

        Ok(serde_json::from_value(data)?)
    }
}
