//! Image endpoints.
//!
//! The upload operation itself lives in [`crate::upload`]; this module covers
//! the plain CRUD surface.

use concentriq_model::{Image, ImageFilters, PageInfo, Pagination, SortBy};

use crate::client::{Client, PageCursor};
use crate::envelope::take_member;
use crate::error::ClientError;

impl Client {
    /// List images, optionally filtered, without pagination.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn image_list(
        &self,
        filters: Option<&ImageFilters>,
    ) -> Result<Vec<Image>, ClientError> {
        let params = filter_params(filters)?;
        let data = self.get("images", &params).await?;
        Ok(serde_json::from_value(take_member(data, "images")?)?)
    }

    /// Fetch one page of images together with its pagination info.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn image_list_page(
        &self,
        filters: Option<&ImageFilters>,
        pagination: &Pagination,
    ) -> Result<(Vec<Image>, PageInfo), ClientError> {
        let mut params = filter_params(filters)?;
        params.push(("pagination".to_owned(), serde_json::to_string(pagination)?));

        let (data, info) = self.get_page("images", &params).await?;
        let images = serde_json::from_value(take_member(data, "images")?)?;
        Ok((images, info))
    }

    /// List all images matching the filters by walking every page.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors from any page request.
    pub async fn image_list_all(
        &self,
        filters: Option<&ImageFilters>,
        rows_per_page: u32,
        sort_by: SortBy,
        descending: bool,
    ) -> Result<Vec<Image>, ClientError> {
        let params = filter_params(filters)?;
        let mut cursor =
            PageCursor::new(self, "images", params, 0, rows_per_page, sort_by, descending);

        let mut images: Vec<Image> = Vec::new();
        while let Some(data) = cursor.next_page().await? {
            let page: Vec<Image> = serde_json::from_value(take_member(data, "images")?)?;
            images.extend(page);
        }
        Ok(images)
    }

    /// Fetch one image.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn image_get(&self, image_id: i64) -> Result<Image, ClientError> {
        let data = self.get(&format!("images/{image_id}"), &[]).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Resolve the download URL of an image's original file.
    ///
    /// The endpoint answers with a redirect to a pre-signed URL; the target
    /// is returned without being followed.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors; a non-redirect answer is an
    /// unexpected response.
    pub async fn image_download_url(&self, image_id: i64) -> Result<String, ClientError> {
        self.get_redirect_location(&format!("images/{image_id}/download"))
            .await
    }

    /// Delete an image; returns whether the platform acknowledged.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn image_delete(&self, image_id: i64) -> Result<bool, ClientError> {
        let data = self.delete(&format!("images/{image_id}")).await?;
        Ok(data.get("success").is_some())
    }
}

fn filter_params(filters: Option<&ImageFilters>) -> Result<Vec<(String, String)>, ClientError> {
    let mut params = Vec::new();
    if let Some(filters) = filters {
        params.push(("filters".to_owned(), serde_json::to_string(filters)?));
    }
    Ok(params)
}
