//! Annotation endpoints, including the GeoJSON and XML exchange formats.

use std::path::Path;

use tracing::warn;

use concentriq_model::{Annotation, AnnotationFilters};

use crate::client::Client;
use crate::envelope::take_member;
use crate::error::ClientError;
use crate::geojson;

impl Client {
    /// List annotations, optionally filtered.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn annotation_list(
        &self,
        filters: Option<&AnnotationFilters>,
    ) -> Result<Vec<Annotation>, ClientError> {
        let mut params = Vec::new();
        if let Some(filters) = filters {
            params.push(("filters".to_owned(), serde_json::to_string(filters)?));
        }
        let data = self.get("annotations", &params).await?;
        Ok(serde_json::from_value(take_member(data, "annotations")?)?)
    }

    /// Fetch one annotation.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn annotation_get(&self, annotation_id: i64) -> Result<Annotation, ClientError> {
        let data = self.get(&format!("annotations/{annotation_id}"), &[]).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Create an annotation.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn annotation_create(
        &self,
        annotation: &Annotation,
    ) -> Result<Annotation, ClientError> {
        let body = serde_json::to_string(annotation)?;
        let data = self.post_json_text("annotations", body).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Delete an annotation; returns whether the platform acknowledged.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn annotation_delete(&self, annotation_id: i64) -> Result<bool, ClientError> {
        let data = self.delete(&format!("annotations/{annotation_id}")).await?;
        Ok(data.get("success").is_some())
    }

    /// Import annotations from a GeoJSON file of features.
    ///
    /// Unsupported geometries are skipped with a warning. Creation failures
    /// abort unless `skip_errors` is set, in which case the offending
    /// feature is skipped too.
    ///
    /// # Errors
    ///
    /// Propagates file, conversion, API, and transport errors.
    pub async fn annotation_import_geojson(
        &self,
        geojson_path: &Path,
        image_id: i64,
        skip_errors: bool,
    ) -> Result<Vec<Annotation>, ClientError> {
        let image = self.image_get(image_id).await?;
        let contents = tokio::fs::read_to_string(geojson_path).await?;
        let features: Vec<serde_json::Value> = serde_json::from_str(&contents)?;

        let mut created = Vec::new();
        for (index, feature) in features.iter().enumerate() {
            let annotation = match geojson::annotation_from_geojson(feature, &image) {
                Ok(annotation) => annotation,
                Err(ClientError::Geometry(reason)) => {
                    warn!(index, reason, "skipping annotation with unsupported geometry");
                    continue;
                }
                Err(other) => return Err(other),
            };

            match self.annotation_create(&annotation).await {
                Ok(annotation) => created.push(annotation),
                Err(ClientError::Api(body)) if skip_errors => {
                    warn!(index, error = %body.message, "skipping annotation rejected by the API");
                }
                Err(other) => return Err(other),
            }
        }
        Ok(created)
    }

    /// Export an image's annotations as GeoJSON features.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors; an unsupported platform shape is
    /// an error unless `ignore_unsupported` is set.
    pub async fn annotation_export_geojson(
        &self,
        image_id: i64,
        ignore_unsupported: bool,
    ) -> Result<Vec<serde_json::Value>, ClientError> {
        let image = self.image_get(image_id).await?;
        let filters = AnnotationFilters {
            image_id: Some(vec![image.id]),
            ..AnnotationFilters::default()
        };

        let mut features = Vec::new();
        for annotation in self.annotation_list(Some(&filters)).await? {
            match geojson::annotation_to_geojson(&annotation, &image) {
                Ok(feature) => features.push(feature),
                Err(ClientError::Geometry(reason)) if ignore_unsupported => {
                    warn!(annotation = ?annotation.id, reason, "skipping unsupported shape");
                }
                Err(other) => return Err(other),
            }
        }
        Ok(features)
    }

    /// Import annotations from the platform's XML exchange format.
    ///
    /// # Errors
    ///
    /// Propagates file, API, and transport errors. The endpoint reports
    /// success even when individual annotations fail to import.
    pub async fn annotation_import_xml(
        &self,
        xml_path: &Path,
        image_id: i64,
    ) -> Result<(), ClientError> {
        let file_name = xml_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "annotations.xml".to_owned());
        let bytes = tokio::fs::read(xml_path).await?;

        self.post_multipart(
            &format!("images/{image_id}/annotations/import"),
            "files[0]",
            file_name,
            bytes,
        )
        .await?;
        Ok(())
    }

    /// Export an image's annotations as the platform's XML exchange format.
    ///
    /// # Errors
    ///
    /// Propagates API and transport errors.
    pub async fn annotation_export_xml(&self, image_id: i64) -> Result<String, ClientError> {
        self.get_text(&format!("images/{image_id}/annotations/export/xml"), &[])
            .await
    }
}
