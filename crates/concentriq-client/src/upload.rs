//! The image upload flow.
//!
//! Uploading a slide is a conversation with two systems: the platform API
//! (create the image record, sign each storage request, flip the status to
//! optimizing) and the image store itself (the three-phase multipart
//! protocol from `concentriq-upload`). This module wires the two together.

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use concentriq_model::{Image, ImageStatus};
use concentriq_s3_auth::{SignatureProvider, SigningRequest};
use concentriq_upload::{
    ChunkReader, DEFAULT_CHUNK_SIZE, ImageStoreUploader, PartResult, UploadSession,
};

use crate::client::Client;
use crate::error::ClientError;

/// Form body for the image-record creation call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateImage<'a> {
    name: &'a str,
    size: u64,
    source: &'a str,
    image_set_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    folder_parent_id: Option<i64>,
}

/// Form body for the post-upload status transition.
#[derive(Debug, Serialize)]
struct PatchStatus {
    // The web uploader sends the id alongside the status; match it.
    id: i64,
    status: i64,
}

/// Signs storage requests through `auth/sign/s3-multipart-url/image/{id}`.
struct PlatformSigner<'a> {
    client: &'a Client,
    image_id: i64,
}

#[async_trait]
impl SignatureProvider for PlatformSigner<'_> {
    async fn sign(&self, request: &SigningRequest) -> anyhow::Result<String> {
        let endpoint = format!("auth/sign/s3-multipart-url/image/{}", self.image_id);
        let data = self.client.get_with_query(&endpoint, request).await?;
        let signature = data
            .get("signature")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        if signature.is_empty() {
            anyhow::bail!("signing endpoint returned no signature");
        }
        Ok(signature)
    }
}

impl Client {
    /// Upload a slide file into an image set and return the resulting image.
    ///
    /// Creates the image record, streams the file through the multipart
    /// upload, then moves the image into the optimizing state. If any step
    /// fails, the storage-side upload session is aborted best-effort and the
    /// image record is deleted before the error propagates.
    ///
    /// # Errors
    ///
    /// Propagates file, API, signing, and storage errors.
    pub async fn image_upload(
        &self,
        image_path: &Path,
        image_set_id: i64,
        folder_parent_id: Option<i64>,
    ) -> Result<Image, ClientError> {
        let size = tokio::fs::metadata(image_path).await?.len();
        let name = image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ClientError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "image path has no file name",
                ))
            })?;

        let data = self
            .post_form(
                "images",
                &CreateImage {
                    name: &name,
                    size,
                    source: "native",
                    image_set_id,
                    folder_parent_id,
                },
            )
            .await?;

        // Creation answers exactly `{ "id": ... }`.
        if data.as_object().is_none_or(|object| object.len() != 1) {
            return Err(ClientError::UnexpectedResponse(format!(
                "image creation answered more than an id: {data}"
            )));
        }
        let image_id = data
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                ClientError::UnexpectedResponse("image creation answered no id".to_owned())
            })?;

        if let Err(err) = self.run_multipart_upload(image_id, image_path, size).await {
            error!(image_id, error = %err, "upload failed, deleting the image record");
            if let Err(cleanup) = self.image_delete(image_id).await {
                warn!(image_id, error = %cleanup, "failed to delete image record after failed upload");
            }
            return Err(err);
        }

        let image = self.image_get(image_id).await?;
        if image.status != ImageStatus::Uploading {
            return Err(ClientError::UnexpectedResponse(format!(
                "expected image {image_id} in the uploading state, found {:?}",
                image.status
            )));
        }
        self.patch_form(
            &format!("images/{image_id}"),
            &PatchStatus {
                id: image_id,
                status: ImageStatus::Optimizing.into(),
            },
        )
        .await?;

        self.image_get(image_id).await
    }

    /// Stream the file through the three-phase multipart upload.
    async fn run_multipart_upload(
        &self,
        image_id: i64,
        path: &Path,
        size: u64,
    ) -> Result<(), ClientError> {
        let image = self.image_get(image_id).await?;
        let storage_key = image
            .selected_storage_system_entry
            .as_ref()
            .and_then(|entry| entry.get("imageStorageKey"))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
            .ok_or_else(|| {
                ClientError::UnexpectedResponse(
                    "image has no selected storage system entry".to_owned(),
                )
            })?;
        let thumb_url = image
            .thumb_url
            .get("signedURL")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ClientError::UnexpectedResponse("image has no signed thumbnail URL".to_owned())
            })?;

        let uploader = ImageStoreUploader::from_signed_thumb_url(thumb_url)?;
        let signer = PlatformSigner {
            client: self,
            image_id,
        };

        info!(image_id, key = %storage_key, "requesting upload id");
        let upload_id = uploader.create_multipart_upload(&storage_key, &signer).await?;
        let mut session = UploadSession::new(storage_key, upload_id);

        let parts_total = size.div_ceil(DEFAULT_CHUNK_SIZE as u64).max(1);
        info!(
            image_id,
            upload_id = %session.upload_id,
            parts_total,
            chunk_size = DEFAULT_CHUNK_SIZE,
            "uploading parts"
        );

        let result = async {
            let mut reader = ChunkReader::open(path, DEFAULT_CHUNK_SIZE).await?;
            while let Some(part) = reader.next_part().await? {
                let etag = uploader
                    .upload_part(part.number, &part.data, &session.upload_id, &session.key, &signer)
                    .await?;
                info!(part = part.number, parts_total, %etag, "part uploaded");
                session.push_part(PartResult {
                    part_number: part.number,
                    etag,
                });
            }

            let final_etag = uploader
                .complete_multipart_upload(&session.parts, &session.upload_id, &session.key, &signer)
                .await?;
            info!(image_id, %final_etag, "multipart upload finalized");
            Ok::<(), ClientError>(())
        }
        .await;

        if let Err(err) = result {
            warn!(image_id, upload_id = %session.upload_id, "aborting multipart upload after failure");
            if let Err(abort_err) = uploader
                .abort_multipart_upload(&session.upload_id, &session.key, &signer)
                .await
            {
                warn!(image_id, error = %abort_err, "abort failed, the upload session is orphaned");
            }
            return Err(err);
        }
        Ok(())
    }
}
