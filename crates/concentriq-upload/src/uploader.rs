//! The three-phase multipart upload orchestrator.
//!
//! Phases run strictly in order: initiate, upload parts, complete. For each
//! phase the orchestrator builds a canonical request, obtains a signature
//! through the injected [`SignatureProvider`], attaches the authorization
//! headers, and executes the HTTP call through the injected
//! [`StorageTransport`]. Responses are validated against the protocol
//! contract before the next phase may start.
//!
//! There is no retry and no automatic cleanup: a failure mid-sequence leaves
//! the server-side upload session orphaned. Callers wanting cleanup invoke
//! [`ImageStoreUploader::abort_multipart_upload`] explicitly.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use concentriq_s3_auth::{
    Method, SignatureProvider, SigningRequest, access_key_from_signed_url,
    authorization_header, build_canonical_request, build_string_to_sign, credential_scope,
    format_amz_date,
};

use crate::checksums;
use crate::error::{BackendContractError, UploadError};
use crate::transport::{HttpTransport, StorageRequest, StorageTransport};
use crate::xml;

/// The bucket backing the platform's image store.
pub const IMAGE_STORE_BUCKET: &str = "concentriq-image-store";

/// AWS service identifier of the image store.
const STORE_SERVICE: &str = "s3";

/// AWS region hosting the image store.
const STORE_REGION: &str = "eu-central-1";

/// One completed part: its 1-based number and the ETag the backend assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartResult {
    /// 1-based, gap-free part number.
    pub part_number: u32,
    /// Content-integrity tag returned by the backend.
    pub etag: String,
}

/// One multipart upload in progress, retained by the caller across phases.
#[derive(Debug, Clone)]
pub struct UploadSession {
    /// Storage key of the target object.
    pub key: String,
    /// Backend-assigned upload identifier.
    pub upload_id: String,
    /// Completed parts, in upload order.
    pub parts: Vec<PartResult>,
}

impl UploadSession {
    /// Start tracking a freshly initiated upload.
    #[must_use]
    pub fn new(key: impl Into<String>, upload_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            upload_id: upload_id.into(),
            parts: Vec::new(),
        }
    }

    /// Record a completed part.
    pub fn push_part(&mut self, part: PartResult) {
        self.parts.push(part);
    }
}

/// Multipart uploader for the Concentriq image store.
///
/// Holds only an access-key id; signatures come from the injected
/// [`SignatureProvider`], so no AWS secret ever touches this process.
#[derive(Debug, Clone)]
pub struct ImageStoreUploader<T = HttpTransport> {
    access_key: String,
    service: String,
    region: String,
    host: String,
    bucket: String,
    transport: T,
}

impl ImageStoreUploader<HttpTransport> {
    /// Build an uploader from a known access-key id, using the default HTTP
    /// transport.
    #[must_use]
    pub fn new(access_key: impl Into<String>) -> Self {
        Self::with_transport(access_key, HttpTransport::default())
    }

    /// Build an uploader by extracting the access-key id from a pre-signed
    /// thumbnail URL.
    ///
    /// The platform embeds the web uploader's access key in every pre-signed
    /// URL's `X-Amz-Credential` parameter; this is the only place the
    /// credential is discoverable.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Auth`] when the URL has no usable credential.
    pub fn from_signed_thumb_url(url: &str) -> Result<Self, UploadError> {
        let access_key = access_key_from_signed_url(url)?;
        Ok(Self::new(access_key))
    }
}

impl<T: StorageTransport> ImageStoreUploader<T> {
    /// Build an uploader over a caller-supplied transport.
    #[must_use]
    pub fn with_transport(access_key: impl Into<String>, transport: T) -> Self {
        let service = STORE_SERVICE.to_owned();
        let region = STORE_REGION.to_owned();
        let host = format!("{service}-{region}.amazonaws.com");
        Self {
            access_key: access_key.into(),
            service,
            region,
            host,
            bucket: IMAGE_STORE_BUCKET.to_owned(),
            transport,
        }
    }

    /// The access-key id this uploader signs as.
    #[must_use]
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Absolute URL of the target object.
    fn target_url(&self, key: &str) -> String {
        format!("https://{}/{}/{key}", self.host, self.bucket)
    }

    /// Canonical URI of the target object.
    fn object_uri(&self, key: &str) -> String {
        format!("/{}/{key}", self.bucket)
    }

    /// Build the authorization headers for one phase call.
    ///
    /// Runs the full signing pipeline: canonical request, string to sign,
    /// remote signature, `Authorization` assembly. The returned header list
    /// carries `x-amz-date`, `Authorization`, `x-amz-content-sha256`, and
    /// any phase-specific extras.
    #[allow(clippy::too_many_arguments)]
    async fn authorize(
        &self,
        key: &str,
        timestamp: &DateTime<Utc>,
        method: Method,
        query: &[(String, String)],
        body: Option<&[u8]>,
        hash_payload: bool,
        extra_headers: &[(String, String)],
        signer: &dyn SignatureProvider,
    ) -> Result<Vec<(String, String)>, UploadError> {
        let uri = self.object_uri(key);
        let canonical = build_canonical_request(
            method,
            &self.host,
            timestamp,
            &uri,
            query,
            body,
            hash_payload,
            extra_headers,
        )?;
        let string_to_sign =
            build_string_to_sign(timestamp, &self.region, &self.service, &canonical.text);

        let amz_date = format_amz_date(timestamp);
        let request = SigningRequest::new(&string_to_sign, &amz_date, &canonical.text);
        let signature = signer.sign(&request).await.map_err(UploadError::Signing)?;
        if signature.is_empty() {
            return Err(UploadError::EmptySignature);
        }

        let scope = credential_scope(timestamp, &self.region, &self.service);
        let authorization =
            authorization_header(&self.access_key, &scope, &canonical.signed_headers, &signature);

        let mut headers = vec![
            ("x-amz-date".to_owned(), amz_date),
            ("Authorization".to_owned(), authorization),
            ("x-amz-content-sha256".to_owned(), canonical.payload_hash),
        ];
        headers.extend(extra_headers.iter().cloned());
        Ok(headers)
    }

    /// Phase 1: initiate the multipart upload and return the backend-assigned
    /// upload id.
    ///
    /// # Errors
    ///
    /// Fails on signing errors, transport errors, or a response outside the
    /// protocol contract (wrong root element, wrong member set, or a
    /// bucket/key echo mismatch).
    pub async fn create_multipart_upload(
        &self,
        key: &str,
        signer: &dyn SignatureProvider,
    ) -> Result<String, UploadError> {
        let query = vec![("uploads".to_owned(), String::new())];
        let timestamp = Utc::now();
        let headers = self
            .authorize(key, &timestamp, Method::Post, &query, None, true, &[], signer)
            .await?;

        debug!(key, "initiating multipart upload");
        let response = self
            .transport
            .execute(StorageRequest {
                method: Method::Post,
                url: self.target_url(key),
                query,
                headers,
                body: None,
            })
            .await
            .map_err(UploadError::Transport)?;

        let result = xml::parse_initiate_result(&response.body)?;
        ensure_echo("Bucket", &self.bucket, &result.bucket)?;
        ensure_echo("Key", key, &result.key)?;
        if result.upload_id.is_empty() {
            return Err(BackendContractError::EmptyField("UploadId").into());
        }

        debug!(key, upload_id = %result.upload_id, "multipart upload initiated");
        Ok(result.upload_id)
    }

    /// Phase 2: upload one part and return its ETag.
    ///
    /// The chunk travels with an unsigned payload line; integrity is carried
    /// by the `content-md5` header instead, so the multi-gigabyte body is
    /// digested once rather than twice. Part numbers are the caller's
    /// responsibility: 1-based, ascending, gap-free, matching the eventual
    /// completion manifest.
    ///
    /// # Errors
    ///
    /// Fails on signing errors, transport errors, or a response without an
    /// `ETag` header.
    pub async fn upload_part(
        &self,
        part_number: u32,
        chunk: &Bytes,
        upload_id: &str,
        key: &str,
        signer: &dyn SignatureProvider,
    ) -> Result<String, UploadError> {
        // Keys are pre-sorted: "partNumber" < "uploadId".
        let query = vec![
            ("partNumber".to_owned(), part_number.to_string()),
            ("uploadId".to_owned(), upload_id.to_owned()),
        ];
        let extra_headers = vec![("content-md5".to_owned(), checksums::content_md5(chunk))];

        let timestamp = Utc::now();
        let headers = self
            .authorize(
                key,
                &timestamp,
                Method::Put,
                &query,
                Some(chunk),
                false,
                &extra_headers,
                signer,
            )
            .await?;

        debug!(key, part_number, size = chunk.len(), "uploading part");
        let response = self
            .transport
            .execute(StorageRequest {
                method: Method::Put,
                url: self.target_url(key),
                query,
                headers,
                body: Some(chunk.clone()),
            })
            .await
            .map_err(UploadError::Transport)?;

        let etag = response
            .header("ETag")
            .filter(|value| !value.is_empty())
            .ok_or(BackendContractError::MissingEtag)?;

        debug!(key, part_number, etag, "part uploaded");
        Ok(etag.to_owned())
    }

    /// Phase 3: complete the upload with the part manifest and return the
    /// final object ETag.
    ///
    /// The backend's final ETag conventionally equals the MD5 of the
    /// concatenated part digests plus the part count; the convention is not
    /// contractual, so a mismatch is logged as a warning rather than
    /// failing the upload.
    ///
    /// # Errors
    ///
    /// Fails on signing errors, transport errors, or a response outside the
    /// protocol contract.
    pub async fn complete_multipart_upload(
        &self,
        parts: &[PartResult],
        upload_id: &str,
        key: &str,
        signer: &dyn SignatureProvider,
    ) -> Result<String, UploadError> {
        let body = xml::completed_upload_body(parts)?;
        let query = vec![("uploadId".to_owned(), upload_id.to_owned())];
        let extra_headers = vec![(
            "content-type".to_owned(),
            "application/xml; charset=UTF-8".to_owned(),
        )];

        let timestamp = Utc::now();
        let headers = self
            .authorize(
                key,
                &timestamp,
                Method::Post,
                &query,
                Some(&body),
                true,
                &extra_headers,
                signer,
            )
            .await?;

        debug!(key, upload_id, parts = parts.len(), "completing multipart upload");
        let response = self
            .transport
            .execute(StorageRequest {
                method: Method::Post,
                url: self.target_url(key),
                query,
                headers,
                body: Some(Bytes::from(body)),
            })
            .await
            .map_err(UploadError::Transport)?;

        let result = xml::parse_complete_result(&response.body)?;
        ensure_echo("Bucket", &self.bucket, &result.bucket)?;
        ensure_echo("Key", key, &result.key)?;
        if result.etag.is_empty() {
            return Err(BackendContractError::EmptyField("ETag").into());
        }

        let part_etags: Vec<&str> = parts.iter().map(|p| p.etag.as_str()).collect();
        if let Some(expected) = checksums::multipart_etag(&part_etags) {
            if expected != result.etag {
                warn!(
                    expected,
                    actual = %result.etag,
                    "final ETag does not match the composite of the part digests"
                );
            }
        }

        debug!(key, etag = %result.etag, "multipart upload completed");
        Ok(result.etag)
    }

    /// Abort an in-progress upload, discarding its server-side parts.
    ///
    /// The platform's own uploader never aborts, leaving failed sessions to
    /// accrue storage until external cleanup; this call closes that gap for
    /// callers that want it. Success is any 2xx acknowledgement.
    ///
    /// # Errors
    ///
    /// Fails on signing errors, transport errors, or a non-success status.
    pub async fn abort_multipart_upload(
        &self,
        upload_id: &str,
        key: &str,
        signer: &dyn SignatureProvider,
    ) -> Result<(), UploadError> {
        let query = vec![("uploadId".to_owned(), upload_id.to_owned())];
        let timestamp = Utc::now();
        let headers = self
            .authorize(key, &timestamp, Method::Delete, &query, None, true, &[], signer)
            .await?;

        debug!(key, upload_id, "aborting multipart upload");
        let response = self
            .transport
            .execute(StorageRequest {
                method: Method::Delete,
                url: self.target_url(key),
                query,
                headers,
                body: None,
            })
            .await
            .map_err(UploadError::Transport)?;

        if !response.is_success() {
            return Err(BackendContractError::AbortRejected(response.status).into());
        }
        Ok(())
    }
}

/// Check that a response member echoes the request value.
fn ensure_echo(field: &'static str, expected: &str, actual: &str) -> Result<(), UploadError> {
    if expected == actual {
        Ok(())
    } else {
        Err(BackendContractError::FieldMismatch {
            field,
            expected: expected.to_owned(),
            actual: actual.to_owned(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use concentriq_s3_auth::StaticSignatureProvider;

    use super::*;
    use crate::transport::StorageResponse;

    /// Transport stub replaying canned responses and recording requests.
    struct StubTransport {
        responses: Mutex<VecDeque<StorageResponse>>,
        requests: Mutex<Vec<StorageRequest>>,
    }

    impl StubTransport {
        fn new(responses: Vec<StorageResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn recorded(&self) -> Vec<StorageRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StorageTransport for &StubTransport {
        async fn execute(&self, request: StorageRequest) -> anyhow::Result<StorageResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("no canned response left"))
        }
    }

    /// A signature provider that always fails.
    struct FailingSigner;

    #[async_trait]
    impl SignatureProvider for FailingSigner {
        async fn sign(&self, _request: &SigningRequest) -> anyhow::Result<String> {
            anyhow::bail!("signing endpoint unavailable")
        }
    }

    fn xml_response(body: &str) -> StorageResponse {
        StorageResponse {
            status: 200,
            headers: Vec::new(),
            body: Bytes::from(body.to_owned()),
        }
    }

    fn initiate_response(bucket: &str, key: &str, upload_id: &str) -> StorageResponse {
        xml_response(&format!(
            "<InitiateMultipartUploadResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
             <Bucket>{bucket}</Bucket><Key>{key}</Key><UploadId>{upload_id}</UploadId>\
             </InitiateMultipartUploadResult>"
        ))
    }

    fn signer() -> StaticSignatureProvider {
        StaticSignatureProvider::new("fixedsignature")
    }

    #[tokio::test]
    async fn test_should_return_upload_id_from_initiate() {
        let transport = StubTransport::new(vec![initiate_response(
            "concentriq-image-store",
            "abc",
            "U1",
        )]);
        let uploader = ImageStoreUploader::with_transport("AKID", &transport);

        let upload_id = uploader
            .create_multipart_upload("abc", &signer())
            .await
            .unwrap();
        assert_eq!(upload_id, "U1");

        let requests = transport.recorded();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, Method::Post);
        assert_eq!(
            request.url,
            "https://s3-eu-central-1.amazonaws.com/concentriq-image-store/abc"
        );
        assert_eq!(request.query, vec![("uploads".to_owned(), String::new())]);
        assert!(request.body.is_none());

        let authorization = request
            .headers
            .iter()
            .find(|(name, _)| name == "Authorization")
            .map(|(_, value)| value.as_str())
            .unwrap();
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKID/"));
        assert!(authorization.contains("/eu-central-1/s3/aws4_request"));
        assert!(authorization.contains("SignedHeaders=host;x-amz-date"));
        assert!(authorization.ends_with("Signature=fixedsignature"));
    }

    #[tokio::test]
    async fn test_should_fail_initiate_on_wrong_root_element() {
        let transport = StubTransport::new(vec![xml_response(
            "<WrongResult><Bucket>concentriq-image-store</Bucket>\
             <Key>abc</Key><UploadId>U1</UploadId></WrongResult>",
        )]);
        let uploader = ImageStoreUploader::with_transport("AKID", &transport);

        let result = uploader.create_multipart_upload("abc", &signer()).await;
        assert!(matches!(
            result,
            Err(UploadError::Backend(BackendContractError::UnexpectedRoot(_)))
        ));
    }

    #[tokio::test]
    async fn test_should_fail_initiate_on_bucket_mismatch() {
        let transport =
            StubTransport::new(vec![initiate_response("some-other-bucket", "abc", "U1")]);
        let uploader = ImageStoreUploader::with_transport("AKID", &transport);

        let result = uploader.create_multipart_upload("abc", &signer()).await;
        assert!(matches!(
            result,
            Err(UploadError::Backend(BackendContractError::FieldMismatch {
                field: "Bucket",
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn test_should_fail_initiate_on_empty_upload_id() {
        let transport =
            StubTransport::new(vec![initiate_response("concentriq-image-store", "abc", "")]);
        let uploader = ImageStoreUploader::with_transport("AKID", &transport);

        let result = uploader.create_multipart_upload("abc", &signer()).await;
        assert!(matches!(
            result,
            Err(UploadError::Backend(BackendContractError::EmptyField(
                "UploadId"
            )))
        ));
    }

    #[tokio::test]
    async fn test_should_upload_part_with_sorted_query_and_content_md5() {
        let transport = StubTransport::new(vec![StorageResponse {
            status: 200,
            headers: vec![("ETag".to_owned(), "\"p1\"".to_owned())],
            body: Bytes::new(),
        }]);
        let uploader = ImageStoreUploader::with_transport("AKID", &transport);

        let chunk = Bytes::from_static(b"chunk-bytes");
        let etag = uploader
            .upload_part(1, &chunk, "U1", "abc", &signer())
            .await
            .unwrap();
        assert_eq!(etag, "\"p1\"");

        let requests = transport.recorded();
        let request = &requests[0];
        assert_eq!(request.method, Method::Put);
        assert_eq!(
            request.query,
            vec![
                ("partNumber".to_owned(), "1".to_owned()),
                ("uploadId".to_owned(), "U1".to_owned()),
            ]
        );
        assert_eq!(request.body.as_deref(), Some(b"chunk-bytes".as_slice()));

        let header = |name: &str| {
            request
                .headers
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        };
        assert_eq!(header("content-md5"), Some(checksums::content_md5(&chunk)));
        assert_eq!(
            header("x-amz-content-sha256"),
            Some("UNSIGNED-PAYLOAD".to_owned())
        );
    }

    #[tokio::test]
    async fn test_should_fail_part_upload_without_etag_header() {
        let transport = StubTransport::new(vec![StorageResponse {
            status: 200,
            headers: Vec::new(),
            body: Bytes::new(),
        }]);
        let uploader = ImageStoreUploader::with_transport("AKID", &transport);

        let chunk = Bytes::from_static(b"chunk");
        let result = uploader.upload_part(1, &chunk, "U1", "abc", &signer()).await;
        assert!(matches!(
            result,
            Err(UploadError::Backend(BackendContractError::MissingEtag))
        ));
    }

    #[tokio::test]
    async fn test_should_complete_upload_with_manifest_and_content_type() {
        let transport = StubTransport::new(vec![xml_response(
            "<CompleteMultipartUploadResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
             <Location>https://s3-eu-central-1.amazonaws.com/concentriq-image-store/abc</Location>\
             <Bucket>concentriq-image-store</Bucket><Key>abc</Key>\
             <ETag>\"final-9\"</ETag>\
             </CompleteMultipartUploadResult>",
        )]);
        let uploader = ImageStoreUploader::with_transport("AKID", &transport);

        let parts = vec![
            PartResult {
                part_number: 1,
                etag: "e1".to_owned(),
            },
            PartResult {
                part_number: 2,
                etag: "e2".to_owned(),
            },
        ];
        let final_etag = uploader
            .complete_multipart_upload(&parts, "U1", "abc", &signer())
            .await
            .unwrap();
        assert_eq!(final_etag, "\"final-9\"");

        let requests = transport.recorded();
        let request = &requests[0];
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.query, vec![("uploadId".to_owned(), "U1".to_owned())]);

        let body = request.body.as_ref().unwrap();
        let body_text = std::str::from_utf8(body).unwrap();
        let first = "<Part><PartNumber>1</PartNumber><ETag>e1</ETag></Part>";
        let second = "<Part><PartNumber>2</PartNumber><ETag>e2</ETag></Part>";
        assert!(body_text.find(first).unwrap() < body_text.find(second).unwrap());

        assert!(request.headers.iter().any(|(name, value)| {
            name == "content-type" && value == "application/xml; charset=UTF-8"
        }));
        // The manifest body is hashed, not unsigned.
        assert!(request.headers.iter().any(|(name, value)| {
            name == "x-amz-content-sha256" && value != "UNSIGNED-PAYLOAD"
        }));
    }

    #[tokio::test]
    async fn test_should_propagate_signing_failure_before_any_network_call() {
        let transport = StubTransport::new(Vec::new());
        let uploader = ImageStoreUploader::with_transport("AKID", &transport);

        let result = uploader.create_multipart_upload("abc", &FailingSigner).await;
        assert!(matches!(result, Err(UploadError::Signing(_))));
        assert!(transport.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_should_reject_empty_signature() {
        let transport = StubTransport::new(Vec::new());
        let uploader = ImageStoreUploader::with_transport("AKID", &transport);

        let result = uploader
            .create_multipart_upload("abc", &StaticSignatureProvider::new(""))
            .await;
        assert!(matches!(result, Err(UploadError::EmptySignature)));
        assert!(transport.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_should_abort_upload_with_delete_request() {
        let transport = StubTransport::new(vec![StorageResponse {
            status: 204,
            headers: Vec::new(),
            body: Bytes::new(),
        }]);
        let uploader = ImageStoreUploader::with_transport("AKID", &transport);

        uploader
            .abort_multipart_upload("U1", "abc", &signer())
            .await
            .unwrap();

        let requests = transport.recorded();
        let request = &requests[0];
        assert_eq!(request.method, Method::Delete);
        assert_eq!(request.query, vec![("uploadId".to_owned(), "U1".to_owned())]);
        assert!(request.body.is_none());
    }

    #[tokio::test]
    async fn test_should_fail_abort_on_error_status() {
        let transport = StubTransport::new(vec![StorageResponse {
            status: 403,
            headers: Vec::new(),
            body: Bytes::new(),
        }]);
        let uploader = ImageStoreUploader::with_transport("AKID", &transport);

        let result = uploader.abort_multipart_upload("U1", "abc", &signer()).await;
        assert!(matches!(
            result,
            Err(UploadError::Backend(BackendContractError::AbortRejected(
                403
            )))
        ));
    }

    #[test]
    fn test_should_accumulate_parts_in_session() {
        let mut session = UploadSession::new("abc", "U1");
        session.push_part(PartResult {
            part_number: 1,
            etag: "e1".to_owned(),
        });
        session.push_part(PartResult {
            part_number: 2,
            etag: "e2".to_owned(),
        });
        assert_eq!(session.parts.len(), 2);
        assert_eq!(session.parts[1].part_number, 2);
    }

    #[test]
    fn test_should_extract_access_key_when_built_from_thumb_url() {
        let url = "https://s3-eu-central-1.amazonaws.com/concentriq-image-store/1/thumb.jpeg\
                   ?X-Amz-Credential=AKIDWEB%2F20220301%2Feu-central-1%2Fs3%2Faws4_request";
        let uploader = ImageStoreUploader::from_signed_thumb_url(url).unwrap();
        assert_eq!(uploader.access_key(), "AKIDWEB");
    }
}
