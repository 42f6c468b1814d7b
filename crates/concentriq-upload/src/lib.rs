//! Multipart upload to the Concentriq image store.
//!
//! The platform stores whole-slide images in an S3-compatible bucket but
//! proxies all request signing through its own API, so neither the AWS SDK
//! nor presigned-URL helpers apply. This crate reimplements the three-phase
//! multipart protocol on top of the signing engine from
//! `concentriq-s3-auth`:
//!
//! 1. **Initiate** - `POST ?uploads=` returns the backend-assigned upload id.
//! 2. **Upload parts** - sequential `PUT ?partNumber=&uploadId=` calls, one
//!    per fixed-size chunk, each answered with a part ETag.
//! 3. **Complete** - `POST ?uploadId=` with an XML manifest of part ETags,
//!    answered with the final object ETag.
//!
//! Execution is strictly sequential: one chunk in memory at a time, no
//! overlapping network calls, no retries. A failure anywhere aborts the
//! sequence; [`ImageStoreUploader::abort_multipart_upload`] exists for
//! best-effort cleanup of the orphaned server-side session.
//!
//! # Modules
//!
//! - [`checksums`] - Content-MD5 and composite-ETag helpers
//! - [`chunk`] - Sequential fixed-size file chunking
//! - [`error`] - Upload error taxonomy
//! - [`transport`] - The HTTP transport capability and its reqwest implementation
//! - [`uploader`] - The three-phase orchestrator
//! - [`xml`] - The S3 XML wire codec

pub mod checksums;
pub mod chunk;
pub mod error;
pub mod transport;
pub mod uploader;
pub mod xml;

pub use chunk::{ChunkReader, DEFAULT_CHUNK_SIZE, FilePart};
pub use error::{BackendContractError, UploadError};
pub use transport::{HttpTransport, StorageRequest, StorageResponse, StorageTransport};
pub use uploader::{IMAGE_STORE_BUCKET, ImageStoreUploader, PartResult, UploadSession};
