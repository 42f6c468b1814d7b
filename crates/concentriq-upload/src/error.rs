//! Upload error taxonomy.
//!
//! Failures fall into distinct classes with different audiences: precondition
//! violations are programmer errors caught before any network call, backend
//! contract violations signal integration drift with the image store, signing
//! failures come from the platform's signing endpoint, and transport failures
//! bubble up from the HTTP layer untouched. None of them are retried.

use concentriq_s3_auth::AuthError;

/// The backend answered with something outside the protocol contract.
///
/// These are fatal assertions about the image store's behavior, deliberately
/// kept apart from XML parse errors: a well-formed document with the wrong
/// shape means the backend and client disagree about the protocol, which is a
/// different failure class than a garbled response.
#[derive(Debug, thiserror::Error)]
pub enum BackendContractError {
    /// The response document's root element has an unexpected name.
    #[error("unexpected response root element: {0:?}")]
    UnexpectedRoot(String),

    /// The response document carries a different member set than the
    /// protocol defines.
    #[error("unexpected response shape: expected members {expected:?}, got {actual:?}")]
    UnexpectedShape {
        /// The members the protocol defines for this document.
        expected: &'static [&'static str],
        /// The members actually present.
        actual: Vec<String>,
    },

    /// A response member does not echo the request.
    #[error("response {field} mismatch: expected {expected:?}, got {actual:?}")]
    FieldMismatch {
        /// The offending member.
        field: &'static str,
        /// The value sent in the request.
        expected: String,
        /// The value the backend returned.
        actual: String,
    },

    /// A required response member is present but empty.
    #[error("response {0} is empty")]
    EmptyField(&'static str),

    /// The part-upload response is missing its `ETag` header.
    #[error("part-upload response carries no ETag header")]
    MissingEtag,

    /// The abort request was not acknowledged with a success status.
    #[error("abort was not acknowledged: HTTP status {0}")]
    AbortRejected(u16),
}

/// Errors produced by the S3 XML wire codec.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// An I/O error while writing XML.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the underlying quick-xml library.
    #[error("XML processing error: {0}")]
    QuickXml(#[from] quick_xml::Error),

    /// Malformed or undecodable response content.
    #[error("failed to parse response document: {0}")]
    Parse(String),
}

/// Top-level error for the multipart upload flow.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// A signing precondition was violated before any network call.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The chunk size must be non-zero.
    #[error("chunk size must be non-zero")]
    InvalidChunkSize,

    /// Reading the source file failed.
    #[error("failed to read source file: {0}")]
    Io(#[from] std::io::Error),

    /// The signing endpoint failed; the phase that requested the signature
    /// is abandoned.
    #[error("signing callback failed: {0}")]
    Signing(#[source] anyhow::Error),

    /// The signing endpoint answered with an empty signature.
    #[error("signing callback returned an empty signature")]
    EmptySignature,

    /// The response XML could not be decoded at all.
    #[error(transparent)]
    Xml(#[from] XmlError),

    /// The backend violated the protocol contract.
    #[error(transparent)]
    Backend(#[from] BackendContractError),

    /// The HTTP transport failed; propagated from the underlying client.
    #[error("storage transport error: {0}")]
    Transport(#[source] anyhow::Error),
}
