//! Client error types.

use concentriq_model::ApiErrorBody;
use concentriq_upload::UploadError;

/// Errors surfaced by the platform client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Invalid or incomplete configuration; raised before any request.
    #[error("configuration error: {0}")]
    Config(String),

    /// The platform answered with its error envelope.
    #[error("{} [{}] {}", .0.name, .0.status, .0.message)]
    Api(ApiErrorBody),

    /// The platform answered with something outside its documented envelope.
    #[error("unexpected API response: {0}")]
    UnexpectedResponse(String),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A URL could not be parsed or joined.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Local file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The multipart upload flow failed.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// A GeoJSON geometry has no platform representation.
    #[error("unsupported geometry: {0}")]
    Geometry(String),
}
