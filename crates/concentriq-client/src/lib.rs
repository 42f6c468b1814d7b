//! REST API client for the Concentriq digital-pathology platform.
//!
//! The platform exposes a JSON API behind basic auth, wrapping every response
//! in an `{ error, data, meta }` envelope. This crate maps that API onto the
//! typed models from `concentriq-model` and stitches in the multipart upload
//! flow from `concentriq-upload` for pushing whole-slide images.
//!
//! ```no_run
//! use concentriq_client::{Client, ClientConfig};
//!
//! # async fn demo() -> Result<(), concentriq_client::ClientError> {
//! let config = ClientConfig::from_secrets_file(None)?;
//! let client = Client::new(config)?;
//! for imageset in client.imageset_list().await? {
//!     println!("{} {}", imageset.id, imageset.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`client`] - The request proxy: envelope handling, pagination, verbs
//! - [`config`] - Secrets-file and environment configuration
//! - [`error`] - Client error types
//! - [`geojson`] - Conversions between platform annotations and GeoJSON
//! - [`ops`] - Per-resource API operations
//! - [`upload`] - The image upload flow

pub mod client;
pub mod config;
mod envelope;
pub mod error;
pub mod geojson;
pub mod ops;
pub mod upload;

pub use client::{Client, PageCursor};
pub use config::ClientConfig;
pub use error::ClientError;
