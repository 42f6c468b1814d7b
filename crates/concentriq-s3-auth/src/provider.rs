//! The remote-signature capability.
//!
//! The client never holds an AWS secret key; the platform signs on its
//! behalf. [`SignatureProvider`] is the seam where that happens: the upload
//! orchestrator builds a [`SigningRequest`] per phase and hands it to
//! whatever provider the caller injected. The production provider calls
//! `auth/sign/s3-multipart-url/...`; tests inject a canned one.

use async_trait::async_trait;
use serde::Serialize;

/// The parameters handed to the platform's signing endpoint.
///
/// Serializes with the endpoint's camelCase query-parameter names.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningRequest {
    /// The string to sign, quote-plus encoded.
    pub payload: String,
    /// The request timestamp in `x-amz-date` form, doubling as a nonce.
    pub nonce: String,
    /// The raw canonical request text.
    pub canonical_request: String,
}

impl SigningRequest {
    /// Package a string to sign for the remote signer.
    ///
    /// The signing endpoint expects the payload pre-encoded (quote-plus:
    /// space becomes `+`, reserved characters are percent-escaped); the
    /// canonical request travels raw.
    #[must_use]
    pub fn new(string_to_sign: &str, amz_date: &str, canonical_request: &str) -> Self {
        let payload: String = form_urlencoded::byte_serialize(string_to_sign.as_bytes()).collect();
        Self {
            payload,
            nonce: amz_date.to_owned(),
            canonical_request: canonical_request.to_owned(),
        }
    }
}

/// Capability that produces a SigV4 signature for a prepared signing request.
///
/// Implementations must return a non-empty signature or an error; the caller
/// treats an error as fatal for the phase that requested it, with no retry.
#[async_trait]
pub trait SignatureProvider: Send + Sync {
    /// Obtain the signature for the given request.
    ///
    /// # Errors
    ///
    /// Any error aborts the upload phase that requested the signature.
    async fn sign(&self, request: &SigningRequest) -> anyhow::Result<String>;
}

/// A provider returning a fixed signature.
///
/// Suitable for tests and offline experiments; production code signs through
/// the platform API.
#[derive(Debug, Clone)]
pub struct StaticSignatureProvider {
    signature: String,
}

impl StaticSignatureProvider {
    /// Create a provider that always answers with `signature`.
    #[must_use]
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
        }
    }
}

#[async_trait]
impl SignatureProvider for StaticSignatureProvider {
    async fn sign(&self, _request: &SigningRequest) -> anyhow::Result<String> {
        Ok(self.signature.clone())
    }
}
