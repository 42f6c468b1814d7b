//! Signing error types.

/// Errors raised while constructing a signed request.
///
/// Every variant marks a caller-side precondition violation: all of these
/// surface before any network traffic happens.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The HTTP method is not part of the signing protocol.
    #[error("unsupported HTTP method for signing: {0}")]
    UnsupportedMethod(String),

    /// Query parameters were not supplied in sorted-by-key order.
    ///
    /// The engine deliberately refuses to re-sort: silently fixing the order
    /// would mask a caller bug that still breaks the remote signature
    /// comparison, since the signing endpoint reconstructs the canonical
    /// query string from the request it receives.
    #[error("query parameters must be pre-sorted by key; found {later:?} before {earlier:?}")]
    UnsortedQuery {
        /// The key that appeared first.
        later: String,
        /// The smaller key that followed it.
        earlier: String,
    },

    /// The pre-signed URL used for access-key discovery could not be parsed.
    #[error("invalid pre-signed URL: {0}")]
    InvalidSignedUrl(#[from] url::ParseError),

    /// The pre-signed URL carries no usable `X-Amz-Credential` parameter.
    #[error("pre-signed URL has no X-Amz-Credential query parameter")]
    MissingCredential,
}
