//! AWS Signature Version 4 request construction for the Concentriq upload flow.
//!
//! Concentriq fronts an S3-compatible image store but never hands out AWS
//! secret keys: clients build the SigV4 canonical request and string-to-sign
//! locally, then ask the platform's signing endpoint to produce the signature.
//! This crate implements the client half of that split:
//!
//! 1. Build the canonical request from the HTTP method, host, URI, query
//!    parameters, headers, and payload hash.
//! 2. Build the string to sign from the timestamp, credential scope, and
//!    canonical request hash.
//! 3. Package the string to sign as a [`SigningRequest`] for a
//!    [`SignatureProvider`], the capability that talks to the remote signer.
//! 4. Assemble the final `Authorization` header from the returned signature.
//!
//! Everything here is pure and deterministic given a timestamp: the exact
//! text built locally must match what the signing endpoint independently
//! reconstructs, so no step may depend on ambient state.
//!
//! # Modules
//!
//! - [`canonical`] - Canonical request construction per the SigV4 specification
//! - [`credentials`] - Access-key discovery from pre-signed platform URLs
//! - [`error`] - Signing error types
//! - [`provider`] - The remote-signature capability and its request payload
//! - [`sigv4`] - String-to-sign and authorization-header assembly

pub mod canonical;
pub mod credentials;
pub mod error;
pub mod provider;
pub mod sigv4;

pub use canonical::{CanonicalRequest, Method, build_canonical_request};
pub use credentials::access_key_from_signed_url;
pub use error::AuthError;
pub use provider::{SignatureProvider, SigningRequest, StaticSignatureProvider};
pub use sigv4::{
    UNSIGNED_PAYLOAD, authorization_header, build_string_to_sign, credential_scope,
    format_amz_date, hash_payload,
};
