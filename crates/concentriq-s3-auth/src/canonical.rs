//! Canonical request construction for AWS Signature Version 4.
//!
//! This module implements the canonical request format as specified by AWS:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! The canonical text is sent verbatim to the platform's remote signer, which
//! rebuilds it independently; any normalization applied here must therefore be
//! deterministic and match the signer's reconstruction exactly. Query
//! parameters are required to arrive pre-sorted for the same reason: the
//! engine validates the order instead of fixing it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::AuthError;
use crate::sigv4::{UNSIGNED_PAYLOAD, format_amz_date};

/// HTTP methods admitted into the signing protocol.
///
/// The three upload phases use POST and PUT (plus GET for the signing
/// endpoint's own traffic); DELETE exists solely for aborting an orphaned
/// multipart upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP DELETE.
    Delete,
}

impl Method {
    /// The canonical upper-case method name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            other => Err(AuthError::UnsupportedMethod(other.to_owned())),
        }
    }
}

/// A constructed canonical request, ready for hashing and signing.
#[derive(Debug, Clone)]
pub struct CanonicalRequest {
    /// The full canonical request text (the exact bytes to be hashed).
    pub text: String,
    /// The payload hash line: hex SHA-256 of the body, or `UNSIGNED-PAYLOAD`.
    pub payload_hash: String,
    /// The semicolon-joined, alphabetically sorted signed-header list.
    pub signed_headers: String,
}

/// Build the canonical request for one HTTP operation.
///
/// `host` is trimmed and lowercased; `x-amz-date` is derived from `timestamp`.
/// `extra_headers` are merged into the mandatory pair before sorting, with
/// their names lowercased. When `hash_payload` is false the payload line is
/// the literal `UNSIGNED-PAYLOAD` sentinel regardless of `body`.
///
/// # Errors
///
/// Returns [`AuthError::UnsortedQuery`] when `query` is not sorted by key.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use concentriq_s3_auth::canonical::{Method, build_canonical_request};
///
/// let timestamp = Utc.with_ymd_and_hms(2013, 5, 24, 0, 0, 0).unwrap();
/// let request = build_canonical_request(
///     Method::Get,
///     "examplebucket.s3.amazonaws.com",
///     &timestamp,
///     "/test.txt",
///     &[],
///     None,
///     true,
///     &[],
/// )
/// .unwrap();
/// assert!(request.text.starts_with("GET\n/test.txt\n"));
/// assert_eq!(request.signed_headers, "host;x-amz-date");
/// ```
#[allow(clippy::too_many_arguments)]
pub fn build_canonical_request(
    method: Method,
    host: &str,
    timestamp: &DateTime<Utc>,
    uri: &str,
    query: &[(String, String)],
    body: Option<&[u8]>,
    hash_payload: bool,
    extra_headers: &[(String, String)],
) -> Result<CanonicalRequest, AuthError> {
    ensure_sorted(query)?;
    let canonical_query = build_canonical_query_string(query);

    let amz_date = format_amz_date(timestamp);

    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    headers.insert("host".to_owned(), host.trim().to_lowercase());
    headers.insert("x-amz-date".to_owned(), amz_date);
    for (name, value) in extra_headers {
        headers.insert(name.to_lowercase(), value.clone());
    }

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");

    let payload_hash = if hash_payload {
        crate::sigv4::hash_payload(body.unwrap_or_default())
    } else {
        UNSIGNED_PAYLOAD.to_owned()
    };

    let text = format!(
        "{method}\n{uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
    );

    Ok(CanonicalRequest {
        text,
        payload_hash,
        signed_headers,
    })
}

/// Build the canonical query string by URL-encoding the pre-sorted pairs.
///
/// Spaces encode as `+` and reserved characters are percent-encoded, matching
/// what the HTTP client later puts on the wire for the same pairs.
#[must_use]
pub fn build_canonical_query_string(query: &[(String, String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in query {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Reject query pairs that are not sorted by key.
fn ensure_sorted(query: &[(String, String)]) -> Result<(), AuthError> {
    for window in query.windows(2) {
        if window[0].0 > window[1].0 {
            return Err(AuthError::UnsortedQuery {
                later: window[0].0.clone(),
                earlier: window[1].0.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn test_timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2013, 5, 24, 0, 0, 0).unwrap()
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_should_build_minimal_canonical_request_with_six_segments() {
        let request = build_canonical_request(
            Method::Get,
            "Example.COM ",
            &test_timestamp(),
            "/",
            &[],
            None,
            true,
            &[],
        )
        .unwrap();

        let expected = "GET\n\
                        /\n\
                        \n\
                        host:example.com\n\
                        x-amz-date:20130524T000000Z\n\
                        \n\
                        host;x-amz-date\n\
                        e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert_eq!(request.text, expected);
        assert_eq!(request.signed_headers, "host;x-amz-date");
        // Six logical segments; the header block contributes one newline per
        // header plus the blank separator line.
        assert_eq!(request.text.matches('\n').count(), 7);
    }

    #[test]
    fn test_should_reject_unsorted_query_parameters() {
        let query = pairs(&[("uploadId", "U1"), ("partNumber", "1")]);
        let result = build_canonical_request(
            Method::Put,
            "host",
            &test_timestamp(),
            "/",
            &query,
            None,
            false,
            &[],
        );
        assert!(matches!(result, Err(AuthError::UnsortedQuery { .. })));
    }

    #[test]
    fn test_should_accept_sorted_query_parameters() {
        let query = pairs(&[("partNumber", "1"), ("uploadId", "U1")]);
        let request = build_canonical_request(
            Method::Put,
            "host",
            &test_timestamp(),
            "/",
            &query,
            None,
            false,
            &[],
        )
        .unwrap();
        assert!(request.text.contains("\npartNumber=1&uploadId=U1\n"));
    }

    #[test]
    fn test_should_url_encode_query_values() {
        let query = pairs(&[("prefix", "a b/c")]);
        assert_eq!(build_canonical_query_string(&query), "prefix=a+b%2Fc");
    }

    #[test]
    fn test_should_use_unsigned_payload_sentinel_when_hashing_disabled() {
        let request = build_canonical_request(
            Method::Put,
            "host",
            &test_timestamp(),
            "/",
            &[],
            Some(b"any body at all"),
            false,
            &[],
        )
        .unwrap();
        assert_eq!(request.payload_hash, UNSIGNED_PAYLOAD);
        assert!(request.text.ends_with("\nUNSIGNED-PAYLOAD"));
    }

    #[test]
    fn test_should_change_only_payload_hash_when_body_changes() {
        let build = |body: &'static [u8]| {
            build_canonical_request(
                Method::Post,
                "host",
                &test_timestamp(),
                "/bucket/key",
                &[],
                Some(body),
                true,
                &[],
            )
            .unwrap()
        };

        let first = build(b"payload-a");
        let second = build(b"payload-b");
        assert_ne!(first.payload_hash, second.payload_hash);

        // All segments except the payload hash line are untouched.
        let prefix = |req: &CanonicalRequest| {
            req.text
                .rsplit_once('\n')
                .map(|(head, _)| head.to_owned())
                .unwrap()
        };
        assert_eq!(prefix(&first), prefix(&second));
    }

    #[test]
    fn test_should_merge_and_sort_extra_headers() {
        let extra = pairs(&[("Content-MD5", "abc="), ("content-type", "application/xml")]);
        let request = build_canonical_request(
            Method::Post,
            "host",
            &test_timestamp(),
            "/",
            &[],
            None,
            true,
            &extra,
        )
        .unwrap();

        assert_eq!(
            request.signed_headers,
            "content-md5;content-type;host;x-amz-date"
        );
        assert!(request.text.contains("content-md5:abc=\ncontent-type:application/xml\n"));
    }

    #[test]
    fn test_should_parse_only_protocol_methods() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("POST".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("PUT".parse::<Method>().unwrap(), Method::Put);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
        assert!(matches!(
            "PATCH".parse::<Method>(),
            Err(AuthError::UnsupportedMethod(_))
        ));
        assert!(matches!(
            "get".parse::<Method>(),
            Err(AuthError::UnsupportedMethod(_))
        ));
    }
}
