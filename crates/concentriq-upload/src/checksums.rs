//! Content-MD5 and composite-ETag helpers.
//!
//! Part uploads skip payload hashing in the canonical request (the payload
//! line is `UNSIGNED-PAYLOAD`) and carry a `content-md5` header instead. The
//! image store's final ETag follows the S3 composite convention: the MD5 of
//! the concatenated binary part digests, suffixed with `-{part_count}`. That
//! convention is observed, not contractual, so the composite helper is used
//! for advisory verification only.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use digest::Digest;

/// Compute the base64-encoded MD5 digest of a chunk, as used for the
/// `content-md5` request header.
///
/// # Examples
///
/// ```
/// use concentriq_upload::checksums::content_md5;
///
/// assert_eq!(content_md5(b""), "1B2M2Y8AsgTpgAmY7PhCfg==");
/// ```
#[must_use]
pub fn content_md5(data: &[u8]) -> String {
    let digest = md5::Md5::digest(data);
    BASE64_STANDARD.encode(digest)
}

/// Compute the expected composite ETag for a sequence of part ETags.
///
/// Each part ETag is expected to be the (optionally quoted) hex MD5 of its
/// chunk; the composite is `"{md5(concat(digests))}-{count}"`. Returns `None`
/// when any part ETag does not decode as an MD5 digest, in which case no
/// verification is possible.
///
/// # Examples
///
/// ```
/// use concentriq_upload::checksums::multipart_etag;
///
/// let parts = ["\"5d41402abc4b2a76b9719d911017c592\""];
/// let etag = multipart_etag(&parts).unwrap();
/// assert!(etag.ends_with("-1\""));
/// ```
#[must_use]
pub fn multipart_etag<S: AsRef<str>>(part_etags: &[S]) -> Option<String> {
    let mut combined = Vec::with_capacity(part_etags.len() * 16);
    for etag in part_etags {
        let unquoted = etag.as_ref().trim_matches('"');
        let digest = hex::decode(unquoted).ok()?;
        if digest.len() != 16 {
            return None;
        }
        combined.extend_from_slice(&digest);
    }

    let composite = hex::encode(md5::Md5::digest(&combined));
    Some(format!("\"{composite}-{}\"", part_etags.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_compute_content_md5_of_nonempty_chunk() {
        // MD5("hello") = 5d41402abc4b2a76b9719d911017c592
        assert_eq!(content_md5(b"hello"), "XUFAKrxLKna5cZ2REBfFkg==");
    }

    #[test]
    fn test_should_compute_composite_etag_for_two_parts() {
        let part_one = hex::encode(md5::Md5::digest(b"part-one"));
        let part_two = hex::encode(md5::Md5::digest(b"part-two"));
        let composite = multipart_etag(&[&part_one, &part_two]).unwrap();

        let mut combined = Vec::new();
        combined.extend_from_slice(&md5::Md5::digest(b"part-one"));
        combined.extend_from_slice(&md5::Md5::digest(b"part-two"));
        let expected = format!("\"{}-2\"", hex::encode(md5::Md5::digest(&combined)));
        assert_eq!(composite, expected);
    }

    #[test]
    fn test_should_strip_quotes_from_part_etags() {
        let quoted = format!("\"{}\"", hex::encode(md5::Md5::digest(b"x")));
        let bare = hex::encode(md5::Md5::digest(b"x"));
        assert_eq!(multipart_etag(&[quoted]), multipart_etag(&[bare]));
    }

    #[test]
    fn test_should_refuse_non_md5_part_etags() {
        assert_eq!(multipart_etag(&["not-hex"]), None);
        // Hex, but not 16 bytes.
        assert_eq!(multipart_etag(&["abcd"]), None);
    }
}
