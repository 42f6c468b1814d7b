//! The S3 XML wire codec.
//!
//! The image store answers the initiate and complete phases with namespaced
//! XML documents. Namespace prefixes are stripped before matching element
//! names, the root element is matched by suffix, and the member set of each
//! document is validated exactly: a well-formed document with extra or
//! missing members is a backend contract violation, not a parse error.

use std::collections::BTreeMap;

use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{BackendContractError, UploadError, XmlError};
use crate::uploader::PartResult;

/// Members of an `InitiateMultipartUploadResult` document, in sorted order.
const INITIATE_MEMBERS: &[&str] = &["Bucket", "Key", "UploadId"];

/// Members of a `CompleteMultipartUploadResult` document, in sorted order.
const COMPLETE_MEMBERS: &[&str] = &["Bucket", "ETag", "Key", "Location"];

/// Parsed initiate-phase response.
#[derive(Debug, Clone)]
pub struct InitiateMultipartUploadResult {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
}

/// Parsed complete-phase response.
#[derive(Debug, Clone)]
pub struct CompleteMultipartUploadResult {
    pub location: String,
    pub bucket: String,
    pub key: String,
    pub etag: String,
}

/// Serialize the completion manifest body.
///
/// Produces `<CompleteMultipartUpload>` with one `<Part>` child per entry,
/// in the order given; the caller is responsible for ascending part numbers.
///
/// # Errors
///
/// Returns [`XmlError`] if writing fails.
pub fn completed_upload_body(parts: &[PartResult]) -> Result<Vec<u8>, XmlError> {
    let mut buf = Vec::with_capacity(128 + parts.len() * 96);
    let mut writer = Writer::new(&mut buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer
        .create_element("CompleteMultipartUpload")
        .write_inner_content(|w| {
            for part in parts {
                let number = part.part_number.to_string();
                w.create_element("Part").write_inner_content(|w2| {
                    w2.create_element("PartNumber")
                        .write_text_content(BytesText::new(&number))?;
                    w2.create_element("ETag")
                        .write_text_content(BytesText::new(&part.etag))?;
                    Ok(())
                })?;
            }
            Ok(())
        })?;

    Ok(buf)
}

/// Parse and validate an initiate-phase response document.
///
/// # Errors
///
/// Returns [`UploadError::Xml`] for undecodable content and
/// [`UploadError::Backend`] for a wrong root element or member set.
pub fn parse_initiate_result(xml: &[u8]) -> Result<InitiateMultipartUploadResult, UploadError> {
    let members = parse_result_document(xml, "InitiateMultipartUploadResult", INITIATE_MEMBERS)?;
    Ok(InitiateMultipartUploadResult {
        bucket: members["Bucket"].clone(),
        key: members["Key"].clone(),
        upload_id: members["UploadId"].clone(),
    })
}

/// Parse and validate a complete-phase response document.
///
/// # Errors
///
/// Returns [`UploadError::Xml`] for undecodable content and
/// [`UploadError::Backend`] for a wrong root element or member set.
pub fn parse_complete_result(xml: &[u8]) -> Result<CompleteMultipartUploadResult, UploadError> {
    let members = parse_result_document(xml, "CompleteMultipartUploadResult", COMPLETE_MEMBERS)?;
    Ok(CompleteMultipartUploadResult {
        location: members["Location"].clone(),
        bucket: members["Bucket"].clone(),
        key: members["Key"].clone(),
        etag: members["ETag"].clone(),
    })
}

/// Parse a flat result document into its namespace-stripped members and
/// validate the member set exactly.
fn parse_result_document(
    xml: &[u8],
    expected_root_suffix: &str,
    expected_members: &'static [&'static str],
) -> Result<BTreeMap<String, String>, UploadError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    // Skip the declaration and locate the root element.
    let root = loop {
        match reader.read_event().map_err(XmlError::from)? {
            Event::Start(e) => break e.local_name().as_ref().to_vec(),
            Event::Eof => {
                return Err(XmlError::Parse("document has no root element".to_owned()).into());
            }
            _ => {}
        }
    };

    let root_name = std::str::from_utf8(&root)
        .map_err(|e| XmlError::Parse(e.to_string()))?
        .to_owned();
    if !root_name.ends_with(expected_root_suffix) {
        return Err(BackendContractError::UnexpectedRoot(root_name).into());
    }

    // Collect the root's direct children as a name -> text mapping.
    let mut members = BTreeMap::new();
    loop {
        match reader.read_event().map_err(XmlError::from)? {
            Event::Start(e) => {
                let name = e.local_name();
                let member = std::str::from_utf8(name.as_ref())
                    .map_err(|err| XmlError::Parse(err.to_string()))?
                    .to_owned();
                let text = read_text_content(&mut reader)?;
                members.insert(member, text);
            }
            Event::Empty(e) => {
                let name = e.local_name();
                let member = std::str::from_utf8(name.as_ref())
                    .map_err(|err| XmlError::Parse(err.to_string()))?
                    .to_owned();
                members.insert(member, String::new());
            }
            Event::End(_) => break,
            Event::Eof => {
                return Err(
                    XmlError::Parse("unexpected EOF inside result document".to_owned()).into(),
                );
            }
            _ => {}
        }
    }

    if !members
        .keys()
        .map(String::as_str)
        .eq(expected_members.iter().copied())
    {
        return Err(BackendContractError::UnexpectedShape {
            expected: expected_members,
            actual: members.keys().cloned().collect(),
        }
        .into());
    }

    Ok(members)
}

/// Read the text content of the current element and consume its end tag.
fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String, XmlError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let decoded = e.decode().map_err(|err| XmlError::Parse(err.to_string()))?;
                let unescaped = quick_xml::escape::unescape(&decoded)
                    .map_err(|err| XmlError::Parse(err.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::End(_) => return Ok(text),
            Event::Eof => {
                return Err(XmlError::Parse(
                    "unexpected EOF while reading text content".to_owned(),
                ));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(number: u32, etag: &str) -> PartResult {
        PartResult {
            part_number: number,
            etag: etag.to_owned(),
        }
    }

    #[test]
    fn test_should_write_manifest_parts_in_given_order() {
        let body = completed_upload_body(&[part(1, "e1"), part(2, "e2")]).unwrap();
        let text = std::str::from_utf8(&body).unwrap();

        let first = "<Part><PartNumber>1</PartNumber><ETag>e1</ETag></Part>";
        let second = "<Part><PartNumber>2</PartNumber><ETag>e2</ETag></Part>";
        assert!(text.contains(first));
        assert!(text.contains(second));
        assert!(text.find(first).unwrap() < text.find(second).unwrap());
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(text.ends_with("</CompleteMultipartUpload>"));
    }

    #[test]
    fn test_should_write_part_numbers_without_leading_zeros() {
        let body = completed_upload_body(&[part(10, "\"aa\"")]).unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains("<PartNumber>10</PartNumber>"));
    }

    #[test]
    fn test_should_parse_namespaced_initiate_result() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<InitiateMultipartUploadResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Bucket>concentriq-image-store</Bucket>
  <Key>abc</Key>
  <UploadId>U1</UploadId>
</InitiateMultipartUploadResult>"#;

        let result = parse_initiate_result(xml).unwrap();
        assert_eq!(result.bucket, "concentriq-image-store");
        assert_eq!(result.key, "abc");
        assert_eq!(result.upload_id, "U1");
    }

    #[test]
    fn test_should_strip_namespace_prefixes_from_element_names() {
        let xml = br#"<s3:InitiateMultipartUploadResult xmlns:s3="http://s3.amazonaws.com/doc/2006-03-01/">
  <s3:Bucket>concentriq-image-store</s3:Bucket>
  <s3:Key>abc</s3:Key>
  <s3:UploadId>U1</s3:UploadId>
</s3:InitiateMultipartUploadResult>"#;

        let result = parse_initiate_result(xml).unwrap();
        assert_eq!(result.upload_id, "U1");
    }

    #[test]
    fn test_should_reject_unexpected_root_element() {
        let xml = b"<WrongResult><Bucket>b</Bucket><Key>k</Key><UploadId>u</UploadId></WrongResult>";
        let result = parse_initiate_result(xml);
        assert!(matches!(
            result,
            Err(UploadError::Backend(BackendContractError::UnexpectedRoot(_)))
        ));
    }

    #[test]
    fn test_should_reject_unexpected_member_set() {
        let xml = b"<InitiateMultipartUploadResult>\
                    <Bucket>b</Bucket><Key>k</Key>\
                    </InitiateMultipartUploadResult>";
        let result = parse_initiate_result(xml);
        assert!(matches!(
            result,
            Err(UploadError::Backend(
                BackendContractError::UnexpectedShape { .. }
            ))
        ));

        let xml = b"<InitiateMultipartUploadResult>\
                    <Bucket>b</Bucket><Key>k</Key><UploadId>u</UploadId><Extra>x</Extra>\
                    </InitiateMultipartUploadResult>";
        let result = parse_initiate_result(xml);
        assert!(matches!(
            result,
            Err(UploadError::Backend(
                BackendContractError::UnexpectedShape { .. }
            ))
        ));
    }

    #[test]
    fn test_should_parse_complete_result_with_quoted_etag() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<CompleteMultipartUploadResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Location>https://s3-eu-central-1.amazonaws.com/concentriq-image-store/abc</Location>
  <Bucket>concentriq-image-store</Bucket>
  <Key>abc</Key>
  <ETag>&quot;0d6a&quot;</ETag>
</CompleteMultipartUploadResult>"#;

        let result = parse_complete_result(xml).unwrap();
        assert_eq!(result.etag, "\"0d6a\"");
        assert!(result.location.ends_with("/abc"));
    }

    #[test]
    fn test_should_reject_garbage_content_as_xml_error() {
        let result = parse_initiate_result(b"\x00\x01 definitely not xml");
        assert!(matches!(result, Err(UploadError::Xml(_))));
    }
}
