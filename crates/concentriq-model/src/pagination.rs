//! Pagination request and response types.
//!
//! Listing endpoints accept a `pagination` query parameter carrying a JSON
//! document; paginated responses echo progress in the envelope's
//! `meta.pagination` member.

use serde::{Deserialize, Serialize};

/// Sort keys accepted by listing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortBy {
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "created")]
    Created,
    #[serde(rename = "lastModified")]
    LastModified,
    #[serde(rename = "size")]
    Size,
}

/// One page request. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub rows_per_page: u32,
    pub page: u32,
    pub sort_by: SortBy,
    pub descending: bool,
}

impl Pagination {
    /// Build a page request.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPage`] when `page` is zero; the API indexes pages
    /// from 1.
    pub fn new(
        rows_per_page: u32,
        page: u32,
        sort_by: SortBy,
        descending: bool,
    ) -> Result<Self, InvalidPage> {
        if page == 0 {
            return Err(InvalidPage);
        }
        Ok(Self {
            rows_per_page,
            page,
            sort_by,
            descending,
        })
    }
}

/// Error returned for a zero page number.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("page numbers start at 1")]
pub struct InvalidPage;

/// Pagination progress reported in a paginated response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Rows contained in this page; `0` marks the end of iteration.
    pub rows_returned: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_serialize_pagination_with_camel_case_keys() {
        let pagination = Pagination::new(50, 2, SortBy::LastModified, true).unwrap();
        let value = serde_json::to_value(&pagination).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "rowsPerPage": 50,
                "page": 2,
                "sortBy": "lastModified",
                "descending": true,
            })
        );
    }

    #[test]
    fn test_should_reject_zero_page() {
        assert!(Pagination::new(50, 0, SortBy::Created, false).is_err());
    }

    #[test]
    fn test_should_deserialize_page_info_without_optional_members() {
        let info: PageInfo =
            serde_json::from_value(serde_json::json!({ "rowsReturned": 0 })).unwrap();
        assert_eq!(info.rows_returned, 0);
        assert_eq!(info.total_rows, None);
    }
}
