//! Filter objects for listing endpoints.
//!
//! Filters travel as a JSON document in the `filters` query parameter. Only
//! set members are serialized, matching how the web client builds these
//! documents.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation-date range filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

/// Filters accepted by the `images` listing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_set_id: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Vec<String>>,
    /// Search phrases matched across names and case properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_search: Option<Vec<String>>,
    /// Metadata-field filters keyed by field id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<i64, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_overlays: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_multiple_z_layers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_annotations: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_analysis_results: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<CreatedRange>,
}

/// Filters accepted by the `folders` listing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_set_id: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_metadata: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_attachments: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_search: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<i64, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageFilters>,
}

/// Filters accepted by the `annotations` listing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_id: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<Vec<i64>>,
    /// Label text; stands in for annotation classes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<i64, serde_json::Value>>,
}
