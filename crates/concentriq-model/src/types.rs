//! Resource records of the Concentriq platform API.
//!
//! Field names follow the API's camelCase convention via serde renames. The
//! upstream API is not perfectly consistent: a few numeric counters are
//! delivered as JSON strings (`"totalSize": "0"`), and a few endpoints attach
//! members not documented anywhere. Structs therefore tolerate unknown members
//! and use lenient integer parsing where the API is known to waffle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Per-resource share permissions attached to groups, image sets, folders and
/// images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePermissions {
    pub can_create_annotations: bool,
    pub can_manage_annotations: bool,
    pub can_manage_image_set_share_permissions: bool,
    pub can_manage_images: bool,
    pub can_manage_metadata_fields: bool,
    pub can_manage_metadata_values: bool,
    pub can_modify_image_set: bool,
    pub can_update_navigation: bool,
    pub can_export_data: bool,
}

/// A user group (the API calls these `imageSetGroups`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: i64,
    pub name: String,
    /// Number of image sets in the group; the API encodes this as a string.
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub image_set_count: Option<i64>,
    pub owner_name: String,
    pub owner_id: i64,
    pub is_favorite: bool,
    pub description: Option<String>,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub share_permissions: SharePermissions,
}

/// An organization (only visible to admin accounts).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub billing_email: String,
}

/// An image set (the web UI calls these repositories).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSet {
    pub id: i64,
    #[serde(rename = "thumbnailURL")]
    pub thumbnail_url: String,
    pub shared_with_public: bool,
    pub is_favorite: bool,
    pub name: String,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub image_count: i64,
    /// Total byte size; the API encodes this as a string (`"totalSize": "0"`).
    #[serde(deserialize_with = "lenient_i64")]
    pub total_size: i64,
    pub owner_name: String,
    pub owner_id: i64,
    pub description: String,
    pub group_id: Option<i64>,
    pub group_name: Option<String>,
    pub share_permissions: SharePermissions,
}

/// A folder inside an image set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: i64,
    pub label: String,
    pub image_set_id: i64,
    /// `None` marks a root-level folder.
    pub folder_parent_id: Option<i64>,
    pub image_set_name: String,
    pub has_metadata: bool,
    pub has_attachments: bool,
    pub rank: i64,
    pub owner_id: i64,
    pub share_permissions: SharePermissions,
}

/// Processing state of an uploaded image.
///
/// The API encodes the state as an integer. Setting an image to
/// [`ImageStatus::Optimizing`] triggers (re)optimization server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ImageStatus {
    /// Ingestion failed.
    Error,
    /// Parts are still being uploaded.
    Uploading,
    /// Upload finished, server-side optimization in progress.
    Optimizing,
    /// Ready for viewing.
    Success,
}

impl ImageStatus {
    /// The integer code used on the wire.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Error => -1,
            Self::Uploading => 0,
            Self::Optimizing => 1,
            Self::Success => 2,
        }
    }
}

impl From<ImageStatus> for i64 {
    fn from(status: ImageStatus) -> Self {
        status.code()
    }
}

impl TryFrom<i64> for ImageStatus {
    type Error = UnknownImageStatus;

    fn try_from(code: i64) -> Result<Self, UnknownImageStatus> {
        match code {
            -1 => Ok(Self::Error),
            0 => Ok(Self::Uploading),
            1 => Ok(Self::Optimizing),
            2 => Ok(Self::Success),
            other => Err(UnknownImageStatus(other)),
        }
    }
}

/// Error returned when the API reports an image status code outside the
/// documented range.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown image status code: {0}")]
pub struct UnknownImageStatus(pub i64);

/// Extra image payload attached by the detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub image_sources: serde_json::Value,
    pub fluorescence_channels: Option<serde_json::Value>,
    pub metadata_url: String,
}

/// A whole-slide image record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: i64,
    pub name: String,
    pub image_set_id: i64,
    pub image_set_name: String,
    pub folder_parent_id: Option<i64>,
    pub owner_id: i64,
    pub rank: i64,
    pub has_macro: bool,
    pub has_label: bool,
    pub has_overlays: bool,
    pub has_multiple_z_layers: bool,
    pub has_annotations: bool,
    pub has_analysis_results: bool,
    /// Microns per pixel along x; unset until optimization finishes.
    pub mppx: Option<f64>,
    /// Microns per pixel along y; unset until optimization finishes.
    pub mppy: Option<f64>,
    pub img_width: i64,
    pub img_height: i64,
    #[serde(default)]
    pub file_size: Option<i64>,
    pub objective_power: Option<f64>,
    pub slide_name: String,
    /// Human-readable size string; distinct from `file_size`.
    pub filesize: String,
    pub status: ImageStatus,
    pub created: DateTime<Utc>,
    pub storage_key: String,
    pub associated_key: String,
    /// Thumbnail descriptor carrying the pre-signed `signedURL`; the shape is
    /// not documented, so it stays a raw JSON value.
    #[serde(rename = "thumbURL")]
    pub thumb_url: serde_json::Value,
    #[serde(default)]
    pub image_data: Option<ImageData>,
    pub share_permissions: SharePermissions,
    /// Storage-system entry selected for this image; carries the
    /// `imageStorageKey` used by the upload flow.
    #[serde(default)]
    pub selected_storage_system_entry: Option<serde_json::Value>,
}

/// A point, polygon or rectangle annotation attached to an image.
///
/// Coordinates are expressed in the platform's viewport space (0..10000 along
/// the image width). Fields populated by the server on creation stay optional
/// so the same struct can be posted back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Free-text label; the platform has no class concept, so this carries it.
    pub text: String,
    pub shape: String,
    pub shape_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_bounds: Option<String>,
    pub image_id: i64,
    /// `#rrggbb` hex color.
    pub color: String,
    pub is_negative: bool,
    pub is_segmenting: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_order_x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_order_y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_permissions: Option<SharePermissions>,
}

/// The error member of the API's response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub status: i64,
    pub name: String,
    pub code: i64,
    pub message: String,
}

/// Accept an integer either as a JSON number or as a numeric string.
fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Accept an optional integer either as a JSON number or as a numeric string.
fn lenient_opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => {
            s.parse().map(Some).map_err(serde::de::Error::custom)
        }
    }
}
