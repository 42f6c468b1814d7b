//! Typed data models for the Concentriq digital-pathology platform API.
//!
//! The platform speaks JSON with camelCase member names; every struct in this
//! crate mirrors one API resource and round-trips through serde. A handful of
//! numeric fields arrive as JSON strings (a quirk of the upstream API), which
//! the [`types`] module absorbs with lenient deserializers.
//!
//! # Modules
//!
//! - [`types`] - Resource records (groups, image sets, folders, images, annotations)
//! - [`filters`] - Listing-endpoint filter objects
//! - [`pagination`] - Pagination request/response types

pub mod filters;
pub mod pagination;
pub mod types;

pub use filters::{AnnotationFilters, CreatedRange, FolderFilters, ImageFilters};
pub use pagination::{PageInfo, Pagination, SortBy};
pub use types::{
    Annotation, ApiErrorBody, Folder, Group, Image, ImageSet, ImageStatus, Organization,
    SharePermissions,
};
