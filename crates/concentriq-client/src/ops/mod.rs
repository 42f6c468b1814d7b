//! Per-resource API operations, grouped the way the platform groups its
//! endpoints.

pub mod annotations;
pub mod folders;
pub mod groups;
pub mod images;
pub mod imagesets;
pub mod organizations;
