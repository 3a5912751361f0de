//! Output format definitions for PathBuilder
//!
//! - ResourceId: canonical ARM id, used as a stable identity key
//! - HttpPath: request path including the `api-version` query

/// Output format for path construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathFormat {
    /// Resource id: "/subscriptions/{sub}/resourceGroups/{rg}"
    ResourceId,

    /// Request path: "/subscriptions/{sub}/resourceGroups/{rg}?api-version=2022-09-01"
    HttpPath,
}
