//! Project index for cross-scene resolution.
//!
//! Scenes are grouped into projects by their containing directory. The key
//! is derived from the document URI as a plain string computation, so
//! grouping never touches the filesystem.
//!
//! # Architecture
//!
//! - [`ProjectIndex`]: shared, project-partitioned map of [`IndexEntry`] values
//! - [`ProjectSnapshot`]: an immutable copy of one project's entries, taken
//!   per request and optionally overlaid with the queried document
//! - [`SymbolRef`]: what an occurrence refers to, resolved against a snapshot

mod index;
mod resolve;
mod snapshot;

pub use index::{IndexEntry, ProjectIndex, SymbolTable};
pub use resolve::{Declaration, SymbolRef};
pub use snapshot::ProjectSnapshot;

/// Extension of ChoiceScript scene files.
pub const SCENE_EXTENSION: &str = ".txt";

/// The project a document belongs to: its URI up to and including the last `/`.
pub fn resolve_project_path(uri: &str) -> &str {
    uri.rfind('/').map_or("", |i| &uri[..=i])
}

/// The scene name of a document: its last path segment without `.txt`.
pub fn scene_name(uri: &str) -> &str {
    let file = uri.rfind('/').map_or(uri, |i| &uri[i + 1..]);
    file.strip_suffix(SCENE_EXTENSION).unwrap_or(file)
}
