//! Immutable view of one project for request handling.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use choicescript_validate::{ProjectScope, STARTUP_SCENE};
use lsp_types::Uri;

use super::IndexEntry;

/// The entries of one project at the moment a request started.
#[derive(Debug, Clone, Default)]
pub struct ProjectSnapshot {
    project_path: String,
    entries: BTreeMap<String, Arc<IndexEntry>>,
}

impl ProjectSnapshot {
    /// Create a snapshot from a project's entries.
    pub fn new(
        project_path: impl Into<String>,
        entries: BTreeMap<String, Arc<IndexEntry>>,
    ) -> Self {
        Self {
            project_path: project_path.into(),
            entries,
        }
    }

    /// Overlay a freshly parsed document, replacing its indexed entry.
    ///
    /// Queries on the document being edited see its current text even while
    /// the debounced index refresh is pending.
    pub fn with_document(mut self, entry: IndexEntry) -> Self {
        if entry.project_path() != self.project_path {
            tracing::debug!(
                uri = entry.uri.as_str(),
                project = %self.project_path,
                "overlaying a document from another project"
            );
        }
        self.entries
            .insert(entry.uri.as_str().to_string(), Arc::new(entry));
        self
    }

    /// The project path this snapshot covers.
    pub fn project_path(&self) -> &str {
        &self.project_path
    }

    /// The entry of a document.
    pub fn document(&self, uri: &Uri) -> Option<&IndexEntry> {
        self.entries.get(uri.as_str()).map(AsRef::as_ref)
    }

    /// Every entry, ordered by URI.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values().map(AsRef::as_ref)
    }

    /// The entry of a scene by name.
    pub fn scene(&self, name: &str) -> Option<&IndexEntry> {
        self.entries().find(|entry| entry.scene_name == name)
    }

    /// The startup scene, if indexed.
    pub fn startup(&self) -> Option<&IndexEntry> {
        self.scene(STARTUP_SCENE)
    }

    /// Names of every scene that exists: indexed ones and `*scene_list` rows.
    pub fn scene_names(&self) -> BTreeSet<&str> {
        let mut names: BTreeSet<&str> = self.entries().map(|e| e.scene_name.as_str()).collect();
        if let Some(startup) = self.startup() {
            names.extend(startup.exports.scene_list.iter().map(String::as_str));
        }
        names
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ProjectScope for ProjectSnapshot {
    fn knows_globals(&self) -> bool {
        self.startup().is_some()
    }

    fn has_global(&self, key: &str) -> bool {
        self.startup()
            .is_some_and(|startup| startup.exports.globals.contains_key(key))
    }

    fn has_achievement(&self, key: &str) -> bool {
        self.startup()
            .is_some_and(|startup| startup.exports.achievements.contains_key(key))
    }

    fn has_scene(&self, name: &str) -> bool {
        self.scene_names().contains(name)
    }

    fn scene_has_label(&self, scene: &str, key: &str) -> Option<bool> {
        self.scene(scene)
            .map(|entry| entry.exports.labels.contains_key(key))
    }
}
