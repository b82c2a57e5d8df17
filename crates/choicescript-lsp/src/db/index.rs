//! Indexed scenes, partitioned by project.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use choicescript_parser::{Occurrence, OccurrenceKind, Scene};
use lsp_types::Uri;
use parking_lot::RwLock;

use super::{resolve_project_path, scene_name, ProjectSnapshot};
use crate::vfs::TextDocument;

/// Declarations a scene makes visible to the rest of its project.
///
/// Keys are lowercase. When a name is declared twice the first declaration wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    /// `*label` declarations.
    pub labels: BTreeMap<String, Occurrence>,
    /// `*create` declarations.
    pub globals: BTreeMap<String, Occurrence>,
    /// `*achievement` declarations.
    pub achievements: BTreeMap<String, Occurrence>,
    /// Rows of `*scene_list`, in order.
    pub scene_list: Vec<String>,
}

impl SymbolTable {
    /// Collect the exported declarations of a scene.
    pub fn from_scene(scene: &Scene) -> Self {
        let mut table = Self::default();
        for occ in &scene.occurrences {
            let map = match occ.kind {
                OccurrenceKind::Label => &mut table.labels,
                OccurrenceKind::GlobalVariable => &mut table.globals,
                OccurrenceKind::Achievement => &mut table.achievements,
                OccurrenceKind::SceneReference if occ.in_scene_list => {
                    table.scene_list.push(occ.name.clone());
                    continue;
                }
                _ => continue,
            };
            map.entry(occ.key()).or_insert_with(|| occ.clone());
        }
        table
    }
}

/// One indexed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Document URI.
    pub uri: Uri,
    /// Scene name derived from the URI.
    pub scene_name: String,
    /// Document version the entry was built from.
    pub version: i32,
    /// The parsed scene.
    pub scene: Arc<Scene>,
    /// Exported declarations.
    pub exports: SymbolTable,
}

impl IndexEntry {
    /// Build an entry from a parsed scene.
    pub fn new(uri: Uri, version: i32, scene: Arc<Scene>) -> Self {
        let exports = SymbolTable::from_scene(&scene);
        Self {
            scene_name: scene_name(uri.as_str()).to_string(),
            uri,
            version,
            scene,
            exports,
        }
    }

    /// Build an entry from a document snapshot, reusing its cached scene.
    pub fn from_document(document: &TextDocument) -> Self {
        Self::new(document.uri().clone(), document.version(), document.scene())
    }

    /// The project this entry belongs to.
    pub fn project_path(&self) -> &str {
        resolve_project_path(self.uri.as_str())
    }
}

type Project = BTreeMap<String, Arc<IndexEntry>>;

/// The live index of every known scene, keyed by project path then URI.
///
/// Each update installs whole entries under a single write lock, so a reader
/// never sees half of an update. Snapshots hold `Arc`s to entries and are not
/// affected by later updates.
#[derive(Debug, Default)]
pub struct ProjectIndex {
    projects: RwLock<HashMap<String, Project>>,
}

impl ProjectIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and (re)install an entry for each document.
    ///
    /// Updating twice with the same content leaves the index unchanged.
    pub fn update<'a>(&self, documents: impl IntoIterator<Item = &'a TextDocument>) {
        let entries: Vec<IndexEntry> = documents
            .into_iter()
            .map(IndexEntry::from_document)
            .collect();
        if entries.is_empty() {
            return;
        }

        let mut projects = self.projects.write();
        for entry in entries {
            tracing::debug!(uri = entry.uri.as_str(), version = entry.version, "indexed scene");
            projects
                .entry(entry.project_path().to_string())
                .or_default()
                .insert(entry.uri.as_str().to_string(), Arc::new(entry));
        }
    }

    /// Remove the entries for the given documents.
    pub fn purge<'a>(&self, uris: impl IntoIterator<Item = &'a Uri>) {
        let mut projects = self.projects.write();
        for uri in uris {
            let project_path = resolve_project_path(uri.as_str());
            let Some(project) = projects.get_mut(project_path) else {
                continue;
            };
            if project.remove(uri.as_str()).is_some() {
                tracing::debug!(uri = uri.as_str(), "removed scene from index");
            }
            if project.is_empty() {
                projects.remove(project_path);
            }
        }
    }

    /// Copy the entries of one project.
    pub fn snapshot(&self, project_path: &str) -> ProjectSnapshot {
        let entries = self
            .projects
            .read()
            .get(project_path)
            .cloned()
            .unwrap_or_default();
        ProjectSnapshot::new(project_path, entries)
    }

    /// The entry for a document, if indexed.
    pub fn get(&self, uri: &Uri) -> Option<Arc<IndexEntry>> {
        self.projects
            .read()
            .get(resolve_project_path(uri.as_str()))?
            .get(uri.as_str())
            .cloned()
    }

    /// Whether any document of a project is indexed.
    pub fn has_project(&self, project_path: &str) -> bool {
        self.projects.read().contains_key(project_path)
    }

    /// Total number of indexed documents.
    pub fn len(&self) -> usize {
        self.projects.read().values().map(BTreeMap::len).sum()
    }

    /// Whether nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.projects.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(uri: &str, text: &str) -> TextDocument {
        TextDocument::new(uri.parse().unwrap(), 1, text)
    }

    #[test]
    fn test_symbol_table() {
        let scene = choicescript_parser::parse_scene(
            "*scene_list\n  startup\n  chapter1\n*create Gold 0\n*achievement dragon true 10 Slayer\n*label Start\n*label start\n",
        );
        let table = SymbolTable::from_scene(&scene);
        assert_eq!(table.scene_list, vec!["startup", "chapter1"]);
        assert!(table.globals.contains_key("gold"));
        assert!(table.achievements.contains_key("dragon"));
        assert_eq!(table.labels.len(), 1);
        assert_eq!(table.labels["start"].name, "Start");
    }

    #[test]
    fn test_update_replaces_entry() {
        let index = ProjectIndex::new();
        index.update([&doc("file:///g/startup.txt", "*create a 1\n")]);
        index.update([&doc("file:///g/startup.txt", "*create b 1\n")]);

        assert_eq!(index.len(), 1);
        let uri: Uri = "file:///g/startup.txt".parse().unwrap();
        let entry = index.get(&uri).unwrap();
        assert!(entry.exports.globals.contains_key("b"));
        assert!(!entry.exports.globals.contains_key("a"));
    }

    #[test]
    fn test_purge_drops_empty_projects() {
        let index = ProjectIndex::new();
        index.update([
            &doc("file:///g/startup.txt", ""),
            &doc("file:///h/startup.txt", ""),
        ]);
        assert!(index.has_project("file:///g/"));

        let uri: Uri = "file:///g/startup.txt".parse().unwrap();
        index.purge([&uri]);
        assert!(!index.has_project("file:///g/"));
        assert!(index.has_project("file:///h/"));
        assert!(index.get(&uri).is_none());
    }

    #[test]
    fn test_snapshot_is_isolated_from_updates() {
        let index = ProjectIndex::new();
        index.update([&doc("file:///g/startup.txt", "*create a 1\n")]);
        let snapshot = index.snapshot("file:///g/");

        index.update([&doc("file:///g/startup.txt", "*create b 1\n")]);
        let startup = snapshot.startup().unwrap();
        assert!(startup.exports.globals.contains_key("a"));
    }
}
