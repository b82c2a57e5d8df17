//! Virtual File System for document management.
//!
//! The VFS maintains the in-memory state of all open documents, applying
//! incremental edits from the editor to a rope. Every edit publishes a new
//! immutable [`TextDocument`] snapshot; the parsed scene is cached on the
//! snapshot, so it is computed at most once per version.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use choicescript_parser::{parse_scene, Scene};
use lsp_types::{Position, TextDocumentContentChangeEvent, Uri};
use ropey::Rope;

/// Language id of ChoiceScript documents.
pub const LANGUAGE_ID: &str = "choicescript";

/// An immutable snapshot of a document at one version.
#[derive(Debug)]
pub struct TextDocument {
    uri: Uri,
    language_id: String,
    version: i32,
    text: Arc<str>,
    scene: OnceLock<Arc<Scene>>,
}

impl TextDocument {
    /// Create a ChoiceScript document snapshot.
    pub fn new(uri: Uri, version: i32, text: impl Into<Arc<str>>) -> Self {
        Self::with_language(uri, LANGUAGE_ID, version, text)
    }

    /// Create a document snapshot with an explicit language id.
    pub fn with_language(
        uri: Uri,
        language_id: impl Into<String>,
        version: i32,
        text: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            uri,
            language_id: language_id.into(),
            version,
            text: text.into(),
            scene: OnceLock::new(),
        }
    }

    /// The document URI.
    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The language id reported by the editor.
    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    /// The document version.
    pub const fn version(&self) -> i32 {
        self.version
    }

    /// The document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The parsed scene, computed on first use.
    pub fn scene(&self) -> Arc<Scene> {
        Arc::clone(self.scene.get_or_init(|| Arc::new(parse_scene(&self.text))))
    }
}

/// An open document: its editable rope and latest snapshot.
#[derive(Debug)]
struct Document {
    content: Rope,
    snapshot: Arc<TextDocument>,
}

impl Document {
    fn new(uri: Uri, language_id: String, version: i32, text: &str) -> Self {
        Self {
            content: Rope::from_str(text),
            snapshot: Arc::new(TextDocument::with_language(uri, language_id, version, text)),
        }
    }

    fn apply(&mut self, change: &TextDocumentContentChangeEvent) {
        match change.range {
            Some(range) => {
                let start = position_to_char(&self.content, range.start);
                let end = position_to_char(&self.content, range.end).max(start);
                self.content.remove(start..end);
                self.content.insert(start, &change.text);
            }
            None => self.content = Rope::from_str(&change.text),
        }
    }

    fn publish(&mut self, version: i32) {
        let previous = &self.snapshot;
        if version <= previous.version() {
            tracing::warn!(
                uri = previous.uri().as_str(),
                previous = previous.version(),
                version,
                "document version did not increase"
            );
        }
        self.snapshot = Arc::new(TextDocument::with_language(
            previous.uri().clone(),
            previous.language_id(),
            version,
            self.content.to_string(),
        ));
    }
}

/// Convert an LSP position (UTF-16 columns) to a rope char index, clamped to the text.
fn position_to_char(rope: &Rope, position: Position) -> usize {
    let line = position.line as usize;
    if line >= rope.len_lines() {
        return rope.len_chars();
    }
    let slice = rope.line(line);
    let units = (position.character as usize).min(slice.len_utf16_cu());
    let mut col = slice.utf16_cu_to_char(units);
    // never step over the line break
    let line_len = slice.len_chars();
    let has_break = slice
        .chars()
        .last()
        .is_some_and(|c| c == '\n' || c == '\r');
    if has_break {
        let break_len = if line_len >= 2 && slice.char(line_len - 2) == '\r' { 2 } else { 1 };
        col = col.min(line_len - break_len);
    }
    rope.line_to_char(line) + col
}

/// Virtual file system for managing open documents.
#[derive(Debug, Default)]
pub struct Vfs {
    documents: HashMap<String, Document>,
}

impl Vfs {
    /// Create a new empty VFS.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a document, replacing any previous state for the URI.
    pub fn open(
        &mut self,
        uri: Uri,
        language_id: impl Into<String>,
        version: i32,
        text: &str,
    ) -> Arc<TextDocument> {
        let key = uri.as_str().to_string();
        let document = Document::new(uri, language_id.into(), version, text);
        let snapshot = Arc::clone(&document.snapshot);
        self.documents.insert(key, document);
        snapshot
    }

    /// Apply edits in order and publish the resulting snapshot.
    ///
    /// Returns `None` if the document is not open.
    pub fn change(
        &mut self,
        uri: &Uri,
        version: i32,
        changes: &[TextDocumentContentChangeEvent],
    ) -> Option<Arc<TextDocument>> {
        let document = self.documents.get_mut(uri.as_str())?;
        for change in changes {
            document.apply(change);
        }
        document.publish(version);
        Some(Arc::clone(&document.snapshot))
    }

    /// Close a document. Returns whether it was open.
    pub fn close(&mut self, uri: &Uri) -> bool {
        self.documents.remove(uri.as_str()).is_some()
    }

    /// The current snapshot of a document.
    pub fn get(&self, uri: &Uri) -> Option<Arc<TextDocument>> {
        self.documents
            .get(uri.as_str())
            .map(|document| Arc::clone(&document.snapshot))
    }

    /// Whether a document is open.
    pub fn contains(&self, uri: &Uri) -> bool {
        self.documents.contains_key(uri.as_str())
    }

    /// Snapshots of every open document.
    pub fn snapshots(&self) -> Vec<Arc<TextDocument>> {
        self.documents
            .values()
            .map(|document| Arc::clone(&document.snapshot))
            .collect()
    }

    /// Number of open documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether no document is open.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::Range;

    fn uri() -> Uri {
        "file:///g/chapter1.txt".parse().unwrap()
    }

    fn edit(start: (u32, u32), end: (u32, u32), text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: Some(Range::new(
                Position::new(start.0, start.1),
                Position::new(end.0, end.1),
            )),
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_vfs_open_close() {
        let mut vfs = Vfs::new();
        vfs.open(uri(), LANGUAGE_ID, 1, "*label start\n");
        assert!(vfs.contains(&uri()));

        assert!(vfs.close(&uri()));
        assert!(vfs.get(&uri()).is_none());
        assert!(!vfs.close(&uri()));
    }

    #[test]
    fn test_incremental_edits() {
        let mut vfs = Vfs::new();
        vfs.open(uri(), LANGUAGE_ID, 1, "*temp gold 1\nYou have gold.\n");

        let doc = vfs
            .change(
                &uri(),
                2,
                &[
                    edit((0, 11), (0, 12), "10"),
                    edit((1, 9), (1, 13), "${gold} coins"),
                ],
            )
            .unwrap();
        assert_eq!(doc.text(), "*temp gold 10\nYou have ${gold} coins.\n");
        assert_eq!(doc.version(), 2);
    }

    #[test]
    fn test_edit_with_utf16_columns() {
        let mut vfs = Vfs::new();
        vfs.open(uri(), LANGUAGE_ID, 1, "“Hi” 😀 there\n");
        // 😀 is two UTF-16 units: “Hi” is 4 units, space, emoji 2, space
        let doc = vfs.change(&uri(), 2, &[edit((0, 8), (0, 13), "you")]).unwrap();
        assert_eq!(doc.text(), "“Hi” 😀 you\n");
    }

    #[test]
    fn test_full_replacement() {
        let mut vfs = Vfs::new();
        vfs.open(uri(), LANGUAGE_ID, 1, "old");
        let change = TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: "new".to_string(),
        };
        let doc = vfs.change(&uri(), 2, &[change]).unwrap();
        assert_eq!(doc.text(), "new");
    }

    #[test]
    fn test_snapshots_are_immutable() {
        let mut vfs = Vfs::new();
        let first = vfs.open(uri(), LANGUAGE_ID, 1, "*label a\n");
        let scene = first.scene();
        vfs.change(&uri(), 2, &[edit((0, 7), (0, 8), "b")]);

        assert_eq!(first.text(), "*label a\n");
        assert!(Arc::ptr_eq(&scene, &first.scene()));
        assert!(vfs.get(&uri()).unwrap().scene().find_label("b").is_some());
    }

    #[test]
    fn test_change_unknown_document() {
        let mut vfs = Vfs::new();
        assert!(vfs.change(&uri(), 2, &[]).is_none());
    }
}
