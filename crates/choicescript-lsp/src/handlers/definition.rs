//! Go-to-definition handler.
//!
//! Resolves the symbol under the cursor to its single declaration: the
//! current scene first, then the rest of the project.

use lsp_types::{GotoDefinitionResponse, Location, Position, Uri};

use super::utils::{location, occurrence_at};
use crate::db::{ProjectSnapshot, SymbolRef};

/// Find the declaration of the symbol under the cursor.
pub fn find_definition(
    snapshot: &ProjectSnapshot,
    uri: &Uri,
    position: Position,
) -> Option<Location> {
    let entry = snapshot.document(uri)?;
    let occ = occurrence_at(&entry.scene, position)?;
    let symbol = SymbolRef::of(occ, &entry.scene_name)?;
    let decl = snapshot.resolve(entry, &symbol)?;
    Some(location(decl.entry, decl.span()))
}

/// Handle a textDocument/definition request.
pub fn handle_goto_definition(
    snapshot: &ProjectSnapshot,
    uri: &Uri,
    position: Position,
) -> Option<GotoDefinitionResponse> {
    find_definition(snapshot, uri, position).map(GotoDefinitionResponse::Scalar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::IndexEntry;
    use crate::vfs::TextDocument;
    use lsp_types::Range;

    fn project(docs: &[(&str, &str)]) -> ProjectSnapshot {
        docs.iter().fold(ProjectSnapshot::default(), |snap, (uri, text)| {
            snap.with_document(IndexEntry::from_document(&TextDocument::new(
                uri.parse().unwrap(),
                1,
                *text,
            )))
        })
    }

    #[test]
    fn test_definition_of_label() {
        let snap = project(&[("file:///g/chapter1.txt", "*goto fight\nText.\n*label fight\n")]);
        let uri: Uri = "file:///g/chapter1.txt".parse().unwrap();
        let loc = find_definition(&snap, &uri, Position::new(0, 7)).unwrap();
        assert_eq!(loc.uri, uri);
        assert_eq!(loc.range, Range::new(Position::new(2, 7), Position::new(2, 12)));
    }

    #[test]
    fn test_definition_of_scene_label() {
        let snap = project(&[
            ("file:///g/chapter1.txt", "*goto_scene chapter2 fight\n"),
            ("file:///g/chapter2.txt", "*label fight\n"),
        ]);
        let uri: Uri = "file:///g/chapter1.txt".parse().unwrap();

        let label = find_definition(&snap, &uri, Position::new(0, 23)).unwrap();
        assert_eq!(label.uri.as_str(), "file:///g/chapter2.txt");
        assert_eq!(label.range.start, Position::new(0, 7));

        let scene = find_definition(&snap, &uri, Position::new(0, 14)).unwrap();
        assert_eq!(scene.uri.as_str(), "file:///g/chapter2.txt");
        assert_eq!(scene.range.start, Position::new(0, 0));
    }

    #[test]
    fn test_definition_prefers_temp() {
        let snap = project(&[
            ("file:///g/startup.txt", "*create gold 0\n"),
            ("file:///g/chapter1.txt", "*temp gold 5\n*set gold 1\n"),
        ]);
        let uri: Uri = "file:///g/chapter1.txt".parse().unwrap();
        let loc = find_definition(&snap, &uri, Position::new(1, 6)).unwrap();
        assert_eq!(loc.uri, uri);
        assert_eq!(loc.range.start, Position::new(0, 6));
    }

    #[test]
    fn test_unresolved_is_none() {
        let snap = project(&[("file:///g/chapter1.txt", "*goto nowhere\n")]);
        let uri: Uri = "file:///g/chapter1.txt".parse().unwrap();
        assert!(find_definition(&snap, &uri, Position::new(0, 8)).is_none());
    }
}
