//! Document symbols handler for outline view.
//!
//! Lists the declarations of a scene: variables, labels and achievements.
//! With `include_globals`, the project's `*create` variables and
//! achievements declared in startup are listed too.

use choicescript_parser::{Occurrence, OccurrenceKind};
use lsp_types::{DocumentSymbolResponse, SymbolInformation, SymbolKind, Uri};

use super::utils::location;
use crate::db::{IndexEntry, ProjectSnapshot};

/// Find the symbols declared in a document.
pub fn find_document_symbols(
    snapshot: &ProjectSnapshot,
    uri: &Uri,
    include_globals: bool,
) -> Vec<SymbolInformation> {
    let Some(entry) = snapshot.document(uri) else {
        return Vec::new();
    };

    let mut symbols: Vec<SymbolInformation> = entry
        .scene
        .declarations()
        .map(|occ| symbol(entry, occ))
        .collect();

    if include_globals {
        if let Some(startup) = snapshot.startup().filter(|s| s.uri != entry.uri) {
            symbols.extend(
                startup
                    .exports
                    .globals
                    .values()
                    .chain(startup.exports.achievements.values())
                    .map(|occ| symbol(startup, occ)),
            );
        }
    }

    symbols
}

/// Handle a document symbols request.
pub fn handle_document_symbols(
    snapshot: &ProjectSnapshot,
    uri: &Uri,
    include_globals: bool,
) -> Option<DocumentSymbolResponse> {
    let symbols = find_document_symbols(snapshot, uri, include_globals);
    if symbols.is_empty() {
        None
    } else {
        Some(DocumentSymbolResponse::Flat(symbols))
    }
}

/// Convert a declaration to a symbol.
#[allow(deprecated)] // SymbolInformation::deprecated field is deprecated but required
fn symbol(entry: &IndexEntry, occ: &Occurrence) -> SymbolInformation {
    let kind = match occ.kind {
        OccurrenceKind::Label => SymbolKind::FUNCTION,
        OccurrenceKind::Achievement => SymbolKind::EVENT,
        OccurrenceKind::GlobalVariable
            if occ.value_type == choicescript_parser::ValueType::Boolean =>
        {
            SymbolKind::BOOLEAN
        }
        _ => SymbolKind::VARIABLE,
    };

    SymbolInformation {
        name: occ.name.clone(),
        kind,
        tags: None,
        deprecated: None,
        location: location(entry, occ.span),
        container_name: Some(entry.scene_name.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::TextDocument;

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
    fn test_document_symbols() {
        let snap = project(&[
            (
                "file:///g/startup.txt",
                "*create brave false\n*achievement hero true 5 Hero\n",
            ),
            (
                "file:///g/chapter1.txt",
                "*temp gold 5\n*label start\n*goto start\n",
            ),
        ]);
        let uri: Uri = "file:///g/chapter1.txt".parse().unwrap();

        let local = find_document_symbols(&snap, &uri, false);
        let names: Vec<_> = local.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["gold", "start"]);
        assert_eq!(local[1].kind, SymbolKind::FUNCTION);

        let all = find_document_symbols(&snap, &uri, true);
        let names: Vec<_> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["gold", "start", "brave", "hero"]);
        assert_eq!(all[2].kind, SymbolKind::BOOLEAN);
        assert_eq!(all[2].container_name.as_deref(), Some("startup"));
    }

    #[test]
    fn test_startup_globals_not_duplicated() {
        let snap = project(&[("file:///g/startup.txt", "*create gold 0\n")]);
        let uri: Uri = "file:///g/startup.txt".parse().unwrap();
        assert_eq!(find_document_symbols(&snap, &uri, true).len(), 1);
    }

    #[test]
    fn test_missing_document() {
        let uri: Uri = "file:///g/none.txt".parse().unwrap();
        assert!(handle_document_symbols(&ProjectSnapshot::default(), &uri, true).is_none());
    }
}
