//! Document highlight handler.
//!
//! Highlights every occurrence in the current document of the symbol under
//! the cursor. Declarations and assignments are writes.

use choicescript_parser::OccurrenceKind;
use lsp_types::{DocumentHighlight, DocumentHighlightKind, Position, Uri};

use super::utils::{occurrence_at, span_to_range};
use crate::db::{ProjectSnapshot, SymbolRef};

/// Handle a document highlight request.
pub fn handle_document_highlight(
    snapshot: &ProjectSnapshot,
    uri: &Uri,
    position: Position,
) -> Option<Vec<DocumentHighlight>> {
    let entry = snapshot.document(uri)?;
    let occ = occurrence_at(&entry.scene, position)?;
    let symbol = SymbolRef::of(occ, &entry.scene_name)?;

    let highlights: Vec<DocumentHighlight> = snapshot
        .references(entry, &symbol)
        .into_iter()
        .filter(|(found, _)| found.uri == entry.uri)
        .map(|(_, occ)| DocumentHighlight {
            range: span_to_range(&entry.scene.line_index, occ.span),
            kind: Some(
                if occ.kind.is_declaration() || occ.kind == OccurrenceKind::VariableWrite {
                    DocumentHighlightKind::WRITE
                } else {
                    DocumentHighlightKind::READ
                },
            ),
        })
        .collect();

    if highlights.is_empty() {
        None
    } else {
        Some(highlights)
    }
}
