//! Find references handler for locating all usages.
//!
//! Searches every scene of the project for occurrences that resolve to the
//! same declaration as the symbol under the cursor. Results are ordered by
//! document URI, then position.

use lsp_types::{Location, Position, Uri};

use super::utils::{location, occurrence_at};
use crate::db::{ProjectSnapshot, SymbolRef};

/// Handle a find references request.
pub fn handle_references(
    snapshot: &ProjectSnapshot,
    uri: &Uri,
    position: Position,
    include_declaration: bool,
) -> Option<Vec<Location>> {
    let entry = snapshot.document(uri)?;
    let occ = occurrence_at(&entry.scene, position)?;
    let symbol = SymbolRef::of(occ, &entry.scene_name)?;

    let locations: Vec<Location> = snapshot
        .references(entry, &symbol)
        .into_iter()
        .filter(|(_, occ)| include_declaration || !occ.kind.is_declaration())
        .map(|(entry, occ)| location(entry, occ.span))
        .collect();

    if locations.is_empty() {
        None
    } else {
        Some(locations)
    }
}
