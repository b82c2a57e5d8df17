//! Folding range handler.
//!
//! Every line with an indented body folds: `*choice` blocks, `#option`
//! bodies, `*if` branches and `*scene_list` tables.

use lsp_types::{FoldingRange, FoldingRangeKind, Uri};

use crate::db::ProjectSnapshot;

/// Handle a folding range request.
pub fn handle_folding_ranges(snapshot: &ProjectSnapshot, uri: &Uri) -> Option<Vec<FoldingRange>> {
    let entry = snapshot.document(uri)?;

    let mut ranges = Vec::new();
    entry.scene.walk(|node| {
        let end = node.end_line();
        if end > node.line {
            ranges.push(FoldingRange {
                start_line: node.line as u32,
                start_character: None,
                end_line: end as u32,
                end_character: None,
                kind: Some(FoldingRangeKind::Region),
                collapsed_text: None,
            });
        }
    });

    Some(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::IndexEntry;
    use crate::vfs::TextDocument;

    #[test]
    fn test_choice_folds() {
        let uri: Uri = "file:///g/chapter1.txt".parse().unwrap();
        let text = "*choice\n  #Fight\n    You fight.\n    *finish\n  #Flee\n    You run.\n    *finish\nAfter.\n";
        let snap = ProjectSnapshot::default()
            .with_document(IndexEntry::from_document(&TextDocument::new(uri.clone(), 1, text)));

        let ranges = handle_folding_ranges(&snap, &uri).unwrap();
        let lines: Vec<_> = ranges.iter().map(|r| (r.start_line, r.end_line)).collect();
        assert_eq!(lines, vec![(0, 6), (1, 3), (4, 6)]);
    }

    #[test]
    fn test_flat_scene_has_no_folds() {
        let uri: Uri = "file:///g/chapter1.txt".parse().unwrap();
        let snap = ProjectSnapshot::default().with_document(IndexEntry::from_document(
            &TextDocument::new(uri.clone(), 1, "One.\nTwo.\n"),
        ));
        assert_eq!(handle_folding_ranges(&snap, &uri), Some(Vec::new()));
    }
}
