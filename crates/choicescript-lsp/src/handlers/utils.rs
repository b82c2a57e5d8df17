//! Shared utility functions for LSP handlers.
//!
//! Position conversion between byte offsets, LSP positions and 1-based
//! editor positions, plus occurrence lookup at a cursor.

use choicescript_parser::{LineIndex, Occurrence, Scene, Span};
use lsp_types::{Location, Position, Range};

use crate::db::IndexEntry;

/// A 1-based line/column position as editors display it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EditorPosition {
    /// Line number, starting at 1.
    pub line_number: u32,
    /// Column, starting at 1.
    pub column: u32,
}

impl EditorPosition {
    /// Create an editor position.
    pub const fn new(line_number: u32, column: u32) -> Self {
        Self {
            line_number,
            column,
        }
    }

    /// The 0-based LSP position. Zero components clamp to the first line/column.
    pub const fn to_lsp(self) -> Position {
        Position {
            line: self.line_number.saturating_sub(1),
            character: self.column.saturating_sub(1),
        }
    }

    /// The editor position of an LSP position.
    pub const fn from_lsp(position: Position) -> Self {
        Self {
            line_number: position.line.saturating_add(1),
            column: position.character.saturating_add(1),
        }
    }
}

impl From<Position> for EditorPosition {
    fn from(position: Position) -> Self {
        Self::from_lsp(position)
    }
}

impl From<EditorPosition> for Position {
    fn from(position: EditorPosition) -> Self {
        position.to_lsp()
    }
}

/// Convert a byte span to an LSP range.
pub fn span_to_range(index: &LineIndex, span: Span) -> Range {
    let (start_line, start_col) = index.offset_to_position(span.start);
    let (end_line, end_col) = index.offset_to_position(span.end);
    Range {
        start: Position::new(start_line, start_col),
        end: Position::new(end_line, end_col),
    }
}

/// Convert an LSP position to a byte offset.
pub fn position_to_offset(index: &LineIndex, position: Position) -> Option<usize> {
    index.position_to_offset(position.line, position.character)
}

/// The location of a span in an indexed document.
pub fn location(entry: &IndexEntry, span: Span) -> Location {
    Location {
        uri: entry.uri.clone(),
        range: span_to_range(&entry.scene.line_index, span),
    }
}

/// The symbol occurrence under the cursor.
pub fn occurrence_at(scene: &Scene, position: Position) -> Option<&Occurrence> {
    let offset = position_to_offset(&scene.line_index, position)?;
    scene.occurrence_at(offset)
}

/// The text of a line up to the cursor.
pub fn line_prefix(scene: &Scene, position: Position) -> Option<&str> {
    let index = &scene.line_index;
    let offset = position_to_offset(index, position)?;
    let start = index.line_start(position.line as usize)?;
    scene.source().get(start..offset)
}

/// Check if a character can be part of a ChoiceScript name.
pub fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Split off the partially typed name at the end of `prefix`.
///
/// Returns the text before the name and the name.
pub fn split_partial_name(prefix: &str) -> (&str, &str) {
    let start = prefix
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_name_char(c))
        .last()
        .map_or(prefix.len(), |(i, _)| i);
    prefix.split_at(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use choicescript_parser::parse_scene;

    #[test]
    fn test_editor_position_round_trip() {
        let editor = EditorPosition::new(3, 7);
        let lsp = editor.to_lsp();
        assert_eq!(lsp, Position::new(2, 6));
        assert_eq!(EditorPosition::from(lsp), editor);
        assert_eq!(EditorPosition::new(0, 0).to_lsp(), Position::new(0, 0));
    }

    #[test]
    fn test_span_to_range() {
        let scene = parse_scene("*label a\n*goto a\n");
        let range = span_to_range(&scene.line_index, Span::new(15, 16));
        assert_eq!(range, Range::new(Position::new(1, 6), Position::new(1, 7)));
    }

    #[test]
    fn test_occurrence_at_end_of_word() {
        let scene = parse_scene("*set gold 1\n");
        let occ = occurrence_at(&scene, Position::new(0, 9)).unwrap();
        assert_eq!(occ.name, "gold");
        assert!(occurrence_at(&scene, Position::new(5, 0)).is_none());
    }

    #[test]
    fn test_split_partial_name() {
        assert_eq!(split_partial_name("*goto sta"), ("*goto ", "sta"));
        assert_eq!(split_partial_name("*"), ("*", ""));
        assert_eq!(split_partial_name("${str"), ("${", "str"));
        assert_eq!(split_partial_name("gold"), ("", "gold"));
    }

    #[test]
    fn test_line_prefix() {
        let scene = parse_scene("*label a\n  *goto b\n");
        assert_eq!(line_prefix(&scene, Position::new(1, 7)), Some("  *goto"));
    }
}
