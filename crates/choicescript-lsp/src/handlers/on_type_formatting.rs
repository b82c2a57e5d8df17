//! On-type formatting handler for typographic punctuation.
//!
//! Triggers on specific characters to:
//! - Replace `...` with an ellipsis
//! - Replace `--` with an em dash
//!
//! Command lines are left alone.

use choicescript_parser::Scene;
use lsp_types::{Position, Range, TextEdit};

use super::utils::line_prefix;

/// First trigger character for on-type formatting.
pub const FIRST_TRIGGER_CHARACTER: &str = ".";
/// Additional trigger characters for on-type formatting.
pub const MORE_TRIGGER_CHARACTERS: &[&str] = &["-"];

const REPLACEMENTS: &[(&str, &str)] = &[("...", "\u{2026}"), ("--", "\u{2014}")];

/// Handle an on-type formatting request. `position` is just after the typed character.
pub fn handle_on_type_formatting(
    scene: &Scene,
    position: Position,
    ch: &str,
) -> Option<Vec<TextEdit>> {
    let prefix = line_prefix(scene, position)?;
    if prefix.trim_start().starts_with('*') {
        return None;
    }

    let (pattern, replacement) = REPLACEMENTS
        .iter()
        .find(|(pattern, _)| pattern.ends_with(ch) && prefix.ends_with(pattern))?;

    // Patterns are ASCII: one UTF-16 unit per byte.
    let start = position.character.checked_sub(pattern.len() as u32)?;
    Some(vec![TextEdit {
        range: Range::new(Position::new(position.line, start), position),
        new_text: (*replacement).to_string(),
    }])
}
