//! Hover handler for displaying information about symbols.
//!
//! Provides hover information for:
//! - Variables: scope, declaring scene and line, initial value and type
//! - Labels: declaring scene and line
//! - Scene references: the target document
//! - Achievements: title and declaring line
//! - Commands: a one-line description

use choicescript_parser::{commands, OccurrenceKind};
use lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position, Range, Uri};

use super::utils::{is_name_char, occurrence_at, span_to_range};
use crate::db::{Declaration, ProjectSnapshot, SymbolRef};

/// Handle a hover request.
pub fn handle_hover(snapshot: &ProjectSnapshot, uri: &Uri, position: Position) -> Option<Hover> {
    let entry = snapshot.document(uri)?;
    let scene = &entry.scene;

    let Some(occ) = occurrence_at(scene, position) else {
        return command_hover(scene, position);
    };
    let symbol = SymbolRef::of(occ, &entry.scene_name)?;
    let range = span_to_range(&scene.line_index, occ.span);

    let value = match (&symbol, snapshot.resolve(entry, &symbol)) {
        (SymbolRef::Variable(_), Some(decl)) => variable_info(&decl),
        (SymbolRef::Label { .. }, Some(decl)) => label_info(&decl),
        (SymbolRef::Achievement(_), Some(decl)) => achievement_info(&decl),
        (SymbolRef::Scene(name), Some(decl)) => {
            format!("**{name}** · scene\n\n`{}`", decl.entry.uri.as_str())
        }
        (SymbolRef::Scene(name), None) if snapshot.scene_names().contains(name.as_str()) => {
            format!("**{name}** · scene\n\nListed in `*scene_list`, not indexed")
        }
        _ => return None,
    };

    tracing::debug!("Hover for {:?}", symbol);
    Some(markdown(value, Some(range)))
}

fn markdown(value: String, range: Option<Range>) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value,
        }),
        range,
    }
}

/// Describe a variable declaration.
fn variable_info(decl: &Declaration<'_>) -> String {
    let Some(occ) = decl.occurrence else {
        return String::new();
    };
    let scope = match occ.kind {
        OccurrenceKind::GlobalVariable => "global variable",
        _ => "temporary variable",
    };

    let mut info = format!("**{}** · {scope}\n\n", occ.name);
    info.push_str(&format!(
        "Declared in `{}` on line {}",
        decl.entry.scene_name,
        occ.line + 1
    ));
    if let Some(value) = &occ.value {
        info.push_str(&format!("\n\nInitial value: `{value}` ({})", occ.value_type));
    }
    info
}

/// Describe a label declaration.
fn label_info(decl: &Declaration<'_>) -> String {
    let Some(occ) = decl.occurrence else {
        return String::new();
    };
    format!(
        "**{}** · label\n\nIn scene `{}` on line {}",
        occ.name,
        decl.entry.scene_name,
        occ.line + 1
    )
}

/// Describe an achievement declaration.
fn achievement_info(decl: &Declaration<'_>) -> String {
    let Some(occ) = decl.occurrence else {
        return String::new();
    };
    let mut info = format!("**{}** · achievement", occ.name);
    if let Some(title) = occ.value.as_deref().filter(|t| !t.is_empty()) {
        info.push_str(&format!("\n\n{title}"));
    }
    info.push_str(&format!(
        "\n\nDeclared in `{}` on line {}",
        decl.entry.scene_name,
        occ.line + 1
    ));
    info
}

/// Describe the `*command` under the cursor.
fn command_hover(scene: &choicescript_parser::Scene, position: Position) -> Option<Hover> {
    let line = scene.line_index.line_text(position.line as usize)?;
    let col = line
        .char_indices()
        .scan(0u32, |units, (i, c)| {
            let at = *units;
            *units += c.len_utf16() as u32;
            Some((i, at))
        })
        .find(|&(_, at)| at >= position.character)
        .map_or(line.len(), |(i, _)| i);

    let start = line[..col]
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_name_char(c))
        .last()
        .map_or(col, |(i, _)| i);
    let end = col
        + line[col..]
            .char_indices()
            .find(|&(_, c)| !is_name_char(c))
            .map_or(line.len() - col, |(i, _)| i);

    if start == 0 || !line[..start].ends_with('*') {
        return None;
    }
    let spec = commands::lookup(&line[start..end])?;
    let line_start = scene.line_index.line_start(position.line as usize)?;
    let range = span_to_range(
        &scene.line_index,
        choicescript_parser::Span::new(line_start + start - 1, line_start + end),
    );
    Some(markdown(
        format!("**\\*{}**\n\n{}", spec.name, spec.description),
        Some(range),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::IndexEntry;
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

    fn hover_text(snapshot: &ProjectSnapshot, uri: &str, line: u32, col: u32) -> Option<String> {
        let hover = handle_hover(snapshot, &uri.parse().unwrap(), Position::new(line, col))?;
        match hover.contents {
            HoverContents::Markup(markup) => Some(markup.value),
            _ => None,
        }
    }

    #[test]
    fn test_hover_variable_shows_value_and_type() {
        let snap = project(&[(
            "file:///g/startup.txt",
            "*create points 0\n*set points + 1\n",
        )]);
        let text = hover_text(&snap, "file:///g/startup.txt", 1, 6).unwrap();
        assert!(text.contains("global variable"));
        assert!(text.contains("`0` (number)"));
        assert!(text.contains("line 1"));
    }

    #[test]
    fn test_hover_global_from_other_scene() {
        let snap = project(&[
            ("file:///g/startup.txt", "*create name \"Alex\"\n"),
            ("file:///g/chapter1.txt", "Hello ${name}.\n"),
        ]);
        let text = hover_text(&snap, "file:///g/chapter1.txt", 0, 9).unwrap();
        assert!(text.contains("Declared in `startup`"));
        assert!(text.contains("(string)"));
    }

    #[test]
    fn test_hover_scene_reference() {
        let snap = project(&[
            ("file:///g/chapter1.txt", "*goto_scene chapter2\n"),
            ("file:///g/chapter2.txt", "The end.\n"),
        ]);
        let text = hover_text(&snap, "file:///g/chapter1.txt", 0, 14).unwrap();
        assert!(text.contains("file:///g/chapter2.txt"));
    }

    #[test]
    fn test_hover_command() {
        let snap = project(&[("file:///g/chapter1.txt", "*finish\n")]);
        let text = hover_text(&snap, "file:///g/chapter1.txt", 0, 3).unwrap();
        assert!(text.contains("\\*finish"));
    }

    #[test]
    fn test_hover_nothing() {
        let snap = project(&[("file:///g/chapter1.txt", "Plain prose.\n")]);
        assert!(hover_text(&snap, "file:///g/chapter1.txt", 0, 3).is_none());
        assert!(hover_text(&snap, "file:///g/missing.txt", 0, 0).is_none());
    }
}
