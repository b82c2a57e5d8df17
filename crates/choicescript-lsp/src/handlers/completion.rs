//! Completion handler for autocompletion.
//!
//! Provides context-aware completions for:
//! - Commands (after `*` at the start of a line)
//! - Labels (after `*goto`/`*gosub`)
//! - Scenes and their labels (after `*goto_scene`/`*gosub_scene`)
//! - Variables (in expressions and `${}` interpolation)
//! - Achievements (after `*achieve`)
//!
//! Every item replaces the partially typed name.

use std::collections::HashSet;

use choicescript_parser::lexer::RESERVED_WORDS;
use choicescript_parser::{commands::COMMANDS, Occurrence, OccurrenceKind};
use lsp_types::{
    CompletionItem, CompletionItemKind, CompletionResponse, CompletionTextEdit, Documentation,
    Position, Range, TextEdit, Uri,
};

use super::utils::{line_prefix, split_partial_name};
use crate::db::{IndexEntry, ProjectSnapshot};

/// Commands whose arguments are expressions.
const EXPRESSION_COMMANDS: &[&str] = &[
    "delete",
    "elseif",
    "elsif",
    "if",
    "input_number",
    "input_text",
    "looplimit",
    "print",
    "rand",
    "selectable_if",
    "set",
    "setref",
];

/// Commands whose first argument names a scene.
const SCENE_COMMANDS: &[&str] = &["gosub_scene", "goto_scene", "redirect_scene"];

/// Completion context detected from cursor position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionContext {
    /// Right after `*` at the start of a line.
    Command,
    /// A label of the current scene.
    Label,
    /// A scene of the project.
    Scene,
    /// A label of the named scene.
    SceneLabel {
        /// The scene named before the cursor.
        scene: String,
    },
    /// A variable in an expression or interpolation.
    Variable,
    /// An achievement.
    Achievement,
    /// Nothing to complete.
    Unknown,
}

/// Detect the completion context from the line text before the partial name.
pub fn detect_context(before: &str) -> CompletionContext {
    if in_interpolation(before) {
        return CompletionContext::Variable;
    }

    let Some(rest) = before.trim_start().strip_prefix('*') else {
        return CompletionContext::Unknown;
    };
    if rest.is_empty() {
        return CompletionContext::Command;
    }

    let name_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if name_len == rest.len() {
        return CompletionContext::Unknown;
    }
    let command = rest[..name_len].to_ascii_lowercase();
    let words: Vec<&str> = rest[name_len..].split_whitespace().collect();

    match command.as_str() {
        "goto" if words.is_empty() => CompletionContext::Label,
        "gosub" if words.is_empty() => CompletionContext::Label,
        "gosub" => CompletionContext::Variable,
        c if SCENE_COMMANDS.contains(&c) => match words.as_slice() {
            [] => CompletionContext::Scene,
            [scene] => CompletionContext::SceneLabel {
                scene: (*scene).to_string(),
            },
            _ => CompletionContext::Variable,
        },
        "achieve" if words.is_empty() => CompletionContext::Achievement,
        "temp" | "create" if !words.is_empty() => CompletionContext::Variable,
        c if EXPRESSION_COMMANDS.contains(&c) => CompletionContext::Variable,
        _ => CompletionContext::Unknown,
    }
}

/// Whether the text ends inside an open `${`, `$!{`, `$!!{` or `@{`.
fn in_interpolation(before: &str) -> bool {
    let Some(brace) = before.rfind('{') else {
        return false;
    };
    if before[brace..].contains('}') || !before[brace + 1..].trim().is_empty() {
        return false;
    }
    let head = &before[..brace];
    head.ends_with('$') || head.ends_with("$!") || head.ends_with('@')
}

/// Compute completions at a position.
pub fn complete(snapshot: &ProjectSnapshot, uri: &Uri, position: Position) -> Vec<CompletionItem> {
    let Some(entry) = snapshot.document(uri) else {
        return Vec::new();
    };
    let Some(prefix) = line_prefix(&entry.scene, position) else {
        return Vec::new();
    };
    let (before, partial) = split_partial_name(prefix);
    let context = detect_context(before);

    tracing::debug!("Completion context: {:?} at {:?}", context, position);

    let range = Range::new(
        Position::new(
            position.line,
            position.character.saturating_sub(partial.len() as u32),
        ),
        position,
    );
    let item = |label: &str, kind: CompletionItemKind, detail: Option<String>, sort: &str| {
        CompletionItem {
            label: label.to_string(),
            kind: Some(kind),
            detail,
            sort_text: Some(format!("{sort}_{label}")),
            filter_text: Some(label.to_string()),
            text_edit: Some(CompletionTextEdit::Edit(TextEdit {
                range,
                new_text: label.to_string(),
            })),
            ..Default::default()
        }
    };

    match context {
        CompletionContext::Command => COMMANDS
            .iter()
            .map(|spec| {
                let mut completion = item(
                    spec.name,
                    CompletionItemKind::KEYWORD,
                    Some(spec.description.to_string()),
                    "0",
                );
                completion.documentation =
                    Some(Documentation::String(spec.description.to_string()));
                completion
            })
            .collect(),
        CompletionContext::Label => labels(entry)
            .map(|occ| item(&occ.name, CompletionItemKind::REFERENCE, line_detail(occ), "0"))
            .collect(),
        CompletionContext::Scene => snapshot
            .scene_names()
            .into_iter()
            .map(|name| {
                let detail = snapshot.scene(name).map(|e| e.uri.as_str().to_string());
                item(name, CompletionItemKind::FILE, detail, "0")
            })
            .collect(),
        CompletionContext::SceneLabel { scene } => snapshot
            .scene(&scene)
            .map(|target| {
                labels(target)
                    .map(|occ| {
                        item(&occ.name, CompletionItemKind::REFERENCE, line_detail(occ), "0")
                    })
                    .collect()
            })
            .unwrap_or_default(),
        CompletionContext::Variable => variables(snapshot, entry, &item),
        CompletionContext::Achievement => {
            let mut seen = HashSet::new();
            entry
                .exports
                .achievements
                .values()
                .chain(snapshot.startup().into_iter().flat_map(|s| s.exports.achievements.values()))
                .filter(|occ| seen.insert(occ.key()))
                .map(|occ| item(&occ.name, CompletionItemKind::EVENT, occ.value.clone(), "0"))
                .collect()
        }
        CompletionContext::Unknown => Vec::new(),
    }
}

/// Handle a completion request.
pub fn handle_completion(
    snapshot: &ProjectSnapshot,
    uri: &Uri,
    position: Position,
) -> Option<CompletionResponse> {
    let items = complete(snapshot, uri, position);
    if items.is_empty() {
        None
    } else {
        Some(CompletionResponse::Array(items))
    }
}

/// Labels of a scene, first declaration of each name.
fn labels(entry: &IndexEntry) -> impl Iterator<Item = &Occurrence> {
    let mut seen = HashSet::new();
    entry
        .scene
        .occurrences_of(OccurrenceKind::Label)
        .filter(move |occ| seen.insert(occ.key()))
}

fn line_detail(occ: &Occurrence) -> Option<String> {
    Some(format!("line {}", occ.line + 1))
}

/// Visible variables: the scene's temps, then globals, then keywords.
fn variables(
    snapshot: &ProjectSnapshot,
    entry: &IndexEntry,
    item: &dyn Fn(&str, CompletionItemKind, Option<String>, &str) -> CompletionItem,
) -> Vec<CompletionItem> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    let locals = entry.scene.occurrences_of(OccurrenceKind::LocalVariable);
    let own_globals = entry.scene.occurrences_of(OccurrenceKind::GlobalVariable);
    let project_globals = snapshot
        .startup()
        .into_iter()
        .flat_map(|startup| startup.exports.globals.values());

    for (occ, sort, scope) in locals
        .map(|occ| (occ, "0", "temp"))
        .chain(own_globals.chain(project_globals).map(|occ| (occ, "1", "global")))
    {
        if !seen.insert(occ.key()) {
            continue;
        }
        let mut completion = item(
            &occ.name,
            CompletionItemKind::VARIABLE,
            Some(format!("{scope} · {}", occ.value_type)),
            sort,
        );
        completion.documentation = occ
            .value
            .as_ref()
            .map(|value| Documentation::String(format!("Initial value: {value}")));
        items.push(completion);
    }

    items.extend(
        RESERVED_WORDS
            .iter()
            .map(|word| item(word, CompletionItemKind::KEYWORD, None, "2")),
    );
    items
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

    fn labels_at(snap: &ProjectSnapshot, uri: &str, line: u32, col: u32) -> Vec<String> {
        complete(snap, &uri.parse().unwrap(), Position::new(line, col))
            .into_iter()
            .map(|item| item.label)
            .collect()
    }

    #[test]
    fn test_detect_context() {
        assert_eq!(detect_context("*"), CompletionContext::Command);
        assert_eq!(detect_context("  *"), CompletionContext::Command);
        assert_eq!(detect_context("*goto "), CompletionContext::Label);
        assert_eq!(detect_context("*goto_scene "), CompletionContext::Scene);
        assert_eq!(
            detect_context("*goto_scene chapter2 "),
            CompletionContext::SceneLabel {
                scene: "chapter2".into()
            }
        );
        assert_eq!(detect_context("*set "), CompletionContext::Variable);
        assert_eq!(detect_context("*if ("), CompletionContext::Variable);
        assert_eq!(detect_context("*temp "), CompletionContext::Unknown);
        assert_eq!(detect_context("*temp gold "), CompletionContext::Variable);
        assert_eq!(detect_context("You have ${"), CompletionContext::Variable);
        assert_eq!(detect_context("You have $!{"), CompletionContext::Variable);
        assert_eq!(detect_context("You have ${gold} "), CompletionContext::Unknown);
        assert_eq!(detect_context("*achieve "), CompletionContext::Achievement);
        assert_eq!(detect_context("Plain "), CompletionContext::Unknown);
    }

    #[test]
    fn test_complete_commands_with_text_edit() {
        let snap = project(&[("file:///g/chapter1.txt", "*fin\n")]);
        let uri = "file:///g/chapter1.txt".parse().unwrap();
        let items = complete(&snap, &uri, Position::new(0, 4));
        let finish = items.iter().find(|i| i.label == "finish").unwrap();
        assert_eq!(finish.kind, Some(CompletionItemKind::KEYWORD));
        match &finish.text_edit {
            Some(CompletionTextEdit::Edit(edit)) => {
                assert_eq!(edit.range, Range::new(Position::new(0, 1), Position::new(0, 4)));
                assert_eq!(edit.new_text, "finish");
            }
            other => panic!("unexpected edit {other:?}"),
        }
    }

    #[test]
    fn test_complete_labels_and_scenes() {
        let snap = project(&[
            ("file:///g/startup.txt", "*scene_list\n  startup\n  chapter1\n  chapter2\n"),
            ("file:///g/chapter1.txt", "*label top\n*goto \n*goto_scene \n*goto_scene chapter2 \n"),
            ("file:///g/chapter2.txt", "*label fight\n*label flee\n"),
        ]);
        let uri = "file:///g/chapter1.txt";
        assert_eq!(labels_at(&snap, uri, 1, 6), vec!["top"]);
        assert_eq!(labels_at(&snap, uri, 2, 12), vec!["chapter1", "chapter2", "startup"]);
        assert_eq!(labels_at(&snap, uri, 3, 21), vec!["fight", "flee"]);
    }

    #[test]
    fn test_complete_variables_locals_first() {
        let snap = project(&[
            ("file:///g/startup.txt", "*create strength 10\n*create gold 0\n"),
            ("file:///g/chapter1.txt", "*temp gold 5\n*temp torch true\n*set \n"),
        ]);
        let uri = "file:///g/chapter1.txt".parse().unwrap();
        let items = complete(&snap, &uri, Position::new(2, 5));
        let variables: Vec<_> = items
            .iter()
            .filter(|i| i.kind == Some(CompletionItemKind::VARIABLE))
            .map(|i| (i.label.as_str(), i.sort_text.clone().unwrap()))
            .collect();
        assert_eq!(
            variables,
            vec![
                ("gold", "0_gold".to_string()),
                ("torch", "0_torch".to_string()),
                ("strength", "1_strength".to_string()),
            ]
        );
        assert!(items.iter().any(|i| i.label == "true"));
    }

    #[test]
    fn test_complete_in_prose_is_empty() {
        let snap = project(&[("file:///g/chapter1.txt", "The hero walks.\n")]);
        assert!(labels_at(&snap, "file:///g/chapter1.txt", 0, 8).is_empty());
    }
}
