//! Code actions handler for spelling quick fixes.
//!
//! For the first `badSpelling` diagnostic in the request, offers one
//! replacement per suggestion, then commands to ignore the word for the
//! session or add it to the user dictionary.

use std::collections::HashMap;

use choicescript_parser::Scene;
use choicescript_validate::{ErrorCode, SpellChecker};
use lsp_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, CodeActionResponse, Command, Diagnostic,
    TextEdit, Uri, WorkspaceEdit,
};

use super::diagnostics::diagnostic_code;
use super::execute_command::{DictionaryScope, ADD_WORD_COMMAND};
use super::utils::position_to_offset;

/// Handle a code action request.
pub fn handle_code_actions(
    uri: &Uri,
    scene: &Scene,
    diagnostics: &[Diagnostic],
    checker: &SpellChecker,
) -> Option<CodeActionResponse> {
    let marker = diagnostics
        .iter()
        .find(|d| diagnostic_code(d) == Some(ErrorCode::BadSpelling.code()))?;

    let start = position_to_offset(&scene.line_index, marker.range.start)?;
    let end = position_to_offset(&scene.line_index, marker.range.end)?;
    let word = scene.source().get(start..end).filter(|w| !w.is_empty())?;

    let mut actions: Vec<CodeActionOrCommand> = checker
        .suggest(word)
        .into_iter()
        .enumerate()
        .map(|(i, suggestion)| {
            CodeActionOrCommand::CodeAction(correction(uri, marker, &suggestion, i == 0))
        })
        .collect();

    actions.push(dictionary_action(
        format!("Ignore '{word}' this session"),
        DictionaryScope::Session,
        word,
        marker,
    ));
    actions.push(dictionary_action(
        format!("Add '{word}' to the User Dictionary"),
        DictionaryScope::Persistent,
        word,
        marker,
    ));

    Some(actions)
}

/// Replace the marked word with a suggestion.
#[allow(clippy::mutable_key_type)] // Uri is required as key by LSP WorkspaceEdit API
fn correction(uri: &Uri, marker: &Diagnostic, suggestion: &str, preferred: bool) -> CodeAction {
    let mut changes = HashMap::new();
    changes.insert(
        uri.clone(),
        vec![TextEdit {
            range: marker.range,
            new_text: suggestion.to_string(),
        }],
    );

    CodeAction {
        title: format!("Correct spelling: {suggestion}"),
        kind: Some(CodeActionKind::QUICKFIX),
        diagnostics: Some(vec![marker.clone()]),
        edit: Some(WorkspaceEdit {
            changes: Some(changes),
            document_changes: None,
            change_annotations: None,
        }),
        command: None,
        is_preferred: Some(preferred),
        disabled: None,
        data: None,
    }
}

fn dictionary_action(
    title: String,
    scope: DictionaryScope,
    word: &str,
    marker: &Diagnostic,
) -> CodeActionOrCommand {
    CodeActionOrCommand::CodeAction(CodeAction {
        title: title.clone(),
        kind: Some(CodeActionKind::QUICKFIX),
        diagnostics: Some(vec![marker.clone()]),
        edit: None,
        command: Some(Command {
            title,
            command: ADD_WORD_COMMAND.to_string(),
            arguments: Some(vec![
                serde_json::Value::from(scope.as_str()),
                serde_json::Value::from(word),
            ]),
        }),
        is_preferred: None,
        disabled: None,
        data: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::diagnostics::errors_to_diagnostics;
    use choicescript_parser::parse_scene;
    use choicescript_validate::{Dictionary, DictionaryLanguage, UserDictionary};

    fn checker() -> SpellChecker {
        SpellChecker::new(
            Dictionary::builtin(DictionaryLanguage::EnUs),
            UserDictionary::in_memory(),
        )
    }

    fn titles(response: &CodeActionResponse) -> Vec<String> {
        response
            .iter()
            .map(|action| match action {
                CodeActionOrCommand::CodeAction(action) => action.title.clone(),
                CodeActionOrCommand::Command(command) => command.title.clone(),
            })
            .collect()
    }

    #[test]
    fn test_spelling_quick_fix_replaces_word() {
        let uri: Uri = "file:///g/chapter1.txt".parse().unwrap();
        let scene = parse_scene("You see teh dragon.\n");
        let checker = checker();
        let diagnostics = errors_to_diagnostics(&checker.check(&scene), &scene.line_index);
        assert_eq!(diagnostics.len(), 1);

        let response = handle_code_actions(&uri, &scene, &diagnostics, &checker).unwrap();
        let titles = titles(&response);
        assert_eq!(titles[0], "Correct spelling: the");
        assert_eq!(titles[titles.len() - 2], "Ignore 'teh' this session");
        assert_eq!(titles[titles.len() - 1], "Add 'teh' to the User Dictionary");

        let CodeActionOrCommand::CodeAction(first) = &response[0] else {
            panic!("expected a code action");
        };
        let changes = first.edit.as_ref().unwrap().changes.as_ref().unwrap();
        let edits = &changes[&uri];
        assert_eq!(edits[0].range, diagnostics[0].range);
        assert_eq!(edits[0].range.start.character, 8);
        assert_eq!(edits[0].range.end.character, 11);
        assert_eq!(edits[0].new_text, "the");
    }

    #[test]
    fn test_only_first_marker_is_actioned() {
        let uri: Uri = "file:///g/chapter1.txt".parse().unwrap();
        let scene = parse_scene("teh dragn waits.\n");
        let checker = checker();
        let diagnostics = errors_to_diagnostics(&checker.check(&scene), &scene.line_index);
        assert_eq!(diagnostics.len(), 2);

        let response = handle_code_actions(&uri, &scene, &diagnostics, &checker).unwrap();
        assert!(titles(&response).iter().all(|t| !t.contains("dragn")));
    }

    #[test]
    fn test_dictionary_command_arguments() {
        let uri: Uri = "file:///g/chapter1.txt".parse().unwrap();
        let scene = parse_scene("The zorblax waits.\n");
        let checker = checker();
        let diagnostics = errors_to_diagnostics(&checker.check(&scene), &scene.line_index);

        let response = handle_code_actions(&uri, &scene, &diagnostics, &checker).unwrap();
        let CodeActionOrCommand::CodeAction(last) = response.last().unwrap() else {
            panic!("expected a code action");
        };
        let command = last.command.as_ref().unwrap();
        assert_eq!(command.command, "addWordToDictionary");
        assert_eq!(
            command.arguments,
            Some(vec![serde_json::json!("persistent"), serde_json::json!("zorblax")])
        );
    }

    #[test]
    fn test_no_spelling_marker() {
        let uri: Uri = "file:///g/chapter1.txt".parse().unwrap();
        let scene = parse_scene("Fine words.\n");
        assert!(handle_code_actions(&uri, &scene, &[], &checker()).is_none());
    }
}
