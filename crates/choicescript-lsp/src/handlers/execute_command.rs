//! Execute command handler for dictionary commands.
//!
//! Provides commands:
//! - addWordToDictionary: accept a word for the session or persist it

use choicescript_validate::{DictionaryError, SpellChecker};
use lsp_types::ExecuteCommandParams;

/// Command carried by the dictionary code actions.
pub const ADD_WORD_COMMAND: &str = "addWordToDictionary";

/// Available commands.
pub const COMMANDS: &[&str] = &[ADD_WORD_COMMAND];

/// Where an accepted word is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryScope {
    /// In memory until the server exits.
    Session,
    /// Written to the user dictionary file.
    Persistent,
}

impl DictionaryScope {
    /// The command argument naming this scope.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Persistent => "persistent",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "session" => Some(Self::Session),
            "persistent" => Some(Self::Persistent),
            _ => None,
        }
    }
}

/// A parsed `addWordToDictionary` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddWord {
    /// Where the word goes.
    pub scope: DictionaryScope,
    /// The word.
    pub word: String,
}

/// Parse an execute command request into a dictionary command.
pub fn parse_command(params: &ExecuteCommandParams) -> Option<AddWord> {
    if params.command != ADD_WORD_COMMAND {
        tracing::warn!("Unknown command: {}", params.command);
        return None;
    }
    match params.arguments.as_slice() {
        [scope, word, ..] => {
            let scope = DictionaryScope::parse(scope.as_str()?)?;
            let word = word.as_str()?.trim();
            if word.is_empty() {
                return None;
            }
            Some(AddWord {
                scope,
                word: word.to_string(),
            })
        }
        _ => {
            tracing::warn!(
                "{} expects [scope, word], got {:?}",
                ADD_WORD_COMMAND,
                params.arguments
            );
            None
        }
    }
}

/// Apply a dictionary command. Returns `false` when the word was already accepted.
///
/// # Errors
///
/// Returns an error if the user dictionary cannot be written.
pub fn apply(checker: &mut SpellChecker, command: &AddWord) -> Result<bool, DictionaryError> {
    match command.scope {
        DictionaryScope::Session => Ok(checker.ignore_for_session(&command.word)),
        DictionaryScope::Persistent => checker.add_to_user_dictionary(&command.word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use choicescript_validate::{Dictionary, UserDictionary};

    fn params(arguments: Vec<serde_json::Value>) -> ExecuteCommandParams {
        ExecuteCommandParams {
            command: ADD_WORD_COMMAND.to_string(),
            arguments,
            work_done_progress_params: Default::default(),
        }
    }

    #[test]
    fn test_parse_command() {
        let parsed = parse_command(&params(vec!["session".into(), "zorblax".into()])).unwrap();
        assert_eq!(parsed.scope, DictionaryScope::Session);
        assert_eq!(parsed.word, "zorblax");

        assert!(parse_command(&params(vec!["forever".into(), "zorblax".into()])).is_none());
        assert!(parse_command(&params(vec!["session".into()])).is_none());
        assert!(parse_command(&params(vec!["session".into(), 3.into()])).is_none());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        let mut checker = SpellChecker::new(
            Dictionary::from_word_list("the\n"),
            UserDictionary::load(&path).unwrap(),
        );

        let persist = AddWord {
            scope: DictionaryScope::Persistent,
            word: "zorblax".into(),
        };
        assert!(apply(&mut checker, &persist).unwrap());
        assert!(!apply(&mut checker, &persist).unwrap());
        assert!(checker.is_known("zorblax"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "zorblax\n");

        let session = AddWord {
            scope: DictionaryScope::Session,
            word: "grimdark".into(),
        };
        assert!(apply(&mut checker, &session).unwrap());
        assert!(!apply(&mut checker, &session).unwrap());
        assert!(checker.is_known("grimdark"));
    }
}
