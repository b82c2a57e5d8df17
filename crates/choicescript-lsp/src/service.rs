//! The language service facade.
//!
//! [`LanguageService`] ties the project index, the configuration store and
//! the spell checker to the handlers. Every query takes the current
//! [`TextDocument`] snapshot, overlays its freshly parsed scene on the indexed
//! project, and answers from that immutable view.

use std::path::PathBuf;
use std::sync::Arc;

use choicescript_validate::{
    validate, Dictionary, DictionaryError, SpellChecker, SpellcheckOptions, UserDictionary,
    ValidationContext,
};
use lsp_types::{
    CodeActionResponse, CompletionResponse, Diagnostic, DocumentHighlight, DocumentSymbolResponse,
    ExecuteCommandParams, FoldingRange, GotoDefinitionResponse, Hover, Location, Position,
    TextEdit, Uri,
};
use parking_lot::RwLock;
use thiserror::Error;

use crate::config::ConfigStore;
use crate::db::{resolve_project_path, IndexEntry, ProjectIndex, ProjectSnapshot};
use crate::handlers::{
    code_actions, completion, definition, diagnostics, document_highlight, execute_command,
    folding, hover, on_type_formatting, references, symbols,
};
use crate::vfs::{TextDocument, LANGUAGE_ID};

/// Errors from the language service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service was created for a language it does not implement.
    #[error("unsupported language id '{0}'")]
    UnsupportedLanguage(String),
    /// An unknown or malformed command.
    #[error("invalid command '{0}'")]
    InvalidCommand(String),
    /// A dictionary command arrived while spelling is off or unavailable.
    #[error("spell checking is not available")]
    SpellingUnavailable,
    /// The user dictionary could not be written.
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),
}

/// Spell checker built from the options it was last synced with.
#[derive(Debug, Default)]
struct SpellingState {
    options: Option<SpellcheckOptions>,
    checker: Option<SpellChecker>,
}

impl SpellingState {
    /// Rebuild what changed between the synced options and `options`.
    fn sync(&mut self, options: &SpellcheckOptions) {
        let previous = self.options.replace(options.clone());

        let dictionary = match Dictionary::for_options(options) {
            Ok(dictionary) => dictionary,
            Err(err) => {
                tracing::warn!("Spelling disabled: {}", err);
                self.checker = None;
                return;
            }
        };

        let user_path_changed = previous
            .as_ref()
            .map_or(true, |p| p.user_dictionary_path != options.user_dictionary_path);
        match self.checker.as_mut() {
            Some(checker) => {
                checker.set_dictionary(dictionary);
                if user_path_changed {
                    checker.set_user_dictionary(load_user_dictionary(options));
                }
            }
            None => {
                self.checker = Some(SpellChecker::new(dictionary, load_user_dictionary(options)));
            }
        }
        tracing::info!("Spell checking with {:?} dictionary", options.dictionary);
    }
}

fn user_dictionary_path(options: &SpellcheckOptions) -> Option<PathBuf> {
    options
        .user_dictionary_path
        .clone()
        .or_else(UserDictionary::default_path)
}

fn load_user_dictionary(options: &SpellcheckOptions) -> UserDictionary {
    let Some(path) = user_dictionary_path(options) else {
        return UserDictionary::in_memory();
    };
    UserDictionary::load(path).unwrap_or_else(|err| {
        tracing::warn!("User dictionary unavailable: {}", err);
        UserDictionary::in_memory()
    })
}

/// A project-aware ChoiceScript language service.
#[derive(Debug)]
pub struct LanguageService {
    config: Arc<ConfigStore>,
    index: ProjectIndex,
    spelling: RwLock<SpellingState>,
}

impl LanguageService {
    /// Create a service for a language id.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::UnsupportedLanguage`] for anything but ChoiceScript.
    pub fn new(language_id: &str, config: Arc<ConfigStore>) -> Result<Self, ServiceError> {
        if language_id != LANGUAGE_ID {
            return Err(ServiceError::UnsupportedLanguage(language_id.to_string()));
        }
        Ok(Self {
            config,
            index: ProjectIndex::new(),
            spelling: RwLock::new(SpellingState::default()),
        })
    }

    /// The configuration store.
    pub const fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// The project index.
    pub const fn index(&self) -> &ProjectIndex {
        &self.index
    }

    // ===== Index maintenance =====

    /// Parse and install index entries for the given documents.
    pub fn update_index<'a>(&self, documents: impl IntoIterator<Item = &'a TextDocument>) {
        self.index.update(documents);
    }

    /// Remove one document from the index.
    pub fn remove_index(&self, uri: &Uri) {
        self.index.purge([uri]);
    }

    /// Remove several documents from the index.
    pub fn purge_project<'a>(&self, uris: impl IntoIterator<Item = &'a Uri>) {
        self.index.purge(uris);
    }

    /// The document's project with its current text overlaid.
    pub fn snapshot(&self, document: &TextDocument) -> ProjectSnapshot {
        self.index
            .snapshot(resolve_project_path(document.uri().as_str()))
            .with_document(IndexEntry::from_document(document))
    }

    // ===== Queries =====

    /// Hover information at a position.
    pub fn do_hover(&self, document: &TextDocument, position: Position) -> Option<Hover> {
        hover::handle_hover(&self.snapshot(document), document.uri(), position)
    }

    /// The declaration of the symbol at a position.
    pub fn find_definition(
        &self,
        document: &TextDocument,
        position: Position,
    ) -> Option<GotoDefinitionResponse> {
        definition::handle_goto_definition(&self.snapshot(document), document.uri(), position)
    }

    /// Every occurrence of the symbol at a position, across the project.
    pub fn find_references(
        &self,
        document: &TextDocument,
        position: Position,
        include_declaration: bool,
    ) -> Option<Vec<Location>> {
        references::handle_references(
            &self.snapshot(document),
            document.uri(),
            position,
            include_declaration,
        )
    }

    /// Declarations in the document, plus the project's globals when asked.
    pub fn find_document_symbols(
        &self,
        document: &TextDocument,
        include_globals: bool,
    ) -> Option<DocumentSymbolResponse> {
        symbols::handle_document_symbols(&self.snapshot(document), document.uri(), include_globals)
    }

    /// Completion candidates at a position.
    pub fn do_complete(
        &self,
        document: &TextDocument,
        position: Position,
    ) -> Option<CompletionResponse> {
        completion::handle_completion(&self.snapshot(document), document.uri(), position)
    }

    /// Occurrences of the symbol at a position within the document.
    pub fn find_document_highlights(
        &self,
        document: &TextDocument,
        position: Position,
    ) -> Option<Vec<DocumentHighlight>> {
        document_highlight::handle_document_highlight(
            &self.snapshot(document),
            document.uri(),
            position,
        )
    }

    /// Folding ranges of the document's blocks.
    pub fn get_folding_ranges(&self, document: &TextDocument) -> Option<Vec<FoldingRange>> {
        folding::handle_folding_ranges(&self.snapshot(document), document.uri())
    }

    /// Typographic replacements after a trigger character.
    pub fn format_on_type(
        &self,
        document: &TextDocument,
        position: Position,
        ch: &str,
    ) -> Option<Vec<TextEdit>> {
        on_type_formatting::handle_on_type_formatting(&document.scene(), position, ch)
    }

    // ===== Diagnostics and spelling =====

    /// Structural and spelling diagnostics, ordered by position.
    pub fn do_validation(&self, document: &TextDocument) -> Vec<Diagnostic> {
        let settings = self.config.get();
        let snapshot = self.snapshot(document);
        let Some(entry) = snapshot.document(document.uri()) else {
            return Vec::new();
        };
        let scene = &entry.scene;

        let options = settings.diagnostics.validation();
        let ctx = ValidationContext {
            scene_name: &entry.scene_name,
            project: &snapshot,
            options: &options,
        };
        let mut errors = validate(scene, &ctx);
        if let Some(spelling) = self.with_checker(|checker| checker.check(scene)) {
            errors.extend(spelling);
        }
        errors.sort_by_key(|e| (e.span.start, e.span.end));

        tracing::debug!(
            uri = document.uri().as_str(),
            count = errors.len(),
            "validated scene"
        );
        diagnostics::errors_to_diagnostics(&errors, &scene.line_index)
    }

    /// Correction candidates for each word. Empty lists when spelling is off.
    pub fn suggest_spelling(&self, words: &[&str]) -> Vec<Vec<String>> {
        self.with_checker(|checker| checker.suggest_spelling(words))
            .unwrap_or_else(|| vec![Vec::new(); words.len()])
    }

    /// Quick fixes for the first spelling diagnostic.
    pub fn do_code_actions(
        &self,
        document: &TextDocument,
        diagnostics: &[Diagnostic],
    ) -> Option<CodeActionResponse> {
        let scene = document.scene();
        self.with_checker(|checker| {
            code_actions::handle_code_actions(document.uri(), &scene, diagnostics, checker)
        })
        .flatten()
    }

    /// Run a command. Returns whether a dictionary changed.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown commands, when spelling is unavailable, or
    /// when the user dictionary cannot be written.
    pub fn execute_command(&self, params: &ExecuteCommandParams) -> Result<bool, ServiceError> {
        let command = execute_command::parse_command(params)
            .ok_or_else(|| ServiceError::InvalidCommand(params.command.clone()))?;

        let options = self.config.get().diagnostics.spellcheck.clone();
        if !options.enabled {
            return Err(ServiceError::SpellingUnavailable);
        }
        self.sync_spelling(&options);

        let mut state = self.spelling.write();
        let checker = state.checker.as_mut().ok_or(ServiceError::SpellingUnavailable)?;
        let changed = execute_command::apply(checker, &command)?;
        tracing::info!("{:?} '{}' accepted (new: {})", command.scope, command.word, changed);
        Ok(changed)
    }

    /// Run `f` with a spell checker synced to the current options.
    fn with_checker<R>(&self, f: impl FnOnce(&SpellChecker) -> R) -> Option<R> {
        let options = self.config.get().diagnostics.spellcheck.clone();
        if !options.enabled {
            return None;
        }
        self.sync_spelling(&options);
        self.spelling.read().checker.as_ref().map(f)
    }

    fn sync_spelling(&self, options: &SpellcheckOptions) {
        if self.spelling.read().options.as_ref() == Some(options) {
            return;
        }
        let mut state = self.spelling.write();
        if state.options.as_ref() != Some(options) {
            state.sync(options);
        }
    }
}
