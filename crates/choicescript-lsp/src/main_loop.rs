//! Main event loop for the LSP server.
//!
//! - Notifications are handled synchronously, in order
//! - Requests are answered from immutable project snapshots
//! - Content changes schedule debounced validation and index refreshes;
//!   the loop wakes at the earliest deadline
//! - Configuration changes arrive through a store subscription

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use lsp_types::notification::{
    DidChangeConfiguration, DidChangeTextDocument, DidChangeWatchedFiles, DidCloseTextDocument,
    DidOpenTextDocument, Notification, PublishDiagnostics,
};
use lsp_types::request::{
    CodeActionRequest, Completion, DocumentHighlightRequest, DocumentSymbolRequest,
    ExecuteCommand, FoldingRangeRequest, GotoDefinition, HoverRequest, OnTypeFormatting,
    References, Request, Shutdown,
};
use lsp_types::{
    CodeActionParams, CompletionParams, DocumentHighlightParams, DocumentOnTypeFormattingParams,
    DocumentSymbolParams, ExecuteCommandParams, FileChangeType, FoldingRangeParams,
    GotoDefinitionParams, HoverParams, PublishDiagnosticsParams, ReferenceParams, Uri,
};
use serde::{Deserialize, Serialize};

use crate::config::{ChoiceScriptSettings, ConfigChange, ModeConfiguration, SubscriptionId};
use crate::db::{resolve_project_path, SCENE_EXTENSION};
use crate::debounce::{Debouncer, Lifecycle, TaskKind};
use crate::service::LanguageService;
use crate::vfs::{TextDocument, Vfs};

/// Convert a URI to a file path.
#[cfg(not(windows))]
fn uri_to_path(uri: &Uri) -> Option<PathBuf> {
    uri.as_str().strip_prefix("file://").map(PathBuf::from)
}

/// Convert a URI to a file path (Windows version).
#[cfg(windows)]
fn uri_to_path(uri: &Uri) -> Option<PathBuf> {
    uri.as_str()
        .strip_prefix("file://")
        // Handle Windows paths like file:///C:/...
        .map(|p| p.strip_prefix('/').unwrap_or(p))
        .map(PathBuf::from)
}

/// Spelling suggestions for a list of words.
#[derive(Debug)]
pub enum SuggestSpelling {}

/// Parameters of [`SuggestSpelling`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestSpellingParams {
    /// Words to correct.
    pub words: Vec<String>,
}

impl Request for SuggestSpelling {
    type Params = SuggestSpellingParams;
    type Result = Vec<Vec<String>>;
    const METHOD: &'static str = "choicescript/suggestSpelling";
}

/// Events processed by the main loop.
#[derive(Debug)]
pub enum Event {
    /// LSP message from the client.
    Message(lsp_server::Message),
    /// The configuration store was updated.
    ConfigChanged(ConfigChange),
    /// A debounce deadline passed.
    Tick(Instant),
}

/// State managed by the main loop.
pub struct MainLoopState {
    /// Open documents.
    vfs: Vfs,
    /// Index, queries and configuration.
    service: LanguageService,
    /// Sender for outgoing LSP messages.
    sender: Sender<lsp_server::Message>,
    /// Pending validation and index refreshes.
    debouncer: Debouncer,
    /// Diagnostics state per document.
    lifecycle: Lifecycle,
    /// Configuration changes forwarded from the store.
    config_events: Receiver<ConfigChange>,
    subscription: SubscriptionId,
    /// Whether shutdown was requested.
    shutdown_requested: bool,
    /// Whether the client sent `exit`.
    exit_requested: bool,
}

impl MainLoopState {
    /// Create a new main loop state.
    pub fn new(sender: Sender<lsp_server::Message>, service: LanguageService) -> Self {
        let (config_sender, config_events) = crossbeam_channel::unbounded();
        let subscription = service.config().subscribe(move |change| {
            // The receiver lives as long as the subscription.
            let _ = config_sender.send(*change);
        });

        Self {
            vfs: Vfs::new(),
            service,
            sender,
            debouncer: Debouncer::new(),
            lifecycle: Lifecycle::new(),
            config_events,
            subscription,
            shutdown_requested: false,
            exit_requested: false,
        }
    }

    /// The language service.
    pub const fn service(&self) -> &LanguageService {
        &self.service
    }

    /// Whether the client asked the server to exit.
    pub const fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// The earliest pending debounce deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.next_deadline()
    }

    /// Handle an incoming event.
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Message(lsp_server::Message::Request(req)) => self.handle_request(req),
            Event::Message(lsp_server::Message::Notification(notif)) => {
                self.handle_notification(notif);
            }
            Event::Message(lsp_server::Message::Response(resp)) => {
                tracing::debug!("Response from client: {:?}", resp.id);
            }
            Event::ConfigChanged(change) => self.on_config_change(change),
            Event::Tick(now) => self.run_due_tasks(now),
        }
    }

    /// Apply configuration changes queued by the store subscription.
    pub fn drain_config_events(&mut self) {
        while let Ok(change) = self.config_events.try_recv() {
            self.on_config_change(change);
        }
    }

    // ===== Requests =====

    /// Handle an LSP request (expects response).
    fn handle_request(&mut self, req: lsp_server::Request) {
        let id = req.id.clone();
        let method = req.method.clone();

        let result = catch_unwind(AssertUnwindSafe(|| self.dispatch_request(req)))
            .unwrap_or_else(|_| {
                tracing::error!("Handler for {} panicked", method);
                Ok(serde_json::Value::Null)
            });

        let response = match result {
            Ok(value) => lsp_server::Response::new_ok(id, value),
            Err(msg) => {
                // MethodNotFound only for unknown methods, InternalError for handler failures
                let error_code = if msg.starts_with("Unhandled request") {
                    lsp_server::ErrorCode::MethodNotFound
                } else {
                    lsp_server::ErrorCode::InternalError
                };
                lsp_server::Response::new_err(id, error_code as i32, msg)
            }
        };

        self.send(lsp_server::Message::Response(response));
    }

    fn dispatch_request(&mut self, req: lsp_server::Request) -> Result<serde_json::Value, String> {
        match req.method.as_str() {
            Shutdown::METHOD => {
                self.shutdown_requested = true;
                Ok(serde_json::Value::Null)
            }
            Completion::METHOD => self.handle_completion_request(req),
            GotoDefinition::METHOD => self.handle_goto_definition_request(req),
            References::METHOD => self.handle_references_request(req),
            HoverRequest::METHOD => self.handle_hover_request(req),
            DocumentSymbolRequest::METHOD => self.handle_document_symbols_request(req),
            DocumentHighlightRequest::METHOD => self.handle_document_highlight_request(req),
            FoldingRangeRequest::METHOD => self.handle_folding_range_request(req),
            CodeActionRequest::METHOD => self.handle_code_action_request(req),
            ExecuteCommand::METHOD => self.handle_execute_command_request(req),
            OnTypeFormatting::METHOD => self.handle_on_type_formatting_request(req),
            SuggestSpelling::METHOD => self.handle_suggest_spelling_request(req),
            _ => {
                tracing::warn!("Unhandled request: {}", req.method);
                Err(format!("Unhandled request: {}", req.method))
            }
        }
    }

    /// Check a provider switch and fetch the document.
    ///
    /// `None` means the answer is `null`: the feature is off or the document
    /// is not open.
    fn document_for(
        &self,
        uri: &Uri,
        enabled: impl FnOnce(&ModeConfiguration) -> bool,
    ) -> Option<Arc<TextDocument>> {
        if !enabled(&self.service.config().get().mode) {
            return None;
        }
        self.vfs.get(uri)
    }

    /// Handle the textDocument/completion request.
    fn handle_completion_request(
        &self,
        req: lsp_server::Request,
    ) -> Result<serde_json::Value, String> {
        let params: CompletionParams =
            serde_json::from_value(req.params).map_err(|e| e.to_string())?;

        let position = &params.text_document_position;
        let response = self
            .document_for(&position.text_document.uri, |mode| mode.completion_items)
            .and_then(|doc| self.service.do_complete(&doc, position.position));

        serde_json::to_value(response).map_err(|e| e.to_string())
    }

    /// Handle the textDocument/definition request.
    fn handle_goto_definition_request(
        &self,
        req: lsp_server::Request,
    ) -> Result<serde_json::Value, String> {
        let params: GotoDefinitionParams =
            serde_json::from_value(req.params).map_err(|e| e.to_string())?;

        let position = &params.text_document_position_params;
        let response = self
            .document_for(&position.text_document.uri, |mode| mode.definitions)
            .and_then(|doc| self.service.find_definition(&doc, position.position));

        serde_json::to_value(response).map_err(|e| e.to_string())
    }

    /// Handle the textDocument/references request.
    fn handle_references_request(
        &self,
        req: lsp_server::Request,
    ) -> Result<serde_json::Value, String> {
        let params: ReferenceParams =
            serde_json::from_value(req.params).map_err(|e| e.to_string())?;

        let position = &params.text_document_position;
        let response = self
            .document_for(&position.text_document.uri, |mode| mode.references)
            .and_then(|doc| {
                self.service.find_references(
                    &doc,
                    position.position,
                    params.context.include_declaration,
                )
            });

        serde_json::to_value(response).map_err(|e| e.to_string())
    }

    /// Handle the textDocument/hover request.
    fn handle_hover_request(&self, req: lsp_server::Request) -> Result<serde_json::Value, String> {
        let params: HoverParams = serde_json::from_value(req.params).map_err(|e| e.to_string())?;

        let position = &params.text_document_position_params;
        let response = self
            .document_for(&position.text_document.uri, |mode| mode.hovers)
            .and_then(|doc| self.service.do_hover(&doc, position.position));

        serde_json::to_value(response).map_err(|e| e.to_string())
    }

    /// Handle the textDocument/documentSymbol request.
    fn handle_document_symbols_request(
        &self,
        req: lsp_server::Request,
    ) -> Result<serde_json::Value, String> {
        let params: DocumentSymbolParams =
            serde_json::from_value(req.params).map_err(|e| e.to_string())?;

        let response = self
            .document_for(&params.text_document.uri, |mode| mode.document_symbols)
            .and_then(|doc| self.service.find_document_symbols(&doc, false));

        serde_json::to_value(response).map_err(|e| e.to_string())
    }

    /// Handle the textDocument/documentHighlight request.
    fn handle_document_highlight_request(
        &self,
        req: lsp_server::Request,
    ) -> Result<serde_json::Value, String> {
        let params: DocumentHighlightParams =
            serde_json::from_value(req.params).map_err(|e| e.to_string())?;

        let position = &params.text_document_position_params;
        let response = self
            .document_for(&position.text_document.uri, |mode| mode.document_highlights)
            .and_then(|doc| self.service.find_document_highlights(&doc, position.position));

        serde_json::to_value(response).map_err(|e| e.to_string())
    }

    /// Handle the textDocument/foldingRange request.
    fn handle_folding_range_request(
        &self,
        req: lsp_server::Request,
    ) -> Result<serde_json::Value, String> {
        let params: FoldingRangeParams =
            serde_json::from_value(req.params).map_err(|e| e.to_string())?;

        let response = self
            .document_for(&params.text_document.uri, |mode| mode.folding_ranges)
            .and_then(|doc| self.service.get_folding_ranges(&doc));

        serde_json::to_value(response).map_err(|e| e.to_string())
    }

    /// Handle the textDocument/codeAction request.
    fn handle_code_action_request(
        &self,
        req: lsp_server::Request,
    ) -> Result<serde_json::Value, String> {
        let params: CodeActionParams =
            serde_json::from_value(req.params).map_err(|e| e.to_string())?;

        let response = self
            .document_for(&params.text_document.uri, |mode| mode.diagnostics)
            .and_then(|doc| self.service.do_code_actions(&doc, &params.context.diagnostics));

        serde_json::to_value(response).map_err(|e| e.to_string())
    }

    /// Handle the workspace/executeCommand request.
    fn handle_execute_command_request(
        &mut self,
        req: lsp_server::Request,
    ) -> Result<serde_json::Value, String> {
        let params: ExecuteCommandParams =
            serde_json::from_value(req.params).map_err(|e| e.to_string())?;

        let changed = self
            .service
            .execute_command(&params)
            .map_err(|e| e.to_string())?;
        if changed {
            self.revalidate_open_documents();
        }

        Ok(serde_json::Value::Null)
    }

    /// Handle the textDocument/onTypeFormatting request.
    fn handle_on_type_formatting_request(
        &self,
        req: lsp_server::Request,
    ) -> Result<serde_json::Value, String> {
        let params: DocumentOnTypeFormattingParams =
            serde_json::from_value(req.params).map_err(|e| e.to_string())?;

        let position = &params.text_document_position;
        let response = self
            .document_for(&position.text_document.uri, |mode| mode.auto_format)
            .and_then(|doc| self.service.format_on_type(&doc, position.position, &params.ch));

        serde_json::to_value(response).map_err(|e| e.to_string())
    }

    /// Handle the choicescript/suggestSpelling request.
    fn handle_suggest_spelling_request(
        &self,
        req: lsp_server::Request,
    ) -> Result<serde_json::Value, String> {
        let params: SuggestSpellingParams =
            serde_json::from_value(req.params).map_err(|e| e.to_string())?;

        let words: Vec<&str> = params.words.iter().map(String::as_str).collect();
        serde_json::to_value(self.service.suggest_spelling(&words)).map_err(|e| e.to_string())
    }

    // ===== Notifications =====

    /// Handle an LSP notification.
    fn handle_notification(&mut self, notif: lsp_server::Notification) {
        match notif.method.as_str() {
            DidOpenTextDocument::METHOD => {
                if let Ok(params) =
                    serde_json::from_value::<lsp_types::DidOpenTextDocumentParams>(notif.params)
                {
                    self.on_did_open(params);
                }
            }
            DidChangeTextDocument::METHOD => {
                if let Ok(params) =
                    serde_json::from_value::<lsp_types::DidChangeTextDocumentParams>(notif.params)
                {
                    self.on_did_change(params);
                }
            }
            DidCloseTextDocument::METHOD => {
                if let Ok(params) =
                    serde_json::from_value::<lsp_types::DidCloseTextDocumentParams>(notif.params)
                {
                    self.on_did_close(params);
                }
            }
            DidChangeConfiguration::METHOD => {
                if let Ok(params) =
                    serde_json::from_value::<lsp_types::DidChangeConfigurationParams>(notif.params)
                {
                    self.on_did_change_configuration(params);
                }
            }
            DidChangeWatchedFiles::METHOD => {
                if let Ok(params) =
                    serde_json::from_value::<lsp_types::DidChangeWatchedFilesParams>(notif.params)
                {
                    self.on_did_change_watched_files(params);
                }
            }
            "initialized" => {
                tracing::info!("Client initialized");
                self.register_file_watchers();
            }
            "exit" => {
                tracing::info!("Exit notification received");
                if !self.shutdown_requested {
                    tracing::warn!("Exit without shutdown");
                }
                self.exit_requested = true;
            }
            _ => {
                tracing::debug!("Unhandled notification: {}", notif.method);
            }
        }
    }

    /// Handle textDocument/didOpen notification.
    fn on_did_open(&mut self, params: lsp_types::DidOpenTextDocumentParams) {
        let item = params.text_document;
        tracing::info!("Document opened: {}", item.uri.as_str());

        let project_path = resolve_project_path(item.uri.as_str()).to_string();
        if !self.service.index().has_project(&project_path) {
            self.load_project_from_disk(&item.uri);
        }

        let doc = self
            .vfs
            .open(item.uri.clone(), item.language_id, item.version, &item.text);
        self.service.update_index([&*doc]);
        self.lifecycle.open(item.uri.as_str());
        self.validate_document(&item.uri);
    }

    /// Handle textDocument/didChange notification.
    fn on_did_change(&mut self, params: lsp_types::DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let Some(doc) = self
            .vfs
            .change(&uri, params.text_document.version, &params.content_changes)
        else {
            tracing::warn!("Change for unopened document: {}", uri.as_str());
            return;
        };

        tracing::debug!("Document changed: {} (v{})", uri.as_str(), doc.version());

        let now = Instant::now();
        self.lifecycle.changed(uri.as_str());
        self.debouncer.schedule(uri.as_str(), TaskKind::Validate, now);
        self.debouncer.schedule(uri.as_str(), TaskKind::Index, now);
    }

    /// Handle textDocument/didClose notification.
    fn on_did_close(&mut self, params: lsp_types::DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::info!("Document closed: {}", uri.as_str());

        self.debouncer.cancel_document(uri.as_str());
        self.vfs.close(&uri);
        self.lifecycle.dispose(uri.as_str());
        self.send_diagnostics(&uri, Vec::new(), None);

        // The scene still belongs to the project as saved on disk
        match read_scene(&uri) {
            Some(doc) => self.service.update_index([&doc]),
            None => self.service.remove_index(&uri),
        }
        self.revalidate_project(&uri);
    }

    /// Handle workspace/didChangeConfiguration notification.
    fn on_did_change_configuration(&mut self, params: lsp_types::DidChangeConfigurationParams) {
        if let Some(settings) = ChoiceScriptSettings::from_json(&params.settings) {
            self.service.config().replace(settings);
        }
        self.drain_config_events();
    }

    /// React to a configuration change.
    fn on_config_change(&mut self, change: ConfigChange) {
        tracing::info!("Configuration changed: {:?}", change);
        self.revalidate_open_documents();
    }

    /// Handle workspace/didChangeWatchedFiles notification.
    fn on_did_change_watched_files(&mut self, params: lsp_types::DidChangeWatchedFilesParams) {
        tracing::info!("Watched files changed: {} files", params.changes.len());

        let mut touched = false;
        for change in params.changes {
            if !change.uri.as_str().ends_with(SCENE_EXTENSION) || self.vfs.contains(&change.uri) {
                continue;
            }
            tracing::debug!("File {:?}: {:?}", change.uri.as_str(), change.typ);
            touched = true;

            if change.typ == FileChangeType::DELETED {
                self.service.remove_index(&change.uri);
            } else if let Some(doc) = read_scene(&change.uri) {
                self.service.update_index([&doc]);
            }
        }

        if touched {
            self.revalidate_open_documents();
        }
    }

    /// Register file watchers with the client.
    fn register_file_watchers(&self) {
        let watchers = vec![lsp_types::FileSystemWatcher {
            glob_pattern: lsp_types::GlobPattern::String(format!("**/*{SCENE_EXTENSION}")),
            kind: Some(lsp_types::WatchKind::all()),
        }];

        let registration = lsp_types::Registration {
            id: "file-watcher".to_string(),
            method: DidChangeWatchedFiles::METHOD.to_string(),
            register_options: Some(
                serde_json::to_value(lsp_types::DidChangeWatchedFilesRegistrationOptions {
                    watchers,
                })
                .unwrap_or_default(),
            ),
        };

        let params = lsp_types::RegistrationParams {
            registrations: vec![registration],
        };

        let request = lsp_server::Request::new(
            lsp_server::RequestId::from("register-file-watchers".to_string()),
            "client/registerCapability".to_string(),
            params,
        );

        self.send(lsp_server::Message::Request(request));
        tracing::info!("Registered file watcher for scene files");
    }

    // ===== Debounced work =====

    /// Run every debounced task due at `now`.
    pub fn run_due_tasks(&mut self, now: Instant) {
        for (uri, kind) in self.debouncer.take_due(now) {
            let Ok(uri) = uri.parse::<Uri>() else {
                continue;
            };
            match kind {
                TaskKind::Validate => self.validate_document(&uri),
                TaskKind::Index => self.refresh_index(&uri),
            }
        }
    }

    /// Re-index an open document and re-validate the rest of its project.
    fn refresh_index(&mut self, uri: &Uri) {
        let Some(doc) = self.vfs.get(uri) else {
            return;
        };
        self.service.update_index([&*doc]);
        self.revalidate_project(uri);
    }

    /// Validate the open documents of `uri`'s project, other than `uri` itself.
    fn revalidate_project(&mut self, uri: &Uri) {
        let project_path = resolve_project_path(uri.as_str());
        let others: Vec<Uri> = self
            .vfs
            .snapshots()
            .iter()
            .map(|doc| doc.uri().clone())
            .filter(|other| other != uri && resolve_project_path(other.as_str()) == project_path)
            .collect();
        for other in others {
            self.validate_document(&other);
        }
    }

    /// Validate one open document and publish its diagnostics.
    fn validate_document(&mut self, uri: &Uri) {
        let Some(doc) = self.vfs.get(uri) else {
            return;
        };
        if !self.lifecycle.begin(uri.as_str()) {
            return;
        }

        let diagnostics = if self.service.config().get().mode.diagnostics {
            self.service.do_validation(&doc)
        } else {
            Vec::new()
        };

        if self.lifecycle.finish(uri.as_str()) {
            self.send_diagnostics(uri, diagnostics, Some(doc.version()));
        }
    }

    /// Re-validate all open documents.
    fn revalidate_open_documents(&mut self) {
        let uris: Vec<Uri> = self
            .vfs
            .snapshots()
            .iter()
            .map(|doc| doc.uri().clone())
            .collect();
        for uri in uris {
            tracing::debug!("Revalidating: {}", uri.as_str());
            self.debouncer.cancel(uri.as_str(), TaskKind::Validate);
            self.validate_document(&uri);
        }
    }

    /// Index the scene files next to a document that are not open.
    fn load_project_from_disk(&self, uri: &Uri) {
        let Some(dir) = uri_to_path(uri).and_then(|path| path.parent().map(PathBuf::from)) else {
            return;
        };
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!("Not loading project from {}: {}", dir.display(), err);
                return;
            }
        };

        let project_path = resolve_project_path(uri.as_str());
        let documents: Vec<TextDocument> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                if !name.ends_with(SCENE_EXTENSION) {
                    return None;
                }
                let sibling = format!("{project_path}{name}").parse::<Uri>().ok()?;
                if &sibling == uri || self.vfs.contains(&sibling) {
                    return None;
                }
                read_scene(&sibling)
            })
            .collect();

        tracing::info!("Loaded {} scenes from {}", documents.len(), dir.display());
        self.service.update_index(&documents);
    }

    // ===== Outgoing =====

    /// Send diagnostics to the client.
    fn send_diagnostics(
        &self,
        uri: &Uri,
        diagnostics: Vec<lsp_types::Diagnostic>,
        version: Option<i32>,
    ) {
        tracing::debug!(
            "Publishing {} diagnostics for {}",
            diagnostics.len(),
            uri.as_str()
        );

        let params = PublishDiagnosticsParams {
            uri: uri.clone(),
            diagnostics,
            version,
        };

        let notif = lsp_server::Notification::new(PublishDiagnostics::METHOD.to_string(), params);
        self.send(lsp_server::Message::Notification(notif));
    }

    /// Send a message to the client.
    fn send(&self, msg: lsp_server::Message) {
        if let Err(e) = self.sender.send(msg) {
            tracing::error!("Failed to send message: {}", e);
        }
    }
}

impl Drop for MainLoopState {
    fn drop(&mut self) {
        self.service.config().unsubscribe(self.subscription);
    }
}

/// Read a scene file that is not open in the editor.
fn read_scene(uri: &Uri) -> Option<TextDocument> {
    let path = uri_to_path(uri)?;
    match std::fs::read_to_string(&path) {
        Ok(text) => Some(TextDocument::new(uri.clone(), 0, text)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("Scene file gone: {}", path.display());
            None
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {}", path.display(), err);
            None
        }
    }
}

/// Run the main loop until the client exits or disconnects.
pub fn run_main_loop(
    receiver: Receiver<lsp_server::Message>,
    sender: Sender<lsp_server::Message>,
    service: LanguageService,
) {
    let mut state = MainLoopState::new(sender, service);
    let config_events = state.config_events.clone();

    tracing::info!("Main loop started");

    loop {
        let timeout = state
            .next_deadline()
            .map_or_else(crossbeam_channel::never, crossbeam_channel::at);

        let event = crossbeam_channel::select! {
            recv(receiver) -> msg => msg.ok().map(Event::Message),
            recv(config_events) -> change => change.ok().map(Event::ConfigChanged),
            recv(timeout) -> _ => Some(Event::Tick(Instant::now())),
        };
        // Client disconnected
        let Some(event) = event else {
            break;
        };

        state.handle_event(event);
        if state.exit_requested() {
            break;
        }
    }

    tracing::info!("Main loop ended");
}
