//! Main LSP server implementation.

use std::sync::Arc;

use lsp_server::Connection;
use lsp_types::InitializeParams;

use crate::config::{ChoiceScriptSettings, ConfigStore, ModeConfiguration};
use crate::handlers::{execute_command, on_type_formatting};
use crate::main_loop::run_main_loop;
use crate::service::LanguageService;
use crate::vfs::LANGUAGE_ID;

/// The LSP server.
pub struct Server {
    /// Connection to the LSP client.
    connection: Connection,
    /// Initialize parameters from client.
    init_params: InitializeParams,
    /// The language service answering requests.
    service: LanguageService,
}

impl Server {
    /// Create a new LSP server from a connection.
    pub fn new(
        connection: Connection,
        init_params: InitializeParams,
        service: LanguageService,
    ) -> Self {
        Self {
            connection,
            init_params,
            service,
        }
    }

    /// Run the server's main loop.
    pub fn run(self) {
        tracing::info!("Starting ChoiceScript Language Server v{}", crate::VERSION);

        if let Some(folders) = &self.init_params.workspace_folders {
            if let Some(folder) = folders.first() {
                tracing::info!("Workspace root: {}", folder.uri.as_str());
            }
        }

        let (sender, receiver) = (self.connection.sender, self.connection.receiver);
        run_main_loop(receiver, sender, self.service);

        tracing::info!("Server shutdown complete");
    }
}

/// Advertise a simple provider when enabled.
fn enabled<T>(on: bool) -> Option<lsp_types::OneOf<bool, T>> {
    on.then_some(lsp_types::OneOf::Left(true))
}

/// Server capabilities for the enabled features.
pub fn capabilities(mode: &ModeConfiguration) -> lsp_types::ServerCapabilities {
    lsp_types::ServerCapabilities {
        text_document_sync: Some(lsp_types::TextDocumentSyncCapability::Kind(
            lsp_types::TextDocumentSyncKind::INCREMENTAL,
        )),
        completion_provider: mode.completion_items.then(|| lsp_types::CompletionOptions {
            trigger_characters: Some(vec![
                "*".to_string(), // Commands
                " ".to_string(), // Command arguments
                "{".to_string(), // Interpolation
            ]),
            ..Default::default()
        }),
        hover_provider: mode
            .hovers
            .then_some(lsp_types::HoverProviderCapability::Simple(true)),
        definition_provider: enabled(mode.definitions),
        references_provider: enabled(mode.references),
        document_symbol_provider: enabled(mode.document_symbols),
        document_highlight_provider: enabled(mode.document_highlights),
        folding_range_provider: mode
            .folding_ranges
            .then_some(lsp_types::FoldingRangeProviderCapability::Simple(true)),
        code_action_provider: mode.diagnostics.then(|| {
            lsp_types::CodeActionProviderCapability::Options(lsp_types::CodeActionOptions {
                code_action_kinds: Some(vec![lsp_types::CodeActionKind::QUICKFIX]),
                ..Default::default()
            })
        }),
        execute_command_provider: Some(lsp_types::ExecuteCommandOptions {
            commands: execute_command::COMMANDS
                .iter()
                .map(|c| (*c).to_string())
                .collect(),
            work_done_progress_options: Default::default(),
        }),
        document_on_type_formatting_provider: mode.auto_format.then(|| {
            lsp_types::DocumentOnTypeFormattingOptions {
                first_trigger_character: on_type_formatting::FIRST_TRIGGER_CHARACTER.to_string(),
                more_trigger_character: Some(
                    on_type_formatting::MORE_TRIGGER_CHARACTERS
                        .iter()
                        .map(|c| (*c).to_string())
                        .collect(),
                ),
            }
        }),
        ..Default::default()
    }
}

/// Start the LSP server using stdio transport.
pub fn start_stdio() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing::info!("Starting LSP server on stdio");

    let (connection, io_threads) = Connection::stdio();

    // Wait for initialize request
    let (id, params) = connection.initialize_start()?;
    let init_params: InitializeParams = serde_json::from_value(params)?;

    let settings = init_params
        .initialization_options
        .as_ref()
        .and_then(ChoiceScriptSettings::from_json)
        .unwrap_or_default();
    let capabilities = capabilities(&settings.mode);

    let config = Arc::new(ConfigStore::new(settings));
    let service = LanguageService::new(LANGUAGE_ID, config)?;

    let init_result = lsp_types::InitializeResult {
        capabilities,
        server_info: Some(lsp_types::ServerInfo {
            name: "choicescript-lsp".to_string(),
            version: Some(crate::VERSION.to_string()),
        }),
    };

    // Complete initialization handshake
    connection.initialize_finish(id, serde_json::to_value(init_result)?)?;

    tracing::info!("LSP initialized successfully");

    let server = Server::new(connection, init_params, service);
    server.run();

    // Wait for IO threads to finish
    io_threads.join()?;

    Ok(())
}
