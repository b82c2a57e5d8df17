//! Language Server Protocol implementation for ChoiceScript.
//!
//! This crate provides a project-aware language service for ChoiceScript
//! scene files, enabling IDE features like:
//! - Validation and spelling diagnostics with quick fixes
//! - Autocompletion for commands, labels, scenes, variables and achievements
//! - Go-to-definition and find references across the scenes of a game
//! - Hover information
//! - Document symbols, highlights and folding
//!
//! # Architecture
//!
//! - **Main loop**: Handles LSP messages, applies edits to the VFS, runs
//!   debounced validation and index refreshes
//! - **Project index**: Per-project map of parsed scenes and their exports,
//!   read through immutable snapshots
//! - **Handlers**: Pure functions answering one request against a snapshot
//! - **Language service**: Facade tying the index, configuration and spell
//!   checker to the handlers
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use choicescript_lsp::{ConfigStore, LanguageService, TextDocument};
//!
//! let config = Arc::new(ConfigStore::default());
//! let service = LanguageService::new("choicescript", config)?;
//! let doc = TextDocument::new(uri, 1, "*create points 0\n*set points + 1\n");
//! let hover = service.do_hover(&doc, lsp_types::Position::new(1, 6));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod db;
pub mod debounce;
pub mod handlers;
pub mod main_loop;
pub mod service;
pub mod vfs;

mod server;

pub use config::{ChoiceScriptSettings, ConfigStore, DiagnosticsOptions, ModeConfiguration};
pub use main_loop::run_main_loop;
pub use server::{capabilities, start_stdio, Server};
pub use service::{LanguageService, ServiceError};
pub use vfs::{TextDocument, Vfs};

/// LSP server version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
