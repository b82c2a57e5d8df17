//! LSP request and notification handlers.
//!
//! Each handler answers one request against an immutable project
//! snapshot overlaid with the queried document.

pub mod utils;

pub mod code_actions;
pub mod completion;
pub mod definition;
pub mod diagnostics;
pub mod document_highlight;
pub mod execute_command;
pub mod folding;
pub mod hover;
pub mod on_type_formatting;
pub mod references;
pub mod symbols;
