//! ChoiceScript scene parser.
//!
//! This crate turns the text of one scene file into a [`Scene`]: a tree of
//! lines nested by indentation, a flat list of symbol [`Occurrence`]s, and the
//! [`ParseError`]s found along the way.
//!
//! # Features
//!
//! - Total: any input parses, malformed lines become error nodes
//! - Deterministic: equal input gives equal scenes
//! - Variable reads inside expressions and `${}`/`@{}` interpolation
//! - UTF-16 aware line index for editor positions
//!
//! # Example
//!
//! ```ignore
//! use choicescript_parser::{parse_scene, OccurrenceKind};
//!
//! let scene = parse_scene("*create points 0\n*set points + 1\n");
//! assert!(scene.errors.is_empty());
//! assert_eq!(scene.occurrences_of(OccurrenceKind::GlobalVariable).count(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod commands;
mod error;
pub mod lexer;
mod line_index;
mod parser;
mod scene;
mod span;

pub use commands::{CommandSpec, COMMANDS};
pub use error::{ParseError, ParseErrorKind};
pub use lexer::Token;
pub use line_index::LineIndex;
pub use parser::{parse_scene, TAB_WIDTH};
pub use scene::{Node, NodeKind, Occurrence, OccurrenceKind, Scene, ValueType};
pub use span::Span;
