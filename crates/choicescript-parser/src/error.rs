//! Parse error types.
//!
//! Parse errors never abort a parse. They are collected on the [`Scene`](crate::Scene)
//! alongside a best-effort tree and surfaced later as diagnostics.

use crate::Span;
use std::fmt;

/// A parse error with location information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// The span where the error occurred.
    pub span: Span,
}

impl ParseError {
    /// Create a new parse error.
    #[must_use]
    pub const fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for ParseError {}

/// Kinds of parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A `*command` that ChoiceScript does not know.
    UnknownCommand(String),
    /// A command is missing a required argument (the command name is carried).
    MissingArgument(String),
    /// A block opener without the body it requires.
    EmptyBlock(String),
    /// A `#option` line that is not nested in a `*choice` or `*fake_choice`.
    OptionOutsideChoice,
    /// An `*else`/`*elseif` that does not follow an `*if`.
    OrphanElse(String),
    /// A line indented under something that cannot have a body.
    UnexpectedIndent,
    /// A line whose indentation does not match its siblings.
    InconsistentIndent,
    /// A `${`, `$!{` or `@{` without a closing brace.
    UnterminatedInterpolation,
    /// A string literal without a closing quote.
    UnterminatedString,
    /// A name argument that is not a valid identifier.
    InvalidName(String),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand(name) => write!(f, "unknown command '*{name}'"),
            Self::MissingArgument(cmd) => write!(f, "'*{cmd}' is missing an argument"),
            Self::EmptyBlock(what) => write!(f, "'{what}' has no body"),
            Self::OptionOutsideChoice => {
                write!(f, "option is not inside a *choice or *fake_choice")
            }
            Self::OrphanElse(cmd) => write!(f, "'*{cmd}' without a preceding *if"),
            Self::UnexpectedIndent => write!(f, "unexpected indentation"),
            Self::InconsistentIndent => write!(f, "indentation does not match previous lines"),
            Self::UnterminatedInterpolation => write!(f, "missing closing '}}'"),
            Self::UnterminatedString => write!(f, "unterminated string literal"),
            Self::InvalidName(name) => write!(f, "invalid name '{name}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new(ParseErrorKind::UnexpectedIndent, Span::new(0, 5));
        assert_eq!(err.message(), "unexpected indentation");
        assert_eq!(err.span, Span::new(0, 5));
    }

    #[test]
    fn test_error_messages() {
        let test_cases = [
            (ParseErrorKind::UnknownCommand("gto".to_string()), "'*gto'"),
            (ParseErrorKind::MissingArgument("goto".to_string()), "missing an argument"),
            (ParseErrorKind::OrphanElse("elseif".to_string()), "'*elseif'"),
            (ParseErrorKind::UnterminatedInterpolation, "closing '}'"),
        ];

        for (kind, expected_substring) in test_cases {
            let msg = format!("{kind}");
            assert!(
                msg.contains(expected_substring),
                "Expected '{expected_substring}' in '{msg}'"
            );
        }
    }
}
