//! Diagnostics handler for publishing validation and spelling errors.

use choicescript_parser::LineIndex;
use choicescript_validate::{Severity, ValidationError};
use lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString};

use super::utils::span_to_range;

/// Source tag on every published diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "choicescript";

/// Convert validation errors to LSP diagnostics.
pub fn errors_to_diagnostics(
    errors: &[ValidationError],
    line_index: &LineIndex,
) -> Vec<Diagnostic> {
    errors
        .iter()
        .map(|e| error_to_diagnostic(e, line_index))
        .collect()
}

/// Convert a single validation error to an LSP diagnostic.
pub fn error_to_diagnostic(error: &ValidationError, line_index: &LineIndex) -> Diagnostic {
    Diagnostic {
        range: span_to_range(line_index, error.span),
        severity: Some(severity(error.severity)),
        code: Some(NumberOrString::String(error.code.code().to_string())),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: error.message.clone(),
        related_information: None,
        tags: None,
        code_description: None,
        data: None,
    }
}

const fn severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Info => DiagnosticSeverity::INFORMATION,
        Severity::Hint => DiagnosticSeverity::HINT,
    }
}

/// The stable code string of a diagnostic, if it has one.
pub fn diagnostic_code(diagnostic: &Diagnostic) -> Option<&str> {
    match diagnostic.code.as_ref()? {
        NumberOrString::String(code) => Some(code),
        NumberOrString::Number(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use choicescript_parser::Span;
    use choicescript_validate::ErrorCode;
    use lsp_types::Position;

    #[test]
    fn test_error_to_diagnostic() {
        let index = LineIndex::new("Hello.\n*goto_scene nowhere\n");
        let error = ValidationError::new(
            ErrorCode::UnresolvedScene,
            "Unknown scene 'nowhere'",
            Span::new(19, 26),
        );
        let diagnostic = error_to_diagnostic(&error, &index);

        assert_eq!(diagnostic.range.start, Position::new(1, 12));
        assert_eq!(diagnostic.range.end, Position::new(1, 19));
        assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diagnostic_code(&diagnostic), Some("unresolvedScene"));
        assert_eq!(diagnostic.source.as_deref(), Some("choicescript"));
    }

    #[test]
    fn test_severity_override() {
        let index = LineIndex::new("teh\n");
        let error =
            ValidationError::new(ErrorCode::BadSpelling, "Unknown word 'teh'", Span::new(0, 3))
            .with_severity(Severity::Hint);
        assert_eq!(
            error_to_diagnostic(&error, &index).severity,
            Some(DiagnosticSeverity::HINT)
        );
    }
}
