//! ChoiceScript validation rules.
//!
//! This crate implements the checks run over a parsed [`Scene`]:
//!
//! - Malformed lines reported by the parser
//! - Declarations (undeclared and duplicate variables, labels, achievements)
//! - Cross-scene references (`*goto_scene` targets and their labels)
//! - Control flow (unreachable lines after `*goto`, `*finish`, ...)
//! - Spelling of prose (see [`spelling`])
//!
//! # Error Codes
//!
//! | Code | Default | Description |
//! |------|---------|-------------|
//! | undeclaredVariable | error | Variable used without `*create`/`*temp` |
//! | undeclaredLabel | error | `*goto` to a label missing from the scene |
//! | unresolvedScene | error | Scene jump to a scene that does not exist |
//! | unresolvedSceneLabel | error | Scene jump to a label missing from the target |
//! | undeclaredAchievement | error | `*achieve` without `*achievement` |
//! | duplicateLabel | error | Label declared twice |
//! | duplicateVariable | warning | Variable declared twice (lint) |
//! | unreachableCode | warning | Line after a jump (lint) |
//! | malformedCommand | error | Missing argument, invalid name, stray option |
//! | unknownCommand | error | `*command` ChoiceScript does not know |
//! | emptyBlock | error | Block without a body |
//! | indentation | warning | Unexpected or inconsistent indentation (lint) |
//! | createOutsideStartup | error | `*create` outside `startup.txt` |
//! | badSpelling | info | Word not in any dictionary |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dictionary;
pub mod spelling;

use choicescript_parser::{commands, Node, NodeKind, OccurrenceKind, ParseErrorKind, Scene, Span};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub use dictionary::{DictionaryError, UserDictionary};
pub use spelling::{Dictionary, DictionaryLanguage, SpellChecker, SpellcheckOptions};

/// Name of the scene that declares globals.
pub const STARTUP_SCENE: &str = "startup";

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // === Declarations ===
    /// A variable is read or written but never declared.
    UndeclaredVariable,
    /// A `*goto`/`*gosub` target does not exist in the scene.
    UndeclaredLabel,
    /// An `*achieve` names an achievement that was never declared.
    UndeclaredAchievement,
    /// A label is declared more than once.
    DuplicateLabel,
    /// A variable is declared more than once.
    DuplicateVariable,
    /// `*create` appears outside the startup scene.
    CreateOutsideStartup,

    // === Cross-scene references ===
    /// A scene jump names a scene that does not exist.
    UnresolvedScene,
    /// A scene jump names a label missing from its target scene.
    UnresolvedSceneLabel,

    // === Structure ===
    /// Code that can never run.
    UnreachableCode,
    /// A command with bad arguments or in the wrong place.
    MalformedCommand,
    /// An unknown `*command`.
    UnknownCommand,
    /// A block opener without a body.
    EmptyBlock,
    /// Indentation problems.
    Indentation,

    // === Spelling ===
    /// A word missing from every dictionary.
    BadSpelling,
}

impl ErrorCode {
    /// Every code, in documentation order.
    pub const ALL: [Self; 14] = [
        Self::UndeclaredVariable,
        Self::UndeclaredLabel,
        Self::UnresolvedScene,
        Self::UnresolvedSceneLabel,
        Self::UndeclaredAchievement,
        Self::DuplicateLabel,
        Self::DuplicateVariable,
        Self::UnreachableCode,
        Self::MalformedCommand,
        Self::UnknownCommand,
        Self::EmptyBlock,
        Self::Indentation,
        Self::CreateOutsideStartup,
        Self::BadSpelling,
    ];

    /// Get the stable code string (e.g., "badSpelling").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UndeclaredVariable => "undeclaredVariable",
            Self::UndeclaredLabel => "undeclaredLabel",
            Self::UndeclaredAchievement => "undeclaredAchievement",
            Self::DuplicateLabel => "duplicateLabel",
            Self::DuplicateVariable => "duplicateVariable",
            Self::CreateOutsideStartup => "createOutsideStartup",
            Self::UnresolvedScene => "unresolvedScene",
            Self::UnresolvedSceneLabel => "unresolvedSceneLabel",
            Self::UnreachableCode => "unreachableCode",
            Self::MalformedCommand => "malformedCommand",
            Self::UnknownCommand => "unknownCommand",
            Self::EmptyBlock => "emptyBlock",
            Self::Indentation => "indentation",
            Self::BadSpelling => "badSpelling",
        }
    }

    /// Look up a code by its string.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Check if this is a lint (style) check, disabled with `lint.enabled = false`.
    #[must_use]
    pub const fn is_lint(&self) -> bool {
        matches!(
            self,
            Self::UnreachableCode | Self::DuplicateVariable | Self::Indentation
        )
    }

    /// Get the default severity level.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::DuplicateVariable | Self::UnreachableCode | Self::Indentation => {
                Severity::Warning
            }
            Self::BadSpelling => Severity::Info,
            _ => Severity::Error,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Severity level for validation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The scene will fail at runtime.
    Error,
    /// Suspicious but runnable.
    Warning,
    /// Informational only.
    Info,
    /// A subtle hint.
    Hint,
}

/// Configured level of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintLevel {
    /// Do not report.
    Ignore,
    /// Report as a hint.
    Hint,
    /// Report as information.
    Info,
    /// Report as a warning.
    Warning,
    /// Report as an error.
    Error,
}

impl LintLevel {
    /// The severity to report at, or `None` for [`LintLevel::Ignore`].
    #[must_use]
    pub const fn severity(self) -> Option<Severity> {
        match self {
            Self::Ignore => None,
            Self::Hint => Some(Severity::Hint),
            Self::Info => Some(Severity::Info),
            Self::Warning => Some(Severity::Warning),
            Self::Error => Some(Severity::Error),
        }
    }
}

impl From<Severity> for LintLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => Self::Error,
            Severity::Warning => Self::Warning,
            Severity::Info => Self::Info,
            Severity::Hint => Self::Hint,
        }
    }
}

/// Per-rule levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LintOptions {
    /// Whether lint-class rules run at all.
    pub enabled: bool,
    /// Level of `undeclaredVariable`.
    pub undeclared_variable: LintLevel,
    /// Level of `undeclaredLabel`.
    pub undeclared_label: LintLevel,
    /// Level of `unresolvedScene`.
    pub unresolved_scene: LintLevel,
    /// Level of `unresolvedSceneLabel`.
    pub unresolved_scene_label: LintLevel,
    /// Level of `undeclaredAchievement`.
    pub undeclared_achievement: LintLevel,
    /// Level of `duplicateLabel`.
    pub duplicate_label: LintLevel,
    /// Level of `duplicateVariable`.
    pub duplicate_variable: LintLevel,
    /// Level of `unreachableCode`.
    pub unreachable_code: LintLevel,
    /// Level of `malformedCommand`.
    pub malformed_command: LintLevel,
    /// Level of `unknownCommand`.
    pub unknown_command: LintLevel,
    /// Level of `emptyBlock`.
    pub empty_block: LintLevel,
    /// Level of `indentation`.
    pub indentation: LintLevel,
    /// Level of `createOutsideStartup`.
    pub create_outside_startup: LintLevel,
}

impl Default for LintOptions {
    fn default() -> Self {
        let level = |code: ErrorCode| LintLevel::from(code.severity());
        Self {
            enabled: true,
            undeclared_variable: level(ErrorCode::UndeclaredVariable),
            undeclared_label: level(ErrorCode::UndeclaredLabel),
            unresolved_scene: level(ErrorCode::UnresolvedScene),
            unresolved_scene_label: level(ErrorCode::UnresolvedSceneLabel),
            undeclared_achievement: level(ErrorCode::UndeclaredAchievement),
            duplicate_label: level(ErrorCode::DuplicateLabel),
            duplicate_variable: level(ErrorCode::DuplicateVariable),
            unreachable_code: level(ErrorCode::UnreachableCode),
            malformed_command: level(ErrorCode::MalformedCommand),
            unknown_command: level(ErrorCode::UnknownCommand),
            empty_block: level(ErrorCode::EmptyBlock),
            indentation: level(ErrorCode::Indentation),
            create_outside_startup: level(ErrorCode::CreateOutsideStartup),
        }
    }
}

impl LintOptions {
    /// The configured level of a rule.
    #[must_use]
    pub const fn level(&self, code: ErrorCode) -> LintLevel {
        match code {
            ErrorCode::UndeclaredVariable => self.undeclared_variable,
            ErrorCode::UndeclaredLabel => self.undeclared_label,
            ErrorCode::UnresolvedScene => self.unresolved_scene,
            ErrorCode::UnresolvedSceneLabel => self.unresolved_scene_label,
            ErrorCode::UndeclaredAchievement => self.undeclared_achievement,
            ErrorCode::DuplicateLabel => self.duplicate_label,
            ErrorCode::DuplicateVariable => self.duplicate_variable,
            ErrorCode::UnreachableCode => self.unreachable_code,
            ErrorCode::MalformedCommand => self.malformed_command,
            ErrorCode::UnknownCommand => self.unknown_command,
            ErrorCode::EmptyBlock => self.empty_block,
            ErrorCode::Indentation => self.indentation,
            ErrorCode::CreateOutsideStartup => self.create_outside_startup,
            ErrorCode::BadSpelling => LintLevel::Info,
        }
    }
}

/// Validation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Whether structural checks run at all.
    pub validate: bool,
    /// Per-rule levels.
    pub lint: LintOptions,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            validate: true,
            lint: LintOptions::default(),
        }
    }
}

impl ValidationOptions {
    /// Severity to report a code at, or `None` when the rule is off.
    #[must_use]
    pub const fn severity_for(&self, code: ErrorCode) -> Option<Severity> {
        if !self.validate || (code.is_lint() && !self.lint.enabled) {
            return None;
        }
        self.lint.level(code).severity()
    }
}

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct ValidationError {
    /// Error code.
    pub code: ErrorCode,
    /// Error message.
    pub message: String,
    /// Where the problem is.
    pub span: Span,
    /// How bad it is.
    pub severity: Severity,
}

impl ValidationError {
    /// Create a new validation error at the code's default severity.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span,
            severity: code.severity(),
        }
    }

    /// Override the severity.
    #[must_use]
    pub const fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// What validation may ask about the rest of the project.
///
/// Keys are lowercase for variables, labels and achievements. Scene names are
/// compared as written.
pub trait ProjectScope {
    /// Whether the project's global declarations are known (startup is indexed).
    fn knows_globals(&self) -> bool;

    /// Whether a global variable is declared in startup.
    fn has_global(&self, key: &str) -> bool;

    /// Whether an achievement is declared in startup.
    fn has_achievement(&self, key: &str) -> bool;

    /// Whether a scene exists in the project (indexed or listed in `*scene_list`).
    fn has_scene(&self, name: &str) -> bool;

    /// Whether an indexed scene declares a label. `None` when the scene is not indexed.
    fn scene_has_label(&self, scene: &str, key: &str) -> Option<bool>;
}

/// A project with nothing indexed.
///
/// Cross-scene checks that need project knowledge are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProject;

impl ProjectScope for NoProject {
    fn knows_globals(&self) -> bool {
        false
    }

    fn has_global(&self, _key: &str) -> bool {
        false
    }

    fn has_achievement(&self, _key: &str) -> bool {
        false
    }

    fn has_scene(&self, _name: &str) -> bool {
        false
    }

    fn scene_has_label(&self, _scene: &str, _key: &str) -> Option<bool> {
        None
    }
}

/// Inputs to [`validate`].
pub struct ValidationContext<'a> {
    /// Name of the scene being validated (file name without `.txt`).
    pub scene_name: &'a str,
    /// The rest of the project.
    pub project: &'a dyn ProjectScope,
    /// Which rules run and at what severity.
    pub options: &'a ValidationOptions,
}

/// Check whether a variable is provided by the ChoiceScript runtime.
#[must_use]
pub fn is_builtin_variable(key: &str) -> bool {
    key.starts_with("choice_") || key == "implicit_control_flow"
}

/// Validate a scene.
///
/// Returns errors ordered by position. Spelling is checked separately by
/// [`SpellChecker::check`].
#[must_use]
pub fn validate(scene: &Scene, ctx: &ValidationContext<'_>) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if !ctx.options.validate {
        return errors;
    }

    check_parse_errors(scene, &mut errors);
    check_declarations(scene, ctx, &mut errors);
    check_references(scene, ctx, &mut errors);
    check_unreachable(&scene.nodes, &mut errors);

    let mut errors: Vec<ValidationError> = errors
        .into_iter()
        .filter_map(|err| {
            let severity = ctx.options.severity_for(err.code)?;
            Some(err.with_severity(severity))
        })
        .collect();
    errors.sort_by_key(|err| err.span.start);
    errors
}

fn check_parse_errors(scene: &Scene, errors: &mut Vec<ValidationError>) {
    for err in &scene.errors {
        let code = match err.kind {
            ParseErrorKind::UnknownCommand(_) => ErrorCode::UnknownCommand,
            ParseErrorKind::EmptyBlock(_) => ErrorCode::EmptyBlock,
            ParseErrorKind::UnexpectedIndent | ParseErrorKind::InconsistentIndent => {
                ErrorCode::Indentation
            }
            _ => ErrorCode::MalformedCommand,
        };
        errors.push(ValidationError::new(code, err.message(), err.span));
    }
}

fn check_declarations(
    scene: &Scene,
    ctx: &ValidationContext<'_>,
    errors: &mut Vec<ValidationError>,
) {
    let is_startup = ctx.scene_name == STARTUP_SCENE;
    let mut labels: HashMap<String, usize> = HashMap::new();
    let mut variables: HashMap<(String, bool), usize> = HashMap::new();

    for occ in scene.declarations() {
        match occ.kind {
            OccurrenceKind::Label => {
                if let Some(first) = labels.get(&occ.key()) {
                    errors.push(ValidationError::new(
                        ErrorCode::DuplicateLabel,
                        format!(
                            "Label '{}' is already declared on line {}",
                            occ.name,
                            first + 1
                        ),
                        occ.span,
                    ));
                } else {
                    labels.insert(occ.key(), occ.line);
                }
            }
            OccurrenceKind::GlobalVariable | OccurrenceKind::LocalVariable => {
                let global = occ.kind == OccurrenceKind::GlobalVariable;
                if global && !is_startup {
                    errors.push(ValidationError::new(
                        ErrorCode::CreateOutsideStartup,
                        "'*create' is only allowed in startup.txt; use '*temp' instead",
                        occ.span,
                    ));
                }
                if let Some(first) = variables.get(&(occ.key(), global)) {
                    errors.push(ValidationError::new(
                        ErrorCode::DuplicateVariable,
                        format!(
                            "Variable '{}' is already declared on line {}",
                            occ.name,
                            first + 1
                        ),
                        occ.span,
                    ));
                } else {
                    variables.insert((occ.key(), global), occ.line);
                }
            }
            _ => {}
        }
    }
}

fn check_references(scene: &Scene, ctx: &ValidationContext<'_>, errors: &mut Vec<ValidationError>) {
    let project = ctx.project;
    let listed: Vec<&str> = scene.scene_list().map(|occ| occ.name.as_str()).collect();

    for occ in &scene.occurrences {
        match occ.kind {
            OccurrenceKind::VariableRead | OccurrenceKind::VariableWrite => {
                let key = occ.key();
                let declared = is_builtin_variable(&key)
                    || scene.find_variable(&key).is_some()
                    || !project.knows_globals()
                    || project.has_global(&key);
                if !declared {
                    errors.push(ValidationError::new(
                        ErrorCode::UndeclaredVariable,
                        format!("Variable '{}' is not declared", occ.name),
                        occ.span,
                    ));
                }
            }
            OccurrenceKind::LabelReference => {
                if scene.find_label(&occ.name).is_none() {
                    errors.push(ValidationError::new(
                        ErrorCode::UndeclaredLabel,
                        format!("Label '{}' does not exist in this scene", occ.name),
                        occ.span,
                    ));
                }
            }
            OccurrenceKind::AchievementReference => {
                let key = occ.key();
                let declared = scene
                    .occurrences_of(OccurrenceKind::Achievement)
                    .any(|decl| decl.key() == key)
                    || !project.knows_globals()
                    || project.has_achievement(&key);
                if !declared {
                    errors.push(ValidationError::new(
                        ErrorCode::UndeclaredAchievement,
                        format!("Achievement '{}' is not declared", occ.name),
                        occ.span,
                    ));
                }
            }
            OccurrenceKind::SceneReference if !occ.in_scene_list => {
                let name = occ.name.as_str();
                let exists = name.starts_with('{')
                    || name == ctx.scene_name
                    || listed.contains(&name)
                    || project.has_scene(name);
                if !exists {
                    errors.push(ValidationError::new(
                        ErrorCode::UnresolvedScene,
                        format!("Scene '{name}' does not exist"),
                        occ.span,
                    ));
                }
            }
            OccurrenceKind::SceneLabelReference => {
                let Some(target) = occ.scene.as_deref() else {
                    continue;
                };
                let has_label = if target == ctx.scene_name {
                    Some(scene.find_label(&occ.name).is_some())
                } else {
                    project.scene_has_label(target, &occ.key())
                };
                if has_label == Some(false) {
                    errors.push(ValidationError::new(
                        ErrorCode::UnresolvedSceneLabel,
                        format!("Label '{}' does not exist in scene '{target}'", occ.name),
                        occ.span,
                    ));
                }
            }
            _ => {}
        }
    }
}

/// Flag the first line after a jump in each run of unreachable siblings.
fn check_unreachable(nodes: &[Node], errors: &mut Vec<ValidationError>) {
    let mut unreachable = false;
    let mut reported = false;

    for node in nodes {
        let name = node.command_name();
        match (name, &node.kind) {
            (Some("label" | "else" | "elseif" | "elsif"), _) | (_, NodeKind::Option { .. }) => {
                unreachable = false;
                reported = false;
            }
            (Some("comment"), _) => {}
            _ if unreachable && !reported => {
                errors.push(ValidationError::new(
                    ErrorCode::UnreachableCode,
                    "Unreachable code",
                    Span::new(node.span.start, node.end_offset()),
                ));
                reported = true;
            }
            _ => {}
        }

        if name
            .and_then(commands::lookup)
            .is_some_and(|spec| spec.terminal)
        {
            unreachable = true;
        }

        check_unreachable(&node.children, errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::from_code(code.code()), Some(code));
        }
        assert_eq!(ErrorCode::from_code("nope"), None);
    }

    #[test]
    fn test_severity_for_respects_switches() {
        let mut options = ValidationOptions::default();
        assert_eq!(
            options.severity_for(ErrorCode::UnreachableCode),
            Some(Severity::Warning)
        );

        options.lint.enabled = false;
        assert_eq!(options.severity_for(ErrorCode::UnreachableCode), None);
        assert_eq!(
            options.severity_for(ErrorCode::UndeclaredLabel),
            Some(Severity::Error)
        );

        options.lint.undeclared_label = LintLevel::Ignore;
        assert_eq!(options.severity_for(ErrorCode::UndeclaredLabel), None);

        options.validate = false;
        assert_eq!(options.severity_for(ErrorCode::UnknownCommand), None);
    }

    #[test]
    fn test_builtin_variables() {
        assert!(is_builtin_variable("choice_purchased_adfree"));
        assert!(is_builtin_variable("implicit_control_flow"));
        assert!(!is_builtin_variable("strength"));
    }

    #[test]
    fn test_display() {
        let err =
            ValidationError::new(ErrorCode::UndeclaredLabel, "Label 'x' missing", Span::new(0, 1));
        assert_eq!(err.to_string(), "[undeclaredLabel] Label 'x' missing");
    }
}
