//! The parsed representation of one scene file.

use serde::{Deserialize, Serialize};

use crate::{LineIndex, ParseError, Span};

/// A parsed scene.
///
/// A scene is immutable once built. Re-parsing a document builds a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    /// Top-level nodes in source order.
    pub nodes: Vec<Node>,
    /// Every declaration, reference and text run, ordered by position.
    pub occurrences: Vec<Occurrence>,
    /// Malformed constructs found while parsing.
    pub errors: Vec<ParseError>,
    /// Offset/position conversion for this scene's source.
    pub line_index: LineIndex,
}

impl Scene {
    /// The source text this scene was parsed from.
    #[must_use]
    pub fn source(&self) -> &str {
        self.line_index.source()
    }

    /// Source text covered by a span.
    #[must_use]
    pub fn text(&self, span: Span) -> &str {
        span.text(self.source())
    }

    /// The symbol occurrence covering a byte offset, ignoring text runs.
    #[must_use]
    pub fn occurrence_at(&self, offset: usize) -> Option<&Occurrence> {
        self.occurrences
            .iter()
            .find(|occ| occ.kind != OccurrenceKind::Text && occ.span.contains(offset))
    }

    /// Occurrences of a given kind.
    pub fn occurrences_of(&self, kind: OccurrenceKind) -> impl Iterator<Item = &Occurrence> {
        self.occurrences.iter().filter(move |occ| occ.kind == kind)
    }

    /// All declarations (variables, labels, achievements).
    pub fn declarations(&self) -> impl Iterator<Item = &Occurrence> {
        self.occurrences
            .iter()
            .filter(|occ| occ.kind.is_declaration())
    }

    /// Find a label declaration by name (case-insensitive).
    #[must_use]
    pub fn find_label(&self, name: &str) -> Option<&Occurrence> {
        let key = name.to_ascii_lowercase();
        self.occurrences_of(OccurrenceKind::Label)
            .find(|occ| occ.key() == key)
    }

    /// Find a variable declaration by name, preferring `*temp`/`*params` over `*create`.
    #[must_use]
    pub fn find_variable(&self, name: &str) -> Option<&Occurrence> {
        let key = name.to_ascii_lowercase();
        self.occurrences_of(OccurrenceKind::LocalVariable)
            .find(|occ| occ.key() == key)
            .or_else(|| {
                self.occurrences_of(OccurrenceKind::GlobalVariable)
                    .find(|occ| occ.key() == key)
            })
    }

    /// Scene names listed under `*scene_list`.
    pub fn scene_list(&self) -> impl Iterator<Item = &Occurrence> {
        self.occurrences
            .iter()
            .filter(|occ| occ.kind == OccurrenceKind::SceneReference && occ.in_scene_list)
    }

    /// Visit every node depth-first in source order.
    pub fn walk(&self, mut visit: impl FnMut(&Node)) {
        fn go(nodes: &[Node], visit: &mut impl FnMut(&Node)) {
            for node in nodes {
                visit(node);
                go(&node.children, visit);
            }
        }
        go(&self.nodes, &mut visit);
    }
}

/// One non-blank line of a scene and the lines indented beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// What the line is.
    pub kind: NodeKind,
    /// The line's content, excluding indentation and trailing whitespace.
    pub span: Span,
    /// Zero-based line number.
    pub line: usize,
    /// Indentation width in columns (a tab counts as four).
    pub indent: usize,
    /// Lines indented beneath this one.
    pub children: Vec<Node>,
}

impl Node {
    /// Name of the command on this line, if it is a known command.
    #[must_use]
    pub fn command_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Command { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Whether this line is the given command.
    #[must_use]
    pub fn is_command(&self, command: &str) -> bool {
        self.command_name() == Some(command)
    }

    /// Last line covered by this node and its descendants.
    #[must_use]
    pub fn end_line(&self) -> usize {
        self.children
            .last()
            .map_or(self.line, Self::end_line)
    }

    /// End offset of this node's subtree.
    #[must_use]
    pub fn end_offset(&self) -> usize {
        self.children
            .last()
            .map_or(self.span.end, Self::end_offset)
    }
}

/// Kinds of scene lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A known `*command` (name lowercased).
    Command {
        /// Command name without the `*`.
        name: String,
        /// Span of the argument text (may be empty).
        args: Span,
    },
    /// A `#option` line, possibly prefixed by `*if`/`*selectable_if`/reuse modifiers.
    Option {
        /// Modifier command names, in source order.
        modifiers: Vec<String>,
        /// Span of the `*if`/`*selectable_if` condition.
        condition: Option<Span>,
        /// Span of the option text after `#`.
        text: Span,
    },
    /// Prose.
    Text,
    /// A malformed line, kept so the tree stays complete.
    Error {
        /// The unrecognized command name.
        name: String,
    },
}

/// Kinds of symbol occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OccurrenceKind {
    /// `*create name value`.
    GlobalVariable,
    /// `*temp name value` or a `*params` name.
    LocalVariable,
    /// A variable used in an expression or interpolation.
    VariableRead,
    /// A variable assigned by `*set` and friends.
    VariableWrite,
    /// `*label name`.
    Label,
    /// `*goto name` / `*gosub name`.
    LabelReference,
    /// A scene named by `*goto_scene`, `*gosub_scene`, `*redirect_scene` or `*scene_list`.
    SceneReference,
    /// The label argument of a scene jump.
    SceneLabelReference,
    /// `*achievement name ...`.
    Achievement,
    /// `*achieve name`.
    AchievementReference,
    /// A run of prose eligible for spell checking.
    Text,
}

impl OccurrenceKind {
    /// Whether this kind declares a symbol.
    #[must_use]
    pub const fn is_declaration(self) -> bool {
        matches!(
            self,
            Self::GlobalVariable | Self::LocalVariable | Self::Label | Self::Achievement
        )
    }

    /// Whether names of this kind compare case-insensitively.
    #[must_use]
    pub const fn is_case_insensitive(self) -> bool {
        !matches!(self, Self::SceneReference | Self::Text)
    }
}

/// Inferred type of a variable's initial value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    /// A numeric literal.
    Number,
    /// A string literal.
    String,
    /// `true` or `false`.
    Boolean,
    /// Anything else.
    #[default]
    Unknown,
}

impl ValueType {
    /// Infer the type of a literal expression.
    #[must_use]
    pub fn infer(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
            Self::Boolean
        } else if value.starts_with('"') {
            Self::String
        } else if !value.is_empty() && value.parse::<f64>().is_ok() {
            Self::Number
        } else {
            Self::Unknown
        }
    }

    /// Lowercase display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single declaration, reference or text run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// What kind of occurrence this is.
    pub kind: OccurrenceKind,
    /// The name as written (or the text, for text runs).
    pub name: String,
    /// Span of the name.
    pub span: Span,
    /// Zero-based line number.
    pub line: usize,
    /// Initial value expression, for variable declarations. Title, for achievements.
    pub value: Option<String>,
    /// Inferred type of `value`.
    pub value_type: ValueType,
    /// Target scene, for scene label references.
    pub scene: Option<String>,
    /// Whether this scene reference is a `*scene_list` row.
    pub in_scene_list: bool,
}

impl Occurrence {
    /// Create an occurrence with no value.
    #[must_use]
    pub fn new(kind: OccurrenceKind, name: impl Into<String>, span: Span, line: usize) -> Self {
        Self {
            kind,
            name: name.into(),
            span,
            line,
            value: None,
            value_type: ValueType::Unknown,
            scene: None,
            in_scene_list: false,
        }
    }

    /// Attach an initial value and infer its type.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.value_type = ValueType::infer(&value);
        self.value = Some(value);
        self
    }

    /// Attach the target scene of a scene label reference.
    #[must_use]
    pub fn with_scene(mut self, scene: impl Into<String>) -> Self {
        self.scene = Some(scene.into());
        self
    }

    /// Comparison key: lowercase for variables, labels and achievements.
    #[must_use]
    pub fn key(&self) -> String {
        if self.kind.is_case_insensitive() {
            self.name.to_ascii_lowercase()
        } else {
            self.name.clone()
        }
    }
}
