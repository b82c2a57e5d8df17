//! Line-oriented scene parser.
//!
//! Parsing runs in three passes:
//!
//! 1. Every non-blank line is classified into a [`Node`] (command, option, text).
//! 2. Nodes are nested by indentation into a tree.
//! 3. The tree is walked with its parent context to record occurrences and
//!    structural errors.
//!
//! No pass can fail. Malformed input produces error nodes and [`ParseError`]s.

use crate::commands;
use crate::lexer::{find_option_marker, is_valid_name, matching_paren, scan_expression};
use crate::scene::{Node, NodeKind, Occurrence, OccurrenceKind, Scene};
use crate::{LineIndex, ParseError, ParseErrorKind, Span};

/// Columns a tab advances the indentation by.
pub const TAB_WIDTH: usize = 4;

/// Parse a scene's source text.
///
/// This is a pure function of `source`: parsing the same text twice yields
/// equal scenes.
#[must_use]
pub fn parse_scene(source: &str) -> Scene {
    let line_index = LineIndex::new(source);
    let lines: Vec<Node> = (0..line_index.line_count())
        .filter_map(|line| {
            let start = line_index.line_start(line)?;
            let text = line_index.line_text(line)?;
            classify_line(line, start, text)
        })
        .collect();

    let mut parser = Parser {
        source,
        line: 0,
        occurrences: Vec::new(),
        errors: Vec::new(),
    };
    let nodes = parser.build_tree(lines);
    parser.walk(&nodes, Context::default());

    let Parser {
        mut occurrences,
        mut errors,
        ..
    } = parser;
    occurrences.sort_by_key(|occ| occ.span.start);
    errors.sort_by_key(|err| err.span.start);

    Scene {
        nodes,
        occurrences,
        errors,
        line_index,
    }
}

/// Build a childless node for one line, or `None` for a blank line.
fn classify_line(line: usize, line_start: usize, text: &str) -> Option<Node> {
    let mut indent = 0;
    let mut ws = 0;
    for c in text.chars() {
        match c {
            ' ' => indent += 1,
            '\t' => indent += TAB_WIDTH,
            _ => break,
        }
        ws += 1;
    }

    let content = text[ws..].trim_end();
    if content.is_empty() {
        return None;
    }

    let start = line_start + ws;
    Some(Node {
        kind: classify_content(content, start),
        span: Span::at(start, content.len()),
        line,
        indent,
        children: Vec::new(),
    })
}

fn classify_content(content: &str, base: usize) -> NodeKind {
    if content.starts_with('#') {
        return NodeKind::Option {
            modifiers: Vec::new(),
            condition: None,
            text: Span::new(base + 1, base + content.len()),
        };
    }

    let Some(rest) = content.strip_prefix('*') else {
        return NodeKind::Text;
    };

    let name_len = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let name = rest[..name_len].to_ascii_lowercase();
    let after_name = &rest[name_len..];
    let args = after_name.trim_start();
    let args_start = base + 1 + name_len + (after_name.len() - args.len());

    if let Some(option) = option_with_modifier(&name, args, args_start) {
        return option;
    }

    if commands::lookup(&name).is_some() {
        NodeKind::Command {
            name,
            args: Span::at(args_start, args.len()),
        }
    } else {
        NodeKind::Error { name }
    }
}

/// Recognize `*if (cond) #text`, `*selectable_if (cond) #text` and reuse-modified options.
fn option_with_modifier(name: &str, args: &str, args_start: usize) -> Option<NodeKind> {
    let (condition, rest_offset) = match name {
        "if" | "selectable_if" => {
            let hash = find_option_marker(args)?;
            let condition = args[..hash].trim_end();
            if condition.is_empty() {
                return None;
            }
            (Some(Span::at(args_start, condition.len())), hash)
        }
        "disable_reuse" | "hide_reuse" | "allow_reuse" => (None, 0),
        _ => return None,
    };

    let after = &args[rest_offset..];
    let inner = after.trim_start();
    let inner_start = args_start + rest_offset + (after.len() - inner.len());

    match classify_content(inner, inner_start) {
        NodeKind::Option {
            mut modifiers,
            condition: inner_condition,
            text,
        } => {
            modifiers.insert(0, name.to_string());
            Some(NodeKind::Option {
                modifiers,
                condition: condition.or(inner_condition),
                text,
            })
        }
        _ => None,
    }
}

/// Walk context inherited from ancestors.
#[derive(Debug, Clone, Copy, Default)]
struct Context {
    /// Inside a `*choice` (possibly through `*if` blocks).
    in_choice: bool,
    /// The enclosing choice is a `*fake_choice`.
    fake: bool,
}

struct Parser<'src> {
    source: &'src str,
    /// Line of the node being visited.
    line: usize,
    occurrences: Vec<Occurrence>,
    errors: Vec<ParseError>,
}

impl Parser<'_> {
    // ===== Pass 2: indentation tree =====

    fn build_tree(&mut self, lines: Vec<Node>) -> Vec<Node> {
        let mut roots: Vec<Node> = Vec::new();
        let mut stack: Vec<Node> = Vec::new();

        for node in lines {
            while stack.last().is_some_and(|top| top.indent >= node.indent) {
                if let Some(done) = stack.pop() {
                    attach(&mut stack, &mut roots, done);
                }
            }

            let siblings = stack.last().map_or(&roots, |parent| &parent.children);
            if siblings.last().is_some_and(|prev| prev.indent != node.indent) {
                self.error(ParseErrorKind::InconsistentIndent, node.span);
            }

            stack.push(node);
        }

        while let Some(done) = stack.pop() {
            attach(&mut stack, &mut roots, done);
        }

        roots
    }

    // ===== Pass 3: occurrences and structure =====

    fn walk(&mut self, nodes: &[Node], ctx: Context) {
        let mut prev: Option<&str> = None;
        for node in nodes {
            self.visit(node, ctx, prev);
            if !node.is_command("comment") {
                prev = node.command_name();
            }
        }
    }

    fn visit(&mut self, node: &Node, ctx: Context, prev: Option<&str>) {
        self.line = node.line;

        match &node.kind {
            NodeKind::Command { name, args } => self.visit_command(node, name, *args, ctx, prev),
            NodeKind::Option {
                condition, text, ..
            } => {
                if !ctx.in_choice {
                    self.error(ParseErrorKind::OptionOutsideChoice, node.span);
                }
                if let Some(condition) = condition {
                    self.expression(*condition);
                }
                self.text_run(*text, true);
                if ctx.in_choice && !ctx.fake && node.children.is_empty() {
                    self.error(ParseErrorKind::EmptyBlock("#option".to_string()), node.span);
                }
                self.walk(&node.children, Context::default());
            }
            NodeKind::Text => {
                self.text_run(node.span, true);
                self.unexpected_children(node);
                self.walk(&node.children, Context::default());
            }
            NodeKind::Error { name } => {
                self.error(
                    ParseErrorKind::UnknownCommand(name.clone()),
                    Span::at(node.span.start, 1 + name.len()),
                );
                self.walk(&node.children, Context::default());
            }
        }
    }

    fn visit_command(
        &mut self,
        node: &Node,
        name: &str,
        args: Span,
        ctx: Context,
        prev: Option<&str>,
    ) {
        let Some(spec) = commands::lookup(name) else {
            return;
        };

        if spec.needs_argument && args.is_empty() {
            self.error(ParseErrorKind::MissingArgument(name.to_string()), node.span);
        }

        if matches!(name, "else" | "elseif" | "elsif")
            && !matches!(prev, Some("if" | "elseif" | "elsif"))
        {
            self.error(ParseErrorKind::OrphanElse(name.to_string()), node.span);
        }

        self.command_occurrences(name, args);

        match name {
            "choice" | "fake_choice" => {
                if !has_option(&node.children) {
                    self.error(ParseErrorKind::EmptyBlock(format!("*{name}")), node.span);
                }
                let inner = Context {
                    in_choice: true,
                    fake: name == "fake_choice",
                };
                self.walk(&node.children, inner);
            }
            "if" | "elseif" | "elsif" | "else" => {
                if node.children.is_empty() {
                    self.error(ParseErrorKind::EmptyBlock(format!("*{name}")), node.span);
                }
                self.walk(&node.children, ctx);
            }
            "scene_list" => self.scene_rows(node, true),
            "goto_random_scene" => self.scene_rows(node, false),
            "stat_chart" => self.stat_chart_rows(node),
            "comment" => {}
            _ if spec.block => self.walk(&node.children, Context::default()),
            _ => {
                self.unexpected_children(node);
                self.walk(&node.children, Context::default());
            }
        }
    }

    fn command_occurrences(&mut self, name: &str, args: Span) {
        let text = args.text(self.source);

        match name {
            "create" | "temp" => {
                let kind = if name == "create" {
                    OccurrenceKind::GlobalVariable
                } else {
                    OccurrenceKind::LocalVariable
                };
                if let Some((word, rest)) = split_word(text, args.start) {
                    if is_valid_name(word.text(self.source)) {
                        let value = rest.text(self.source).to_string();
                        self.push(
                            Occurrence::new(kind, word.text(self.source), word, self.line)
                                .with_value(value),
                        );
                    } else {
                        self.invalid_name(word);
                    }
                    self.expression(rest);
                }
            }
            "params" => {
                let mut rest = args;
                while let Some((word, next)) = split_word(rest.text(self.source), rest.start) {
                    self.declare_or_invalid(OccurrenceKind::LocalVariable, word);
                    rest = next;
                }
            }
            "set" | "rand" | "input_text" | "input_number" | "delete" => {
                if let Some((word, rest)) = split_word(text, args.start) {
                    if is_valid_name(word.text(self.source)) {
                        self.push(Occurrence::new(
                            OccurrenceKind::VariableWrite,
                            word.text(self.source),
                            word,
                            self.line,
                        ));
                        self.expression(rest);
                    } else {
                        // `*set {name_ref} value` and array forms
                        self.expression(args);
                    }
                }
            }
            "setref" | "if" | "elseif" | "elsif" | "selectable_if" | "print" | "gotoref"
            | "looplimit" | "delay_break" => self.expression(args),
            "goto" | "gosub" => {
                if let Some((word, rest)) = split_word(text, args.start) {
                    let target = word.text(self.source);
                    if target.starts_with('{') {
                        self.expression(word);
                    } else {
                        self.declare_or_invalid(OccurrenceKind::LabelReference, word);
                    }
                    self.expression(rest);
                }
            }
            "goto_scene" | "gosub_scene" | "redirect_scene" => {
                if let Some((scene, rest)) = split_word(text, args.start) {
                    let scene_name = scene.text(self.source).to_string();
                    self.push(Occurrence::new(
                        OccurrenceKind::SceneReference,
                        scene_name.clone(),
                        scene,
                        self.line,
                    ));
                    if let Some((label, rest)) = split_word(rest.text(self.source), rest.start) {
                        let label_text = label.text(self.source);
                        if is_valid_name(label_text) {
                            self.push(
                                Occurrence::new(
                                    OccurrenceKind::SceneLabelReference,
                                    label_text,
                                    label,
                                    self.line,
                                )
                                .with_scene(scene_name),
                            );
                        } else if !label_text.starts_with('{') {
                            self.invalid_name(label);
                        }
                        self.expression(rest);
                    }
                }
            }
            "label" => {
                if let Some((word, _)) = split_word(text, args.start) {
                    self.declare_or_invalid(OccurrenceKind::Label, word);
                }
            }
            "achievement" => {
                if let Some((word, rest)) = split_word(text, args.start) {
                    if is_valid_name(word.text(self.source)) {
                        let title = achievement_title(rest.text(self.source));
                        self.push(
                            Occurrence::new(
                                OccurrenceKind::Achievement,
                                word.text(self.source),
                                word,
                                self.line,
                            )
                            .with_value(title),
                        );
                    } else {
                        self.invalid_name(word);
                    }
                }
            }
            "achieve" => {
                if let Some((word, _)) = split_word(text, args.start) {
                    self.declare_or_invalid(OccurrenceKind::AchievementReference, word);
                }
            }
            "page_break" | "link_button" => self.text_run(args, true),
            _ => {}
        }
    }

    /// `*scene_list` and `*goto_random_scene` rows name scenes.
    fn scene_rows(&mut self, node: &Node, in_scene_list: bool) {
        for row in &node.children {
            self.line = row.line;
            let mut rest = row.span;
            while let Some((word, next)) = split_word(rest.text(self.source), rest.start) {
                // `$` and `$$` mark purchasable scenes
                if word.text(self.source).starts_with('$') {
                    rest = next;
                    continue;
                }
                let mut occ = Occurrence::new(
                    OccurrenceKind::SceneReference,
                    word.text(self.source),
                    word,
                    row.line,
                );
                occ.in_scene_list = in_scene_list;
                self.push(occ);
                break;
            }
        }
    }

    /// `*stat_chart` rows: `text var`, `percent var Label`, `opposed_pair var`.
    fn stat_chart_rows(&mut self, node: &Node) {
        for row in &node.children {
            self.line = row.line;
            let Some((kind, rest)) = split_word(row.span.text(self.source), row.span.start) else {
                continue;
            };
            if !matches!(
                kind.text(self.source).to_ascii_lowercase().as_str(),
                "text" | "percent" | "opposed_pair"
            ) {
                continue;
            }
            if let Some((var, label)) = split_word(rest.text(self.source), rest.start) {
                self.expression(var);
                self.text_run(label, true);
            }
            for pair_label in &row.children {
                self.line = pair_label.line;
                self.text_run(pair_label.span, true);
            }
        }
    }

    // ===== Expressions and text =====

    fn expression(&mut self, span: Span) {
        if span.is_empty() {
            return;
        }
        let scan = scan_expression(span.text(self.source), span.start);
        for read in scan.reads {
            self.push(Occurrence::new(
                OccurrenceKind::VariableRead,
                read.name,
                read.span,
                self.line,
            ));
        }
        for string in scan.strings {
            self.text_run(string, false);
        }
        if let Some(unterminated) = scan.unterminated_string {
            self.error(ParseErrorKind::UnterminatedString, unterminated);
        }
    }

    /// Scan prose for interpolations, recording reads and (optionally) text runs.
    fn text_run(&mut self, span: Span, emit_text: bool) {
        let text = span.text(self.source);
        let bytes = text.as_bytes();
        let mut run_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            let Some((marker_len, multireplace)) = interpolation_marker(&bytes[i..]) else {
                i += 1;
                continue;
            };

            self.emit_text(span.start + run_start, span.start + i, emit_text);

            let body_start = i + marker_len;
            let Some(close) = closing_brace(&bytes[body_start..]) else {
                self.error(
                    ParseErrorKind::UnterminatedInterpolation,
                    Span::new(span.start + i, span.end),
                );
                return;
            };

            let body = Span::at(span.start + body_start, close);
            if multireplace {
                self.multireplace(body, emit_text);
            } else {
                self.expression(body);
            }

            i = body_start + close + 1;
            run_start = i;
        }

        self.emit_text(span.start + run_start, span.end, emit_text);
    }

    /// `@{expr first|second|third}`
    fn multireplace(&mut self, body: Span, emit_text: bool) {
        let text = body.text(self.source);
        let trimmed = text.trim_start();
        let lead = text.len() - trimmed.len();

        let expr_len = if trimmed.starts_with('(') {
            matching_paren(trimmed).map_or(trimmed.len(), |close| close + 1)
        } else {
            trimmed.find(char::is_whitespace).unwrap_or(trimmed.len())
        };
        self.expression(Span::at(body.start + lead, expr_len));

        let mut option_start = body.start + lead + expr_len;
        let options = &trimmed[expr_len..];
        for segment in options.split('|') {
            self.text_run(Span::at(option_start, segment.len()), emit_text);
            option_start += segment.len() + 1;
        }
    }

    fn emit_text(&mut self, start: usize, end: usize, emit_text: bool) {
        if !emit_text || start >= end {
            return;
        }
        let span = Span::new(start, end);
        let text = span.text(self.source);
        if text.chars().any(char::is_alphabetic) {
            self.push(Occurrence::new(OccurrenceKind::Text, text, span, self.line));
        }
    }

    // ===== Helpers =====

    fn declare_or_invalid(&mut self, kind: OccurrenceKind, word: Span) {
        let name = word.text(self.source);
        if is_valid_name(name) {
            self.push(Occurrence::new(kind, name, word, self.line));
        } else {
            self.invalid_name(word);
        }
    }

    fn invalid_name(&mut self, word: Span) {
        let name = word.text(self.source).to_string();
        self.error(ParseErrorKind::InvalidName(name), word);
    }

    fn unexpected_children(&mut self, node: &Node) {
        if let Some(first) = node.children.first() {
            self.error(ParseErrorKind::UnexpectedIndent, first.span);
        }
    }

    fn push(&mut self, occurrence: Occurrence) {
        self.occurrences.push(occurrence);
    }

    fn error(&mut self, kind: ParseErrorKind, span: Span) {
        self.errors.push(ParseError::new(kind, span));
    }
}

fn attach(stack: &mut [Node], roots: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

/// Whether a choice body contains an option, looking through conditionals.
fn has_option(nodes: &[Node]) -> bool {
    nodes.iter().any(|node| match &node.kind {
        NodeKind::Option { .. } => true,
        NodeKind::Command { name, .. } => {
            matches!(name.as_str(), "if" | "elseif" | "elsif" | "else")
                && has_option(&node.children)
        }
        _ => false,
    })
}

/// Split off the first whitespace-delimited word.
///
/// Returns the word's span and the span of the remaining text (leading
/// whitespace removed).
fn split_word(text: &str, base: usize) -> Option<(Span, Span)> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    let lead = text.len() - trimmed.len();
    let word_len = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    let rest = trimmed[word_len..].trim_start();
    let rest_start = base + text.len() - rest.len();
    Some((Span::at(base + lead, word_len), Span::at(rest_start, rest.len())))
}

/// `*achievement name visible points Title` carries its title after three words.
fn achievement_title(rest: &str) -> String {
    rest.split_whitespace()
        .skip(2)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Length of an interpolation opener at the start of `bytes`, and whether it is `@{`.
fn interpolation_marker(bytes: &[u8]) -> Option<(usize, bool)> {
    if bytes.starts_with(b"${") {
        Some((2, false))
    } else if bytes.starts_with(b"$!{") {
        Some((3, false))
    } else if bytes.starts_with(b"$!!{") {
        Some((4, false))
    } else if bytes.starts_with(b"@{") {
        Some((2, true))
    } else {
        None
    }
}

/// Index of the `}` closing an interpolation whose `{` was just consumed.
fn closing_brace(bytes: &[u8]) -> Option<usize> {
    let mut depth = 1usize;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(scene: &Scene, kind: OccurrenceKind) -> Vec<String> {
        scene.occurrences_of(kind).map(|o| o.name.clone()).collect()
    }

    #[test]
    fn test_classify_command() {
        let node = classify_line(0, 0, "  *goto end").unwrap();
        assert_eq!(node.indent, 2);
        assert_eq!(node.span, Span::new(2, 11));
        assert_eq!(
            node.kind,
            NodeKind::Command {
                name: "goto".to_string(),
                args: Span::new(8, 11)
            }
        );
    }

    #[test]
    fn test_classify_blank_and_tab() {
        assert!(classify_line(0, 0, "   \t ").is_none());
        assert_eq!(classify_line(0, 0, "\tHello").unwrap().indent, TAB_WIDTH);
    }

    #[test]
    fn test_classify_modified_option() {
        let node = classify_line(0, 0, "*hide_reuse *if (strength > 5) #Fight").unwrap();
        let NodeKind::Option {
            modifiers,
            condition,
            text,
        } = node.kind
        else {
            panic!("expected option");
        };
        assert_eq!(modifiers, vec!["hide_reuse", "if"]);
        assert_eq!(condition, Some(Span::new(16, 30)));
        assert_eq!(text, Span::new(32, 37));
    }

    #[test]
    fn test_plain_if_is_command() {
        let node = classify_line(0, 0, "*if (strength > 5)").unwrap();
        assert!(node.is_command("if"));
    }

    #[test]
    fn test_split_word() {
        let (word, rest) = split_word("  points  0", 10).unwrap();
        assert_eq!(word, Span::new(12, 18));
        assert_eq!(rest, Span::new(20, 21));
        assert!(split_word("   ", 0).is_none());
    }

    #[test]
    fn test_tree_nesting() {
        let scene = parse_scene("*choice\n  #Yes\n    Good.\n  #No\n    Bad.\nAfter.\n");
        assert_eq!(scene.nodes.len(), 2);
        assert_eq!(scene.nodes[0].children.len(), 2);
        assert_eq!(scene.nodes[0].children[1].children.len(), 1);
        assert_eq!(scene.nodes[0].end_line(), 4);
        assert!(scene.errors.is_empty(), "{:?}", scene.errors);
    }

    #[test]
    fn test_interpolation_reads() {
        let scene = parse_scene("Hello ${name}, you have $!{gold} coins.\n");
        assert_eq!(names(&scene, OccurrenceKind::VariableRead), vec!["name", "gold"]);
        assert_eq!(
            names(&scene, OccurrenceKind::Text),
            vec!["Hello ", ", you have ", " coins."]
        );
    }

    #[test]
    fn test_multireplace() {
        let scene = parse_scene("You feel @{happy elated|miserable}.\n");
        assert_eq!(names(&scene, OccurrenceKind::VariableRead), vec!["happy"]);
        assert!(names(&scene, OccurrenceKind::Text).contains(&"miserable".to_string()));
    }

    #[test]
    fn test_unterminated_interpolation() {
        let scene = parse_scene("Hello ${name\n");
        assert_eq!(scene.errors.len(), 1);
        assert_eq!(scene.errors[0].kind, ParseErrorKind::UnterminatedInterpolation);
    }

    #[test]
    fn test_achievement_title() {
        assert_eq!(achievement_title("visible 10 Slayer of Dragons"), "Slayer of Dragons");
    }
}
