//! Expression lexer using Logos.
//!
//! ChoiceScript commands are line-oriented, so the lexer only ever sees the
//! argument text of a single command (or the inside of an interpolation).
//! It produces the tokens the parser needs to find variable reads.

use logos::Logos;

use crate::Span;

/// Token types produced by the expression lexer.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t]+")]
pub enum Token<'src> {
    // ===== Literals =====
    /// An integer or decimal number.
    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number(&'src str),

    /// A double-quoted string. The slice includes the quotes.
    #[regex(r#""([^"\\]|\\.)*""#)]
    String(&'src str),

    /// A variable name, operator word or function name.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier(&'src str),

    // ===== Operators =====
    /// Fairmath addition `%+`.
    #[token("%+")]
    FairAdd,
    /// Fairmath subtraction `%-`.
    #[token("%-")]
    FairSub,
    /// `+`
    #[token("+")]
    Plus,
    /// `-`
    #[token("-")]
    Minus,
    /// `*`
    #[token("*")]
    Star,
    /// `/`
    #[token("/")]
    Slash,
    /// String concatenation `&`.
    #[token("&")]
    Amp,
    /// `=`
    #[token("=")]
    Eq,
    /// `!=`
    #[token("!=")]
    NotEq,
    /// `<`
    #[token("<")]
    Lt,
    /// `>`
    #[token(">")]
    Gt,
    /// `<=`
    #[token("<=")]
    Le,
    /// `>=`
    #[token(">=")]
    Ge,
    /// `#`, used by the inline option form of `*if`.
    #[token("#")]
    Hash,
    /// `,`
    #[token(",")]
    Comma,

    // ===== Delimiters =====
    /// `(`
    #[token("(")]
    LParen,
    /// `)`
    #[token(")")]
    RParen,
    /// `{`, starts a name-by-reference.
    #[token("{")]
    LBrace,
    /// `}`
    #[token("}")]
    RBrace,
    /// `[`, starts an array index.
    #[token("[")]
    LBracket,
    /// `]`
    #[token("]")]
    RBracket,
}

/// Words that look like identifiers but are operators, literals or built-in functions.
pub const RESERVED_WORDS: &[&str] = &[
    "and",
    "or",
    "not",
    "modulo",
    "true",
    "false",
    "round",
    "timestamp",
    "log",
    "length",
    "auto",
];

/// Check whether an identifier is a reserved word (case-insensitive).
#[must_use]
pub fn is_reserved_word(ident: &str) -> bool {
    RESERVED_WORDS
        .iter()
        .any(|word| word.eq_ignore_ascii_case(ident))
}

/// Check whether a string is a valid variable or label name.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A variable read found inside an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRef {
    /// The name as written.
    pub name: String,
    /// Absolute span of the name.
    pub span: Span,
}

/// Result of scanning one expression.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExpressionScan {
    /// Variable reads, in source order.
    pub reads: Vec<NameRef>,
    /// Absolute spans of string literal contents (without quotes).
    pub strings: Vec<Span>,
    /// Absolute span of an unterminated string literal, if one was found.
    pub unterminated_string: Option<Span>,
}

/// Scan an expression and collect its variable reads.
///
/// `base` is the byte offset of `text` in the scene source.
#[must_use]
pub fn scan_expression(text: &str, base: usize) -> ExpressionScan {
    let mut scan = ExpressionScan::default();
    let mut lexer = Token::lexer(text);

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        match result {
            Ok(Token::Identifier(ident)) if !is_reserved_word(ident) => {
                scan.reads.push(NameRef {
                    name: ident.to_string(),
                    span: Span::new(base + range.start, base + range.end),
                });
            }
            Ok(Token::String(_)) => {
                scan.strings
                    .push(Span::new(base + range.start + 1, base + range.end - 1));
            }
            Ok(_) => {}
            Err(()) => {
                if text[range.start..].starts_with('"') {
                    scan.unterminated_string =
                        Some(Span::new(base + range.start, base + text.len()));
                    break;
                }
            }
        }
    }

    scan
}

/// Find the byte index of the `)` matching the `(` at index 0 of `text`.
#[must_use]
pub fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Find the `#` that starts the option text of an `*if (cond) #text` line.
///
/// Only a `#` outside parentheses and string literals counts.
#[must_use]
pub fn find_option_marker(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '#' if depth == 0 => return Some(i),
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_names(text: &str) -> Vec<String> {
        scan_expression(text, 0)
            .reads
            .into_iter()
            .map(|r| r.name)
            .collect()
    }

    #[test]
    fn test_lex_fairmath() {
        let tokens: Vec<_> = Token::lexer("%+ 10").filter_map(Result::ok).collect();
        assert_eq!(tokens, vec![Token::FairAdd, Token::Number("10")]);
    }

    #[test]
    fn test_scan_skips_reserved_words() {
        assert_eq!(
            read_names("(strength > 10) and not(tired)"),
            vec!["strength", "tired"]
        );
        assert_eq!(read_names("round(gold / 2)"), vec!["gold"]);
    }

    #[test]
    fn test_scan_spans_are_absolute() {
        let scan = scan_expression("points + 1", 10);
        assert_eq!(scan.reads[0].span, Span::new(10, 16));
    }

    #[test]
    fn test_scan_string_contents() {
        let scan = scan_expression(r#"name & "the great""#, 0);
        assert_eq!(read_names(r#"name & "the great""#), vec!["name"]);
        assert_eq!(scan.strings, vec![Span::new(8, 17)]);
    }

    #[test]
    fn test_scan_unterminated_string() {
        let scan = scan_expression(r#"name = "Bob"#, 0);
        assert_eq!(scan.unterminated_string, Some(Span::new(7, 11)));
        assert_eq!(scan.reads.len(), 1);
    }

    #[test]
    fn test_matching_paren() {
        assert_eq!(matching_paren("(a and (b))"), Some(10));
        assert_eq!(matching_paren(r#"(name = ")")"#), Some(11));
        assert_eq!(matching_paren("(unclosed"), None);
    }

    #[test]
    fn test_find_option_marker() {
        assert_eq!(find_option_marker("(a > 1) #Fight"), Some(8));
        assert_eq!(find_option_marker(r##"(name = "#1") #Go"##), Some(14));
        assert_eq!(find_option_marker("(a > 1)"), None);
    }

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("strength"));
        assert!(is_valid_name("_hidden2"));
        assert!(!is_valid_name("2fast"));
        assert!(!is_valid_name("has-dash"));
        assert!(!is_valid_name(""));
    }
}
