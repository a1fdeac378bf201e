//! Tokenizer for the nanoc source language.
//!
//! Converts source text into a flat [`Token`] sequence using a longest-match
//! greedy scan, one line at a time. Line comments (`//` to end of line) and
//! blank lines are skipped before scanning. See [`Lexer::tokenize`] for the
//! entry point.
//!
//! # Examples
//!
//! ```
//! use nanoc_lex::{Lexer, TokenKind};
//! use nanoc_util::Interner;
//!
//! let mut interner = Interner::new();
//! let tokens = Lexer::new(&mut interner).tokenize("byte x = 5;").unwrap();
//! assert_eq!(tokens[0].kind, TokenKind::DataType);
//! assert_eq!(tokens.last().unwrap().kind, TokenKind::Semicolon);
//! ```

use nanoc_util::diagnostic::Handler;
use nanoc_util::error::{LexError, LexResult};
use nanoc_util::{Interner, Symbol};

/// The category a [`Token`] belongs to.
///
/// Note the language's unusual logical/bitwise split: `|` and `&` are the
/// *logical* OR/AND operators, while `||` and `&&` are *bitwise* OR/AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    If,
    Else,
    While,
    For,
    DataType,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Eq,
    Neq,
    Leq,
    Geq,
    Lt,
    Gt,
    Not,
    LogicalOr,
    LogicalAnd,
    BitwiseOr,
    BitwiseAnd,
    Shl,
    Shr,
    ParenOpen,
    ParenClose,
    BraceOpen,
    BraceClose,
    Semicolon,
    Identifier,
    ByteLiteral,
}

/// A classified lexeme. `value` is populated only for [`TokenKind::Identifier`]
/// and [`TokenKind::ByteLiteral`]; every other kind is a fixed spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: TokenValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenValue {
    None,
    Ident(Symbol),
    Byte(u8),
}

impl Token {
    fn new(kind: TokenKind, value: TokenValue) -> Self {
        Self { kind, value }
    }
}

/// Exact-spelling keyword, data-type, and punctuation tokens, tried before
/// falling back to the identifier/literal classifiers.
const EXACT_MATCHES: &[(&str, TokenKind)] = &[
    ("=", TokenKind::Assign),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("while", TokenKind::While),
    ("for", TokenKind::For),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("^", TokenKind::Caret),
    ("==", TokenKind::Eq),
    ("!=", TokenKind::Neq),
    ("<=", TokenKind::Leq),
    (">=", TokenKind::Geq),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
    ("!", TokenKind::Not),
    ("|", TokenKind::LogicalOr),
    ("&", TokenKind::LogicalAnd),
    ("||", TokenKind::BitwiseOr),
    ("&&", TokenKind::BitwiseAnd),
    ("<<", TokenKind::Shl),
    (">>", TokenKind::Shr),
    ("(", TokenKind::ParenOpen),
    (")", TokenKind::ParenClose),
    ("{", TokenKind::BraceOpen),
    ("}", TokenKind::BraceClose),
    (";", TokenKind::Semicolon),
];

const DATA_TYPE_NAMES: &[&str] = &["byte"];

fn is_whitespace(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn is_ident_boundary_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Kinds whose spelling is also a legal identifier prefix. A recorded match
/// of one of these is final: growing it into a longer identifier would
/// merge two adjoining lexemes (`for1` is `for` against `1`, not a name).
fn is_keyword_like(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::If | TokenKind::Else | TokenKind::While | TokenKind::For | TokenKind::DataType
    )
}

/// Classifies a candidate substring, returning `None` if it matches no
/// token kind at all.
fn classify(text: &str) -> Option<TokenKind> {
    if let Some(&(_, kind)) = EXACT_MATCHES.iter().find(|(lit, _)| *lit == text) {
        return Some(kind);
    }
    if DATA_TYPE_NAMES.contains(&text) {
        return Some(TokenKind::DataType);
    }
    let mut chars = text.chars();
    let first = chars.next()?;
    if first.is_ascii_digit() {
        return if text.bytes().all(|b| b.is_ascii_digit()) {
            Some(TokenKind::ByteLiteral)
        } else {
            None
        };
    }
    if first.is_ascii_alphabetic() || first == '_' {
        return if chars.clone().all(is_ident_boundary_char) {
            Some(TokenKind::Identifier)
        } else {
            None
        };
    }
    None
}

/// Tokenizes source text into a flat [`Token`] sequence, interning
/// identifiers through a caller-owned [`Interner`].
pub struct Lexer<'i> {
    interner: &'i mut Interner,
}

impl<'i> Lexer<'i> {
    pub fn new(interner: &'i mut Interner) -> Self {
        Self { interner }
    }

    /// Tokenizes the whole source text, line by line.
    pub fn tokenize(&mut self, source: &str) -> LexResult<Vec<Token>> {
        self.tokenize_inner(source, None)
    }

    /// Like [`Lexer::tokenize`], but routes non-fatal notices (a byte
    /// literal above 255 being truncated) through `handler`.
    pub fn tokenize_with_diagnostics(
        &mut self,
        source: &str,
        handler: &mut Handler,
    ) -> LexResult<Vec<Token>> {
        self.tokenize_inner(source, Some(handler))
    }

    fn tokenize_inner(
        &mut self,
        source: &str,
        mut handler: Option<&mut Handler>,
    ) -> LexResult<Vec<Token>> {
        let mut tokens = Vec::new();
        for (line_no, line) in source.lines().enumerate() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                continue;
            }
            self.tokenize_line(line, line_no + 1, handler.as_deref_mut(), &mut tokens)?;
        }
        Ok(tokens)
    }

    fn tokenize_line(
        &mut self,
        line: &str,
        line_no: usize,
        mut handler: Option<&mut Handler>,
        out: &mut Vec<Token>,
    ) -> LexResult<()> {
        let chars: Vec<char> = line.chars().collect();
        let mut start = 0usize;

        while start < chars.len() {
            if is_whitespace(chars[start]) {
                start += 1;
                continue;
            }

            // Grow the candidate one character at a time, remembering the
            // longest substring that still classifies as some token. Stop at
            // whitespace, at end of line, or when growth invalidates the
            // candidate.
            let mut end = start + 1;
            let mut last_valid: Option<(TokenKind, usize)> = None;

            while end <= chars.len() && !is_whitespace(chars[end - 1]) {
                let candidate: String = chars[start..end].iter().collect();
                match classify(&candidate) {
                    Some(TokenKind::Identifier)
                        if last_valid.is_some_and(|(k, _)| is_keyword_like(k)) =>
                    {
                        break;
                    }
                    Some(kind) => {
                        last_valid = Some((kind, end));
                        end += 1;
                    }
                    None => break,
                }
            }

            let Some((kind, matched_end)) = last_valid else {
                return Err(LexError::InvalidLexeme {
                    line: line_no,
                    column: start + 1,
                    text: chars[start..end.min(chars.len())].iter().collect(),
                });
            };

            // The next lexeme may start right where this one stopped only if
            // the two adjoining characters aren't both identifier characters.
            if matched_end < chars.len()
                && is_ident_boundary_char(chars[matched_end - 1])
                && is_ident_boundary_char(chars[matched_end])
            {
                return Err(LexError::MissingBoundary {
                    line: line_no,
                    column: start + 1,
                    lhs: chars[start..matched_end].iter().collect(),
                    rhs: chars[matched_end].to_string(),
                });
            }

            let text: String = chars[start..matched_end].iter().collect();
            let value = match kind {
                TokenKind::Identifier => TokenValue::Ident(self.interner.intern(&text)),
                TokenKind::ByteLiteral => TokenValue::Byte(parse_byte_literal(
                    &text,
                    line_no,
                    handler.as_deref_mut(),
                )),
                _ => TokenValue::None,
            };
            out.push(Token::new(kind, value));
            start = matched_end;
        }
        Ok(())
    }
}

/// Folds a digit string into its low 8 bits, warning through `handler` when
/// the written value does not fit in a byte.
fn parse_byte_literal(text: &str, line_no: usize, handler: Option<&mut Handler>) -> u8 {
    let mut low: u32 = 0;
    let mut full: u32 = 0;
    for b in text.bytes() {
        let digit = (b - b'0') as u32;
        low = (low * 10 + digit) % 256;
        full = full.saturating_mul(10).saturating_add(digit);
    }
    if full > 255 {
        if let Some(handler) = handler {
            handler.warn(format!(
                "line {line_no}: literal '{text}' does not fit in a byte, truncated to {low}"
            ));
        }
    }
    low as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut interner = Interner::new();
        Lexer::new(&mut interner)
            .tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(kinds("").is_empty());
    }

    #[test]
    fn comment_only_line_is_skipped() {
        assert!(kinds("   // a comment").is_empty());
    }

    #[test]
    fn literal_assignment() {
        use TokenKind::*;
        assert_eq!(kinds("byte x = 5;"), vec![DataType, Identifier, Assign, ByteLiteral, Semicolon]);
    }

    #[test]
    fn keyword_and_paren_need_no_separating_whitespace() {
        use TokenKind::*;
        assert_eq!(kinds("for("), vec![For, ParenOpen]);
    }

    #[test]
    fn identifier_and_digit_must_be_whitespace_separated() {
        let mut interner = Interner::new();
        let err = Lexer::new(&mut interner).tokenize("for1").unwrap_err();
        assert!(matches!(err, LexError::MissingBoundary { .. }));
    }

    #[test]
    fn literal_and_identifier_must_be_whitespace_separated() {
        let mut interner = Interner::new();
        let err = Lexer::new(&mut interner).tokenize("byte x = 5y;").unwrap_err();
        assert!(matches!(err, LexError::MissingBoundary { .. }));
    }

    #[test]
    fn keyword_prefix_does_not_grow_into_an_identifier() {
        // `whiley` would be a legal identifier spelling, but the scan commits
        // to the keyword as soon as it matches exactly.
        let mut interner = Interner::new();
        let err = Lexer::new(&mut interner).tokenize("whiley").unwrap_err();
        assert!(matches!(err, LexError::MissingBoundary { .. }));
    }

    #[test]
    fn bitwise_and_logical_operators_are_distinct() {
        use TokenKind::*;
        assert_eq!(kinds("a | b"), vec![Identifier, LogicalOr, Identifier]);
        assert_eq!(kinds("a || b"), vec![Identifier, BitwiseOr, Identifier]);
    }

    #[test]
    fn byte_literal_truncates_above_255() {
        let mut interner = Interner::new();
        let tokens = Lexer::new(&mut interner).tokenize("300").unwrap();
        assert_eq!(tokens[0].value, TokenValue::Byte(300u32 as u8));
    }

    #[test]
    fn truncated_literal_warns_through_the_handler() {
        use nanoc_util::diagnostic::Level;

        let mut interner = Interner::new();
        let mut handler = Handler::new(Level::None);
        let tokens = Lexer::new(&mut interner)
            .tokenize_with_diagnostics("x = 300;", &mut handler)
            .unwrap();
        assert_eq!(tokens[2].value, TokenValue::Byte(44));
        assert_eq!(handler.diagnostics().len(), 1);
        assert!(handler.diagnostics()[0].message.contains("truncated"));
    }

    #[test]
    fn unrecognized_character_fails() {
        let mut interner = Interner::new();
        let err = Lexer::new(&mut interner).tokenize("@").unwrap_err();
        assert!(matches!(err, LexError::InvalidLexeme { .. }));
    }

    #[test]
    fn repeated_tokenization_interns_identifiers_consistently() {
        let mut interner = Interner::new();
        let tokens = Lexer::new(&mut interner).tokenize("byte x = x;").unwrap();
        let TokenValue::Ident(first) = tokens[1].value else { panic!("expected ident") };
        let TokenValue::Ident(second) = tokens[3].value else { panic!("expected ident") };
        assert_eq!(first, second);
    }

    fn spelling(tok: &Token, interner: &Interner) -> String {
        match tok.value {
            TokenValue::Ident(s) => interner.resolve(s).to_string(),
            TokenValue::Byte(b) => b.to_string(),
            TokenValue::None => EXACT_MATCHES
                .iter()
                .find(|(_, kind)| *kind == tok.kind)
                .map(|(lit, _)| lit.to_string())
                // The one kind with a fixed spelling outside the exact-match
                // table is the data type.
                .unwrap_or_else(|| "byte".to_string()),
        }
    }

    #[test]
    fn space_separated_respelling_retokenizes_identically() {
        let src = "byte x = 5; while (x < 10) { x = (x + 1); };";
        let mut interner = Interner::new();
        let tokens = Lexer::new(&mut interner).tokenize(src).unwrap();
        let respelled = tokens
            .iter()
            .map(|t| spelling(t, &interner))
            .collect::<Vec<_>>()
            .join(" ");
        let again = Lexer::new(&mut interner).tokenize(&respelled).unwrap();
        assert_eq!(tokens, again);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn never_panics_on_arbitrary_ascii(s in "[ -~\n]{0,64}") {
            let mut interner = Interner::new();
            let _ = Lexer::new(&mut interner).tokenize(&s);
        }
    }
}
