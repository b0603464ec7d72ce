//! Lexical analysis: source bytes to typed tokens.
//!
//! The [`Lexer`] is pulled one token at a time by the parser. Each call names
//! a [`LexMode`]: the parser state in effect picks the vocabulary, so a keyword
//! the state cannot use (e.g. `end` at top level) comes back as an identifier.
//! When a mode matches nothing the lexer falls back to the full vocabulary
//! before giving up with a [`LexError`].

mod dfa;

use crate::error::{LexError, ParseError};
use crate::symbol::{TokenKind, TokenSet};
use crate::table::Language;
use dfa::Dfa;
use serde::Serialize;
use std::fmt;

// ──────────────────────────────────────────────
// Spans and points
// ──────────────────────────────────────────────

/// A half-open byte range into the source text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// A zero-width span at `offset`.
    pub fn empty(offset: usize) -> Self {
        Span::new(offset, offset)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The smallest span covering both.
    pub fn cover(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// The covered text, or `""` if the span does not fall on char boundaries.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start..self.end).unwrap_or_default()
    }

    pub fn start_point(&self, source: &str) -> Point {
        Point::at(source, self.start)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A zero-based row/column position. Columns count bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

impl Point {
    pub fn at(source: &str, offset: usize) -> Point {
        let prefix = &source.as_bytes()[..offset.min(source.len())];
        let row = prefix.iter().filter(|&&b| b == b'\n').count();
        let line_start = prefix
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        Point {
            row,
            column: prefix.len() - line_start,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row + 1, self.column + 1)
    }
}

// ──────────────────────────────────────────────
// Tokens
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }

    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        self.span.text(source)
    }
}

/// Selects the DFA entry state, and with it the token vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LexMode(pub(crate) u16);

impl LexMode {
    /// Every token of the language is recognized.
    pub const FULL: LexMode = LexMode(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ──────────────────────────────────────────────
// Lexer
// ──────────────────────────────────────────────

/// The tokenizer: an immutable DFA with one entry state per lex mode.
#[derive(Debug)]
pub struct Lexer {
    dfa: Dfa,
}

impl Lexer {
    /// Build a lexer whose mode `i` recognizes `vocabularies[i]`.
    ///
    /// Mode 0 is always the full vocabulary; it is inserted when the first
    /// entry is something else.
    pub fn new(vocabularies: &[TokenSet]) -> Lexer {
        let mut modes = Vec::with_capacity(vocabularies.len() + 1);
        if vocabularies.first() != Some(&TokenSet::ALL) {
            modes.push(TokenSet::ALL);
        }
        modes.extend_from_slice(vocabularies);
        Lexer {
            dfa: Dfa::build(&modes),
        }
    }

    /// A lexer with only the full vocabulary mode.
    pub fn full() -> Lexer {
        Lexer::new(&[TokenSet::ALL])
    }

    pub fn mode_count(&self) -> usize {
        self.dfa.mode_count()
    }

    pub fn state_count(&self) -> usize {
        self.dfa.state_count()
    }

    pub fn vocabulary(&self, mode: LexMode) -> TokenSet {
        self.dfa.vocabulary(mode)
    }

    /// Lex one token starting at `position`.
    ///
    /// Returns the end-of-input token once only whitespace remains. The next
    /// position is the returned token's `span.end`.
    pub fn next_token(&self, source: &[u8], position: usize, mode: LexMode) -> Result<Token, LexError> {
        if mode != LexMode::FULL {
            if let Ok(token) = self.dfa.run(source, position, mode) {
                if token.kind == TokenKind::Eof || self.vocabulary(mode).contains(token.kind) {
                    return Ok(token);
                }
            }
        }
        self.dfa
            .run(source, position, LexMode::FULL)
            .map_err(|start| LexError {
                span: Span::new(start, start + char_width(source, start)),
            })
    }
}

/// Width of the UTF-8 sequence starting at `offset`, clamped to the buffer.
fn char_width(source: &[u8], offset: usize) -> usize {
    let width = match source.get(offset) {
        Some(b) if *b < 0x80 => 1,
        Some(b) if *b >= 0xF0 => 4,
        Some(b) if *b >= 0xE0 => 3,
        Some(b) if *b >= 0xC0 => 2,
        Some(_) => 1,
        None => 0,
    };
    width.min(source.len() - offset.min(source.len()))
}

/// Lex the whole input in full mode.
///
/// The token list always ends with the end-of-input token. Unrecognized
/// characters are skipped and reported.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<ParseError>) {
    let lexer = &Language::get().lexer;
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut pos = 0;
    loop {
        match lexer.next_token(bytes, pos, LexMode::FULL) {
            Ok(token) => {
                tokens.push(token);
                if token.kind == TokenKind::Eof {
                    return (tokens, errors);
                }
                pos = token.span.end;
            }
            Err(e) => {
                pos = e.span.end;
                errors.push(ParseError::lex(e.span, source));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = tokenize(source);
        assert!(errors.is_empty(), "{errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_input_yields_only_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds(" \n\t "), vec![TokenKind::Eof]);
    }

    #[test]
    fn endpoint_is_one_identifier() {
        let (tokens, _) = tokenize("endpoint = 1;");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text("endpoint = 1;"), "endpoint");
        assert_eq!(
            kinds("endpoint = 1;"),
            vec![
                TokenKind::Identifier,
                TokenKind::Eq,
                TokenKind::Number,
                TokenKind::Semi,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn every_token_kind_is_recognized() {
        assert_eq!(
            kinds("= ; function endfunction end ( ) , bool { } if endif else x 42"),
            TokenKind::ALL[1..]
                .iter()
                .copied()
                .chain([TokenKind::Eof])
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn spans_increase_and_never_overlap() {
        let (tokens, _) = tokenize("function f(a,b)\n  x = 10;\nend");
        for pair in tokens.windows(2) {
            assert!(pair[0].span.end <= pair[1].span.start, "{pair:?}");
        }
    }

    #[test]
    fn unknown_characters_are_lex_errors_and_skipped() {
        let (tokens, errors) = tokenize("x $= 1");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].span(), Span::new(2, 3));
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Identifier, TokenKind::Eq, TokenKind::Number, TokenKind::Eof]
        );
    }

    #[test]
    fn multibyte_characters_are_skipped_whole() {
        let (tokens, errors) = tokenize("é x");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].span(), Span::new(0, 2));
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
    }

    #[test]
    fn mode_falls_back_to_full_vocabulary() {
        let expression_only = TokenSet::EMPTY
            .with(TokenKind::Identifier)
            .with(TokenKind::Number);
        let lexer = Lexer::new(&[expression_only]);
        assert_eq!(lexer.mode_count(), 2);
        let token = lexer.next_token(b" ;", 0, LexMode(1)).unwrap();
        assert_eq!(token.kind, TokenKind::Semi);
        assert_eq!(token.span, Span::new(1, 2));
        // a keyword outside the mode is read as an identifier
        let token = lexer.next_token(b"if", 0, LexMode(1)).unwrap();
        assert_eq!(token.kind, TokenKind::Identifier);
    }

    #[test]
    fn points_are_zero_based() {
        let src = "x = 1\n  y = 2";
        assert_eq!(Point::at(src, 0), Point { row: 0, column: 0 });
        assert_eq!(Point::at(src, 8), Point { row: 1, column: 2 });
        assert_eq!(Point::at(src, 8).to_string(), "2:3");
    }
}
