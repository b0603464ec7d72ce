//! Parse errors.
//!
//! The lexer reports bytes that start no token. The driver reports a
//! lookahead with no action, once per recovery episode, and input that ends
//! before the tree is complete. None of them stop a parse.

use crate::lexer::{Point, Span};
use crate::symbol::{TokenKind, TokenSet};
use crate::table::StateId;
use serde::Serialize;
use std::fmt;

/// An input byte that begins no token, even in the full vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexError {
    pub span: Span,
}

/// A recoverable problem found while parsing. None of these abort a parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseError {
    /// Unrecognized character, skipped by the lexer.
    #[error("unrecognized character {text:?}")]
    Lex { span: Span, text: String },

    /// No automaton action for the lookahead. `span` covers every token
    /// discarded by the recovery episode that started here.
    #[error("expected {}, but found {found}", ExpectedList(.expected))]
    Syntax {
        span: Span,
        state: StateId,
        found: TokenKind,
        expected: Vec<TokenKind>,
    },

    /// Input ended inside an incomplete construct, which was force-completed.
    #[error("unexpected end of input, expected {}", ExpectedList(.expected))]
    UnexpectedEndOfInput {
        span: Span,
        state: StateId,
        expected: Vec<TokenKind>,
    },
}

impl ParseError {
    pub fn lex(span: Span, source: &str) -> Self {
        let bytes = source.as_bytes();
        let end = span.end.min(bytes.len());
        let start = span.start.min(end);
        let text = String::from_utf8_lossy(&bytes[start..end]).into_owned();
        ParseError::Lex { span, text }
    }

    pub fn syntax(span: Span, state: StateId, found: TokenKind, expected: TokenSet) -> Self {
        ParseError::Syntax {
            span,
            state,
            found,
            expected: expected.iter().collect(),
        }
    }

    pub fn unexpected_eof(offset: usize, state: StateId, expected: TokenSet) -> Self {
        ParseError::UnexpectedEndOfInput {
            span: Span::empty(offset),
            state,
            expected: expected.iter().filter(|k| *k != TokenKind::Eof).collect(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ParseError::Lex { span, .. }
            | ParseError::Syntax { span, .. }
            | ParseError::UnexpectedEndOfInput { span, .. } => *span,
        }
    }

    pub(crate) fn span_mut(&mut self) -> &mut Span {
        match self {
            ParseError::Lex { span, .. }
            | ParseError::Syntax { span, .. }
            | ParseError::UnexpectedEndOfInput { span, .. } => span,
        }
    }

    /// The automaton state the error was detected in, if any.
    pub fn state(&self) -> Option<StateId> {
        match self {
            ParseError::Lex { .. } => None,
            ParseError::Syntax { state, .. } | ParseError::UnexpectedEndOfInput { state, .. } => {
                Some(*state)
            }
        }
    }

    pub fn start_point(&self, source: &str) -> Point {
        self.span().start_point(source)
    }

    /// Serialize with every field present, plus the rendered message.
    pub fn to_json_value(&self, source: &str) -> serde_json::Value {
        let point = self.start_point(source);
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let serde_json::Value::Object(map) = &mut value {
            map.insert("message".to_owned(), self.to_string().into());
            map.insert("row".to_owned(), point.row.into());
            map.insert("column".to_owned(), point.column.into());
        }
        value
    }
}

/// Renders `a`, `a or b`, `a, b or c`.
struct ExpectedList<'a>(&'a [TokenKind]);

impl fmt::Display for ExpectedList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items = self.0;
        if items.is_empty() {
            return f.write_str("nothing");
        }
        for (i, kind) in items.iter().enumerate() {
            if i == 0 {
                write!(f, "{kind}")?;
            } else if i == items.len() - 1 {
                write!(f, " or {kind}")?;
            } else {
                write!(f, ", {kind}")?;
            }
        }
        Ok(())
    }
}
