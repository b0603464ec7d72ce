//! octave-core: a table-driven parser for a small Octave subset.
//!
//! Source text goes through a mode-switching DFA lexer and an LALR(1)
//! shift-reduce driver into an arena-backed concrete syntax tree. Parsing is
//! total: malformed input produces a best-effort tree plus a list of errors.
//!
//! # Public API
//!
//! - [`parse()`] / [`parse_with()`] -- source text to [`Tree`] and [`ParseError`]s
//! - [`Tree`], [`Node`] -- the syntax tree and its cursor
//! - [`tokenize()`] -- the full-vocabulary token stream
//! - [`symbol_table()`] -- every grammar symbol with its visibility and naming
//! - [`Language`] -- the shared parse table and lexer

pub mod error;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod symbol;
pub mod table;
pub mod tree;

// ── Convenience re-exports ───────────────────────────────────────────

pub use error::ParseError;
pub use lexer::{tokenize, Point, Span, Token};
pub use parser::{parse, parse_with, ParseOptions, DEFAULT_MAX_ERRORS};
pub use symbol::{symbol_table, Symbol, SymbolInfo, TokenKind};
pub use table::Language;
pub use tree::{Node, NodeId, Tree};
