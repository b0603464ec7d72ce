//! Grammar symbols and their metadata.
//!
//! Every token kind and every nonterminal of the Octave grammar is a
//! [`Symbol`]. Ids are stable: terminals occupy `0..TOKEN_COUNT` and share
//! their id with the matching [`TokenKind`], nonterminals follow.
//!
//! Each symbol is tagged visible-or-hidden and named-or-anonymous:
//!
//! - visible + named: `identifier`, `source_file`, `if_statement`, ...
//! - visible + anonymous: keywords and punctuation (`function`, `=`, `{`)
//! - hidden + named: choice rules (`_definition`, `_statement`, `_expression`),
//!   never materialized in a tree
//! - hidden + anonymous: auxiliary repeat symbols, spliced into their parent

use serde::{Serialize, Serializer};
use std::fmt;

/// Number of terminal symbols, end-of-input included.
pub const TOKEN_COUNT: usize = 17;
/// Number of grammar symbols, terminals and nonterminals.
pub const SYMBOL_COUNT: usize = 31;

// ──────────────────────────────────────────────
// Token kinds
// ──────────────────────────────────────────────

/// The kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TokenKind {
    /// End of input sentinel, produced once the buffer is exhausted.
    Eof = 0,
    Eq,
    Semi,
    Function,
    EndFunction,
    End,
    LParen,
    RParen,
    Comma,
    Bool,
    LBrace,
    RBrace,
    If,
    EndIf,
    Else,
    /// `[a-z]+`
    Identifier,
    /// `[0-9]+`
    Number,
}

impl TokenKind {
    pub const ALL: [TokenKind; TOKEN_COUNT] = [
        TokenKind::Eof,
        TokenKind::Eq,
        TokenKind::Semi,
        TokenKind::Function,
        TokenKind::EndFunction,
        TokenKind::End,
        TokenKind::LParen,
        TokenKind::RParen,
        TokenKind::Comma,
        TokenKind::Bool,
        TokenKind::LBrace,
        TokenKind::RBrace,
        TokenKind::If,
        TokenKind::EndIf,
        TokenKind::Else,
        TokenKind::Identifier,
        TokenKind::Number,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<TokenKind> {
        TokenKind::ALL.get(index).copied()
    }

    pub fn symbol(self) -> Symbol {
        Symbol::ALL[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.symbol().name()
    }

    /// The exact spelling of a keyword, `None` for every other kind.
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            TokenKind::Function => Some("function"),
            TokenKind::EndFunction => Some("endfunction"),
            TokenKind::End => Some("end"),
            TokenKind::Bool => Some("bool"),
            TokenKind::If => Some("if"),
            TokenKind::EndIf => Some("endif"),
            TokenKind::Else => Some("else"),
            _ => None,
        }
    }

    /// The single byte a punctuation token consists of.
    pub fn punctuation(self) -> Option<u8> {
        match self {
            TokenKind::Eq => Some(b'='),
            TokenKind::Semi => Some(b';'),
            TokenKind::LParen => Some(b'('),
            TokenKind::RParen => Some(b')'),
            TokenKind::Comma => Some(b','),
            TokenKind::LBrace => Some(b'{'),
            TokenKind::RBrace => Some(b'}'),
            _ => None,
        }
    }

    pub fn is_keyword(self) -> bool {
        self.keyword().is_some()
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Eof => f.write_str("end of input"),
            TokenKind::Identifier => f.write_str("identifier"),
            TokenKind::Number => f.write_str("number"),
            other => write!(f, "'{}'", other.name()),
        }
    }
}

impl Serialize for TokenKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

// ──────────────────────────────────────────────
// Token sets
// ──────────────────────────────────────────────

/// A set of token kinds, stored as a bit mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokenSet(u32);

impl TokenSet {
    pub const EMPTY: TokenSet = TokenSet(0);
    pub const ALL: TokenSet = TokenSet((1 << TOKEN_COUNT) - 1);

    pub fn insert(&mut self, kind: TokenKind) {
        self.0 |= 1 << kind.index();
    }

    pub fn with(mut self, kind: TokenKind) -> TokenSet {
        self.insert(kind);
        self
    }

    pub fn union(self, other: TokenSet) -> TokenSet {
        TokenSet(self.0 | other.0)
    }

    pub fn contains(self, kind: TokenKind) -> bool {
        self.0 & (1 << kind.index()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = TokenKind> {
        TokenKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl FromIterator<TokenKind> for TokenSet {
    fn from_iter<I: IntoIterator<Item = TokenKind>>(iter: I) -> Self {
        let mut set = TokenSet::EMPTY;
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|k| k.name())).finish()
    }
}

// ──────────────────────────────────────────────
// Grammar symbols
// ──────────────────────────────────────────────

/// Every terminal and nonterminal of the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Symbol {
    Eof = 0,
    Eq,
    Semi,
    Function,
    EndFunction,
    End,
    LParen,
    RParen,
    Comma,
    Bool,
    LBrace,
    RBrace,
    If,
    EndIf,
    Else,
    Identifier,
    Number,
    SourceFile,
    Definition,
    VariableDefinition,
    FunctionDefinition,
    ParameterList,
    Parameters,
    Block,
    Statement,
    IfStatement,
    ElseClause,
    Expression,
    SourceFileRepeat,
    StatementRepeat,
    ParametersRepeat,
}

/// Visibility and naming of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolMetadata {
    pub name: &'static str,
    pub visible: bool,
    pub named: bool,
}

const fn meta(name: &'static str, visible: bool, named: bool) -> SymbolMetadata {
    SymbolMetadata {
        name,
        visible,
        named,
    }
}

static METADATA: [SymbolMetadata; SYMBOL_COUNT] = [
    meta("EOF", false, true),
    meta("=", true, false),
    meta(";", true, false),
    meta("function", true, false),
    meta("endfunction", true, false),
    meta("end", true, false),
    meta("(", true, false),
    meta(")", true, false),
    meta(",", true, false),
    meta("bool", true, false),
    meta("{", true, false),
    meta("}", true, false),
    meta("if", true, false),
    meta("endif", true, false),
    meta("else", true, false),
    meta("identifier", true, true),
    meta("number", true, true),
    meta("source_file", true, true),
    meta("_definition", false, true),
    meta("variable_definition", true, true),
    meta("function_definition", true, true),
    meta("parameter_list", true, true),
    meta("parameters", true, true),
    meta("block", true, true),
    meta("_statement", false, true),
    meta("if_statement", true, true),
    meta("else_clause", true, true),
    meta("_expression", false, true),
    meta("source_file_repeat1", false, false),
    meta("statement_repeat1", false, false),
    meta("parameters_repeat1", false, false),
];

impl Symbol {
    pub const ALL: [Symbol; SYMBOL_COUNT] = [
        Symbol::Eof,
        Symbol::Eq,
        Symbol::Semi,
        Symbol::Function,
        Symbol::EndFunction,
        Symbol::End,
        Symbol::LParen,
        Symbol::RParen,
        Symbol::Comma,
        Symbol::Bool,
        Symbol::LBrace,
        Symbol::RBrace,
        Symbol::If,
        Symbol::EndIf,
        Symbol::Else,
        Symbol::Identifier,
        Symbol::Number,
        Symbol::SourceFile,
        Symbol::Definition,
        Symbol::VariableDefinition,
        Symbol::FunctionDefinition,
        Symbol::ParameterList,
        Symbol::Parameters,
        Symbol::Block,
        Symbol::Statement,
        Symbol::IfStatement,
        Symbol::ElseClause,
        Symbol::Expression,
        Symbol::SourceFileRepeat,
        Symbol::StatementRepeat,
        Symbol::ParametersRepeat,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Symbol> {
        Symbol::ALL.get(index).copied()
    }

    /// Look a symbol up by its grammar name (`"if_statement"`, `"="`).
    ///
    /// `"end"` resolves to the keyword, never to end-of-input.
    pub fn from_name(name: &str) -> Option<Symbol> {
        Symbol::ALL.into_iter().find(|s| s.name() == name)
    }

    pub fn metadata(self) -> SymbolMetadata {
        METADATA[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.metadata().name
    }

    pub fn is_visible(self) -> bool {
        self.metadata().visible
    }

    pub fn is_named(self) -> bool {
        self.metadata().named
    }

    pub fn is_terminal(self) -> bool {
        self.index() < TOKEN_COUNT
    }

    /// Hidden choice rules whose single child is promoted in their place.
    pub fn is_hidden(self) -> bool {
        !self.is_terminal() && !self.is_visible() && self.is_named()
    }

    /// Auxiliary repeat symbols whose children splice into the parent.
    pub fn is_auxiliary(self) -> bool {
        !self.is_visible() && !self.is_named()
    }

    pub fn token_kind(self) -> Option<TokenKind> {
        TokenKind::from_index(self.index())
    }
}

impl From<TokenKind> for Symbol {
    fn from(kind: TokenKind) -> Self {
        kind.symbol()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

// ──────────────────────────────────────────────
// Symbol table introspection
// ──────────────────────────────────────────────

/// One row of the symbol table, as exposed to host tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolInfo {
    pub id: u16,
    pub name: &'static str,
    pub named: bool,
    pub visible: bool,
    pub terminal: bool,
}

/// The full symbol table in id order.
pub fn symbol_table() -> Vec<SymbolInfo> {
    Symbol::ALL
        .into_iter()
        .map(|s| SymbolInfo {
            id: s.index() as u16,
            name: s.name(),
            named: s.is_named(),
            visible: s.is_visible(),
            terminal: s.is_terminal(),
        })
        .collect()
}
