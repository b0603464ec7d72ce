//! The shift-reduce driver.
//!
//! [`parse`] pulls tokens from the lexer one at a time, in the lex mode of
//! the current top state, and runs the LALR(1) table over them. Reductions
//! build the tree bottom-up as they happen. Hidden choice symbols and
//! auxiliary repeat symbols never become nodes: their children are carried on
//! the stack as a spliced run and land directly in the next visible ancestor.
//!
//! When the table has no action the driver hands control to the recovery
//! state machine in [`recovery`]. Every loop iteration shifts, reduces, or
//! discards a token, and end of input always ends the loop, so a parse always
//! returns a tree.

mod recovery;

use crate::error::ParseError;
use crate::lexer::{Span, Token};
use crate::symbol::{Symbol, TokenKind};
use crate::table::{Action, Language, ParseTable, StateId, START_STATE};
use crate::tree::{NodeId, Tree, TreeBuilder};
use recovery::Recovery;
use tracing::trace;

/// Errors recorded per parse before further ones are dropped.
pub const DEFAULT_MAX_ERRORS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Cap on recorded errors. Parsing and tree building are unaffected by it,
    /// and an unexpected end of input is recorded past the cap.
    pub max_errors: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            max_errors: DEFAULT_MAX_ERRORS,
        }
    }
}

/// Parse `source` with default options.
///
/// Never fails: malformed input yields a best-effort tree plus errors.
pub fn parse(source: &str) -> (Tree, Vec<ParseError>) {
    parse_with(source, ParseOptions::default())
}

pub fn parse_with(source: &str, options: ParseOptions) -> (Tree, Vec<ParseError>) {
    Parser::new(Language::get(), source, options).run()
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

/// What a stack entry carries: one node, or the children of a hidden or
/// auxiliary symbol waiting to be spliced into their parent.
#[derive(Debug)]
enum Subtree {
    Node(NodeId),
    Spliced(Vec<NodeId>),
}

#[derive(Debug)]
struct StackEntry {
    state: StateId,
    subtree: Subtree,
}

/// Collected errors, capped at `max`.
#[derive(Debug)]
struct ErrorLog {
    errors: Vec<ParseError>,
    max: usize,
    dropped: usize,
}

impl ErrorLog {
    fn new(max: usize) -> Self {
        ErrorLog {
            errors: Vec::new(),
            max,
            dropped: 0,
        }
    }

    /// Record `error`, returning its index unless the cap was reached.
    fn push(&mut self, error: ParseError) -> Option<usize> {
        if self.errors.len() >= self.max {
            self.dropped += 1;
            return None;
        }
        self.errors.push(error);
        Some(self.errors.len() - 1)
    }

    /// Record the error that ends a parse, even past the cap.
    fn push_terminal(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut ParseError> {
        self.errors.get_mut(index)
    }
}

struct Parser<'a> {
    language: &'a Language,
    source: &'a str,
    /// Byte offset the next token is lexed from.
    position: usize,
    stack: Vec<StackEntry>,
    builder: TreeBuilder,
    errors: ErrorLog,
    recovery: Recovery,
}

impl<'a> Parser<'a> {
    fn new(language: &'a Language, source: &'a str, options: ParseOptions) -> Self {
        Parser {
            language,
            source,
            position: 0,
            stack: vec![StackEntry {
                state: START_STATE,
                subtree: Subtree::Spliced(Vec::new()),
            }],
            builder: TreeBuilder::new(),
            errors: ErrorLog::new(options.max_errors),
            recovery: Recovery::new(),
        }
    }

    fn table(&self) -> &'a ParseTable {
        &self.language.table
    }

    fn top_state(&self) -> StateId {
        self.stack.last().map_or(START_STATE, |e| e.state)
    }

    fn run(mut self) -> (Tree, Vec<ParseError>) {
        let mut lookahead = self.next_token();
        loop {
            let state = self.top_state();
            match self.table().action(state, lookahead.kind) {
                Some(Action::Shift(next)) => {
                    self.recovery.resume(lookahead);
                    trace!(state, next, token = %lookahead.kind, "shift");
                    let leaf = self.builder.leaf(lookahead.kind, lookahead.span);
                    self.stack.push(StackEntry {
                        state: next,
                        subtree: Subtree::Node(leaf),
                    });
                    lookahead = self.next_token();
                }
                Some(Action::Reduce { symbol, arity, .. }) => {
                    self.recovery.resume(lookahead);
                    if !self.reduce(symbol, arity as usize, lookahead.span.start, false) {
                        return self.collapse();
                    }
                }
                Some(Action::Accept) => {
                    self.recovery.resume(lookahead);
                    return self.accept();
                }
                None if self.reads_as_identifier(state, lookahead) => {
                    lookahead.kind = TokenKind::Identifier;
                }
                None if lookahead.kind == TokenKind::Eof => return self.finish_at_eof(lookahead),
                None => {
                    let expected = self.table().expected(state);
                    self.recovery
                        .discard(lookahead, state, expected, &mut self.errors);
                    lookahead = self.next_token();
                }
            }
        }
    }

    /// A keyword the current state cannot use, where an identifier would fit.
    ///
    /// The lookahead was lexed in the mode of an earlier state, before the
    /// reductions that led here.
    fn reads_as_identifier(&self, state: StateId, token: Token) -> bool {
        token.kind.is_keyword() && self.table().action(state, TokenKind::Identifier).is_some()
    }

    fn next_token(&mut self) -> Token {
        let mode = self.table().lex_mode(self.top_state());
        let bytes = self.source.as_bytes();
        loop {
            match self.language.lexer.next_token(bytes, self.position, mode) {
                Ok(token) => {
                    self.position = token.span.end;
                    return token;
                }
                Err(e) => {
                    trace!(span = %e.span, "skipping unrecognized character");
                    self.position = e.span.end;
                    self.errors.push(ParseError::lex(e.span, self.source));
                }
            }
        }
    }

    /// Pop `arity` entries and push `symbol` built from them.
    ///
    /// `position` places a node with no children. Returns `false` when the
    /// exposed state has no goto for `symbol`.
    fn reduce(&mut self, symbol: Symbol, arity: usize, position: usize, incomplete: bool) -> bool {
        let split = self.stack.len().saturating_sub(arity).max(1);
        let mut children = Vec::with_capacity(arity);
        for entry in self.stack.drain(split..) {
            match entry.subtree {
                Subtree::Node(id) => children.push(id),
                Subtree::Spliced(ids) => children.extend(ids),
            }
        }

        let exposed = self.top_state();
        let Some(next) = self.table().goto(exposed, symbol) else {
            self.stack.push(StackEntry {
                state: exposed,
                subtree: Subtree::Spliced(children),
            });
            return false;
        };
        trace!(state = exposed, next, %symbol, arity, "reduce");

        let subtree = if symbol.is_hidden() || symbol.is_auxiliary() {
            Subtree::Spliced(children)
        } else {
            let span = if symbol == self.table().grammar().start {
                Span::new(0, self.source.len())
            } else {
                self.builder
                    .span_of(&children)
                    .unwrap_or(Span::empty(position))
            };
            Subtree::Node(self.builder.node(symbol, &children, span, incomplete))
        };
        self.stack.push(StackEntry {
            state: next,
            subtree,
        });
        true
    }

    /// The stack holds the base entry and the finished `source_file`.
    fn accept(self) -> (Tree, Vec<ParseError>) {
        let root = match self.stack.as_slice() {
            [_, StackEntry {
                subtree: Subtree::Node(id),
                ..
            }] => Some(*id),
            _ => None,
        };
        match root {
            Some(root) => self.finish(root),
            None => self.collapse(),
        }
    }

    fn finish(self, root: NodeId) -> (Tree, Vec<ParseError>) {
        if self.errors.dropped > 0 {
            tracing::debug!(dropped = self.errors.dropped, "error cap reached");
        }
        let tree = self.builder.finish(self.source.to_owned(), root);
        (tree, self.errors.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sexp(source: &str) -> String {
        let (tree, errors) = parse(source);
        assert!(errors.is_empty(), "{source:?}: {errors:?}");
        tree.to_sexp()
    }

    #[test]
    fn empty_source_is_an_empty_source_file() {
        assert_eq!(sexp(""), "(source_file)");
        let (tree, _) = parse("  \n");
        assert_eq!(tree.root().span(), Span::new(0, 3));
    }

    #[test]
    fn variable_definition_consumes_the_semicolon() {
        let (tree, errors) = parse("x = 5;");
        assert!(errors.is_empty());
        let def = tree.root().child(0).unwrap();
        assert_eq!(def.kind(), "variable_definition");
        assert_eq!(def.span(), Span::new(0, 6));
        assert_eq!(def.named_child(0).unwrap().text(), "x");
        assert_eq!(def.named_child(1).unwrap().text(), "5");
        assert_eq!(def.child(3).unwrap().kind(), ";");
    }

    #[test]
    fn repeats_splice_into_the_parent() {
        assert_eq!(
            sexp("a = 1; b = 2; c = d"),
            "(source_file (variable_definition (identifier) (number)) \
             (variable_definition (identifier) (number)) \
             (variable_definition (identifier) (identifier)))"
        );
        assert_eq!(
            sexp("function f(a, b, c) end"),
            "(source_file (function_definition (identifier) \
             (parameter_list (parameters (identifier) (identifier) (identifier)))))"
        );
    }

    #[test]
    fn function_without_parameter_list() {
        assert_eq!(
            sexp("function f x = 1 endfunction"),
            "(source_file (function_definition (identifier) \
             (variable_definition (identifier) (number))))"
        );
    }

    #[test]
    fn keywords_are_contextual() {
        assert_eq!(sexp("end = 1"), "(source_file (variable_definition (identifier) (number)))");
        assert_eq!(
            sexp("x = 1 end = 2"),
            "(source_file (variable_definition (identifier) (number)) \
             (variable_definition (identifier) (number)))"
        );
        assert_eq!(sexp("x = if"), "(source_file (variable_definition (identifier) (identifier)))");
    }

    #[test]
    fn nested_if_statements() {
        assert_eq!(
            sexp("if a { if b { c = 1 } end } else { d = 2 } endif"),
            "(source_file (if_statement (identifier) \
             (block (if_statement (identifier) (block (variable_definition (identifier) (number))))) \
             (else_clause (block (variable_definition (identifier) (number))))))"
        );
    }

    #[test]
    fn error_cap_limits_recorded_errors_only() {
        let source = ") ) ) ) x = 1";
        let (full_tree, full_errors) = parse_with(source, ParseOptions { max_errors: 100 });
        let (capped_tree, capped_errors) = parse_with(source, ParseOptions { max_errors: 0 });
        assert!(!full_errors.is_empty());
        assert!(capped_errors.is_empty());
        assert_eq!(full_tree.to_sexp(), capped_tree.to_sexp());
    }
}
