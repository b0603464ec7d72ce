//! Error recovery.
//!
//! Two states. In `Normal` the driver follows the table. The first token with
//! no action moves to `Recovering`, records one syntax error, and discards the
//! token; later discards in the same episode widen that error's span instead
//! of adding new errors. The first token that has an action returns the
//! machine to `Normal` without touching the stack.
//!
//! End of input with no action is handled by forced completion: the driver
//! takes the end-of-input action where the table has one and otherwise
//! reduces the top of the stack into the state's completion symbol, flagging
//! the node incomplete. If that gets stuck, the whole stack is folded into a
//! `source_file` root.

use super::{ErrorLog, Parser, Subtree};
use crate::error::ParseError;
use crate::lexer::{Span, Token};
use crate::symbol::{Symbol, TokenKind, TokenSet};
use crate::table::{Action, StateId};
use crate::tree::Tree;
use tracing::debug;

/// Forced steps allowed per stack entry before the stack is collapsed.
const FORCED_STEPS_PER_ENTRY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    Recovering {
        /// Index of this episode's error, if it was recorded.
        error: Option<usize>,
        discarded: usize,
    },
}

#[derive(Debug)]
pub(super) struct Recovery {
    state: State,
}

impl Recovery {
    pub(super) fn new() -> Self {
        Recovery {
            state: State::Normal,
        }
    }

    pub(super) fn is_recovering(&self) -> bool {
        matches!(self.state, State::Recovering { .. })
    }

    /// Drop `token`, which has no action in `state`.
    pub(super) fn discard(
        &mut self,
        token: Token,
        state: StateId,
        expected: TokenSet,
        errors: &mut ErrorLog,
    ) {
        match &mut self.state {
            State::Normal => {
                debug!(state, found = %token.kind, span = %token.span, "syntax error, recovering");
                let error = errors.push(ParseError::syntax(token.span, state, token.kind, expected));
                self.state = State::Recovering {
                    error,
                    discarded: 1,
                };
            }
            State::Recovering { error, discarded } => {
                *discarded += 1;
                if let Some(e) = error.and_then(|i| errors.get_mut(i)) {
                    let span = e.span_mut();
                    *span = span.cover(token.span);
                }
            }
        }
    }

    /// `token` has an action again; end the episode if one is running.
    pub(super) fn resume(&mut self, token: Token) {
        if let State::Recovering { discarded, .. } = self.state {
            debug!(discarded, at = %token.span, "resynchronized");
            self.state = State::Normal;
        }
    }
}

impl Parser<'_> {
    /// End of input arrived with no action for it in the top state.
    pub(super) fn finish_at_eof(mut self, eof: Token) -> (Tree, Vec<ParseError>) {
        let position = eof.span.start;
        let state = self.top_state();
        if self.recovery.is_recovering() {
            debug!(state, "input ended while recovering");
            self.recovery.state = State::Normal;
        }
        self.errors.push_terminal(ParseError::unexpected_eof(
            position,
            state,
            self.table().expected(state),
        ));

        let mut budget = FORCED_STEPS_PER_ENTRY * self.stack.len();
        while budget > 0 {
            budget -= 1;
            let state = self.top_state();
            let progressed = match self.table().action(state, TokenKind::Eof) {
                Some(Action::Accept) => return self.accept(),
                Some(Action::Reduce { symbol, arity, .. }) => {
                    self.reduce(symbol, arity as usize, position, false)
                }
                Some(Action::Shift(_)) | None => match self.table().completion(state) {
                    Some(completion) if (completion.depth as usize) < self.stack.len() => {
                        debug!(
                            state,
                            symbol = %completion.symbol,
                            depth = completion.depth,
                            "forcing completion"
                        );
                        self.reduce(completion.symbol, completion.depth as usize, position, true)
                    }
                    _ => false,
                },
            };
            if !progressed {
                break;
            }
        }
        self.collapse()
    }

    /// Fold everything on the stack into an incomplete `source_file`.
    pub(super) fn collapse(mut self) -> (Tree, Vec<ParseError>) {
        let mut children = Vec::new();
        for entry in self.stack.drain(..) {
            match entry.subtree {
                Subtree::Node(id) => children.push(id),
                Subtree::Spliced(ids) => children.extend(ids),
            }
        }
        debug!(children = children.len(), "collapsing parse stack");
        let span = Span::new(0, self.source.len());
        let root = self.builder.node(Symbol::SourceFile, &children, span, true);
        self.finish(root)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ParseError;
    use crate::lexer::Span;
    use crate::parser::{parse, parse_with, ParseOptions, DEFAULT_MAX_ERRORS};
    use crate::symbol::TokenKind;

    #[test]
    fn missing_expression_keeps_the_definition() {
        let (tree, errors) = parse("x = ;");
        assert_eq!(errors.len(), 2, "{errors:?}");
        match &errors[0] {
            ParseError::Syntax {
                span,
                found,
                expected,
                ..
            } => {
                assert_eq!(*span, Span::new(4, 5));
                assert_eq!(*found, TokenKind::Semi);
                assert!(expected.contains(&TokenKind::Identifier));
                assert!(expected.contains(&TokenKind::Number));
            }
            other => panic!("expected a syntax error, got {other:?}"),
        }
        assert!(matches!(errors[1], ParseError::UnexpectedEndOfInput { .. }));

        let def = tree.root().child(0).expect("definition survives");
        assert_eq!(def.kind(), "variable_definition");
        assert!(def.is_incomplete());
        assert!(tree.root().has_error());
        assert_eq!(tree.to_sexp(), "(source_file (variable_definition (identifier)))");
    }

    #[test]
    fn one_error_per_episode_covers_every_discarded_token() {
        let (tree, errors) = parse("x = ) ) ) 1;");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert_eq!(errors[0].span(), Span::new(4, 9));
        assert!(!tree.root().has_error());
        assert_eq!(
            tree.to_sexp(),
            "(source_file (variable_definition (identifier) (number)))"
        );
    }

    #[test]
    fn separate_episodes_record_separate_errors() {
        let (_, errors) = parse("x = ) 1; y = ) 2;");
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert_eq!(errors[0].span(), Span::new(4, 5));
        assert_eq!(errors[1].span(), Span::new(13, 14));
    }

    #[test]
    fn unterminated_function_is_force_completed() {
        let (tree, errors) = parse("function f(a, b");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(matches!(
            &errors[0],
            ParseError::UnexpectedEndOfInput { span, expected, .. }
                if *span == Span::empty(15) && expected.contains(&TokenKind::RParen)
        ));
        assert_eq!(
            tree.to_sexp(),
            "(source_file (function_definition (identifier) \
             (parameter_list (parameters (identifier) (identifier)))))"
        );
        let function = tree.root().child(0).unwrap();
        assert!(function.is_incomplete());
        assert_eq!(function.span(), Span::new(0, 15));
    }

    #[test]
    fn unterminated_if_inside_a_block() {
        let (tree, errors) = parse("if a { x = 1");
        assert!(matches!(
            errors.last(),
            Some(ParseError::UnexpectedEndOfInput { .. })
        ));
        assert_eq!(
            tree.to_sexp(),
            "(source_file (if_statement (identifier) \
             (block (variable_definition (identifier) (number)))))"
        );
    }

    #[test]
    fn bool_is_an_identifier_where_one_fits() {
        let (tree, errors) = parse("x = bool");
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(tree.root().child(0).unwrap().named_child(1).unwrap().text(), "bool");
    }

    #[test]
    fn bool_is_a_syntax_error_elsewhere() {
        let (tree, errors) = parse("function f(a bool) end");
        assert!(errors.iter().any(|e| matches!(
            e,
            ParseError::Syntax {
                found: TokenKind::Bool,
                ..
            }
        )));
        assert_eq!(tree.root().child(0).unwrap().kind(), "function_definition");
    }

    #[test]
    fn unrecognized_characters_do_not_disturb_the_parse() {
        let (tree, errors) = parse("x = $5;");
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ParseError::Lex { .. }));
        assert_eq!(errors[0].span(), Span::new(4, 5));
        assert_eq!(
            tree.to_sexp(),
            "(source_file (variable_definition (identifier) (number)))"
        );
    }

    #[test]
    fn error_cap_applies_to_every_kind() {
        let (_, errors) = parse_with("$ $ $ x = ;", ParseOptions { max_errors: 2 });
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, ParseError::Lex { .. })));
    }

    #[test]
    fn end_of_input_is_recorded_past_the_error_cap() {
        let source = format!("{}x =", "x = ) 1 ".repeat(DEFAULT_MAX_ERRORS + 1));
        let (tree, errors) = parse(&source);
        assert_eq!(errors.len(), DEFAULT_MAX_ERRORS + 1, "{errors:?}");
        assert!(errors[..DEFAULT_MAX_ERRORS]
            .iter()
            .all(|e| matches!(e, ParseError::Syntax { .. })));
        assert!(matches!(
            errors.last(),
            Some(ParseError::UnexpectedEndOfInput { .. })
        ));
        assert!(tree.root().has_error());

        let (_, errors) = parse_with(&source, ParseOptions { max_errors: 0 });
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(matches!(errors[0], ParseError::UnexpectedEndOfInput { .. }));
    }

    #[test]
    fn garbage_never_panics_and_root_spans_input() {
        let inputs = [
            "}}}}",
            "function",
            "function function function",
            "if if if { { {",
            "end end endif endfunction",
            "( , ) = ; = ;",
            "else { } else",
            "x = 1 = 2 = 3",
            "123 456",
            "\u{1F600} x = 1",
            "if x { } else",
            "function f( , , ) { }",
        ];
        for input in inputs {
            let (tree, _) = parse(input);
            assert_eq!(tree.root().kind(), "source_file", "{input:?}");
            assert_eq!(tree.root().span(), Span::new(0, input.len()), "{input:?}");
        }
    }
}
