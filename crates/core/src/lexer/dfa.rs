//! The tokenizer automaton.
//!
//! One state arena holds an entry state per lex mode. Entry states differ in
//! which punctuation edges and keyword chains they carry; the identifier,
//! number and punctuation accept states are shared by every mode.
//!
//! Keyword chains form a trie (`e` → `n` → `d` branches into `end`, `endif`,
//! `endfunction`). Every trie node also has a trailing `[a-z]` edge to the
//! identifier state, so a letter run that outgrows a keyword is lexed as one
//! identifier.

use super::{LexMode, Span, Token};
use crate::symbol::{TokenKind, TokenSet};

pub(crate) type DfaStateId = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeAction {
    /// Consume the byte and move to another state.
    Advance(DfaStateId),
    /// Discard the byte (whitespace) and restart the lexeme.
    Skip,
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    lo: u8,
    hi: u8,
    action: EdgeAction,
}

#[derive(Debug, Default)]
struct State {
    accept: Option<TokenKind>,
    /// Checked in order; the first matching edge wins.
    edges: Vec<Edge>,
}

impl State {
    fn step(&self, byte: u8) -> Option<EdgeAction> {
        self.edges
            .iter()
            .find(|e| e.lo <= byte && byte <= e.hi)
            .map(|e| e.action)
    }

    fn exact_edge(&self, byte: u8) -> Option<DfaStateId> {
        self.edges.iter().find_map(|e| match e.action {
            EdgeAction::Advance(target) if e.lo == byte && e.hi == byte => Some(target),
            _ => None,
        })
    }
}

#[derive(Debug)]
pub(crate) struct Dfa {
    states: Vec<State>,
    entries: Vec<DfaStateId>,
    vocabularies: Vec<TokenSet>,
}

impl Dfa {
    /// Build the automaton with one entry state per vocabulary, in order.
    pub(crate) fn build(vocabularies: &[TokenSet]) -> Dfa {
        let mut dfa = Dfa {
            states: Vec::new(),
            entries: Vec::with_capacity(vocabularies.len()),
            vocabularies: vocabularies.to_vec(),
        };

        let identifier = dfa.add_state(Some(TokenKind::Identifier));
        dfa.add_edge(identifier, b'a', b'z', EdgeAction::Advance(identifier));
        let number = dfa.add_state(Some(TokenKind::Number));
        dfa.add_edge(number, b'0', b'9', EdgeAction::Advance(number));

        let punctuation: Vec<(TokenKind, u8, DfaStateId)> = TokenKind::ALL
            .into_iter()
            .filter_map(|kind| kind.punctuation().map(|byte| (kind, byte)))
            .map(|(kind, byte)| (kind, byte, dfa.add_state(Some(kind))))
            .collect();

        for vocabulary in vocabularies {
            let entry = dfa.build_entry(*vocabulary, identifier, number, &punctuation);
            dfa.entries.push(entry);
        }
        dfa
    }

    fn build_entry(
        &mut self,
        vocabulary: TokenSet,
        identifier: DfaStateId,
        number: DfaStateId,
        punctuation: &[(TokenKind, u8, DfaStateId)],
    ) -> DfaStateId {
        let root = self.add_state(None);
        self.add_edge(root, b'\t', b'\n', EdgeAction::Skip);
        self.add_edge(root, b'\r', b'\r', EdgeAction::Skip);
        self.add_edge(root, b' ', b' ', EdgeAction::Skip);

        for &(kind, byte, target) in punctuation {
            if vocabulary.contains(kind) {
                self.add_edge(root, byte, byte, EdgeAction::Advance(target));
            }
        }

        let mut trie_nodes = Vec::new();
        for keyword in vocabulary.iter().filter(|k| k.is_keyword()) {
            let spelling = keyword.keyword().unwrap_or_default();
            let mut node = root;
            for &byte in spelling.as_bytes() {
                node = match self.states[node as usize].exact_edge(byte) {
                    Some(next) => next,
                    None => {
                        let next = self.add_state(Some(TokenKind::Identifier));
                        self.add_edge(node, byte, byte, EdgeAction::Advance(next));
                        trie_nodes.push(next);
                        next
                    }
                };
            }
            self.states[node as usize].accept = Some(keyword);
        }

        for node in trie_nodes {
            self.add_edge(node, b'a', b'z', EdgeAction::Advance(identifier));
        }
        self.add_edge(root, b'a', b'z', EdgeAction::Advance(identifier));
        self.add_edge(root, b'0', b'9', EdgeAction::Advance(number));
        root
    }

    fn add_state(&mut self, accept: Option<TokenKind>) -> DfaStateId {
        self.states.push(State {
            accept,
            edges: Vec::new(),
        });
        (self.states.len() - 1) as DfaStateId
    }

    fn add_edge(&mut self, from: DfaStateId, lo: u8, hi: u8, action: EdgeAction) {
        self.states[from as usize].edges.push(Edge { lo, hi, action });
    }

    pub(crate) fn mode_count(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn state_count(&self) -> usize {
        self.states.len()
    }

    pub(crate) fn vocabulary(&self, mode: LexMode) -> TokenSet {
        self.vocabularies
            .get(mode.index())
            .copied()
            .unwrap_or(TokenSet::ALL)
    }

    /// Run the automaton from `position` using longest match.
    ///
    /// Leading whitespace is skipped. On failure returns the offset at which
    /// the unmatched lexeme begins.
    pub(crate) fn run(&self, source: &[u8], position: usize, mode: LexMode) -> Result<Token, usize> {
        let entry = self
            .entries
            .get(mode.index())
            .copied()
            .unwrap_or(self.entries[0]);
        let mut state = entry;
        let mut start = position;
        let mut pos = position;
        let mut last_accept: Option<(TokenKind, usize)> = None;

        loop {
            if state == entry && pos >= source.len() {
                return Ok(Token::new(TokenKind::Eof, Span::new(pos, pos)));
            }
            let Some(&byte) = source.get(pos) else {
                break;
            };
            match self.states[state as usize].step(byte) {
                Some(EdgeAction::Skip) => {
                    pos += 1;
                    start = pos;
                }
                Some(EdgeAction::Advance(next)) => {
                    pos += 1;
                    state = next;
                    if let Some(kind) = self.states[next as usize].accept {
                        last_accept = Some((kind, pos));
                    }
                }
                None => break,
            }
        }

        match last_accept {
            Some((kind, end)) => Ok(Token::new(kind, Span::new(start, end))),
            None => Err(start),
        }
    }
}
