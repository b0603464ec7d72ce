//! The parse automaton: an LALR(1) table built once from [`Grammar::octave`].
//!
//! Construction runs the canonical LR(1) item-set collection, then merges
//! states with identical cores. The result is a dense `(state, token) ->
//! action` table, a `(state, nonterminal) -> state` goto table, and per-state
//! data the driver needs beyond plain LR parsing: the lex mode, the expected
//! token set for diagnostics, and the forced-completion entry used when input
//! ends inside a construct.
//!
//! [`Language::get`] holds the table and the lexer built from its modes.
//! Both are immutable and shared by every parse.

use crate::grammar::{Grammar, Production};
use crate::lexer::{LexMode, Lexer};
use crate::symbol::{Symbol, TokenKind, TokenSet, SYMBOL_COUNT, TOKEN_COUNT};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::OnceLock;

/// An automaton state id. State 0 is the start state.
pub type StateId = u16;

pub const START_STATE: StateId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Shift(StateId),
    Reduce {
        symbol: Symbol,
        arity: u8,
        production: u16,
    },
    Accept,
}

/// What to build when input ends in a state with no action for it:
/// reduce the top `depth` stack entries into `symbol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub symbol: Symbol,
    pub depth: u8,
}

/// Two actions competing for one table cell during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateId,
    pub lookahead: TokenKind,
    pub kept: Action,
    pub dropped: Action,
}

#[derive(Debug)]
pub struct ParseTable {
    grammar: Grammar,
    state_count: usize,
    actions: Vec<Option<Action>>,
    gotos: Vec<Option<StateId>>,
    lex_modes: Vec<LexMode>,
    expected: Vec<TokenSet>,
    completions: Vec<Option<Completion>>,
    vocabularies: Vec<TokenSet>,
    conflicts: Vec<Conflict>,
}

impl ParseTable {
    pub fn build(grammar: Grammar) -> ParseTable {
        let (actions, gotos, completions) = {
            let automaton = Automaton::lalr(&grammar);
            let state_count = automaton.states.len();
            let mut actions = ActionTable {
                cells: vec![None; state_count * TOKEN_COUNT],
                conflicts: Vec::new(),
            };
            let mut gotos = vec![None; state_count * SYMBOL_COUNT];
            let mut completions = vec![None; state_count];

            for (state, items) in automaton.states.iter().enumerate() {
                let id = state as StateId;
                for (symbol, target) in &automaton.transitions[state] {
                    match symbol.token_kind() {
                        Some(kind) => actions.set(id, kind, Action::Shift(*target as StateId)),
                        None => gotos[state * SYMBOL_COUNT + symbol.index()] = Some(*target as StateId),
                    }
                }
                for item in items {
                    if (item.dot as usize) < automaton.rule(item.rule).1.len() {
                        continue;
                    }
                    let Some(lookahead) = TokenKind::from_index(item.lookahead as usize) else {
                        continue;
                    };
                    let action = match automaton.production_index(item.rule) {
                        None => Action::Accept,
                        Some(production) => {
                            let p = &grammar.productions[production];
                            Action::Reduce {
                                symbol: p.lhs,
                                arity: p.arity() as u8,
                                production: production as u16,
                            }
                        }
                    };
                    actions.set(id, lookahead, action);
                }
                completions[state] = automaton.completion(items);
            }
            (actions, gotos, completions)
        };
        let state_count = completions.len();

        let mut expected = vec![TokenSet::EMPTY; state_count];
        let mut lex_modes = vec![LexMode::FULL; state_count];
        let mut vocabularies = vec![TokenSet::ALL];
        let mut mode_of: HashMap<TokenSet, LexMode> = HashMap::from([(TokenSet::ALL, LexMode::FULL)]);
        for state in 0..state_count {
            let vocabulary: TokenSet = TokenKind::ALL
                .into_iter()
                .filter(|k| actions.cells[state * TOKEN_COUNT + k.index()].is_some())
                .collect();
            expected[state] = vocabulary;
            let next_mode = LexMode(vocabularies.len() as u16);
            let mode = *mode_of.entry(vocabulary).or_insert(next_mode);
            if mode == next_mode {
                vocabularies.push(vocabulary);
            }
            lex_modes[state] = mode;
        }

        ParseTable {
            grammar,
            state_count,
            actions: actions.cells,
            gotos,
            lex_modes,
            expected,
            completions,
            vocabularies,
            conflicts: actions.conflicts,
        }
    }

    pub fn state_count(&self) -> usize {
        self.state_count
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn production(&self, id: u16) -> Option<&Production> {
        self.grammar.productions.get(id as usize)
    }

    pub fn action(&self, state: StateId, lookahead: TokenKind) -> Option<Action> {
        self.actions
            .get(state as usize * TOKEN_COUNT + lookahead.index())
            .copied()
            .flatten()
    }

    pub fn goto(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        self.gotos
            .get(state as usize * SYMBOL_COUNT + symbol.index())
            .copied()
            .flatten()
    }

    pub fn lex_mode(&self, state: StateId) -> LexMode {
        self.lex_modes
            .get(state as usize)
            .copied()
            .unwrap_or(LexMode::FULL)
    }

    /// Tokens with an action in `state`.
    pub fn expected(&self, state: StateId) -> TokenSet {
        self.expected
            .get(state as usize)
            .copied()
            .unwrap_or(TokenSet::EMPTY)
    }

    pub fn completion(&self, state: StateId) -> Option<Completion> {
        self.completions.get(state as usize).copied().flatten()
    }

    /// Token vocabulary per lex mode; index 0 is the full vocabulary.
    pub fn vocabularies(&self) -> &[TokenSet] {
        &self.vocabularies
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }
}

/// Action cells under construction, with the conflicts found so far.
struct ActionTable {
    cells: Vec<Option<Action>>,
    conflicts: Vec<Conflict>,
}

impl ActionTable {
    fn set(&mut self, state: StateId, lookahead: TokenKind, action: Action) {
        let cell = &mut self.cells[state as usize * TOKEN_COUNT + lookahead.index()];
        match *cell {
            None => *cell = Some(action),
            Some(existing) if existing == action => {}
            Some(existing) => {
                let (kept, dropped) = if precedence(action) > precedence(existing) {
                    (action, existing)
                } else {
                    (existing, action)
                };
                *cell = Some(kept);
                self.conflicts.push(Conflict {
                    state,
                    lookahead,
                    kept,
                    dropped,
                });
            }
        }
    }
}

/// Shift wins over reduce, and the earlier production wins a reduce/reduce.
fn precedence(action: Action) -> (u8, i32) {
    match action {
        Action::Accept => (3, 0),
        Action::Shift(_) => (2, 0),
        Action::Reduce { production, .. } => (1, -(production as i32)),
    }
}

// ──────────────────────────────────────────────
// Item-set construction
// ──────────────────────────────────────────────

/// `rule` indexes the augmented rule list: 0 is `start' := start`, rule
/// `i + 1` is grammar production `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Item {
    rule: u16,
    dot: u8,
    lookahead: u8,
}

type ItemSet = BTreeSet<Item>;

struct Automaton<'g> {
    grammar: &'g Grammar,
    augmented: [Symbol; 1],
    first: [TokenSet; SYMBOL_COUNT],
    nullable: [bool; SYMBOL_COUNT],
    states: Vec<ItemSet>,
    transitions: Vec<Vec<(Symbol, usize)>>,
}

impl<'g> Automaton<'g> {
    fn new(grammar: &'g Grammar) -> Self {
        let mut automaton = Automaton {
            grammar,
            augmented: [grammar.start],
            first: [TokenSet::EMPTY; SYMBOL_COUNT],
            nullable: [false; SYMBOL_COUNT],
            states: Vec::new(),
            transitions: Vec::new(),
        };
        automaton.compute_first_sets();
        automaton
    }

    fn rule(&self, rule: u16) -> (Option<Symbol>, &[Symbol]) {
        match self.production_index(rule) {
            None => (None, &self.augmented[..]),
            Some(i) => {
                let p = &self.grammar.productions[i];
                (Some(p.lhs), &p.rhs)
            }
        }
    }

    fn production_index(&self, rule: u16) -> Option<usize> {
        (rule as usize).checked_sub(1)
    }

    fn compute_first_sets(&mut self) {
        let grammar = self.grammar;
        for kind in TokenKind::ALL {
            self.first[kind.index()] = TokenSet::EMPTY.with(kind);
        }
        let mut changed = true;
        while changed {
            changed = false;
            for p in &grammar.productions {
                let lhs = p.lhs.index();
                let mut first = self.first[lhs];
                let mut nullable = true;
                for symbol in &p.rhs {
                    first = first.union(self.first[symbol.index()]);
                    if !self.nullable[symbol.index()] {
                        nullable = false;
                        break;
                    }
                }
                if first != self.first[lhs] || (nullable && !self.nullable[lhs]) {
                    self.first[lhs] = first;
                    self.nullable[lhs] |= nullable;
                    changed = true;
                }
            }
        }
    }

    fn first_of(&self, sequence: &[Symbol], lookahead: TokenKind) -> TokenSet {
        let mut out = TokenSet::EMPTY;
        for symbol in sequence {
            out = out.union(self.first[symbol.index()]);
            if !self.nullable[symbol.index()] {
                return out;
            }
        }
        out.with(lookahead)
    }

    fn closure(&self, kernel: ItemSet) -> ItemSet {
        let mut set = kernel;
        let mut work: Vec<Item> = set.iter().copied().collect();
        while let Some(item) = work.pop() {
            let (_, rhs) = self.rule(item.rule);
            let Some(&next) = rhs.get(item.dot as usize) else {
                continue;
            };
            if next.is_terminal() {
                continue;
            }
            let lookahead = TokenKind::from_index(item.lookahead as usize).unwrap_or(TokenKind::Eof);
            let lookaheads = self.first_of(&rhs[item.dot as usize + 1..], lookahead);
            for (production, _) in self.grammar.productions_of(next) {
                for la in lookaheads.iter() {
                    let new = Item {
                        rule: production as u16 + 1,
                        dot: 0,
                        lookahead: la.index() as u8,
                    };
                    if set.insert(new) {
                        work.push(new);
                    }
                }
            }
        }
        set
    }

    /// The canonical LR(1) collection.
    fn canonical(grammar: &'g Grammar) -> Self {
        let mut automaton = Automaton::new(grammar);
        let start = automaton.closure(ItemSet::from([Item {
            rule: 0,
            dot: 0,
            lookahead: TokenKind::Eof.index() as u8,
        }]));

        let mut index: HashMap<ItemSet, usize> = HashMap::new();
        index.insert(start.clone(), 0);
        automaton.states.push(start);
        automaton.transitions.push(Vec::new());

        let mut queue = VecDeque::from([0usize]);
        while let Some(state) = queue.pop_front() {
            let mut kernels: BTreeMap<Symbol, ItemSet> = BTreeMap::new();
            for item in &automaton.states[state] {
                let (_, rhs) = automaton.rule(item.rule);
                if let Some(&next) = rhs.get(item.dot as usize) {
                    kernels.entry(next).or_default().insert(Item {
                        dot: item.dot + 1,
                        ..*item
                    });
                }
            }
            for (symbol, kernel) in kernels {
                let target_set = automaton.closure(kernel);
                let target = match index.get(&target_set) {
                    Some(&existing) => existing,
                    None => {
                        let id = automaton.states.len();
                        index.insert(target_set.clone(), id);
                        automaton.states.push(target_set);
                        automaton.transitions.push(Vec::new());
                        queue.push_back(id);
                        id
                    }
                };
                automaton.transitions[state].push((symbol, target));
            }
        }
        automaton
    }

    /// Merge canonical states that share a core.
    fn lalr(grammar: &'g Grammar) -> Self {
        let canonical = Automaton::canonical(grammar);

        let mut merged_of: Vec<usize> = Vec::with_capacity(canonical.states.len());
        let mut by_core: HashMap<BTreeSet<(u16, u8)>, usize> = HashMap::new();
        let mut states: Vec<ItemSet> = Vec::new();
        for items in &canonical.states {
            let core: BTreeSet<(u16, u8)> = items.iter().map(|i| (i.rule, i.dot)).collect();
            let next_id = states.len();
            let id = *by_core.entry(core).or_insert(next_id);
            if id == next_id {
                states.push(ItemSet::new());
            }
            states[id].extend(items.iter().copied());
            merged_of.push(id);
        }

        let mut transitions: Vec<Vec<(Symbol, usize)>> = vec![Vec::new(); states.len()];
        for (state, edges) in canonical.transitions.iter().enumerate() {
            let from = merged_of[state];
            if !transitions[from].is_empty() {
                continue;
            }
            transitions[from] = edges
                .iter()
                .map(|(symbol, target)| (*symbol, merged_of[*target]))
                .collect();
        }

        Automaton {
            states,
            transitions,
            ..canonical
        }
    }

    /// Pick the kernel item with the deepest dot, skipping the augmented
    /// rule and `A := A . x` self-extensions that would re-enter the same state.
    fn completion(&self, items: &ItemSet) -> Option<Completion> {
        items
            .iter()
            .filter(|item| item.dot > 0)
            .filter_map(|item| {
                let production = &self.grammar.productions[self.production_index(item.rule)?];
                if production.is_left_recursive() && item.dot == 1 {
                    return None;
                }
                Some((item.dot, !production.lhs.is_auxiliary(), std::cmp::Reverse(item.rule), production.lhs))
            })
            .max()
            .map(|(depth, _, _, symbol)| Completion { symbol, depth })
    }
}

// ──────────────────────────────────────────────
// Language
// ──────────────────────────────────────────────

/// The parse table and the lexer built from its modes.
#[derive(Debug)]
pub struct Language {
    pub table: ParseTable,
    pub lexer: Lexer,
}

impl Language {
    /// The process-wide instance, built on first use.
    pub fn get() -> &'static Language {
        static LANGUAGE: OnceLock<Language> = OnceLock::new();
        LANGUAGE.get_or_init(Language::build)
    }

    pub fn build() -> Language {
        let table = ParseTable::build(Grammar::octave());
        let lexer = Lexer::new(table.vocabularies());
        tracing::debug!(
            states = table.state_count(),
            lex_modes = lexer.mode_count(),
            lex_states = lexer.state_count(),
            conflicts = table.conflicts().len(),
            "built octave language tables"
        );
        for conflict in table.conflicts() {
            tracing::warn!(?conflict, "parse table conflict");
        }
        Language { table, lexer }
    }
}
