//! The Octave grammar as data.
//!
//! Rules are written with optional and choice elements and expanded into flat
//! productions before automaton construction, so an optional trailing `;`
//! becomes two productions of different arity. Repetition is spelled out with
//! left-recursive auxiliary symbols that the tree builder splices away.

use crate::symbol::Symbol;

/// One element of a rule's right-hand side.
#[derive(Debug, Clone, Copy)]
enum Element {
    Sym(Symbol),
    Opt(Symbol),
    OneOf(&'static [Symbol]),
}

use Element::{OneOf, Opt, Sym};

struct Rule {
    lhs: Symbol,
    rhs: &'static [Element],
}

const fn rule(lhs: Symbol, rhs: &'static [Element]) -> Rule {
    Rule { lhs, rhs }
}

static RULES: &[Rule] = &[
    // source_file := definition*
    rule(Symbol::SourceFile, &[Opt(Symbol::SourceFileRepeat)]),
    rule(Symbol::SourceFileRepeat, &[Sym(Symbol::Definition)]),
    rule(
        Symbol::SourceFileRepeat,
        &[Sym(Symbol::SourceFileRepeat), Sym(Symbol::Definition)],
    ),
    rule(Symbol::Definition, &[Sym(Symbol::VariableDefinition)]),
    rule(Symbol::Definition, &[Sym(Symbol::FunctionDefinition)]),
    rule(Symbol::Definition, &[Sym(Symbol::IfStatement)]),
    rule(
        Symbol::VariableDefinition,
        &[
            Sym(Symbol::Identifier),
            Sym(Symbol::Eq),
            Sym(Symbol::Expression),
            Opt(Symbol::Semi),
        ],
    ),
    rule(
        Symbol::FunctionDefinition,
        &[
            Sym(Symbol::Function),
            Sym(Symbol::Identifier),
            Opt(Symbol::ParameterList),
            Opt(Symbol::StatementRepeat),
            OneOf(&[Symbol::End, Symbol::EndFunction]),
        ],
    ),
    rule(
        Symbol::ParameterList,
        &[
            Sym(Symbol::LParen),
            Opt(Symbol::Parameters),
            Sym(Symbol::RParen),
        ],
    ),
    rule(
        Symbol::Parameters,
        &[Sym(Symbol::Identifier), Opt(Symbol::ParametersRepeat)],
    ),
    rule(
        Symbol::ParametersRepeat,
        &[Sym(Symbol::Comma), Sym(Symbol::Identifier)],
    ),
    rule(
        Symbol::ParametersRepeat,
        &[
            Sym(Symbol::ParametersRepeat),
            Sym(Symbol::Comma),
            Sym(Symbol::Identifier),
        ],
    ),
    rule(
        Symbol::Block,
        &[
            Sym(Symbol::LBrace),
            Opt(Symbol::StatementRepeat),
            Sym(Symbol::RBrace),
        ],
    ),
    rule(Symbol::StatementRepeat, &[Sym(Symbol::Statement)]),
    rule(
        Symbol::StatementRepeat,
        &[Sym(Symbol::StatementRepeat), Sym(Symbol::Statement)],
    ),
    rule(Symbol::Statement, &[Sym(Symbol::VariableDefinition)]),
    rule(Symbol::Statement, &[Sym(Symbol::IfStatement)]),
    rule(
        Symbol::IfStatement,
        &[
            Sym(Symbol::If),
            Sym(Symbol::Expression),
            Sym(Symbol::Block),
            Opt(Symbol::ElseClause),
            OneOf(&[Symbol::End, Symbol::EndIf]),
        ],
    ),
    rule(
        Symbol::ElseClause,
        &[Sym(Symbol::Else), Sym(Symbol::Block)],
    ),
    rule(Symbol::Expression, &[Sym(Symbol::Identifier)]),
    rule(Symbol::Expression, &[Sym(Symbol::Number)]),
];

/// A flat production `lhs := rhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub lhs: Symbol,
    pub rhs: Vec<Symbol>,
}

impl Production {
    pub fn arity(&self) -> usize {
        self.rhs.len()
    }

    /// `A := A ...`, the shape used by auxiliary repeat symbols.
    pub fn is_left_recursive(&self) -> bool {
        self.rhs.first() == Some(&self.lhs)
    }
}

/// The expanded grammar. The start symbol is `source_file`.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub start: Symbol,
    pub productions: Vec<Production>,
}

impl Grammar {
    pub fn octave() -> Grammar {
        let mut productions = Vec::new();
        for rule in RULES {
            for rhs in expand(rule.rhs) {
                productions.push(Production { lhs: rule.lhs, rhs });
            }
        }
        Grammar {
            start: Symbol::SourceFile,
            productions,
        }
    }

    pub fn productions_of(&self, lhs: Symbol) -> impl Iterator<Item = (usize, &Production)> {
        self.productions
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.lhs == lhs)
    }
}

/// Every concrete right-hand side the elements can take, in declaration
/// order with "present" before "absent".
fn expand(elements: &[Element]) -> Vec<Vec<Symbol>> {
    let mut out: Vec<Vec<Symbol>> = vec![Vec::new()];
    for element in elements {
        out = match element {
            Sym(symbol) => out
                .into_iter()
                .map(|mut rhs| {
                    rhs.push(*symbol);
                    rhs
                })
                .collect(),
            Opt(symbol) => out
                .into_iter()
                .flat_map(|rhs| {
                    let mut with = rhs.clone();
                    with.push(*symbol);
                    [with, rhs]
                })
                .collect(),
            OneOf(choices) => out
                .into_iter()
                .flat_map(|rhs| {
                    choices.iter().map(move |symbol| {
                        let mut with = rhs.clone();
                        with.push(*symbol);
                        with
                    })
                })
                .collect(),
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arities(grammar: &Grammar, lhs: Symbol) -> Vec<usize> {
        let mut out: Vec<_> = grammar.productions_of(lhs).map(|(_, p)| p.arity()).collect();
        out.sort();
        out
    }

    #[test]
    fn optional_semicolon_gives_two_productions() {
        let g = Grammar::octave();
        assert_eq!(arities(&g, Symbol::VariableDefinition), vec![3, 4]);
    }

    #[test]
    fn function_definition_expands_all_combinations() {
        let g = Grammar::octave();
        // two optionals and a two-way closer
        assert_eq!(
            arities(&g, Symbol::FunctionDefinition),
            vec![3, 3, 4, 4, 4, 4, 5, 5]
        );
    }

    #[test]
    fn source_file_may_be_empty() {
        let g = Grammar::octave();
        assert_eq!(arities(&g, Symbol::SourceFile), vec![0, 1]);
    }

    #[test]
    fn repeats_are_left_recursive() {
        let g = Grammar::octave();
        for aux in [
            Symbol::SourceFileRepeat,
            Symbol::StatementRepeat,
            Symbol::ParametersRepeat,
        ] {
            assert!(aux.is_auxiliary());
            assert_eq!(
                g.productions_of(aux).filter(|(_, p)| p.is_left_recursive()).count(),
                1,
                "{aux}"
            );
        }
    }

    #[test]
    fn every_nonterminal_has_a_production() {
        let g = Grammar::octave();
        for symbol in Symbol::ALL.into_iter().filter(|s| !s.is_terminal()) {
            assert!(g.productions_of(symbol).next().is_some(), "{symbol}");
        }
    }

    #[test]
    fn bool_is_not_referenced() {
        let g = Grammar::octave();
        assert!(g
            .productions
            .iter()
            .all(|p| !p.rhs.contains(&Symbol::Bool)));
    }
}
