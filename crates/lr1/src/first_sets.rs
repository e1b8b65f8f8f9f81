//! Calculation of nullable symbols and first sets.

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID},
    types::{Map, Set},
    util::display_fn,
};
use std::fmt;

#[derive(Debug)]
pub struct FirstSets {
    nulls: Set<NonterminalID>,
    map: Map<NonterminalID, Set<TerminalID>>,
}

impl FirstSets {
    pub fn new(grammar: &Grammar) -> Self {
        let span = tracing::trace_span!("first_sets");
        let _entered = span.enter();

        let nulls = nulls_set(grammar);
        let map = first_sets(grammar, &nulls);
        tracing::debug!("{} nullable nonterminal(s)", nulls.len());
        Self { nulls, map }
    }

    /// Return the set of nullable nonterminals.
    pub fn nulls(&self) -> &Set<NonterminalID> {
        &self.nulls
    }

    pub fn is_nullable(&self, symbol: SymbolID) -> bool {
        matches!(symbol, SymbolID::N(n) if self.nulls.contains(&n))
    }

    /// `First(X)` of a nonterminal.
    pub fn first(&self, symbol: NonterminalID) -> &Set<TerminalID> {
        &self.map[&symbol]
    }

    pub fn iter(&self) -> impl Iterator<Item = (NonterminalID, &Set<TerminalID>)> + '_ {
        self.map.iter().map(|(n, first)| (*n, first))
    }

    /// `First(seq)`, without the end marker when the whole sequence is nullable.
    pub fn first_of(&self, seq: &[SymbolID]) -> Set<TerminalID> {
        let mut res = Set::default();
        first_of_sequence(&self.map, &self.nulls, seq, &mut res);
        res
    }

    /// `First(prefix n)` collected over every `n` in `lookaheads`.
    pub fn get<L>(&self, prefix: &[SymbolID], lookaheads: L) -> Set<TerminalID>
    where
        L: IntoIterator<Item = TerminalID>,
    {
        let mut res = Set::default();
        if first_of_sequence(&self.map, &self.nulls, prefix, &mut res) {
            res.extend(lookaheads);
        }
        res
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            writeln!(f, "## nulls:")?;
            for (i, n) in self.nulls.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", g.nonterminal(*n))?;
            }
            writeln!(f)?;

            writeln!(f, "\n## first sets:")?;
            for (n, first) in &self.map {
                write!(f, "{} : ", g.nonterminal(*n))?;
                for (i, t) in first.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", g.terminal(*t))?;
                }
                writeln!(f)?;
            }
            Ok(())
        })
    }
}

/// Add `First(seq)` to `res` and report whether the whole sequence is nullable.
fn first_of_sequence(
    map: &Map<NonterminalID, Set<TerminalID>>,
    nulls: &Set<NonterminalID>,
    seq: &[SymbolID],
    res: &mut Set<TerminalID>,
) -> bool {
    for symbol in seq {
        match symbol {
            SymbolID::T(t) => {
                res.insert(*t);
                return false;
            }
            SymbolID::N(n) => {
                if let Some(first) = map.get(n) {
                    res.extend(first.iter().copied());
                }
                if !nulls.contains(n) {
                    return false;
                }
            }
        }
    }
    true
}

/// Calculate the set of nullable symbols in this grammar.
pub(crate) fn nulls_set(grammar: &Grammar) -> Set<NonterminalID> {
    let mut nulls = Set::default();
    expand_nulls(grammar, &mut nulls);
    nulls
}

/// Grow `nulls` until no rule adds a nullable nonterminal.
/// Returns whether anything was added.
pub(crate) fn expand_nulls(grammar: &Grammar, nulls: &mut Set<NonterminalID>) -> bool {
    let mut grown = false;
    let mut changed = true;
    while changed {
        changed = false;
        for production in grammar.productions() {
            if nulls.contains(&production.left()) {
                continue;
            }
            let is_rhs_nullable = production
                .right()
                .iter()
                .all(|symbol| matches!(symbol, SymbolID::N(n) if nulls.contains(n)));
            if is_rhs_nullable {
                nulls.insert(production.left());
                changed = true;
                grown = true;
            }
        }
    }
    grown
}

fn first_sets(
    grammar: &Grammar,
    nulls: &Set<NonterminalID>,
) -> Map<NonterminalID, Set<TerminalID>> {
    let mut map: Map<NonterminalID, Set<TerminalID>> = grammar
        .nonterminals()
        .map(|(n, _)| (n, Set::default()))
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for production in grammar.productions() {
            let mut added = Set::default();
            first_of_sequence(&map, nulls, production.right(), &mut added);
            if let Some(first) = map.get_mut(&production.left()) {
                for t in added {
                    changed |= first.insert(t);
                }
            }
        }
    }

    map
}
