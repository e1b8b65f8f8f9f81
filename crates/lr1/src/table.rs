//! Parse table derived from the LR(1) automaton.

use crate::{
    grammar::{Grammar, RuleID, SymbolID, TerminalID},
    lr1::{NodeID, DFA},
    types::Map,
    util::display_fn,
};
use std::fmt;

/// The action that the parser in a state performs on a particular symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read the lookahead terminal and transition to the specified state.
    Shift(NodeID),

    /// Reduce to the specified production rule.
    Reduce(RuleID),

    /// Transition on a just reduced nonterminal.
    Goto(NodeID),

    Accept,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift(n) => write!(f, "s{}", n),
            Self::Reduce(r) => write!(f, "r{}", r),
            Self::Goto(n) => write!(f, "g{}", n),
            Self::Accept => f.write_str("acc"),
        }
    }
}

/// A table cell holding more than one action.
#[derive(Debug, Copy, Clone)]
pub struct Conflict<'t> {
    pub node: NodeID,
    pub symbol: SymbolID,
    pub actions: &'t [Action],
}

#[derive(Debug)]
pub struct ParseTable {
    rows: Map<NodeID, Map<SymbolID, Vec<Action>>>,
}

impl ParseTable {
    pub fn generate(grammar: &Grammar, dfa: &DFA) -> Self {
        let span = tracing::trace_span!("table");
        let _entered = span.enter();

        let mut rows = Map::default();
        for (id, node) in dfa.nodes() {
            let mut row: Map<SymbolID, Vec<Action>> =
                grammar.symbols().map(|(symbol, _)| (symbol, vec![])).collect();

            for (symbol, target) in node.edges() {
                let action = match symbol {
                    SymbolID::T(..) => Action::Shift(target),
                    SymbolID::N(..) => Action::Goto(target),
                };
                row.entry(symbol).or_default().push(action);
            }

            for (core, lookaheads) in node.items() {
                let production = grammar.production(core.rule());
                if core.marker() < production.right().len() {
                    continue;
                }
                let action = match core.rule() {
                    RuleID::ACCEPT => Action::Accept,
                    rule => Action::Reduce(rule),
                };
                for lookahead in lookaheads {
                    row.entry(SymbolID::T(*lookahead)).or_default().push(action);
                }
            }

            for (symbol, actions) in &row {
                if actions.len() > 1 {
                    tracing::warn!(
                        "conflict in state {} on `{}': {}",
                        id,
                        grammar.symbol(*symbol),
                        crate::util::join(actions, "/")
                    );
                }
            }

            rows.insert(id, row);
        }

        Self { rows }
    }

    /// Return the actions of a cell, empty if there are none.
    pub fn actions(&self, node: NodeID, symbol: SymbolID) -> &[Action] {
        self.rows
            .get(&node)
            .and_then(|row| row.get(&symbol))
            .map_or(&[][..], |actions| &actions[..])
    }

    pub fn rows(&self) -> impl Iterator<Item = (NodeID, &Map<SymbolID, Vec<Action>>)> + '_ {
        self.rows.iter().map(|(id, row)| (*id, row))
    }

    /// Iterate over the cells holding more than one action.
    pub fn conflicts(&self) -> impl Iterator<Item = Conflict<'_>> + '_ {
        self.rows.iter().flat_map(|(node, row)| {
            row.iter()
                .filter(|(_, actions)| actions.len() > 1)
                .map(move |(symbol, actions)| Conflict {
                    node: *node,
                    symbol: *symbol,
                    actions: &actions[..],
                })
        })
    }

    pub fn has_conflicts(&self) -> bool {
        self.conflicts().next().is_some()
    }

    /// The terminals having at least one action in the specified state.
    pub fn expected_terminals(&self, node: NodeID) -> impl Iterator<Item = TerminalID> + '_ {
        self.rows
            .get(&node)
            .into_iter()
            .flat_map(|row| row.iter())
            .filter_map(|(symbol, actions)| match symbol {
                SymbolID::T(t) if !actions.is_empty() => Some(*t),
                _ => None,
            })
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            f.write_str("state")?;
            for (_, symbol) in g.symbols() {
                write!(f, ",{}", symbol)?;
            }
            writeln!(f)?;

            for (id, row) in &self.rows {
                write!(f, "{}", id)?;
                for (symbol, _) in g.symbols() {
                    let actions = row.get(&symbol).map_or(&[][..], |a| &a[..]);
                    write!(f, ",{}", crate::util::join(actions, "/"))?;
                }
                writeln!(f)?;
            }

            let conflicts: Vec<_> = self.conflicts().collect();
            if !conflicts.is_empty() {
                writeln!(f, "\n## conflicts:")?;
                for conflict in conflicts {
                    writeln!(
                        f,
                        "- state {} on `{}': {}",
                        conflict.node,
                        g.symbol(conflict.symbol),
                        crate::util::join(conflict.actions, "/")
                    )?;
                }
            }
            Ok(())
        })
    }
}
