//! The generated parser.

use crate::{
    engine::{ParseEngine, ParseError},
    first_sets::FirstSets,
    grammar::{Grammar, GrammarDefError, Rule, Symbol},
    lr1::{Config, DFA},
    table::ParseTable,
    tree::TreeNode,
};
use std::rc::Rc;

/// A grammar together with its LR(1) automaton and parse table.
///
/// A built parser is immutable; every call to [`Parser::parse`] runs on
/// its own stacks.
#[derive(Debug)]
pub struct Parser {
    grammar: Grammar,
    first_sets: FirstSets,
    automaton: DFA,
    table: ParseTable,
}

impl Parser {
    /// Build a parser for `rules` starting at `start`, using the default configuration.
    pub fn build<I>(rules: I, start: Symbol) -> Result<Self, GrammarDefError>
    where
        I: IntoIterator<Item = Rule>,
    {
        Self::build_with_config(rules, start, &Config::new())
    }

    pub fn build_with_config<I>(rules: I, start: Symbol, config: &Config) -> Result<Self, GrammarDefError>
    where
        I: IntoIterator<Item = Rule>,
    {
        let span = tracing::debug_span!("build");
        let _entered = span.enter();

        let grammar = Grammar::new(rules, start)?;
        let first_sets = FirstSets::new(&grammar);
        let automaton = DFA::generate_with_config(&grammar, &first_sets, config);
        let table = ParseTable::generate(&grammar, &automaton);

        let num_conflicts = table.conflicts().count();
        if num_conflicts > 0 {
            tracing::warn!("the parse table has {} conflicting cell(s)", num_conflicts);
        }

        Ok(Self {
            grammar,
            first_sets,
            automaton,
            table,
        })
    }

    /// Parse a sequence of terminal leaves into a parse tree.
    ///
    /// The end-of-input marker is appended by the parser.
    pub fn parse<T, I>(&self, tokens: I) -> Result<Rc<TreeNode<T>>, ParseError>
    where
        I: IntoIterator<Item = TreeNode<T>>,
    {
        ParseEngine::new(&self.grammar, &self.table, tokens).run()
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn first_sets(&self) -> &FirstSets {
        &self.first_sets
    }

    pub fn automaton(&self) -> &DFA {
        &self.automaton
    }

    pub fn table(&self) -> &ParseTable {
        &self.table
    }
}
