//! The table-driven shift-reduce parser engine.

use crate::{
    grammar::{Grammar, NonterminalID, Symbol, SymbolID, TerminalID},
    lr1::NodeID,
    table::{Action, ParseTable},
    tree::TreeNode,
    util::{display_fn, join},
};
use std::{collections::VecDeque, fmt, rc::Rc};

#[derive(Debug)]
enum Input<T> {
    Token(Rc<TreeNode<T>>),
    /// A just reduced nonterminal waiting for its goto.
    Reduced(NonterminalID),
    EndOfInput,
}

/// The state of a single parse run.
#[derive(Debug)]
pub(crate) struct ParseEngine<'p, T> {
    grammar: &'p Grammar,
    table: &'p ParseTable,
    states_stack: Vec<NodeID>,
    symbols_stack: Vec<Rc<TreeNode<T>>>,
    input: VecDeque<Input<T>>,
    shifted: usize,
}

impl<'p, T> ParseEngine<'p, T> {
    pub(crate) fn new<I>(grammar: &'p Grammar, table: &'p ParseTable, tokens: I) -> Self
    where
        I: IntoIterator<Item = TreeNode<T>>,
    {
        let mut input: VecDeque<_> = tokens
            .into_iter()
            .map(|token| Input::Token(Rc::new(token)))
            .collect();
        input.push_back(Input::EndOfInput);
        Self {
            grammar,
            table,
            states_stack: vec![NodeID::START],
            symbols_stack: vec![],
            input,
            shifted: 0,
        }
    }

    /// 1-based position of the token at the head of the input.
    fn position(&self) -> usize {
        self.shifted + 1
    }

    fn lookahead(&self) -> Result<(SymbolID, Symbol), ParseError> {
        match self.input.front() {
            Some(Input::Token(token)) => match self.grammar.lookup(token.symbol()) {
                Some(SymbolID::T(t)) if t != TerminalID::EOI => {
                    Ok((SymbolID::T(t), token.symbol().clone()))
                }
                _ => Err(ParseError::UndefinedSymbol {
                    position: self.position(),
                    symbol: token.symbol().clone(),
                }),
            },
            Some(Input::Reduced(n)) => {
                Ok((SymbolID::N(*n), self.grammar.nonterminal(*n).clone()))
            }
            Some(Input::EndOfInput) => Ok((
                SymbolID::T(TerminalID::EOI),
                self.grammar.terminal(TerminalID::EOI).clone(),
            )),
            None => Err(internal("the input queue is exhausted")),
        }
    }

    pub(crate) fn run(mut self) -> Result<Rc<TreeNode<T>>, ParseError> {
        loop {
            let current = *self
                .states_stack
                .last()
                .ok_or_else(|| internal("the state stack is empty"))?;
            let (symbol, found) = self.lookahead()?;

            let action = match self.table.actions(current, symbol) {
                [action] => *action,
                [] => {
                    return Err(ParseError::Syntax {
                        position: self.position(),
                        found,
                        expected: self
                            .table
                            .expected_terminals(current)
                            .map(|t| self.grammar.terminal(t).clone())
                            .collect(),
                    })
                }
                actions => {
                    return Err(ParseError::Conflict {
                        position: self.position(),
                        state: current,
                        symbol: found,
                        actions: actions.to_vec(),
                    })
                }
            };
            tracing::trace!("state {}, lookahead `{}': {}", current, found, action);

            match action {
                Action::Shift(next) => {
                    match self.input.pop_front() {
                        Some(Input::Token(token)) => self.symbols_stack.push(token),
                        _ => return Err(internal("shifted a non-token input")),
                    }
                    self.states_stack.push(next);
                    self.shifted += 1;
                }

                Action::Reduce(rule) => {
                    let production = self.grammar.production(rule);
                    let n = production.right().len();
                    if self.states_stack.len() <= n || self.symbols_stack.len() < n {
                        return Err(internal("the stack is shorter than the reduced rule"));
                    }
                    self.states_stack.truncate(self.states_stack.len() - n);
                    let children = self.symbols_stack.split_off(self.symbols_stack.len() - n);
                    let left = production.left();
                    let node = TreeNode::branch(self.grammar.nonterminal(left).clone(), children);
                    self.symbols_stack.push(node);
                    self.input.push_front(Input::Reduced(left));
                }

                Action::Goto(next) => {
                    if !matches!(self.input.pop_front(), Some(Input::Reduced(..))) {
                        return Err(internal("goto without a reduced nonterminal"));
                    }
                    self.states_stack.push(next);
                }

                Action::Accept => return self.accept(),
            }
        }
    }

    fn accept(mut self) -> Result<Rc<TreeNode<T>>, ParseError> {
        let consistent = self.input.len() == 1
            && matches!(self.input.front(), Some(Input::EndOfInput))
            && self.symbols_stack.len() == 1;
        match self.symbols_stack.pop() {
            Some(root) if consistent => Ok(root),
            _ => Err(internal("accepted with unconsumed input or stacked symbols")),
        }
    }
}

fn display_expected(expected: &[Symbol]) -> impl fmt::Display + '_ {
    display_fn(move |f| {
        if expected.is_empty() {
            f.write_str("no terminal is acceptable here")
        } else {
            write!(f, "expected {}", join(expected, ", "))
        }
    })
}

fn internal(reason: &str) -> ParseError {
    ParseError::Internal {
        reason: reason.into(),
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("symbol #{} `{}' is not defined in the grammar", position, symbol)]
    UndefinedSymbol { position: usize, symbol: Symbol },

    #[error(
        "syntax error at symbol #{} `{}': {}",
        position,
        found,
        display_expected(.expected)
    )]
    Syntax {
        position: usize,
        found: Symbol,
        expected: Vec<Symbol>,
    },

    #[error(
        "conflicting actions {} in state {} at symbol #{} `{}'",
        join(.actions, "/"),
        state,
        position,
        symbol
    )]
    Conflict {
        position: usize,
        state: NodeID,
        symbol: Symbol,
        actions: Vec<Action>,
    },

    #[error("internal error: {}", reason)]
    Internal { reason: String },
}
