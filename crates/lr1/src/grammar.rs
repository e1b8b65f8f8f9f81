//! Grammar types.

use crate::{
    types::{Map, Set},
    util::display_fn,
};
use std::{borrow::Cow, fmt};

/// The name of the synthetic end-of-input terminal.
pub const EOI_NAME: &str = "$";

/// The name of the synthetic start nonterminal of the augmenting rule.
pub const START_NAME: &str = "S'";

/// A grammar symbol, identified by its name and kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    name: Cow<'static, str>,
    nonterminal: bool,
}

impl Symbol {
    pub fn terminal(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            nonterminal: false,
        }
    }

    pub fn nonterminal(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            nonterminal: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_nonterminal(&self) -> bool {
        self.nonterminal
    }

    pub fn is_terminal(&self) -> bool {
        !self.nonterminal
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A production rule `left -> right...` as supplied by the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    left: Symbol,
    right: Vec<Symbol>,
}

impl Rule {
    pub fn new<I>(left: Symbol, right: I) -> Self
    where
        I: IntoIterator<Item = Symbol>,
    {
        Self {
            left,
            right: right.into_iter().collect(),
        }
    }

    /// Return the left-hand side of this rule.
    pub fn left(&self) -> &Symbol {
        &self.left
    }

    /// Return the right-hand side of this rule.
    pub fn right(&self) -> &[Symbol] {
        &self.right[..]
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.left)?;
        for symbol in &self.right {
            write!(f, " {}", symbol)?;
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}
impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::new(0);

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}
impl NonterminalID {
    /// The left-hand side of the augmenting rule.
    pub const START: Self = Self::new(0);

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}
impl RuleID {
    /// The augmenting rule `S' -> S`.
    pub const ACCEPT: Self = Self::new(0);

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

impl fmt::Display for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// A rule whose symbols are resolved to their IDs.
#[derive(Debug)]
pub struct Production {
    id: RuleID,
    left: NonterminalID,
    right: Vec<SymbolID>,
}

impl Production {
    pub fn id(&self) -> RuleID {
        self.id
    }

    pub fn left(&self) -> NonterminalID {
        self.left
    }

    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} ->", g.nonterminal(self.left))?;
            for symbol in &self.right {
                write!(f, " {}", g.symbol(*symbol))?;
            }
            Ok(())
        })
    }
}

/// The augmented grammar used to derive the parser tables.
///
/// Rule 0 is always the augmenting rule `S' -> S`, terminal 0 the
/// end-of-input marker `$` and nonterminal 0 the synthetic `S'`.
#[derive(Debug)]
pub struct Grammar {
    terminals: Set<Symbol>,
    nonterminals: Set<Symbol>,
    rules: Vec<Rule>,
    productions: Vec<Production>,
    start_symbol: NonterminalID,
}

impl Grammar {
    /// Augment and validate the supplied rules.
    pub fn new<I>(rules: I, start: Symbol) -> Result<Self, GrammarDefError>
    where
        I: IntoIterator<Item = Rule>,
    {
        let span = tracing::trace_span!("grammar");
        let _entered = span.enter();

        let eoi = Symbol::terminal(EOI_NAME);
        let accept = Symbol::nonterminal(START_NAME);

        let user_rules: Vec<Rule> = rules.into_iter().collect();
        let reserved = |symbol: &Symbol| *symbol == eoi || *symbol == accept;
        if reserved(&start) {
            return Err(GrammarDefError::ReservedSymbol { symbol: start });
        }
        for rule in &user_rules {
            if let Some(symbol) = std::iter::once(&rule.left)
                .chain(&rule.right)
                .find(|symbol| reserved(symbol))
            {
                return Err(GrammarDefError::ReservedSymbol {
                    symbol: symbol.clone(),
                });
            }
        }

        let mut rules = Vec::with_capacity(user_rules.len() + 1);
        rules.push(Rule::new(accept.clone(), [start.clone()]));
        rules.extend(user_rules);

        verify_rules(&rules, &start)?;

        let mut terminals = Set::default();
        let mut nonterminals = Set::default();
        terminals.insert(eoi);
        for rule in &rules {
            for symbol in std::iter::once(&rule.left).chain(&rule.right) {
                if symbol.is_nonterminal() {
                    nonterminals.insert(symbol.clone());
                } else {
                    terminals.insert(symbol.clone());
                }
            }
        }
        if terminals.len() > usize::from(u16::MAX) || nonterminals.len() > usize::from(u16::MAX) {
            return Err(GrammarDefError::TooLarge);
        }

        let mut productions = Vec::with_capacity(rules.len());
        for (i, rule) in rules.iter().enumerate() {
            let id = u16::try_from(i)
                .map(RuleID::new)
                .map_err(|_| GrammarDefError::TooLarge)?;
            let left = intern_nonterminal(&nonterminals, &rule.left);
            let right = rule
                .right
                .iter()
                .map(|symbol| intern(&terminals, &nonterminals, symbol))
                .collect();
            productions.push(Production { id, left, right });
        }

        let start_symbol = intern_nonterminal(&nonterminals, &start);

        tracing::debug!(
            "grammar: {} rules, {} terminals, {} nonterminals",
            rules.len(),
            terminals.len(),
            nonterminals.len()
        );

        Ok(Self {
            terminals,
            nonterminals,
            rules,
            productions,
            start_symbol,
        })
    }

    /// Return the rules in index order, starting with the augmenting rule.
    pub fn rules(&self) -> &[Rule] {
        &self.rules[..]
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[id.index()]
    }

    pub fn productions(&self) -> impl Iterator<Item = &Production> + '_ {
        self.productions.iter()
    }

    pub fn production(&self, id: RuleID) -> &Production {
        &self.productions[id.index()]
    }

    /// Return the productions whose left-hand side is `left`.
    pub fn productions_of(&self, left: NonterminalID) -> impl Iterator<Item = &Production> + '_ {
        self.productions.iter().filter(move |p| p.left == left)
    }

    pub fn terminals(&self) -> impl Iterator<Item = (TerminalID, &Symbol)> + '_ {
        self.terminals
            .iter()
            .enumerate()
            .map(|(i, symbol)| (TerminalID::new(i as u16), symbol))
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = (NonterminalID, &Symbol)> + '_ {
        self.nonterminals
            .iter()
            .enumerate()
            .map(|(i, symbol)| (NonterminalID::new(i as u16), symbol))
    }

    /// Iterate over the whole symbol universe, terminals first.
    pub fn symbols(&self) -> impl Iterator<Item = (SymbolID, &Symbol)> + '_ {
        let terminals = self.terminals().map(|(id, s)| (SymbolID::T(id), s));
        let nonterminals = self.nonterminals().map(|(id, s)| (SymbolID::N(id), s));
        terminals.chain(nonterminals)
    }

    pub fn terminal(&self, id: TerminalID) -> &Symbol {
        &self.terminals[id.index()]
    }

    pub fn nonterminal(&self, id: NonterminalID) -> &Symbol {
        &self.nonterminals[id.index()]
    }

    pub fn symbol(&self, id: SymbolID) -> &Symbol {
        match id {
            SymbolID::T(t) => self.terminal(t),
            SymbolID::N(n) => self.nonterminal(n),
        }
    }

    /// Find the ID of a symbol in this grammar.
    pub fn lookup(&self, symbol: &Symbol) -> Option<SymbolID> {
        if symbol.is_nonterminal() {
            let i = self.nonterminals.get_index_of(symbol)?;
            Some(SymbolID::N(NonterminalID::new(i as u16)))
        } else {
            let i = self.terminals.get_index_of(symbol)?;
            Some(SymbolID::T(TerminalID::new(i as u16)))
        }
    }

    /// Nonterminals that appear on some right-hand side but own no rule.
    pub fn nonterminals_without_rules(
        &self,
    ) -> impl Iterator<Item = (NonterminalID, &Symbol)> + '_ {
        self.nonterminals()
            .filter(move |(id, _)| self.productions_of(*id).next().is_none())
    }

    /// Return the user-chosen start symbol.
    pub fn start_symbol(&self) -> NonterminalID {
        self.start_symbol
    }

    pub fn display_symbols(&self) -> impl fmt::Display + '_ {
        display_fn(move |f| {
            writeln!(f, "## terminals:")?;
            for (_, symbol) in self.terminals() {
                writeln!(f, "{}", symbol)?;
            }
            writeln!(f, "\n## nonterminals:")?;
            for (id, symbol) in self.nonterminals() {
                write!(f, "{}", symbol)?;
                if id == self.start_symbol {
                    write!(f, " (start)")?;
                }
                writeln!(f)?;
            }
            Ok(())
        })
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## rules:")?;
        for (i, rule) in self.rules.iter().enumerate() {
            writeln!(f, "{:>2}: {}", i, rule)?;
        }
        Ok(())
    }
}

fn intern(terminals: &Set<Symbol>, nonterminals: &Set<Symbol>, symbol: &Symbol) -> SymbolID {
    if symbol.is_nonterminal() {
        SymbolID::N(intern_nonterminal(nonterminals, symbol))
    } else {
        let i = terminals.get_index_of(symbol).unwrap_or_default();
        SymbolID::T(TerminalID::new(i as u16))
    }
}

fn intern_nonterminal(nonterminals: &Set<Symbol>, symbol: &Symbol) -> NonterminalID {
    let i = nonterminals.get_index_of(symbol).unwrap_or_default();
    NonterminalID::new(i as u16)
}

fn verify_rules(rules: &[Rule], start: &Symbol) -> Result<(), GrammarDefError> {
    if !rules[1..].iter().any(|rule| rule.left == *start) {
        return Err(GrammarDefError::MissingStartRule {
            symbol: start.clone(),
        });
    }

    if let Some(rule) = rules.iter().find(|rule| rule.left.is_terminal()) {
        return Err(GrammarDefError::TerminalOnLeft { rule: rule.clone() });
    }

    let mut seen = Set::default();
    for rule in rules {
        if !seen.insert(rule) {
            return Err(GrammarDefError::DuplicateRule { rule: rule.clone() });
        }
    }

    // nonterminal -> left-hand sides of the rules producing it
    let mut producers: Map<&Symbol, Vec<&Symbol>> = Map::default();
    for rule in rules {
        producers.entry(&rule.left).or_default();
        for symbol in rule.right.iter().filter(|s| s.is_nonterminal()) {
            producers.entry(symbol).or_default().push(&rule.left);
        }
    }
    for (symbol, lefts) in producers.iter().skip(1) {
        if lefts.is_empty() {
            return Err(GrammarDefError::Unproduced {
                symbol: (*symbol).clone(),
            });
        }
        if lefts.iter().all(|left| left == symbol) {
            return Err(GrammarDefError::SelfProducedOnly {
                symbol: (*symbol).clone(),
            });
        }
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("no rule has the start symbol `{}' on its left side", symbol)]
    MissingStartRule { symbol: Symbol },

    #[error("the left side of the rule `{}' is a terminal symbol", rule)]
    TerminalOnLeft { rule: Rule },

    #[error("duplicate production rule `{}'", rule)]
    DuplicateRule { rule: Rule },

    #[error("the nonterminal `{}' is not produced by any rule", symbol)]
    Unproduced { symbol: Symbol },

    #[error("the nonterminal `{}' is only produced by its own rules", symbol)]
    SelfProducedOnly { symbol: Symbol },

    #[error("the symbol `{}' is reserved", symbol)]
    ReservedSymbol { symbol: Symbol },

    #[error("too many symbols or rules in the grammar")]
    TooLarge,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(name: &'static str) -> Symbol {
        Symbol::terminal(name)
    }

    fn n(name: &'static str) -> Symbol {
        Symbol::nonterminal(name)
    }

    #[test]
    fn augmented() {
        let grammar = Grammar::new(
            [
                Rule::new(n("S"), [n("A"), t("b")]),
                Rule::new(n("A"), [t("a")]),
            ],
            n("S"),
        )
        .unwrap();

        assert_eq!(grammar.rules().len(), 3);
        assert_eq!(grammar.rule(RuleID::ACCEPT).to_string(), "S' -> S");
        assert_eq!(grammar.terminal(TerminalID::EOI).name(), "$");
        assert_eq!(grammar.nonterminal(NonterminalID::START).name(), "S'");
        assert_eq!(grammar.nonterminal(grammar.start_symbol()), &n("S"));

        let terminals: Vec<_> = grammar.terminals().map(|(_, s)| s.name()).collect();
        assert_eq!(terminals, ["$", "b", "a"]);
        let nonterminals: Vec<_> = grammar.nonterminals().map(|(_, s)| s.name()).collect();
        assert_eq!(nonterminals, ["S'", "S", "A"]);

        let production = grammar.production(RuleID::new(1));
        assert_eq!(production.display(&grammar).to_string(), "S -> A b");
        assert_eq!(grammar.lookup(&t("a")), Some(production_symbol(&grammar, "a")));
        assert_eq!(grammar.lookup(&n("a")), None);
        assert_eq!(grammar.lookup(&t("c")), None);

        eprintln!("{}", grammar);
        eprintln!("{}", grammar.display_symbols());
    }

    fn production_symbol(grammar: &Grammar, name: &str) -> SymbolID {
        grammar
            .symbols()
            .find(|(_, s)| s.name() == name)
            .map(|(id, _)| id)
            .unwrap()
    }

    #[test]
    fn missing_start_rule() {
        let err = Grammar::new([Rule::new(n("A"), [t("a")])], n("S")).unwrap_err();
        assert!(matches!(err, GrammarDefError::MissingStartRule { symbol } if symbol == n("S")));
    }

    #[test]
    fn terminal_on_left() {
        let err = Grammar::new(
            [Rule::new(n("S"), [t("a")]), Rule::new(t("a"), [t("b")])],
            n("S"),
        )
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::TerminalOnLeft { .. }));
    }

    #[test]
    fn duplicate_rule() {
        let err = Grammar::new(
            [Rule::new(n("S"), [t("a")]), Rule::new(n("S"), [t("a")])],
            n("S"),
        )
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateRule { rule } if rule.left() == &n("S")));
    }

    #[test]
    fn unproduced() {
        let err = Grammar::new(
            [Rule::new(n("S"), [t("a")]), Rule::new(n("X"), [t("b")])],
            n("S"),
        )
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::Unproduced { symbol } if symbol == n("X")));
    }

    #[test]
    fn self_produced_only() {
        let err = Grammar::new(
            [
                Rule::new(n("S"), [t("a")]),
                Rule::new(n("X"), [n("X"), t("b")]),
                Rule::new(n("X"), []),
            ],
            n("S"),
        )
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::SelfProducedOnly { symbol } if symbol == n("X")));
    }

    #[test]
    fn reserved_symbols() {
        let err = Grammar::new([Rule::new(n("S"), [t("$")])], n("S")).unwrap_err();
        assert!(matches!(err, GrammarDefError::ReservedSymbol { .. }));

        let err = Grammar::new([Rule::new(n("S'"), [t("a")])], n("S'")).unwrap_err();
        assert!(matches!(err, GrammarDefError::ReservedSymbol { .. }));
    }

    #[test]
    fn nonterminal_without_rules_is_accepted() {
        let grammar = Grammar::new([Rule::new(n("S"), [n("X"), t("a")])], n("S")).unwrap();
        assert!(grammar.lookup(&n("X")).is_some());
        assert_eq!(grammar.productions_of(NonterminalID::new(2)).count(), 0);

        let empty: Vec<_> = grammar.nonterminals_without_rules().collect();
        assert_eq!(empty, [(NonterminalID::new(2), &n("X"))]);
    }

    #[test]
    fn every_nonterminal_has_rules() {
        let grammar = Grammar::new(
            [Rule::new(n("S"), [n("A")]), Rule::new(n("A"), [t("a")])],
            n("S"),
        )
        .unwrap();
        assert_eq!(grammar.nonterminals_without_rules().count(), 0);
    }
}
