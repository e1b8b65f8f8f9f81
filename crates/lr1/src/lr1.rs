//! The implementation of LR(1) automaton.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, RuleID, SymbolID, TerminalID},
    types::{Map, Set},
    util::display_fn,
};
use std::{collections::BTreeSet, fmt, mem};

/// The strategy used to decide whether a freshly extracted item set
/// is an already existing state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Item sets are equivalent in the sense of Knuth's canonical LR(1) method,
    /// that is, the extracted item set equals the kernel of the existing state
    /// including every lookahead set.
    #[default]
    Canonical,

    /// The extracted item set is found inside the closed item set of an
    /// existing state, each item with an identical lookahead set.
    ///
    /// This produces fewer states but may link a transition to a state
    /// holding extra completed items, introducing conflicts that the
    /// canonical collection does not have.
    Superset,
}

#[derive(Debug, Default)]
pub struct Config {
    merge_mode: MergeMode,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            merge_mode: MergeMode::Canonical,
        }
    }

    /// Set the merge strategy of DFA nodes to match Knuth's Canonical LR(1) method.
    ///
    /// This is the default.
    pub fn use_canonical(&mut self) -> &mut Self {
        self.merge_mode = MergeMode::Canonical;
        self
    }

    /// Set the merge strategy of DFA nodes to the superset matching.
    pub fn use_superset(&mut self) -> &mut Self {
        self.merge_mode = MergeMode::Superset;
        self
    }

    pub fn merge_mode(&self) -> MergeMode {
        self.merge_mode
    }
}

#[derive(Debug)]
pub struct DFA {
    nodes: Vec<DFANode>,
}

impl DFA {
    pub fn generate(grammar: &Grammar, first_sets: &FirstSets) -> Self {
        Self::generate_with_config(grammar, first_sets, &Config::new())
    }

    pub fn generate_with_config(grammar: &Grammar, first_sets: &FirstSets, config: &Config) -> Self {
        let span = tracing::trace_span!("dfa", merge_mode = ?config.merge_mode);
        let _entered = span.enter();

        let mut gen = DFAGenerator::new(grammar, first_sets, config);
        gen.populate_nodes();
        tracing::debug!("{} state(s)", gen.nodes.len());
        Self { nodes: gen.nodes }
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeID, &DFANode)> + '_ {
        self.nodes.iter().map(|node| (node.id, node))
    }

    pub fn node(&self, id: NodeID) -> &DFANode {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, (id, node)) in self.nodes().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }

                writeln!(f, "#### State {:02}", id)?;
                writeln!(f, "## item_sets")?;
                for (core, lookaheads) in &node.item_set {
                    write!(f, "- {}  [", core.display(g))?;
                    for (i, lookahead) in lookaheads.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" ")?;
                        }
                        write!(f, "{}", g.terminal(*lookahead))?;
                    }
                    f.write_str("]\n")?;
                }

                writeln!(f, "## edges")?;
                for (symbol, target) in node.edges() {
                    writeln!(f, "- {} => {:02}", g.symbol(symbol), target)?;
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeID {
    raw: usize,
}

impl NodeID {
    /// The initial state, the closure of `S' -> . S [$]`.
    pub const START: Self = Self::new(0);

    #[inline]
    const fn new(raw: usize) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.raw
    }
}

impl fmt::Display for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

#[derive(Debug)]
pub struct DFANode {
    id: NodeID,
    kernel: LRItemSet,
    item_set: LRItemSet,
    edges: Map<SymbolID, NodeID>,
}

impl DFANode {
    fn new(id: NodeID, kernel: LRItemSet) -> Self {
        Self {
            id,
            item_set: kernel.clone(),
            kernel,
            edges: Map::default(),
        }
    }

    pub fn id(&self) -> NodeID {
        self.id
    }

    /// The unclosed item set this state was created from.
    pub fn kernel(&self) -> impl Iterator<Item = (&LRItemCore, &Set<TerminalID>)> + '_ {
        self.kernel.iter()
    }

    /// The closed item set of this state.
    pub fn items(&self) -> impl Iterator<Item = (&LRItemCore, &Set<TerminalID>)> + '_ {
        self.item_set.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = (SymbolID, NodeID)> + '_ {
        self.edges.iter().map(|(symbol, target)| (*symbol, *target))
    }

    pub fn edge(&self, symbol: SymbolID) -> Option<NodeID> {
        self.edges.get(&symbol).copied()
    }
}

/// A production rule with a marker position, the number of right-hand
/// symbols already recognized.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LRItemCore {
    rule: RuleID,
    marker: usize,
}

impl LRItemCore {
    pub fn rule(&self) -> RuleID {
        self.rule
    }

    pub fn marker(&self) -> usize {
        self.marker
    }

    // `"(X -> A . B)"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let production = g.production(self.rule);
            write!(f, "({} ->", g.nonterminal(production.left()))?;
            for (i, symbol) in production.right().iter().enumerate() {
                if i == self.marker {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol(*symbol))?;
            }
            if self.marker == production.right().len() {
                f.write_str(" .")?;
            }
            f.write_str(")")
        })
    }
}

/// Items keyed by their core, each holding its lookahead symbols.
/// Iteration follows insertion order.
type LRItemSet = Map<LRItemCore, Set<TerminalID>>;
type LRItemCores = BTreeSet<LRItemCore>;

/// `kernel` equals `items`, lookahead sets included.
fn is_same_item_set(items: &LRItemSet, kernel: &LRItemSet) -> bool {
    items.len() == kernel.len() && contains_items(items, kernel)
}

/// Every item of `kernel` is in `items` with the same lookahead set.
fn contains_items(items: &LRItemSet, kernel: &LRItemSet) -> bool {
    kernel
        .iter()
        .all(|(core, lookaheads)| items.get(core) == Some(lookaheads))
}

// === DFAGenerator ===

#[derive(Debug)]
struct NodeExtractor<'g> {
    grammar: &'g Grammar,
    first_sets: &'g FirstSets,
}

impl NodeExtractor<'_> {
    /// Expand `items` into its closure.
    fn expand_closures(&self, items: &mut LRItemSet) {
        let mut changed = true;
        while changed {
            changed = false;

            let mut added: Map<LRItemCore, Set<TerminalID>> = Map::default();
            for (core, lookaheads) in &*items {
                let production = self.grammar.production(core.rule);

                // [X -> ... @ Y beta]
                let (y_symbol, beta) = match &production.right()[core.marker..] {
                    [SymbolID::N(y_symbol), beta @ ..] => (*y_symbol, beta),
                    _ => continue,
                };

                // x \in First(beta l1) \cup ... \cup First(beta lk)
                let x = self.first_sets.get(beta, lookaheads.iter().copied());
                for production in self.grammar.productions_of(y_symbol) {
                    added
                        .entry(LRItemCore {
                            rule: production.id(),
                            marker: 0,
                        })
                        .or_default()
                        .extend(x.iter().copied());
                }
            }

            for (core, lookaheads) in added {
                let slot = items.entry(core).or_insert_with(|| {
                    changed = true;
                    Set::default()
                });
                for l in lookaheads {
                    changed |= slot.insert(l);
                }
            }
        }
    }

    /// Advance the marker of every item over its next symbol and group the
    /// results by that symbol, in order of first appearance.
    fn extract_transitions(&self, items: &LRItemSet) -> Map<SymbolID, LRItemSet> {
        let mut item_sets: Map<SymbolID, LRItemSet> = Map::default();
        for (core, lookaheads) in items {
            let production = self.grammar.production(core.rule);
            let Some(label) = production.right().get(core.marker) else {
                continue;
            };
            item_sets.entry(*label).or_default().insert(
                LRItemCore {
                    marker: core.marker + 1,
                    ..*core
                },
                lookaheads.clone(),
            );
        }
        item_sets
    }
}

#[derive(Debug)]
struct DFAGenerator<'g> {
    extractor: NodeExtractor<'g>,
    nodes: Vec<DFANode>,
    same_cores: Map<LRItemCores, Vec<NodeID>>,
    merge_mode: MergeMode,
}

impl<'g> DFAGenerator<'g> {
    fn new(grammar: &'g Grammar, first_sets: &'g FirstSets, config: &Config) -> Self {
        let mut gen = Self {
            extractor: NodeExtractor {
                grammar,
                first_sets,
            },
            nodes: vec![],
            same_cores: Map::default(),
            merge_mode: config.merge_mode,
        };

        // S' -> . S [$]
        let mut kernel = LRItemSet::default();
        kernel.insert(
            LRItemCore {
                rule: RuleID::ACCEPT,
                marker: 0,
            },
            Some(TerminalID::EOI).into_iter().collect(),
        );
        let start = DFANode::new(NodeID::START, kernel);
        gen.register_cores(&start);
        gen.nodes.push(start);

        gen
    }

    fn register_cores(&mut self, node: &DFANode) {
        let cores = node.kernel.keys().copied().collect();
        self.same_cores.entry(cores).or_default().push(node.id);
    }

    fn populate_nodes(&mut self) {
        let mut pending = vec![NodeID::START];
        let mut pass = 0;
        while !pending.is_empty() {
            pass += 1;
            tracing::trace!("pass {}: {} pending state(s)", pass, pending.len());

            // states created in this pass, appended once the pass ends
            let mut created: Vec<DFANode> = vec![];
            for id in mem::take(&mut pending) {
                let mut item_set = mem::take(&mut self.nodes[id.index()].item_set);
                self.extractor.expand_closures(&mut item_set);
                self.nodes[id.index()].item_set = item_set;

                let transitions = self
                    .extractor
                    .extract_transitions(&self.nodes[id.index()].item_set);

                let mut edges = Map::default();
                for (symbol, kernel) in transitions {
                    let target = match self.find_node(&created, &kernel) {
                        Some(target) => target,
                        None => {
                            let target = NodeID::new(self.nodes.len() + created.len());
                            let node = DFANode::new(target, kernel);
                            self.register_cores(&node);
                            created.push(node);
                            target
                        }
                    };
                    edges.insert(symbol, target);
                }
                self.nodes[id.index()].edges = edges;
            }

            for node in created {
                pending.push(node.id);
                self.nodes.push(node);
            }
        }
    }

    fn find_node(&self, created: &[DFANode], kernel: &LRItemSet) -> Option<NodeID> {
        let node = |id: NodeID| match self.nodes.get(id.index()) {
            Some(node) => node,
            None => &created[id.index() - self.nodes.len()],
        };
        match self.merge_mode {
            MergeMode::Canonical => {
                let cores: LRItemCores = kernel.keys().copied().collect();
                self.same_cores
                    .get(&cores)?
                    .iter()
                    .copied()
                    .find(|id| is_same_item_set(&node(*id).kernel, kernel))
            }
            MergeMode::Superset => self
                .nodes
                .iter()
                .chain(created)
                .find(|node| contains_items(&node.item_set, kernel))
                .map(|node| node.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Rule, Symbol};

    fn t(name: &'static str) -> Symbol {
        Symbol::terminal(name)
    }

    fn n(name: &'static str) -> Symbol {
        Symbol::nonterminal(name)
    }

    fn expr_grammar() -> Grammar {
        Grammar::new(
            [
                Rule::new(n("A"), [n("E"), t("="), n("E")]),
                Rule::new(n("A"), [t("id")]),
                Rule::new(n("E"), [n("E"), t("+"), n("T")]),
                Rule::new(n("E"), [n("T")]),
                Rule::new(n("T"), [t("num")]),
                Rule::new(n("T"), [t("id")]),
            ],
            n("A"),
        )
        .unwrap()
    }

    // S -> C | d A ; C -> A | B ; A -> x ; B -> x
    fn merge_grammar() -> Grammar {
        Grammar::new(
            [
                Rule::new(n("S"), [n("C")]),
                Rule::new(n("S"), [t("d"), n("A")]),
                Rule::new(n("C"), [n("A")]),
                Rule::new(n("C"), [n("B")]),
                Rule::new(n("A"), [t("x")]),
                Rule::new(n("B"), [t("x")]),
            ],
            n("S"),
        )
        .unwrap()
    }

    #[test]
    fn smoketest() {
        let grammar = expr_grammar();
        let first_sets = FirstSets::new(&grammar);
        let dfa = DFA::generate(&grammar, &first_sets);
        eprintln!("DFA Nodes:\n---\n{}", dfa.display(&grammar));

        let start = dfa.node(NodeID::START);
        let kernel: Vec<_> = start.kernel().collect();
        assert_eq!(kernel.len(), 1);
        assert_eq!(kernel[0].0.rule(), RuleID::ACCEPT);
        assert_eq!(kernel[0].0.marker(), 0);
        assert!(kernel[0].1.contains(&TerminalID::EOI));

        for (id, node) in dfa.nodes() {
            assert_eq!(node.id(), id);
            for (_, target) in node.edges() {
                assert!(target.index() < dfa.len());
            }
        }
    }

    #[test]
    fn closure_is_idempotent() {
        let grammar = expr_grammar();
        let first_sets = FirstSets::new(&grammar);
        let dfa = DFA::generate(&grammar, &first_sets);
        let extractor = NodeExtractor {
            grammar: &grammar,
            first_sets: &first_sets,
        };
        for (_, node) in dfa.nodes() {
            let mut items = node.item_set.clone();
            extractor.expand_closures(&mut items);
            assert!(is_same_item_set(&items, &node.item_set));
        }
    }

    #[test]
    fn closure_lookaheads() {
        let grammar = expr_grammar();
        let first_sets = FirstSets::new(&grammar);
        let dfa = DFA::generate(&grammar, &first_sets);

        // (E -> . E + T) sees `=` from A -> . E = E and `+` from itself.
        let start = dfa.node(NodeID::START);
        let (_, lookaheads) = start
            .items()
            .find(|(core, _)| core.marker() == 0 && core.display(&grammar).to_string() == "(E -> . E + T)")
            .unwrap();
        let mut names: Vec<_> = lookaheads.iter().map(|t| grammar.terminal(*t).name()).collect();
        names.sort();
        assert_eq!(names, ["+", "="]);
    }

    #[test]
    fn deterministic_numbering() {
        let grammar = expr_grammar();
        let first_sets = FirstSets::new(&grammar);
        let dfa1 = DFA::generate(&grammar, &first_sets);
        let dfa2 = DFA::generate(&grammar, &first_sets);
        assert_eq!(
            dfa1.display(&grammar).to_string(),
            dfa2.display(&grammar).to_string()
        );
    }

    #[test]
    fn merge_modes() {
        let grammar = merge_grammar();
        let first_sets = FirstSets::new(&grammar);

        let canonical = DFA::generate(&grammar, &first_sets);
        let superset = DFA::generate_with_config(
            &grammar,
            &first_sets,
            Config::new().use_superset(),
        );
        eprintln!("canonical:\n{}", canonical.display(&grammar));
        eprintln!("superset:\n{}", superset.display(&grammar));

        assert_eq!(canonical.len(), superset.len() + 1);
        for dfa in [&canonical, &superset] {
            for (_, node) in dfa.nodes() {
                let edges: Vec<_> = node.edges().map(|(symbol, _)| symbol).collect();
                let unique: Set<_> = edges.iter().copied().collect();
                assert_eq!(edges.len(), unique.len());
            }
        }
    }
}
