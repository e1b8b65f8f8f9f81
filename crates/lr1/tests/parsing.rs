use lr1::{syntax, table::Action, Config, ParseError, Parser, Rule, Symbol, TreeNode};
use std::rc::Rc;

fn t(name: &'static str) -> Symbol {
    Symbol::terminal(name)
}

fn n(name: &'static str) -> Symbol {
    Symbol::nonterminal(name)
}

fn tokens(names: &[&'static str]) -> Vec<TreeNode> {
    names.iter().map(|name| TreeNode::leaf(t(name))).collect()
}

fn nullable_parser() -> Parser {
    Parser::build(
        [
            Rule::new(n("S"), [n("A"), n("B")]),
            Rule::new(n("A"), [n("A"), t("a")]),
            Rule::new(n("A"), []),
            Rule::new(n("B"), [t("b"), n("B")]),
            Rule::new(n("B"), []),
        ],
        n("S"),
    )
    .unwrap()
}

fn dangling_else_parser() -> Parser {
    Parser::build(
        [
            Rule::new(n("S"), [t("if"), n("S")]),
            Rule::new(n("S"), [t("if"), n("S"), t("else"), n("S")]),
            Rule::new(n("S"), [t("x")]),
        ],
        n("S"),
    )
    .unwrap()
}

#[test]
fn round_trip() {
    let parser = nullable_parser();
    let root = parser.parse(tokens(&["a", "a", "b"])).unwrap();

    assert_eq!(root.symbol(), &n("S"));
    assert_eq!(root.display_flat().to_string(), "S(A(A(A() a) a) B(b B()))");
    assert_eq!(root.display_simple().to_string(), "((a a) b)");
    assert_eq!(
        root.display_layered().to_string(),
        "\
S
 |- A
 |   |- A
 |   |   |- A => null
 |   |   `- a
 |   `- a
 `- B
     |- b
     `- B => null"
    );

    // parent links point back up the tree
    let b = &root.children()[1].children()[0];
    assert_eq!(b.symbol(), &t("b"));
    let parent = b.parent().unwrap();
    assert!(Rc::ptr_eq(&parent, &root.children()[1]));
}

#[test]
fn empty_input() {
    let parser = nullable_parser();
    let root = parser.parse(tokens(&[])).unwrap();
    assert_eq!(root.display_flat().to_string(), "S(A() B())");
    assert_eq!(root.display_simple().to_string(), "");
}

#[test]
fn parse_twice() {
    let parser = nullable_parser();
    let first = parser.parse(tokens(&["a", "b", "b"])).unwrap();
    let second = parser.parse(tokens(&["a", "b", "b"])).unwrap();
    assert_eq!(
        first.display_flat().to_string(),
        second.display_flat().to_string()
    );
}

#[test]
fn dangling_else() {
    let _ = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();

    let parser = dangling_else_parser();

    let root = parser.parse(tokens(&["if", "x", "else", "x"])).unwrap();
    assert_eq!(root.display_flat().to_string(), "S(if S(x) else S(x))");

    let err = parser
        .parse(tokens(&["if", "if", "x", "else", "x"]))
        .unwrap_err();
    match err {
        ParseError::Conflict {
            position,
            symbol,
            actions,
            ..
        } => {
            assert_eq!(position, 4);
            assert_eq!(symbol, t("else"));
            assert!(actions.iter().any(|a| matches!(a, Action::Shift(..))));
            assert!(actions.iter().any(|a| matches!(a, Action::Reduce(..))));
        }
        err => panic!("unexpected error: {}", err),
    }
}

#[test]
fn undefined_symbol() {
    let parser = nullable_parser();
    let err = parser.parse(tokens(&["a", "c"])).unwrap_err();
    assert!(
        matches!(&err, ParseError::UndefinedSymbol { position: 2, symbol } if *symbol == t("c")),
        "{}",
        err
    );

    // a nonterminal token is not part of the terminal universe
    let err = parser
        .parse(vec![TreeNode::<()>::leaf(n("A"))])
        .unwrap_err();
    assert!(matches!(err, ParseError::UndefinedSymbol { position: 1, .. }));

    // the end-of-input marker cannot be supplied by the user
    let err = parser.parse(tokens(&["$"])).unwrap_err();
    assert!(matches!(err, ParseError::UndefinedSymbol { position: 1, .. }));
}

#[test]
fn rejection() {
    let parser = Parser::build([Rule::new(n("S"), [t("a"), t("b")])], n("S")).unwrap();
    let err = parser.parse(tokens(&["a", "a"])).unwrap_err();
    match err {
        ParseError::Syntax {
            position,
            found,
            expected,
        } => {
            assert_eq!(position, 2);
            assert_eq!(found, t("a"));
            assert_eq!(expected, [t("b")]);
        }
        err => panic!("unexpected error: {}", err),
    }

    let err = parser.parse(tokens(&["a"])).unwrap_err();
    assert!(
        matches!(&err, ParseError::Syntax { position: 2, found, .. } if found.name() == "$"),
        "{}",
        err
    );
}

#[test]
fn nothing_acceptable() {
    // X owns no rule, so no terminal can start a sentence
    let parser = Parser::build([Rule::new(n("S"), [n("X"), t("a")])], n("S")).unwrap();
    let err = parser.parse(tokens(&["a"])).unwrap_err();
    assert!(
        matches!(&err, ParseError::Syntax { position: 1, expected, .. } if expected.is_empty()),
        "{}",
        err
    );
    assert_eq!(
        err.to_string(),
        "syntax error at symbol #1 `a': no terminal is acceptable here"
    );

    let parser = Parser::build([Rule::new(n("S"), [t("a"), t("b")])], n("S")).unwrap();
    let err = parser.parse(tokens(&["a", "a"])).unwrap_err();
    assert_eq!(err.to_string(), "syntax error at symbol #2 `a': expected b");
}

// S -> C | d A ; C -> A | B ; A -> x ; B -> x
fn merge_rules() -> Vec<Rule> {
    vec![
        Rule::new(n("S"), [n("C")]),
        Rule::new(n("S"), [t("d"), n("A")]),
        Rule::new(n("C"), [n("A")]),
        Rule::new(n("C"), [n("B")]),
        Rule::new(n("A"), [t("x")]),
        Rule::new(n("B"), [t("x")]),
    ]
}

#[test]
fn canonical_states_are_not_merged_into_supersets() {
    let canonical = Parser::build(merge_rules(), n("S")).unwrap();
    let root = canonical.parse(tokens(&["d", "x"])).unwrap();
    assert_eq!(root.display_flat().to_string(), "S(d A(x))");

    let superset =
        Parser::build_with_config(merge_rules(), n("S"), Config::new().use_superset()).unwrap();
    let err = superset.parse(tokens(&["d", "x"])).unwrap_err();
    assert!(matches!(err, ParseError::Conflict { position: 3, .. }), "{}", err);

    assert_eq!(canonical.automaton().len(), superset.automaton().len() + 1);
}

#[test]
fn arithmetic_from_text() {
    let rules = syntax::parse(
        "\
Expr -> Expr + Term | Term
Term -> Term * Factor | Factor
Factor -> num | ( Expr )
",
    )
    .unwrap();
    let parser = Parser::build(rules, n("Expr")).unwrap();

    let root = parser.parse(syntax::tokens("num + num * ( num )")).unwrap();
    assert_eq!(root.display_simple().to_string(), "(num + (num * (( num ))))");

    let leaves: Vec<_> = collect_payloads(&root);
    assert_eq!(leaves, ["num", "+", "num", "*", "(", "num", ")"]);
}

fn collect_payloads(node: &TreeNode<String>) -> Vec<String> {
    if let Some(payload) = node.payload() {
        return vec![payload.clone()];
    }
    node.children()
        .iter()
        .flat_map(|child| collect_payloads(child))
        .collect()
}

#[test]
fn parser_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Parser>();

    let parser = nullable_parser();
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                let root = parser.parse(tokens(&["a", "b"])).unwrap();
                assert_eq!(root.display_simple().to_string(), "(a b)");
            });
        }
    });
}
