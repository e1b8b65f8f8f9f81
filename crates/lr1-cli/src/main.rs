use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use lr1::{syntax, Config, Symbol};
use std::{
    io::{self, Write as _},
    path::PathBuf,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The start symbol of the grammar.
    ///
    /// Defaults to the left-hand side of the first rule.
    #[arg(short, long)]
    start: Option<String>,

    /// How new item sets are matched against the existing states.
    #[arg(long, value_enum, default_value_t = MergeMode::Canonical)]
    merge_mode: MergeMode,

    /// Do not print the grammar, automaton and parse table reports.
    #[arg(short, long)]
    quiet: bool,

    /// The path of grammar definition file.
    input: PathBuf,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum MergeMode {
    /// Knuth's canonical LR(1) collection.
    Canonical,
    /// Reuse any state whose item set contains the new items.
    Superset,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    let rules = syntax::parse_file(&args.input).with_context(|| {
        anyhow::anyhow!("failed to read the grammar from {}", args.input.display())
    })?;

    let start = match &args.start {
        Some(name) => Symbol::nonterminal(name.clone()),
        None => rules
            .first()
            .map(|rule| rule.left().clone())
            .context("the grammar file contains no rules")?,
    };

    let mut config = Config::new();
    match args.merge_mode {
        MergeMode::Canonical => config.use_canonical(),
        MergeMode::Superset => config.use_superset(),
    };

    let parser = lr1::Parser::build_with_config(rules, start, &config)
        .context("failed to build the parser")?;
    let grammar = parser.grammar();

    let empty_nonterminals: Vec<_> = grammar
        .nonterminals_without_rules()
        .map(|(_, symbol)| symbol.name())
        .collect();
    if !empty_nonterminals.is_empty() {
        println!(
            "[warning] The following nonterminals have no associated production rule: {:?}",
            empty_nonterminals
        );
    }

    if !args.quiet {
        println!("{}", grammar);
        println!("{}", grammar.display_symbols());
        println!("{}", parser.first_sets().display(grammar));
        println!("{}", parser.automaton().display(grammar));
        println!("{}", parser.table().display(grammar));
    }

    let num_conflicts = parser.table().conflicts().count();
    if num_conflicts > 0 {
        let suffix = if num_conflicts == 1 { "" } else { "s" };
        println!(
            "[warning] The parse table has {} conflicting cell{}.",
            num_conflicts, suffix
        );
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line).context("failed to read stdin")? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        match parser.parse(syntax::tokens(line)) {
            Ok(root) => {
                writeln!(stdout, "{}", root.display_flat())?;
                writeln!(stdout, "{}", root.display_simple())?;
                writeln!(stdout, "{}", root.display_layered())?;
            }
            Err(err) => writeln!(stdout, "[error] {}", err)?,
        }
    }

    Ok(())
}
