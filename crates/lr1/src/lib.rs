//! A canonical LR(1) parser generator with a table-driven shift-reduce parser.

pub mod engine;
pub mod first_sets;
pub mod grammar;
pub mod lr1;
pub mod parser;
pub mod syntax;
pub mod table;
pub mod tree;
pub mod types;
pub mod util;

pub use crate::{
    engine::ParseError,
    grammar::{Grammar, GrammarDefError, Rule, Symbol},
    lr1::{Config, MergeMode},
    parser::Parser,
    tree::TreeNode,
};
