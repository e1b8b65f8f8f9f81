//! Reader for textual grammar rules.
//!
//! Each non-blank line holds the alternatives of one nonterminal:
//!
//! ```text
//! # comment
//! Expr -> Expr + Term | Term
//! Opt -> x |
//! ```
//!
//! The first `->` separates the left-hand side, so it may touch the symbols
//! around it. Other symbols are separated by whitespace or `|`. A symbol
//! starting with an ASCII uppercase letter is a nonterminal, anything else
//! is a terminal.

pub mod lexer;

use self::lexer::{Lexer, Spanned, Token};
use crate::{
    grammar::{Rule, Symbol},
    tree::TreeNode,
};
use std::{fs, io, path::Path};

#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("IO error: {}", _0)]
    IO(#[from] io::Error),

    #[error("line {}: invalid token ({})", line, detail)]
    Lexer { line: usize, detail: String },

    #[error("line {}: missing the left-hand side symbol", line)]
    MissingLeft { line: usize },

    #[error("line {}: expected `->' after `{}'", line, left)]
    MissingArrow { line: usize, left: String },

    #[error("line {}, column {}: unexpected `->'", line, column)]
    UnexpectedArrow { line: usize, column: usize },
}

pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<Rule>, SyntaxError> {
    let source = fs::read_to_string(path)?;
    parse(&source)
}

pub fn parse(source: &str) -> Result<Vec<Rule>, SyntaxError> {
    let span = tracing::trace_span!("parse");
    let _entered = span.enter();

    let mut rules = vec![];
    for (i, line) in source.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        parse_line(i + 1, line, &mut rules)?;
    }
    tracing::trace!("read {} rule(s)", rules.len());
    Ok(rules)
}

fn parse_line(line_no: usize, line: &str, rules: &mut Vec<Rule>) -> Result<(), SyntaxError> {
    let Some((left, right)) = line.split_once("->") else {
        return Err(match &lex(line_no, line)?[..] {
            [(_, Token::Symbol(left), _), ..] => SyntaxError::MissingArrow {
                line: line_no,
                left: left.to_string(),
            },
            _ => SyntaxError::MissingLeft { line: line_no },
        });
    };

    let left = match &lex(line_no, left)?[..] {
        [(_, Token::Symbol(left), _)] => classify(left),
        [(_, Token::Symbol(left), _), ..] => {
            return Err(SyntaxError::MissingArrow {
                line: line_no,
                left: left.to_string(),
            })
        }
        _ => return Err(SyntaxError::MissingLeft { line: line_no }),
    };

    // columns of the right-hand side tokens are relative to the text after `->`
    let offset = line.len() - right.len();
    let offset = line[..offset].chars().count();

    let tokens = lex(line_no, right)?;
    for alternative in tokens.split(|(_, token, _)| *token == Token::VertBar) {
        let mut right = vec![];
        for (start, token, _) in alternative {
            match token {
                Token::Symbol(name) => right.push(classify(name)),
                _ => {
                    return Err(SyntaxError::UnexpectedArrow {
                        line: line_no,
                        column: offset + start.col as usize + 1,
                    })
                }
            }
        }
        rules.push(Rule::new(left.clone(), right));
    }

    Ok(())
}

fn lex(line_no: usize, text: &str) -> Result<Vec<Spanned<'_>>, SyntaxError> {
    Lexer::new(text)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| SyntaxError::Lexer {
            line: line_no,
            detail: format!("{:?}", err),
        })
}

fn classify(name: &str) -> Symbol {
    if name.starts_with(|ch: char| ch.is_ascii_uppercase()) {
        Symbol::nonterminal(name.to_owned())
    } else {
        Symbol::terminal(name.to_owned())
    }
}

/// Split an input line on whitespace into terminal leaves carrying their text.
pub fn tokens(line: &str) -> Vec<TreeNode<String>> {
    line.split_whitespace()
        .map(|text| TreeNode::with_payload(Symbol::terminal(text.to_owned()), text.to_owned()))
        .collect()
}
