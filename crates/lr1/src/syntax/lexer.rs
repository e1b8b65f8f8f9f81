//! Lexer for a single rule line.

use lexgen_util::Loc;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Token<'input> {
    Arrow,
    VertBar,
    Symbol(&'input str),
}

pub type Spanned<'input> = (Loc, Token<'input>, Loc);

lexgen::lexer! {
    pub Lexer -> Token<'input>;

    let whitespace = [' ' '\t' '\r' '\n'];
    let symbol_char = _ # [' ' '\t' '\r' '\n' '|'];

    rule Init {
        $whitespace+,
        "->" = Token::Arrow,
        "|" = Token::VertBar,
        $symbol_char+ => |lexer| {
            let token = Token::Symbol(lexer.match_());
            lexer.return_(token)
        },
    }
}
