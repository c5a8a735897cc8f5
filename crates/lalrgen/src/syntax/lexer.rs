//! Lexer for `.g4` grammar files.

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/")]
pub enum Tok<'src> {
    #[token("grammar")]
    Grammar,

    #[token("fragment")]
    Fragment,

    #[token(":")]
    Colon,

    #[token(";")]
    Semi,

    #[token("|")]
    Pipe,

    #[token("->")]
    Arrow,

    #[token("*")]
    Star,

    #[token("+")]
    Plus,

    #[token("?")]
    Question,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("~")]
    Tilde,

    #[token("..")]
    Range,

    #[token(".")]
    Dot,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice())]
    Ident(&'src str),

    #[regex(r"'(?:[^'\\\n]|\\.)*'", |lex| lex.slice())]
    Literal(&'src str),

    #[regex(r"\[(?:[^\]\\]|\\.)*\]", |lex| lex.slice())]
    CharClass(&'src str),
}
