#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use logos::Logos;
use miette::Diagnostic;
use quivela_ast::{span_between, Span};
use thiserror::Error;

use crate::token::{Token, TokenKind};

#[derive(Debug, Error, Diagnostic)]
#[error("lex error: {message}")]
#[diagnostic(code(quivela::lex))]
#[allow(unused_assignments)]
pub struct LexError {
    pub message: String,
    #[label]
    pub span: Span,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\f\r\n]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
enum RawToken {
    #[token("import")]
    KwImport,
    #[token("const")]
    KwConst,
    #[token("pure")]
    KwPure,
    #[token("static")]
    KwStatic,
    #[token("function")]
    KwFunction,
    #[token("axiom")]
    KwAxiom,
    #[token("theorem")]
    KwTheorem,
    #[token("assume")]
    KwAssume,

    #[token("new")]
    KwNew,
    #[token("method")]
    KwMethod,
    #[token("ref")]
    KwRef,
    #[token("tobits")]
    KwTobits,
    #[token("assert")]
    KwAssert,
    #[token("admit")]
    KwAdmit,
    #[token("true")]
    KwTrue,
    #[token("false")]
    KwFalse,

    #[token("forall")]
    KwForall,
    #[token("exists")]
    KwExists,
    #[token("isbits")]
    KwIsbits,
    #[token("env")]
    KwEnv,
    #[token("is")]
    KwIs,
    #[token("independence")]
    KwIndependence,
    #[token("frame")]
    KwFrame,
    #[token("frame_heap")]
    KwFrameHeap,
    #[token("fields_equal")]
    KwFieldsEqual,
    #[token("fields_equal_except")]
    KwFieldsEqualExcept,

    #[token("with")]
    KwWith,
    #[token("symmetry")]
    KwSymmetry,
    #[token("trivial")]
    KwTrivial,
    #[token("auto")]
    KwAuto,
    #[token("bisim")]
    KwBisim,
    #[token("rewrite")]
    KwRewrite,
    #[token("hybrid")]
    KwHybrid,
    #[token("unfold")]
    KwUnfold,
    #[token("inline")]
    KwInline,

    #[token("->")]
    Arrow,
    #[token(":=")]
    ColonEq,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,

    #[token("==")]
    EqEq,
    #[token("!=")]
    Neq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Eq,

    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("!")]
    Bang,
    #[token("?")]
    Question,
    #[token("~")]
    Tilde,
    #[token("@")]
    At,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,

    #[token("...")]
    Ellipsis,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    Int(Option<u64>),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_']*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl RawToken {
    fn into_kind(self) -> Option<TokenKind> {
        Some(match self {
            RawToken::KwImport => TokenKind::KwImport,
            RawToken::KwConst => TokenKind::KwConst,
            RawToken::KwPure => TokenKind::KwPure,
            RawToken::KwStatic => TokenKind::KwStatic,
            RawToken::KwFunction => TokenKind::KwFunction,
            RawToken::KwAxiom => TokenKind::KwAxiom,
            RawToken::KwTheorem => TokenKind::KwTheorem,
            RawToken::KwAssume => TokenKind::KwAssume,

            RawToken::KwNew => TokenKind::KwNew,
            RawToken::KwMethod => TokenKind::KwMethod,
            RawToken::KwRef => TokenKind::KwRef,
            RawToken::KwTobits => TokenKind::KwTobits,
            RawToken::KwAssert => TokenKind::KwAssert,
            RawToken::KwAdmit => TokenKind::KwAdmit,
            RawToken::KwTrue => TokenKind::KwTrue,
            RawToken::KwFalse => TokenKind::KwFalse,

            RawToken::KwForall => TokenKind::KwForall,
            RawToken::KwExists => TokenKind::KwExists,
            RawToken::KwIsbits => TokenKind::KwIsbits,
            RawToken::KwEnv => TokenKind::KwEnv,
            RawToken::KwIs => TokenKind::KwIs,
            RawToken::KwIndependence => TokenKind::KwIndependence,
            RawToken::KwFrame => TokenKind::KwFrame,
            RawToken::KwFrameHeap => TokenKind::KwFrameHeap,
            RawToken::KwFieldsEqual => TokenKind::KwFieldsEqual,
            RawToken::KwFieldsEqualExcept => TokenKind::KwFieldsEqualExcept,

            RawToken::KwWith => TokenKind::KwWith,
            RawToken::KwSymmetry => TokenKind::KwSymmetry,
            RawToken::KwTrivial => TokenKind::KwTrivial,
            RawToken::KwAuto => TokenKind::KwAuto,
            RawToken::KwBisim => TokenKind::KwBisim,
            RawToken::KwRewrite => TokenKind::KwRewrite,
            RawToken::KwHybrid => TokenKind::KwHybrid,
            RawToken::KwUnfold => TokenKind::KwUnfold,
            RawToken::KwInline => TokenKind::KwInline,

            RawToken::Arrow => TokenKind::Arrow,
            RawToken::ColonEq => TokenKind::ColonEq,
            RawToken::Colon => TokenKind::Colon,
            RawToken::Semi => TokenKind::Semi,

            RawToken::EqEq => TokenKind::EqEq,
            RawToken::Neq => TokenKind::Neq,
            RawToken::Le => TokenKind::Le,
            RawToken::Ge => TokenKind::Ge,
            RawToken::Lt => TokenKind::Lt,
            RawToken::Gt => TokenKind::Gt,
            RawToken::Eq => TokenKind::Eq,

            RawToken::AndAnd => TokenKind::AndAnd,
            RawToken::OrOr => TokenKind::OrOr,
            RawToken::Amp => TokenKind::Amp,
            RawToken::Pipe => TokenKind::Pipe,
            RawToken::Bang => TokenKind::Bang,
            RawToken::Question => TokenKind::Question,
            RawToken::Tilde => TokenKind::Tilde,
            RawToken::At => TokenKind::At,

            RawToken::Plus => TokenKind::Plus,
            RawToken::Minus => TokenKind::Minus,
            RawToken::Star => TokenKind::Star,
            RawToken::Slash => TokenKind::Slash,
            RawToken::Percent => TokenKind::Percent,
            RawToken::Caret => TokenKind::Caret,

            RawToken::Ellipsis => TokenKind::Ellipsis,
            RawToken::Dot => TokenKind::Dot,
            RawToken::Comma => TokenKind::Comma,

            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::LBrace => TokenKind::LBrace,
            RawToken::RBrace => TokenKind::RBrace,
            RawToken::LBracket => TokenKind::LBracket,
            RawToken::RBracket => TokenKind::RBracket,

            RawToken::Int(n) => TokenKind::Int(n?),
            RawToken::Ident(s) => TokenKind::Ident(s),
        })
    }
}

pub struct Lexer<'a> {
    src: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src }
    }

    pub fn lex(&self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut lex = RawToken::lexer(self.src);

        while let Some(raw) = lex.next() {
            let range = lex.span();
            let span = span_between(range.start, range.end);
            let kind = match raw {
                Ok(RawToken::Int(None)) => {
                    return Err(LexError {
                        message: "invalid integer literal".to_string(),
                        span,
                    });
                }
                Ok(raw) => match raw.into_kind() {
                    Some(kind) => kind,
                    None => {
                        return Err(LexError {
                            message: "unexpected token".to_string(),
                            span,
                        });
                    }
                },
                Err(_) => {
                    return Err(LexError {
                        message: format!("unexpected character `{}`", lex.slice()),
                        span,
                    });
                }
            };
            tokens.push(Token { kind, span });
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            span: span_between(self.src.len(), self.src.len()),
        });

        Ok(tokens)
    }
}
