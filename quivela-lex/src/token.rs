#![forbid(unsafe_code)]

use quivela_ast::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Declarations
    KwImport,
    KwConst,
    KwPure,
    KwStatic,
    KwFunction,
    KwAxiom,
    KwTheorem,
    KwAssume,

    // Expressions
    KwNew,
    KwMethod,
    KwRef,
    KwTobits,
    KwAssert,
    KwAdmit,
    KwTrue,
    KwFalse,

    // Propositions and bounds
    KwForall,
    KwExists,
    KwIsbits,
    KwEnv,
    KwIs,
    KwIndependence,
    KwFrame,
    KwFrameHeap,
    KwFieldsEqual,
    KwFieldsEqualExcept,

    // Tactics
    KwWith,
    KwSymmetry,
    KwTrivial,
    KwAuto,
    KwBisim,
    KwRewrite,
    KwHybrid,
    KwUnfold,
    KwInline,

    // Operators / punctuation
    Arrow,
    ColonEq,
    Colon,
    Semi,
    Eq,
    EqEq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,

    AndAnd,
    OrOr,
    Amp,
    Pipe,
    Bang,
    Question,
    Tilde,
    At,
    Ellipsis,
    Dot,
    Comma,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Eof,

    // Literals / identifiers
    Ident(String),
    Int(u64),
}
