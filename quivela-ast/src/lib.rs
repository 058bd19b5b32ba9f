#![forbid(unsafe_code)]

use miette::SourceSpan;

pub type Span = SourceSpan;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

impl<T> Spanned<T> {
    pub fn new(span: Span, node: T) -> Self {
        Self { span, node }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            span: self.span,
            node: f(self.node),
        }
    }
}

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

/// Span used for nodes built by tactics rather than read from source.
pub fn synthetic() -> Span {
    span(0, 0)
}

pub type Ident = Spanned<String>;

pub fn ident(name: impl Into<String>) -> Ident {
    Spanned::new(synthetic(), name.into())
}

#[derive(Clone, Debug, PartialEq)]
pub struct Development {
    pub items: Vec<Item>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Import(ImportDecl),
    Const(ConstDecl),
    Function(FuncDecl),
    Axiom(AxiomDecl),
    Theorem(TheoremDecl),
    Assume(FactDecl),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportDecl {
    pub span: Span,
    pub path: Vec<Ident>,
}

impl ImportDecl {
    /// Dotted module name, e.g. `crypto.prf`.
    pub fn module_name(&self) -> String {
        self.path
            .iter()
            .map(|s| s.node.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstDecl {
    pub span: Span,
    pub name: Ident,
    pub ty: Option<Type>,
}

/// Value types of the calculus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Bitstring,
    Opaque,
    Integer,
    Real,
    Map,
    Expr,
}

impl Type {
    pub fn keyword(self) -> &'static str {
        match self {
            Type::Bitstring => "bits",
            Type::Opaque => "opaque",
            Type::Integer => "int",
            Type::Real => "real",
            Type::Map => "map",
            Type::Expr => "expr",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FormalParam {
    pub span: Span,
    pub name: Ident,
    pub ty: Option<Type>,
}

impl FormalParam {
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            span: synthetic(),
            name: ident(name),
            ty: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncDecl {
    pub span: Span,
    pub name: Ident,
    pub pure: bool,
    pub is_static: bool,
    pub params: Vec<FormalParam>,
    pub ret: Option<Type>,
    pub body: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AxiomDecl {
    pub span: Span,
    pub prop: Prop,
}

/// `Name(params): left ~[bound] right`
#[derive(Clone, Debug, PartialEq)]
pub struct FactDecl {
    pub span: Span,
    pub name: Ident,
    pub params: Vec<FormalParam>,
    pub left: Expr,
    pub bound: Option<Bounds>,
    pub right: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TheoremDecl {
    pub span: Span,
    pub fact: FactDecl,
    pub proof: Vec<Tactic>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(span: Span, kind: ExprKind) -> Self {
        Self { span, kind }
    }

    pub fn synthetic(kind: ExprKind) -> Self {
        Self::new(synthetic(), kind)
    }

    pub fn int(value: u64) -> Self {
        Self::synthetic(ExprKind::Int(value))
    }

    pub fn lookup(name: impl Into<String>) -> Self {
        Self::synthetic(ExprKind::Lookup(ident(name)))
    }

    pub fn as_lookup(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Lookup(id) => Some(id.node.as_str()),
            _ => None,
        }
    }

    pub fn as_new(&self) -> Option<&NewExpr> {
        match &self.kind {
            ExprKind::New(new) => Some(new),
            _ => None,
        }
    }

    pub fn as_new_mut(&mut self) -> Option<&mut NewExpr> {
        match &mut self.kind {
            ExprKind::New(new) => Some(new),
            _ => None,
        }
    }

    /// Strips unlabelled parentheses.
    pub fn unparen(&self) -> &Expr {
        let mut cur = self;
        while let ExprKind::Paren { label: None, expr } = &cur.kind {
            cur = expr;
        }
        cur
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Int(u64),
    Bool(bool),
    Lookup(Ident),
    /// `(e)` or `L@(e)`
    Paren {
        label: Option<Ident>,
        expr: Box<Expr>,
    },
    Seq {
        head: Box<Expr>,
        tail: Box<Expr>,
    },
    Assign {
        target: Ident,
        value: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Logic {
        left: Box<Expr>,
        op: LogicOp,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    Compare {
        left: Box<Expr>,
        op: CmpOp,
        right: Box<Expr>,
    },
    Arith {
        left: Box<Expr>,
        op: ArithOp,
        right: Box<Expr>,
    },
    Call {
        name: Ident,
        args: Vec<Expr>,
    },
    /// `target.method<C1, C2>(args)`; the classes are dispatch hints.
    Invoke {
        target: Box<Expr>,
        method: Ident,
        classes: Vec<Ident>,
        args: Vec<Expr>,
    },
    New(NewExpr),
    Index {
        map: Box<Expr>,
        index: Box<Expr>,
    },
    Update {
        map: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
    },
    Ref(Box<Expr>),
    Tobits(Box<Expr>),
    Assert(Box<Prop>),
    Admit(Box<Prop>),
    /// `...`, the previous method body in a method rewrite.
    Ellipsis,
    /// Rewrite context marker.
    Hole,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewExpr {
    pub class: Option<Ident>,
    pub params: Vec<NewParam>,
    pub methods: Vec<MethodDef>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewParam {
    pub span: Span,
    pub name: Ident,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodDef {
    pub span: Span,
    pub name: Ident,
    pub params: Vec<FormalParam>,
    pub body: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `=`, equality of opaque values (props only).
    Same,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Same => "=",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        }
    }

    pub fn is_additive(self) -> bool {
        matches!(self, ArithOp::Add | ArithOp::Sub)
    }
}

/// Distance bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
    pub span: Span,
    pub kind: BoundsKind,
}

impl Bounds {
    pub fn new(span: Span, kind: BoundsKind) -> Self {
        Self { span, kind }
    }

    pub fn synthetic(kind: BoundsKind) -> Self {
        Self::new(synthetic(), kind)
    }

    pub fn zero() -> Self {
        Self::synthetic(BoundsKind::Int(0))
    }

    pub fn binary(left: Bounds, op: BoundsOp, right: Bounds) -> Self {
        Self::synthetic(BoundsKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    pub fn paren(inner: Bounds) -> Self {
        Self::synthetic(BoundsKind::Paren(Box::new(inner)))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BoundsKind {
    Int(u64),
    Lookup(Ident),
    Paren(Box<Bounds>),
    Call { name: Ident, args: Vec<Bounds> },
    /// `env (c1)(c2)...`, an adversary advantage term over its contexts.
    Env(Vec<Expr>),
    Binary {
        left: Box<Bounds>,
        op: BoundsOp,
        right: Box<Bounds>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundsOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BoundsOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BoundsOp::Add => "+",
            BoundsOp::Sub => "-",
            BoundsOp::Mul => "*",
            BoundsOp::Div => "/",
            BoundsOp::Pow => "^",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Prop {
    pub span: Span,
    pub kind: PropKind,
}

impl Prop {
    pub fn new(span: Span, kind: PropKind) -> Self {
        Self { span, kind }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropKind {
    Int(u64),
    Bool(bool),
    Lookup(Ident),
    Paren(Box<Prop>),
    Quant {
        quantifier: Quantifier,
        params: Vec<FormalParam>,
        body: Box<Prop>,
    },
    Logic {
        left: Box<Prop>,
        op: PropLogicOp,
        right: Box<Prop>,
    },
    Not(Box<Prop>),
    Compare {
        left: Box<Prop>,
        op: CmpOp,
        right: Box<Prop>,
    },
    Arith {
        left: Box<Prop>,
        op: ArithOp,
        right: Box<Prop>,
    },
    Call {
        name: Ident,
        args: Vec<Prop>,
    },
    Index {
        map: Box<Prop>,
        index: Box<Prop>,
    },
    Update {
        map: Box<Prop>,
        index: Box<Prop>,
        value: Box<Prop>,
    },
    Tobits(Box<Prop>),
    IsBits(Box<Prop>),
    Env(Vec<Expr>),
    SameObject(ObjectProp, ObjectProp),
    Independence {
        heap: HeapProp,
        left: Box<Prop>,
        right: Box<Prop>,
    },
    ObjectIs {
        object: ObjectProp,
        class: ClassRef,
    },
    Field {
        object: ObjectProp,
        field: Ident,
    },
    FrameAll,
    Frame {
        left: Box<Prop>,
        right: Box<Prop>,
    },
    FrameHeap {
        left_heap: HeapProp,
        right_heap: HeapProp,
        left: Box<Prop>,
        right: Box<Prop>,
    },
    FieldsEqual,
    FieldsEqualExcept(Vec<Ident>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantifier {
    Forall,
    Exists,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropLogicOp {
    And,
    Or,
    Implies,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ObjectProp {
    Side(Side),
    /// The target object of `reference` in `heap`.
    FromHeap { heap: Box<HeapProp>, reference: Box<Prop> },
}

#[derive(Clone, Debug, PartialEq)]
pub enum HeapProp {
    Side(Side),
    /// The part of `heap` visible to the object `reference`.
    FromHeap { heap: Box<HeapProp>, reference: Box<Prop> },
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClassRef {
    Named(Ident),
    Invalid,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BisimProp {
    pub span: Span,
    pub scopes: Vec<BisimScope>,
    pub prop: Prop,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BisimScope {
    Invariant,
    Checkpoint { left: Ident, right: Ident },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tactic {
    pub span: Span,
    pub kind: TacticKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TacticKind {
    Subgoal(Subgoal),
    Symmetry,
    Admit,
    Trivial,
    Auto,
    /// `None` for a bare `bisim;`, which relates the fields by position.
    Bisim(Option<Vec<BisimProp>>),
    Rewrite(Ident),
    Hybrid {
        fact: Ident,
        start: Bounds,
        end: Bounds,
    },
    Unfold(Vec<Ident>),
    Inline(Vec<Ident>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Subgoal {
    pub bound: Option<Bounds>,
    pub target: SubgoalTarget,
    pub proof: Vec<Tactic>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubgoalTarget {
    Expr(Expr),
    Rewrite(Vec<RewriteTerm>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum RewriteTerm {
    New { span: Span, params: Vec<NewParam> },
    Method(MethodDef),
}
