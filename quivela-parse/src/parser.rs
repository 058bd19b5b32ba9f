#![forbid(unsafe_code)]

use std::mem;

use quivela_ast::{
    span_between, ArithOp, AxiomDecl, BisimProp, BisimScope, Bounds, BoundsKind, BoundsOp,
    ClassRef, CmpOp, ConstDecl, Development, Expr, ExprKind, FactDecl, FormalParam, FuncDecl,
    HeapProp, Ident, ImportDecl, Item, LogicOp, MethodDef, NewExpr, NewParam, ObjectProp, Prop,
    PropKind, PropLogicOp, Quantifier, RewriteTerm, Side, Span, Subgoal, SubgoalTarget, Tactic,
    TacticKind, TheoremDecl, Type,
};
use quivela_lex::{Token, TokenKind};

use crate::error::ParseError;

pub struct Parser<'a> {
    tokens: &'a [Token],
    idx: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, idx: 0 }
    }

    pub fn parse_development(&mut self) -> Result<Development, ParseError> {
        let mut items = Vec::new();
        while !self.at(TokenKind::Eof) {
            items.push(self.parse_item()?);
        }
        Ok(Development { items })
    }

    pub fn parse_expr_eof(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr()?;
        self.expect_eof()?;
        Ok(expr)
    }

    pub fn parse_prop_eof(&mut self) -> Result<Prop, ParseError> {
        let prop = self.parse_prop()?;
        self.expect_eof()?;
        Ok(prop)
    }

    pub fn parse_bounds_eof(&mut self) -> Result<Bounds, ParseError> {
        let bounds = self.parse_bounds()?;
        self.expect_eof()?;
        Ok(bounds)
    }

    fn parse_item(&mut self) -> Result<Item, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::KwImport) => self.parse_import().map(Item::Import),
            Some(TokenKind::KwConst) => self.parse_const().map(Item::Const),
            Some(TokenKind::KwPure | TokenKind::KwStatic | TokenKind::KwFunction) => {
                self.parse_function().map(Item::Function)
            }
            Some(TokenKind::KwAxiom) => {
                let start = self.expect(TokenKind::KwAxiom)?.span;
                let prop = self.parse_prop()?;
                let end = self.expect(TokenKind::Semi)?.span;
                Ok(Item::Axiom(AxiomDecl {
                    span: join(start, end),
                    prop,
                }))
            }
            Some(TokenKind::KwTheorem) => {
                let start = self.expect(TokenKind::KwTheorem)?.span;
                let fact = self.parse_fact()?;
                let (proof, end) = self.parse_tactic_block()?;
                Ok(Item::Theorem(TheoremDecl {
                    span: join(start, end),
                    fact,
                    proof,
                }))
            }
            Some(TokenKind::KwAssume) => {
                self.expect(TokenKind::KwAssume)?;
                let fact = self.parse_fact()?;
                self.expect(TokenKind::Semi)?;
                Ok(Item::Assume(fact))
            }
            _ => Err(self.error_here("expected declaration")),
        }
    }

    fn parse_import(&mut self) -> Result<ImportDecl, ParseError> {
        let start = self.expect(TokenKind::KwImport)?.span;
        let mut path = vec![self.expect_ident()?];
        while self.at(TokenKind::Dot) {
            self.next();
            path.push(self.expect_ident()?);
        }
        let end = self.expect(TokenKind::Semi)?.span;
        Ok(ImportDecl {
            span: join(start, end),
            path,
        })
    }

    fn parse_const(&mut self) -> Result<ConstDecl, ParseError> {
        let start = self.expect(TokenKind::KwConst)?.span;
        let name = self.expect_ident()?;
        let ty = self.parse_type_annotation()?;
        let end = self.expect(TokenKind::Semi)?.span;
        Ok(ConstDecl {
            span: join(start, end),
            name,
            ty,
        })
    }

    fn parse_function(&mut self) -> Result<FuncDecl, ParseError> {
        let start = self.here();
        let mut pure = false;
        let mut is_static = false;
        loop {
            match self.peek_kind() {
                Some(TokenKind::KwPure) => pure = true,
                Some(TokenKind::KwStatic) => is_static = true,
                _ => break,
            }
            self.next();
        }
        self.expect(TokenKind::KwFunction)?;
        let name = self.expect_ident()?;
        let params = self.parse_formal_params()?;
        let ret = self.parse_type_annotation()?;

        let (body, end) = if self.at(TokenKind::Semi) {
            (None, self.expect(TokenKind::Semi)?.span)
        } else {
            self.expect(TokenKind::LBrace)?;
            let body = self.parse_expr()?;
            let end = self.expect(TokenKind::RBrace)?.span;
            (Some(body), end)
        };

        Ok(FuncDecl {
            span: join(start, end),
            name,
            pure,
            is_static,
            params,
            ret,
            body,
        })
    }

    /// `Name(params): left ~[bound] right`
    fn parse_fact(&mut self) -> Result<FactDecl, ParseError> {
        let name = self.expect_ident()?;
        let params = self.parse_formal_params()?;
        self.expect(TokenKind::Colon)?;
        let left = self.parse_assign_expr()?;
        let bound = self.parse_distance()?;
        let right = self.parse_assign_expr()?;
        Ok(FactDecl {
            span: join(name.span, right.span),
            name,
            params,
            left,
            bound,
            right,
        })
    }

    fn parse_distance(&mut self) -> Result<Option<Bounds>, ParseError> {
        self.expect(TokenKind::Tilde)?;
        if !self.at(TokenKind::LBracket) {
            return Ok(None);
        }
        self.next();
        let bounds = self.parse_bounds()?;
        self.expect(TokenKind::RBracket)?;
        Ok(Some(bounds))
    }

    fn parse_formal_params(&mut self) -> Result<Vec<FormalParam>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let name = self.expect_ident()?;
                let ty = self.parse_type_annotation()?;
                params.push(FormalParam {
                    span: join(name.span, self.prev_span()),
                    name,
                    ty,
                });
                if self.at(TokenKind::Comma) {
                    self.next();
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_type_annotation(&mut self) -> Result<Option<Type>, ParseError> {
        if !self.at(TokenKind::Colon) {
            return Ok(None);
        }
        self.next();
        let name = self.expect_ident()?;
        let ty = match name.node.as_str() {
            "bits" => Type::Bitstring,
            "opaque" => Type::Opaque,
            "int" => Type::Integer,
            "real" => Type::Real,
            "map" => Type::Map,
            "expr" => Type::Expr,
            other => {
                return Err(ParseError {
                    message: format!("unknown type `{other}`"),
                    span: name.span,
                });
            }
        };
        Ok(Some(ty))
    }

    // ---------------------------------------------------------------------
    // Tactics
    // ---------------------------------------------------------------------

    fn parse_tactic_block(&mut self) -> Result<(Vec<Tactic>, Span), ParseError> {
        self.expect(TokenKind::LBrace)?;
        let mut tactics = Vec::new();
        while !self.at(TokenKind::RBrace) {
            tactics.push(self.parse_tactic()?);
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok((tactics, end))
    }

    fn parse_tactic(&mut self) -> Result<Tactic, ParseError> {
        let start = self.here();
        let kind = match self.peek_kind() {
            Some(TokenKind::Tilde) => {
                let bound = self.parse_distance()?;
                let target = if self.at(TokenKind::KwWith) {
                    self.next();
                    SubgoalTarget::Rewrite(self.parse_rewrite_terms()?)
                } else {
                    SubgoalTarget::Expr(self.parse_assign_expr()?)
                };
                let (proof, end) = self.parse_tactic_block()?;
                return Ok(Tactic {
                    span: join(start, end),
                    kind: TacticKind::Subgoal(Subgoal {
                        bound,
                        target,
                        proof,
                    }),
                });
            }
            Some(TokenKind::KwSymmetry) => {
                self.next();
                TacticKind::Symmetry
            }
            Some(TokenKind::KwAdmit) => {
                self.next();
                TacticKind::Admit
            }
            Some(TokenKind::KwTrivial) => {
                self.next();
                TacticKind::Trivial
            }
            Some(TokenKind::KwAuto) => {
                self.next();
                TacticKind::Auto
            }
            Some(TokenKind::KwBisim) => {
                self.next();
                if self.at(TokenKind::LBrace) {
                    self.next();
                    let mut props = Vec::new();
                    while !self.at(TokenKind::RBrace) {
                        props.push(self.parse_bisim_prop()?);
                    }
                    let end = self.expect(TokenKind::RBrace)?.span;
                    return Ok(Tactic {
                        span: join(start, end),
                        kind: TacticKind::Bisim(Some(props)),
                    });
                }
                TacticKind::Bisim(None)
            }
            Some(TokenKind::KwRewrite) => {
                self.next();
                TacticKind::Rewrite(self.expect_ident()?)
            }
            Some(TokenKind::KwHybrid) => {
                self.next();
                self.expect(TokenKind::LParen)?;
                let fact = self.expect_ident()?;
                self.expect(TokenKind::Comma)?;
                let start_bound = self.parse_bounds()?;
                self.expect(TokenKind::Comma)?;
                let end_bound = self.parse_bounds()?;
                self.expect(TokenKind::RParen)?;
                TacticKind::Hybrid {
                    fact,
                    start: start_bound,
                    end: end_bound,
                }
            }
            Some(TokenKind::KwUnfold) => {
                self.next();
                TacticKind::Unfold(self.parse_ident_list_until(TokenKind::Semi)?)
            }
            Some(TokenKind::KwInline) => {
                self.next();
                TacticKind::Inline(self.parse_ident_list_until(TokenKind::Semi)?)
            }
            _ => return Err(self.error_here("expected tactic")),
        };
        let end = self.expect(TokenKind::Semi)?.span;
        Ok(Tactic {
            span: join(start, end),
            kind,
        })
    }

    fn parse_rewrite_terms(&mut self) -> Result<Vec<RewriteTerm>, ParseError> {
        let mut terms = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::KwNew) => {
                    let start = self.expect(TokenKind::KwNew)?.span;
                    let params = self.parse_new_params()?;
                    terms.push(RewriteTerm::New {
                        span: join(start, self.prev_span()),
                        params,
                    });
                }
                Some(TokenKind::KwMethod) => terms.push(RewriteTerm::Method(self.parse_method()?)),
                _ => break,
            }
        }
        if terms.is_empty() {
            return Err(self.error_here("expected `new(...)` or `method` after `with`"));
        }
        Ok(terms)
    }

    fn parse_bisim_prop(&mut self) -> Result<BisimProp, ParseError> {
        let start = self.here();
        let mut scopes = Vec::new();
        if self.at_bisim_scope() {
            loop {
                scopes.push(self.parse_bisim_scope()?);
                if self.at(TokenKind::Comma) {
                    self.next();
                    continue;
                }
                break;
            }
            self.expect(TokenKind::Colon)?;
        }
        let prop = self.parse_prop()?;
        let end = self.expect(TokenKind::Semi)?.span;
        Ok(BisimProp {
            span: join(start, end),
            scopes,
            prop,
        })
    }

    fn at_bisim_scope(&self) -> bool {
        match (self.peek_kind(), self.peek_kind_n(1)) {
            (Some(TokenKind::Ident(name)), Some(TokenKind::Comma | TokenKind::Colon)) => {
                name == "invariant"
            }
            (Some(TokenKind::Ident(name)), Some(TokenKind::LParen)) => name == "checkpoint",
            _ => false,
        }
    }

    fn parse_bisim_scope(&mut self) -> Result<BisimScope, ParseError> {
        let head = self.expect_ident()?;
        match head.node.as_str() {
            "invariant" => Ok(BisimScope::Invariant),
            "checkpoint" => {
                self.expect(TokenKind::LParen)?;
                let left = self.expect_ident()?;
                self.expect(TokenKind::Comma)?;
                let right = self.expect_ident()?;
                self.expect(TokenKind::RParen)?;
                Ok(BisimScope::Checkpoint { left, right })
            }
            _ => Err(ParseError {
                message: "expected `invariant` or `checkpoint(L1, L2)`".to_string(),
                span: head.span,
            }),
        }
    }

    fn parse_ident_list_until(&mut self, end: TokenKind) -> Result<Vec<Ident>, ParseError> {
        let mut ids = Vec::new();
        if self.at(end) {
            return Ok(ids);
        }
        loop {
            ids.push(self.expect_ident()?);
            if self.at(TokenKind::Comma) {
                self.next();
                continue;
            }
            return Ok(ids);
        }
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let head = self.parse_assign_expr()?;
        if !self.at(TokenKind::Semi) {
            return Ok(head);
        }
        self.next();
        // Trailing `;` before a closing delimiter.
        if matches!(
            self.peek_kind(),
            Some(TokenKind::RBrace | TokenKind::RParen | TokenKind::Eof)
        ) {
            return Ok(head);
        }
        let tail = self.parse_expr()?;
        Ok(Expr::new(
            join(head.span, tail.span),
            ExprKind::Seq {
                head: Box::new(head),
                tail: Box::new(tail),
            },
        ))
    }

    fn parse_assign_expr(&mut self) -> Result<Expr, ParseError> {
        if let (Some(TokenKind::Ident(_)), Some(TokenKind::Eq)) =
            (self.peek_kind(), self.peek_kind_n(1))
        {
            let target = self.expect_ident()?;
            self.next();
            let value = self.parse_assign_expr()?;
            return Ok(Expr::new(
                join(target.span, value.span),
                ExprKind::Assign {
                    target,
                    value: Box::new(value),
                },
            ));
        }
        self.parse_ternary_expr()
    }

    fn parse_ternary_expr(&mut self) -> Result<Expr, ParseError> {
        let cond = self.parse_or_expr()?;
        if !self.at(TokenKind::Question) {
            return Ok(cond);
        }
        self.next();
        let then = self.parse_assign_expr()?;
        self.expect(TokenKind::Colon)?;
        let otherwise = self.parse_assign_expr()?;
        Ok(Expr::new(
            join(cond.span, otherwise.span),
            ExprKind::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
        ))
    }

    fn parse_or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and_expr()?;
        while self.at(TokenKind::Pipe) {
            self.next();
            let right = self.parse_and_expr()?;
            left = logic(left, LogicOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not_expr()?;
        while self.at(TokenKind::Amp) {
            self.next();
            let right = self.parse_not_expr()?;
            left = logic(left, LogicOp::And, right);
        }
        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<Expr, ParseError> {
        if !self.at(TokenKind::Bang) {
            return self.parse_cmp_expr();
        }
        let start = self.expect(TokenKind::Bang)?.span;
        let inner = self.parse_not_expr()?;
        Ok(Expr::new(
            join(start, inner.span),
            ExprKind::Not(Box::new(inner)),
        ))
    }

    fn parse_cmp_expr(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_add_expr()?;
        let Some(op) = self.peek_cmp_op(false) else {
            return Ok(left);
        };
        self.next();
        let right = self.parse_add_expr()?;
        let expr = Expr::new(
            join(left.span, right.span),
            ExprKind::Compare {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
        );
        self.reject_chained_comparison(false)?;
        Ok(expr)
    }

    fn parse_add_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_mul_expr()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => ArithOp::Add,
                Some(TokenKind::Minus) => ArithOp::Sub,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_mul_expr()?;
            left = arith(left, op, right);
        }
    }

    fn parse_mul_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_postfix_expr()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => ArithOp::Mul,
                Some(TokenKind::Slash) => ArithOp::Div,
                Some(TokenKind::Percent) => ArithOp::Mod,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_postfix_expr()?;
            left = arith(left, op, right);
        }
    }

    fn parse_postfix_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary_expr()?;
        loop {
            match self.peek_kind() {
                Some(TokenKind::Dot) => {
                    self.next();
                    let method = self.expect_ident()?;
                    let classes = self.parse_class_hints()?;
                    let args = self.parse_call_args()?;
                    expr = Expr::new(
                        join(expr.span, self.prev_span()),
                        ExprKind::Invoke {
                            target: Box::new(expr),
                            method,
                            classes,
                            args,
                        },
                    );
                }
                Some(TokenKind::LBracket) => {
                    let start = expr.span;
                    self.next();
                    let index = self.parse_assign_expr()?;
                    let kind = if self.at(TokenKind::ColonEq) {
                        self.next();
                        let value = self.parse_assign_expr()?;
                        ExprKind::Update {
                            map: Box::new(expr),
                            index: Box::new(index),
                            value: Box::new(value),
                        }
                    } else {
                        ExprKind::Index {
                            map: Box::new(expr),
                            index: Box::new(index),
                        }
                    };
                    let end = self.expect(TokenKind::RBracket)?.span;
                    expr = Expr::new(join(start, end), kind);
                }
                _ => return Ok(expr),
            }
        }
    }

    /// `<C1, C2>` between a method name and its arguments.
    fn parse_class_hints(&mut self) -> Result<Vec<Ident>, ParseError> {
        if !self.at(TokenKind::Lt) {
            return Ok(Vec::new());
        }
        self.next();
        let mut classes = Vec::new();
        if !self.at(TokenKind::Gt) {
            loop {
                classes.push(self.expect_ident()?);
                if self.at(TokenKind::Comma) {
                    self.next();
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::Gt)?;
        Ok(classes)
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                args.push(self.parse_assign_expr()?);
                if self.at(TokenKind::Comma) {
                    self.next();
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        let tok = self.expect_any()?;
        let start = tok.span;
        let kind = match tok.kind {
            TokenKind::Int(n) => ExprKind::Int(n),
            TokenKind::KwTrue => ExprKind::Bool(true),
            TokenKind::KwFalse => ExprKind::Bool(false),
            TokenKind::Ident(name) => {
                let id = Ident {
                    span: tok.span,
                    node: name,
                };
                match self.peek_kind() {
                    Some(TokenKind::LParen) => {
                        let args = self.parse_call_args()?;
                        ExprKind::Call { name: id, args }
                    }
                    Some(TokenKind::At) => {
                        self.next();
                        self.expect(TokenKind::LParen)?;
                        let inner = self.parse_expr()?;
                        self.expect(TokenKind::RParen)?;
                        ExprKind::Paren {
                            label: Some(id),
                            expr: Box::new(inner),
                        }
                    }
                    _ => ExprKind::Lookup(id),
                }
            }
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                ExprKind::Paren {
                    label: None,
                    expr: Box::new(inner),
                }
            }
            TokenKind::KwNew => ExprKind::New(self.parse_new_body()?),
            TokenKind::KwRef => ExprKind::Ref(Box::new(self.parse_paren_expr()?)),
            TokenKind::KwTobits => ExprKind::Tobits(Box::new(self.parse_paren_expr()?)),
            TokenKind::KwAssert => ExprKind::Assert(Box::new(self.parse_paren_prop()?)),
            TokenKind::KwAdmit => ExprKind::Admit(Box::new(self.parse_paren_prop()?)),
            TokenKind::Ellipsis => ExprKind::Ellipsis,
            _ => {
                return Err(ParseError {
                    message: "expected expression".to_string(),
                    span: tok.span,
                });
            }
        };
        Ok(Expr::new(join(start, self.prev_span()), kind))
    }

    fn parse_paren_expr(&mut self) -> Result<Expr, ParseError> {
        self.expect(TokenKind::LParen)?;
        let inner = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(inner)
    }

    /// After `new`: `[C](x = e, ...) { method ... }`
    fn parse_new_body(&mut self) -> Result<NewExpr, ParseError> {
        let class = match self.peek_kind() {
            Some(TokenKind::Ident(_)) => Some(self.expect_ident()?),
            _ => None,
        };
        let params = self.parse_new_params()?;
        self.expect(TokenKind::LBrace)?;
        let mut methods = Vec::new();
        while self.at(TokenKind::KwMethod) {
            methods.push(self.parse_method()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(NewExpr {
            class,
            params,
            methods,
        })
    }

    fn parse_new_params(&mut self) -> Result<Vec<NewParam>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let name = self.expect_ident()?;
                self.expect(TokenKind::Eq)?;
                let value = self.parse_assign_expr()?;
                params.push(NewParam {
                    span: join(name.span, value.span),
                    name,
                    value,
                });
                if self.at(TokenKind::Comma) {
                    self.next();
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_method(&mut self) -> Result<MethodDef, ParseError> {
        let start = self.expect(TokenKind::KwMethod)?.span;
        let name = self.expect_ident()?;
        let params = self.parse_formal_params()?;
        let open = self.expect(TokenKind::LBrace)?.span;
        let body = if self.at(TokenKind::RBrace) {
            Expr::new(open, ExprKind::Int(0))
        } else {
            self.parse_expr()?
        };
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(MethodDef {
            span: join(start, end),
            name,
            params,
            body,
        })
    }

    // ---------------------------------------------------------------------
    // Bounds
    // ---------------------------------------------------------------------

    fn parse_bounds(&mut self) -> Result<Bounds, ParseError> {
        let mut left = self.parse_bounds_term()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BoundsOp::Add,
                Some(TokenKind::Minus) => BoundsOp::Sub,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_bounds_term()?;
            left = bounds_binary(left, op, right);
        }
    }

    fn parse_bounds_term(&mut self) -> Result<Bounds, ParseError> {
        let mut left = self.parse_bounds_pow()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BoundsOp::Mul,
                Some(TokenKind::Slash) => BoundsOp::Div,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_bounds_pow()?;
            left = bounds_binary(left, op, right);
        }
    }

    fn parse_bounds_pow(&mut self) -> Result<Bounds, ParseError> {
        let base = self.parse_bounds_primary()?;
        if !self.at(TokenKind::Caret) {
            return Ok(base);
        }
        self.next();
        let exponent = self.parse_bounds_pow()?;
        Ok(bounds_binary(base, BoundsOp::Pow, exponent))
    }

    fn parse_bounds_primary(&mut self) -> Result<Bounds, ParseError> {
        let tok = self.expect_any()?;
        let start = tok.span;
        let kind = match tok.kind {
            TokenKind::Int(n) => BoundsKind::Int(n),
            TokenKind::Ident(name) => {
                let id = Ident {
                    span: tok.span,
                    node: name,
                };
                if self.at(TokenKind::LParen) {
                    self.next();
                    let mut args = Vec::new();
                    if !self.at(TokenKind::RParen) {
                        loop {
                            args.push(self.parse_bounds()?);
                            if self.at(TokenKind::Comma) {
                                self.next();
                                continue;
                            }
                            break;
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                    BoundsKind::Call { name: id, args }
                } else {
                    BoundsKind::Lookup(id)
                }
            }
            TokenKind::LParen => {
                let inner = self.parse_bounds()?;
                self.expect(TokenKind::RParen)?;
                BoundsKind::Paren(Box::new(inner))
            }
            TokenKind::KwEnv => BoundsKind::Env(self.parse_env_args()?),
            _ => {
                return Err(ParseError {
                    message: "expected bound".to_string(),
                    span: tok.span,
                });
            }
        };
        Ok(Bounds::new(join(start, self.prev_span()), kind))
    }

    fn parse_env_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        while self.at(TokenKind::LParen) {
            args.push(self.parse_paren_expr()?);
        }
        Ok(args)
    }

    // ---------------------------------------------------------------------
    // Props
    // ---------------------------------------------------------------------

    fn parse_prop(&mut self) -> Result<Prop, ParseError> {
        let quantifier = match self.peek_kind() {
            Some(TokenKind::KwForall) => Some(Quantifier::Forall),
            Some(TokenKind::KwExists) => Some(Quantifier::Exists),
            _ => None,
        };
        if let Some(quantifier) = quantifier {
            let start = self.expect_any()?.span;
            let params = self.parse_formal_params()?;
            self.expect(TokenKind::Dot)?;
            let body = self.parse_prop()?;
            return Ok(Prop::new(
                join(start, body.span),
                PropKind::Quant {
                    quantifier,
                    params,
                    body: Box::new(body),
                },
            ));
        }

        let left = self.parse_or_prop()?;
        if !self.at(TokenKind::Arrow) {
            return Ok(left);
        }
        self.next();
        let right = self.parse_prop()?;
        Ok(prop_logic(left, PropLogicOp::Implies, right))
    }

    fn parse_or_prop(&mut self) -> Result<Prop, ParseError> {
        let mut left = self.parse_and_prop()?;
        while self.at(TokenKind::OrOr) {
            self.next();
            let right = self.parse_and_prop()?;
            left = prop_logic(left, PropLogicOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and_prop(&mut self) -> Result<Prop, ParseError> {
        let mut left = self.parse_not_prop()?;
        while self.at(TokenKind::AndAnd) {
            self.next();
            let right = self.parse_not_prop()?;
            left = prop_logic(left, PropLogicOp::And, right);
        }
        Ok(left)
    }

    fn parse_not_prop(&mut self) -> Result<Prop, ParseError> {
        if !self.at(TokenKind::Bang) {
            return self.parse_cmp_prop();
        }
        let start = self.expect(TokenKind::Bang)?.span;
        let inner = self.parse_not_prop()?;
        Ok(Prop::new(
            join(start, inner.span),
            PropKind::Not(Box::new(inner)),
        ))
    }

    fn parse_cmp_prop(&mut self) -> Result<Prop, ParseError> {
        let left = self.parse_add_prop()?;
        let Some(op) = self.peek_cmp_op(true) else {
            return Ok(left);
        };
        self.next();
        let right = self.parse_add_prop()?;
        let prop = Prop::new(
            join(left.span, right.span),
            PropKind::Compare {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
        );
        self.reject_chained_comparison(true)?;
        Ok(prop)
    }

    fn parse_add_prop(&mut self) -> Result<Prop, ParseError> {
        let mut left = self.parse_mul_prop()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => ArithOp::Add,
                Some(TokenKind::Minus) => ArithOp::Sub,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_mul_prop()?;
            left = prop_arith(left, op, right);
        }
    }

    fn parse_mul_prop(&mut self) -> Result<Prop, ParseError> {
        let mut left = self.parse_postfix_prop()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => ArithOp::Mul,
                Some(TokenKind::Slash) => ArithOp::Div,
                Some(TokenKind::Percent) => ArithOp::Mod,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_postfix_prop()?;
            left = prop_arith(left, op, right);
        }
    }

    fn parse_postfix_prop(&mut self) -> Result<Prop, ParseError> {
        let mut prop = self.parse_primary_prop()?;
        while self.at(TokenKind::LBracket) {
            self.next();
            let index = self.parse_prop()?;
            let value = if self.at(TokenKind::ColonEq) {
                self.next();
                Some(self.parse_prop()?)
            } else {
                None
            };
            let end = self.expect(TokenKind::RBracket)?.span;
            let span = join(prop.span, end);
            let kind = match value {
                Some(value) => PropKind::Update {
                    map: Box::new(prop),
                    index: Box::new(index),
                    value: Box::new(value),
                },
                None => PropKind::Index {
                    map: Box::new(prop),
                    index: Box::new(index),
                },
            };
            prop = Prop::new(span, kind);
        }
        Ok(prop)
    }

    fn parse_primary_prop(&mut self) -> Result<Prop, ParseError> {
        let tok = self.expect_any()?;
        let start = tok.span;
        let kind = match tok.kind {
            TokenKind::Int(n) => PropKind::Int(n),
            TokenKind::KwTrue => PropKind::Bool(true),
            TokenKind::KwFalse => PropKind::Bool(false),
            TokenKind::LParen => {
                let inner = self.parse_prop()?;
                self.expect(TokenKind::RParen)?;
                PropKind::Paren(Box::new(inner))
            }
            TokenKind::KwTobits => PropKind::Tobits(Box::new(self.parse_paren_prop()?)),
            TokenKind::KwIsbits => PropKind::IsBits(Box::new(self.parse_paren_prop()?)),
            TokenKind::KwEnv => PropKind::Env(self.parse_env_args()?),
            TokenKind::KwIndependence => {
                self.expect(TokenKind::LParen)?;
                let heap = self.parse_heap_prop()?;
                self.expect(TokenKind::Comma)?;
                let left = self.parse_prop()?;
                self.expect(TokenKind::Comma)?;
                let right = self.parse_prop()?;
                self.expect(TokenKind::RParen)?;
                PropKind::Independence {
                    heap,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            TokenKind::KwFrame => {
                if self.at(TokenKind::LParen) {
                    self.next();
                    let left = self.parse_prop()?;
                    self.expect(TokenKind::Comma)?;
                    let right = self.parse_prop()?;
                    self.expect(TokenKind::RParen)?;
                    PropKind::Frame {
                        left: Box::new(left),
                        right: Box::new(right),
                    }
                } else {
                    PropKind::FrameAll
                }
            }
            TokenKind::KwFrameHeap => {
                self.expect(TokenKind::LParen)?;
                let left_heap = self.parse_heap_prop()?;
                self.expect(TokenKind::Comma)?;
                let right_heap = self.parse_heap_prop()?;
                self.expect(TokenKind::Comma)?;
                let left = self.parse_prop()?;
                self.expect(TokenKind::Comma)?;
                let right = self.parse_prop()?;
                self.expect(TokenKind::RParen)?;
                PropKind::FrameHeap {
                    left_heap,
                    right_heap,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            TokenKind::KwFieldsEqual => PropKind::FieldsEqual,
            TokenKind::KwFieldsEqualExcept => {
                self.expect(TokenKind::LParen)?;
                let fields = self.parse_ident_list_until(TokenKind::RParen)?;
                self.expect(TokenKind::RParen)?;
                PropKind::FieldsEqualExcept(fields)
            }
            TokenKind::Ident(name) => {
                let id = Ident {
                    span: tok.span,
                    node: name,
                };
                match id.node.as_str() {
                    "left" | "right" => {
                        let object = self.parse_object_after(id)?;
                        self.parse_object_member(object)?
                    }
                    "object" if self.at(TokenKind::LParen) => {
                        let object = self.parse_object_after(id)?;
                        self.parse_object_member(object)?
                    }
                    "same" if self.at(TokenKind::LParen) => {
                        self.next();
                        let a = self.parse_object_prop()?;
                        self.expect(TokenKind::Comma)?;
                        let b = self.parse_object_prop()?;
                        self.expect(TokenKind::RParen)?;
                        PropKind::SameObject(a, b)
                    }
                    _ if self.at(TokenKind::LParen) => {
                        self.next();
                        let mut args = Vec::new();
                        if !self.at(TokenKind::RParen) {
                            loop {
                                args.push(self.parse_prop()?);
                                if self.at(TokenKind::Comma) {
                                    self.next();
                                    continue;
                                }
                                break;
                            }
                        }
                        self.expect(TokenKind::RParen)?;
                        PropKind::Call { name: id, args }
                    }
                    _ => PropKind::Lookup(id),
                }
            }
            _ => {
                return Err(ParseError {
                    message: "expected proposition".to_string(),
                    span: tok.span,
                });
            }
        };
        Ok(Prop::new(join(start, self.prev_span()), kind))
    }

    fn parse_paren_prop(&mut self) -> Result<Prop, ParseError> {
        self.expect(TokenKind::LParen)?;
        let inner = self.parse_prop()?;
        self.expect(TokenKind::RParen)?;
        Ok(inner)
    }

    fn parse_object_prop(&mut self) -> Result<ObjectProp, ParseError> {
        let head = self.expect_ident()?;
        self.parse_object_after(head)
    }

    fn parse_object_after(&mut self, head: Ident) -> Result<ObjectProp, ParseError> {
        match head.node.as_str() {
            "left" => Ok(ObjectProp::Side(Side::Left)),
            "right" => Ok(ObjectProp::Side(Side::Right)),
            "object" => {
                let (heap, reference) = self.parse_heap_reference()?;
                Ok(ObjectProp::FromHeap { heap, reference })
            }
            _ => Err(ParseError {
                message: "expected object (`left`, `right` or `object(h, p)`)".to_string(),
                span: head.span,
            }),
        }
    }

    /// `.field` or `is C` after an object.
    fn parse_object_member(&mut self, object: ObjectProp) -> Result<PropKind, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Dot) => {
                self.next();
                let field = self.expect_ident()?;
                Ok(PropKind::Field { object, field })
            }
            Some(TokenKind::KwIs) => {
                self.next();
                let class = self.expect_ident()?;
                let class = if class.node == "invalid" {
                    ClassRef::Invalid
                } else {
                    ClassRef::Named(class)
                };
                Ok(PropKind::ObjectIs { object, class })
            }
            _ => Err(self.error_here("expected `.field` or `is` after object")),
        }
    }

    fn parse_heap_prop(&mut self) -> Result<HeapProp, ParseError> {
        let head = self.expect_ident()?;
        match head.node.as_str() {
            "heap" => {
                self.expect(TokenKind::LParen)?;
                let side = self.expect_ident()?;
                let side = match side.node.as_str() {
                    "left" => Side::Left,
                    "right" => Side::Right,
                    _ => {
                        return Err(ParseError {
                            message: "expected `left` or `right`".to_string(),
                            span: side.span,
                        });
                    }
                };
                self.expect(TokenKind::RParen)?;
                Ok(HeapProp::Side(side))
            }
            "from_heap" => {
                let (heap, reference) = self.parse_heap_reference()?;
                Ok(HeapProp::FromHeap { heap, reference })
            }
            _ => Err(ParseError {
                message: "expected heap (`heap(left)`, `heap(right)` or `from_heap(h, p)`)"
                    .to_string(),
                span: head.span,
            }),
        }
    }

    /// `(h, p)`
    fn parse_heap_reference(&mut self) -> Result<(Box<HeapProp>, Box<Prop>), ParseError> {
        self.expect(TokenKind::LParen)?;
        let heap = self.parse_heap_prop()?;
        self.expect(TokenKind::Comma)?;
        let reference = self.parse_prop()?;
        self.expect(TokenKind::RParen)?;
        Ok((Box::new(heap), Box::new(reference)))
    }

    // ---------------------------------------------------------------------
    // Token helpers
    // ---------------------------------------------------------------------

    fn peek_cmp_op(&self, props: bool) -> Option<CmpOp> {
        match self.peek_kind() {
            Some(TokenKind::EqEq) => Some(CmpOp::Eq),
            Some(TokenKind::Neq) => Some(CmpOp::Ne),
            Some(TokenKind::Lt) => Some(CmpOp::Lt),
            Some(TokenKind::Le) => Some(CmpOp::Le),
            Some(TokenKind::Gt) => Some(CmpOp::Gt),
            Some(TokenKind::Ge) => Some(CmpOp::Ge),
            Some(TokenKind::Eq) if props => Some(CmpOp::Same),
            _ => None,
        }
    }

    fn reject_chained_comparison(&self, props: bool) -> Result<(), ParseError> {
        if self.peek_cmp_op(props).is_none() {
            return Ok(());
        }
        Err(self.error_here(
            "chained comparisons are not supported; use parentheses or boolean operators",
        ))
    }

    fn expect_eof(&self) -> Result<(), ParseError> {
        if self.at(TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.error_here("expected end of input"))
        }
    }

    fn error_here(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            span: self.here(),
        }
    }

    fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        let tok = self.expect_any()?;
        match tok.kind {
            TokenKind::Ident(name) => Ok(Ident {
                span: tok.span,
                node: name,
            }),
            _ => Err(ParseError {
                message: "expected identifier".to_string(),
                span: tok.span,
            }),
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token, ParseError> {
        let tok = self.expect_any()?;
        if mem::discriminant(&tok.kind) == mem::discriminant(&expected) {
            Ok(tok)
        } else {
            Err(ParseError {
                message: format!("expected {expected:?}"),
                span: tok.span,
            })
        }
    }

    fn expect_any(&mut self) -> Result<Token, ParseError> {
        self.next().ok_or_else(|| ParseError {
            message: "unexpected end of input".to_string(),
            span: span_between(0, 0),
        })
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind()
            .is_some_and(|k| mem::discriminant(k) == mem::discriminant(&kind))
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.idx)?.clone();
        self.idx += 1;
        Some(tok)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.idx).map(|t| &t.kind)
    }

    fn peek_kind_n(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.idx + n).map(|t| &t.kind)
    }

    fn peek_span(&self) -> Option<Span> {
        self.tokens.get(self.idx).map(|t| t.span)
    }

    fn here(&self) -> Span {
        self.peek_span().unwrap_or_else(|| span_between(0, 0))
    }

    fn prev_span(&self) -> Span {
        self.idx
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span)
            .unwrap_or_else(|| span_between(0, 0))
    }
}

fn join(a: Span, b: Span) -> Span {
    let a0: usize = a.offset();
    let b0: usize = b.offset();
    let b1 = b0 + b.len();
    if b0 >= a0 {
        span_between(a0, b1.max(a0 + a.len()))
    } else {
        let a1 = a0 + a.len();
        span_between(b0, a1)
    }
}

fn logic(left: Expr, op: LogicOp, right: Expr) -> Expr {
    Expr::new(
        join(left.span, right.span),
        ExprKind::Logic {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
    )
}

fn arith(left: Expr, op: ArithOp, right: Expr) -> Expr {
    Expr::new(
        join(left.span, right.span),
        ExprKind::Arith {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
    )
}

fn bounds_binary(left: Bounds, op: BoundsOp, right: Bounds) -> Bounds {
    Bounds::new(
        join(left.span, right.span),
        BoundsKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
    )
}

fn prop_logic(left: Prop, op: PropLogicOp, right: Prop) -> Prop {
    Prop::new(
        join(left.span, right.span),
        PropKind::Logic {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
    )
}

fn prop_arith(left: Prop, op: ArithOp, right: Prop) -> Prop {
    Prop::new(
        join(left.span, right.span),
        PropKind::Arith {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
    )
}
