#![forbid(unsafe_code)]

use quivela_ast::{Expr, ExprKind};
use quivela_parse::format_expr;

use crate::tree::children_mut;

/// Erases what structural equality ignores: class tags on objects, class
/// hints on invocations, expression labels and parentheses.
pub fn simplify(mut expr: Expr) -> Expr {
    simplify_in_place(&mut expr);
    expr
}

pub fn simplify_in_place(expr: &mut Expr) {
    while let ExprKind::Paren { expr: inner, .. } = &mut expr.kind {
        let inner = std::mem::replace(&mut **inner, Expr::int(0));
        *expr = inner;
    }
    match &mut expr.kind {
        ExprKind::Invoke { classes, .. } => classes.clear(),
        ExprKind::New(new) => new.class = None,
        _ => {}
    }
    for child in children_mut(expr) {
        simplify_in_place(child);
    }
}

/// Whether two expressions are equal once simplified.
pub fn structurally_equal(left: &Expr, right: &Expr) -> bool {
    format_expr(&simplify(left.clone())) == format_expr(&simplify(right.clone()))
}
