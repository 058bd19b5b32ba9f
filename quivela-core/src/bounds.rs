#![forbid(unsafe_code)]

//! Arithmetic on distance bounds and conversions to and from expressions.

use quivela_ast::{ArithOp, Bounds, BoundsKind, BoundsOp, Expr, ExprKind};
use quivela_parse::{format_bounds, format_expr};

use crate::error::CheckError;

pub fn is_zero(bounds: &Bounds) -> bool {
    match &bounds.kind {
        BoundsKind::Int(0) => true,
        BoundsKind::Paren(inner) => is_zero(inner),
        _ => false,
    }
}

/// `a + b`, dropping a zero operand.
pub fn add(a: &Bounds, b: &Bounds) -> Bounds {
    if is_zero(a) {
        return b.clone();
    }
    if is_zero(b) {
        return a.clone();
    }
    Bounds::binary(a.clone(), BoundsOp::Add, b.clone())
}

pub fn sub(a: &Bounds, b: &Bounds) -> Bounds {
    Bounds::binary(a.clone(), BoundsOp::Sub, b.clone())
}

pub fn mul(a: &Bounds, b: &Bounds) -> Bounds {
    Bounds::binary(a.clone(), BoundsOp::Mul, b.clone())
}

pub fn or_zero(bounds: Option<&Bounds>) -> Bounds {
    bounds.cloned().unwrap_or_else(Bounds::zero)
}

/// Reads a bound as an expression, e.g. the start and end of a hybrid step.
pub fn to_expr(bounds: &Bounds) -> Result<Expr, CheckError> {
    let kind = match &bounds.kind {
        BoundsKind::Int(n) => ExprKind::Int(*n),
        BoundsKind::Lookup(id) => ExprKind::Lookup(id.clone()),
        BoundsKind::Paren(inner) => ExprKind::Paren {
            label: None,
            expr: Box::new(to_expr(inner)?),
        },
        BoundsKind::Call { name, args } => ExprKind::Call {
            name: name.clone(),
            args: args.iter().map(to_expr).collect::<Result<_, _>>()?,
        },
        BoundsKind::Binary { left, op, right } => {
            let op = match op {
                BoundsOp::Add => ArithOp::Add,
                BoundsOp::Sub => ArithOp::Sub,
                BoundsOp::Mul => ArithOp::Mul,
                BoundsOp::Div => ArithOp::Div,
                BoundsOp::Pow => {
                    return Err(CheckError::internal(format!(
                        "Conversion of bound {} to an expression not implemented.",
                        format_bounds(bounds)
                    )));
                }
            };
            ExprKind::Arith {
                left: Box::new(to_expr(left)?),
                op,
                right: Box::new(to_expr(right)?),
            }
        }
        BoundsKind::Env(_) => {
            return Err(CheckError::internal(format!(
                "Conversion of bound {} to an expression not implemented.",
                format_bounds(bounds)
            )));
        }
    };
    Ok(Expr::new(bounds.span, kind))
}

/// Reads an arithmetic expression as a bound.
pub fn from_expr(expr: &Expr) -> Result<Bounds, CheckError> {
    let kind = match &expr.kind {
        ExprKind::Int(n) => BoundsKind::Int(*n),
        ExprKind::Lookup(id) => BoundsKind::Lookup(id.clone()),
        ExprKind::Paren { expr: inner, .. } => BoundsKind::Paren(Box::new(from_expr(inner)?)),
        ExprKind::Call { name, args } => BoundsKind::Call {
            name: name.clone(),
            args: args.iter().map(from_expr).collect::<Result<_, _>>()?,
        },
        ExprKind::Arith { left, op, right } => {
            let op = match op {
                ArithOp::Add => BoundsOp::Add,
                ArithOp::Sub => BoundsOp::Sub,
                ArithOp::Mul => BoundsOp::Mul,
                ArithOp::Div => BoundsOp::Div,
                ArithOp::Mod => return Err(unconvertible(expr)),
            };
            BoundsKind::Binary {
                left: Box::new(from_expr(left)?),
                op,
                right: Box::new(from_expr(right)?),
            }
        }
        _ => return Err(unconvertible(expr)),
    };
    Ok(Bounds::new(expr.span, kind))
}

fn unconvertible(expr: &Expr) -> CheckError {
    CheckError::internal(format!(
        "Unable to convert {} to bounds expr",
        format_expr(expr)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quivela_parse::{parse_bounds, parse_expr};

    fn b(src: &str) -> Bounds {
        parse_bounds(src).unwrap()
    }

    #[test]
    fn add_drops_zero_operands() {
        assert_eq!(format_bounds(&add(&Bounds::zero(), &b("adv"))), "adv");
        assert_eq!(format_bounds(&add(&b("adv"), &b("(0)"))), "adv");
        assert_eq!(format_bounds(&add(&b("a"), &b("b + c"))), "a + (b + c)");
    }

    #[test]
    fn hybrid_distance_shape() {
        let d = mul(&sub(&b("n"), &b("0")), &b("adv"));
        assert_eq!(format_bounds(&d), "(n - 0) * adv");
    }

    #[test]
    fn bounds_and_expressions_convert() {
        let e = to_expr(&b("n + 1")).unwrap();
        assert_eq!(format_expr(&e), "n + 1");
        let back = from_expr(&parse_expr("f(q) * 2").unwrap()).unwrap();
        assert_eq!(format_bounds(&back), "f(q) * 2");
        assert!(to_expr(&b("2 ^ n")).is_err());
        assert!(from_expr(&parse_expr("new () {}").unwrap()).is_err());
    }
}
