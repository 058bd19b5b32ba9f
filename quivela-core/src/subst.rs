#![forbid(unsafe_code)]

use std::collections::HashMap;

use quivela_ast::{Bounds, BoundsKind, Expr, ExprKind};

use crate::bounds;
use crate::error::CheckError;
use crate::tree::children_mut;

pub type Substitution = HashMap<String, Expr>;

/// Replaces every lookup of a substituted name by its term. Assignment
/// targets are renamed when the term is itself a plain name.
pub fn substitute(expr: &mut Expr, subs: &Substitution) {
    match &mut expr.kind {
        ExprKind::Lookup(id) => {
            if let Some(term) = subs.get(&id.node) {
                *expr = term.clone();
            }
            return;
        }
        ExprKind::Assign { target, .. } => {
            if let Some(ExprKind::Lookup(name)) = subs.get(&target.node).map(|t| &t.kind) {
                target.node = name.node.clone();
            }
        }
        _ => {}
    }
    for child in children_mut(expr) {
        substitute(child, subs);
    }
}

/// Applies a substitution to a bound. Terms that are not arithmetic cannot
/// appear in a bound and are reported.
pub fn substitute_bounds(b: &mut Bounds, subs: &Substitution) -> Result<(), CheckError> {
    match &mut b.kind {
        BoundsKind::Int(_) => {}
        BoundsKind::Lookup(id) => {
            if let Some(term) = subs.get(&id.node) {
                b.kind = match &term.kind {
                    ExprKind::Int(n) => BoundsKind::Int(*n),
                    ExprKind::Lookup(name) => BoundsKind::Lookup(name.clone()),
                    _ => BoundsKind::Paren(Box::new(bounds::from_expr(term)?)),
                };
            }
        }
        BoundsKind::Paren(inner) => substitute_bounds(inner, subs)?,
        BoundsKind::Call { args, .. } => {
            for a in args {
                substitute_bounds(a, subs)?;
            }
        }
        BoundsKind::Env(contexts) => {
            for c in contexts {
                substitute(c, subs);
            }
        }
        BoundsKind::Binary { left, right, .. } => {
            substitute_bounds(left, subs)?;
            substitute_bounds(right, subs)?;
        }
    }
    Ok(())
}

/// Renames variables. Nested objects only have their constructor
/// arguments renamed; their methods keep their own scope.
pub fn rename(expr: &mut Expr, names: &HashMap<String, String>) {
    match &mut expr.kind {
        ExprKind::Lookup(id) => {
            if let Some(new) = names.get(&id.node) {
                id.node = new.clone();
            }
        }
        ExprKind::Assign { target, value } => {
            rename(value, names);
            if let Some(new) = names.get(&target.node) {
                target.node = new.clone();
            }
        }
        ExprKind::New(new) => {
            for p in &mut new.params {
                rename(&mut p.value, names);
            }
        }
        _ => {
            for child in children_mut(expr) {
                rename(child, names);
            }
        }
    }
}

/// Prepends `context` to the context list of every `env` term in a bound.
pub fn prepend_env_context(b: &mut Bounds, context: &Expr) {
    match &mut b.kind {
        BoundsKind::Env(contexts) => contexts.insert(0, context.clone()),
        BoundsKind::Paren(inner) => prepend_env_context(inner, context),
        BoundsKind::Call { args, .. } => {
            for a in args {
                prepend_env_context(a, context);
            }
        }
        BoundsKind::Binary { left, right, .. } => {
            prepend_env_context(left, context);
            prepend_env_context(right, context);
        }
        BoundsKind::Int(_) | BoundsKind::Lookup(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quivela_parse::{format_bounds, format_expr, parse_bounds, parse_expr};

    fn subs(pairs: &[(&str, &str)]) -> Substitution {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), parse_expr(v).unwrap()))
            .collect()
    }

    #[test]
    fn substitutes_lookups_and_renames_targets() {
        let mut e = parse_expr("x = f(y); x * y").unwrap();
        substitute(&mut e, &subs(&[("x", "z"), ("y", "a + b")]));
        assert_eq!(format_expr(&e), "z = f(a + b); z * (a + b)");
    }

    #[test]
    fn bounds_substitution_keeps_shape() {
        let mut b = parse_bounds("q * adv + env (f(q))").unwrap();
        substitute_bounds(&mut b, &subs(&[("q", "n + 1")])).unwrap();
        assert_eq!(format_bounds(&b), "(n + 1) * adv + env (f(n + 1))");

        let mut b = parse_bounds("q").unwrap();
        let err = substitute_bounds(&mut b, &subs(&[("q", "new () {}")])).unwrap_err();
        assert!(matches!(err, CheckError::Internal(_)));
    }

    #[test]
    fn rename_stops_at_nested_methods() {
        let mut e = parse_expr("k = k; new (c = k) { method f() { k } }").unwrap();
        let names = HashMap::from([("k".to_string(), "m_0".to_string())]);
        rename(&mut e, &names);
        assert_eq!(
            format_expr(&e),
            "m_0 = m_0; new (c = m_0) {\n    method f() {\n        k\n    }\n}"
        );
    }

    #[test]
    fn env_terms_receive_context() {
        let mut b = parse_bounds("adv + env (x)").unwrap();
        prepend_env_context(&mut b, &Expr::lookup("c"));
        assert_eq!(format_bounds(&b), "adv + env (c) (x)");
    }
}
