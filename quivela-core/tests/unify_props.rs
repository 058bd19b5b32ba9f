//! Randomized properties of pattern unification over small ground terms.

use std::collections::HashSet;

use proptest::prelude::*;
use quivela_ast::{ident, ArithOp, Expr, ExprKind};
use quivela_core::subst::substitute;
use quivela_core::unify::unify;
use quivela_parse::format_expr;

fn ground_term() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        prop::sample::select(vec!["a", "b", "c"]).prop_map(Expr::lookup),
        (0u64..3).prop_map(Expr::int),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|x| call("f", vec![x])),
            (inner.clone(), inner.clone()).prop_map(|(x, y)| call("g", vec![x, y])),
            (inner.clone(), inner).prop_map(|(x, y)| Expr::synthetic(ExprKind::Arith {
                left: Box::new(x),
                op: ArithOp::Add,
                right: Box::new(y),
            })),
        ]
    })
}

fn call(name: &str, args: Vec<Expr>) -> Expr {
    Expr::synthetic(ExprKind::Call {
        name: ident(name),
        args,
    })
}

/// Replaces the subterms picked by `mask` (in pre-order) by fresh variables.
fn abstract_term(term: &Expr, mask: &[bool], next: &mut usize, vars: &mut Vec<String>) -> Expr {
    let index = *next;
    *next += 1;
    if mask.get(index).copied().unwrap_or(false) {
        let var = format!("v{index}");
        vars.push(var.clone());
        return Expr::lookup(var);
    }
    let mut out = term.clone();
    match &mut out.kind {
        ExprKind::Call { args, .. } => {
            for a in args.iter_mut() {
                *a = abstract_term(a, mask, next, vars);
            }
        }
        ExprKind::Arith { left, right, .. } => {
            **left = abstract_term(left, mask, next, vars);
            **right = abstract_term(right, mask, next, vars);
        }
        _ => {}
    }
    out
}

proptest! {
    #[test]
    fn abstracted_patterns_unify_back(
        target in ground_term(),
        mask in prop::collection::vec(any::<bool>(), 0..32),
    ) {
        let mut vars = Vec::new();
        let pattern = abstract_term(&target, &mask, &mut 0, &mut vars);
        let mgu = unify(&pattern, &vars, &target, &HashSet::new())
            .unwrap()
            .expect("pattern was built from the target");
        let mut instance = pattern.clone();
        substitute(&mut instance, &mgu);
        prop_assert_eq!(format_expr(&instance), format_expr(&target));
    }

    #[test]
    fn ground_terms_unify_iff_equal(left in ground_term(), right in ground_term()) {
        let mgu = unify(&left, &[], &right, &HashSet::new()).unwrap();
        prop_assert_eq!(mgu.is_some(), format_expr(&left) == format_expr(&right));
    }
}
