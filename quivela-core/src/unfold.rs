#![forbid(unsafe_code)]

//! Replaces calls to defined functions by their bodies.

use std::collections::HashMap;

use quivela_ast::{Expr, ExprKind, FuncDecl, Ident};

use crate::context::Functions;
use crate::error::{CheckError, Location};
use crate::tree::children_mut;

/// Unfolds calls in `expr`, innermost first. With a non-empty `only`, just
/// the named functions are unfolded.
///
/// A call is only unfolded when every formal parameter occurs exactly once
/// in the body, outside any branch; otherwise the unfolded body could
/// evaluate an argument a different number of times than the call did.
pub fn unfold(
    expr: &mut Expr,
    only: &[Ident],
    functions: &Functions,
    location: &Location,
) -> Result<(), CheckError> {
    Unfolder {
        only,
        functions,
        location,
    }
    .visit(expr)
}

struct Unfolder<'a> {
    only: &'a [Ident],
    functions: &'a Functions,
    location: &'a Location,
}

impl Unfolder<'_> {
    fn visit(&self, expr: &mut Expr) -> Result<(), CheckError> {
        for child in children_mut(expr) {
            self.visit(child)?;
        }
        let ExprKind::Call { name, args } = &expr.kind else {
            return Ok(());
        };
        if !self.only.is_empty() && !self.only.iter().any(|id| id.node == name.node) {
            return Ok(());
        }
        let decl = self.functions.get(&name.node).ok_or_else(|| {
            self.location
                .error(format!("function does not exist: {}", name.node))
        })?;
        if let Some(body) = instantiate(decl, args) {
            *expr = body;
        }
        Ok(())
    }
}

/// The body of `decl` with `args` in place of its formals, when that is
/// safe to do.
fn instantiate(decl: &FuncDecl, args: &[Expr]) -> Option<Expr> {
    let mut body = decl.body.clone()?;
    let actuals: HashMap<&str, Expr> = decl
        .params
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let arg = args.get(i).cloned().unwrap_or_else(|| Expr::int(0));
            (p.name.node.as_str(), arg)
        })
        .collect();
    let mut uses = Uses::default();
    substitute_counted(&mut body, &actuals, false, &mut uses);
    let linear = decl
        .params
        .iter()
        .all(|p| uses.counts.get(p.name.node.as_str()) == Some(&1));
    (decl.params.is_empty() || (linear && !uses.conditional)).then_some(body)
}

#[derive(Default)]
struct Uses {
    counts: HashMap<String, usize>,
    conditional: bool,
}

fn substitute_counted(
    expr: &mut Expr,
    actuals: &HashMap<&str, Expr>,
    conditional: bool,
    uses: &mut Uses,
) {
    match &mut expr.kind {
        ExprKind::Lookup(id) => {
            if let Some(arg) = actuals.get(id.node.as_str()) {
                *uses.counts.entry(id.node.clone()).or_default() += 1;
                uses.conditional |= conditional;
                *expr = arg.clone();
            }
        }
        ExprKind::Logic { left, right, .. } => {
            substitute_counted(left, actuals, conditional, uses);
            substitute_counted(right, actuals, true, uses);
        }
        ExprKind::Ternary {
            cond,
            then,
            otherwise,
        } => {
            substitute_counted(cond, actuals, conditional, uses);
            substitute_counted(then, actuals, true, uses);
            substitute_counted(otherwise, actuals, true, uses);
        }
        ExprKind::New(new) => {
            for p in &mut new.params {
                substitute_counted(&mut p.value, actuals, conditional, uses);
            }
        }
        _ => {
            for child in children_mut(expr) {
                substitute_counted(child, actuals, conditional, uses);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quivela_ast::ident;
    use quivela_parse::{format_expr, parse_expr};

    fn function(name: &str, params: &[&str], body: &str) -> FuncDecl {
        FuncDecl {
            span: quivela_ast::synthetic(),
            name: ident(name),
            pure: false,
            is_static: false,
            params: params
                .iter()
                .map(|p| quivela_ast::FormalParam::untyped(*p))
                .collect(),
            ret: None,
            body: Some(parse_expr(body).unwrap()),
        }
    }

    fn run(functions: &Functions, only: &[&str], src: &str) -> Result<String, CheckError> {
        let mut e = parse_expr(src).unwrap();
        let only: Vec<Ident> = only.iter().map(|n| ident(*n)).collect();
        unfold(&mut e, &only, functions, &Location::detached("t.qvl"))?;
        Ok(format_expr(&e))
    }

    #[test]
    fn linear_bodies_are_unfolded() {
        let mut fs = Functions::new();
        fs.insert(function("inc", &["x"], "x + 1"));
        fs.insert(function("zero", &[], "0"));
        assert_eq!(run(&fs, &[], "inc(inc(a)) * zero()").unwrap(), "(a + 1 + 1) * 0");
    }

    #[test]
    fn duplicated_or_conditional_uses_stay_folded() {
        let mut fs = Functions::new();
        fs.insert(function("twice", &["p"], "p | p"));
        fs.insert(function("guard", &["p"], "c & p"));
        fs.insert(function("pick", &["p", "q"], "p ? q : 0"));
        assert_eq!(run(&fs, &[], "twice(a)").unwrap(), "twice(a)");
        assert_eq!(run(&fs, &[], "guard(a)").unwrap(), "guard(a)");
        assert_eq!(run(&fs, &[], "pick(a, b)").unwrap(), "pick(a, b)");
    }

    #[test]
    fn missing_arguments_default_to_zero() {
        let mut fs = Functions::new();
        fs.insert(function("pair", &["x", "y"], "x + y"));
        assert_eq!(run(&fs, &[], "pair(a)").unwrap(), "a + 0");
    }

    #[test]
    fn filters_by_name_and_reports_unknown_functions() {
        let mut fs = Functions::new();
        fs.insert(function("inc", &["x"], "x + 1"));
        fs.insert(function("dec", &["x"], "x - 1"));
        assert_eq!(run(&fs, &["dec"], "inc(dec(a))").unwrap(), "inc(a - 1)");
        let err = run(&fs, &[], "nope(a)").unwrap_err();
        assert_eq!(err.message(), "function does not exist: nope");
    }
}
