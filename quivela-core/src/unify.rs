#![forbid(unsafe_code)]

//! Restricted syntactic unification: a pattern with variables against a
//! ground term.

use std::collections::HashSet;

use quivela_ast::{Expr, ExprKind};
use quivela_parse::format_expr;

use crate::error::CheckError;
use crate::subst::Substitution;
use crate::tree::identifiers;

#[derive(Clone, Copy, Debug)]
enum Term<'a> {
    Expr(&'a Expr),
    Name(&'a str),
}

impl<'a> Term<'a> {
    fn text(&self) -> String {
        match self {
            Term::Expr(e) => format_expr(e),
            Term::Name(n) => n.to_string(),
        }
    }

    fn as_name(&self) -> Option<&'a str> {
        match self {
            Term::Expr(e) => match &e.kind {
                ExprKind::Lookup(id) => Some(id.node.as_str()),
                _ => None,
            },
            Term::Name(n) => Some(n),
        }
    }

    fn mentions_any(&self, names: &HashSet<String>) -> bool {
        match self {
            Term::Expr(e) => identifiers(e).iter().any(|n| names.contains(n)),
            Term::Name(n) => names.contains(*n),
        }
    }

    fn to_expr(self) -> Expr {
        match self {
            Term::Expr(e) => e.clone(),
            Term::Name(n) => Expr::lookup(n),
        }
    }
}

#[derive(Debug)]
struct Pair<'a> {
    left: Term<'a>,
    right: Term<'a>,
    left_text: String,
    right_text: String,
}

impl<'a> Pair<'a> {
    fn new(left: Term<'a>, right: Term<'a>) -> Self {
        Self {
            left_text: left.text(),
            right_text: right.text(),
            left,
            right,
        }
    }

    fn exprs(left: &'a Expr, right: &'a Expr) -> Self {
        Self::new(Term::Expr(left), Term::Expr(right))
    }

    fn names(left: &'a str, right: &'a str) -> Self {
        Self::new(Term::Name(left), Term::Name(right))
    }
}

pub struct Unifier<'a> {
    vars: HashSet<String>,
    bound: &'a HashSet<String>,
    pairs: Vec<Pair<'a>>,
}

impl<'a> Unifier<'a> {
    /// `vars` are the pattern variables of `pattern`. Names in `bound` are
    /// bound by the context of `target` and never match pattern constants.
    pub fn new(
        pattern: &'a Expr,
        vars: &[String],
        target: &'a Expr,
        bound: &'a HashSet<String>,
    ) -> Self {
        Self {
            vars: vars.iter().cloned().collect(),
            bound,
            pairs: vec![Pair::exprs(pattern, target)],
        }
    }

    /// The most general unifier, or `None` when the terms do not unify.
    pub fn unify(mut self) -> Result<Option<Substitution>, CheckError> {
        loop {
            if let Some(solved) = self.solved_form() {
                return Ok(Some(solved));
            }
            if self.delete() {
                continue;
            }
            if !self.decompose()? {
                return Ok(None);
            }
        }
    }

    fn solved_form(&self) -> Option<Substitution> {
        let mut out = Substitution::new();
        for pair in &self.pairs {
            let name = pair.left.as_name()?;
            if !self.vars.contains(name) || out.contains_key(name) {
                return None;
            }
            out.insert(name.to_string(), pair.right.to_expr());
        }
        Some(out)
    }

    fn delete(&mut self) -> bool {
        for i in 0..self.pairs.len() {
            let pair = &self.pairs[i];
            let identical = pair.left_text == pair.right_text
                && !pair.left.mentions_any(&self.vars)
                && !pair.left.mentions_any(self.bound);
            let duplicate = self.pairs.iter().enumerate().any(|(j, other)| {
                j != i && other.left_text == pair.left_text && other.right_text == pair.right_text
            });
            if identical || duplicate {
                self.pairs.remove(i);
                return true;
            }
        }
        false
    }

    fn decompose(&mut self) -> Result<bool, CheckError> {
        for i in 0..self.pairs.len() {
            let (Term::Expr(l), Term::Expr(r)) = (self.pairs[i].left, self.pairs[i].right) else {
                continue;
            };
            if let Some(children) = decompose_exprs(l, r)? {
                self.pairs.remove(i);
                self.pairs.extend(children);
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Child pairs of two terms with the same top-level shape.
fn decompose_exprs<'a>(l: &'a Expr, r: &'a Expr) -> Result<Option<Vec<Pair<'a>>>, CheckError> {
    use ExprKind as K;
    let pairs = match (&l.kind, &r.kind) {
        (K::Lookup(a), K::Lookup(b)) => vec![Pair::names(&a.node, &b.node)],
        (
            K::Paren {
                label: la,
                expr: ea,
            },
            K::Paren {
                label: lb,
                expr: eb,
            },
        ) => match (la, lb) {
            (None, None) => vec![Pair::exprs(ea, eb)],
            (Some(a), Some(b)) => vec![Pair::names(&a.node, &b.node), Pair::exprs(ea, eb)],
            _ => return Ok(None),
        },
        (K::Seq { head: h1, tail: t1 }, K::Seq { head: h2, tail: t2 }) => {
            vec![Pair::exprs(h1, h2), Pair::exprs(t1, t2)]
        }
        (
            K::Assign {
                target: x1,
                value: v1,
            },
            K::Assign {
                target: x2,
                value: v2,
            },
        ) => vec![Pair::names(&x1.node, &x2.node), Pair::exprs(v1, v2)],
        (
            K::Ternary {
                cond: c1,
                then: a1,
                otherwise: b1,
            },
            K::Ternary {
                cond: c2,
                then: a2,
                otherwise: b2,
            },
        ) => vec![Pair::exprs(c1, c2), Pair::exprs(a1, a2), Pair::exprs(b1, b2)],
        (
            K::Logic {
                left: l1,
                op: o1,
                right: r1,
            },
            K::Logic {
                left: l2,
                op: o2,
                right: r2,
            },
        ) if o1 == o2 => vec![Pair::exprs(l1, l2), Pair::exprs(r1, r2)],
        (
            K::Compare {
                left: l1,
                op: o1,
                right: r1,
            },
            K::Compare {
                left: l2,
                op: o2,
                right: r2,
            },
        ) if o1 == o2 => vec![Pair::exprs(l1, l2), Pair::exprs(r1, r2)],
        (
            K::Arith {
                left: l1,
                op: o1,
                right: r1,
            },
            K::Arith {
                left: l2,
                op: o2,
                right: r2,
            },
        ) if o1 == o2 => vec![Pair::exprs(l1, l2), Pair::exprs(r1, r2)],
        (K::Not(a), K::Not(b)) | (K::Ref(a), K::Ref(b)) | (K::Tobits(a), K::Tobits(b)) => {
            vec![Pair::exprs(a, b)]
        }
        (K::Call { name: n1, args: a1 }, K::Call { name: n2, args: a2 }) => {
            if n1.node != n2.node {
                return Ok(None);
            }
            if a1.len() != a2.len() {
                return Err(CheckError::internal(format!(
                    "Argument length mismatch for function {}",
                    n1.node
                )));
            }
            a1.iter().zip(a2).map(|(a, b)| Pair::exprs(a, b)).collect()
        }
        (
            K::Invoke {
                target: t1,
                method: m1,
                classes: c1,
                args: a1,
            },
            K::Invoke {
                target: t2,
                method: m2,
                classes: c2,
                args: a2,
            },
        ) => {
            let same_classes = c1.len() == c2.len() && c1.iter().zip(c2).all(|(a, b)| a.node == b.node);
            if m1.node != m2.node || !same_classes || a1.len() != a2.len() {
                return Ok(None);
            }
            std::iter::once(Pair::exprs(t1, t2))
                .chain(a1.iter().zip(a2).map(|(a, b)| Pair::exprs(a, b)))
                .collect()
        }
        (K::Index { map: m1, index: i1 }, K::Index { map: m2, index: i2 }) => {
            vec![Pair::exprs(m1, m2), Pair::exprs(i1, i2)]
        }
        (
            K::Update {
                map: m1,
                index: i1,
                value: v1,
            },
            K::Update {
                map: m2,
                index: i2,
                value: v2,
            },
        ) => vec![Pair::exprs(m1, m2), Pair::exprs(i1, i2), Pair::exprs(v1, v2)],
        _ => return Ok(None),
    };
    Ok(Some(pairs))
}

pub fn unify(
    pattern: &Expr,
    vars: &[String],
    target: &Expr,
    bound: &HashSet<String>,
) -> Result<Option<Substitution>, CheckError> {
    Unifier::new(pattern, vars, target, bound).unify()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quivela_parse::parse_expr;

    fn run(pattern: &str, vars: &[&str], target: &str, bound: &[&str]) -> Option<Vec<(String, String)>> {
        let pattern = parse_expr(pattern).unwrap();
        let target = parse_expr(target).unwrap();
        let vars: Vec<String> = vars.iter().map(|v| v.to_string()).collect();
        let bound: HashSet<String> = bound.iter().map(|v| v.to_string()).collect();
        let mgu = unify(&pattern, &vars, &target, &bound).unwrap()?;
        let mut out: Vec<_> = mgu
            .into_iter()
            .map(|(k, v)| (k, format_expr(&v)))
            .collect();
        out.sort();
        Some(out)
    }

    #[test]
    fn binds_pattern_variables() {
        assert_eq!(
            run("enc(k, m)", &["m"], "enc(k, f(a) + 1)", &[]),
            Some(vec![("m".to_string(), "f(a) + 1".to_string())])
        );
    }

    #[test]
    fn a_variable_alone_matches_anything() {
        assert_eq!(
            run("x", &["x"], "new () {}", &[]),
            Some(vec![("x".to_string(), "new () {}".to_string())])
        );
    }

    #[test]
    fn repeated_variable_needs_identical_terms() {
        assert!(run("f(x, x)", &["x"], "f(a, a)", &[]).is_some());
        assert!(run("f(x, x)", &["x"], "f(a, b)", &[]).is_none());
    }

    #[test]
    fn shapes_and_operators_must_agree() {
        assert!(run("a + x", &["x"], "a * b", &[]).is_none());
        assert!(run("f(x)", &["x"], "g(b)", &[]).is_none());
        assert!(run("o.m(x)", &["x"], "o.m<C>(b)", &[]).is_none());
    }

    #[test]
    fn bound_names_do_not_match_constants() {
        assert!(run("f(k)", &[], "f(k)", &[]).is_some());
        assert!(run("f(k)", &[], "f(k)", &["k"]).is_none());
        // A variable may still capture a bound name.
        assert!(run("f(x)", &["x"], "f(k)", &["k"]).is_some());
    }

    #[test]
    fn assignment_targets_unify_as_names() {
        assert_eq!(
            run("x = g(v)", &["x", "v"], "r = g(1)", &[]),
            Some(vec![
                ("v".to_string(), "1".to_string()),
                ("x".to_string(), "r".to_string()),
            ])
        );
    }

    #[test]
    fn arity_mismatch_is_internal() {
        let p = parse_expr("f(x)").unwrap();
        let t = parse_expr("f(a, b)").unwrap();
        let err = unify(&p, &["x".to_string()], &t, &HashSet::new()).unwrap_err();
        assert!(err.to_string().contains("Argument length mismatch for function f"));
    }
}
