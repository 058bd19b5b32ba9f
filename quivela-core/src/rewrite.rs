#![forbid(unsafe_code)]

use std::collections::HashSet;

use quivela_ast::{Bounds, Expr, ExprKind};
use tracing::debug;

use crate::error::CheckError;
use crate::subst::{prepend_env_context, substitute, substitute_bounds};
use crate::tree::{children, node_at, node_at_mut};
use crate::unify::unify;

/// One rewritten location.
#[derive(Clone, Debug)]
pub struct Rewrite {
    /// Cost of this step with the pattern variables instantiated.
    pub distance: Bounds,
    /// The whole target with `[]` at the rewritten location; `None` when
    /// the root itself was rewritten.
    pub context: Option<Expr>,
}

/// Rewrites every instance of `left` into `right` in a target tree.
pub struct Rewriter<'a> {
    left: &'a Expr,
    vars: &'a [String],
    right: &'a Expr,
    distance: &'a Bounds,
    in_methods: bool,
    scopes: Vec<HashSet<String>>,
    method_depth: usize,
    rewrites: Vec<Rewrite>,
}

impl<'a> Rewriter<'a> {
    pub fn new(
        left: &'a Expr,
        vars: &'a [String],
        right: &'a Expr,
        distance: &'a Bounds,
        in_methods: bool,
    ) -> Self {
        Self {
            left,
            vars,
            right,
            distance,
            in_methods,
            scopes: vec![HashSet::new()],
            method_depth: 0,
            rewrites: Vec::new(),
        }
    }

    /// Visits `target` bottom-up and rewrites each match in place.
    pub fn rewrite(mut self, target: &mut Expr) -> Result<Vec<Rewrite>, CheckError> {
        let mut path = Vec::new();
        self.visit(target, &mut path)?;
        debug!(count = self.rewrites.len(), "rewrite finished");
        Ok(self.rewrites)
    }

    fn visit(&mut self, root: &mut Expr, path: &mut Vec<usize>) -> Result<(), CheckError> {
        let node = lookup(root, path)?;
        match &node.kind {
            ExprKind::New(new) => {
                let params: Vec<String> = new.params.iter().map(|p| p.name.node.clone()).collect();
                let methods: Vec<HashSet<String>> = new
                    .methods
                    .iter()
                    .map(|m| m.params.iter().map(|p| p.name.node.clone()).collect())
                    .collect();
                self.scopes.push(HashSet::new());
                for (i, name) in params.iter().enumerate() {
                    self.visit_child(root, path, i)?;
                    self.bind(name);
                }
                for (j, formals) in methods.into_iter().enumerate() {
                    self.method_depth += 1;
                    self.scopes.push(formals);
                    self.visit_child(root, path, params.len() + j)?;
                    self.scopes.pop();
                    self.method_depth -= 1;
                }
                self.scopes.pop();
            }
            ExprKind::Assign { target, .. } => {
                let name = target.node.clone();
                self.visit_child(root, path, 0)?;
                self.bind(&name);
            }
            _ => {
                let count = children(node).len();
                for i in 0..count {
                    self.visit_child(root, path, i)?;
                }
            }
        }
        self.try_rewrite(root, path)
    }

    fn visit_child(
        &mut self,
        root: &mut Expr,
        path: &mut Vec<usize>,
        index: usize,
    ) -> Result<(), CheckError> {
        path.push(index);
        let result = self.visit(root, path);
        path.pop();
        result
    }

    fn bind(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    fn try_rewrite(&mut self, root: &mut Expr, path: &[usize]) -> Result<(), CheckError> {
        if !self.in_methods && self.method_depth > 0 {
            return Ok(());
        }
        let node = lookup(root, path)?;
        // The contents of a plain parenthesis were already tried.
        if matches!(node.kind, ExprKind::Paren { label: None, .. }) {
            return Ok(());
        }
        let bound: HashSet<String> = self.scopes.iter().flatten().cloned().collect();
        let Some(mgu) = unify(self.left, self.vars, node, &bound)? else {
            return Ok(());
        };

        let mut replacement = self.right.clone();
        substitute(&mut replacement, &mgu);
        let mut distance = self.distance.clone();
        substitute_bounds(&mut distance, &mgu)?;

        if path.is_empty() {
            *root = replacement;
            self.rewrites.push(Rewrite {
                distance,
                context: None,
            });
            return Ok(());
        }

        *lookup_mut(root, path)? = Expr::synthetic(ExprKind::Hole);
        let context = root.clone();
        prepend_env_context(&mut distance, &context);
        *lookup_mut(root, path)? = replacement;
        self.rewrites.push(Rewrite {
            distance,
            context: Some(context),
        });
        Ok(())
    }
}

fn lookup<'e>(root: &'e Expr, path: &[usize]) -> Result<&'e Expr, CheckError> {
    node_at(root, path).ok_or_else(|| CheckError::internal("rewrite path left the tree"))
}

fn lookup_mut<'e>(root: &'e mut Expr, path: &[usize]) -> Result<&'e mut Expr, CheckError> {
    node_at_mut(root, path).ok_or_else(|| CheckError::internal("rewrite path left the tree"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quivela_parse::{format_bounds, format_expr, parse_bounds, parse_expr};

    struct Fact {
        left: Expr,
        vars: Vec<String>,
        right: Expr,
        distance: Bounds,
    }

    fn fact(left: &str, vars: &[&str], right: &str, distance: &str) -> Fact {
        Fact {
            left: parse_expr(left).unwrap(),
            vars: vars.iter().map(|v| v.to_string()).collect(),
            right: parse_expr(right).unwrap(),
            distance: parse_bounds(distance).unwrap(),
        }
    }

    fn apply(f: &Fact, target: &str, in_methods: bool) -> (String, Vec<Rewrite>) {
        let mut target = parse_expr(target).unwrap();
        let rewrites = Rewriter::new(&f.left, &f.vars, &f.right, &f.distance, in_methods)
            .rewrite(&mut target)
            .unwrap();
        (format_expr(&target), rewrites)
    }

    #[test]
    fn rewrites_the_root() {
        let f = fact("f(x)", &["x"], "g(x)", "0");
        let (out, rewrites) = apply(&f, "f(a)", false);
        assert_eq!(out, "g(a)");
        assert_eq!(rewrites.len(), 1);
        assert!(rewrites[0].context.is_none());
    }

    #[test]
    fn every_site_is_rewritten_and_charged() {
        let f = fact("f(x)", &["x"], "g(x)", "adv(x) + env");
        let (out, rewrites) = apply(&f, "f(a) + f(b)", false);
        assert_eq!(out, "g(a) + g(b)");
        assert_eq!(rewrites.len(), 2);
        assert_eq!(format_bounds(&rewrites[0].distance), "adv(a) + env ([] + f(b))");
        assert_eq!(format_bounds(&rewrites[1].distance), "adv(b) + env (g(a) + [])");
    }

    #[test]
    fn method_bodies_need_permission() {
        let f = fact("f(x)", &["x"], "g(x)", "0");
        let src = "new (c = f(a)) { method m() { f(c) } }";
        let (out, rewrites) = apply(&f, src, false);
        assert_eq!(rewrites.len(), 1);
        assert!(out.contains("(c = g(a))") && out.contains("f(c)"));
        let (out, rewrites) = apply(&f, src, true);
        assert_eq!(rewrites.len(), 2);
        assert!(out.contains("g(c)"));
    }

    #[test]
    fn bound_names_block_constant_matches() {
        let f = fact("h(k)", &[], "k", "0");
        let (_, rewrites) = apply(&f, "h(k)", false);
        assert_eq!(rewrites.len(), 1);
        // `k` is a field here, not the global the fact talks about.
        let (_, rewrites) = apply(&f, "new (k = 0) { method m() { h(k) } }", true);
        assert!(rewrites.is_empty());
    }
}
