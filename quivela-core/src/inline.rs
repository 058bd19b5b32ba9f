#![forbid(unsafe_code)]

//! Flattens objects constructed inside another object's constructor into
//! the enclosing object.
//!
//! `new (o = new (k = e) { method f(x) { b } }) { method g() { o.f(a) } }`
//! becomes `new (m_0 = e) { method g() { (l_0 = a; b') } }` where `b'` is
//! `b` with `k` renamed to `m_0` and `x` to `l_0`.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use quivela_ast::{ident, Expr, ExprKind, Ident, MethodDef, NewExpr, NewParam};
use quivela_parse::format_expr;
use tracing::debug;

use crate::error::{CheckError, Location};
use crate::subst::rename;
use crate::symbols::SymbolTable;
use crate::tree::{children_mut, free_references, local_decls};

/// Inlines every constructor argument that is itself an object. Names for
/// the lifted fields are taken from `ids` in order while they are free.
pub fn inline(
    expr: &mut Expr,
    symbols: &SymbolTable,
    ids: &[Ident],
    location: &Location,
) -> Result<(), CheckError> {
    let mut inliner = Inliner {
        symbols,
        globals: symbols.names(),
        ids: ids.iter().map(|id| id.node.clone()).collect(),
        location,
    };
    inliner.visit(expr)
}

struct Inliner<'a> {
    symbols: &'a SymbolTable,
    globals: HashSet<String>,
    ids: VecDeque<String>,
    location: &'a Location,
}

impl Inliner<'_> {
    fn visit(&mut self, expr: &mut Expr) -> Result<(), CheckError> {
        for child in children_mut(expr) {
            self.visit(child)?;
        }
        let ExprKind::New(outer) = &mut expr.kind else {
            return Ok(());
        };
        let mut i = 0;
        while i < outer.params.len() {
            if outer.params[i].value.unparen().as_new().is_some() {
                i += self.inline_param(outer, i)?;
            } else {
                i += 1;
            }
        }
        Ok(())
    }

    /// Lifts the object in parameter `index` into `outer`. Returns the
    /// number of parameters that took its place.
    fn inline_param(&mut self, outer: &mut NewExpr, index: usize) -> Result<usize, CheckError> {
        let param = outer.params.remove(index);
        let Some(inner) = param.value.unparen().as_new().cloned() else {
            return Err(CheckError::internal("inlined parameter is not an object"));
        };
        let object = param.name.node;

        let mut members: HashSet<String> =
            outer.params.iter().map(|p| p.name.node.clone()).collect();
        let mut taken = members.clone();
        for m in &inner.methods {
            taken.extend(local_decls(&m.body, |n| self.symbols.reference_allowed(n)));
        }
        taken.extend(self.globals.iter().cloned());

        let mut fields = HashMap::new();
        for (k, p) in inner.params.iter().enumerate() {
            let fresh = self.fresh_member(&taken);
            taken.insert(fresh.clone());
            members.insert(fresh.clone());
            let mut value = p.value.clone();
            rename(&mut value, &fields);
            fields.insert(p.name.node.clone(), fresh.clone());
            outer.params.insert(
                index + k,
                NewParam {
                    span: p.span,
                    name: Ident::new(p.name.span, fresh),
                    value,
                },
            );
        }
        debug!(object = %object, fields = fields.len(), "inlining object");

        for method in &mut outer.methods {
            let mut scope: HashSet<String> = free_references(&method.body);
            scope.extend(method.params.iter().map(|p| p.name.node.clone()));
            scope.extend(members.iter().cloned());
            let mut site = CallSite {
                object: &object,
                inner: &inner,
                fields: &fields,
                globals: &self.globals,
                scope,
                location: self.location,
            };
            site.visit(&mut method.body)?;
        }

        let still_used = outer.params.iter().any(|p| free_references(&p.value).contains(&object))
            || outer.methods.iter().any(|m| {
                free_references(&m.body).contains(&object)
                    && !m.params.iter().any(|p| p.name.node == object)
            });
        if still_used {
            return Err(self
                .location
                .error(format!("{object} is still referenced after inlining.")));
        }
        Ok(inner.params.len())
    }

    fn fresh_member(&mut self, taken: &HashSet<String>) -> String {
        if let Some(id) = self.ids.pop_front() {
            if !taken.contains(&id) {
                return id;
            }
        }
        fresh("m_", taken)
    }
}

/// Replaces invocations on the lifted object inside one outer method.
struct CallSite<'a> {
    object: &'a str,
    inner: &'a NewExpr,
    fields: &'a HashMap<String, String>,
    globals: &'a HashSet<String>,
    scope: HashSet<String>,
    location: &'a Location,
}

impl CallSite<'_> {
    fn visit(&mut self, expr: &mut Expr) -> Result<(), CheckError> {
        // Methods of nested objects cannot see the lifted fields.
        if let ExprKind::New(new) = &mut expr.kind {
            for p in &mut new.params {
                self.visit(&mut p.value)?;
            }
            return Ok(());
        }
        for child in children_mut(expr) {
            self.visit(child)?;
        }
        let ExprKind::Invoke {
            target,
            method,
            args,
            ..
        } = &expr.kind
        else {
            return Ok(());
        };
        if target.as_lookup() != Some(self.object) {
            return Ok(());
        }
        let inner = self.inner;
        let Some(callee) = inner.methods.iter().find(|m| m.name.node == method.node) else {
            return Err(self.location.error(format!(
                "method of invocation target class does not exist: {}",
                method.node
            )));
        };
        *expr = self.expand(callee, args);
        Ok(())
    }

    fn expand(&mut self, callee: &MethodDef, args: &[Expr]) -> Expr {
        let formals: Vec<&str> = callee.params.iter().map(|p| p.name.node.as_str()).collect();
        let mut locals: BTreeSet<String> = free_references(&callee.body)
            .into_iter()
            .filter(|n| !self.fields.contains_key(n) && !self.globals.contains(n))
            .collect();
        locals.extend(formals.iter().map(|f| f.to_string()));

        let mut names = self.fields.clone();
        for local in &locals {
            let fresh = fresh("l_", &self.scope);
            self.scope.insert(fresh.clone());
            names.insert(local.clone(), fresh);
        }

        let mut body = callee.body.clone();
        rename(&mut body, &names);
        let assigns: Vec<Expr> = formals
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let value = args.get(i).cloned().unwrap_or_else(|| Expr::int(0));
                Expr::synthetic(ExprKind::Assign {
                    target: ident(names.get(*f).cloned().unwrap_or_else(|| f.to_string())),
                    value: Box::new(value),
                })
            })
            .collect();
        let seq = assigns.into_iter().rev().fold(body, |tail, head| {
            Expr::synthetic(ExprKind::Seq {
                head: Box::new(head),
                tail: Box::new(tail),
            })
        });
        debug!(call = %format_expr(&seq), "expanded invocation");
        Expr::synthetic(ExprKind::Paren {
            label: None,
            expr: Box::new(seq),
        })
    }
}

fn fresh(prefix: &str, taken: &HashSet<String>) -> String {
    let mut n = 0usize;
    loop {
        let candidate = format!("{prefix}{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quivela_ast::Type;
    use quivela_parse::parse_expr;

    fn run(src: &str, ids: &[&str]) -> Result<String, CheckError> {
        let mut symbols = SymbolTable::new();
        symbols.push_frame(crate::symbols::FrameKind::Constant);
        symbols.add_symbol("e", Type::Bitstring);
        symbols.add_symbol("enc", Type::Bitstring);
        let mut e = parse_expr(src).unwrap();
        let ids: Vec<Ident> = ids.iter().map(|n| ident(*n)).collect();
        inline(&mut e, &symbols, &ids, &Location::detached("t.qvl"))?;
        Ok(format_expr(&e))
    }

    #[test]
    fn lifts_fields_and_expands_calls() {
        let out = run(
            "new (o = new (k = e) { method f(x) { enc(k, x) } }) { method g(a) { o.f(a) } }",
            &[],
        )
        .unwrap();
        assert_eq!(
            out,
            "new (m_0 = e) {\n    method g(a) {\n        (l_0 = a; enc(m_0, l_0))\n    }\n}"
        );
    }

    #[test]
    fn supplied_names_are_used_first() {
        let out = run(
            "new (o = new (k = e) { method get() { k } }) { method g() { o.get() } }",
            &["key"],
        )
        .unwrap();
        assert_eq!(out, "new (key = e) {\n    method g() {\n        (key)\n    }\n}");
    }

    #[test]
    fn missing_methods_and_leftover_references_fail() {
        let err = run(
            "new (o = new () { method f() { 1 } }) { method g() { o.h() } }",
            &[],
        )
        .unwrap_err();
        assert_eq!(err.message(), "method of invocation target class does not exist: h");

        let err = run(
            "new (o = new () { method f() { 1 } }) { method g() { o } }",
            &[],
        )
        .unwrap_err();
        assert_eq!(err.message(), "o is still referenced after inlining.");
    }
}
