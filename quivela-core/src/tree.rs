#![forbid(unsafe_code)]

//! Child access and name collection over expression trees.

use std::collections::HashSet;

use quivela_ast::{Bounds, BoundsKind, Expr, ExprKind};

/// Direct sub-expressions in evaluation order. For `new`, constructor
/// parameter values come first, then method bodies.
pub fn children(expr: &Expr) -> Vec<&Expr> {
    match &expr.kind {
        ExprKind::Int(_)
        | ExprKind::Bool(_)
        | ExprKind::Lookup(_)
        | ExprKind::Assert(_)
        | ExprKind::Admit(_)
        | ExprKind::Ellipsis
        | ExprKind::Hole => Vec::new(),
        ExprKind::Paren { expr, .. }
        | ExprKind::Not(expr)
        | ExprKind::Ref(expr)
        | ExprKind::Tobits(expr)
        | ExprKind::Assign { value: expr, .. } => vec![&**expr],
        ExprKind::Seq { head, tail } => vec![&**head, &**tail],
        ExprKind::Ternary {
            cond,
            then,
            otherwise,
        } => vec![&**cond, &**then, &**otherwise],
        ExprKind::Logic { left, right, .. }
        | ExprKind::Compare { left, right, .. }
        | ExprKind::Arith { left, right, .. } => vec![&**left, &**right],
        ExprKind::Call { args, .. } => args.iter().collect(),
        ExprKind::Invoke { target, args, .. } => {
            std::iter::once(&**target).chain(args.iter()).collect()
        }
        ExprKind::New(new) => new
            .params
            .iter()
            .map(|p| &p.value)
            .chain(new.methods.iter().map(|m| &m.body))
            .collect(),
        ExprKind::Index { map, index } => vec![&**map, &**index],
        ExprKind::Update { map, index, value } => vec![&**map, &**index, &**value],
    }
}

/// Mutable counterpart of [`children`], same order.
pub fn children_mut(expr: &mut Expr) -> Vec<&mut Expr> {
    match &mut expr.kind {
        ExprKind::Int(_)
        | ExprKind::Bool(_)
        | ExprKind::Lookup(_)
        | ExprKind::Assert(_)
        | ExprKind::Admit(_)
        | ExprKind::Ellipsis
        | ExprKind::Hole => Vec::new(),
        ExprKind::Paren { expr, .. }
        | ExprKind::Not(expr)
        | ExprKind::Ref(expr)
        | ExprKind::Tobits(expr)
        | ExprKind::Assign { value: expr, .. } => vec![&mut **expr],
        ExprKind::Seq { head, tail } => vec![&mut **head, &mut **tail],
        ExprKind::Ternary {
            cond,
            then,
            otherwise,
        } => vec![&mut **cond, &mut **then, &mut **otherwise],
        ExprKind::Logic { left, right, .. }
        | ExprKind::Compare { left, right, .. }
        | ExprKind::Arith { left, right, .. } => vec![&mut **left, &mut **right],
        ExprKind::Call { args, .. } => args.iter_mut().collect(),
        ExprKind::Invoke { target, args, .. } => {
            std::iter::once(&mut **target).chain(args.iter_mut()).collect()
        }
        ExprKind::New(new) => new
            .params
            .iter_mut()
            .map(|p| &mut p.value)
            .chain(new.methods.iter_mut().map(|m| &mut m.body))
            .collect(),
        ExprKind::Index { map, index } => vec![&mut **map, &mut **index],
        ExprKind::Update { map, index, value } => {
            vec![&mut **map, &mut **index, &mut **value]
        }
    }
}

pub fn node_at<'a>(root: &'a Expr, path: &[usize]) -> Option<&'a Expr> {
    let mut cur = root;
    for &i in path {
        cur = children(cur).into_iter().nth(i)?;
    }
    Some(cur)
}

pub fn node_at_mut<'a>(root: &'a mut Expr, path: &[usize]) -> Option<&'a mut Expr> {
    let mut cur = root;
    for &i in path {
        cur = children_mut(cur).into_iter().nth(i)?;
    }
    Some(cur)
}

/// Every identifier mentioned anywhere in `expr`, binders included.
pub fn identifiers(expr: &Expr) -> HashSet<String> {
    let mut out = HashSet::new();
    collect_identifiers(expr, &mut out);
    out
}

fn collect_identifiers(expr: &Expr, out: &mut HashSet<String>) {
    match &expr.kind {
        ExprKind::Lookup(id) => {
            out.insert(id.node.clone());
        }
        ExprKind::Assign { target, .. } => {
            out.insert(target.node.clone());
        }
        ExprKind::Paren {
            label: Some(label), ..
        } => {
            out.insert(label.node.clone());
        }
        ExprKind::Call { name, .. } => {
            out.insert(name.node.clone());
        }
        ExprKind::Invoke {
            method, classes, ..
        } => {
            out.insert(method.node.clone());
            out.extend(classes.iter().map(|c| c.node.clone()));
        }
        ExprKind::New(new) => {
            out.extend(new.class.iter().map(|c| c.node.clone()));
            out.extend(new.params.iter().map(|p| p.name.node.clone()));
            for m in &new.methods {
                out.insert(m.name.node.clone());
                out.extend(m.params.iter().map(|p| p.name.node.clone()));
            }
        }
        _ => {}
    }
    for child in children(expr) {
        collect_identifiers(child, out);
    }
}

/// Names read by `expr` that are not bound by an object or method inside it.
pub fn free_references(expr: &Expr) -> HashSet<String> {
    let mut out = HashSet::new();
    let mut scopes: Vec<HashSet<String>> = Vec::new();
    free_refs(expr, &mut scopes, &mut out);
    out
}

fn free_refs(expr: &Expr, scopes: &mut Vec<HashSet<String>>, out: &mut HashSet<String>) {
    match &expr.kind {
        ExprKind::Lookup(id) => {
            if !scopes.iter().any(|s| s.contains(&id.node)) {
                out.insert(id.node.clone());
            }
        }
        ExprKind::New(new) => {
            scopes.push(HashSet::new());
            for p in &new.params {
                let locals = local_decls(&p.value, |n| is_bound(scopes, n));
                scopes.push(locals);
                free_refs(&p.value, scopes, out);
                scopes.pop();
                if let Some(frame) = scopes.last_mut() {
                    frame.insert(p.name.node.clone());
                }
            }
            for m in &new.methods {
                let mut frame = local_decls(&m.body, |n| is_bound(scopes, n));
                frame.extend(m.params.iter().map(|p| p.name.node.clone()));
                scopes.push(frame);
                free_refs(&m.body, scopes, out);
                scopes.pop();
            }
            scopes.pop();
        }
        _ => {
            for child in children(expr) {
                free_refs(child, scopes, out);
            }
        }
    }
}

fn is_bound(scopes: &[HashSet<String>], name: &str) -> bool {
    scopes.iter().any(|s| s.contains(name))
}

/// Assignment targets in `expr` that `bound` does not already know about.
/// Nested objects declare their own locals and are skipped.
pub fn local_decls(expr: &Expr, bound: impl Fn(&str) -> bool) -> HashSet<String> {
    let mut out = HashSet::new();
    collect_local_decls(expr, &bound, &mut out);
    out
}

fn collect_local_decls(expr: &Expr, bound: &impl Fn(&str) -> bool, out: &mut HashSet<String>) {
    match &expr.kind {
        ExprKind::New(_) => {}
        ExprKind::Assign { target, value } => {
            collect_local_decls(value, bound, out);
            if !bound(&target.node) {
                out.insert(target.node.clone());
            }
        }
        _ => {
            for child in children(expr) {
                collect_local_decls(child, bound, out);
            }
        }
    }
}

/// Ordered variant of [`local_decls`], in first-assignment order.
pub fn local_decls_ordered(expr: &Expr, bound: impl Fn(&str) -> bool) -> Vec<String> {
    let mut out = Vec::new();
    ordered_local_decls(expr, &bound, &mut out);
    out
}

fn ordered_local_decls(expr: &Expr, bound: &impl Fn(&str) -> bool, out: &mut Vec<String>) {
    match &expr.kind {
        ExprKind::New(_) => {}
        ExprKind::Assign { target, value } => {
            ordered_local_decls(value, bound, out);
            if !bound(&target.node) && !out.contains(&target.node) {
                out.push(target.node.clone());
            }
        }
        _ => {
            for child in children(expr) {
                ordered_local_decls(child, bound, out);
            }
        }
    }
}

/// Variables read by a bounds expression, including inside `env` contexts.
pub fn bounds_references(bounds: &Bounds) -> HashSet<String> {
    let mut out = HashSet::new();
    collect_bounds_refs(bounds, &mut out);
    out
}

fn collect_bounds_refs(bounds: &Bounds, out: &mut HashSet<String>) {
    match &bounds.kind {
        BoundsKind::Int(_) => {}
        BoundsKind::Lookup(id) => {
            out.insert(id.node.clone());
        }
        BoundsKind::Paren(inner) => collect_bounds_refs(inner, out),
        BoundsKind::Call { args, .. } => {
            for a in args {
                collect_bounds_refs(a, out);
            }
        }
        BoundsKind::Env(contexts) => {
            for c in contexts {
                out.extend(free_references(c));
            }
        }
        BoundsKind::Binary { left, right, .. } => {
            collect_bounds_refs(left, out);
            collect_bounds_refs(right, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quivela_parse::parse_expr;

    fn sorted(set: HashSet<String>) -> Vec<String> {
        let mut v: Vec<_> = set.into_iter().collect();
        v.sort();
        v
    }

    #[test]
    fn free_references_skip_object_scopes() {
        let e = parse_expr("new (k = g) { method f(x) { y = x; h(k, y, z) } }").unwrap();
        assert_eq!(sorted(free_references(&e)), vec!["g", "z"]);
    }

    #[test]
    fn top_level_assignments_are_free() {
        let e = parse_expr("a = x; a").unwrap();
        assert_eq!(sorted(free_references(&e)), vec!["a", "x"]);
    }

    #[test]
    fn local_decls_ignore_bound_names_and_nested_objects() {
        let e = parse_expr("a = 1; k = 2; o = new () { method f() { b = 3 } }").unwrap();
        assert_eq!(sorted(local_decls(&e, |n| n == "k")), vec!["a", "o"]);
        assert_eq!(local_decls_ordered(&e, |_| false), vec!["a", "k", "o"]);
    }

    #[test]
    fn paths_address_children_in_order() {
        let e = parse_expr("f(a, b + c)").unwrap();
        let node = node_at(&e, &[1, 1]).unwrap();
        assert_eq!(node.as_lookup(), Some("c"));
        assert!(node_at(&e, &[2]).is_none());
    }
}
