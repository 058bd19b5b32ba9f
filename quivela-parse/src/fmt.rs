#![forbid(unsafe_code)]

use quivela_ast::{
    BisimProp, BisimScope, Bounds, BoundsKind, BoundsOp, ClassRef, Development, Expr, ExprKind,
    FactDecl, FormalParam, HeapProp, Ident, Item, LogicOp, MethodDef, NewExpr, NewParam,
    ObjectProp, Prop, PropKind, PropLogicOp, Quantifier, RewriteTerm, Side, SubgoalTarget, Tactic,
    TacticKind,
};

const INDENT: &str = "    ";

pub fn format_development(development: &Development) -> String {
    let mut out = String::new();
    let mut first = true;
    for item in &development.items {
        if !first {
            out.push('\n');
        }
        first = false;
        fmt_item(&mut out, item);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Canonical text of an expression. Two expressions are structurally equal
/// exactly when their canonical texts are equal.
pub fn format_expr(expr: &Expr) -> String {
    let mut out = String::new();
    fmt_expr(&mut out, 0, expr, Prec::Lowest);
    out
}

pub fn format_prop(prop: &Prop) -> String {
    let mut out = String::new();
    fmt_prop(&mut out, prop, PropPrec::Lowest);
    out
}

pub fn format_bounds(bounds: &Bounds) -> String {
    let mut out = String::new();
    fmt_bounds(&mut out, bounds, BoundsPrec::Lowest);
    out
}

fn fmt_item(out: &mut String, item: &Item) {
    match item {
        Item::Import(s) => {
            out.push_str("import ");
            out.push_str(&s.module_name());
            out.push_str(";\n");
        }
        Item::Const(s) => {
            out.push_str("const ");
            out.push_str(&s.name.node);
            if let Some(ty) = s.ty {
                out.push_str(": ");
                out.push_str(ty.keyword());
            }
            out.push_str(";\n");
        }
        Item::Function(s) => {
            if s.pure {
                out.push_str("pure ");
            }
            if s.is_static {
                out.push_str("static ");
            }
            out.push_str("function ");
            out.push_str(&s.name.node);
            fmt_params(out, &s.params);
            if let Some(ty) = s.ret {
                out.push_str(": ");
                out.push_str(ty.keyword());
            }
            match &s.body {
                Some(body) => {
                    out.push(' ');
                    fmt_block(out, 0, body);
                    out.push('\n');
                }
                None => out.push_str(";\n"),
            }
        }
        Item::Axiom(s) => {
            out.push_str("axiom ");
            fmt_prop(out, &s.prop, PropPrec::Lowest);
            out.push_str(";\n");
        }
        Item::Theorem(s) => {
            out.push_str("theorem ");
            fmt_fact(out, &s.fact);
            out.push(' ');
            fmt_tactic_block(out, 0, &s.proof);
            out.push('\n');
        }
        Item::Assume(s) => {
            out.push_str("assume ");
            fmt_fact(out, s);
            out.push_str(";\n");
        }
    }
}

fn fmt_fact(out: &mut String, fact: &FactDecl) {
    out.push_str(&fact.name.node);
    fmt_params(out, &fact.params);
    out.push_str(": ");
    fmt_expr(out, 0, &fact.left, Prec::Assign);
    out.push(' ');
    fmt_distance(out, fact.bound.as_ref());
    out.push(' ');
    fmt_expr(out, 0, &fact.right, Prec::Assign);
}

fn fmt_distance(out: &mut String, bound: Option<&Bounds>) {
    out.push('~');
    if let Some(b) = bound {
        out.push('[');
        fmt_bounds(out, b, BoundsPrec::Lowest);
        out.push(']');
    }
}

fn fmt_params(out: &mut String, params: &[FormalParam]) {
    out.push('(');
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&p.name.node);
        if let Some(ty) = p.ty {
            out.push_str(": ");
            out.push_str(ty.keyword());
        }
    }
    out.push(')');
}

fn fmt_idents(out: &mut String, ids: &[Ident]) {
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&id.node);
    }
}

fn fmt_tactic_block(out: &mut String, indent: usize, tactics: &[Tactic]) {
    out.push_str("{\n");
    for t in tactics {
        indent_line(out, indent + 1);
        fmt_tactic(out, indent + 1, t);
        out.push('\n');
    }
    indent_line(out, indent);
    out.push('}');
}

fn fmt_tactic(out: &mut String, indent: usize, tactic: &Tactic) {
    match &tactic.kind {
        TacticKind::Subgoal(s) => {
            fmt_distance(out, s.bound.as_ref());
            out.push(' ');
            match &s.target {
                SubgoalTarget::Expr(e) => fmt_expr(out, indent, e, Prec::Assign),
                SubgoalTarget::Rewrite(terms) => {
                    out.push_str("with");
                    for term in terms {
                        out.push(' ');
                        match term {
                            RewriteTerm::New { params, .. } => {
                                out.push_str("new");
                                fmt_new_params(out, indent, params);
                            }
                            RewriteTerm::Method(m) => fmt_method(out, indent, m),
                        }
                    }
                }
            }
            out.push(' ');
            fmt_tactic_block(out, indent, &s.proof);
        }
        TacticKind::Symmetry => out.push_str("symmetry;"),
        TacticKind::Admit => out.push_str("admit;"),
        TacticKind::Trivial => out.push_str("trivial;"),
        TacticKind::Auto => out.push_str("auto;"),
        TacticKind::Bisim(None) => out.push_str("bisim;"),
        TacticKind::Bisim(Some(props)) => {
            out.push_str("bisim {\n");
            for p in props {
                indent_line(out, indent + 1);
                fmt_bisim_prop(out, p);
                out.push('\n');
            }
            indent_line(out, indent);
            out.push('}');
        }
        TacticKind::Rewrite(fact) => {
            out.push_str("rewrite ");
            out.push_str(&fact.node);
            out.push(';');
        }
        TacticKind::Hybrid { fact, start, end } => {
            out.push_str("hybrid(");
            out.push_str(&fact.node);
            out.push_str(", ");
            fmt_bounds(out, start, BoundsPrec::Lowest);
            out.push_str(", ");
            fmt_bounds(out, end, BoundsPrec::Lowest);
            out.push_str(");");
        }
        TacticKind::Unfold(ids) | TacticKind::Inline(ids) => {
            out.push_str(if matches!(tactic.kind, TacticKind::Unfold(_)) {
                "unfold"
            } else {
                "inline"
            });
            if !ids.is_empty() {
                out.push(' ');
                fmt_idents(out, ids);
            }
            out.push(';');
        }
    }
}

fn fmt_bisim_prop(out: &mut String, p: &BisimProp) {
    for (i, scope) in p.scopes.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match scope {
            BisimScope::Invariant => out.push_str("invariant"),
            BisimScope::Checkpoint { left, right } => {
                out.push_str("checkpoint(");
                out.push_str(&left.node);
                out.push_str(", ");
                out.push_str(&right.node);
                out.push(')');
            }
        }
    }
    if !p.scopes.is_empty() {
        out.push_str(": ");
    }
    fmt_prop(out, &p.prop, PropPrec::Lowest);
    out.push(';');
}

// -------------------------------------------------------------------------
// Expressions
// -------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Lowest,
    Assign,
    Ternary,
    Or,
    And,
    Not,
    Cmp,
    Add,
    Mul,
    Postfix,
}

fn needs_parens<P: Ord>(parent: P, child: P) -> bool {
    child < parent
}

fn fmt_expr(out: &mut String, indent: usize, expr: &Expr, parent_prec: Prec) {
    let my = expr_prec(expr);
    let parens = needs_parens(parent_prec, my);
    if parens {
        out.push('(');
    }
    match &expr.kind {
        ExprKind::Int(n) => out.push_str(&n.to_string()),
        ExprKind::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        ExprKind::Lookup(id) => out.push_str(&id.node),
        ExprKind::Paren { label, expr } => {
            if let Some(label) = label {
                out.push_str(&label.node);
                out.push('@');
            }
            out.push('(');
            fmt_expr(out, indent, expr, Prec::Lowest);
            out.push(')');
        }
        ExprKind::Seq { head, tail } => {
            fmt_expr(out, indent, head, Prec::Assign);
            out.push_str("; ");
            fmt_expr(out, indent, tail, Prec::Lowest);
        }
        ExprKind::Assign { target, value } => {
            out.push_str(&target.node);
            out.push_str(" = ");
            fmt_expr(out, indent, value, Prec::Assign);
        }
        ExprKind::Ternary {
            cond,
            then,
            otherwise,
        } => {
            fmt_expr(out, indent, cond, Prec::Or);
            out.push_str(" ? ");
            fmt_expr(out, indent, then, Prec::Assign);
            out.push_str(" : ");
            fmt_expr(out, indent, otherwise, Prec::Assign);
        }
        ExprKind::Logic { left, op, right } => {
            let (sym, right_prec) = match op {
                LogicOp::Or => ("|", Prec::And),
                LogicOp::And => ("&", Prec::Not),
            };
            fmt_expr(out, indent, left, my);
            out.push(' ');
            out.push_str(sym);
            out.push(' ');
            fmt_expr(out, indent, right, right_prec);
        }
        ExprKind::Not(inner) => {
            out.push('!');
            fmt_expr(out, indent, inner, Prec::Not);
        }
        ExprKind::Compare { left, op, right } => {
            fmt_expr(out, indent, left, Prec::Add);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            fmt_expr(out, indent, right, Prec::Add);
        }
        ExprKind::Arith { left, op, right } => {
            let right_prec = if op.is_additive() {
                Prec::Mul
            } else {
                Prec::Postfix
            };
            fmt_expr(out, indent, left, my);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            fmt_expr(out, indent, right, right_prec);
        }
        ExprKind::Call { name, args } => {
            out.push_str(&name.node);
            fmt_args(out, indent, args);
        }
        ExprKind::Invoke {
            target,
            method,
            classes,
            args,
        } => {
            fmt_expr(out, indent, target, Prec::Postfix);
            out.push('.');
            out.push_str(&method.node);
            if !classes.is_empty() {
                out.push('<');
                fmt_idents(out, classes);
                out.push('>');
            }
            fmt_args(out, indent, args);
        }
        ExprKind::New(new) => fmt_new(out, indent, new),
        ExprKind::Index { map, index } => {
            fmt_expr(out, indent, map, Prec::Postfix);
            out.push('[');
            fmt_expr(out, indent, index, Prec::Assign);
            out.push(']');
        }
        ExprKind::Update { map, index, value } => {
            fmt_expr(out, indent, map, Prec::Postfix);
            out.push('[');
            fmt_expr(out, indent, index, Prec::Assign);
            out.push_str(" := ");
            fmt_expr(out, indent, value, Prec::Assign);
            out.push(']');
        }
        ExprKind::Ref(inner) => {
            out.push_str("ref(");
            fmt_expr(out, indent, inner, Prec::Lowest);
            out.push(')');
        }
        ExprKind::Tobits(inner) => {
            out.push_str("tobits(");
            fmt_expr(out, indent, inner, Prec::Lowest);
            out.push(')');
        }
        ExprKind::Assert(p) => {
            out.push_str("assert(");
            fmt_prop(out, p, PropPrec::Lowest);
            out.push(')');
        }
        ExprKind::Admit(p) => {
            out.push_str("admit(");
            fmt_prop(out, p, PropPrec::Lowest);
            out.push(')');
        }
        ExprKind::Ellipsis => out.push_str("..."),
        ExprKind::Hole => out.push_str("[]"),
    }
    if parens {
        out.push(')');
    }
}

fn expr_prec(expr: &Expr) -> Prec {
    match &expr.kind {
        ExprKind::Seq { .. } => Prec::Lowest,
        ExprKind::Assign { .. } => Prec::Assign,
        ExprKind::Ternary { .. } => Prec::Ternary,
        ExprKind::Logic {
            op: LogicOp::Or, ..
        } => Prec::Or,
        ExprKind::Logic {
            op: LogicOp::And, ..
        } => Prec::And,
        ExprKind::Not(_) => Prec::Not,
        ExprKind::Compare { .. } => Prec::Cmp,
        ExprKind::Arith { op, .. } if op.is_additive() => Prec::Add,
        ExprKind::Arith { .. } => Prec::Mul,
        _ => Prec::Postfix,
    }
}

fn fmt_args(out: &mut String, indent: usize, args: &[Expr]) {
    out.push('(');
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        fmt_expr(out, indent, a, Prec::Assign);
    }
    out.push(')');
}

fn fmt_new(out: &mut String, indent: usize, new: &NewExpr) {
    out.push_str("new ");
    if let Some(class) = &new.class {
        out.push_str(&class.node);
    }
    fmt_new_params(out, indent, &new.params);
    if new.methods.is_empty() {
        out.push_str(" {}");
        return;
    }
    out.push_str(" {\n");
    for m in &new.methods {
        indent_line(out, indent + 1);
        fmt_method(out, indent + 1, m);
        out.push('\n');
    }
    indent_line(out, indent);
    out.push('}');
}

fn fmt_new_params(out: &mut String, indent: usize, params: &[NewParam]) {
    out.push('(');
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&p.name.node);
        out.push_str(" = ");
        fmt_expr(out, indent, &p.value, Prec::Assign);
    }
    out.push(')');
}

fn fmt_method(out: &mut String, indent: usize, m: &MethodDef) {
    out.push_str("method ");
    out.push_str(&m.name.node);
    fmt_params(out, &m.params);
    out.push(' ');
    fmt_block(out, indent, &m.body);
}

/// `{ ... }` with one sequence element per line.
fn fmt_block(out: &mut String, indent: usize, body: &Expr) {
    out.push_str("{\n");
    let mut cur = body;
    loop {
        indent_line(out, indent + 1);
        match &cur.kind {
            ExprKind::Seq { head, tail } => {
                fmt_expr(out, indent + 1, head, Prec::Assign);
                out.push_str(";\n");
                cur = tail;
            }
            _ => {
                fmt_expr(out, indent + 1, cur, Prec::Assign);
                out.push('\n');
                break;
            }
        }
    }
    indent_line(out, indent);
    out.push('}');
}

fn indent_line(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push_str(INDENT);
    }
}

// -------------------------------------------------------------------------
// Bounds
// -------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum BoundsPrec {
    Lowest,
    Mul,
    Pow,
    Primary,
}

fn fmt_bounds(out: &mut String, bounds: &Bounds, parent_prec: BoundsPrec) {
    match &bounds.kind {
        BoundsKind::Int(n) => out.push_str(&n.to_string()),
        BoundsKind::Lookup(id) => out.push_str(&id.node),
        BoundsKind::Paren(inner) => {
            out.push('(');
            fmt_bounds(out, inner, BoundsPrec::Lowest);
            out.push(')');
        }
        BoundsKind::Call { name, args } => {
            out.push_str(&name.node);
            out.push('(');
            for (i, a) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                fmt_bounds(out, a, BoundsPrec::Lowest);
            }
            out.push(')');
        }
        BoundsKind::Env(contexts) => {
            out.push_str("env");
            for c in contexts {
                out.push_str(" (");
                fmt_expr(out, 0, c, Prec::Lowest);
                out.push(')');
            }
        }
        BoundsKind::Binary { left, op, right } => {
            let (my, left_prec, right_prec) = match op {
                BoundsOp::Add | BoundsOp::Sub => {
                    (BoundsPrec::Lowest, BoundsPrec::Lowest, BoundsPrec::Mul)
                }
                BoundsOp::Mul | BoundsOp::Div => (BoundsPrec::Mul, BoundsPrec::Mul, BoundsPrec::Pow),
                BoundsOp::Pow => (BoundsPrec::Pow, BoundsPrec::Primary, BoundsPrec::Pow),
            };
            let parens = needs_parens(parent_prec, my);
            if parens {
                out.push('(');
            }
            fmt_bounds(out, left, left_prec);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            fmt_bounds(out, right, right_prec);
            if parens {
                out.push(')');
            }
        }
    }
}

// -------------------------------------------------------------------------
// Props
// -------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum PropPrec {
    Lowest,
    Implies,
    Or,
    And,
    Not,
    Cmp,
    Add,
    Mul,
    Postfix,
}

fn prop_prec(prop: &Prop) -> PropPrec {
    match &prop.kind {
        PropKind::Quant { .. } => PropPrec::Lowest,
        PropKind::Logic { op, .. } => match op {
            PropLogicOp::Implies => PropPrec::Implies,
            PropLogicOp::Or => PropPrec::Or,
            PropLogicOp::And => PropPrec::And,
        },
        PropKind::Not(_) => PropPrec::Not,
        PropKind::Compare { .. } => PropPrec::Cmp,
        PropKind::Arith { op, .. } if op.is_additive() => PropPrec::Add,
        PropKind::Arith { .. } => PropPrec::Mul,
        _ => PropPrec::Postfix,
    }
}

fn fmt_prop(out: &mut String, prop: &Prop, parent_prec: PropPrec) {
    let my = prop_prec(prop);
    let parens = needs_parens(parent_prec, my);
    if parens {
        out.push('(');
    }
    match &prop.kind {
        PropKind::Int(n) => out.push_str(&n.to_string()),
        PropKind::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        PropKind::Lookup(id) => out.push_str(&id.node),
        PropKind::Paren(inner) => {
            out.push('(');
            fmt_prop(out, inner, PropPrec::Lowest);
            out.push(')');
        }
        PropKind::Quant {
            quantifier,
            params,
            body,
        } => {
            out.push_str(match quantifier {
                Quantifier::Forall => "forall ",
                Quantifier::Exists => "exists ",
            });
            fmt_params(out, params);
            out.push_str(". ");
            fmt_prop(out, body, PropPrec::Lowest);
        }
        PropKind::Logic { left, op, right } => {
            let (sym, left_prec, right_prec) = match op {
                PropLogicOp::Implies => ("->", PropPrec::Or, PropPrec::Lowest),
                PropLogicOp::Or => ("||", PropPrec::Or, PropPrec::And),
                PropLogicOp::And => ("&&", PropPrec::And, PropPrec::Not),
            };
            fmt_prop(out, left, left_prec);
            out.push(' ');
            out.push_str(sym);
            out.push(' ');
            fmt_prop(out, right, right_prec);
        }
        PropKind::Not(inner) => {
            out.push('!');
            fmt_prop(out, inner, PropPrec::Not);
        }
        PropKind::Compare { left, op, right } => {
            fmt_prop(out, left, PropPrec::Add);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            fmt_prop(out, right, PropPrec::Add);
        }
        PropKind::Arith { left, op, right } => {
            let right_prec = if op.is_additive() {
                PropPrec::Mul
            } else {
                PropPrec::Postfix
            };
            fmt_prop(out, left, my);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            fmt_prop(out, right, right_prec);
        }
        PropKind::Call { name, args } => {
            out.push_str(&name.node);
            fmt_prop_args(out, args);
        }
        PropKind::Index { map, index } => {
            fmt_prop(out, map, PropPrec::Postfix);
            out.push('[');
            fmt_prop(out, index, PropPrec::Lowest);
            out.push(']');
        }
        PropKind::Update { map, index, value } => {
            fmt_prop(out, map, PropPrec::Postfix);
            out.push('[');
            fmt_prop(out, index, PropPrec::Lowest);
            out.push_str(" := ");
            fmt_prop(out, value, PropPrec::Lowest);
            out.push(']');
        }
        PropKind::Tobits(inner) => {
            out.push_str("tobits(");
            fmt_prop(out, inner, PropPrec::Lowest);
            out.push(')');
        }
        PropKind::IsBits(inner) => {
            out.push_str("isbits(");
            fmt_prop(out, inner, PropPrec::Lowest);
            out.push(')');
        }
        PropKind::Env(contexts) => {
            out.push_str("env");
            for c in contexts {
                out.push_str(" (");
                fmt_expr(out, 0, c, Prec::Lowest);
                out.push(')');
            }
        }
        PropKind::SameObject(a, b) => {
            out.push_str("same(");
            fmt_object(out, a);
            out.push_str(", ");
            fmt_object(out, b);
            out.push(')');
        }
        PropKind::Independence { heap, left, right } => {
            out.push_str("independence(");
            fmt_heap(out, heap);
            out.push_str(", ");
            fmt_prop(out, left, PropPrec::Lowest);
            out.push_str(", ");
            fmt_prop(out, right, PropPrec::Lowest);
            out.push(')');
        }
        PropKind::ObjectIs { object, class } => {
            fmt_object(out, object);
            out.push_str(" is ");
            match class {
                ClassRef::Named(c) => out.push_str(&c.node),
                ClassRef::Invalid => out.push_str("invalid"),
            }
        }
        PropKind::Field { object, field } => {
            fmt_object(out, object);
            out.push('.');
            out.push_str(&field.node);
        }
        PropKind::FrameAll => out.push_str("frame"),
        PropKind::Frame { left, right } => {
            out.push_str("frame");
            fmt_prop_args(out, [left.as_ref(), right.as_ref()]);
        }
        PropKind::FrameHeap {
            left_heap,
            right_heap,
            left,
            right,
        } => {
            out.push_str("frame_heap(");
            fmt_heap(out, left_heap);
            out.push_str(", ");
            fmt_heap(out, right_heap);
            out.push_str(", ");
            fmt_prop(out, left, PropPrec::Lowest);
            out.push_str(", ");
            fmt_prop(out, right, PropPrec::Lowest);
            out.push(')');
        }
        PropKind::FieldsEqual => out.push_str("fields_equal"),
        PropKind::FieldsEqualExcept(fields) => {
            out.push_str("fields_equal_except(");
            fmt_idents(out, fields);
            out.push(')');
        }
    }
    if parens {
        out.push(')');
    }
}

fn fmt_prop_args<'p>(out: &mut String, args: impl IntoIterator<Item = &'p Prop>) {
    out.push('(');
    for (i, a) in args.into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        fmt_prop(out, a, PropPrec::Lowest);
    }
    out.push(')');
}

fn fmt_side(out: &mut String, side: Side) {
    out.push_str(match side {
        Side::Left => "left",
        Side::Right => "right",
    });
}

fn fmt_object(out: &mut String, object: &ObjectProp) {
    match object {
        ObjectProp::Side(side) => fmt_side(out, *side),
        ObjectProp::FromHeap { heap, reference } => {
            out.push_str("object(");
            fmt_heap(out, heap);
            out.push_str(", ");
            fmt_prop(out, reference, PropPrec::Lowest);
            out.push(')');
        }
    }
}

fn fmt_heap(out: &mut String, heap: &HeapProp) {
    match heap {
        HeapProp::Side(side) => {
            out.push_str("heap(");
            fmt_side(out, *side);
            out.push(')');
        }
        HeapProp::FromHeap { heap, reference } => {
            out.push_str("from_heap(");
            fmt_heap(out, heap);
            out.push_str(", ");
            fmt_prop(out, reference, PropPrec::Lowest);
            out.push(')');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_idempotent(src: &str) {
        let development = crate::parse_source(src).unwrap();
        let formatted1 = format_development(&development);
        let development2 = crate::parse_source(&formatted1).unwrap();
        let formatted2 = format_development(&development2);
        assert_eq!(formatted1, formatted2);
    }

    #[test]
    fn fmt_roundtrip_declarations() {
        is_idempotent(
            "import crypto.prf;\nconst k: bits;\npure function xor(a, b): bits;\nfunction enc(m) { e = m; e }\naxiom forall (x). xor(x, x) == 0;\n",
        );
    }

    #[test]
    fn fmt_roundtrip_theorem() {
        is_idempotent(
            "theorem T(e): new (x = e) { method get() { x } } ~[adv * 2] new (y = e) { method get() { y } } {\n  ~ new (x = e) { method get() { x; } } { trivial; }\n  bisim { invariant: left.x == right.y; }\n}\n",
        );
    }

    #[test]
    fn fmt_inserts_needed_parens() {
        let expr = crate::parse_expr("(a + b) * c").unwrap();
        let ExprKind::Arith { left, .. } = &expr.kind else {
            panic!("expected arithmetic");
        };
        // Strip the source paren; the formatter must restore grouping.
        let ExprKind::Paren { expr: inner, .. } = &left.kind else {
            panic!("expected paren");
        };
        let rebuilt = Expr::synthetic(ExprKind::Arith {
            left: inner.clone(),
            op: quivela_ast::ArithOp::Mul,
            right: Box::new(Expr::lookup("c")),
        });
        assert_eq!(format_expr(&rebuilt), "(a + b) * c");
    }

    #[test]
    fn fmt_block_puts_sequence_on_lines() {
        let src = "function f(x) { a = x; b = a; b }";
        let out = format_development(&crate::parse_source(src).unwrap());
        assert_eq!(out, "function f(x) {\n    a = x;\n    b = a;\n    b\n}\n");
    }

    #[test]
    fn fmt_right_nested_bounds_pow() {
        let b = crate::parse_bounds("2 ^ 3 ^ q + e * (n - 1)").unwrap();
        assert_eq!(format_bounds(&b), "2 ^ 3 ^ q + e * (n - 1)");
    }
}
