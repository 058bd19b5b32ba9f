use quivela_ast::{
    BisimScope, BoundsKind, ClassRef, CmpOp, ExprKind, HeapProp, Item, ObjectProp, PropKind,
    RewriteTerm, Side, SubgoalTarget, TacticKind,
};
use quivela_parse::{format_expr, parse_development, parse_expr, parse_prop, parse_source};

fn theorem_tactics(src: &str) -> Vec<TacticKind> {
    let dev = parse_source(src).expect("theorem should parse");
    let Some(Item::Theorem(thm)) = dev.items.into_iter().last() else {
        panic!("expected a theorem");
    };
    thm.proof.into_iter().map(|t| t.kind).collect()
}

#[test]
fn chained_comparisons_are_rejected() {
    let err = parse_expr("a < b < c").expect_err("expected parse error");
    let msg = err.to_string();
    assert!(
        msg.contains("chained comparisons"),
        "unexpected error message: {msg}"
    );
}

#[test]
fn declarations_parse() {
    let src = r#"
import crypto.prf;
const k: bits;
const n;
pure function xor(a, b): bits;
static function log(m);
function enc(m: bits) { c = xor(k, m); c }
axiom forall (x). xor(x, x) == 0;
assume Prf(): new (k = k) { method f(x) { prf(k, x) } } ~[adv] new () { method f(x) { rand(x) } };
"#;
    let dev = parse_source(src).expect("declarations should parse");
    assert_eq!(dev.items.len(), 8);
    let Item::Import(import) = &dev.items[0] else {
        panic!("expected import");
    };
    assert_eq!(import.module_name(), "crypto.prf");
    let Item::Function(xor) = &dev.items[3] else {
        panic!("expected function");
    };
    assert!(xor.pure && !xor.is_static && xor.body.is_none());
    let Item::Function(log) = &dev.items[4] else {
        panic!("expected function");
    };
    assert!(log.is_static && !log.pure);
    let Item::Assume(fact) = &dev.items[7] else {
        panic!("expected assumption");
    };
    assert!(matches!(
        fact.bound.as_ref().map(|b| &b.kind),
        Some(BoundsKind::Lookup(id)) if id.node == "adv"
    ));
}

#[test]
fn expression_precedence() {
    let expr = parse_expr("x = a | b & !c == d + e * f").unwrap();
    assert_eq!(format_expr(&expr), "x = a | b & !c == d + e * f");
    let ExprKind::Assign { value, .. } = &expr.kind else {
        panic!("expected assignment");
    };
    assert!(matches!(value.kind, ExprKind::Logic { .. }));
}

#[test]
fn sequence_is_right_nested() {
    let expr = parse_expr("a = 1; b = 2; a").unwrap();
    let ExprKind::Seq { tail, .. } = &expr.kind else {
        panic!("expected sequence");
    };
    assert!(matches!(tail.kind, ExprKind::Seq { .. }));
}

#[test]
fn invocation_with_class_hints() {
    let expr = parse_expr("o.enc<Enc, Dec>(m)[0]").unwrap();
    let ExprKind::Index { map, .. } = &expr.kind else {
        panic!("expected index");
    };
    let ExprKind::Invoke {
        method, classes, ..
    } = &map.kind
    else {
        panic!("expected invocation");
    };
    assert_eq!(method.node, "enc");
    assert_eq!(classes.len(), 2);
}

#[test]
fn map_update_and_labels() {
    let expr = parse_expr("L@(m[k := v])").unwrap();
    let ExprKind::Paren {
        label: Some(label),
        expr,
    } = &expr.kind
    else {
        panic!("expected labelled expression");
    };
    assert_eq!(label.node, "L");
    assert!(matches!(expr.kind, ExprKind::Update { .. }));
}

#[test]
fn new_with_class_and_empty_method() {
    let expr = parse_expr("new Cell(v = 0) { method get() { v } method noop() {} }").unwrap();
    let new = expr.as_new().expect("new expression");
    assert_eq!(new.class.as_ref().map(|c| c.node.as_str()), Some("Cell"));
    assert_eq!(new.methods.len(), 2);
    assert!(matches!(new.methods[1].body.kind, ExprKind::Int(0)));
}

#[test]
fn opaque_equality_only_in_props() {
    let prop = parse_prop("x = y").unwrap();
    assert!(matches!(
        prop.kind,
        PropKind::Compare {
            op: CmpOp::Same,
            ..
        }
    ));
    // In expressions `=` is assignment.
    let expr = parse_expr("x = y").unwrap();
    assert!(matches!(expr.kind, ExprKind::Assign { .. }));
}

#[test]
fn object_and_heap_props() {
    let prop = parse_prop(
        "left is Enc && object(from_heap(heap(left), left.r), left.r) is invalid -> same(left, right)",
    )
    .unwrap();
    let PropKind::Logic { left, .. } = &prop.kind else {
        panic!("expected implication");
    };
    let PropKind::Logic { left: is_enc, right: is_invalid, .. } = &left.kind else {
        panic!("expected conjunction");
    };
    assert!(matches!(
        &is_enc.kind,
        PropKind::ObjectIs { object: ObjectProp::Side(Side::Left), class: ClassRef::Named(c) } if c.node == "Enc"
    ));
    let PropKind::ObjectIs {
        object: ObjectProp::FromHeap { heap, .. },
        class: ClassRef::Invalid,
    } = &is_invalid.kind
    else {
        panic!("expected object from heap");
    };
    assert!(matches!(heap.as_ref(), HeapProp::FromHeap { .. }));
}

#[test]
fn frame_forms() {
    assert!(matches!(parse_prop("frame").unwrap().kind, PropKind::FrameAll));
    assert!(matches!(
        parse_prop("frame(left.o, right.o)").unwrap().kind,
        PropKind::Frame { .. }
    ));
    assert!(matches!(
        parse_prop("fields_equal_except(a, b)").unwrap().kind,
        PropKind::FieldsEqualExcept(ref f) if f.len() == 2
    ));
}

#[test]
fn tactics_parse() {
    let src = r#"
theorem T(m): a ~[2 * adv] b {
    ~[adv] c {
        rewrite F;
        auto;
    }
    ~ with new(k = 0) method f(x) { ...; x } {
        admit;
    }
    hybrid(Step, 0, n);
    unfold;
    inline f, g;
    symmetry;
    bisim {
        invariant, checkpoint(L1, R1): left.k == right.k;
        fields_equal;
    }
    trivial;
}
"#;
    let tactics = theorem_tactics(src);
    assert_eq!(tactics.len(), 8);
    let TacticKind::Subgoal(first) = &tactics[0] else {
        panic!("expected subgoal");
    };
    assert!(first.bound.is_some());
    assert_eq!(first.proof.len(), 2);
    let TacticKind::Subgoal(second) = &tactics[1] else {
        panic!("expected subgoal");
    };
    assert!(second.bound.is_none());
    let SubgoalTarget::Rewrite(terms) = &second.target else {
        panic!("expected rewrite target");
    };
    assert!(matches!(terms[0], RewriteTerm::New { .. }));
    assert!(matches!(terms[1], RewriteTerm::Method(_)));
    assert!(matches!(&tactics[3], TacticKind::Unfold(ids) if ids.is_empty()));
    assert!(matches!(&tactics[4], TacticKind::Inline(ids) if ids.len() == 2));
    let TacticKind::Bisim(Some(props)) = &tactics[6] else {
        panic!("expected bisim");
    };
    assert_eq!(props.len(), 2);
    assert_eq!(props[0].scopes.len(), 2);
    assert!(matches!(
        &props[0].scopes[1],
        BisimScope::Checkpoint { left, right } if left.node == "L1" && right.node == "R1"
    ));
    assert!(props[1].scopes.is_empty());
}

#[test]
fn bare_bisim_and_tilde_without_bound() {
    let tactics = theorem_tactics("theorem T(): x ~ x { bisim; }");
    assert!(matches!(&tactics[0], TacticKind::Bisim(None)));
    let tactics = theorem_tactics("theorem T(): x ~ x { bisim { } }");
    assert!(matches!(&tactics[0], TacticKind::Bisim(Some(p)) if p.is_empty()));
}

#[test]
fn unknown_type_is_reported() {
    let err = parse_development("const x: float;").expect_err("expected parse error");
    assert!(
        err.message.contains("unknown type"),
        "unexpected error message: {}",
        err.message
    );
    assert_eq!(err.span.offset(), 9);
}

#[test]
fn missing_tactic_terminator_is_reported() {
    let err = parse_development("theorem T(): x ~ x { auto }").expect_err("expected parse error");
    assert!(
        err.message.contains("Semi"),
        "unexpected error message: {}",
        err.message
    );
}
