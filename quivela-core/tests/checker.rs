use std::fs;

use quivela_core::{CheckOptions, Checker, ProofRequest, RecordingBackend, SourceFile};

fn check(src: &str) -> Result<Vec<ProofRequest>, String> {
    let mut checker = Checker::new(RecordingBackend::new());
    checker
        .check_source(SourceFile::new("test.qvl", src))
        .map_err(|e| e.message())?;
    Ok(checker.into_backend().requests)
}

fn bounds_checks(requests: &[ProofRequest]) -> Vec<(String, String)> {
    requests
        .iter()
        .filter_map(|r| match r {
            ProofRequest::Bounds {
                actual, required, ..
            } => Some((actual.clone(), required.clone())),
            _ => None,
        })
        .collect()
}

#[test]
fn subgoal_distances_add_up() {
    let src = r#"
const a;
const b;
const c;
theorem T(): a ~[adv1 + adv2] c {
    ~[adv1] b {
        admit;
    }
    ~[adv2] c {
        admit;
    }
}
"#;
    let requests = check(src).unwrap();
    assert_eq!(
        bounds_checks(&requests),
        vec![
            ("0".to_string(), "adv1".to_string()),
            ("0".to_string(), "adv2".to_string()),
            ("adv1 + adv2".to_string(), "adv1 + adv2".to_string()),
        ]
    );
}

#[test]
fn proof_must_close_the_goal() {
    let src = r#"
const a;
const b;
theorem T(): a ~ b {
    symmetry;
}
"#;
    assert_eq!(check(src).unwrap_err(), "b\n != \na");
}

#[test]
fn failed_theorems_leave_no_obligations_behind() {
    let mut checker = Checker::new(RecordingBackend::new());
    let open = "const a; const b; theorem Open(): a ~ b { symmetry; }";
    let err = checker
        .check_source(SourceFile::new("open.qvl", open))
        .unwrap_err();
    assert_eq!(err.message(), "b\n != \na");
    assert_eq!(checker.pending_obligations(), 0);

    let nested = "const c; const d; theorem Nested(): c ~ d { ~ d { symmetry; } }";
    checker
        .check_source(SourceFile::new("nested.qvl", nested))
        .unwrap_err();
    assert_eq!(checker.pending_obligations(), 0);

    let next = "theorem Next(): 1 ~ 1 { trivial; }";
    checker
        .check_source(SourceFile::new("next.qvl", next))
        .unwrap();
    assert_eq!(checker.pending_obligations(), 0);
    assert!(checker.context().theorems.contains_key("Next"));
    assert!(!checker.context().theorems.contains_key("Open"));
}

#[test]
fn undeclared_names_are_reported() {
    let err = check("theorem T(): a ~ a { trivial; }").unwrap_err();
    assert_eq!(err, "a not declared.");
    let err = check("const a; theorem T(): g(a) ~ g(a) { trivial; }").unwrap_err();
    assert_eq!(err, "Function not declared: g");
    let err = check("const a; const a;").unwrap_err();
    assert_eq!(err, "a already declared.");
}

#[test]
fn constants_cannot_be_assigned() {
    let err = check("const k; function f() { k = 1; k }").unwrap_err();
    assert_eq!(err, "k is constant.");
}

#[test]
fn rewrite_charges_every_site() {
    let src = r#"
const k;
function enc(key, m);
function rand(m);
assume Cpa(m): enc(k, m) ~[adv + env] rand(m);
theorem T(a, b): enc(k, a) + enc(k, b) ~[adv + adv] rand(a) + rand(b) {
    rewrite Cpa;
}
"#;
    let requests = check(src).unwrap();
    let checks = bounds_checks(&requests);
    assert_eq!(checks.len(), 1);
    let (actual, required) = &checks[0];
    assert_eq!(required, "adv + adv");
    assert!(actual.contains("env ([] + enc(k, b))"), "{actual}");
    assert!(actual.contains("env (rand(a) + [])"), "{actual}");
}

#[test]
fn rewrite_needs_a_match() {
    let src = r#"
const a;
function f(x);
function g(x);
assume F(x): f(x) ~ g(x);
theorem T(): a ~ a {
    rewrite F;
}
"#;
    assert_eq!(check(src).unwrap_err(), "Nothing to rewrite");
}

#[test]
fn hybrid_argument_steps_the_parameter() {
    let src = r#"
const n;
function f(x);
assume Step(x): f(x) ~[adv] f(x + 1);
theorem T(): f(0) ~[(n - 0) * adv] f(n) {
    hybrid(Step, 0, n);
}
"#;
    let requests = check(src).unwrap();
    assert_eq!(
        bounds_checks(&requests),
        vec![("(n - 0) * adv".to_string(), "(n - 0) * adv".to_string())]
    );
}

#[test]
fn hybrid_rejects_parameter_in_distance() {
    let src = r#"
const n;
function f(x);
assume Step(x): f(x) ~[adv(x)] f(x + 1);
theorem T(): f(0) ~[n * adv] f(n) {
    hybrid(Step, 0, n);
}
"#;
    assert_eq!(
        check(src).unwrap_err(),
        "x may not appear in the distance of the hybrid fact."
    );
}

#[test]
fn hybrid_requires_successor_on_the_right() {
    let src = r#"
const n;
function f(x);
assume Step(x): f(x) ~[adv] f(x);
theorem T(): f(0) ~ f(n) {
    hybrid(Step, 0, n);
}
"#;
    assert_eq!(
        check(src).unwrap_err(),
        "The parameter of the right hybrid fact expression must be x + 1"
    );
}

#[test]
fn unfold_keeps_duplicating_bodies_folded() {
    let src = r#"
const a;
function twice(p) { p | p }
function inc(p) { p + 1 }
theorem T(): twice(inc(a)) ~ twice(a + 1) {
    unfold;
    trivial;
}
"#;
    let requests = check(src).unwrap();
    assert_eq!(
        requests[0],
        ProofRequest::Auto {
            left: "twice(inc(a))".to_string(),
            right: "twice(a + 1)".to_string(),
            message: "Checking unfold equivalence".to_string(),
            location: "test.qvl(6:5)".to_string(),
        }
    );
}

#[test]
fn unfold_closes_when_the_folded_sides_already_agree() {
    let src = r#"
const a;
function twice(p) { p | p }
theorem T(): twice(a) ~ twice(a) {
    unfold;
    trivial;
}
theorem U(): twice(a) ~ twice(a) {
    unfold twice;
    auto;
}
"#;
    let mut checker = Checker::new(RecordingBackend::new());
    checker
        .check_source(SourceFile::new("test.qvl", src))
        .unwrap();
    assert_eq!(checker.pending_obligations(), 0);

    let requests = checker.into_backend().requests;
    let autos: Vec<_> = requests
        .iter()
        .filter_map(|r| match r {
            ProofRequest::Auto {
                left,
                right,
                message,
                ..
            } => Some((left.as_str(), right.as_str(), message.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(
        autos,
        [
            ("twice(a)", "twice(a)", "Checking unfold equivalence"),
            ("twice(a)", "twice(a)", "Checking unfold equivalence"),
            ("twice(a)", "twice(a)", "Checking auto"),
        ]
    );
    assert_eq!(
        bounds_checks(&requests),
        vec![
            ("0".to_string(), "0".to_string()),
            ("0".to_string(), "0".to_string()),
        ]
    );
}

#[test]
fn method_rewrite_fills_in_the_old_body() {
    let src = r#"
theorem T(): new (c = 0) { method f(x) { x } } ~ new (c = 0) { method f(x) { x; c } } {
    ~ with method f(x) { ...; c } {
        auto;
    }
}
"#;
    let requests = check(src).unwrap();
    let ProofRequest::Auto { left, right, .. } = &requests[0] else {
        panic!("expected auto request, got {requests:?}");
    };
    assert!(left.contains("        x\n"), "{left}");
    assert!(right.contains("x;\n        c\n"), "{right}");
}

#[test]
fn bisim_needs_objects() {
    let src = r#"
const a;
theorem T(): a ~ a {
    bisim;
}
"#;
    assert_eq!(check(src).unwrap_err(), "not a new expression: a");
}

#[test]
fn bare_bisim_differs_from_an_empty_block() {
    let src = r#"
theorem Bare(): new (x = 0) { method get() { x } } ~ new (y = 0) { method get() { y } } {
    bisim;
}
theorem Empty(): new (x = 0) { method get() { x } } ~ new (y = 0) { method get() { y } } {
    bisim { }
}
"#;
    let props: Vec<Option<usize>> = check(src)
        .unwrap()
        .into_iter()
        .filter_map(|r| match r {
            ProofRequest::Bisim { props, .. } => Some(props),
            _ => None,
        })
        .collect();
    assert_eq!(props, [None, Some(0)]);
}

#[test]
fn theorem_names_are_unique() {
    let src = r#"
const a;
theorem T(): a ~ a { trivial; }
theorem T(): a ~ a { trivial; }
"#;
    assert_eq!(
        check(src).unwrap_err(),
        "theorem identifier already declared: T"
    );
}

#[test]
fn imports_resolve_next_to_the_importing_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("lib.qvl"), "const k;\nfunction f(x);\n").unwrap();
    let main = dir.path().join("main.qvl");
    fs::write(&main, "import lib;\nimport lib;\ntheorem T(): f(k) ~ f(k) { trivial; }\n").unwrap();

    let mut checker = Checker::new(RecordingBackend::new());
    checker.check_file(&main).unwrap();
    assert!(checker.context().theorems.contains_key("T"));
}

#[test]
fn imports_use_search_paths() {
    let lib = tempfile::tempdir().unwrap();
    fs::create_dir(lib.path().join("crypto")).unwrap();
    fs::write(lib.path().join("crypto").join("prf.qvl"), "const k;\n").unwrap();
    let options = CheckOptions {
        search_paths: vec![lib.path().to_path_buf()],
    };
    let mut checker = Checker::with_options(RecordingBackend::new(), options);
    checker
        .check_source(SourceFile::new("main.qvl", "import crypto.prf;\nconst m;\n"))
        .unwrap();

    let mut checker = Checker::new(RecordingBackend::new());
    let err = checker
        .check_source(SourceFile::new("main.qvl", "import nope;\n"))
        .unwrap_err();
    assert_eq!(err.message(), "Unable to read file: nope.qvl");
}
