use quivela_core::{Checker, SourceFile};
use quivela_verify::task::{AUTO_PRIORITY, BISIM_PRIORITY, BOUNDS_PRIORITY};
use quivela_verify::{BoogieBackend, ProofTask};

fn tasks(src: &str) -> Result<Vec<ProofTask>, String> {
    let mut checker = Checker::new(BoogieBackend::new());
    checker
        .check_source(SourceFile::new("test.qvl", src))
        .map_err(|e| e.message())?;
    Ok(checker.into_backend().into_tasks())
}

fn with_priority(tasks: &[ProofTask], priority: u32) -> Vec<&ProofTask> {
    tasks.iter().filter(|t| t.priority == priority).collect()
}

#[test]
fn auto_queues_an_equivalence_program() {
    let tasks = tasks("theorem T(): 1 + 1 ~ 2 {\n    auto;\n}\n").unwrap();
    let auto = with_priority(&tasks, AUTO_PRIORITY);
    assert_eq!(auto.len(), 1);
    assert!(auto[0].describe().starts_with("Checking auto at test.qvl("));

    let program = &auto[0].program;
    assert!(program.contains("procedure {:inline 1} left(internal.objectId : ObjectId)"));
    assert!(program.contains("procedure {:inline 1} right(internal.objectId : ObjectId)"));
    assert!(program.contains("ensures internal.r1==internal.r2;"));
    assert!(program.contains("ensures heap1==heap2;"));
}

#[test]
fn every_theorem_checks_its_distance() {
    let src = "const a;\ntheorem T(): a ~[adv] a {\n    trivial;\n}\n";
    let tasks = tasks(src).unwrap();
    let bounds = with_priority(&tasks, BOUNDS_PRIORITY);
    assert!(!bounds.is_empty());
    let last = bounds.last().unwrap();
    assert!(last.program.contains("const adv:real;"));
    assert!(last.program.contains("ensures internal.r1<=internal.r2;"));
    assert_eq!(last.message, "Checking bounds");
}

#[test]
fn bisim_relates_fields_by_position() {
    let src = r#"
theorem T(): new (x = 0) { method get() { x } } ~ new (y = 0) { method get() { y } } {
    bisim;
}
"#;
    let tasks = tasks(src).unwrap();
    let bisim = with_priority(&tasks, BISIM_PRIORITY);
    assert_eq!(bisim.len(), 1);

    let program = &bisim[0].program;
    assert!(program.contains(
        "ensures (heap1==heap2 && objectMemory1[internal.attribute.field.x]==objectMemory2[internal.attribute.field.y]);"
    ));
    assert!(program.contains("procedure both.new(internal.objectId : ObjectId)"));
    assert!(program.contains("procedure both.get(internal.objectId : ObjectId)"));
    assert!(program.contains("// left method"));
    assert!(program.contains("// right method"));
    assert_eq!(bisim[0].failure, "Bisimulation check failed.");
}

#[test]
fn bisim_with_invariants_uses_them_instead() {
    let src = r#"
theorem T(): new (x = 0) { method get() { x } } ~ new (y = 0) { method get() { y } } {
    bisim {
        invariant: left.x == right.y;
    }
}
"#;
    let tasks = tasks(src).unwrap();
    let program = &with_priority(&tasks, BISIM_PRIORITY)[0].program;
    assert!(!program.contains("heap1==heap2 &&"));
    assert!(program.contains("requires ("));
}

#[test]
fn empty_bisim_block_assumes_nothing() {
    let src = r#"
theorem T(): new (x = 0) { method get() { x } } ~ new (y = 0) { method get() { y } } {
    bisim { }
}
"#;
    let tasks = tasks(src).unwrap();
    let program = &with_priority(&tasks, BISIM_PRIORITY)[0].program;
    assert!(!program.contains("heap1==heap2"));
    let lines: Vec<&str> = program.lines().map(str::trim).collect();
    for header in ["procedure both.new(", "procedure both.get("] {
        let at = lines
            .iter()
            .position(|l| l.starts_with(header))
            .unwrap_or_else(|| panic!("missing {header}"));
        assert!(lines[at + 1].starts_with("modifies "), "{}", lines[at + 1]);
    }
}

#[test]
fn bisim_methods_must_match_before_anything_runs() {
    let src = r#"
theorem T(): new (x = 0) { method get() { x } } ~ new (x = 0) { method put() { x } } {
    bisim;
}
"#;
    assert_eq!(
        tasks(src).unwrap_err(),
        "Objects in bisimulation must have identical method signatures."
    );
}

#[test]
fn programs_start_with_the_prelude() {
    let tasks = tasks("theorem T(): 1 ~ 1 {\n    auto;\n}\n").unwrap();
    for task in &tasks {
        assert!(task.program.contains("type T;"), "{}", task.program);
    }
}
