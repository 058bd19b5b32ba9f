use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn quivela(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_quivela"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn quivela")
}

const AUTO_PROOF: &str = "theorem T(): 1 + 1 ~ 2 {\n    auto;\n}\n";

#[test]
fn fmt_output_is_already_formatted() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("messy.qvl"), "const   a;const b;\n").unwrap();

    let out = quivela(dir.path(), &["fmt", "messy.qvl"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let formatted = String::from_utf8(out.stdout).unwrap();
    assert!(formatted.contains("const a;"));

    let out = quivela(dir.path(), &["fmt", "messy.qvl", "--check"]);
    assert!(!out.status.success());

    fs::write(dir.path().join("clean.qvl"), &formatted).unwrap();
    let out = quivela(dir.path(), &["fmt", "clean.qvl", "--check"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
}

#[test]
fn emit_writes_one_program_per_task() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.qvl"), AUTO_PROOF).unwrap();

    let out = quivela(dir.path(), &["emit", "main.qvl", "--out", "bpl"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let auto = fs::read_to_string(dir.path().join("bpl").join("task0.bpl")).unwrap();
    assert!(auto.contains("procedure both(internal.objectId : ObjectId)"));
    let bounds = fs::read_to_string(dir.path().join("bpl").join("task1.bpl")).unwrap();
    assert!(bounds.contains("ensures internal.r1<=internal.r2;"));
}

#[test]
fn check_errors_point_into_the_source() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.qvl"), "theorem T(): a ~ a {\n    trivial;\n}\n").unwrap();

    let out = quivela(dir.path(), &["check", "main.qvl", "--boogie", "/nonexistent/boogie"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("a not declared."), "{stderr}");
}

#[cfg(unix)]
#[test]
fn second_check_is_served_from_the_cache() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("fake-boogie.sh");
    fs::write(
        &script,
        "#!/bin/sh\necho \"$1\" >> calls.log\necho \"Boogie program verifier finished with 1 verified, 0 errors\"\n",
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    fs::write(dir.path().join("quivela.toml"), "[scheduler]\nworkers = 2\n").unwrap();
    fs::write(dir.path().join("main.qvl"), AUTO_PROOF).unwrap();
    let boogie = script.to_str().unwrap();

    let out = quivela(dir.path(), &["check", "main.qvl", "-b", boogie]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
    assert_eq!(calls.lines().count(), 2);
    let cached = fs::read_to_string(dir.path().join("quivela.cache.boogie")).unwrap();
    assert_eq!(cached.lines().count(), 2);

    let out = quivela(dir.path(), &["check", "main.qvl", "-b", boogie]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
    assert_eq!(calls.lines().count(), 2);

    let out = quivela(dir.path(), &["check", "main.qvl", "-b", boogie, "--no-cache"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
    assert_eq!(calls.lines().count(), 4);
}
