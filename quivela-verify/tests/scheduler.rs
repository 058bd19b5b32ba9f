use std::fs;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use quivela_core::{CheckError, Location};
use quivela_verify::{
    run, BoogieVerifier, ProofCache, ProofTask, SchedulerConfig, Verdict, Verifier,
};

#[derive(Default)]
struct FakeVerifier {
    running: AtomicUsize,
    peak: AtomicUsize,
    calls: Mutex<Vec<String>>,
    reject: Option<&'static str>,
}

impl FakeVerifier {
    fn rejecting(program: &'static str) -> Self {
        Self {
            reject: Some(program),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Verifier for FakeVerifier {
    fn verify(&self, _worker: usize, program: &str) -> Result<Verdict, CheckError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let delay = if program.starts_with("slow") { 100 } else { 20 };
        thread::sleep(Duration::from_millis(delay));
        self.calls.lock().unwrap().push(program.to_string());
        self.running.fetch_sub(1, Ordering::SeqCst);
        let verified = self.reject != Some(program);
        Ok(Verdict {
            verified,
            output: format!("checked {program}"),
        })
    }
}

fn task(program: &str, priority: u32) -> ProofTask {
    ProofTask::new(
        program.to_string(),
        "Checking auto",
        "Goal check failed.",
        priority,
        Location::detached("t.qvl"),
    )
}

fn config(workers: usize) -> SchedulerConfig {
    SchedulerConfig {
        workers,
        status_interval: Duration::from_millis(5),
    }
}

#[test]
fn never_runs_more_tasks_than_workers() {
    let verifier = FakeVerifier::default();
    let tasks = (0..10).map(|i| task(&format!("p{i}"), 3)).collect();
    let summary = run(tasks, &verifier, &mut ProofCache::disabled(), &config(3)).unwrap();

    assert_eq!(summary.verified, 10);
    assert_eq!(verifier.calls().len(), 10);
    assert!(verifier.peak.load(Ordering::SeqCst) <= 3);
}

#[test]
fn lowest_priority_runs_first() {
    let verifier = FakeVerifier::default();
    let tasks = vec![task("a", 4), task("b", 2), task("c", 3), task("d", 2)];
    run(tasks, &verifier, &mut ProofCache::disabled(), &config(1)).unwrap();
    assert_eq!(verifier.calls(), ["b", "d", "c", "a"]);
}

#[test]
fn first_failure_stops_new_work() {
    let verifier = FakeVerifier::rejecting("bad");
    let tasks = vec![task("ok1", 3), task("bad", 2), task("ok2", 3)];
    let err = run(tasks, &verifier, &mut ProofCache::disabled(), &config(1)).unwrap_err();

    assert_eq!(
        err.message(),
        "Goal check failed. Try analyzing boogie0.bpl using boogie."
    );
    assert_eq!(verifier.calls(), ["bad"]);
}

#[test]
fn running_tasks_drain_after_a_failure() {
    let verifier = FakeVerifier::rejecting("bad");
    let tasks = vec![task("bad", 2), task("slow", 2), task("never", 5)];
    let err = run(tasks, &verifier, &mut ProofCache::disabled(), &config(2)).unwrap_err();

    assert!(err.message().starts_with("Goal check failed."));
    let mut calls = verifier.calls();
    calls.sort();
    assert_eq!(calls, ["bad", "slow"]);
}

#[test]
fn verified_programs_are_not_run_twice() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quivela.cache.boogie");
    let programs = ["x", "y", "z"];

    let verifier = FakeVerifier::default();
    let mut cache = ProofCache::load(&path).unwrap();
    let tasks = programs.iter().map(|p| task(p, 3)).collect();
    let first = run(tasks, &verifier, &mut cache, &config(2)).unwrap();
    assert_eq!((first.verified, first.cached), (3, 0));
    assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 3);

    let verifier = FakeVerifier::default();
    let mut cache = ProofCache::load(&path).unwrap();
    let tasks = programs.iter().map(|p| task(p, 3)).collect();
    let second = run(tasks, &verifier, &mut cache, &config(2)).unwrap();
    assert_eq!((second.verified, second.cached), (0, 3));
    assert!(verifier.calls().is_empty());
}

#[test]
fn identical_programs_share_one_verifier_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache");
    let verifier = FakeVerifier::default();
    let mut cache = ProofCache::load(&path).unwrap();
    let tasks = vec![task("x", 3), task("x", 3)];
    let summary = run(tasks, &verifier, &mut cache, &config(2)).unwrap();

    assert_eq!(verifier.calls().len(), 1);
    assert_eq!((summary.verified, summary.cached), (1, 1));
    assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
}

#[test]
fn identical_programs_share_a_run_without_a_cache() {
    let verifier = FakeVerifier::default();
    let tasks = vec![task("slow x", 1), task("y", 2), task("slow x", 3), task("slow x", 4)];
    let summary = run(tasks, &verifier, &mut ProofCache::disabled(), &config(3)).unwrap();

    assert_eq!(verifier.calls(), ["y", "slow x"]);
    assert_eq!((summary.verified, summary.cached), (2, 2));
}

#[test]
fn a_shared_failure_is_reported_once() {
    let verifier = FakeVerifier::rejecting("bad");
    let tasks = vec![task("bad", 1), task("bad", 1)];
    let err = run(tasks, &verifier, &mut ProofCache::disabled(), &config(2)).unwrap_err();

    assert_eq!(verifier.calls(), ["bad"]);
    assert!(err.message().starts_with("Goal check failed."));
}

#[test]
fn failures_are_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache");
    let verifier = FakeVerifier::rejecting("bad");
    let mut cache = ProofCache::load(&path).unwrap();
    run(vec![task("bad", 1)], &verifier, &mut cache, &config(1)).unwrap_err();
    assert!(!cache.contains("bad"));
    assert!(!path.exists() || fs::read_to_string(&path).unwrap().is_empty());
}

#[cfg(unix)]
fn script(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[test]
fn subprocess_verdict_follows_the_summary_line() {
    let dir = tempfile::tempdir().unwrap();
    let accept = script(
        dir.path(),
        "accept.sh",
        r#"test -f "$1" && echo "Boogie program verifier finished with 4 verified, 0 errors""#,
    );
    let verifier = BoogieVerifier::new(&accept, Vec::new(), dir.path()).unwrap();
    let verdict = verifier.verify(2, "procedure both() {}").unwrap();
    assert!(verdict.verified, "{}", verdict.output);
    assert_eq!(
        fs::read_to_string(dir.path().join("boogie2.bpl")).unwrap(),
        "procedure both() {}"
    );

    let reject = script(
        dir.path(),
        "reject.sh",
        r#"echo "Boogie program verifier finished with 3 verified, 1 error""#,
    );
    let verifier = BoogieVerifier::new(&reject, Vec::new(), dir.path()).unwrap();
    let tasks = vec![task("prog", 3)];
    let err = run(tasks, &verifier, &mut ProofCache::disabled(), &config(1)).unwrap_err();
    assert_eq!(
        err.message(),
        "Goal check failed. Try analyzing boogie0.bpl using boogie."
    );
}
