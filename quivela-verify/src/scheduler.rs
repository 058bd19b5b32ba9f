#![forbid(unsafe_code)]

//! A fixed pool of worker slots draining the proof tasks of a run.
//!
//! Tasks are sorted once by priority and handed out lowest first. Each busy
//! slot owns a thread that reports back over a channel; the coordinator
//! wakes on every report and, while idle, on the status interval. A program
//! text reaches the verifier at most once per run; identical tasks share the
//! first one's result. The first failure stops new work, but tasks already
//! running are waited for.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use quivela_core::CheckError;
use tracing::{debug, info, warn};

use crate::cache::{digest, ProofCache};
use crate::task::{ProofTask, TaskState};
use crate::verifier::{Verdict, Verifier};

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub workers: usize,
    pub status_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            status_interval: Duration::from_millis(3000),
        }
    }
}

pub fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub verified: usize,
    pub cached: usize,
}

type Report = (usize, usize, Result<Verdict, CheckError>);

pub fn run<V: Verifier>(
    mut tasks: Vec<ProofTask>,
    verifier: &V,
    cache: &mut ProofCache,
    config: &SchedulerConfig,
) -> Result<RunSummary, CheckError> {
    tasks.sort_by_key(|t| t.priority);
    let workers = config.workers.max(1);
    let mut slots: Vec<Option<usize>> = vec![None; workers];
    let mut next = 0;
    let mut summary = RunSummary::default();
    let mut failure: Option<CheckError> = None;
    // Digests verified during this run, and digests with a verifier running
    // mapped to the identical tasks waiting on that result.
    let mut verified: HashSet<String> = HashSet::new();
    let mut in_flight: HashMap<String, Vec<usize>> = HashMap::new();
    let (tx, rx) = mpsc::channel::<Report>();

    thread::scope(|scope| {
        loop {
            if failure.is_none() {
                for worker in 0..workers {
                    while slots[worker].is_none() && next < tasks.len() {
                        let index = next;
                        next += 1;
                        let task = &mut tasks[index];
                        let key = digest(&task.program);
                        if verified.contains(&key) || cache.contains_digest(&key) {
                            task.state = TaskState::Complete;
                            summary.cached += 1;
                            info!("Task complete (cached): {}", task.describe());
                            continue;
                        }
                        if let Some(waiting) = in_flight.get_mut(&key) {
                            task.state = TaskState::Running;
                            waiting.push(index);
                            debug!("waiting on an identical program: {}", task.describe());
                            continue;
                        }
                        in_flight.insert(key, Vec::new());
                        task.state = TaskState::Running;
                        debug!(worker, bytes = task.program.len(), "dispatching {}", task.describe());
                        slots[worker] = Some(index);
                        let tx = tx.clone();
                        let program = task.program.clone();
                        scope.spawn(move || {
                            let result = verifier.verify(worker, &program);
                            if tx.send((worker, index, result)).is_err() {
                                debug!(worker, "coordinator hung up, verifier result dropped");
                            }
                        });
                    }
                }
            }
            if slots.iter().all(Option::is_none) {
                break;
            }

            match rx.recv_timeout(config.status_interval) {
                Ok((worker, index, result)) => {
                    slots[worker] = None;
                    let key = digest(&tasks[index].program);
                    let waiting = in_flight.remove(&key).unwrap_or_default();
                    let task = &mut tasks[index];
                    task.state = TaskState::Complete;
                    let accepted = match result {
                        Ok(verdict) if verdict.verified => {
                            summary.verified += 1;
                            info!("[{worker}] Task complete: {}", task.describe());
                            if let Err(err) = cache.insert(&task.program) {
                                failure.get_or_insert(err.into());
                            }
                            verified.insert(key);
                            true
                        }
                        Ok(verdict) => {
                            warn!(
                                "[{worker}] {} failed:\n{}",
                                task.describe(),
                                verdict.output.trim_end()
                            );
                            failure.get_or_insert_with(|| {
                                task.failure_error(&verifier.program_file(worker))
                            });
                            false
                        }
                        Err(err) => {
                            failure.get_or_insert(err);
                            false
                        }
                    };
                    for other in waiting {
                        let task = &mut tasks[other];
                        task.state = TaskState::Complete;
                        if accepted {
                            summary.cached += 1;
                            info!("Task complete (cached): {}", task.describe());
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => log_status(&slots, &tasks),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    });

    match failure {
        Some(err) => Err(err),
        None => Ok(summary),
    }
}

fn log_status(slots: &[Option<usize>], tasks: &[ProofTask]) {
    info!("Proof worker status:");
    for (worker, slot) in slots.iter().enumerate() {
        match slot {
            Some(index) => info!("[{worker}]: {}", tasks[*index].describe()),
            None => info!("[{worker}]: Waiting"),
        }
    }
}
