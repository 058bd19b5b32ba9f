#![forbid(unsafe_code)]

use quivela_ast::{BisimProp, Bounds, Expr, NewExpr};
use quivela_core::{CheckError, ProofBackend, ProofEnv};
use tracing::debug;

use crate::auto::equivalence_program;
use crate::bisim::bisimulation_program;
use crate::bounds_check::bounds_program;
use crate::task::ProofTask;

/// Turns every obligation into a Boogie program and queues it; nothing is
/// verified until the queued tasks are handed to the scheduler.
#[derive(Debug, Default)]
pub struct BoogieBackend {
    tasks: Vec<ProofTask>,
}

impl BoogieBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[ProofTask] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<ProofTask> {
        self.tasks
    }

    fn queue(&mut self, task: ProofTask) {
        debug!(
            priority = task.priority,
            bytes = task.program.len(),
            "queued {}",
            task.describe()
        );
        self.tasks.push(task);
    }
}

impl ProofBackend for BoogieBackend {
    fn auto(
        &mut self,
        env: &ProofEnv<'_>,
        left: &Expr,
        right: &Expr,
        message: &str,
    ) -> Result<(), CheckError> {
        let program = equivalence_program(env, left, right)?;
        self.queue(ProofTask::auto(program, message, env.location));
        Ok(())
    }

    fn bounds(
        &mut self,
        env: &ProofEnv<'_>,
        actual: &Bounds,
        required: &Bounds,
    ) -> Result<(), CheckError> {
        let program = bounds_program(env, actual, required)?;
        self.queue(ProofTask::bounds(program, actual, required, env.location));
        Ok(())
    }

    fn bisim(
        &mut self,
        env: &ProofEnv<'_>,
        left: &NewExpr,
        right: &NewExpr,
        props: Option<&[BisimProp]>,
    ) -> Result<(), CheckError> {
        let program = bisimulation_program(env, left, right, props)?;
        self.queue(ProofTask::bisim(program, env.location));
        Ok(())
    }
}
