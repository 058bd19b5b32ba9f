#![forbid(unsafe_code)]

use quivela_ast::Bounds;
use quivela_core::{CheckError, Location};
use quivela_parse::format_bounds;

pub const AUTO_PRIORITY: u32 = 3;
pub const BOUNDS_PRIORITY: u32 = 4;
pub const BISIM_PRIORITY: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    NotStarted,
    Running,
    Complete,
}

/// One generated program waiting for the verifier.
#[derive(Clone, Debug)]
pub struct ProofTask {
    pub program: String,
    pub message: String,
    pub failure: String,
    /// Lower runs first.
    pub priority: u32,
    pub location: Location,
    pub state: TaskState,
}

impl ProofTask {
    pub fn new(
        program: String,
        message: impl Into<String>,
        failure: impl Into<String>,
        priority: u32,
        location: Location,
    ) -> Self {
        Self {
            program,
            message: message.into(),
            failure: failure.into(),
            priority,
            location,
            state: TaskState::NotStarted,
        }
    }

    pub fn auto(program: String, message: &str, location: &Location) -> Self {
        Self::new(
            program,
            message,
            "Goal check failed.",
            AUTO_PRIORITY,
            location.clone(),
        )
    }

    pub fn bounds(program: String, actual: &Bounds, required: &Bounds, location: &Location) -> Self {
        Self::new(
            program,
            "Checking bounds",
            format!(
                "Bounds check failed: cannot prove that {}\n <= \n{}",
                format_bounds(actual),
                format_bounds(required)
            ),
            BOUNDS_PRIORITY,
            location.clone(),
        )
    }

    pub fn bisim(program: String, location: &Location) -> Self {
        Self::new(
            program,
            "Checking bisimulation",
            "Bisimulation check failed.",
            BISIM_PRIORITY,
            location.clone(),
        )
    }

    pub fn describe(&self) -> String {
        format!("{} at {}", self.message, self.location)
    }

    pub fn failure_error(&self, program_file: &str) -> CheckError {
        self.location.error(format!(
            "{} Try analyzing {program_file} using boogie.",
            self.failure
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quivela_parse::parse_bounds;

    #[test]
    fn bounds_failure_shows_both_sides() {
        let location = Location::detached("a.qvl");
        let task = ProofTask::bounds(
            String::new(),
            &parse_bounds("adv").unwrap(),
            &parse_bounds("0").unwrap(),
            &location,
        );
        assert_eq!(task.priority, BOUNDS_PRIORITY);
        assert_eq!(
            task.failure_error("boogie1.bpl").message(),
            "Bounds check failed: cannot prove that adv\n <= \n0 Try analyzing boogie1.bpl using boogie."
        );
    }

    #[test]
    fn describe_names_the_location() {
        let location = Location::detached("a.qvl");
        let task = ProofTask::bisim(String::new(), &location);
        assert_eq!(task.describe(), "Checking bisimulation at a.qvl(1:1)");
        assert_eq!(task.state, TaskState::NotStarted);
    }
}
