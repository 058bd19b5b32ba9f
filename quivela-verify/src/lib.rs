#![forbid(unsafe_code)]

//! Boogie code generation for proof obligations, and the machinery that
//! runs the verifier on the generated programs.

pub mod auto;
pub mod backend;
pub mod bisim;
pub mod bounds;
pub mod bounds_check;
pub mod cache;
pub mod expr;
pub mod names;
pub mod object;
pub mod program;
pub mod prop;
pub mod scheduler;
pub mod task;
pub mod value;
pub mod verifier;
pub mod writer;

pub use auto::equivalence_program;
pub use backend::BoogieBackend;
pub use bisim::bisimulation_program;
pub use bounds_check::bounds_program;
pub use cache::{ProofCache, DEFAULT_CACHE_FILE};
pub use scheduler::{run, RunSummary, SchedulerConfig};
pub use task::{ProofTask, TaskState};
pub use verifier::{BoogieVerifier, Verdict, Verifier};
