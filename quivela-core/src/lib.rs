#![forbid(unsafe_code)]

pub mod backend;
pub mod bounds;
pub mod checker;
pub mod context;
pub mod error;
pub mod inline;
pub mod obligation;
pub mod rewrite;
pub mod simplify;
pub mod subst;
pub mod symbols;
pub mod tree;
pub mod unfold;
pub mod unify;

pub use backend::{ProofBackend, ProofEnv, ProofRequest, RecordingBackend};
pub use checker::{CheckOptions, Checker};
pub use context::{Context, Functions};
pub use error::{CheckError, Location, SourceFile};
pub use obligation::Equiv;
pub use symbols::{FrameKind, SymbolTable};
