//! Goal algebra, constraint store, finite-domain solver, unified store,
//! and search drivers.
//!
//! This crate does not know about tabling (`rkanren-slg`) or the public
//! embedding API (the `rkanren` root crate); it is the engine's "solve"
//! layer, with unification and clause solving kept separate from the
//! SLG machinery layered on top of it.

pub mod constraint;
pub mod error;
pub mod fd;
pub mod goal;
pub mod run;
pub mod state;
pub mod stream;
pub mod unified;

pub use constraint::{Constraint, ConstraintStore};
pub use error::{EngineError, InvariantViolation, MisuseError, RunOutcome};
pub use goal::{conda, conde, condu, conj, conj2, disj, disj2, eq, fail, fresh, onceo, project, succeed, Goal};
pub use run::{reify, run, run_all, run_branches_parallel, run_with_timeout, EngineConfig, Reified};
pub use state::State;
pub use stream::{CancelToken, LazyStream, Stream};
