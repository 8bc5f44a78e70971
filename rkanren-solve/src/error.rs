//! Error taxonomy at the embedding boundary.
//!
//! Unsatisfiability is deliberately *not* a variant here: a failed branch
//! is represented by the absence of a stream element, never by an `Err`;
//! it is not surfaced to the caller unless no branches succeed, in which
//! case `run` returns an empty result set.

use thiserror::Error;

/// Fatal errors: an internal invariant was broken. These abort the run --
/// they are never caught and retried, only logged and propagated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("occurs check failed on an internally constructed term (variable {var_id})")]
    OccursCheckFailed { var_id: u64 },

    #[error("finite domain for variable {var_id} observed empty at a live branch boundary")]
    EmptyDomainAtBoundary { var_id: u64 },

    #[error("propagator {propagator} computed a value outside its declared range: {detail}")]
    PropagatorOutOfRange {
        propagator: &'static str,
        detail: String,
    },

    #[error("tabling cache was evicted or mutated during iteration for predicate {predicate_id}")]
    TableMutatedDuringIteration { predicate_id: u64 },
}

/// Misuse errors: caller error detected before or at the use site. These
/// are the only errors a well-behaved embedder should expect to
/// routinely handle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MisuseError {
    #[error("finite domain constructed with a negative or empty size")]
    InvalidDomainSize,

    #[error("abolish() called with unknown predicate id {predicate_id}")]
    UnknownPredicate { predicate_id: u64 },
}

/// The result of a `run`/`run_all`/`optimize` call that may be cut short
/// by cancellation or a timeout: callers still get every answer produced
/// so far, plus a flag saying whether the search tree was fully explored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome<T> {
    pub answers: Vec<T>,
    pub complete: bool,
}

impl<T> RunOutcome<T> {
    pub fn complete(answers: Vec<T>) -> Self {
        RunOutcome {
            answers,
            complete: true,
        }
    }

    pub fn partial(answers: Vec<T>) -> Self {
        RunOutcome {
            answers,
            complete: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error(transparent)]
    Misuse(#[from] MisuseError),
}
