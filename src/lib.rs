//! The public embedding API, gluing `rkanren-ir` (terms,
//! substitution, unification), `rkanren-solve` (goal algebra, constraint
//! store, FD solver, unified store, search drivers) and `rkanren-slg`
//! (SLG/WFS tabling) into one crate behind a single facade, rather than
//! asking an embedder to depend on every workspace member directly.
//!
//! This crate adds no new engine semantics of its own -- every module
//! below is a thin, ergonomic wrapper around the lower layers, plus the
//! handful of relational list/type goals (`membero`, `car`, `cdr`,
//! `cons`, `nullo`, `pairo`) that are ordinary user-level relations, not
//! engine primitives, and so belong here rather than in `rkanren-solve`.

pub mod fd;
pub mod relational;
pub mod search;
pub mod tabling;

pub use relational::{absento, cdr, car, cons, membero, neq, nullo, numbero, pairo, symbolo};
pub use search::{optimize, run, run_all, run_with_timeout};
pub use tabling::{abolish, abolish_all, not_tabled, tabled, wfs_truth};

pub use rkanren_ir::{Atom, Term, Var};
pub use rkanren_solve::{
    conda, conde, condu, conj, disj, eq, fail, fresh, onceo, project, succeed, EngineConfig, Goal,
    Reified, RunOutcome, State,
};
pub use rkanren_solve::error::{EngineError, InvariantViolation, MisuseError};
pub use rkanren_solve::constraint::bus::GlobalConstraintBus;
pub use rkanren_solve::fd::domain::Domain;
pub use rkanren_solve::fd::search::{Sense, ValOrder, VarOrder};
pub use rkanren_slg::{NegationPolicy, PredicateId, Truth};

/// Builds a fresh logic-variable term, as distinct from the
/// `fresh(names, body)` goal combinator: one name covers both a nullary
/// term constructor and an n-ary goal combinator conceptually, but Rust
/// cannot overload on arity alone, so this crate keeps the combinator as
/// `fresh` and names the term constructor `fresh_var` (see DESIGN.md).
pub fn fresh_var() -> Term {
    Term::var(Var::fresh())
}

/// `atom`: wraps a scalar value as a `Term`.
pub fn atom(a: Atom) -> Term {
    Term::atom(a)
}

/// `pair`: a cons cell.
pub fn pair(car: Term, cdr: Term) -> Term {
    Term::cons(car, cdr)
}

/// `list`: a proper list built right-to-left from `items`.
pub fn list<I>(items: I) -> Term
where
I: IntoIterator<Item = Term>,
I::IntoIter: DoubleEndedIterator,
{
    Term::list(items)
}

/// Resets every piece of process/thread-global state this crate owns
/// (Global state... must be explicitly constructible): the
/// monotonic variable-id counter and the SLG tabling cache. Does *not*
/// reset any `GlobalConstraintBus`, since -- as recorded in DESIGN.md --
/// a bus is constructed fresh per `run`/`run_all`/`optimize` call rather
/// than held as a singleton; there is nothing global left to reset there.
///
/// Intended for test isolation between independent runs within the same
/// process; never called implicitly by the engine itself.
pub fn reset_global_engine() {
    rkanren_ir::reset_var_counter();
    rkanren_slg::reset_engine();
}
