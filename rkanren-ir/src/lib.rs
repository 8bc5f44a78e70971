//! Terms, substitutions, and the unifier.
//!
//! Fatal invariant violations (occurs check failing under an internally
//! constructed term) are a concern of whichever crate's internal
//! construction might trigger one; this crate's own `bind` surfaces an
//! occurs-check failure as plain unification failure (`Err(())`), the
//! ordinary outcome for a user-level `unify` call. See
//! `rkanren_solve::error::InvariantViolation` for the fatal-abort
//! taxonomy.

pub mod subst;
pub mod term;
pub mod unify;

pub use subst::{Extension, Substitution};
pub use term::{reset_var_counter, Atom, Term, Var};
pub use unify::{unify, unify_ext, UnifyResult};
