//! The finite-domain solver: domains (§4.6), propagators (§4.7), and
//! labeling search (§4.8). The attributed-variable bridge that ties this
//! subsystem to relational unification lives one level up, in
//! `crate::unified` , since it needs to know about
//! `rkanren_ir::Var`/substitution identity that this module does not.

pub mod domain;
pub mod propagator;
pub mod propagators;
pub mod search;
