//! SLG/WFS tabling: call-pattern normalization, answer
//! subsumption, completion, and well-founded negation, layered on top of
//! `rkanren-solve`'s goal algebra.

pub mod call_pattern;
pub mod engine;
pub mod table;

pub use call_pattern::{normalize, reproject, CallShape};
pub use engine::{
    abolish, abolish_all, fd_invalidation_subscriber, not_tabled, reset_engine, tabled, wfs_truth,
    FdInvalidationSubscriber, NegationPolicy, PredicateId, Truth,
};
pub use table::{AnswerEntry, AnswerTable, Bindings, TableStatus};
