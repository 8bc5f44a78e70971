//! Concrete propagators . Each submodule implements one
//! constraint family behind the shared `Propagator` trait in
//! `fd::propagator`.

pub mod alldifferent;
pub mod among;
pub mod arith;
pub mod cumulative;
pub mod element;
pub mod gcc;
pub mod inequality;
pub mod linear;
pub mod no_overlap;
pub mod regular;
pub mod table;

pub use alldifferent::AllDifferent;
pub use among::Among;
pub use arith::{Arith, ArithOp};
pub use cumulative::Cumulative;
pub use element::Element;
pub use gcc::GlobalCardinality;
pub use inequality::{Cmp, Inequality};
pub use linear::LinearSum;
pub use no_overlap::NoOverlap;
pub use regular::{Dfa, Regular};
pub use table::Table;
