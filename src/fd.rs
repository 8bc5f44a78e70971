//! Finite-domain goal constructors: thin `Goal`
//! wrappers around `State::attach_domain`/`State::register_propagator`
//! so FD modelling composes with the rest of the goal algebra exactly
//! like `eq`/`neq` do -- `conj([fd_in_domain(...), fd_all_different(...),
//! label(...)])` reads the same as any other relational program.

use std::rc::Rc;

use rkanren_ir::{Term, Var};
use rkanren_solve::error::MisuseError;
use rkanren_solve::fd::domain::Domain;
use rkanren_solve::fd::propagator::Propagator;
use rkanren_solve::fd::propagators::{
    AllDifferent, Among, Arith, ArithOp, Cumulative, Element, GlobalCardinality, Inequality, Cmp,
    LinearSum, NoOverlap, Regular, Table,
};
use rkanren_solve::state::State;
use rkanren_solve::stream::Stream;
use rkanren_solve::Goal;

pub use rkanren_solve::fd::propagators::{cumulative, no_overlap, regular::Dfa};

fn attach(v: Var, domain: Domain) -> Goal {
    Rc::new(move |s: State| match s.attach_domain(v, domain.clone()) {
            Ok(s2) => Stream::single(s2),
            Err(()) => Stream::empty(),
    })
}

fn post(p: Rc<dyn Propagator>) -> Goal {
    Rc::new(move |s: State| match s.register_propagator(Rc::clone(&p)) {
            Ok(s2) => Stream::single(s2),
            Err(()) => Stream::empty(),
    })
}

/// `fd_in_domain(v, lo, hi)`: attaches the FD domain
/// `[lo, hi]` to `v`. Fails at construction time (Misuse:
/// finite domain constructed with a negative or empty size) rather
/// than lazily at run time, since an empty range is a caller mistake,
/// not a search failure.
pub fn fd_in_domain(v: Var, lo: i64, hi: i64) -> Result<Goal, MisuseError> {
    if hi < lo {
        return Err(MisuseError::InvalidDomainSize);
    }
    Ok(attach(v, Domain::range(lo, hi)))
}

/// `fd_in_set(v, values)`: attaches a non-contiguous domain.
pub fn fd_in_set(v: Var, values: Vec<i64>) -> Result<Goal, MisuseError> {
    if values.is_empty() {
        return Err(MisuseError::InvalidDomainSize);
    }
    Ok(attach(v, Domain::from_values(values)))
}

/// `fd_all_different(vars)`: Régin-filtered all-different.
pub fn fd_all_different(vars: Vec<Var>) -> Goal {
    post(Rc::new(AllDifferent { vars }))
}

/// `fd_among(vars, values, count)`.
pub fn fd_among(vars: Vec<Var>, values: Vec<i64>, count: Var) -> Goal {
    post(Rc::new(Among {
                vars,
                values: values.into_iter().collect(),
                count,
    }))
}

fn arith(op: ArithOp, a: Var, b: Var, c: Var) -> Goal {
    post(Rc::new(Arith { op, a, b, c }))
}

/// `fd_plus(a, b, c)`: `a + b = c`.
pub fn fd_plus(a: Var, b: Var, c: Var) -> Goal {
    arith(ArithOp::Plus, a, b, c)
}

/// `fd_minus(a, b, c)`: `a - b = c`.
pub fn fd_minus(a: Var, b: Var, c: Var) -> Goal {
    arith(ArithOp::Minus, a, b, c)
}

/// `fd_times(a, b, c)`: `a * b = c`.
pub fn fd_times(a: Var, b: Var, c: Var) -> Goal {
    arith(ArithOp::Times, a, b, c)
}

/// `fd_div(a, b, c)`: `a / b = c`, truncating toward zero.
pub fn fd_div(a: Var, b: Var, c: Var) -> Goal {
    arith(ArithOp::Div, a, b, c)
}

/// `fd_mod(a, b, c)`: `a % b = c`, truncating toward zero.
pub fn fd_mod(a: Var, b: Var, c: Var) -> Goal {
    arith(ArithOp::Mod, a, b, c)
}

/// `fd_eq(a, b)`: `a = b` over FD-attributed variables.
pub fn fd_eq(a: Var, b: Var) -> Goal {
    arith(ArithOp::Eq, a, b, b)
}

fn cmp(a: Var, b: Var, cmp: Cmp) -> Goal {
    post(Rc::new(Inequality { a, b, cmp }))
}

/// `fd_lt(a, b)`: `a < b`.
pub fn fd_lt(a: Var, b: Var) -> Goal {
    cmp(a, b, Cmp::Lt)
}

/// `fd_le(a, b)`: `a <= b`.
pub fn fd_le(a: Var, b: Var) -> Goal {
    cmp(a, b, Cmp::Le)
}

/// `fd_gt(a, b)`: `a > b`.
pub fn fd_gt(a: Var, b: Var) -> Goal {
    cmp(a, b, Cmp::Gt)
}

/// `fd_ge(a, b)`: `a >= b`.
pub fn fd_ge(a: Var, b: Var) -> Goal {
    cmp(a, b, Cmp::Ge)
}

/// `fd_neq(a, b)`: `a != b` over FD-attributed variables (as
/// distinct from the relational [`crate::neq`], which works over
/// arbitrary terms).
pub fn fd_neq(a: Var, b: Var) -> Goal {
    cmp(a, b, Cmp::Ne)
}

/// `fd_linear_sum(vars, coeffs, total)`: `Σ cᵢ·vᵢ = total`.
pub fn fd_linear_sum(vars: Vec<Var>, coeffs: Vec<i64>, total: i64) -> Goal {
    post(Rc::new(LinearSum { vars, coeffs, total }))
}

/// `fd_element(index, array, value)`: `array[index] = value`.
pub fn fd_element(index: Var, array: Vec<Var>, value: Var) -> Goal {
    post(Rc::new(Element { index, array, value }))
}

/// `fd_gcc(vars, limits)`: global cardinality, `limits` is
/// `(value, min_occurrences, max_occurrences)` triples.
pub fn fd_gcc(vars: Vec<Var>, limits: Vec<(i64, usize, usize)>) -> Goal {
    post(Rc::new(GlobalCardinality { vars, limits }))
}

/// `fd_regular(vars, dfa)`: `vars` trace an accepting path
/// through `dfa`.
pub fn fd_regular(vars: Vec<Var>, dfa: Dfa) -> Goal {
    post(Rc::new(Regular { vars, dfa }))
}

/// `fd_table(vars, tuples)`: extensional constraint.
pub fn fd_table(vars: Vec<Var>, tuples: Vec<Vec<i64>>) -> Goal {
    post(Rc::new(Table { vars, tuples }))
}

/// `fd_cumulative(tasks, capacity)`: resource-constrained
/// scheduling.
pub fn fd_cumulative(tasks: Vec<cumulative::Task>, capacity: i64) -> Goal {
    post(Rc::new(Cumulative { tasks, capacity }))
}

/// `fd_no_overlap(tasks)`: disjunctive scheduling.
pub fn fd_no_overlap(tasks: Vec<no_overlap::Task>) -> Goal {
    post(Rc::new(NoOverlap { tasks }))
}

/// Re-export of the term constructed by `fd_*` reification:
/// `reify` already walks FD-attributed residual variables to their
/// domain description, so no separate FD-specific reification entry
/// point is needed here.
pub use rkanren_solve::fd::search::{label, label_default, optimize, LabelingConfig, Sense, ValOrder, VarOrder};
