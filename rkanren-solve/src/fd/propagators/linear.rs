//! `LinearSum`: enforces `Σ cᵢ·vᵢ = total` via bounds
//! consistency -- for each `i`, tighten `vᵢ`'s bounds using the remaining
//! min/max sum of the other terms.

use rkanren_ir::Var;

use crate::fd::domain::DomainEvent;
use crate::fd::propagator::{PropagationContext, PropagateResult, Propagator};

#[derive(Debug)]
pub struct LinearSum {
    pub vars: Vec<Var>,
    pub coeffs: Vec<i64>,
    pub total: i64,
}

/// The range of values `c * dom(v)` can take.
fn term_bounds(c: i64, d: &crate::fd::domain::Domain) -> (i64, i64) {
    if c >= 0 {
        (c * d.min(), c * d.max())
    } else {
        (c * d.max(), c * d.min())
    }
}

impl Propagator for LinearSum {
    fn name(&self) -> &'static str {
        "linear_sum"
    }

    fn vars(&self) -> Vec<Var> {
        self.vars.clone()
    }

    fn wake_on(&self, _v: Var, _event: DomainEvent) -> bool {
        true
    }

    fn propagate(&self, ctx: &mut dyn PropagationContext) -> PropagateResult {
        let domains: Vec<_> = self.vars.iter().map(|v| ctx.domain(*v)).collect();
        let bounds: Vec<(i64, i64)> = self
        .coeffs
        .iter()
        .zip(domains.iter())
        .map(|(c, d)| term_bounds(*c, d))
        .collect();
        let sum_min: i64 = bounds.iter().map(|(lo, _)| *lo).sum();
        let sum_max: i64 = bounds.iter().map(|(_, hi)| *hi).sum();
        if self.total < sum_min || self.total > sum_max {
            return PropagateResult::Violated;
        }

        for i in 0..self.vars.len() {
            let c = self.coeffs[i];
            if c == 0 {
                continue;
            }
            // Bound on term i from the requirement that every other term
            // stays within its own range: term_i = total - sum(others).
            let others_min: i64 = sum_min - bounds[i].0;
            let others_max: i64 = sum_max - bounds[i].1;
            let term_lo = self.total - others_max;
            let term_hi = self.total - others_min;
            let (var_lo, var_hi) = if c > 0 {
                (ceil_div(term_lo, c), floor_div(term_hi, c))
            } else {
                (ceil_div(term_hi, c), floor_div(term_lo, c))
            };
            let d = &domains[i];
            let narrowed = d.remove_below(var_lo).remove_above(var_hi);
            if ctx.narrow(self.vars[i], narrowed).is_err() {
                return PropagateResult::Violated;
            }
        }

        if self.vars.len() == domains.iter().filter(|d| d.is_singleton()).count() {
            PropagateResult::Entailed
        } else {
            PropagateResult::Pending
        }
    }
}

fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn ceil_div(a: i64, b: i64) -> i64 {
    -floor_div(-a, b)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fd::domain::Domain;
    use crate::fd::propagator::PropagatorSet;
    use crate::unified::UnifiedStore;
    use std::rc::Rc;

    #[test]
    fn sum_equal_constraint_tightens_bounds() {
        rkanren_ir::reset_var_counter();
        let x = Var::fresh();
        let y = Var::fresh();
        let mut store = UnifiedStore::new();
        store.attach(x, Domain::range(0, 10)).unwrap();
        store.attach(y, Domain::range(0, 10)).unwrap();
        let mut set = PropagatorSet::new();
        let idx = set.register(Rc::new(LinearSum {
                    vars: vec![x, y],
                    coeffs: vec![1, 1],
                    total: 5,
        }));
        set.run_to_fixpoint(&mut store, vec![idx]).unwrap();
        assert_eq!(store.domain_of(x).unwrap().max(), 5);
        assert_eq!(store.domain_of(y).unwrap().max(), 5);
    }

    #[test]
    fn impossible_sum_is_violated() {
        rkanren_ir::reset_var_counter();
        let x = Var::fresh();
        let mut store = UnifiedStore::new();
        store.attach(x, Domain::range(0, 3)).unwrap();
        let mut set = PropagatorSet::new();
        let idx = set.register(Rc::new(LinearSum {
                    vars: vec![x],
                    coeffs: vec![1],
                    total: 100,
        }));
        assert!(set.run_to_fixpoint(&mut store, vec![idx]).is_err());
    }
}
