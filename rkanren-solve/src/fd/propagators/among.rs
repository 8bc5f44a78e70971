//! `Among(vars, values, count)`: `count` equals the number
//! of `vars` whose final value lies in `values`.

use rkanren_ir::Var;
use std::collections::HashSet;

use crate::fd::domain::{Domain, DomainEvent};
use crate::fd::propagator::{PropagateResult, PropagationContext, Propagator};

#[derive(Debug)]
pub struct Among {
    pub vars: Vec<Var>,
    pub values: HashSet<i64>,
    pub count: Var,
}

impl Propagator for Among {
    fn name(&self) -> &'static str {
        "among"
    }

    fn vars(&self) -> Vec<Var> {
        let mut v = self.vars.clone();
        v.push(self.count);
        v
    }

    fn wake_on(&self, _v: Var, _event: DomainEvent) -> bool {
        true
    }

    fn propagate(&self, ctx: &mut dyn PropagationContext) -> PropagateResult {
        let domains: Vec<Domain> = self.vars.iter().map(|v| ctx.domain(*v)).collect();

        let mut surely_in = 0usize;
        let mut maybe_in = 0usize;
        for d in &domains {
            let could = d.iter().any(|x| self.values.contains(&x));
            let must = d.is_singleton() && self.values.contains(&d.min());
            if must {
                surely_in += 1;
            }
            if could {
                maybe_in += 1;
            }
        }

        let d_count = ctx.domain(self.count);
        let bounded = Domain::range(surely_in as i64, maybe_in as i64).intersect(&d_count);
        if ctx.narrow(self.count, bounded).is_err() {
            return PropagateResult::Violated;
        }
        let d_count = ctx.domain(self.count);

        // If `count` is already pinned to the maximum possible, every
        // variable that *could* be in `values` must be; if pinned to the
        // minimum possible, every variable not already forced must be
        // forced out.
        if d_count.is_singleton() {
            let target = d_count.min();
            if target == maybe_in as i64 && target > surely_in as i64 {
                for (i, d) in domains.iter().enumerate() {
                    if d.is_singleton() {
                        continue;
                    }
                    let could = d.iter().any(|x| self.values.contains(&x));
                    if could {
                        let forced: Vec<i64> =
                        d.iter().filter(|x| self.values.contains(x)).collect();
                        if ctx
                        .narrow(self.vars[i], Domain::from_values(forced))
                        .is_err()
                        {
                            return PropagateResult::Violated;
                        }
                    }
                }
            } else if target == surely_in as i64 && (maybe_in as i64) > target {
                for (i, d) in domains.iter().enumerate() {
                    if d.is_singleton() {
                        continue;
                    }
                    let forced: Vec<i64> =
                    d.iter().filter(|x| !self.values.contains(x)).collect();
                    if ctx
                    .narrow(self.vars[i], Domain::from_values(forced))
                    .is_err()
                    {
                        return PropagateResult::Violated;
                    }
                }
            }
        }

        let all_singleton = domains.iter().all(|d| d.is_singleton()) && d_count.is_singleton();
        if all_singleton {
            PropagateResult::Entailed
        } else {
            PropagateResult::Pending
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fd::propagator::PropagatorSet;
    use crate::unified::UnifiedStore;
    use std::rc::Rc;

    #[test]
    fn bounds_count_from_domain_membership() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let b = Var::fresh();
        let count = Var::fresh();
        let mut store = UnifiedStore::new();
        store.attach(a, Domain::singleton(1)).unwrap();
        store.attach(b, Domain::from_values(vec![1, 2])).unwrap();
        store.attach(count, Domain::range(0, 2)).unwrap();

        let mut set = PropagatorSet::new();
        let p = set.register(Rc::new(Among {
                    vars: vec![a, b],
                    values: [1].into_iter().collect(),
                    count,
        }));
        set.run_to_fixpoint(&mut store, vec![p]).unwrap();
        assert_eq!(store.domain_of(count).unwrap().min(), 1);
        assert_eq!(store.domain_of(count).unwrap().max(), 2);
    }

    #[test]
    fn zero_count_forces_every_variable_out_of_the_set() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let b = Var::fresh();
        let count = Var::fresh();
        let mut store = UnifiedStore::new();
        store.attach(a, Domain::from_values(vec![1, 2])).unwrap();
        store.attach(b, Domain::from_values(vec![1, 2])).unwrap();
        store.attach(count, Domain::singleton(0)).unwrap();

        let mut set = PropagatorSet::new();
        let p = set.register(Rc::new(Among {
                    vars: vec![a, b],
                    values: [1].into_iter().collect(),
                    count,
        }));
        set.run_to_fixpoint(&mut store, vec![p]).unwrap();
        assert_eq!(store.domain_of(a).unwrap(), Domain::singleton(2));
        assert_eq!(store.domain_of(b).unwrap(), Domain::singleton(2));
    }
}
