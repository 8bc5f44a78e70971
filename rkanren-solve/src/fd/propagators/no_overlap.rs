//! `NoOverlap(tasks)`: a disjunctive scheduling global
//! constraint -- every pair of tasks must not overlap in time. Equivalent
//! to `Cumulative` with every demand equal to the shared capacity, but
//! specified and filtered separately because the pairwise ordering
//! reasoning below (if only one ordering remains possible, commit to it)
//! is stronger than time-tabling alone gives for two-task pairs.

use rkanren_ir::Var;

use crate::fd::domain::DomainEvent;
use crate::fd::propagator::{PropagateResult, PropagationContext, Propagator};

#[derive(Clone, Debug)]
pub struct Task {
    pub start: Var,
    pub duration: i64,
}

#[derive(Debug)]
pub struct NoOverlap {
    pub tasks: Vec<Task>,
}

impl Propagator for NoOverlap {
    fn name(&self) -> &'static str {
        "no_overlap"
    }

    fn vars(&self) -> Vec<Var> {
        self.tasks.iter().map(|t| t.start).collect()
    }

    fn wake_on(&self, _v: Var, _event: DomainEvent) -> bool {
        true
    }

    fn propagate(&self, ctx: &mut dyn PropagationContext) -> PropagateResult {
        let n = self.tasks.len();
        let mut all_singleton = true;

        for i in 0..n {
            for j in (i + 1)..n {
                let ti = &self.tasks[i];
                let tj = &self.tasks[j];
                let di = ctx.domain(ti.start);
                let dj = ctx.domain(tj.start);

                // `i` before `j` (i finishes no later than j's earliest
                // start) is still possible iff i could finish by j's
                // latest possible start.
                let i_before_j_possible = di.min() + ti.duration <= dj.max();
                let j_before_i_possible = dj.min() + tj.duration <= di.max();

                if !i_before_j_possible && !j_before_i_possible {
                    return PropagateResult::Violated;
                }

                // Exactly one ordering remains viable: enforce it as a
                // bounds tightening on both tasks.
                if i_before_j_possible && !j_before_i_possible {
                    let new_dj = dj.remove_below(di.min() + ti.duration);
                    let new_di = di.remove_above(dj.max() - ti.duration);
                    if ctx.narrow(tj.start, new_dj).is_err() || ctx.narrow(ti.start, new_di).is_err() {
                        return PropagateResult::Violated;
                    }
                } else if j_before_i_possible && !i_before_j_possible {
                    let new_di = di.remove_below(dj.min() + tj.duration);
                    let new_dj = dj.remove_above(di.max() - tj.duration);
                    if ctx.narrow(ti.start, new_di).is_err() || ctx.narrow(tj.start, new_dj).is_err() {
                        return PropagateResult::Violated;
                    }
                }
            }
        }

        for t in &self.tasks {
            if !ctx.domain(t.start).is_singleton() {
                all_singleton = false;
            }
        }
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
    use crate::fd::domain::Domain;
    use crate::fd::propagator::PropagatorSet;
    use crate::unified::UnifiedStore;
    use std::rc::Rc;

    #[test]
    fn forced_ordering_tightens_both_bounds() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let b = Var::fresh();
        let mut store = UnifiedStore::new();
        store.attach(a, Domain::singleton(0)).unwrap();
        store.attach(b, Domain::range(0, 10)).unwrap();
        let mut set = PropagatorSet::new();
        let idx = set.register(Rc::new(NoOverlap {
                    tasks: vec![
                        Task {
                            start: a,
                            duration: 3,
                        },
                        Task {
                            start: b,
                            duration: 2,
                        },
                    ],
        }));
        set.run_to_fixpoint(&mut store, vec![idx]).unwrap();
        assert_eq!(store.domain_of(b).unwrap().min(), 3);
    }

    #[test]
    fn impossible_overlap_is_violated() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let b = Var::fresh();
        let mut store = UnifiedStore::new();
        store.attach(a, Domain::singleton(0)).unwrap();
        store.attach(b, Domain::singleton(1)).unwrap();
        let mut set = PropagatorSet::new();
        let idx = set.register(Rc::new(NoOverlap {
                    tasks: vec![
                        Task {
                            start: a,
                            duration: 5,
                        },
                        Task {
                            start: b,
                            duration: 5,
                        },
                    ],
        }));
        assert!(set.run_to_fixpoint(&mut store, vec![idx]).is_err());
    }
}
