//! `Cumulative(tasks, capacity)`: a resource-constrained
//! scheduling global constraint. Each task has a start-time FD variable,
//! a fixed duration, and a fixed resource demand; at every instant the
//! sum of demands of tasks currently running must not exceed `capacity`.
//!
//! Filtered by time-tabling: build the profile of *mandatory parts* (the
//! interval `[latest_start, earliest_finish)` that a task is guaranteed
//! to occupy given its current bounds, which is non-empty exactly when
//! the task's domain is tighter than its duration), sum demand over that
//! profile, and forbid any start time that would push a task's mandatory
//! part over capacity at some instant. This is the standard sound (but
//! not fully edge-finding-consistent) filtering used by the FD solvers in
//! the retrieval pack.

use rkanren_ir::Var;
use std::collections::BTreeMap;

use crate::fd::domain::{Domain, DomainEvent};
use crate::fd::propagator::{PropagateResult, PropagationContext, Propagator};

#[derive(Clone, Debug)]
pub struct Task {
    pub start: Var,
    pub duration: i64,
    pub demand: i64,
}

#[derive(Debug)]
pub struct Cumulative {
    pub tasks: Vec<Task>,
    pub capacity: i64,
}

/// The mandatory part of a task given its current start-time bounds:
/// `[latest_start, earliest_finish)`, or `None` if the bounds are too
/// loose for any instant to be mandatory.
fn mandatory_part(task: &Task, start_domain: &Domain) -> Option<(i64, i64)> {
    let latest_start = start_domain.max();
    let earliest_finish = start_domain.min() + task.duration;
    if latest_start < earliest_finish {
        Some((latest_start, earliest_finish))
    } else {
        None
    }
}

impl Propagator for Cumulative {
    fn name(&self) -> &'static str {
        "cumulative"
    }

    fn vars(&self) -> Vec<Var> {
        self.tasks.iter().map(|t| t.start).collect()
    }

    fn wake_on(&self, _v: Var, _event: DomainEvent) -> bool {
        true
    }

    fn propagate(&self, ctx: &mut dyn PropagationContext) -> PropagateResult {
        let domains: Vec<Domain> = self.tasks.iter().map(|t| ctx.domain(t.start)).collect();

        // Build the resource profile from every task's mandatory part.
        let mut profile: BTreeMap<i64, i64> = BTreeMap::new();
        for (task, d) in self.tasks.iter().zip(&domains) {
            if let Some((lo, hi)) = mandatory_part(task, d) {
                *profile.entry(lo).or_insert(0) += task.demand;
                *profile.entry(hi).or_insert(0) -= task.demand;
            }
        }
        let instants: Vec<i64> = profile.keys().copied().collect();
        let mut running = 0i64;
        let mut usage_at: Vec<(i64, i64)> = Vec::with_capacity(instants.len());
        for &t in &instants {
            running += profile[&t];
            usage_at.push((t, running));
            if running > self.capacity {
                return PropagateResult::Violated;
            }
        }

        // For each task not yet fully fixed, forbid start times that would
        // make its mandatory part push some instant over capacity.
        for (i, (task, d)) in self.tasks.iter().zip(domains.iter()).enumerate() {
            if task.duration == 0 || d.is_singleton() {
                continue;
            }
            let other_usage = |at: i64| -> i64 {
                let mut u = 0i64;
                for (j, (other, od)) in self.tasks.iter().zip(domains.iter()).enumerate() {
                    if i == j {
                        continue;
                    }
                    if let Some((lo, hi)) = mandatory_part(other, od) {
                        if at >= lo && at < hi {
                            u += other.demand;
                        }
                    }
                }
                u
            };
            let mut narrowed = d.clone();
            for candidate_start in d.iter().collect::<Vec<_>>() {
                let finish = candidate_start + task.duration;
                let overflow = instants
                .iter()
                .copied()
                .filter(|&t| t >= candidate_start && t < finish)
                .chain(std::iter::once(candidate_start))
                .any(|t| other_usage(t) + task.demand > self.capacity);
                if overflow {
                    narrowed = narrowed.remove(candidate_start);
                }
            }
            if narrowed.is_empty() {
                return PropagateResult::Violated;
            }
            if ctx.narrow(task.start, narrowed).is_err() {
                return PropagateResult::Violated;
            }
        }

        let all_fixed = self
        .tasks
        .iter()
        .all(|t| ctx.domain(t.start).is_singleton());
        if all_fixed {
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
    fn serializes_two_unit_capacity_tasks() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let b = Var::fresh();
        let mut store = UnifiedStore::new();
        store.attach(a, Domain::singleton(0)).unwrap();
        store.attach(b, Domain::range(0, 5)).unwrap();
        let mut set = PropagatorSet::new();
        let idx = set.register(Rc::new(Cumulative {
                    tasks: vec![
                        Task {
                            start: a,
                            duration: 2,
                            demand: 1,
                        },
                        Task {
                            start: b,
                            duration: 2,
                            demand: 1,
                        },
                    ],
                    capacity: 1,
        }));
        set.run_to_fixpoint(&mut store, vec![idx]).unwrap();
        // task a occupies [0, 2); b must start at or after 2.
        assert_eq!(store.domain_of(b).unwrap().min(), 2);
    }

    #[test]
    fn overloaded_capacity_is_violated() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let b = Var::fresh();
        let mut store = UnifiedStore::new();
        store.attach(a, Domain::singleton(0)).unwrap();
        store.attach(b, Domain::singleton(0)).unwrap();
        let mut set = PropagatorSet::new();
        let idx = set.register(Rc::new(Cumulative {
                    tasks: vec![
                        Task {
                            start: a,
                            duration: 1,
                            demand: 2,
                        },
                        Task {
                            start: b,
                            duration: 1,
                            demand: 2,
                        },
                    ],
                    capacity: 3,
        }));
        assert!(set.run_to_fixpoint(&mut store, vec![idx]).is_err());
    }
}
