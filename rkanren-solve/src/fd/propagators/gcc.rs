//! `GlobalCardinality(vars, limits)`: each value `v` with a
//! configured `(min, max)` occurrence count must appear in at least
//! `min` and at most `max` of `vars`' final assignments.
//!
//! This is a counting-based consistency, weaker than Régin's full
//! flow-based GCC filtering (`alldifferent.rs`'s matching/SCC approach
//! generalizes to GCC only with a min-cost-flow construction this crate
//! does not need for the cardinalities it actually exercises) but sound:
//! it only removes values and binds variables that are forced in *every*
//! remaining assignment.

use itertools::Itertools;
use rkanren_ir::Var;
use std::collections::HashMap;

use crate::fd::domain::{Domain, DomainEvent};
use crate::fd::propagator::{PropagateResult, PropagationContext, Propagator};

#[derive(Debug)]
pub struct GlobalCardinality {
    pub vars: Vec<Var>,
    /// value -> (min occurrences, max occurrences)
    pub limits: Vec<(i64, usize, usize)>,
}

impl Propagator for GlobalCardinality {
    fn name(&self) -> &'static str {
        "gcc"
    }

    fn vars(&self) -> Vec<Var> {
        self.vars.clone()
    }

    fn wake_on(&self, _v: Var, _event: DomainEvent) -> bool {
        true
    }

    fn propagate(&self, ctx: &mut dyn PropagationContext) -> PropagateResult {
        let domains: Vec<Domain> = self.vars.iter().map(|v| ctx.domain(*v)).collect();

        for (value, min_count, max_count) in &self.limits {
            let possible: Vec<usize> = domains
            .iter()
            .enumerate()
            .filter(|(_, d)| d.contains(*value))
            .map(|(i, _)| i)
            .collect();
            let forced = possible
            .iter()
            .filter(|&&i| domains[i].is_singleton())
            .count();

            if possible.len() < *min_count || forced > *max_count {
                return PropagateResult::Violated;
            }
            if *max_count == 0 {
                for &i in &possible {
                    let narrowed = domains[i].remove(*value);
                    if ctx.narrow(self.vars[i], narrowed).is_err() {
                        return PropagateResult::Violated;
                    }
                }
            } else if possible.len() == *min_count && *min_count > forced {
                for &i in &possible {
                    if ctx.narrow(self.vars[i], Domain::singleton(*value)).is_err() {
                        return PropagateResult::Violated;
                    }
                }
            }
        }

        let limit_of: HashMap<i64, (usize, usize)> = self
        .limits
        .iter()
        .map(|(v, lo, hi)| (*v, (*lo, *hi)))
        .collect();
        let seen: HashMap<i64, usize> = self
        .vars
        .iter()
        .map(|v| ctx.domain(*v))
        .filter(Domain::is_singleton)
        .map(|d| d.min())
        .counts();
        for (value, (min_count, _)) in &limit_of {
            if seen.get(value).copied().unwrap_or(0) < *min_count {
                return PropagateResult::Pending;
            }
        }
        if self.vars.iter().all(|v| ctx.domain(*v).is_singleton()) {
            PropagateResult::Entailed
        } else {
            PropagateResult::Pending
        }
    }
}
