//! `Element(index, array, value)`: `array[index] = value`
//! where `array` is a fixed list of FD variables and `index`/`value` are
//! themselves FD variables. Filters `index` to positions whose array
//! entry can still equal `value`, and narrows `value` to the union of
//! domains reachable through `index`'s remaining candidates.

use rkanren_ir::Var;

use crate::fd::domain::{Domain, DomainEvent};
use crate::fd::propagator::{PropagateResult, PropagationContext, Propagator};

#[derive(Debug)]
pub struct Element {
    pub index: Var,
    pub array: Vec<Var>,
    pub value: Var,
}

impl Propagator for Element {
    fn name(&self) -> &'static str {
        "element"
    }

    fn vars(&self) -> Vec<Var> {
        let mut v = self.array.clone();
        v.push(self.index);
        v.push(self.value);
        v
    }

    fn wake_on(&self, _v: Var, _event: DomainEvent) -> bool {
        true
    }

    fn propagate(&self, ctx: &mut dyn PropagationContext) -> PropagateResult {
        let n = self.array.len() as i64;
        let d_index = ctx.domain(self.index);
        let d_value = ctx.domain(self.value);

        let candidates: Vec<i64> = d_index
        .iter()
        .filter(|&i| i >= 0 && i < n)
        .collect();
        if candidates.is_empty() {
            return PropagateResult::Violated;
        }

        let mut surviving_indices = Vec::new();
        let mut reachable_value = None::<Domain>;
        for i in candidates {
            let entry = ctx.domain(self.array[i as usize]);
            let meet = entry.intersect(&d_value);
            if meet.is_empty() {
                continue;
            }
            surviving_indices.push(i);
            reachable_value = Some(match reachable_value {
                    Some(acc) => acc.union(&entry),
                    None => entry,
            });
        }
        if surviving_indices.is_empty() {
            return PropagateResult::Violated;
        }

        if ctx
        .narrow(self.index, Domain::from_values(surviving_indices.clone()))
        .is_err()
        {
            return PropagateResult::Violated;
        }
        if let Some(reach) = reachable_value {
            if ctx.narrow(self.value, reach.intersect(&d_value)).is_err() {
                return PropagateResult::Violated;
            }
        }

        // If the index is pinned to one array cell, `value` must equal
        // that cell exactly: unify the two domains both ways.
        if surviving_indices.len() == 1 {
            let i = surviving_indices[0];
            let cell = self.array[i as usize];
            let cell_dom = ctx.domain(cell);
            let value_dom = ctx.domain(self.value);
            let meet = cell_dom.intersect(&value_dom);
            if meet.is_empty() {
                return PropagateResult::Violated;
            }
            if ctx.narrow(cell, meet.clone()).is_err() || ctx.narrow(self.value, meet).is_err() {
                return PropagateResult::Violated;
            }
        }

        let d_index = ctx.domain(self.index);
        let d_value = ctx.domain(self.value);
        if d_index.is_singleton() && d_value.is_singleton() {
            PropagateResult::Entailed
        } else {
            PropagateResult::Pending
        }
    }
}
