//! `Table(vars, tuples)`: the extensional constraint -- the
//! final assignment of `vars` must equal one of the explicitly listed
//! `tuples`. Filtered by discarding tuples no longer consistent with the
//! current domains, then projecting the survivors back onto each
//! column.

use rkanren_ir::Var;

use crate::fd::domain::{Domain, DomainEvent};
use crate::fd::propagator::{PropagateResult, PropagationContext, Propagator};

#[derive(Debug)]
pub struct Table {
    pub vars: Vec<Var>,
    pub tuples: Vec<Vec<i64>>,
}

impl Propagator for Table {
    fn name(&self) -> &'static str {
        "table"
    }

    fn vars(&self) -> Vec<Var> {
        self.vars.clone()
    }

    fn wake_on(&self, _v: Var, _event: DomainEvent) -> bool {
        true
    }

    fn propagate(&self, ctx: &mut dyn PropagationContext) -> PropagateResult {
        let domains: Vec<Domain> = self.vars.iter().map(|v| ctx.domain(*v)).collect();

        let surviving: Vec<&Vec<i64>> = self
        .tuples
        .iter()
        .filter(|tuple| {
                tuple.len() == domains.len()
                && tuple.iter().zip(domains.iter()).all(|(val, d)| d.contains(*val))
        })
        .collect();

        if surviving.is_empty() {
            return PropagateResult::Violated;
        }

        for (col, var) in self.vars.iter().enumerate() {
            let column_values: Vec<i64> = surviving.iter().map(|tuple| tuple[col]).collect();
            if ctx.narrow(*var, Domain::from_values(column_values)).is_err() {
                return PropagateResult::Violated;
            }
        }

        if surviving.len() == 1 {
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
    fn narrows_to_columns_of_surviving_tuples() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let b = Var::fresh();
        let mut store = UnifiedStore::new();
        store.attach(a, Domain::range(0, 3)).unwrap();
        store.attach(b, Domain::range(0, 3)).unwrap();

        let mut set = PropagatorSet::new();
        let p = set.register(Rc::new(Table {
                    vars: vec![a, b],
                    tuples: vec![vec![0, 1], vec![1, 2], vec![2, 0]],
        }));
        set.run_to_fixpoint(&mut store, vec![p]).unwrap();
        assert_eq!(
            store.domain_of(a).unwrap().iter().collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(
            store.domain_of(b).unwrap().iter().collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn no_matching_tuple_is_violated() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let b = Var::fresh();
        let mut store = UnifiedStore::new();
        store.attach(a, Domain::singleton(5)).unwrap();
        store.attach(b, Domain::singleton(5)).unwrap();

        let mut set = PropagatorSet::new();
        let p = set.register(Rc::new(Table {
                    vars: vec![a, b],
                    tuples: vec![vec![0, 1], vec![1, 2]],
        }));
        assert!(set.run_to_fixpoint(&mut store, vec![p]).is_err());
    }
}
