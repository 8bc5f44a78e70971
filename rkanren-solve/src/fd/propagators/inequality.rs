//! Inequality propagators (≤, <, ≥, >, ≠): O(1) bounds updates for the
//! ordered comparisons; `≠` is deferred to `Bind` events since it can
//! only narrow anything once one side is a singleton.

use rkanren_ir::Var;
use std::fmt;

use crate::fd::domain::DomainEvent;
use crate::fd::propagator::{PropagationContext, PropagateResult, Propagator};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cmp {
    Le,
    Lt,
    Ge,
    Gt,
    Ne,
}

/// `a <cmp> b` between two FD variables.
pub struct Inequality {
    pub a: Var,
    pub b: Var,
    pub cmp: Cmp,
}

impl fmt::Debug for Inequality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Inequality({:?} {:?} {:?})", self.a, self.cmp, self.b)
    }
}

impl Propagator for Inequality {
    fn name(&self) -> &'static str {
        "inequality"
    }

    fn vars(&self) -> Vec<Var> {
        vec![self.a, self.b]
    }

    fn wake_on(&self, _v: Var, event: DomainEvent) -> bool {
        match self.cmp {
            Cmp::Ne => event == DomainEvent::Bind,
            _ => true,
        }
    }

    fn propagate(&self, ctx: &mut dyn PropagationContext) -> PropagateResult {
        let da = ctx.domain(self.a);
        let db = ctx.domain(self.b);
        let result = match self.cmp {
            Cmp::Le => (
                ctx.narrow(self.a, da.remove_above(db.max())),
                ctx.narrow(self.b, db.remove_below(da.min())),
            ),
            Cmp::Lt => (
                ctx.narrow(self.a, da.remove_above(db.max() - 1)),
                ctx.narrow(self.b, db.remove_below(da.min() + 1)),
            ),
            Cmp::Ge => (
                ctx.narrow(self.a, da.remove_below(db.min())),
                ctx.narrow(self.b, db.remove_above(da.max())),
            ),
            Cmp::Gt => (
                ctx.narrow(self.a, da.remove_below(db.min() + 1)),
                ctx.narrow(self.b, db.remove_above(da.max() - 1)),
            ),
            Cmp::Ne => {
                if da.is_singleton() && db.contains(da.min()) {
                    (ctx.narrow(self.b, db.remove(da.min())), Ok(None))
                } else if db.is_singleton() && da.contains(db.min()) {
                    (ctx.narrow(self.a, da.remove(db.min())), Ok(None))
                } else {
                    (Ok(None), Ok(None))
                }
            }
        };
        match result {
            (Err(()), _) | (_, Err(())) => PropagateResult::Violated,
            _ => {
                let da = ctx.domain(self.a);
                let db = ctx.domain(self.b);
                if is_entailed(self.cmp, &da, &db) {
                    PropagateResult::Entailed
                } else {
                    PropagateResult::Pending
                }
            }
        }
    }
}

fn is_entailed(cmp: Cmp, da: &crate::fd::domain::Domain, db: &crate::fd::domain::Domain) -> bool {
    match cmp {
        Cmp::Le => da.max() <= db.min(),
        Cmp::Lt => da.max() < db.min(),
        Cmp::Ge => da.min() >= db.max(),
        Cmp::Gt => da.min() > db.max(),
        Cmp::Ne => da.is_singleton() && db.is_singleton() && da.min() != db.min(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fd::domain::Domain;
    use crate::fd::propagator::PropagatorSet;
    use std::rc::Rc;

    #[test]
    fn le_tightens_both_bounds() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let b = Var::fresh();
        let mut store = crate::unified::UnifiedStore::new();
        store.attach(a, Domain::range(0, 10)).unwrap();
        store.attach(b, Domain::range(5, 8)).unwrap();
        let mut set = PropagatorSet::new();
        let idx = set.register(Rc::new(Inequality { a, b, cmp: Cmp::Le }));
        set.run_to_fixpoint(&mut store, vec![idx]).unwrap();
        assert_eq!(store.domain_of(a).unwrap().max(), 8);
        assert_eq!(store.domain_of(b).unwrap().min(), 0);
    }

    #[test]
    fn ne_removes_singleton_peer_value() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let b = Var::fresh();
        let mut store = crate::unified::UnifiedStore::new();
        store.attach(a, Domain::singleton(3)).unwrap();
        store.attach(b, Domain::range(1, 5)).unwrap();
        let mut set = PropagatorSet::new();
        let idx = set.register(Rc::new(Inequality { a, b, cmp: Cmp::Ne }));
        set.run_to_fixpoint(&mut store, vec![idx]).unwrap();
        assert!(!store.domain_of(b).unwrap().contains(3));
    }
}
