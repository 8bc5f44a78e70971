//! `State`: the composed per-branch store threading substitution,
//! constraints, FD domains, and the global bus through a run. This is
//! the single type goals (`goal.rs`) are functions over.

use rkanren_ir::{unify_ext, Atom, Extension, Substitution, Term, Var};
use std::rc::Rc;

use crate::constraint::bus::{BusEvent, GlobalConstraintBus};
use crate::constraint::{Constraint, ConstraintStore};
use crate::fd::domain::Domain;
use crate::fd::propagator::Propagator;
use crate::stream::CancelToken;
use crate::unified::UnifiedStore;

#[derive(Clone, Debug, Default)]
pub struct State {
    pub subst: Substitution,
    pub constraints: ConstraintStore,
    pub unified: UnifiedStore,
    pub bus: GlobalConstraintBus,
    /// Shared by every `State` descended from one `run`/`optimize` call
    /// (a run carries a cancellation token); goals that must
    /// force part of their own stream internally (`onceo`, `condu`) check
    /// it at that suspension point.
    pub cancel: CancelToken,
}

impl State {
    pub fn new(bus: GlobalConstraintBus) -> State {
        State {
            subst: Substitution::new(),
            constraints: ConstraintStore::new(),
            unified: UnifiedStore::new(),
            bus,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> State {
        self.cancel = cancel;
        self
    }

    /// Full unification: term unification, then closing the
    /// relational/FD feedback loop and re-checking the constraint store.
    /// Returns the extended state, or `Err(())` if unification failed, a
    /// constraint was violated, or an FD domain went empty.
    pub fn unify(&self, t1: &Term, t2: &Term) -> Result<State, ()> {
        let mut next = self.clone();
        let (subst, ext) = unify_ext(t1, t2, &self.subst)?;
        next.subst = subst;
        next.close_loop(ext.vars().collect())?;
        Ok(next)
    }

    /// Attaches an FD domain to `v` (the entry point for `fd_in_domain`
    /// and friends in the embedding API), then closes the loop so an
    /// immediately-singleton domain binds back relationally.
    pub fn attach_domain(&self, v: Var, domain: Domain) -> Result<State, ()> {
        let mut next = self.clone();
        next.unified.attach(v, domain)?;
        next.close_loop(Vec::new())?;
        Ok(next)
    }

    /// Registers an FD propagator and immediately runs it to fixpoint.
    pub fn register_propagator(&self, p: Rc<dyn Propagator>) -> Result<State, ()> {
        let mut next = self.clone();
        next.unified.register_propagator(p);
        next.close_loop(Vec::new())?;
        Ok(next)
    }

    pub fn post_constraint(&self, c: Rc<dyn Constraint>) -> Result<State, ()> {
        let mut next = self.clone();
        next.constraints.post(c, &next.subst)?;
        Ok(next)
    }

    /// Iterates the relational⇄FD feedback loop until neither
    /// side produces further news:
    ///
    /// 1. For every variable just bound relationally (`touched`), if it
    /// carries an FD attribute, narrow that domain accordingly.
    /// 2. Recheck the constraint store against `touched`.
    /// 3. Run FD propagation to fixpoint; publish every domain change on
    /// the bus; collect variables that became singleton.
    /// 4. Post a relational bind for each newly-singleton variable not
    /// already relationally bound, feeding its extension back into step
    /// 1 on the next iteration.
    fn close_loop(&mut self, mut touched: Vec<Var>) -> Result<(), ()> {
        loop {
            for v in &touched {
                if !self.unified.has_attribute(*v) {
                    continue;
                }
                match self.subst.walk(&Term::Var(*v)) {
                    Term::Atom(Atom::Int(n)) => self.unified.bind_to_value(*v, n)?,
                    Term::Var(w) if w != *v && self.unified.has_attribute(w) => {
                        self.unified.unify_attributed(*v, w)?
                    }
                    _ => {}
                }
            }
            if !touched.is_empty() {
                self.constraints.recheck(&self.subst, &touched)?;
            }

            let mut before = self.unified.clone();
            self.unified.propagate_all()?;
            let changed = self.unified.changed_domains(&mut before);
            if changed.is_empty() {
                return Ok(());
            }

            touched = Vec::new();
            for (v, domain) in changed {
                self.bus.publish(BusEvent::DomainNarrowed {
                        var_id: v.id,
                        domain: domain.snapshot(),
                });
                if domain.is_singleton() && self.subst.get(v).is_none() {
                    // `v` unbound, `domain.min()` ground: this unify can only
                    // fail its occurs check if `v` already structurally
                    // contains itself, which an FD-attributed variable never
                    // does.
                    let (subst, ext) =
                    unify_ext(&Term::Var(v), &Term::int(domain.min()), &self.subst)
                    .unwrap_or_else(|()| {
                            rkanren_macros::invariant!(
                                false,
                                "internal singleton rebind of {:?} failed its occurs check",
                                v
                            );
                            unreachable!("invariant! aborts in debug builds")
                    });
                    self.subst = subst;
                    touched.extend(ext.vars());
                }
            }
        }
    }

    pub fn extend_touched(&self, ext: &Extension) -> Vec<Var> {
        ext.vars().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn plain_unify_has_no_fd_side_effects() {
        rkanren_ir::reset_var_counter();
        let x = Var::fresh();
        let s0 = State::new(GlobalConstraintBus::new());
        let s1 = s0.unify(&Term::Var(x), &Term::int(5)).unwrap();
        assert_eq!(s1.subst.walk(&Term::Var(x)), Term::int(5));
    }

    #[test]
    fn fd_singleton_binds_back_relationally() {
        rkanren_ir::reset_var_counter();
        let x = Var::fresh();
        let s0 = State::new(GlobalConstraintBus::new());
        let s1 = s0.attach_domain(x, Domain::singleton(7)).unwrap();
        assert_eq!(s1.subst.walk(&Term::Var(x)), Term::int(7));
    }

    #[test]
    fn relational_bind_narrows_fd_attributed_variable() {
        rkanren_ir::reset_var_counter();
        let x = Var::fresh();
        let s0 = State::new(GlobalConstraintBus::new());
        let s1 = s0.attach_domain(x, Domain::range(1, 10)).unwrap();
        let s2 = s1.unify(&Term::Var(x), &Term::int(4)).unwrap();
        let mut s2 = s2;
        assert_eq!(s2.unified.domain_of(x), Some(Domain::singleton(4)));
    }

    #[test]
    fn relational_bind_outside_domain_fails() {
        rkanren_ir::reset_var_counter();
        let x = Var::fresh();
        let s0 = State::new(GlobalConstraintBus::new());
        let s1 = s0.attach_domain(x, Domain::range(1, 3)).unwrap();
        assert!(s1.unify(&Term::Var(x), &Term::int(9)).is_err());
    }

    #[test]
    fn constraint_store_carried_through_unify() {
        rkanren_ir::reset_var_counter();
        let q = Var::fresh();
        let s0 = State::new(GlobalConstraintBus::new());
        let s1 = s0
        .post_constraint(ConstraintStore::neq(Term::Var(q), Term::int(1)))
        .unwrap();
        assert!(s1.unify(&Term::Var(q), &Term::int(1)).is_err());
        let s2 = s1.unify(&Term::Var(q), &Term::int(2)).unwrap();
        assert!(s2.constraints.is_empty());
    }
}
