//! The propagator interface and fixpoint scheduler.
//!
//! A propagator only ever sees the world through `PropagationContext`: it
//! reads and narrows domains, never touching the substitution or the
//! constraint store directly. `UnifiedStore` (in `unified.rs`) is the
//! concrete context; keeping the trait here (rather than depending on
//! `unified.rs`) lets propagator implementations be unit-tested against a
//! small in-memory context without pulling in the rest of the engine.

use rkanren_ir::Var;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use super::domain::{Domain, DomainEvent};

/// What a propagator does to the store it is given.
pub trait PropagationContext {
    /// `&mut self` even though this only reads a domain: the concrete
    /// `UnifiedStore` context resolves unioned variables through `ena`'s
    /// path-compressing `find`, which is itself `&mut`.
    fn domain(&mut self, v: Var) -> Domain;

    /// Narrows `v`'s domain to `new_domain`. Returns the event produced (if
    /// the domain actually changed), or `Err(())` if `new_domain` is empty
    /// (a domain must never be observed empty at a live branch
    /// boundary).
    fn narrow(&mut self, v: Var, new_domain: Domain) -> Result<Option<DomainEvent>, ()>;
}

/// The outcome of one `propagate` call. "No further narrowing possible
/// right now" is modelled implicitly by `Pending` dropping out of the
/// active queue until re-woken, rather than as a distinct variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropagateResult {
    Entailed,
    Violated,
    Pending,
}

pub trait Propagator: fmt::Debug {
    fn name(&self) -> &'static str;

    /// The variables this propagator reads or narrows; used to build the
    /// wake-up subscription table.
    fn vars(&self) -> Vec<Var>;

    /// Whether a narrowing event on `v` should re-enqueue this propagator.
    fn wake_on(&self, v: Var, event: DomainEvent) -> bool;

    fn propagate(&self, ctx: &mut dyn PropagationContext) -> PropagateResult;
}

/// A registered propagator plus the subscription table mapping each
/// variable it watches to its index, so a narrowing event can cheaply find
/// every propagator to re-enqueue.
#[derive(Default)]
pub struct PropagatorSet {
    propagators: Vec<Rc<dyn Propagator>>,
    subscribers: HashMap<u64, Vec<usize>>,
}

impl PropagatorSet {
    pub fn new() -> PropagatorSet {
        PropagatorSet::default()
    }

    pub fn register(&mut self, p: Rc<dyn Propagator>) -> usize {
        let idx = self.propagators.len();
        for v in p.vars() {
            self.subscribers.entry(v.id).or_default().push(idx);
        }
        self.propagators.push(p);
        idx
    }

    pub fn is_empty(&self) -> bool {
        self.propagators.is_empty()
    }

    /// How many registered propagators watch `v`. Used by the
    /// `dom-over-deg` labeling heuristic.
    pub fn subscriber_count(&self, v: Var) -> usize {
        self.subscribers.get(&v.id).map(Vec::len).unwrap_or(0)
    }

    fn wake_for(&self, v: Var, event: DomainEvent) -> Vec<usize> {
        self.subscribers
        .get(&v.id)
        .into_iter()
        .flatten()
        .copied()
        .filter(|&idx| self.propagators[idx].wake_on(v, event))
        .collect()
    }

    /// Drains the queue to fixpoint. `initial` seeds the queue with
    /// propagators to try first (typically: every propagator touching a
    /// variable that was just narrowed outside propagation, e.g. by a
    /// relational bind).
    ///
    /// There is no real priority beyond FIFO admission order -- a stable
    /// order is all that is required, not a specific cost model, so a
    /// plain queue keeps this simple.
    pub fn run_to_fixpoint(
        &self,
        ctx: &mut dyn PropagationContext,
        initial: impl IntoIterator<Item = usize>,
    ) -> Result<(), ()> {
        let mut queue: VecDeque<usize> = initial.into_iter().collect();
        let mut queued: Vec<bool> = vec![false; self.propagators.len()];
        for &idx in &queue {
            queued[idx] = true;
        }
        while let Some(idx) = queue.pop_front() {
            queued[idx] = false;
            let propagator = &self.propagators[idx];
            log::trace!("propagating {}", propagator.name());
            let before: HashMap<u64, Domain> = propagator
            .vars()
            .iter()
            .map(|v| (v.id, ctx.domain(*v)))
            .collect();
            match propagator.propagate(ctx) {
                PropagateResult::Violated => {
                    log::trace!("{} violated, failing branch", propagator.name());
                    return Err(());
                }
                PropagateResult::Entailed | PropagateResult::Pending => {}
            }
            for v in propagator.vars() {
                let after = ctx.domain(v);
                if let Some(prior) = before.get(&v.id) {
                    if let Some(event) = after.events_since(prior) {
                        for wake_idx in self.wake_for(v, event) {
                            if wake_idx != idx && !queued[wake_idx] {
                                log::trace!(
                                    "{} narrowed {:?}, waking {}",
                                    propagator.name(),
                                    v,
                                    self.propagators[wake_idx].name()
                                );
                                queued[wake_idx] = true;
                                queue.push_back(wake_idx);
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn all_indices(&self) -> impl Iterator<Item = usize> {
        0..self.propagators.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;

    struct MapContext(RefCell<HashMap<u64, Domain>>);

    impl PropagationContext for MapContext {
        fn domain(&mut self, v: Var) -> Domain {
            self.0
            .borrow()
            .get(&v.id)
            .cloned()
            .unwrap_or_else(|| Domain::range(i64::MIN / 2, i64::MAX / 2))
        }

        fn narrow(&mut self, v: Var, new_domain: Domain) -> Result<Option<DomainEvent>, ()> {
            if new_domain.is_empty() {
                return Err(());
            }
            let before = self.domain(v);
            let event = new_domain.events_since(&before);
            self.0.borrow_mut().insert(v.id, new_domain);
            Ok(event)
        }
    }

    #[derive(Debug)]
    struct Halve(Var);

    impl Propagator for Halve {
        fn name(&self) -> &'static str {
            "halve"
        }
        fn vars(&self) -> Vec<Var> {
            vec![self.0]
        }
        fn wake_on(&self, _v: Var, _event: DomainEvent) -> bool {
            true
        }
        fn propagate(&self, ctx: &mut dyn PropagationContext) -> PropagateResult {
            let d = ctx.domain(self.0);
            if d.is_singleton() {
                return PropagateResult::Entailed;
            }
            let mid = (d.min() + d.max()) / 2;
            match ctx.narrow(self.0, d.remove_above(mid)) {
                Ok(_) => PropagateResult::Pending,
                Err(()) => PropagateResult::Violated,
            }
        }
    }

    #[test]
    fn fixpoint_runs_propagator_until_entailed() {
        rkanren_ir::reset_var_counter();
        let v = Var::fresh();
        let mut ctx = MapContext(RefCell::new(HashMap::new()));
        ctx.0.borrow_mut().insert(v.id, Domain::range(0, 100));
        let mut set = PropagatorSet::new();
        let idx = set.register(Rc::new(Halve(v)));
        set.run_to_fixpoint(&mut ctx, vec![idx]).unwrap();
        assert!(ctx.domain(v).size() < 100);
    }
}
