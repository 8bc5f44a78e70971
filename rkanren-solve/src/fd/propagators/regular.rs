//! `Regular(vars, automaton)`: `vars`, read in order, must
//! trace an accepting path through a given deterministic finite
//! automaton. Filtered by the standard forward/backward reachability
//! sweep over the automaton's state layers (the same idea as an MDD
//! consistency pass, specialized to a DFA).

use rkanren_ir::Var;
use std::collections::{HashMap, HashSet};

use crate::fd::domain::{Domain, DomainEvent};
use crate::fd::propagator::{PropagateResult, PropagationContext, Propagator};

#[derive(Clone, Debug)]
pub struct Dfa {
    pub start: usize,
    pub accepting: HashSet<usize>,
    pub transitions: HashMap<(usize, i64), usize>,
}

#[derive(Debug)]
pub struct Regular {
    pub vars: Vec<Var>,
    pub dfa: Dfa,
}

impl Propagator for Regular {
    fn name(&self) -> &'static str {
        "regular"
    }

    fn vars(&self) -> Vec<Var> {
        self.vars.clone()
    }

    fn wake_on(&self, _v: Var, _event: DomainEvent) -> bool {
        true
    }

    fn propagate(&self, ctx: &mut dyn PropagationContext) -> PropagateResult {
        let n = self.vars.len();
        let domains: Vec<Domain> = self.vars.iter().map(|v| ctx.domain(*v)).collect();

        let mut reachable: Vec<HashSet<usize>> = vec![HashSet::new(); n + 1];
        reachable[0].insert(self.dfa.start);
        for i in 0..n {
            for &state in reachable[i].clone().iter() {
                for val in domains[i].iter() {
                    if let Some(&next) = self.dfa.transitions.get(&(state, val)) {
                        reachable[i + 1].insert(next);
                    }
                }
            }
        }

        let mut coreachable: Vec<HashSet<usize>> = vec![HashSet::new(); n + 1];
        coreachable[n] = self.dfa.accepting.clone();
        for i in (0..n).rev() {
            for &state in reachable[i].iter() {
                for val in domains[i].iter() {
                    if let Some(&next) = self.dfa.transitions.get(&(state, val)) {
                        if coreachable[i + 1].contains(&next) {
                            coreachable[i].insert(state);
                        }
                    }
                }
            }
        }

        if !coreachable[0].contains(&self.dfa.start) {
            return PropagateResult::Violated;
        }

        for i in 0..n {
            let keep: Vec<i64> = domains[i]
            .iter()
            .filter(|val| {
                    reachable[i].iter().any(|&state| {
                            self.dfa
                            .transitions
                            .get(&(state, *val))
                            .map(|next| coreachable[i + 1].contains(next))
                            .unwrap_or(false)
                    })
            })
            .collect();
            if ctx.narrow(self.vars[i], Domain::from_values(keep)).is_err() {
                return PropagateResult::Violated;
            }
        }

        if self.vars.iter().all(|v| ctx.domain(*v).is_singleton()) {
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

    /// Accepts exactly the strings over {0,1} with no two consecutive 1s.
    fn no_consecutive_ones() -> Dfa {
        let mut transitions = HashMap::new();
        transitions.insert((0, 0), 0);
        transitions.insert((0, 1), 1);
        transitions.insert((1, 0), 0);
        // no (1, 1) transition: two 1s in a row is a dead end.
        Dfa {
            start: 0,
            accepting: [0, 1].into_iter().collect(),
            transitions,
        }
    }

    #[test]
    fn forbids_two_consecutive_ones() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let b = Var::fresh();
        let mut store = UnifiedStore::new();
        store.attach(a, Domain::singleton(1)).unwrap();
        store.attach(b, Domain::from_values(vec![0, 1])).unwrap();

        let mut set = PropagatorSet::new();
        let p = set.register(Rc::new(Regular {
                    vars: vec![a, b],
                    dfa: no_consecutive_ones(),
        }));
        set.run_to_fixpoint(&mut store, vec![p]).unwrap();
        assert_eq!(store.domain_of(b).unwrap(), Domain::singleton(0));
    }

    #[test]
    fn dead_state_violates() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let b = Var::fresh();
        let mut store = UnifiedStore::new();
        store.attach(a, Domain::singleton(1)).unwrap();
        store.attach(b, Domain::singleton(1)).unwrap();

        let mut set = PropagatorSet::new();
        let p = set.register(Rc::new(Regular {
                    vars: vec![a, b],
                    dfa: no_consecutive_ones(),
        }));
        assert!(set.run_to_fixpoint(&mut store, vec![p]).is_err());
    }
}
