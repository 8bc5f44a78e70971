//! The unified store: attributed variables bridging relational unification
//! and finite-domain solving, plus the FD propagator fixpoint engine it
//! owns.
//!
//! Two variables that have each acquired an FD domain and are then
//! relationally unified must end up sharing one domain and one identity
//! for propagation purposes. That "surviving representative" bookkeeping
//! is exactly what a union-find structure is for, so this reuses `ena`
//! rather than hand-rolling one -- cloned wholesale on fork, the same
//! way an inference table clones its own unification table when a
//! branch forks. The relational substitution itself stays a plain
//! persistent map (`rkanren_ir::Substitution`); only this FD-attribute
//! layer uses union-find.

use ena::unify::{InPlaceUnificationTable, UnifyKey};
use rkanren_ir::Var;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::fd::domain::{Domain, DomainEvent};
use crate::fd::propagator::{PropagationContext, Propagator, PropagatorSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct FdKey(u32);

impl UnifyKey for FdKey {
    type Value = ();
    fn index(&self) -> u32 {
        self.0
    }
    fn from_index(i: u32) -> FdKey {
        FdKey(i)
    }
    fn tag() -> &'static str {
        "FdKey"
    }
}

#[derive(Clone)]
pub struct UnifiedStore {
    /// Maps an externally visible variable id to its union-find key. Only
    /// variables that have been given an FD attribute appear here.
    keys: Rc<HashMap<u64, FdKey>>,
    uf: Rc<InPlaceUnificationTable<FdKey>>,
    /// Domain storage keyed by the union-find *representative's* index, so
    /// unified variables transparently share one domain.
    domains: Rc<HashMap<u32, Domain>>,
    propagators: Rc<PropagatorSet>,
}

impl fmt::Debug for UnifiedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnifiedStore")
        .field("attributed_vars", &self.keys.len())
        .finish()
    }
}

impl Default for UnifiedStore {
    fn default() -> UnifiedStore {
        UnifiedStore {
            keys: Rc::new(HashMap::new()),
            uf: Rc::new(InPlaceUnificationTable::new()),
            domains: Rc::new(HashMap::new()),
            propagators: Rc::new(PropagatorSet::new()),
        }
    }
}

impl UnifiedStore {
    pub fn new() -> UnifiedStore {
        UnifiedStore::default()
    }

    pub fn has_attribute(&self, v: Var) -> bool {
        self.keys.contains_key(&v.id)
    }

    fn key_of(&mut self, v: Var) -> FdKey {
        if let Some(k) = self.keys.get(&v.id) {
            return *k;
        }
        let k = Rc::make_mut(&mut self.uf).new_key(());
        Rc::make_mut(&mut self.keys).insert(v.id, k);
        k
    }

    /// Path-compressing find. Requires `&mut self` because `ena` only
    /// offers a mutating `find` (it compresses paths as it goes); every
    /// caller in this module already holds `&mut self` for that reason,
    /// including the `PropagationContext` methods below.
    fn representative_of(&mut self, v: Var) -> Option<FdKey> {
        let k = *self.keys.get(&v.id)?;
        Some(Rc::make_mut(&mut self.uf).find(k))
    }

    /// Attaches (or further narrows, if already attached) an FD domain to
    /// `v`. Fails if the resulting domain is empty.
    pub fn attach(&mut self, v: Var, domain: Domain) -> Result<(), ()> {
        let existing = self.domain_of(v);
        let merged = match existing {
            Some(d) => d.intersect(&domain),
            None => domain,
        };
        if merged.is_empty() {
            return Err(());
        }
        let k = self.key_of(v);
        let rep = Rc::make_mut(&mut self.uf).find(k);
        Rc::make_mut(&mut self.domains).insert(rep.index(), merged);
        Ok(())
    }

    pub fn domain_of(&mut self, v: Var) -> Option<Domain> {
        let rep = self.representative_of(v)?;
        self.domains.get(&rep.index()).cloned()
    }

    /// Bridges §4.9 "On `unify(v, atom)` for an FD-attributed variable":
    /// narrows the domain to the singleton `atom` if it is a member,
    /// otherwise fails the branch.
    pub fn bind_to_value(&mut self, v: Var, value: i64) -> Result<(), ()> {
        match self.domain_of(v) {
            None => Ok(()),
            Some(d) => {
                if d.contains(value) {
                    self.attach(v, Domain::singleton(value))
                } else {
                    Err(())
                }
            }
        }
    }

    /// Bridges §4.9 "On `unify(v, w)` where both carry FD domains":
    /// intersects the domains, fails if empty, otherwise unions the
    /// union-find classes and attaches the intersection to the survivor.
    pub fn unify_attributed(&mut self, a: Var, b: Var) -> Result<(), ()> {
        let (da, db) = (self.domain_of(a), self.domain_of(b));
        match (da, db) {
            (None, None) => Ok(()),
            (Some(d), None) => self.attach(b, d),
            (None, Some(d)) => self.attach(a, d),
            (Some(da), Some(db)) => {
                let intersection = da.intersect(&db);
                if intersection.is_empty() {
                    return Err(());
                }
                let ka = self.key_of(a);
                let kb = self.key_of(b);
                Rc::make_mut(&mut self.uf).union(ka, kb);
                let rep = Rc::make_mut(&mut self.uf).find(ka);
                Rc::make_mut(&mut self.domains).insert(rep.index(), intersection);
                Ok(())
            }
        }
    }

    pub fn register_propagator(&mut self, p: Rc<dyn Propagator>) -> usize {
        Rc::make_mut(&mut self.propagators).register(p)
    }

    pub fn has_propagators(&self) -> bool {
        !self.propagators.is_empty()
    }

    /// How many registered propagators watch `v` (dom-over-deg).
    pub fn propagator_count(&self, v: Var) -> usize {
        self.propagators.subscriber_count(v)
    }

    /// Runs every registered propagator to fixpoint, returning `Err(())` if
    /// any propagator reports `Violated`.
    pub fn propagate_all(&mut self) -> Result<(), ()> {
        let propagators = Rc::clone(&self.propagators);
        propagators.run_to_fixpoint(self, propagators.all_indices())
    }

    /// Every attributed variable whose domain differs from its domain in
    /// `since`, used both to publish bus invalidation events
    /// and to find newly-singleton variables that must be bound back into
    /// the relational substitution.
    pub fn changed_domains(&mut self, since: &mut UnifiedStore) -> Vec<(Var, Domain)> {
        let ids: Vec<u64> = self.keys.keys().copied().collect();
        let mut out = Vec::new();
        for var_id in ids {
            let v = Var::from_id(var_id);
            let Some(d) = self.domain_of(v) else {
                continue;
            };
            let unchanged = since.domain_of(v).as_ref() == Some(&d);
            if !unchanged {
                out.push((v, d));
            }
        }
        out
    }
}

impl PropagationContext for UnifiedStore {
    fn domain(&mut self, v: Var) -> Domain {
        self.domain_of(v)
        .unwrap_or_else(|| Domain::range(i64::MIN / 4, i64::MAX / 4))
    }

    fn narrow(&mut self, v: Var, new_domain: Domain) -> Result<Option<DomainEvent>, ()> {
        let before = self.domain(v);
        if new_domain.is_empty() {
            return Err(());
        }
        if new_domain == before {
            return Ok(None);
        }
        self.attach(v, new_domain.clone())?;
        Ok(new_domain.events_since(&before))
    }
}
