//! The local constraint store.
//!
//! Holds posted non-unification constraints -- `neq`, `absento`, `symbolo`,
//! `numbero` -- and re-examines every constraint touching an affected
//! variable after each binding extension. Posting before or after the
//! binding that triggers the check yields identical success/failure,
//! which falls directly out of always running the full sweep and
//! making `post` equivalent to an immediate `check` when every variable
//! involved is already ground.

pub mod bus;

use rkanren_ir::{Atom, Substitution, Term, Var};
use std::fmt;
use std::rc::Rc;

/// A constraint's current status against a substitution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Entailed,
    Violated,
    Pending,
}

pub trait Constraint: fmt::Debug {
    /// Variables this constraint reads; the store only rechecks a
    /// constraint when one of these was just bound.
    fn vars(&self) -> Vec<Var>;

    fn check(&self, subst: &Substitution) -> Outcome;
}

#[derive(Debug)]
struct Neq {
    t1: Term,
    t2: Term,
}

impl Constraint for Neq {
    fn vars(&self) -> Vec<Var> {
        term_vars(&self.t1).chain(term_vars(&self.t2)).collect()
    }

    fn check(&self, subst: &Substitution) -> Outcome {
        let w1 = subst.walk_star(&self.t1);
        let w2 = subst.walk_star(&self.t2);
        if !has_var(&w1) && !has_var(&w2) {
            return if w1 == w2 {
                Outcome::Violated
            } else {
                Outcome::Entailed
            };
        }
        // At least one side still has an unbound variable: `t1 != t2`
        // cannot yet be entailed or violated except in the case where the
        // walked shapes already provably differ (e.g. different atoms at
        // the same structural position, or different list lengths).
        if structurally_incompatible(&w1, &w2) {
            Outcome::Entailed
        } else {
            Outcome::Pending
        }
    }
}

#[derive(Debug)]
struct Absento {
    needle: Term,
    haystack: Term,
}

impl Constraint for Absento {
    fn vars(&self) -> Vec<Var> {
        term_vars(&self.needle).chain(term_vars(&self.haystack)).collect()
    }

    fn check(&self, subst: &Substitution) -> Outcome {
        let needle = subst.walk_star(&self.needle);
        let haystack = subst.walk_star(&self.haystack);
        if has_var(&needle) {
            return Outcome::Pending;
        }
        if occurs_as_subterm(&needle, &haystack) {
            return Outcome::Violated;
        }
        if has_var(&haystack) {
            Outcome::Pending
        } else {
            Outcome::Entailed
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum TypeKind {
    Symbol,
    Number,
}

#[derive(Debug)]
struct TypeOf {
    var: Var,
    kind: TypeKind,
}

impl Constraint for TypeOf {
    fn vars(&self) -> Vec<Var> {
        vec![self.var]
    }

    fn check(&self, subst: &Substitution) -> Outcome {
        match subst.walk(&Term::Var(self.var)) {
            Term::Var(_) => Outcome::Pending,
            Term::Atom(Atom::Symbol(_)) if matches!(self.kind, TypeKind::Symbol) => Outcome::Entailed,
            Term::Atom(Atom::Int(_)) | Term::Atom(Atom::Rational(..))
            if matches!(self.kind, TypeKind::Number) =>
            {
                Outcome::Entailed
            }
            _ => Outcome::Violated,
        }
    }
}

fn term_vars(t: &Term) -> std::vec::IntoIter<Var> {
    fn go(t: &Term, out: &mut Vec<Var>) {
        match t {
            Term::Var(v) => out.push(*v),
            Term::Pair(a, d) => {
                go(a, out);
                go(d, out);
            }
            _ => {}
        }
    }
    let mut out = Vec::new();
    go(t, &mut out);
    out.into_iter()
}

/// True if `t` (already walked) contains no unbound variable. Exposed for
/// `goal::project`'s groundness check (requires each `var` to
/// be ground).
pub fn is_ground(t: &Term) -> bool {
    !has_var(t)
}

fn has_var(t: &Term) -> bool {
    match t {
        Term::Var(_) => true,
        Term::Pair(a, d) => has_var(a) || has_var(d),
        _ => false,
    }
}

fn occurs_as_subterm(needle: &Term, haystack: &Term) -> bool {
    if needle == haystack {
        return true;
    }
    match haystack {
        Term::Pair(a, d) => occurs_as_subterm(needle, a) || occurs_as_subterm(needle, d),
        _ => false,
    }
}

/// True if `a` and `b` can never unify regardless of how their variables
/// are eventually bound (different atoms, or one is `Nil`/pair and the
/// other is an incompatible shape).
fn structurally_incompatible(a: &Term, b: &Term) -> bool {
    match (a, b) {
        (Term::Var(_), _) | (_, Term::Var(_)) => false,
        (Term::Nil, Term::Nil) => false,
        (Term::Atom(x), Term::Atom(y)) => x != y,
        (Term::Pair(a1, d1), Term::Pair(a2, d2)) => {
            structurally_incompatible(a1, a2) || structurally_incompatible(d1, d2)
        }
        _ => true,
    }
}

/// The per-branch constraint store.
///
/// Cloning is `Rc`-cheap: every non-deterministic branch point clones the
/// store, and the clone only diverges from its sibling once one of them
/// posts or retires a constraint.
#[derive(Clone, Debug, Default)]
pub struct ConstraintStore {
    constraints: Rc<Vec<Rc<dyn Constraint>>>,
}

impl ConstraintStore {
    pub fn new() -> ConstraintStore {
        ConstraintStore::default()
    }

    pub fn neq(t1: Term, t2: Term) -> Rc<dyn Constraint> {
        Rc::new(Neq { t1, t2 })
    }

    pub fn absento(needle: Term, haystack: Term) -> Rc<dyn Constraint> {
        Rc::new(Absento { needle, haystack })
    }

    pub fn symbolo(v: Var) -> Rc<dyn Constraint> {
        Rc::new(TypeOf {
                var: v,
                kind: TypeKind::Symbol,
        })
    }

    pub fn numbero(v: Var) -> Rc<dyn Constraint> {
        Rc::new(TypeOf {
                var: v,
                kind: TypeKind::Number,
        })
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Posts a constraint, immediately checking it against `subst`
    /// (equivalent to `check(c)` if all variables are already ground).
    /// Returns `Err(())` if the constraint is violated outright.
    pub fn post(&mut self, c: Rc<dyn Constraint>, subst: &Substitution) -> Result<(), ()> {
        match c.check(subst) {
            Outcome::Violated => Err(()),
            Outcome::Entailed => Ok(()),
            Outcome::Pending => {
                Rc::make_mut(&mut self.constraints).push(c);
                Ok(())
            }
        }
    }

    /// Re-examines every constraint that touches a variable in `touched`
    /// (re‑examines constraints referencing any variable on
    /// the affected walk chain), dropping entailed ones and failing on
    /// the first violation.
    pub fn recheck(&mut self, subst: &Substitution, touched: &[Var]) -> Result<(), ()> {
        if self.constraints.is_empty() || touched.is_empty() {
            return Ok(());
        }
        let touched_ids: std::collections::HashSet<u64> = touched.iter().map(|v| v.id).collect();
        let mut keep = Vec::with_capacity(self.constraints.len());
        for c in self.constraints.iter() {
            let relevant = c.vars().iter().any(|v| touched_ids.contains(&v.id));
            if !relevant {
                keep.push(Rc::clone(c));
                continue;
            }
            match c.check(subst) {
                Outcome::Violated => return Err(()),
                Outcome::Entailed => {}
                Outcome::Pending => keep.push(Rc::clone(c)),
            }
        }
        *Rc::make_mut(&mut self.constraints) = keep;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rkanren_ir::unify;

    #[test]
    fn neq_entailed_on_disequal_ground_terms() {
        let s = Substitution::new();
        let mut store = ConstraintStore::new();
        store
        .post(ConstraintStore::neq(Term::int(1), Term::int(2)), &s)
        .unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn neq_violated_on_equal_ground_terms_fails() {
        let s = Substitution::new();
        let mut store = ConstraintStore::new();
        assert!(store
            .post(ConstraintStore::neq(Term::int(1), Term::int(1)), &s)
            .is_err());
    }

    #[test]
    fn neq_pending_then_violated_after_binding() {
        rkanren_ir::reset_var_counter();
        let x = Var::fresh();
        let s = Substitution::new();
        let mut store = ConstraintStore::new();
        store
        .post(ConstraintStore::neq(Term::Var(x), Term::int(1)), &s)
        .unwrap();
        assert_eq!(store.len(), 1);
        let s2 = unify(&Term::Var(x), &Term::int(1), &s).unwrap();
        assert!(store.recheck(&s2, &[x]).is_err());
    }

    #[test]
    fn neq_pending_then_entailed_after_disequal_binding() {
        rkanren_ir::reset_var_counter();
        let x = Var::fresh();
        let s = Substitution::new();
        let mut store = ConstraintStore::new();
        store
        .post(ConstraintStore::neq(Term::Var(x), Term::int(1)), &s)
        .unwrap();
        let s2 = unify(&Term::Var(x), &Term::int(2), &s).unwrap();
        store.recheck(&s2, &[x]).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn order_independence_symbolo_then_eq_matches_eq_then_symbolo() {
        rkanren_ir::reset_var_counter();
        let q = Var::fresh();
        let s = Substitution::new();

        let mut store_a = ConstraintStore::new();
        store_a.post(ConstraintStore::symbolo(q), &s).unwrap();
        let s_a = unify(&Term::Var(q), &Term::symbol("test"), &s).unwrap();
        assert!(store_a.recheck(&s_a, &[q]).is_ok());

        let mut store_b = ConstraintStore::new();
        let s_b = unify(&Term::Var(q), &Term::symbol("test"), &s).unwrap();
        store_b.post(ConstraintStore::symbolo(q), &s_b).unwrap();

        assert_eq!(s_a.walk(&Term::Var(q)), s_b.walk(&Term::Var(q)));
        assert!(store_a.is_empty());
        assert!(store_b.is_empty());
    }

    #[test]
    fn absento_violated_when_needle_occurs() {
        let haystack = Term::list(vec![Term::int(1), Term::symbol("x"), Term::int(2)]);
        let s = Substitution::new();
        let mut store = ConstraintStore::new();
        assert!(store
            .post(ConstraintStore::absento(Term::symbol("x"), haystack), &s)
            .is_err());
    }
}
