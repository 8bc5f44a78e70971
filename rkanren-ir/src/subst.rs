//! Substitutions: immutable variable-to-term maps with clone-on-write
//! extension (Substitution).

use crate::term::{Term, Var};
use std::collections::HashMap;
use std::rc::Rc;

/// A substitution mapping variable ids to terms.
///
/// Extension is modelled with an `Rc<HashMap<..>>` that is cloned only
/// when shared (`Rc::make_mut`), so a branch that owns its substitution
/// uniquely extends it in place, while a substitution still referenced by
/// a sibling branch is copied first. This gives the "extension returns a
/// new substitution that logically contains the old plus one binding"
/// contract without paying an allocation on every single-owner branch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Substitution {
    bindings: Rc<HashMap<u64, Term>>,
}

/// The set of bindings added by one call to `bind`/`unify`, in insertion
/// order. Used by the constraint store to know which variables
/// were "just further constrained" and need their pending constraints
/// re-checked.
#[derive(Clone, Debug, Default)]
pub struct Extension {
    added: Vec<(Var, Term)>,
}

impl Extension {
    pub fn new() -> Extension {
        Extension::default()
    }

    pub fn push(&mut self, v: Var, t: Term) {
        self.added.push((v, t));
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Var, Term)> {
        self.added.iter()
    }

    pub fn vars(&self) -> impl Iterator<Item = Var> + '_ {
        self.added.iter().map(|(v, _)| *v)
    }
}

impl Substitution {
    pub fn new() -> Substitution {
        Substitution::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn get(&self, v: Var) -> Option<&Term> {
        self.bindings.get(&v.id)
    }

    /// Extends the substitution with `v -> t`. Panics in debug builds if
    /// `v` is already bound; callers must check `get` first.
    pub fn extend(&mut self, v: Var, t: Term) {
        rkanren_macros::invariant!(
            !self.bindings.contains_key(&v.id),
            "extend called on an already-bound variable {:?}",
            v
        );
        Rc::make_mut(&mut self.bindings).insert(v.id, t);
    }

    /// `walk(t, s)`: follows variable bindings until reaching a
    /// non-variable term or an unbound variable.
    pub fn walk(&self, t: &Term) -> Term {
        let mut current = t.clone();
        loop {
            match current {
                Term::Var(v) => match self.get(v) {
                    Some(next) => current = next.clone(),
                    None => return Term::Var(v),
                },
                other => return other,
            }
        }
    }

    /// `walk*`: recursively walks a term, reconstructing pairs by walking
    /// car and cdr.
    pub fn walk_star(&self, t: &Term) -> Term {
        match self.walk(t) {
            Term::Pair(car, cdr) => {
                Term::cons(self.walk_star(car.as_ref()), self.walk_star(cdr.as_ref()))
            }
            other => other,
        }
    }

    /// Returns true if `v` occurs anywhere in the walked structure of `t`
    /// (occurs check).
    pub fn occurs(&self, v: Var, t: &Term) -> bool {
        match self.walk(t) {
            Term::Var(w) => w == v,
            Term::Pair(car, cdr) => self.occurs(v, car.as_ref()) || self.occurs(v, cdr.as_ref()),
            _ => false,
        }
    }

    /// All variable ids referenced as bound in this substitution. Used to
    /// decide which constraints might be affected by an extension.
    pub fn bound_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.bindings.keys().copied()
    }
}

impl IntoIterator for Substitution {
    type Item = (u64, Term);
    type IntoIter = std::vec::IntoIter<(u64, Term)>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings
        .iter()
        .map(|(k, v)| (*k, v.clone()))
        .collect::<Vec<_>>()
        .into_iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn walk_follows_chain() {
        let a = Var::fresh();
        let b = Var::fresh();
        let mut s = Substitution::new();
        s.extend(a, Term::Var(b));
        s.extend(b, Term::int(5));
        assert_eq!(s.walk(&Term::Var(a)), Term::int(5));
    }

    #[test]
    fn walk_star_reconstructs_pairs() {
        let a = Var::fresh();
        let mut s = Substitution::new();
        s.extend(a, Term::int(1));
        let t = Term::cons(Term::Var(a), Term::Nil);
        assert_eq!(s.walk_star(&t), Term::cons(Term::int(1), Term::Nil));
    }

    #[test]
    fn occurs_check_detects_self_reference() {
        let a = Var::fresh();
        let s = Substitution::new();
        let t = Term::cons(Term::Var(a), Term::Nil);
        assert!(s.occurs(a, &t));
    }

    #[test]
    fn clone_on_write_does_not_mutate_sibling() {
        let a = Var::fresh();
        let mut s1 = Substitution::new();
        s1.extend(a, Term::int(1));
        let mut s2 = s1.clone();
        let b = Var::fresh();
        s2.extend(b, Term::int(2));
        assert!(s1.get(b).is_none());
        assert_eq!(s2.get(a), Some(&Term::int(1)));
    }
}
