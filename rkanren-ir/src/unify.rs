//! The unifier.
//!
//! This module only performs term-level unification; it knows nothing of
//! constraint stores or finite domains. `rkanren-solve::state` layers
//! constraint re-checking and FD-singleton binding on top of this term
//! algebra.

use crate::subst::{Extension, Substitution};
use crate::term::Term;

/// Failure is a unit type: miniKanren unification either succeeds with an
/// extended substitution or fails outright, there is nothing more to say
/// about *why*.
pub type UnifyResult = Result<Substitution, ()>;

/// Unifies `t1` and `t2` against `s`, returning the extended substitution.
pub fn unify(t1: &Term, t2: &Term, s: &Substitution) -> UnifyResult {
    let mut ext = Extension::new();
    let mut s = s.clone();
    unify_rec(t1, t2, &mut s, &mut ext)?;
    Ok(s)
}

/// As `unify`, but also returns the `Extension` describing exactly which
/// bindings were added, so callers (the constraint store, FD singleton
/// propagation) can react only to what changed.
pub fn unify_ext(t1: &Term, t2: &Term, s: &Substitution) -> Result<(Substitution, Extension), ()> {
    let mut ext = Extension::new();
    let mut s = s.clone();
    unify_rec(t1, t2, &mut s, &mut ext)?;
    Ok((s, ext))
}

/// `membero`/`appendo`-style relations recurse one `Pair` per list
/// element, so a long enough list unified against itself can run this out
/// of native stack; `stacker::maybe_grow` (the same guard chalk-slg takes
/// on its own deep recursions) gives the `Pair` arm headroom to grow the
/// stack instead of overflowing it.
fn unify_rec(t1: &Term, t2: &Term, s: &mut Substitution, ext: &mut Extension) -> Result<(), ()> {
    let w1 = s.walk(t1);
    let w2 = s.walk(t2);
    match (&w1, &w2) {
        (Term::Var(v1), Term::Var(v2)) if v1 == v2 => Ok(()),
        (Term::Var(v), _) => bind(*v, w2.clone(), s, ext),
        (_, Term::Var(v)) => bind(*v, w1.clone(), s, ext),
        (Term::Pair(a1, d1), Term::Pair(a2, d2)) => {
            stacker::maybe_grow(32 * 1024, 1024 * 1024, || {
                    unify_rec(a1, a2, s, ext)?;
                    unify_rec(d1, d2, s, ext)
            })
        }
        (Term::Nil, Term::Nil) => Ok(()),
        (Term::Atom(a1), Term::Atom(a2)) => {
            if a1 == a2 {
                Ok(())
            } else {
                Err(())
            }
        }
        _ => Err(()),
    }
}

fn bind(v: crate::term::Var, t: Term, s: &mut Substitution, ext: &mut Extension) -> Result<(), ()> {
    if s.occurs(v, &t) {
        return Err(());
    }
    s.extend(v, t.clone());
    ext.push(v, t);
    Ok(())
}
