//! Ordinary relational helpers: list/pair relations and the
//! constraint-goal constructors. None of these carry engine semantics of
//! their own -- `membero`/`cons`/`car`/`cdr`/`nullo`/`pairo` are plain
//! relations written against the goal algebra exactly the way a user of
//! the engine would write them, and `neq`/`absento`/`symbolo`/`numbero`
//! are one-line wrappers posting the corresponding `Constraint` through
//! `State::post_constraint`.

use std::rc::Rc;

use rkanren_ir::{Term, Var};
use rkanren_solve::{conj, disj, eq, fresh, Goal};
use rkanren_solve::state::State;
use rkanren_solve::stream::Stream;
use rkanren_solve::ConstraintStore;

/// `membero(x, list)`: `x` is some element of `list`.
pub fn membero(x: Term, list: Term) -> Goal {
    fresh(1, move |vars| {
            let tail = Term::var(vars[0]);
            disj(vec![
                    eq(Term::cons(x.clone(), tail.clone()), list.clone()),
                    conj(vec![
                            cdr(list.clone(), tail.clone()),
                            membero(x.clone(), tail),
                    ]),
            ])
    })
}

/// `cons(a, d, pair)`: `pair` is `(a . d)`.
pub fn cons(a: Term, d: Term, pair: Term) -> Goal {
    eq(Term::cons(a, d), pair)
}

/// `car(pair, a)`: `a` is the head of `pair`.
pub fn car(pair: Term, a: Term) -> Goal {
    fresh(1, move |vars| {
            eq(Term::cons(a.clone(), Term::var(vars[0])), pair.clone())
    })
}

/// `cdr(pair, d)`: `d` is the tail of `pair`.
pub fn cdr(pair: Term, d: Term) -> Goal {
    fresh(1, move |vars| {
            eq(Term::cons(Term::var(vars[0]), d.clone()), pair.clone())
    })
}

/// `nullo(t)`: `t` is the empty list.
pub fn nullo(t: Term) -> Goal {
    eq(t, Term::Nil)
}

/// `pairo(t)`: `t` is a cons pair (of unconstrained car/cdr).
pub fn pairo(t: Term) -> Goal {
    fresh(2, move |vars| {
            eq(Term::cons(Term::var(vars[0]), Term::var(vars[1])), t.clone())
    })
}

fn post(c: Rc<dyn rkanren_solve::Constraint>) -> Goal {
    Rc::new(move |s: State| match s.post_constraint(Rc::clone(&c)) {
            Ok(s2) => Stream::single(s2),
            Err(()) => Stream::empty(),
    })
}

/// `neq(t1, t2)`: `t1` and `t2` may never unify.
pub fn neq(t1: Term, t2: Term) -> Goal {
    post(ConstraintStore::neq(t1, t2))
}

/// `absento(needle, haystack)`: `needle` never occurs as
/// a subterm of `haystack`.
pub fn absento(needle: Term, haystack: Term) -> Goal {
    post(ConstraintStore::absento(needle, haystack))
}

/// `symbolo(v)`: `v` must walk to a symbol atom.
pub fn symbolo(v: Var) -> Goal {
    post(ConstraintStore::symbolo(v))
}

/// `numbero(v)`: `v` must walk to an integer or rational.
pub fn numbero(v: Var) -> Goal {
    post(ConstraintStore::numbero(v))
}

#[cfg(test)]
mod test {
    use super::*;
    use rkanren_solve::run::run_all;
    use rkanren_solve::constraint::bus::GlobalConstraintBus;

    fn fresh_state() -> State {
        State::new(GlobalConstraintBus::new())
    }

    #[test]
    fn membero_finds_every_element() {
        rkanren_ir::reset_var_counter();
        let q = Var::fresh();
        let list = Term::list(vec![Term::int(1), Term::int(2), Term::int(3)]);
        let outcome = run_all(membero(Term::var(q), list), fresh_state());
        let mut values: Vec<i64> = outcome
        .answers
        .iter()
        .map(|s| s.subst.walk(&Term::Var(q)).as_int().unwrap())
        .collect();
        values.sort();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn car_cdr_roundtrip() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let d = Var::fresh();
        let pair = Term::cons(Term::int(1), Term::int(2));
        let g = conj(vec![
                car(pair.clone(), Term::var(a)),
                cdr(pair, Term::var(d)),
        ]);
        let outcome = run_all(g, fresh_state());
        assert_eq!(outcome.answers.len(), 1);
        let s = &outcome.answers[0];
        assert_eq!(s.subst.walk(&Term::Var(a)), Term::int(1));
        assert_eq!(s.subst.walk(&Term::Var(d)), Term::int(2));
    }

    #[test]
    fn nullo_only_matches_nil() {
        rkanren_ir::reset_var_counter();
        assert_eq!(run_all(nullo(Term::Nil), fresh_state()).answers.len(), 1);
        assert!(run_all(nullo(Term::int(1)), fresh_state()).answers.is_empty());
    }

    #[test]
    fn neq_rejects_later_equal_binding() {
        rkanren_ir::reset_var_counter();
        let q = Var::fresh();
        let g = conj(vec![neq(Term::var(q), Term::int(1)), eq(Term::var(q), Term::int(1))]);
        assert!(run_all(g, fresh_state()).answers.is_empty());
    }

    #[test]
    fn symbolo_rejects_numbers() {
        rkanren_ir::reset_var_counter();
        let q = Var::fresh();
        let g = conj(vec![symbolo(q), eq(Term::var(q), Term::int(1))]);
        assert!(run_all(g, fresh_state()).answers.is_empty());
    }
}
