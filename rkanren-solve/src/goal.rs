//! The goal algebra.
//!
//! A goal is a function `State -> Stream<State>`, represented as a single
//! `Rc<dyn Fn>` trait object rather than an enum over combinator shapes --
//! fairness is handled uniformly by `Stream::mplus`, so there is no need
//! for separate BFS/DFS goal variants.

use rkanren_ir::{Term, Var};
use std::rc::Rc;

use crate::state::State;
use crate::stream::Stream;

pub type Goal = Rc<dyn Fn(State) -> Stream<State>>;

pub fn succeed() -> Goal {
    Rc::new(|s: State| Stream::single(s))
}

pub fn fail() -> Goal {
    Rc::new(|_s: State| Stream::empty())
}

/// `eq(t1, t2)`: unifies, yielding 0 or 1 answers.
pub fn eq(t1: Term, t2: Term) -> Goal {
    Rc::new(move |s: State| match s.unify(&t1, &t2) {
            Ok(s2) => Stream::single(s2),
            Err(()) => Stream::empty(),
    })
}

/// `conj(g1, g2)`: `bind(run(g1), g2)`.
pub fn conj2(g1: Goal, g2: Goal) -> Goal {
    Rc::new(move |s: State| {
            let g2 = Rc::clone(&g2);
            Stream::bind(g1(s), Rc::new(move |s2: State| g2(s2)))
    })
}

/// `conj` over any number of goals, left-to-right; `conj([])` is `succeed`.
pub fn conj(goals: Vec<Goal>) -> Goal {
    goals
    .into_iter()
    .fold(succeed(), |acc, g| conj2(acc, g))
}

/// `disj(g1, g2)`: fair `mplus` of running each.
pub fn disj2(g1: Goal, g2: Goal) -> Goal {
    Rc::new(move |s: State| Stream::mplus(g1(s.clone()), g2(s)))
}

/// `disj` over any number of goals; `disj([])` is `fail`.
pub fn disj(goals: Vec<Goal>) -> Goal {
    goals.into_iter().fold(fail(), |acc, g| disj2(acc, g))
}

/// `conde(clauses)`: disjunction of conjunctions.
pub fn conde(clauses: Vec<Vec<Goal>>) -> Goal {
    disj(clauses.into_iter().map(conj).collect())
}

/// `fresh(n, body)`: allocates `n` fresh variables and runs `body` on them.
/// `body` receives the variables in allocation order.
pub fn fresh<F>(n: usize, body: F) -> Goal
where
F: Fn(Vec<Var>) -> Goal + 'static,
{
    Rc::new(move |s: State| {
            let vars: Vec<Var> = (0..n).map(|_| Var::fresh()).collect();
            body(vars)(s)
    })
}

/// `onceo(g)`: keeps at most the first answer. Forces the
/// inner stream eagerly up to one element -- the only way to know there
/// *is* a first answer is to produce it -- honoring `s.cancel` at that
/// suspension point.
pub fn onceo(g: Goal) -> Goal {
    Rc::new(move |s: State| {
            let cancel = s.cancel.clone();
            let (mut answers, _more) = g(s).take(1, &cancel);
            match answers.pop() {
                Some(s2) => Stream::single(s2),
                None => Stream::empty(),
            }
    })
}

/// `conda(clauses)`: committed choice. Each clause is `(head, body)`; the
/// first clause whose `head` succeeds at least once commits to `body` run
/// against *every* answer the head produced -- other clauses are never
/// tried. Failure of the committed clause's body fails the whole `conda`.
/// This, and `condu`, are the only operators that break logical purity.
pub fn conda(clauses: Vec<(Goal, Goal)>) -> Goal {
    Rc::new(move |s: State| conda_rec(&clauses, 0, s))
}

fn conda_rec(clauses: &[(Goal, Goal)], i: usize, s: State) -> Stream<State> {
    if i >= clauses.len() {
        return Stream::empty();
    }
    let (head, body) = &clauses[i];
    let head_answers = head(s.clone());
    let (first, more_states) = peel_first(head_answers);
    match first {
        None => {
            if i + 1 >= clauses.len() {
                Stream::empty()
            } else {
                let rest = clauses[i + 1..].to_vec();
                conda_rec(&rest, 0, s)
            }
        }
        Some(s1) => {
            let body = Rc::clone(body);
            Stream::bind(
                Stream::cons(s1, more_states),
                Rc::new(move |s2| body(s2)),
            )
        }
    }
}

/// `condu(clauses)`: like `conda` but also cuts the head to a single
/// answer.
pub fn condu(clauses: Vec<(Goal, Goal)>) -> Goal {
    Rc::new(move |s: State| condu_rec(&clauses, 0, s))
}

fn condu_rec(clauses: &[(Goal, Goal)], i: usize, s: State) -> Stream<State> {
    if i >= clauses.len() {
        return Stream::empty();
    }
    let (head, body) = &clauses[i];
    let cancel = s.cancel.clone();
    let (mut answers, _more) = head(s.clone()).take(1, &cancel);
    match answers.pop() {
        None => {
            if i + 1 >= clauses.len() {
                Stream::empty()
            } else {
                condu_rec(clauses, i + 1, s)
            }
        }
        Some(s1) => body(s1),
    }
}

/// Splits a stream into its first mature element (if any is reachable by
/// forcing) and the (possibly still lazy) remainder, without discarding
/// later answers -- used by `conda`, which must commit to the head having
/// *an* answer while still letting the body see every answer it produced.
fn peel_first(s: Stream<State>) -> (Option<State>, Stream<State>) {
    match s {
        Stream::Empty => (None, Stream::Empty),
        Stream::Unit(head, tail) => (Some(*head), *tail),
        Stream::Lazy(thunk) => {
            stacker::maybe_grow(32 * 1024, 1024 * 1024, || peel_first(thunk.force()))
        }
    }
}

/// `project(vars, f)`: requires each variable to be ground, then runs
/// `f` on their walked values. Fails if any variable is not ground.
///
/// Groundness can only be known once the branch reaches this goal, not
/// before the run begins, so unlike `fd_in_domain`'s eager
/// `Result<Goal, MisuseError>` this surfaces as an ordinary branch
/// failure rather than a typed error -- there is no point in the
/// `Goal = Fn(State) -> Stream<State>` signature to carry one out to.
pub fn project<F>(vars: Vec<Var>, f: F) -> Goal
where
F: Fn(Vec<Term>) -> Goal + 'static,
{
    Rc::new(move |s: State| {
            let mut grounded = Vec::with_capacity(vars.len());
            for v in &vars {
                let w = s.subst.walk_star(&Term::Var(*v));
                if !crate::constraint::is_ground(&w) {
                    log::debug!("project() on non-ground variable {:?}, failing branch", v);
                    return Stream::empty();
                }
                grounded.push(w);
            }
            f(grounded)(s)
    })
}
