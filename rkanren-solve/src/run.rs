//! Search drivers: `run`/`run_all`/`run_with_timeout`, reification, and the
//! parallel-branch driver behind them.
//!
//! A branch's `State` is built on `Rc` throughout, so `State`, `Term`,
//! and `Goal` are not `Send` and a worker pool can never hand a live
//! branch to another OS thread mid flight. What a pool *can* do is run
//! independent top-level alternatives to completion entirely on their
//! own thread, each with its own from-scratch `State`, and hand back
//! only the reified (plain, thread-safe) answer once a branch finishes --
//! no `Rc` ever crosses a thread boundary. `run_branches_parallel` is
//! that: a worker pool over independent branch closures, answers drained
//! through a bounded channel so a slow consumer applies backpressure to
//! producers.
//!
//! Ordinary `run`/`run_all`/`run_with_timeout` stay single-threaded.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rkanren_ir::{Atom, Term, Var};

use crate::constraint::bus::GlobalConstraintBus;
use crate::error::RunOutcome;
use crate::goal::Goal;
use crate::state::State;
use crate::stream::{CancelToken, Stream};

/// Worker-pool sizing, default timeout, and channel backpressure knobs.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Concurrently running branches in `run_branches_parallel`. Defaults
    /// to the host's hardware concurrency.
    pub workers: usize,
    /// Applied by `run_with_timeout` when the caller passes no
    /// per-call override; `None` means "no default, block until done".
    pub default_timeout: Option<Duration>,
    /// Bounded channel capacity between branch producers and the
    /// collecting thread.
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            workers: num_cpus::get().max(1),
            default_timeout: None,
            channel_capacity: 64,
        }
    }
}

/// A reified term: plain, `Send`-safe data with no `Rc`, suitable for
/// crossing a thread boundary or handing to a caller outside the engine.
/// Residual entries (variables that remain constrained but not ground)
/// carry a human-readable description rather than the constraint data
/// itself, since the constraints that produced them are `Rc`-based and
/// branch-local.
///
/// `Serialize`/`Deserialize` are derived behind the `serde` feature so an
/// embedder can hand answers to a caller across a process boundary (a
/// REPL, a web frontend) without writing its own encoding.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Reified {
    Int(i64),
    Rational(i64, i64),
    Bool(bool),
    Str(String),
    Symbol(String),
    Nil,
    Pair(Box<Reified>, Box<Reified>),
    Residual { var_id: u64, description: String },
}

impl Reified {
    /// Reconstructs an (`Rc`-based) `Term` from a reified value. Residual
    /// entries come back as the same variable id they were reified from,
    /// unbound -- reattaching the original constraints is out of scope
    /// once they've crossed a reification boundary.
    pub fn into_term(self) -> Term {
        match self {
            Reified::Int(n) => Term::int(n),
            Reified::Rational(n, d) => Term::Atom(Atom::rational(n, d)),
            Reified::Bool(b) => Term::Atom(Atom::Bool(b)),
            Reified::Str(s) => Term::from(s.as_str()),
            Reified::Symbol(s) => Term::symbol(&s),
            Reified::Nil => Term::Nil,
            Reified::Pair(car, cdr) => Term::cons(car.into_term(), cdr.into_term()),
            Reified::Residual { var_id, .. } => Term::var(Var::from_id(var_id)),
        }
    }
}

/// Reifies every variable in `vars` against `state`, one entry per
/// variable, in the order requested.
pub fn reify(state: &State, vars: &[Var]) -> Vec<Reified> {
    vars.iter().map(|&v| reify_one(state, v)).collect()
}

fn reify_one(state: &State, v: Var) -> Reified {
    reify_term(state, &state.subst.walk_star(&Term::Var(v)))
}

fn reify_term(state: &State, t: &Term) -> Reified {
    match t {
        Term::Atom(Atom::Int(n)) => Reified::Int(*n),
        Term::Atom(Atom::Rational(n, d)) => Reified::Rational(*n, *d),
        Term::Atom(Atom::Bool(b)) => Reified::Bool(*b),
        Term::Atom(Atom::Str(s)) => Reified::Str(s.to_string()),
        Term::Atom(Atom::Symbol(s)) => Reified::Symbol(s.as_str().to_string()),
        Term::Nil => Reified::Nil,
        Term::Pair(car, cdr) => Reified::Pair(
            Box::new(reify_term(state, car)),
            Box::new(reify_term(state, cdr)),
        ),
        Term::Var(v) => {
            let mut unified = state.unified.clone();
            let description = match unified.domain_of(*v) {
                Some(d) if d.is_singleton() => format!("{}", d.min()),
                Some(d) => format!("dom({}..{})", d.min(), d.max()),
                None => "unbound".to_string(),
            };
            Reified::Residual {
                var_id: v.id,
                description,
            }
        }
    }
}

/// Runs `goal` against `initial`, collecting up to `n` answers (`n == 0`
/// means unbounded -- `run_all`'s case). `initial.cancel` is honored at
/// every suspension point; `RunOutcome::complete` is false only if that
/// token was observed tripped, never merely because `n` was satisfied.
pub fn run(n: usize, goal: Goal, initial: State) -> RunOutcome<State> {
    let cancel = initial.cancel.clone();
    let (answers, _more) = goal(initial).take(n, &cancel);
    if cancel.is_cancelled() {
        RunOutcome::partial(answers)
    } else {
        RunOutcome::complete(answers)
    }
}

pub fn run_all(goal: Goal, initial: State) -> RunOutcome<State> {
    run(0, goal, initial)
}

/// Like `run`, but trips `initial.cancel` after `config.default_timeout`
/// if the run hasn't finished by then. With no configured timeout this
/// is exactly `run`.
pub fn run_with_timeout(config: &EngineConfig, n: usize, goal: Goal, initial: State) -> RunOutcome<State> {
    let Some(timeout) = config.default_timeout else {
        return run(n, goal, initial);
    };
    let cancel = initial.cancel.clone();
    let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
    let timer_cancel = cancel.clone();
    let timer = thread::spawn(move || {
        crossbeam_channel::select! {
            recv(crossbeam_channel::after(timeout)) -> _ => timer_cancel.cancel(),
            recv(done_rx) -> _ => {}
        }
    });
    let (answers, _more) = goal(initial).take(n, &cancel);
    let _ = done_tx.send(());
    let _ = timer.join();
    if cancel.is_cancelled() {
        RunOutcome::partial(answers)
    } else {
        RunOutcome::complete(answers)
    }
}

/// A bounded counting semaphore gating how many branch threads run
/// `run_branches_parallel`'s work concurrently, built on `parking_lot`'s
/// `Mutex`/`Condvar` pair instead of a busy spin loop.
struct Semaphore {
    count: Mutex<usize>,
    cvar: Condvar,
}

impl Semaphore {
    fn new(n: usize) -> Semaphore {
        Semaphore {
            count: Mutex::new(n),
            cvar: Condvar::new(),
        }
    }

    fn acquire(&self) {
        let mut count = self.count.lock();
        while *count == 0 {
            self.cvar.wait(&mut count);
        }
        *count -= 1;
    }

    fn release(&self) {
        *self.count.lock() += 1;
        self.cvar.notify_one();
    }
}

/// Drains `stream` into `tx`, one reified answer at a time, stopping at
/// `limit` answers (`0` = unbounded) or cancellation. `tx.send` blocking
/// on a full channel *is* the backpressure: a branch that produces
/// faster than the collector consumes simply pauses here.
fn stream_to_channel(
    mut stream: Stream<State>,
    tx: &crossbeam_channel::Sender<Reified>,
    q: Var,
    cancel: &CancelToken,
    limit: usize,
) {
    let mut produced = 0usize;
    loop {
        if cancel.is_cancelled() {
            return;
        }
        if limit != 0 && produced >= limit {
            return;
        }
        match stream {
            Stream::Empty => return,
            Stream::Unit(head, tail) => {
                if tx.send(reify_one(&head, q)).is_err() {
                    return;
                }
                produced += 1;
                stream = *tail;
            }
            Stream::Lazy(thunk) => {
                stream = thunk.force();
            }
        }
    }
}

/// Runs each of `branches` to completion on its own OS thread, drawn
/// from a pool bounded by `config.workers`. Each branch gets a fresh
/// query variable and a from-scratch `State` sharing only `bus` (already
/// `Arc`/lock-based, so genuinely shared) and a fresh cancellation token
/// common to the whole call. Collects up to `n` reified answers (`0` =
/// unbounded) in whatever order they arrive -- a fair interleave across
/// branches is not guaranteed under real OS scheduling, only that every
/// produced answer eventually arrives unless the collector stops early.
pub fn run_branches_parallel<F>(
    config: &EngineConfig,
    n: usize,
    bus: GlobalConstraintBus,
    branches: Vec<F>,
) -> RunOutcome<Reified>
where
    F: Fn(Var) -> Goal + Send + Sync + 'static,
{
    let cancel = CancelToken::new();
    let (tx, rx) = crossbeam_channel::bounded::<Reified>(config.channel_capacity);
    let gate = Arc::new(Semaphore::new(config.workers.max(1)));

    thread::scope(|scope| {
        for branch in branches {
            let tx = tx.clone();
            let bus = bus.clone();
            let cancel = cancel.clone();
            let gate = Arc::clone(&gate);
            scope.spawn(move || {
                gate.acquire();
                let q = Var::fresh();
                let goal = branch(q);
                let state = State::new(bus).with_cancel(cancel.clone());
                stream_to_channel(goal(state), &tx, q, &cancel, n);
                gate.release();
            });
        }
        drop(tx);

        let mut out = Vec::new();
        for reified in rx.iter() {
            out.push(reified);
            if n != 0 && out.len() >= n {
                break;
            }
        }
        if cancel.is_cancelled() {
            RunOutcome::partial(out)
        } else {
            RunOutcome::complete(out)
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::goal::{conde, eq};

    fn fresh_state() -> State {
        State::new(GlobalConstraintBus::new())
    }

    #[test]
    fn run_collects_bounded_answers_and_reports_complete() {
        rkanren_ir::reset_var_counter();
        let q = Var::fresh();
        let goal = conde(vec![
            vec![eq(Term::Var(q), Term::int(1))],
            vec![eq(Term::Var(q), Term::int(2))],
            vec![eq(Term::Var(q), Term::int(3))],
        ]);
        let outcome = run(5, goal, fresh_state());
        assert!(outcome.complete);
        let values: Vec<i64> = outcome
            .answers
            .iter()
            .map(|s| s.subst.walk(&Term::Var(q)).as_int().unwrap())
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn reify_reports_ground_and_residual_entries() {
        rkanren_ir::reset_var_counter();
        let q = Var::fresh();
        let r = Var::fresh();
        let s = fresh_state().unify(&Term::Var(q), &Term::int(9)).unwrap();
        let reified = reify(&s, &[q, r]);
        assert_eq!(reified[0], Reified::Int(9));
        assert!(matches!(reified[1], Reified::Residual { .. }));
    }

    #[test]
    fn run_with_timeout_with_no_configured_timeout_behaves_like_run() {
        rkanren_ir::reset_var_counter();
        let q = Var::fresh();
        let goal = eq(Term::Var(q), Term::int(1));
        let config = EngineConfig {
            default_timeout: None,
            ..EngineConfig::default()
        };
        let outcome = run_with_timeout(&config, 1, goal, fresh_state());
        assert!(outcome.complete);
        assert_eq!(outcome.answers.len(), 1);
    }

    #[test]
    fn run_with_timeout_trips_on_a_diverging_goal() {
        rkanren_ir::reset_var_counter();
        fn spin(s: State) -> Stream<State> {
            if s.cancel.is_cancelled() {
                return Stream::Empty;
            }
            Stream::Lazy(crate::stream::LazyStream::delay(move || spin(s)))
        }
        let goal: Goal = std::rc::Rc::new(spin);
        let config = EngineConfig {
            default_timeout: Some(Duration::from_millis(20)),
            ..EngineConfig::default()
        };
        let outcome = run_with_timeout(&config, 0, goal, fresh_state());
        assert!(!outcome.complete);
        assert!(outcome.answers.is_empty());
    }

    #[test]
    fn run_branches_parallel_collects_every_branch_answer() {
        rkanren_ir::reset_var_counter();
        let config = EngineConfig::default();
        let branches: Vec<Box<dyn Fn(Var) -> Goal + Send + Sync>> = vec![
            Box::new(|q: Var| eq(Term::Var(q), Term::int(1))),
            Box::new(|q: Var| eq(Term::Var(q), Term::int(2))),
            Box::new(|q: Var| eq(Term::Var(q), Term::int(3))),
        ];
        let outcome = run_branches_parallel(&config, 0, GlobalConstraintBus::new(), branches);
        assert!(outcome.complete);
        let mut values: Vec<i64> = outcome
            .answers
            .into_iter()
            .map(|r| match r {
                Reified::Int(n) => n,
                other => panic!("expected an int, got {:?}", other),
            })
            .collect();
        values.sort();
        assert_eq!(values, vec![1, 2, 3]);
    }
}
