//! Top-level run/optimize facade:
//! wraps `rkanren_solve::run`'s single-threaded drivers and
//! `rkanren_solve::fd::search::optimize`, reifying the query variable(s)
//! before handing results back so callers never need to touch a branch's
//! internal `State`.

use rkanren_ir::{Term, Var};
use rkanren_solve::fd::search::{LabelingConfig, Sense};
use rkanren_solve::run;
use rkanren_solve::state::State;
use rkanren_solve::{EngineConfig, Goal, Reified, RunOutcome};

/// `run(n, query_vars, goal)`: runs `goal` from a fresh state,
/// collecting up to `n` answers (`n == 0` means unbounded), each answer
/// reified as one `Reified` value per entry in `query_vars`.
pub fn run(n: usize, query_vars: &[Var], goal: Goal) -> RunOutcome<Vec<Reified>> {
    reify_outcome(run::run(n, goal, fresh_state()), query_vars)
}

/// `run_all(query_vars, goal)`: `run(0, ...)`.
pub fn run_all(query_vars: &[Var], goal: Goal) -> RunOutcome<Vec<Reified>> {
    reify_outcome(run::run_all(goal, fresh_state()), query_vars)
}

/// `run_with_timeout(config, n, query_vars, goal)`: like
/// `run`, but trips cancellation after `config.default_timeout`.
pub fn run_with_timeout(
    config: &EngineConfig,
    n: usize,
    query_vars: &[Var],
    goal: Goal,
) -> RunOutcome<Vec<Reified>> {
    reify_outcome(run::run_with_timeout(config, n, goal, fresh_state()), query_vars)
}

fn fresh_state() -> State {
    State::new(rkanren_solve::constraint::bus::GlobalConstraintBus::new())
}

fn reify_outcome(outcome: RunOutcome<State>, query_vars: &[Var]) -> RunOutcome<Vec<Reified>> {
    let answers = outcome
    .answers
    .iter()
    .map(|s| run::reify(s, query_vars))
    .collect();
    RunOutcome {
        answers,
        complete: outcome.complete,
    }
}

/// `optimize(model, objective, sense, vars)`:
/// branch-and-bound search over `model` (a goal that posts every
/// propagator the objective depends on), minimizing or maximizing
/// `objective`. `model` is run to its first fixpoint state before search
/// begins; `None` if `model` itself has no solution.
pub fn optimize(model: Goal, objective: Var, sense: Sense, vars: Vec<Var>) -> Option<Vec<Reified>> {
    let cancel = rkanren_solve::CancelToken::new();
    let initial = fresh_state().with_cancel(cancel.clone());
    let (mut states, _more) = model(initial).take(1, &cancel);
    let model_state = states.pop()?;
    let best = rkanren_solve::fd::search::optimize(
        model_state,
        objective,
        sense,
        vars.clone(),
        LabelingConfig::default(),
    )?;
    let mut query = vec![objective];
    query.extend(vars.into_iter().filter(|&v| v != objective));
    Some(run::reify(&best, &query))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fd::{fd_all_different, fd_in_domain};
    use rkanren_solve::{conde, conj, eq};

    #[test]
    fn run_collects_disjunction_answers() {
        rkanren_ir::reset_var_counter();
        let q = Var::fresh();
        let goal = conde(vec![
                vec![eq(Term::Var(q), Term::int(1))],
                vec![eq(Term::Var(q), Term::int(2))],
                vec![eq(Term::Var(q), Term::int(3))],
        ]);
        let outcome = run(5, &[q], goal);
        assert!(outcome.complete);
        assert_eq!(outcome.answers.len(), 3);
    }

    #[test]
    fn optimize_minimizes_under_all_different() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let b = Var::fresh();
        let model = conj(vec![
                fd_in_domain(a, 1, 3).unwrap(),
                fd_in_domain(b, 1, 3).unwrap(),
                fd_all_different(vec![a, b]),
        ]);
        let result = optimize(model, a, Sense::Min, vec![a, b]).expect("has a solution");
        assert_eq!(result[0], Reified::Int(1));
    }
}
