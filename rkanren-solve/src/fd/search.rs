//! FD labeling search and branch-and-bound optimization.
//!
//! Labeling is exposed as an ordinary `Goal`, so it composes with the rest
//! of the goal algebra (`conj` it after a goal that posts the model's
//! propagators, `run`/`run_all` it like any other goal). Each choice
//! point binds the chosen variable to a candidate value and recurses, or
//! narrows the domain to exclude that value and recurses -- a two-branch
//! schema that the recursion naturally turns into full enumeration over
//! a variable's domain.

use rand::Rng;
use rkanren_ir::{Term, Var};
use std::rc::Rc;

use crate::fd::domain::Domain;
use crate::goal::Goal;
use crate::state::State;
use crate::stream::{LazyStream, Stream};
use crate::unified::UnifiedStore;

/// Variable-selection heuristic (Variable ordering is
/// pluggable).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarOrder {
    /// Smallest domain size first, ties broken by position in the
    /// variable list (registration order).
    FirstFail,
    /// Domain size divided by the number of propagators attached to the
    /// variable, smallest first.
    DomOverDeg,
    /// The order the variables were passed in, unchanged.
    Input,
}

/// Value-selection heuristic (Value ordering is pluggable).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValOrder {
    Min,
    Max,
    Bisect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabelingConfig {
    pub var_order: VarOrder,
    pub val_order: ValOrder,
}

impl Default for LabelingConfig {
    fn default() -> LabelingConfig {
        LabelingConfig {
            var_order: VarOrder::FirstFail,
            val_order: ValOrder::Min,
        }
    }
}

fn select_var(vars: &[Var], unified: &mut UnifiedStore, order: VarOrder) -> Option<(Var, Domain)> {
    match order {
        VarOrder::Input => vars.iter().find_map(|&v| {
                let d = unified.domain_of(v)?;
                if d.is_singleton() {
                    None
                } else {
                    Some((v, d))
                }
        }),
        VarOrder::FirstFail => {
            pick_among_ties(vars, unified, |d, _deg| d.size() as f64)
        }
        VarOrder::DomOverDeg => pick_among_ties(vars, unified, |d, deg| d.size() as f64 / deg),
    }
}

/// Scores every non-singleton variable with `score` and returns one of the
/// variables tying for the lowest score, breaking ties uniformly at random
/// rather than always the first one encountered -- a fixed break biases
/// search toward whatever order the caller happened to list variables in,
/// which shows up as a repeatable blind spot across runs of the same
/// model.
fn pick_among_ties(
    vars: &[Var],
    unified: &mut UnifiedStore,
    score: impl Fn(&Domain, f64) -> f64,
) -> Option<(Var, Domain)> {
    let mut best_score = f64::INFINITY;
    let mut candidates: Vec<(Var, Domain)> = Vec::new();
    for &v in vars {
        let Some(d) = unified.domain_of(v) else { continue };
        if d.is_singleton() {
            continue;
        }
        let deg = unified.propagator_count(v).max(1) as f64;
        let s = score(&d, deg);
        if s < best_score {
            best_score = s;
            candidates.clear();
            candidates.push((v, d));
        } else if s == best_score {
            candidates.push((v, d));
        }
    }
    if candidates.len() <= 1 {
        return candidates.pop();
    }
    let i = rand::thread_rng().gen_range(0..candidates.len());
    Some(candidates.swap_remove(i))
}

/// Splits `d` into two disjoint sub-domains whose union is `d`, per the
/// chosen value heuristic (bind... and recurse, or narrow the
/// domain by excluding the value and recurse). For `Min`/`Max` the first
/// branch is a single value and the second is everything else; for
/// `Bisect` both branches are half-ranges.
fn split(d: &Domain, order: ValOrder) -> (Domain, Domain) {
    match order {
        ValOrder::Min => {
            let v = d.min();
            (Domain::singleton(v), d.remove(v))
        }
        ValOrder::Max => {
            let v = d.max();
            (Domain::singleton(v), d.remove(v))
        }
        ValOrder::Bisect => {
            let mid = d.min() + (d.max() - d.min()) / 2;
            (d.remove_above(mid), d.remove_below(mid + 1))
        }
    }
}

/// Builds a labeling goal over `vars`. Variables not carrying
/// an FD attribute, or already singleton, are skipped; the goal succeeds
/// once every labeled variable is bound.
pub fn label(vars: Vec<Var>, config: LabelingConfig) -> Goal {
    let vars = Rc::new(vars);
    Rc::new(move |s: State| label_rec(Rc::clone(&vars), config, s))
}

/// Convenience: labeling with the default (`first-fail`/`min`) heuristic.
pub fn label_default(vars: Vec<Var>) -> Goal {
    label(vars, LabelingConfig::default())
}

fn label_rec(vars: Rc<Vec<Var>>, config: LabelingConfig, s: State) -> Stream<State> {
    let mut unified = s.unified.clone();
    match select_var(&vars, &mut unified, config.var_order) {
        None => {
            log::debug!("labeling complete, every variable singleton");
            Stream::single(s)
        }
        Some((v, d)) => {
            let (branch_a, branch_b) = split(&d, config.val_order);
            log::debug!(
                "labeling {:?} (domain size {}), branching into {:?} / {:?}",
                v,
                d.size(),
                branch_a,
                branch_b
            );
            let a = attach_and_recurse(s.clone(), v, branch_a, Rc::clone(&vars), config);
            let b = attach_and_recurse(s, v, branch_b, vars, config);
            Stream::mplus(a, b)
        }
    }
}

fn attach_and_recurse(
    s: State,
    v: Var,
    d: Domain,
    vars: Rc<Vec<Var>>,
    config: LabelingConfig,
) -> Stream<State> {
    match s.attach_domain(v, d) {
        Ok(s2) => Stream::Lazy(LazyStream::delay(move || label_rec(vars, config, s2))),
        Err(()) => Stream::empty(),
    }
}

/// Optimization sense (Optimization).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sense {
    Min,
    Max,
}

/// Branch-and-bound optimization: `model_state` already has
/// every propagator of the model registered (the caller ran the model's
/// constraint-posting goal up to that point); `objective` and `vars` are
/// FD-attributed. After each solution, the objective's domain is
/// re-narrowed to only values strictly better than the one just found,
/// and search continues from there; returns the last (and therefore
/// optimal) solution found, or `None` if the model has no solution at
/// all.
pub fn optimize(
    model_state: State,
    objective: Var,
    sense: Sense,
    vars: Vec<Var>,
    config: LabelingConfig,
) -> Option<State> {
    let mut best: Option<State> = None;
    let mut current = model_state;
    loop {
        let cancel = current.cancel.clone();
        let goal = label(vars.clone(), config);
        let (mut answers, _more) = goal(current.clone()).take(1, &cancel);
        let Some(candidate) = answers.pop() else {
            break;
        };
        let Some(value) = candidate.subst.walk(&Term::Var(objective)).as_int() else {
            break;
        };
        let tightened = match sense {
            Sense::Min => Domain::range(i64::MIN / 4, value - 1),
            Sense::Max => Domain::range(value + 1, i64::MAX / 4),
        };
        best = Some(candidate);
        match current.attach_domain(objective, tightened) {
            Ok(next) => current = next,
            Err(()) => break,
        }
        if cancel.is_cancelled() {
            break;
        }
    }
    best
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constraint::bus::GlobalConstraintBus;
    use crate::fd::propagators::AllDifferent;
    use crate::stream::CancelToken;
    use std::rc::Rc as StdRc;

    fn fresh_state() -> State {
        State::new(GlobalConstraintBus::new())
    }

    #[test]
    fn labels_two_all_different_variables() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let b = Var::fresh();
        let s0 = fresh_state();
        let s1 = s0.attach_domain(a, Domain::range(1, 2)).unwrap();
        let s2 = s1.attach_domain(b, Domain::range(1, 2)).unwrap();
        let s3 = s2
        .register_propagator(StdRc::new(AllDifferent { vars: vec![a, b] }))
        .unwrap();

        let goal = label_default(vec![a, b]);
        let (solutions, _) = goal(s3).take(0, &CancelToken::new());
        assert_eq!(solutions.len(), 2);
        for s in &solutions {
            let va = s.subst.walk(&Term::Var(a)).as_int().unwrap();
            let vb = s.subst.walk(&Term::Var(b)).as_int().unwrap();
            assert_ne!(va, vb);
        }
    }

    #[test]
    fn bisect_value_order_still_enumerates_every_value() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let s0 = fresh_state();
        let s1 = s0.attach_domain(a, Domain::range(1, 4)).unwrap();
        let goal = label(
            vec![a],
            LabelingConfig {
                var_order: VarOrder::Input,
                val_order: ValOrder::Bisect,
            },
        );
        let (solutions, _) = goal(s1).take(0, &CancelToken::new());
        let mut values: Vec<i64> = solutions
        .iter()
        .map(|s| s.subst.walk(&Term::Var(a)).as_int().unwrap())
        .collect();
        values.sort();
        assert_eq!(values, vec![1, 2, 3, 4]);
    }

    #[test]
    fn optimize_minimizes_objective_under_all_different() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let b = Var::fresh();
        let s0 = fresh_state();
        let s1 = s0.attach_domain(a, Domain::range(1, 3)).unwrap();
        let s2 = s1.attach_domain(b, Domain::range(1, 3)).unwrap();
        let s3 = s2
        .register_propagator(StdRc::new(AllDifferent { vars: vec![a, b] }))
        .unwrap();

        let best = optimize(s3, a, Sense::Min, vec![a, b], LabelingConfig::default());
        let best = best.expect("model has solutions");
        assert_eq!(best.subst.walk(&Term::Var(a)).as_int(), Some(1));
    }
}
