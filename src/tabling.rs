//! SLG/WFS tabling facade: re-exports `rkanren-slg`'s engine entry
//! points unchanged. There is nothing to adapt here -- the lower layer's
//! signatures already match the embedding API; adding a wrapping layer
//! would only be indirection.

pub use rkanren_slg::{abolish, abolish_all, not_tabled, tabled, wfs_truth};

#[cfg(test)]
mod test {
    use super::*;
    use rkanren_ir::{Term, Var};
    use rkanren_solve::constraint::bus::GlobalConstraintBus;
    use rkanren_solve::state::State;
    use rkanren_solve::eq;
    use rkanren_slg::{NegationPolicy, Truth};
    use std::rc::Rc;

    fn fresh_state() -> State {
        State::new(GlobalConstraintBus::new())
    }

    #[test]
    fn tabled_predicate_answers_can_be_queried_twice() {
        rkanren_ir::reset_var_counter();
        rkanren_slg::reset_engine();
        let id = 9001u64;
        let body: Rc<dyn Fn(Vec<Term>) -> rkanren_solve::Goal> =
        Rc::new(|args: Vec<Term>| eq(args[0].clone(), Term::int(1)));
        let call = tabled(id, move |args| body(args));

        let q = Var::fresh();
        let g1 = call(vec![Term::Var(q)]);
        let outcome1 = rkanren_solve::run::run_all(g1, fresh_state());
        assert_eq!(outcome1.answers.len(), 1);

        let r = Var::fresh();
        let g2 = call(vec![Term::Var(r)]);
        let outcome2 = rkanren_solve::run::run_all(g2, fresh_state());
        assert_eq!(outcome2.answers.len(), 1);
    }

    #[test]
    fn wfs_truth_is_false_for_an_unsatisfiable_tabled_predicate() {
        rkanren_ir::reset_var_counter();
        rkanren_slg::reset_engine();
        let id = 9002u64;
        let body: Rc<dyn Fn(Vec<Term>) -> rkanren_solve::Goal> =
        Rc::new(|args: Vec<Term>| eq(args[0].clone(), Term::int(1)));
        let s = fresh_state();
        let truth = wfs_truth(id, vec![Term::int(2)], &body, &s);
        assert_eq!(truth, Truth::False);
    }

    #[test]
    fn not_tabled_succeeds_when_inner_truth_is_false() {
        rkanren_ir::reset_var_counter();
        rkanren_slg::reset_engine();
        let id = 9003u64;
        let body: Rc<dyn Fn(Vec<Term>) -> rkanren_solve::Goal> =
        Rc::new(|args: Vec<Term>| eq(args[0].clone(), Term::int(1)));
        let g = not_tabled(id, vec![Term::int(2)], Rc::clone(&body), NegationPolicy::FailOnUndefined);
        let outcome = rkanren_solve::run::run_all(g, fresh_state());
        assert_eq!(outcome.answers.len(), 1);
    }

    #[test]
    fn abolish_unknown_predicate_is_a_misuse_error() {
        rkanren_slg::reset_engine();
        assert!(abolish(424242).is_err());
    }
}
