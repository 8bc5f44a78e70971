//! Call-pattern normalization (Call processing): `p =
//! normalize(predicate_id, walk*(args))`, with variables renamed
//! consistently so that two calls shaped the same way up to variable
//! identity land on the same `AnswerTable`.

use rkanren_ir::{Term, Var};
use std::collections::HashMap;

/// A canonicalized call: `shape` is `args` with every variable replaced
/// by a placeholder variable numbered by first-appearance order (so it
/// hashes/compares equal across calls that differ only in which concrete
/// variables were passed), and `vars` is the list of *original* variables
/// in that same order -- the table's own fresh copies of these, allocated
/// once per distinct shape, are what the tabling engine actually runs the
/// predicate body against.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CallShape {
    pub pattern: Term,
}

pub fn normalize(args: &[Term]) -> (CallShape, Vec<Var>) {
    let mut mapping: HashMap<u64, u64> = HashMap::new();
    let mut order: Vec<Var> = Vec::new();
    let mut next = 0u64;

    fn go(t: &Term, mapping: &mut HashMap<u64, u64>, order: &mut Vec<Var>, next: &mut u64) -> Term {
        match t {
            Term::Var(v) => {
                let placeholder_id = *mapping.entry(v.id).or_insert_with(|| {
                        order.push(*v);
                        let id = *next;
                        *next += 1;
                        id
                });
                Term::Var(Var::from_id(placeholder_id))
            }
            Term::Pair(car, cdr) => Term::cons(
                go(car, mapping, order, next),
                go(cdr, mapping, order, next),
            ),
            other => other.clone(),
        }
    }

    let shaped: Vec<Term> = args
    .iter()
    .map(|a| go(a, &mut mapping, &mut order, &mut next))
    .collect();
    (
        CallShape {
            pattern: Term::list(shaped),
        },
        order,
    )
}

/// Rewrites every occurrence of a table's pattern variable in `t` to the
/// corresponding term from a specific call's actual arguments -- the
/// translation a cached answer needs before it can be unified into a new
/// caller's state (stream any answers already produced).
pub fn reproject(t: &Term, pattern_vars: &[Var], call_args: &[Term]) -> Term {
    match t {
        Term::Var(v) => match pattern_vars.iter().position(|pv| pv == v) {
            Some(i) => call_args[i].clone(),
            None => t.clone(),
        },
        Term::Pair(car, cdr) => Term::cons(
            reproject(car, pattern_vars, call_args),
            reproject(cdr, pattern_vars, call_args),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rkanren_ir::Term;

    #[test]
    fn calls_with_different_vars_same_shape_normalize_equal() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let b = Var::fresh();
        let c = Var::fresh();
        let d = Var::fresh();
        let (shape1, vars1) = normalize(&[Term::Var(a), Term::Var(b)]);
        let (shape2, vars2) = normalize(&[Term::Var(c), Term::Var(d)]);
        assert_eq!(shape1, shape2);
        assert_eq!(vars1.len(), 2);
        assert_eq!(vars2.len(), 2);
    }

    #[test]
    fn repeated_variable_normalizes_to_repeated_placeholder() {
        rkanren_ir::reset_var_counter();
        let a = Var::fresh();
        let (shape1, _) = normalize(&[Term::Var(a), Term::Var(a)]);
        let b = Var::fresh();
        let c = Var::fresh();
        let (shape2, _) = normalize(&[Term::Var(b), Term::Var(c)]);
        assert_ne!(shape1, shape2);
    }

    #[test]
    fn ground_args_are_unaffected() {
        let (shape1, vars1) = normalize(&[Term::int(1), Term::int(2)]);
        let (shape2, vars2) = normalize(&[Term::int(1), Term::int(2)]);
        assert_eq!(shape1, shape2);
        assert!(vars1.is_empty());
        assert!(vars2.is_empty());
    }

    #[test]
    fn reproject_substitutes_pattern_vars() {
        rkanren_ir::reset_var_counter();
        let p0 = Var::fresh();
        let call_var = Var::fresh();
        let t = Term::cons(Term::Var(p0), Term::int(9));
        let out = reproject(&t, &[p0], &[Term::Var(call_var)]);
        assert_eq!(out, Term::cons(Term::Var(call_var), Term::int(9)));
    }
}
