//! Arithmetic propagators (Arithmetic +,−,×,÷,mod,=):
//! relational and bidirectional -- each enforces bounds consistency on
//! inputs from outputs and vice versa. Integer division and mod truncate
//! toward zero; a divisor domain that is the singleton zero fails the
//! branch outright.

use rkanren_ir::Var;
use std::fmt;

use crate::fd::domain::{Domain, DomainEvent};
use crate::fd::propagator::{PropagationContext, PropagateResult, Propagator};

#[derive(Clone, Copy, Debug)]
pub enum ArithOp {
    Plus,
    Minus,
    Times,
    Div,
    Mod,
    Eq,
}

/// `a <op> b = c` (for `Eq`, `b`/`c` coincide and the constraint is `a = b`).
pub struct Arith {
    pub op: ArithOp,
    pub a: Var,
    pub b: Var,
    pub c: Var,
}

impl fmt::Debug for Arith {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Arith({:?}, {:?}, {:?}, {:?})", self.op, self.a, self.b, self.c)
    }
}

fn mul_bounds(a: &Domain, b: &Domain) -> (i64, i64) {
    let candidates = [
        a.min() * b.min(),
        a.min() * b.max(),
        a.max() * b.min(),
        a.max() * b.max(),
    ];
    (
        *candidates.iter().min().unwrap(),
        *candidates.iter().max().unwrap(),
    )
}

fn truncating_div(a: i64, b: i64) -> i64 {
    a / b
}

fn truncating_rem(a: i64, b: i64) -> i64 {
    a % b
}

/// Bounds on `x` such that `x / d` (truncating division, `lo_d..=hi_d`
/// known non-zero) can land in `target`.
fn div_bounds_by_const(target: &Domain, lo_d: i64, hi_d: i64) -> (i64, i64) {
    let candidates = [
        truncating_div(target.min(), lo_d),
        truncating_div(target.min(), hi_d),
        truncating_div(target.max(), lo_d),
        truncating_div(target.max(), hi_d),
    ];
    (
        *candidates.iter().min().unwrap(),
        *candidates.iter().max().unwrap(),
    )
}

impl Propagator for Arith {
    fn name(&self) -> &'static str {
        "arith"
    }

    fn vars(&self) -> Vec<Var> {
        vec![self.a, self.b, self.c]
    }

    fn wake_on(&self, _v: Var, _event: DomainEvent) -> bool {
        true
    }

    fn propagate(&self, ctx: &mut dyn PropagationContext) -> PropagateResult {
        let da = ctx.domain(self.a);
        let db = ctx.domain(self.b);
        let dc = ctx.domain(self.c);

        let narrows: Vec<(Var, Domain)> = match self.op {
            ArithOp::Eq => {
                let meet = da.intersect(&db);
                if meet.is_empty() {
                    return PropagateResult::Violated;
                }
                vec![(self.a, meet.clone()), (self.b, meet)]
            }
            ArithOp::Plus => {
                // c = a + b
                let c_range = Domain::range(da.min() + db.min(), da.max() + db.max());
                let a_range = Domain::range(dc.min() - db.max(), dc.max() - db.min());
                let b_range = Domain::range(dc.min() - da.max(), dc.max() - da.min());
                vec![
                    (self.c, c_range.intersect(&dc)),
                    (self.a, a_range.intersect(&da)),
                    (self.b, b_range.intersect(&db)),
                ]
            }
            ArithOp::Minus => {
                // c = a - b <=> a = c + b <=> b = a - c
                let c_range = Domain::range(da.min() - db.max(), da.max() - db.min());
                let a_range = Domain::range(dc.min() + db.min(), dc.max() + db.max());
                let b_range = Domain::range(da.min() - dc.max(), da.max() - dc.min());
                vec![
                    (self.c, c_range.intersect(&dc)),
                    (self.a, a_range.intersect(&da)),
                    (self.b, b_range.intersect(&db)),
                ]
            }
            ArithOp::Times => {
                let (c_lo, c_hi) = mul_bounds(&da, &db);
                let mut out = vec![(self.c, Domain::range(c_lo, c_hi).intersect(&dc))];
                if da.is_singleton() && da.min() != 0 {
                    let (lo, hi) = div_bounds_by_const(&dc, da.min(), da.min());
                    out.push((self.b, Domain::range(lo, hi).intersect(&db)));
                }
                if db.is_singleton() && db.min() != 0 {
                    let (lo, hi) = div_bounds_by_const(&dc, db.min(), db.min());
                    out.push((self.a, Domain::range(lo, hi).intersect(&da)));
                }
                out
            }
            ArithOp::Div => {
                // c = a / b (truncating toward zero); b == {0} fails outright.
                if db.is_singleton() && db.min() == 0 {
                    return PropagateResult::Violated;
                }
                if da.is_singleton() && db.is_singleton() {
                    let q = truncating_div(da.min(), db.min());
                    vec![(self.c, Domain::singleton(q).intersect(&dc))]
                } else {
                    Vec::new()
                }
            }
            ArithOp::Mod => {
                if db.is_singleton() && db.min() == 0 {
                    return PropagateResult::Violated;
                }
                if da.is_singleton() && db.is_singleton() {
                    let r = truncating_rem(da.min(), db.min());
                    vec![(self.c, Domain::singleton(r).intersect(&dc))]
                } else {
                    Vec::new()
                }
            }
        };

        for (v, d) in narrows {
            if ctx.narrow(v, d).is_err() {
                return PropagateResult::Violated;
            }
        }

        let da = ctx.domain(self.a);
        let db = ctx.domain(self.b);
        let dc = ctx.domain(self.c);
        if da.is_empty() || db.is_empty() || dc.is_empty() {
            return PropagateResult::Violated;
        }
        if da.is_singleton() && db.is_singleton() && dc.is_singleton() {
            PropagateResult::Entailed
        } else {
            PropagateResult::Pending
        }
    }
}
