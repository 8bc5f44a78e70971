//! `AnswerTable`: per-call-pattern answer storage with
//! subsumption-based insertion and logical retraction.

use rkanren_ir::{Term, Var};
use std::cell::Cell;
use std::collections::HashMap;

/// One answer: a partial map from call-pattern variable index to the
/// term it was bound to when this answer was produced. An index absent
/// from the map means that pattern variable was left unbound by this
/// particular derivation (a map from variables of the call
/// pattern to terms).
pub type Bindings = HashMap<usize, Term>;

#[derive(Debug)]
pub struct AnswerEntry {
    pub bindings: Bindings,
    retracted: Cell<bool>,
}

impl AnswerEntry {
    pub fn is_retracted(&self) -> bool {
        self.retracted.get()
    }

    fn retract(&self) {
        self.retracted.set(true);
    }
}

/// `A ⊑ B`: every binding in `a` also appears, to the same term, in `b`.
fn subsumes(a: &Bindings, b: &Bindings) -> bool {
    a.iter().all(|(idx, t)| b.get(idx) == Some(t))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    /// Still being produced; may gain more answers.
    Active,
    /// Producer has exhausted its work; the visible answer set is final
    /// (Completion).
    Complete,
}

#[derive(Debug)]
pub struct AnswerTable {
    pub predicate_id: u64,
    /// The table's own fixed copy of the call-pattern variables, numbered
    /// to match `Bindings` indices. Allocated once, the first time this
    /// shape is seen.
    pub pattern_vars: Vec<Var>,
    /// Append-only insertion log; retraction is logical (the `Cell<bool>`
    /// flag on each entry), never a removal.
    log: Vec<AnswerEntry>,
    pub status: TableStatus,
}

impl AnswerTable {
    pub fn new(predicate_id: u64, pattern_vars: Vec<Var>) -> AnswerTable {
        AnswerTable {
            predicate_id,
            pattern_vars,
            log: Vec::new(),
            status: TableStatus::Active,
        }
    }

    pub fn mark_complete(&mut self) {
        self.status = TableStatus::Complete;
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.status, TableStatus::Complete)
    }

    /// Every non-retracted answer, in insertion order. Retracted answers
    /// are skipped.
    pub fn visible(&self) -> impl Iterator<Item = &AnswerEntry> {
        self.log.iter().filter(|e| !e.is_retracted())
    }

    pub fn visible_count(&self) -> usize {
        self.visible().count()
    }

    /// Inserts a newly derived answer, applying the subsumption rules.
    /// Returns `true` if the answer set actually changed (used by the
    /// producer's fixpoint loop to decide whether another pass might
    /// derive something new).
    pub fn insert(&mut self, bindings: Bindings) -> bool {
        for existing in self.log.iter() {
            if !existing.is_retracted()
            && existing.bindings == bindings
            {
                return false;
            }
            if !existing.is_retracted() && subsumes(&existing.bindings, &bindings) {
                return false;
            }
        }
        for existing in self.log.iter() {
            if !existing.is_retracted() && subsumes(&bindings, &existing.bindings) {
                existing.retract();
            }
        }
        self.log.push(AnswerEntry {
                bindings,
                retracted: Cell::new(false),
        });
        true
    }

    /// Retracts every visible answer binding pattern variable index `idx`
    /// to an integer atom no longer allowed. Leaves alone any answer that
    /// leaves the variable unbound or binds it non-integrally. Never
    /// resurrects an answer already retracted for another reason
    /// (retraction is monotone).
    pub fn invalidate(&mut self, idx: usize, still_allowed: impl Fn(i64) -> bool) {
        for entry in self.log.iter() {
            if entry.is_retracted() {
                continue;
            }
            if let Some(Term::Atom(rkanren_ir::Atom::Int(k))) = entry.bindings.get(&idx) {
                if !still_allowed(*k) {
                    entry.retract();
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn bindings(pairs: &[(usize, Term)]) -> Bindings {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn more_specific_answer_subsumes_looser_one() {
        let mut t = AnswerTable::new(1, Vec::new());
        assert!(t.insert(bindings(&[(0, Term::int(1)), (1, Term::int(2))])));
        assert!(t.insert(bindings(&[(0, Term::int(1))])));
        let visible: Vec<_> = t.visible().collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].bindings.len(), 1);
    }

    #[test]
    fn looser_answer_inserted_after_specific_one_is_dropped() {
        let mut t = AnswerTable::new(1, Vec::new());
        assert!(t.insert(bindings(&[(0, Term::int(1))])));
        assert!(!t.insert(bindings(&[(0, Term::int(1)), (1, Term::int(2))])));
        let visible: Vec<_> = t.visible().collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].bindings.len(), 1);
    }

    #[test]
    fn duplicate_insertion_is_idempotent() {
        let mut t = AnswerTable::new(1, Vec::new());
        assert!(t.insert(bindings(&[(0, Term::int(1))])));
        assert!(!t.insert(bindings(&[(0, Term::int(1))])));
        assert_eq!(t.visible_count(), 1);
    }

    #[test]
    fn fd_invalidation_hides_out_of_domain_answer_and_stays_hidden() {
        let mut t = AnswerTable::new(1, Vec::new());
        t.insert(bindings(&[(0, Term::int(7))]));
        t.invalidate(0, |k| (1..=5).contains(&k));
        assert_eq!(t.visible_count(), 0);
        // widening the domain back out does not resurrect the answer
        t.invalidate(0, |k| (1..=10).contains(&k));
        assert_eq!(t.visible_count(), 0);
    }
}
