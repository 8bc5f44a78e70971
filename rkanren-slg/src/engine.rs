//! The SLG/WFS engine: call processing, the fixpoint
//! producer loop, well-founded negation, and FD-domain invalidation.
//!
//! The registry is process-wide in spirit, but like every other store in
//! this workspace (`Substitution`, `ConstraintStore`, `UnifiedStore`), it
//! holds `Term`s, which carry `Rc` internally and are therefore not
//! `Send`. Rather than force a dishonest `Sync` bound onto something
//! that cannot really be shared across OS threads without a deeper
//! rewrite of the term representation (`rkanren_ir::Term` would need
//! `Arc` instead of `Rc` everywhere), the registry lives in a
//! `thread_local!`: still a single, explicitly constructible and
//! resettable instance, just honestly scoped to the thread that owns it.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rkanren_ir::{Term, Var};
use rkanren_solve::constraint::bus::{BusEvent, BusSubscriber};
use rkanren_solve::error::MisuseError;
use rkanren_solve::goal::succeed;
use rkanren_solve::state::State;
use rkanren_solve::stream::Stream;
use rkanren_solve::Goal;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use crate::call_pattern::{normalize, reproject, CallShape};
use crate::table::{AnswerTable, Bindings};

pub type PredicateId = u64;
type Key = (PredicateId, CallShape);

struct TablingEngine {
    tables: HashMap<Key, Rc<RefCell<AnswerTable>>>,
    /// Call patterns currently under production, used both to avoid
    /// infinite recursion on ordinary tabled recursive calls and to
    /// detect negative dependency cycles, which resolve to `Undefined`.
    active: Vec<Key>,
    /// Call patterns discovered to participate in a negative cycle.
    /// Sticky until `reset_engine`.
    undefined: HashSet<Key>,
    /// Subgoal dependency graph: an edge `a -> b` means some call to `a`
    /// consulted `b`'s table while producing its own answers. Used to
    /// find the strongly-connected component a completing table belongs
    /// to: a call that is mutually recursive with another unfinished
    /// call cannot be marked complete on its own -- an answer the other
    /// call produces later could still feed back into it.
    graph: DiGraph<Key, ()>,
    node_of: HashMap<Key, NodeIndex>,
}

impl TablingEngine {
    fn new() -> TablingEngine {
        TablingEngine {
            tables: HashMap::new(),
            active: Vec::new(),
            undefined: HashSet::new(),
            graph: DiGraph::new(),
            node_of: HashMap::new(),
        }
    }

    fn node_for(&mut self, key: &Key) -> NodeIndex {
        if let Some(n) = self.node_of.get(key) {
            return *n;
        }
        let n = self.graph.add_node(key.clone());
        self.node_of.insert(key.clone(), n);
        n
    }

    fn add_dependency(&mut self, from: &Key, to: &Key) {
        let a = self.node_for(from);
        let b = self.node_for(to);
        self.graph.update_edge(a, b, ());
    }

    /// Marks `key`'s table complete, together with the rest of its
    /// strongly-connected dependency component once every member of that
    /// component has independently reached its own local fixpoint (no
    /// member still on the active call stack). A component reduced to a
    /// single node (the ordinary, non-mutually-recursive case) always
    /// completes immediately.
    fn try_complete(&mut self, key: &Key) {
        let node = match self.node_of.get(key) {
            Some(n) => *n,
            None => {
                if let Some(t) = self.tables.get(key) {
                    t.borrow_mut().mark_complete();
                }
                return;
            }
        };
        let sccs = tarjan_scc(&self.graph);
        let component = match sccs.into_iter().find(|c| c.contains(&node)) {
            Some(c) => c,
            None => return,
        };
        if component.len() > 1 {
            let any_active = component
            .iter()
            .any(|n| self.active.contains(&self.graph[*n]));
            if any_active {
                return;
            }
        }
        for n in component {
            let k = self.graph[n].clone();
            if let Some(t) = self.tables.get(&k) {
                log::debug!("completing table for predicate {}", k.0);
                t.borrow_mut().mark_complete();
            }
        }
    }
}

thread_local! {
    static ENGINE: RefCell<TablingEngine> = RefCell::new(TablingEngine::new());
}

/// Resets the tabling cache. Does not touch the variable-id counter or
/// the constraint bus; the `rkanren` facade's `reset_global_engine()`
/// calls this alongside those.
pub fn reset_engine() {
    ENGINE.with(|e| *e.borrow_mut() = TablingEngine::new());
}

/// Removes every table for `predicate_id`. Fails if no table for that
/// predicate has ever been created.
pub fn abolish(predicate_id: PredicateId) -> Result<(), MisuseError> {
    ENGINE.with(|e| {
            let mut engine = e.borrow_mut();
            let keys: Vec<Key> = engine
            .tables
            .keys()
            .filter(|(p, _)| *p == predicate_id)
            .cloned()
            .collect();
            if keys.is_empty() {
                return Err(MisuseError::UnknownPredicate { predicate_id });
            }
            for k in keys {
                engine.tables.remove(&k);
            }
            Ok(())
    })
}

pub fn abolish_all() {
    ENGINE.with(|e| e.borrow_mut().tables.clear());
}

fn get_or_create_table(key: &Key, n_vars: usize) -> Rc<RefCell<AnswerTable>> {
    ENGINE.with(|e| {
            let mut engine = e.borrow_mut();
            if let Some(t) = engine.tables.get(key) {
                return Rc::clone(t);
            }
            let pattern_vars: Vec<Var> = (0..n_vars).map(|_| Var::fresh()).collect();
            let table = Rc::new(RefCell::new(AnswerTable::new(key.0, pattern_vars)));
            engine.tables.insert(key.clone(), Rc::clone(&table));
            table
    })
}

fn is_active(key: &Key) -> bool {
    ENGINE.with(|e| e.borrow().active.contains(key))
}

fn build_bindings(pattern_vars: &[Var], s: &State) -> Bindings {
    let mut b = Bindings::new();
    for (idx, v) in pattern_vars.iter().enumerate() {
        let walked = s.subst.walk_star(&Term::Var(*v));
        if walked != Term::Var(*v) {
            b.insert(idx, walked);
        }
    }
    b
}

fn replay(pattern_vars: &[Var], bindings: &Bindings, current_terms: &[Term], s: &State) -> Option<State> {
    let mut cur = s.clone();
    for (idx, t) in bindings {
        let target = &current_terms[*idx];
        let projected = reproject(t, pattern_vars, current_terms);
        cur = cur.unify(target, &projected).ok()?;
    }
    Some(cur)
}

/// Evaluates the predicate's body to a naive fixpoint: run it, insert
/// every produced answer, and repeat until a full pass adds nothing new.
/// A recursive tabled call back to this same call pattern (`is_active`)
/// is served only the answers already visible at that moment -- it
/// never re-enters the producer -- which is exactly what keeps this
/// terminating on cyclic predicate dependency graphs.
fn produce_to_fixpoint(key: &Key, table: &Rc<RefCell<AnswerTable>>, body: &Rc<dyn Fn(Vec<Term>) -> Goal>, caller: &State) {
    ENGINE.with(|e| e.borrow_mut().active.push(key.clone()));
    loop {
        let pattern_vars = table.borrow().pattern_vars.clone();
        let pattern_terms: Vec<Term> = pattern_vars.iter().map(|v| Term::Var(*v)).collect();
        let fresh_state = State::new(caller.bus.clone()).with_cancel(caller.cancel.clone());
        let goal = body(pattern_terms);
        let (answers, _more) = goal(fresh_state).take(0, &caller.cancel);

        let mut grew = false;
        for ans_state in answers {
            let bindings = build_bindings(&pattern_vars, &ans_state);
            if table.borrow_mut().insert(bindings) {
                grew = true;
            }
        }
        if !grew || caller.cancel.is_cancelled() {
            break;
        }
    }
    ENGINE.with(|e| {
            let mut engine = e.borrow_mut();
            engine.active.pop();
            engine.try_complete(key);
    });
}

fn call_tabled(predicate_id: PredicateId, args: &[Term], body: Rc<dyn Fn(Vec<Term>) -> Goal>, s: State) -> Stream<State> {
    let walked: Vec<Term> = args.iter().map(|a| s.subst.walk_star(a)).collect();
    let (shape, current_vars) = normalize(&walked);
    let key: Key = (predicate_id, shape);

    let table = get_or_create_table(&key, current_vars.len());

    ENGINE.with(|e| {
            let mut engine = e.borrow_mut();
            if let Some(caller) = engine.active.last().cloned() {
                if caller != key {
                    engine.add_dependency(&caller, &key);
                }
            }
    });

    let complete = table.borrow().is_complete();
    if !complete && !is_active(&key) {
        produce_to_fixpoint(&key, &table, &body, &s);
    }

    let pattern_vars = table.borrow().pattern_vars.clone();
    let current_terms: Vec<Term> = current_vars.iter().map(|v| Term::Var(*v)).collect();
    let entries: Vec<Bindings> = table.borrow().visible().map(|e| e.bindings.clone()).collect();

    let mut out = Stream::empty();
    for bindings in entries.into_iter().rev() {
        if let Some(s2) = replay(&pattern_vars, &bindings, &current_terms, &s) {
            out = Stream::cons(s2, out);
        }
    }
    out
}

/// Wraps a relational predicate body in tabling: the returned closure,
/// applied to call arguments, builds the `Goal` that consults/populates
/// the predicate's `AnswerTable` instead of re-evaluating `body` from
/// scratch on every call.
pub fn tabled<F>(predicate_id: PredicateId, body: F) -> Rc<dyn Fn(Vec<Term>) -> Goal>
where
F: Fn(Vec<Term>) -> Goal + 'static,
{
    let body: Rc<dyn Fn(Vec<Term>) -> Goal> = Rc::new(body);
    Rc::new(move |args: Vec<Term>| {
            let body = Rc::clone(&body);
            let args2 = args.clone();
            Rc::new(move |s: State| call_tabled(predicate_id, &args2, Rc::clone(&body), s)) as Goal
    })
}

/// Three-valued truth for well-founded negation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Undefined,
}

/// How a `not_tabled` goal should behave when the inner predicate's truth
/// is `Undefined`: treat it as failure or as success, per the goal's
/// policy. Full propagation through the binary success/failure channel
/// of `Goal` isn't representable without widening `Stream<State>`'s
/// element type; callers that need the exact three-valued signal should
/// call [`wfs_truth`] directly instead of going through a goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NegationPolicy {
    FailOnUndefined,
    SucceedOnUndefined,
}

/// Computes the well-founded truth value of calling `predicate_id(args)`.
/// Driving a predicate whose body itself calls `not_tabled` on a
/// predicate that (transitively) calls back into this one, before this
/// one's own table is complete, is exactly the negative cycle that
/// resolves to `Undefined`.
pub fn wfs_truth(predicate_id: PredicateId, args: Vec<Term>, body: &Rc<dyn Fn(Vec<Term>) -> Goal>, s: &State) -> Truth {
    let walked: Vec<Term> = args.iter().map(|a| s.subst.walk_star(a)).collect();
    let (shape, _current_vars) = normalize(&walked);
    let key: Key = (predicate_id, shape);

    if is_active(&key) {
        // Re-entering a call pattern that is currently being produced,
        // while asking for its *truth value* (as opposed to ordinary
        // tabled recursion, which just serves known answers): the whole
        // active suffix from this key to the top of the stack is one
        // negative-dependency cycle.
        ENGINE.with(|e| {
                let mut engine = e.borrow_mut();
                if let Some(pos) = engine.active.iter().position(|k| *k == key) {
                    let cyclic: Vec<Key> = engine.active[pos..].to_vec();
                    for k in cyclic {
                        engine.undefined.insert(k);
                    }
                } else {
                    engine.undefined.insert(key.clone());
                }
        });
        return Truth::Undefined;
    }

    let _ = call_tabled(predicate_id, &walked, Rc::clone(body), s.clone());

    let marked_undefined = ENGINE.with(|e| e.borrow().undefined.contains(&key));
    if marked_undefined {
        return Truth::Undefined;
    }

    let table = ENGINE.with(|e| e.borrow().tables.get(&key).cloned());
    match table {
        Some(t) => {
            let t = t.borrow();
            if t.visible_count() > 0 {
                Truth::True
            } else if t.is_complete() {
                Truth::False
            } else {
                Truth::Undefined
            }
        }
        None => Truth::False,
    }
}

/// `not P` over a tabled predicate: builds a goal from the three-valued
/// [`wfs_truth`] of `predicate_id(args)`.
pub fn not_tabled(
    predicate_id: PredicateId,
    args: Vec<Term>,
    body: Rc<dyn Fn(Vec<Term>) -> Goal>,
    policy: NegationPolicy,
) -> Goal {
    Rc::new(move |s: State| {
            match wfs_truth(predicate_id, args.clone(), &body, &s) {
                Truth::False => succeed()(s),
                Truth::True => Stream::empty(),
                Truth::Undefined => match policy {
                    NegationPolicy::FailOnUndefined => Stream::empty(),
                    NegationPolicy::SucceedOnUndefined => succeed()(s),
                },
            }
    })
}

/// Subscribes to the global constraint bus and retracts tabled answers
/// whose binding for a narrowed FD variable fell outside the new domain.
/// Matches directly against a table's own pattern variables; an answer
/// binding to a *caller's* variable that later gets FD-attributed and
/// narrowed is outside this subscriber's reach without a second layer of
/// identity tracking this engine does not maintain.
pub struct FdInvalidationSubscriber;

impl BusSubscriber for FdInvalidationSubscriber {
    fn on_event(&self, event: &BusEvent) {
        match event {
            BusEvent::DomainNarrowed { var_id, domain } => {
                let var_id = *var_id;
                let domain = domain.clone();
                ENGINE.with(|e| {
                        let engine = e.borrow();
                        for table in engine.tables.values() {
                            let mut t = table.borrow_mut();
                            if let Some(idx) = t.pattern_vars.iter().position(|v| v.id == var_id) {
                                log::debug!(
                                    "invalidating table {} answers against narrowed domain of var {}",
                                    t.predicate_id,
                                    var_id
                                );
                                let domain = domain.clone();
                                t.invalidate(idx, move |k| domain.contains(k));
                            }
                        }
                });
            }
            _ => {}
        }
    }
}

pub fn fd_invalidation_subscriber() -> Arc<dyn BusSubscriber> {
    Arc::new(FdInvalidationSubscriber)
}
