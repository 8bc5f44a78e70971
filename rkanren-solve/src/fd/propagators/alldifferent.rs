//! `AllDifferent(vars)`, filtered to full generalized-arc-
//! consistency via Régin's algorithm: find one maximum matching between
//! variables and candidate values, then remove any (variable, value)
//! edge that cannot appear in *any* maximum matching -- which Régin shows
//! is exactly the edges whose endpoints fall in different strongly
//! connected components of the matching-oriented value/variable graph.
//!
//! SCCs are computed with `petgraph::algo::tarjan_scc` over that graph.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rkanren_ir::Var;
use std::collections::HashMap;

use crate::fd::domain::{Domain, DomainEvent};
use crate::fd::propagator::{PropagateResult, PropagationContext, Propagator};

#[derive(Debug)]
pub struct AllDifferent {
    pub vars: Vec<Var>,
}

impl Propagator for AllDifferent {
    fn name(&self) -> &'static str {
        "all_different"
    }

    fn vars(&self) -> Vec<Var> {
        self.vars.clone()
    }

    fn wake_on(&self, _v: Var, _event: DomainEvent) -> bool {
        true
    }

    fn propagate(&self, ctx: &mut dyn PropagationContext) -> PropagateResult {
        let n = self.vars.len();
        let domains: Vec<Domain> = self.vars.iter().map(|v| ctx.domain(*v)).collect();

        let mut value_index: HashMap<i64, usize> = HashMap::new();
        let mut values: Vec<i64> = Vec::new();
        for d in &domains {
            for val in d.iter() {
                value_index.entry(val).or_insert_with(|| {
                        values.push(val);
                        values.len() - 1
                });
            }
        }
        let m = values.len();

        let adjacency: Vec<Vec<usize>> = domains
        .iter()
        .map(|d| d.iter().map(|val| value_index[&val]).collect())
        .collect();

        let Some(match_of_var) = kuhn_matching(&adjacency, n, m) else {
            return PropagateResult::Violated;
        };

        // Build the directed graph: matched value -> variable, every other
        // candidate variable -> value, and a shared sink tying all unmatched
        // values together (alternating paths through any free value are
        // always admissible).
        let mut graph: DiGraph<(), ()> = DiGraph::new();
        let var_nodes: Vec<NodeIndex> = (0..n).map(|_| graph.add_node(())).collect();
        let val_nodes: Vec<NodeIndex> = (0..m).map(|_| graph.add_node(())).collect();
        let sink = graph.add_node(());

        let mut match_of_val: Vec<Option<usize>> = vec![None; m];
        for (i, mv) in match_of_var.iter().enumerate() {
            if let Some(j) = mv {
                match_of_val[*j] = Some(i);
                graph.add_edge(val_nodes[*j], var_nodes[i], ());
            }
        }
        for (i, cands) in adjacency.iter().enumerate() {
            for &j in cands {
                if match_of_var[i] != Some(j) {
                    graph.add_edge(var_nodes[i], val_nodes[j], ());
                }
            }
        }
        for j in 0..m {
            if match_of_val[j].is_none() {
                graph.add_edge(val_nodes[j], sink, ());
                graph.add_edge(sink, val_nodes[j], ());
            }
        }

        let sccs = tarjan_scc(&graph);
        let mut component_of: HashMap<NodeIndex, usize> = HashMap::new();
        for (comp_id, comp) in sccs.iter().enumerate() {
            for &node in comp {
                component_of.insert(node, comp_id);
            }
        }

        for (i, cands) in adjacency.iter().enumerate() {
            let matched = match_of_var[i];
            let var_comp = component_of[&var_nodes[i]];
            let mut keep = Vec::with_capacity(cands.len());
            for &j in cands {
                if Some(j) == matched || component_of[&val_nodes[j]] == var_comp {
                    keep.push(values[j]);
                }
            }
            if ctx.narrow(self.vars[i], Domain::from_values(keep)).is_err() {
                return PropagateResult::Violated;
            }
        }

        let all_singleton = self
        .vars
        .iter()
        .all(|v| ctx.domain(*v).is_singleton());
        if all_singleton {
            PropagateResult::Entailed
        } else {
            PropagateResult::Pending
        }
    }
}

/// Kuhn's algorithm (DFS augmenting paths): a maximum matching of
/// variables (rows) to values (columns) given each variable's candidate
/// value indices. Returns `None` if no perfect matching of the variables
/// exists (`AllDifferent` ... violated when no assignment
/// satisfying the pairwise constraint remains).
fn kuhn_matching(adjacency: &[Vec<usize>], n: usize, m: usize) -> Option<Vec<Option<usize>>> {
    let mut match_of_var: Vec<Option<usize>> = vec![None; n];
    let mut match_of_val: Vec<Option<usize>> = vec![None; m];

    fn try_augment(
        i: usize,
        adjacency: &[Vec<usize>],
        visited: &mut Vec<bool>,
        match_of_val: &mut Vec<Option<usize>>,
        match_of_var: &mut Vec<Option<usize>>,
    ) -> bool {
        for &j in &adjacency[i] {
            if visited[j] {
                continue;
            }
            visited[j] = true;
            let free_or_augmentable = match match_of_val[j] {
                None => true,
                Some(prev) => try_augment(prev, adjacency, visited, match_of_val, match_of_var),
            };
            if free_or_augmentable {
                match_of_val[j] = Some(i);
                match_of_var[i] = Some(j);
                return true;
            }
        }
        false
    }

    for i in 0..n {
        let mut visited = vec![false; m];
        if !try_augment(i, adjacency, &mut visited, &mut match_of_val, &mut match_of_var) {
            return None;
        }
    }
    Some(match_of_var)
}
