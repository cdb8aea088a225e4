//! Partitioning metrics utilities.
//!
//! Edge cut and load imbalance of an assignment, logged by the balancer and
//! checked by tests.

use crate::algs::dual_graph::DualGraph;

/// Computes the edge cut of a partitioning (O(E)).
///
/// The edge cut is the number of undirected edges whose endpoints live in
/// different parts.
pub fn edge_cut(graph: &DualGraph, parts: &[usize]) -> usize {
    graph
        .edges()
        .filter(|&(u, v)| parts[u] != parts[v])
        .count()
}

/// Total vertex weight per part.
pub fn part_weights(vwgt: &[u64], parts: &[usize], n_parts: usize) -> Vec<u64> {
    let mut loads = vec![0u64; n_parts];
    for (&w, &p) in vwgt.iter().zip(parts) {
        loads[p] += w;
    }
    loads
}

/// `max load / average load`; 1.0 is perfect balance. An empty assignment
/// counts as balanced.
pub fn imbalance(loads: &[u64]) -> f64 {
    let total: u64 = loads.iter().sum();
    if total == 0 || loads.is_empty() {
        return 1.0;
    }
    let max = loads.iter().copied().max().unwrap_or(0);
    max as f64 * loads.len() as f64 / total as f64
}
