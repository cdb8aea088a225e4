//! Graph-ordering partitioner.
//!
//! Order the dual graph with reverse Cuthill–McKee (each component is started
//! from a minimum-degree vertex, neighbours are visited by increasing degree),
//! then cut the ordering into `k` contiguous chunks of equal weight. Vertices
//! close in the ordering are close in the graph, so chunks stay compact.

use crate::algs::dual_graph::DualGraph;
use std::collections::VecDeque;

/// Reverse Cuthill–McKee ordering of all vertices, components included.
pub fn reverse_cuthill_mckee(graph: &DualGraph) -> Vec<usize> {
    let n = graph.num_vertices();
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);

    // component seeds: unvisited vertex of minimum degree, lowest index first
    let mut by_degree: Vec<usize> = (0..n).collect();
    by_degree.sort_by_key(|&v| (graph.degree(v), v));

    for &seed in &by_degree {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        let mut queue = VecDeque::from([seed]);
        while let Some(u) = queue.pop_front() {
            order.push(u);
            let mut next: Vec<usize> = graph
                .neighbors(u)
                .iter()
                .copied()
                .filter(|&v| !visited[v])
                .collect();
            next.sort_by_key(|&v| (graph.degree(v), v));
            for v in next {
                visited[v] = true;
                queue.push_back(v);
            }
        }
    }
    order.reverse();
    order
}

/// Cut the RCM ordering into `n_parts` chunks of (nearly) equal weight.
pub fn rcm_partition(graph: &DualGraph, n_parts: usize) -> Vec<usize> {
    assert!(n_parts > 0, "Number of parts (k) must be ≥ 1");
    let order = reverse_cuthill_mckee(graph);
    let total: u128 = graph.vwgt.iter().map(|&w| w as u128).sum();
    let mut parts = vec![0; order.len()];
    if total == 0 {
        return parts;
    }
    let mut acc: u128 = 0;
    for v in order {
        parts[v] = ((acc * n_parts as u128 / total) as usize).min(n_parts - 1);
        acc += graph.vwgt[v] as u128;
    }
    parts
}
