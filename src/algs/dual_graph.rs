//! Build a CSR (compressed-sparse-row) *dual graph* of a mesh.
//
// Each *element* is a vertex; an undirected edge joins two elements that
// share at least one node.
//
// Returned in METIS-ready CSR triples:
//
// * `xadj[i] .. xadj[i+1]`   = neighbour list of element *i*
// * `adjncy`                 = concatenated neighbour vertices
// * `vwgt[i]`                = vertex weight, default = 1
//
// The dual graph is **symmetrised** (i↔j appear in both lists), **self-free**
// (no loops) and every neighbour list is sorted, so identical input yields an
// identical graph on every rank.

use crate::mesh::Element;
use hashbrown::{HashMap, HashSet};

/// CSR triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualGraph {
    pub xadj: Vec<usize>,
    pub adjncy: Vec<usize>,
    pub vwgt: Vec<u64>,
}

impl DualGraph {
    pub fn num_vertices(&self) -> usize {
        self.xadj.len().saturating_sub(1)
    }

    pub fn neighbors(&self, v: usize) -> &[usize] {
        &self.adjncy[self.xadj[v]..self.xadj[v + 1]]
    }

    pub fn degree(&self, v: usize) -> usize {
        self.xadj[v + 1] - self.xadj[v]
    }

    /// Undirected edges `(u, v)` with `u < v`.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.num_vertices()).flat_map(move |u| {
            self.neighbors(u)
                .iter()
                .copied()
                .filter(move |&v| u < v)
                .map(move |v| (u, v))
        })
    }
}

/// Build the dual graph. Element indices follow the order of `elements`.
pub fn build_dual(elements: &[Element]) -> DualGraph {
    let n = elements.len();

    // 1. node → elements touching it
    let mut touching: HashMap<u64, Vec<usize>> = HashMap::new();
    for (i, elem) in elements.iter().enumerate() {
        for &node in &elem.nodes {
            let list = touching.entry(node).or_default();
            if list.last() != Some(&i) {
                list.push(i);
            }
        }
    }

    // 2. elements sharing a node are adjacent
    let mut adj: Vec<HashSet<usize>> = vec![HashSet::new(); n];
    for list in touching.values() {
        for (k, &a) in list.iter().enumerate() {
            for &b in &list[k + 1..] {
                adj[a].insert(b);
                adj[b].insert(a);
            }
        }
    }

    // 3. Convert HashSet adjacency → sorted CSR vectors
    let mut xadj = Vec::with_capacity(n + 1);
    let mut adjncy = Vec::new();
    xadj.push(0);
    for nbrs in &adj {
        let mut sorted: Vec<usize> = nbrs.iter().copied().collect();
        sorted.sort_unstable();
        adjncy.extend(sorted);
        xadj.push(adjncy.len());
    }

    // 4. Simple unit vertex weights
    let vwgt = vec![1; n];

    DualGraph { xadj, adjncy, vwgt }
}
