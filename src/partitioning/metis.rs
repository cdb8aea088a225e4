//! METIS k-way backend (feature `metis-support`).

use super::PartitionError;
use crate::algs::dual_graph::DualGraph;
use metis::{Graph, Idx};

/// Partition `graph` into `n_parts` parts with `METIS_PartGraphKway`.
pub fn metis_kway(graph: &DualGraph, n_parts: usize) -> Result<Vec<usize>, PartitionError> {
    let n = graph.num_vertices();
    // METIS rejects nparts == 1 and empty graphs
    if n_parts == 1 || n == 0 {
        return Ok(vec![0; n]);
    }
    let to_idx = |v: usize| {
        Idx::try_from(v).map_err(|_| PartitionError::Backend(format!("{v} overflows idx_t")))
    };
    let xadj = graph.xadj.iter().map(|&v| to_idx(v)).collect::<Result<Vec<_>, _>>()?;
    let adjncy = graph
        .adjncy
        .iter()
        .map(|&v| to_idx(v))
        .collect::<Result<Vec<_>, _>>()?;
    let vwgt = graph
        .vwgt
        .iter()
        .map(|&w| to_idx(w as usize))
        .collect::<Result<Vec<_>, _>>()?;
    let nparts = to_idx(n_parts)?;

    let mut part: Vec<Idx> = vec![0; n];
    Graph::new(1, nparts, &xadj, &adjncy)
        .map_err(|e| PartitionError::Backend(e.to_string()))?
        .set_vwgt(&vwgt)
        .part_kway(&mut part)
        .map_err(|e| PartitionError::Backend(e.to_string()))?;

    part.into_iter()
        .map(|p| {
            usize::try_from(p)
                .ok()
                .filter(|&p| p < n_parts)
                .ok_or_else(|| PartitionError::Backend(format!("METIS returned part {p}")))
        })
        .collect()
}
