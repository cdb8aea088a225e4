//! Entry-point for element partitioning.
//!
//! Every backend is deterministic: the same dual graph and centroids yield
//! the same assignment on every rank, which is what lets the balancer skip a
//! broadcast of the result.

pub mod error;
#[cfg(feature = "metis-support")]
pub mod metis;
pub mod metrics;
pub mod rcb;
pub mod rcm;

pub use self::error::PartitionError;
pub use self::metrics::{edge_cut, imbalance, part_weights};

use crate::algs::dual_graph::DualGraph;
use std::fmt;

/// Rank owning each element, indexed like the dual graph's vertices.
pub type PartitionId = usize;

/// Decomposition algorithm selected on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DecompMethod {
    /// Recursive coordinate bisection of element centroids.
    #[default]
    Rcb,
    /// Cuthill–McKee ordering of the dual graph cut into equal-weight chunks.
    Rcm,
    /// METIS k-way graph partitioning.
    Metis,
}

impl fmt::Display for DecompMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DecompMethod::Rcb => "rcb",
            DecompMethod::Rcm => "rcm",
            DecompMethod::Metis => "metis",
        })
    }
}

#[derive(Debug, Clone)]
pub struct PartitionerConfig {
    pub n_parts: usize,
    pub method: DecompMethod,
    /// Acceptable `max part weight / average part weight`.
    pub imbalance_tolerance: f64,
}

impl Default for PartitionerConfig {
    fn default() -> Self {
        Self {
            n_parts: 2,
            method: DecompMethod::default(),
            imbalance_tolerance: 1.05,
        }
    }
}

/// Quality of an assignment, for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionReport {
    pub edge_cut: usize,
    pub imbalance: f64,
    pub part_weights: Vec<u64>,
}

/// Assign every vertex of `graph` to one of `cfg.n_parts` parts.
///
/// `centroids[i]` is the centroid of element `i`; only geometric methods use
/// it, but its length is always checked.
pub fn partition(
    graph: &DualGraph,
    centroids: &[[f64; 3]],
    cfg: &PartitionerConfig,
) -> Result<(Vec<PartitionId>, PartitionReport), PartitionError> {
    if cfg.n_parts == 0 {
        return Err(PartitionError::NoParts);
    }
    let n = graph.num_vertices();
    if centroids.len() != n {
        return Err(PartitionError::LengthMismatch {
            expected: n,
            got: centroids.len(),
        });
    }
    if graph.vwgt.len() != n {
        return Err(PartitionError::LengthMismatch {
            expected: n,
            got: graph.vwgt.len(),
        });
    }

    let parts = match cfg.method {
        DecompMethod::Rcb => rcb::rcb_partition(centroids, &graph.vwgt, cfg.n_parts),
        DecompMethod::Rcm => rcm::rcm_partition(graph, cfg.n_parts),
        DecompMethod::Metis => metis_partition(graph, cfg.n_parts)?,
    };

    let weights = part_weights(&graph.vwgt, &parts, cfg.n_parts);
    let report = PartitionReport {
        edge_cut: edge_cut(graph, &parts),
        imbalance: imbalance(&weights),
        part_weights: weights,
    };
    log::info!(
        "{} partition into {} parts: edge cut {}, imbalance {:.3}",
        cfg.method,
        cfg.n_parts,
        report.edge_cut,
        report.imbalance
    );
    if report.imbalance > cfg.imbalance_tolerance {
        log::warn!(
            "partition imbalance {:.3} exceeds tolerance {:.3}",
            report.imbalance,
            cfg.imbalance_tolerance
        );
    }
    Ok((parts, report))
}

#[cfg(feature = "metis-support")]
fn metis_partition(graph: &DualGraph, n_parts: usize) -> Result<Vec<PartitionId>, PartitionError> {
    metis::metis_kway(graph, n_parts)
}

#[cfg(not(feature = "metis-support"))]
fn metis_partition(_graph: &DualGraph, _n_parts: usize) -> Result<Vec<PartitionId>, PartitionError> {
    Err(PartitionError::Unavailable("metis"))
}

#[cfg(test)]
#[path = "tests/partition_property_tests.rs"]
mod partition_property_tests;
