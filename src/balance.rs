//! Collective rebalancing of a distributed mesh.
//!
//! Each rank contributes its owned elements; every rank then runs the same
//! deterministic partitioner over the gathered mesh and keeps the
//! destinations of its own elements. No result broadcast is needed.

use crate::algs::communicator::Communicator;
use crate::algs::dual_graph::build_dual;
use crate::algs::wire::{PacketKind, decode_packet};
use crate::mesh::{DistributedMesh, Element, NodeMap, centroid};
use crate::mesh_error::MeshError;
use crate::partitioning::{PartitionReport, PartitionerConfig, partition};
use crate::setup::Settings;
use itertools::Itertools;

/// Rewrites the partition assignment of a mesh in place.
pub trait Balancer<M> {
    /// Collective: every member of the group must call it.
    fn balance(&self, mesh: &mut M) -> Result<(), MeshError>;
}

/// Default [`Balancer`]: gather, partition into `comm.size()` parts, assign.
pub struct MeshBalancer<'c, C: Communicator> {
    comm: &'c C,
    config: PartitionerConfig,
}

impl<'c, C: Communicator> MeshBalancer<'c, C> {
    pub fn new(comm: &'c C, settings: &Settings) -> Self {
        Self {
            comm,
            config: PartitionerConfig {
                n_parts: comm.size(),
                method: settings.decomp_method(),
                imbalance_tolerance: settings.imbalance_tolerance(),
            },
        }
    }

    pub fn config(&self) -> &PartitionerConfig {
        &self.config
    }

    /// Gather every rank's elements, sorted by id, with all their nodes.
    fn gather(&self, mesh: &DistributedMesh) -> Result<(Vec<Element>, NodeMap), MeshError> {
        let local = mesh.encode_where(PacketKind::Summary, |_| true);
        let mut elements = Vec::new();
        let mut nodes = NodeMap::new();
        for (src, bytes) in self.comm.allgather_bytes(&local).iter().enumerate() {
            let packet = decode_packet(bytes, PacketKind::Summary)
                .map_err(|e| MeshError::Wire(format!("from rank {src}: {e}")))?;
            nodes.extend(packet.nodes);
            elements.extend(packet.elements.into_iter().map(|(e, _)| e));
        }
        elements.sort_by_key(|e| e.id);
        if let Some((a, _)) = elements.iter().tuple_windows().find(|(a, b)| a.id == b.id) {
            return Err(MeshError::MeshIoParse(format!(
                "element id {} is owned by more than one rank",
                a.id
            )));
        }
        Ok((elements, nodes))
    }

    /// Partition the gathered mesh; returns the assignment of the local
    /// elements and the quality report.
    pub fn compute(
        &self,
        mesh: &DistributedMesh,
    ) -> Result<(Vec<usize>, PartitionReport), MeshError> {
        let (elements, nodes) = self.gather(mesh)?;
        let centroids = centroids(&elements, &nodes)?;
        let graph = build_dual(&elements);
        let (parts, report) = partition(&graph, &centroids, &self.config)?;

        let local = mesh
            .elements()
            .iter()
            .map(|e| {
                elements
                    .binary_search_by_key(&e.id, |g| g.id)
                    .map(|pos| parts[pos])
                    .map_err(|_| MeshError::Wire(format!("element {} lost in gather", e.id)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((local, report))
    }
}

#[cfg(feature = "rayon")]
fn centroids(elements: &[Element], nodes: &NodeMap) -> Result<Vec<[f64; 3]>, MeshError> {
    use rayon::prelude::*;
    elements.par_iter().map(|e| centroid(e, nodes)).collect()
}

#[cfg(not(feature = "rayon"))]
fn centroids(elements: &[Element], nodes: &NodeMap) -> Result<Vec<[f64; 3]>, MeshError> {
    elements.iter().map(|e| centroid(e, nodes)).collect()
}

impl<C: Communicator> Balancer<DistributedMesh> for MeshBalancer<'_, C> {
    fn balance(&self, mesh: &mut DistributedMesh) -> Result<(), MeshError> {
        let (destinations, report) = self.compute(mesh)?;
        log::debug!(
            "rank {}: {} local elements, part weights {:?}",
            self.comm.rank(),
            destinations.len(),
            report.part_weights
        );
        mesh.set_destinations(destinations)
    }
}
