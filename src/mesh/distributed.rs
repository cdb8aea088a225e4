//! Mesh data distributed across a process group.
//!
//! Each member owns a set of elements plus the nodes they reference, and
//! records a *destination* rank per owned element. Balancing only rewrites
//! destinations; [`DistributedMesh::migrate`] moves the data.

use super::{Element, NodeMap, SerialMesh};
use crate::algs::communicator::Communicator;
use crate::algs::wire::{PacketKind, decode_packet, encode_packet};
use crate::mesh_error::MeshError;
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq)]
pub struct DistributedMesh {
    rank: usize,
    size: usize,
    nodes: NodeMap,
    elements: Vec<Element>,
    destinations: Vec<usize>,
}

impl DistributedMesh {
    /// Local piece made of `elements`; every destination starts as `rank`.
    /// Nodes not referenced by `elements` are dropped.
    pub fn from_parts(
        rank: usize,
        size: usize,
        nodes: &NodeMap,
        elements: Vec<Element>,
    ) -> Result<Self, MeshError> {
        let mut local = NodeMap::new();
        for elem in &elements {
            for &n in &elem.nodes {
                let xyz = nodes.get(&n).ok_or(MeshError::MissingNode {
                    element: elem.id,
                    node: n,
                })?;
                local.insert(n, *xyz);
            }
        }
        let destinations = vec![rank; elements.len()];
        Ok(Self {
            rank,
            size,
            nodes: local,
            elements,
            destinations,
        })
    }

    /// Keep the contiguous block `[rank·E/size, (rank+1)·E/size)` of the
    /// file-ordered elements of `mesh`.
    pub fn block_decomposition(
        mesh: SerialMesh,
        rank: usize,
        size: usize,
    ) -> Result<Self, MeshError> {
        if rank >= size {
            return Err(MeshError::InvalidRank { rank, size });
        }
        let (lo, hi) = block_range(mesh.elements.len(), rank, size);
        let SerialMesh {
            nodes,
            mut elements,
        } = mesh;
        let owned: Vec<Element> = elements.drain(lo..hi).collect();
        Self::from_parts(rank, size, &nodes, owned)
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn nodes(&self) -> &NodeMap {
        &self.nodes
    }

    pub fn destinations(&self) -> &[usize] {
        &self.destinations
    }

    /// Replace the destination of every owned element.
    pub fn set_destinations(&mut self, destinations: Vec<usize>) -> Result<(), MeshError> {
        if destinations.len() != self.elements.len() {
            return Err(MeshError::PartitionLength {
                expected: self.elements.len(),
                got: destinations.len(),
            });
        }
        if let Some(&bad) = destinations.iter().find(|&&d| d >= self.size) {
            return Err(MeshError::InvalidRank {
                rank: bad,
                size: self.size,
            });
        }
        self.destinations = destinations;
        Ok(())
    }

    /// Encode the owned elements selected by `keep`, with their nodes.
    pub(crate) fn encode_where(&self, kind: PacketKind, keep: impl Fn(usize) -> bool) -> Vec<u8> {
        let picked: Vec<(&Element, usize)> = self
            .elements
            .iter()
            .zip(self.destinations.iter().copied())
            .filter(|&(_, d)| keep(d))
            .collect();
        let node_ids: BTreeSet<u64> = picked
            .iter()
            .flat_map(|(e, _)| e.nodes.iter().copied())
            .collect();
        let nodes: Vec<(u64, [f64; 3])> = node_ids
            .into_iter()
            .filter_map(|n| self.nodes.get(&n).map(|xyz| (n, *xyz)))
            .collect();
        encode_packet(kind, picked.into_iter(), nodes.into_iter())
    }

    /// Ship every owned element to its destination rank (collective).
    ///
    /// The result holds exactly the elements whose destination is this rank,
    /// sorted by element id, each with destination = this rank.
    pub fn migrate<C: Communicator>(&self, comm: &C) -> Result<DistributedMesh, MeshError> {
        let outgoing: Vec<Vec<u8>> = (0..self.size)
            .map(|dst| self.encode_where(PacketKind::Migration, |d| d == dst))
            .collect();
        let incoming = comm.exchange(outgoing);

        let mut nodes = NodeMap::new();
        let mut elements = Vec::new();
        for (src, bytes) in incoming.iter().enumerate() {
            let packet = decode_packet(bytes, PacketKind::Migration)
                .map_err(|e| MeshError::Wire(format!("from rank {src}: {e}")))?;
            nodes.extend(packet.nodes);
            for (elem, dest) in packet.elements {
                if dest != self.rank {
                    return Err(MeshError::Wire(format!(
                        "rank {src} sent element {} destined for rank {dest}",
                        elem.id
                    )));
                }
                elements.push(elem);
            }
        }
        elements.sort_by_key(|e| e.id);
        log::debug!(
            "rank {}: migration received {} elements, {} nodes",
            self.rank,
            elements.len(),
            nodes.len()
        );
        DistributedMesh::from_parts(self.rank, self.size, &nodes, elements)
    }
}

/// Half-open element range owned by `rank` in a block decomposition.
pub fn block_range(n_elements: usize, rank: usize, size: usize) -> (usize, usize) {
    (rank * n_elements / size, (rank + 1) * n_elements / size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::mesh::ElementKind;

    fn strip(n: u64) -> SerialMesh {
        // n line elements along x: element i joins nodes i and i+1
        let mut nodes = NodeMap::new();
        for i in 1..=n + 1 {
            nodes.insert(i, [i as f64, 0.0, 0.0]);
        }
        let elements = (1..=n)
            .map(|i| Element {
                id: i,
                kind: ElementKind::Line,
                tags: vec![1],
                nodes: vec![i, i + 1],
            })
            .collect();
        SerialMesh { nodes, elements }
    }

    #[test]
    fn block_ranges_cover_all_elements() {
        let ranges: Vec<_> = (0..3).map(|r| block_range(10, r, 3)).collect();
        assert_eq!(ranges, vec![(0, 3), (3, 6), (6, 10)]);
        assert_eq!(block_range(2, 2, 4), (1, 1));
    }

    #[test]
    fn block_decomposition_keeps_only_referenced_nodes() {
        let piece = DistributedMesh::block_decomposition(strip(4), 1, 2).unwrap();
        let ids: Vec<u64> = piece.elements().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(piece.nodes().keys().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(piece.destinations(), &[1, 1]);
    }

    #[test]
    fn set_destinations_validates() {
        let mut piece = DistributedMesh::block_decomposition(strip(2), 0, 2).unwrap();
        assert!(matches!(
            piece.set_destinations(vec![0, 1]),
            Err(MeshError::PartitionLength { .. })
        ));
        assert_eq!(
            piece.set_destinations(vec![2]),
            Err(MeshError::InvalidRank { rank: 2, size: 2 })
        );
        piece.set_destinations(vec![1]).unwrap();
        assert_eq!(piece.destinations(), &[1]);
    }

    #[test]
    fn serial_migration_is_identity() {
        let piece = DistributedMesh::block_decomposition(strip(3), 0, 1).unwrap();
        let moved = piece.migrate(&NoComm).unwrap();
        assert_eq!(moved, piece);
    }

    #[test]
    fn migration_delivers_each_element_to_its_destination() {
        use crate::algs::communicator::ThreadComm;

        let comms = ThreadComm::group(3);
        let pieces: Vec<DistributedMesh> = std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    s.spawn(move || {
                        let rank = comm.rank();
                        let mut piece =
                            DistributedMesh::block_decomposition(strip(6), rank, 3).unwrap();
                        // send everything one rank to the left
                        let dest = vec![(rank + 2) % 3; piece.elements().len()];
                        piece.set_destinations(dest).unwrap();
                        piece.migrate(&comm).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let ids = |p: &DistributedMesh| p.elements().iter().map(|e| e.id).collect::<Vec<_>>();
        assert_eq!(ids(&pieces[0]), vec![3, 4]);
        assert_eq!(ids(&pieces[1]), vec![5, 6]);
        assert_eq!(ids(&pieces[2]), vec![1, 2]);
        assert_eq!(pieces[2].nodes().keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(pieces.iter().enumerate().all(|(r, p)| p.destinations().iter().all(|&d| d == r)));
    }
}
