//! MeshError: unified error type for the mesh, I/O and partitioning layers.
//!
//! Everything below the orchestrator reports failures through this type; the
//! orchestrator wraps it into a phase-tagged [`BalanceError`](crate::setup::BalanceError).

use crate::partitioning::PartitionError;
use thiserror::Error;

/// Unified error type for mesh-balance operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// Underlying filesystem failure (message of the `std::io::Error`).
    #[error("I/O error: {0}")]
    Io(String),
    /// Malformed mesh file contents.
    #[error("Mesh parse error: {0}")]
    MeshIoParse(String),
    /// An element references a node that is not present in the mesh.
    #[error("Element {element} references unknown node {node}")]
    MissingNode { element: u64, node: u64 },
    /// A partition vector does not match the number of owned elements.
    #[error("Partition length mismatch: expected {expected}, got {got}")]
    PartitionLength { expected: usize, got: usize },
    /// A destination rank outside `0..size`.
    #[error("Destination rank {rank} out of range for a group of {size}")]
    InvalidRank { rank: usize, size: usize },
    /// Malformed message received from a peer.
    #[error("Wire decode error: {0}")]
    Wire(String),
    /// The partitioning backend failed.
    #[error(transparent)]
    Partition(#[from] PartitionError),
}

impl From<std::io::Error> for MeshError {
    fn from(e: std::io::Error) -> Self {
        MeshError::Io(e.to_string())
    }
}
