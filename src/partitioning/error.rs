//! Partitioning errors for mesh-balance

use thiserror::Error;

/// Errors from the partitioning backends
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PartitionError {
    /// Asked for zero parts
    #[error("Number of parts must be at least 1")]
    NoParts,
    /// Per-vertex input (centroids, weights) does not match the graph
    #[error("Partition input length mismatch: graph has {expected} vertices, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    /// The requested backend was not compiled in
    #[error("Decomposition method `{0}` is not available in this build")]
    Unavailable(&'static str),
    /// Other errors (e.g. METIS wrapper failures)
    #[error("Partitioner error: {0}")]
    Backend(String),
}
