//! Mesh I/O for a balance run.
//!
//! [`MeshIo`] is the seam the orchestrator drives: an initial decomposition
//! read and a final partitioned write, both collective. [`BalanceIo`] is the
//! Gmsh-backed implementation.

pub mod gmsh;
pub mod partitioned;

pub use partitioned::{fragment_path, output_pattern, read_fragments};

use crate::algs::communicator::Communicator;
use crate::io::gmsh::{GmshReader, GmshWriter};
use crate::mesh::DistributedMesh;
use crate::mesh_error::MeshError;
use crate::setup::Settings;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

/// Reads and persists the distributed mesh of one run.
pub trait MeshIo {
    /// Distributed mesh handle produced by the read.
    type Mesh;

    /// Read the input and decompose it over the group (collective).
    fn read_initial_decomposition(&mut self) -> Result<Self::Mesh, MeshError>;

    /// Persist `mesh` as per-process fragments (collective).
    fn write(&mut self, mesh: &Self::Mesh) -> Result<(), MeshError>;
}

/// Gmsh-backed [`MeshIo`] bound to one process group and one settings value.
pub struct BalanceIo<'c, C: Communicator> {
    comm: &'c C,
    input: PathBuf,
    output: PathBuf,
    reader: GmshReader,
    writer: GmshWriter,
}

impl<'c, C: Communicator> BalanceIo<'c, C> {
    pub fn new(comm: &'c C, settings: &Settings) -> Self {
        Self {
            comm,
            input: PathBuf::from(settings.input_filename()),
            output: PathBuf::from(settings.output_filename()),
            reader: GmshReader,
            writer: GmshWriter,
        }
    }
}

impl<C: Communicator> MeshIo for BalanceIo<'_, C> {
    type Mesh = DistributedMesh;

    fn read_initial_decomposition(&mut self) -> Result<DistributedMesh, MeshError> {
        let file = File::open(&self.input)
            .map_err(|e| MeshError::Io(format!("{}: {e}", self.input.display())))?;
        let mesh = self.reader.read(BufReader::new(file))?;
        let total = mesh.elements.len();
        let piece = DistributedMesh::block_decomposition(mesh, self.comm.rank(), self.comm.size())?;
        log::debug!(
            "rank {}: initial decomposition holds {} of {} elements",
            self.comm.rank(),
            piece.elements().len(),
            total
        );
        Ok(piece)
    }

    fn write(&mut self, mesh: &DistributedMesh) -> Result<(), MeshError> {
        let local = mesh.migrate(self.comm)?;
        partitioned::write_local_fragment(&self.writer, &self.output, &local)?;
        Ok(())
    }
}
