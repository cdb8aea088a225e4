//! Per-rank mesh fragments: `<output>.<N>.<i>`.
//!
//! The fragment index is the owning rank, zero-padded to the number of
//! decimal digits of `N` so fragments sort lexically (`mesh.msh.12.03`).

use crate::io::gmsh::{GmshReader, GmshWriter};
use crate::mesh::{DistributedMesh, SerialMesh};
use crate::mesh_error::MeshError;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Glob-style pattern naming every fragment of a run, `<output>.<N>.*`.
pub fn output_pattern(output: &str, num_procs: usize) -> String {
    format!("{output}.{num_procs}.*")
}

/// Path of fragment `index` out of `num_procs`.
pub fn fragment_path(output: impl AsRef<Path>, num_procs: usize, index: usize) -> PathBuf {
    let width = num_procs.to_string().len();
    let mut name = output.as_ref().as_os_str().to_owned();
    name.push(format!(".{num_procs}.{index:0width$}"));
    PathBuf::from(name)
}

/// Write the local piece as this rank's fragment. `mesh` must already be
/// migrated (every element destined for this rank).
pub fn write_local_fragment(
    writer: &GmshWriter,
    output: impl AsRef<Path>,
    mesh: &DistributedMesh,
) -> Result<PathBuf, MeshError> {
    let path = fragment_path(&output, mesh.size(), mesh.rank());
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file = fs::File::create(&path)?;
    writer.write(BufWriter::new(file), mesh.nodes(), mesh.elements())?;
    log::debug!(
        "rank {}: wrote {} elements to {}",
        mesh.rank(),
        mesh.elements().len(),
        path.display()
    );
    Ok(path)
}

/// Read back all `num_procs` fragments of `output` into one mesh, elements
/// sorted by id. Errors if any fragment is missing or if two fragments
/// disagree on a shared node.
pub fn read_fragments(
    reader: &GmshReader,
    output: impl AsRef<Path>,
    num_procs: usize,
) -> Result<SerialMesh, MeshError> {
    let mut merged = SerialMesh::default();
    for index in 0..num_procs {
        let path = fragment_path(&output, num_procs, index);
        let piece = reader.read(fs::File::open(&path)?)?;
        for (id, xyz) in piece.nodes {
            match merged.nodes.insert(id, xyz) {
                Some(prev) if prev != xyz => {
                    return Err(MeshError::MeshIoParse(format!(
                        "node {id} differs between fragments"
                    )));
                }
                _ => {}
            }
        }
        merged.elements.extend(piece.elements);
    }
    merged.elements.sort_by_key(|e| e.id);
    Ok(merged)
}
