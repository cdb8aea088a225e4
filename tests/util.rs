#![allow(dead_code)]
use mesh_balance::algs::communicator::{Communicator, ThreadComm};
use mesh_balance::balance::Balancer;
use mesh_balance::io::MeshIo;
use mesh_balance::io::gmsh::GmshWriter;
use mesh_balance::mesh::{Element, ElementKind, NodeMap, SerialMesh};
use mesh_balance::mesh_error::MeshError;
use mesh_balance::setup::{Settings, Stages};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// `nx × ny` grid of unit quads in the z = 0 plane, row-major ids from 1.
pub fn quad_grid(nx: u64, ny: u64) -> SerialMesh {
    let node = |i: u64, j: u64| j * (nx + 1) + i + 1;
    let mut nodes = NodeMap::new();
    for j in 0..=ny {
        for i in 0..=nx {
            nodes.insert(node(i, j), [i as f64, j as f64, 0.0]);
        }
    }
    let elements = (0..ny)
        .flat_map(|j| (0..nx).map(move |i| (i, j)))
        .map(|(i, j)| Element {
            id: j * nx + i + 1,
            kind: ElementKind::Quad,
            tags: vec![1, 1],
            nodes: vec![node(i, j), node(i + 1, j), node(i + 1, j + 1), node(i, j + 1)],
        })
        .collect();
    SerialMesh { nodes, elements }
}

/// Write `mesh` as `dir/name` in Gmsh format.
pub fn write_mesh(dir: &Path, name: &str, mesh: &SerialMesh) -> PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    GmshWriter.write(file, &mesh.nodes, &mesh.elements).unwrap();
    path
}

/// Command line with the program name prepended.
pub fn argv(args: &[&str]) -> Vec<String> {
    std::iter::once("mesh-balance")
        .chain(args.iter().copied())
        .map(String::from)
        .collect()
}

pub fn path_str(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

/// Run `f` on every member of a `size`-rank in-process group, one thread
/// each; results are returned in rank order.
pub fn run_group<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(ThreadComm) -> T + Sync,
{
    let comms = ThreadComm::group(size);
    std::thread::scope(|s| {
        let f = &f;
        let handles: Vec<_> = comms.into_iter().map(|c| s.spawn(move || f(c))).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

/// Collaborator call, as seen by [`RecordingStages`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Read,
    Balance,
    Write,
}

/// Stages whose I/O and balancer only record calls, optionally failing one
/// step (on every rank, or only on `fail_rank`).
#[derive(Clone, Default)]
pub struct RecordingStages {
    calls: Arc<Mutex<Vec<(usize, Step)>>>,
    fail: Option<Step>,
    fail_rank: Option<usize>,
}

impl RecordingStages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(step: Step) -> Self {
        Self {
            fail: Some(step),
            ..Self::default()
        }
    }

    pub fn failing_on(step: Step, rank: usize) -> Self {
        Self {
            fail: Some(step),
            fail_rank: Some(rank),
            ..Self::default()
        }
    }

    /// Steps recorded on `rank`, in call order.
    pub fn calls(&self, rank: usize) -> Vec<Step> {
        self.calls
            .lock()
            .iter()
            .filter(|(r, _)| *r == rank)
            .map(|&(_, s)| s)
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    fn hook(&self, rank: usize) -> Hook {
        Hook {
            calls: self.calls.clone(),
            rank,
            fail: self
                .fail
                .filter(|_| self.fail_rank.is_none_or(|r| r == rank)),
        }
    }
}

struct Hook {
    calls: Arc<Mutex<Vec<(usize, Step)>>>,
    rank: usize,
    fail: Option<Step>,
}

impl Hook {
    fn record(&self, step: Step) -> Result<(), MeshError> {
        self.calls.lock().push((self.rank, step));
        if self.fail == Some(step) {
            Err(MeshError::Io(format!("injected {step:?} failure")))
        } else {
            Ok(())
        }
    }
}

impl MeshIo for Hook {
    type Mesh = Vec<u64>;

    fn read_initial_decomposition(&mut self) -> Result<Vec<u64>, MeshError> {
        self.record(Step::Read).map(|()| vec![1, 2, 3])
    }

    fn write(&mut self, _mesh: &Vec<u64>) -> Result<(), MeshError> {
        self.record(Step::Write)
    }
}

impl Balancer<Vec<u64>> for Hook {
    fn balance(&self, mesh: &mut Vec<u64>) -> Result<(), MeshError> {
        self.record(Step::Balance)?;
        mesh.reverse();
        Ok(())
    }
}

impl<C: Communicator> Stages<C> for RecordingStages {
    type Mesh = Vec<u64>;

    fn mesh_io<'a>(
        &self,
        comm: &'a C,
        _settings: &Settings,
    ) -> Box<dyn MeshIo<Mesh = Vec<u64>> + 'a> {
        Box::new(self.hook(comm.rank()))
    }

    fn balancer<'a>(
        &self,
        comm: &'a C,
        _settings: &Settings,
    ) -> Box<dyn Balancer<Vec<u64>> + 'a> {
        Box::new(self.hook(comm.rank()))
    }
}
