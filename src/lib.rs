#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-balance
//!
//! mesh-balance rebalances an unstructured mesh across the processes of a
//! parallel (SPMD) run. Every process executes the same [`LifeCycle`]: parse
//! and validate the command line, bind root-only diagnostics, then read an
//! initial block decomposition, partition the elements and write one mesh
//! fragment per process.
//!
//! ## Features
//! - Gmsh ASCII 2.2 reader/writer and per-process fragment naming
//!   (`<output>.<N>.<index>`)
//! - Element dual graph with geometric (RCB) and graph-ordering (RCM)
//!   partitioners, METIS k-way behind `metis-support`
//! - Pluggable process groups: serial, in-process threads (tests) and MPI
//!   behind `mpi-support`
//! - Agreement after every collective phase, so a failure on one process is
//!   seen by all of them and nobody is left waiting in a collective
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-balance = "0.1"
//! # Optional features:
//! # features = ["mpi-support","rayon","metis-support"]
//! ```
//!
//! ```no_run
//! use mesh_balance::prelude::*;
//!
//! let comm = NoComm;
//! let mut run = LifeCycle::new(&comm, ["mesh-balance", "mesh.msh", "out"]);
//! run.run();
//! std::process::exit(run.exit_code().code() as i32);
//! ```
//!
//! [`LifeCycle`]: crate::setup::LifeCycle

pub mod algs;
pub mod balance;
pub mod io;
pub mod mesh;
pub mod mesh_error;
pub mod partitioning;
pub mod setup;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, NoComm, ThreadComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::balance::{Balancer, MeshBalancer};
    pub use crate::io::{BalanceIo, MeshIo, output_pattern, read_fragments};
    pub use crate::mesh::{DistributedMesh, Element, ElementKind, SerialMesh};
    pub use crate::mesh_error::MeshError;
    pub use crate::partitioning::{DecompMethod, PartitionError};
    pub use crate::setup::{
        BalanceError, Console, DefaultStages, ExitCode, LifeCycle, ParseError, Settings, Stages,
        State,
    };
}
