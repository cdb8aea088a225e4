//! Group communication and graph building blocks.

pub mod communicator;
pub mod dual_graph;
pub mod wire;

pub use communicator::{Communicator, NoComm, ThreadComm};
pub use dual_graph::{DualGraph, build_dual};
