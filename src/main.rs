//! `mesh-balance` binary: one process of a balance run.

use mesh_balance::prelude::*;
use mesh_balance::setup::logging;
use std::process::ExitCode as ProcessExitCode;

fn run<C: Communicator>(comm: &C) -> ProcessExitCode {
    logging::init(comm.is_root());
    let mut lifecycle = LifeCycle::new(comm, std::env::args_os());
    lifecycle.run();
    lifecycle.exit_code().into()
}

#[cfg(feature = "mpi-support")]
fn main() -> ProcessExitCode {
    // `comm` finalizes MPI when dropped, after `run` returns
    let Some(comm) = MpiComm::new() else {
        eprintln!("mesh-balance: MPI was already initialized");
        return ExitCode::BalanceFailure.into();
    };
    run(&comm)
}

#[cfg(not(feature = "mpi-support"))]
fn main() -> ProcessExitCode {
    run(&NoComm)
}
