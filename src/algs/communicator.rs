//! Thin façade over the process group a balance run executes in.
//!
//! Every method except `rank`/`size` is **collective**: all members of the
//! group must call it, in the same order, or the group deadlocks. Messages are
//! contiguous byte buffers; typed payloads go through [`crate::algs::wire`].

use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier};

/// The set of cooperating processes of one run.
pub trait Communicator {
    /// Rank of this process, `0..size()`.
    fn rank(&self) -> usize;

    /// Number of processes in the group.
    fn size(&self) -> usize;

    /// The root process owns console and log output.
    fn is_root(&self) -> bool {
        self.rank() == 0
    }

    /// Block until every member has reached the barrier.
    fn barrier(&self);

    /// Logical AND of `local_ok` over the whole group.
    fn all_agree(&self, local_ok: bool) -> bool;

    /// Gather every member's buffer on every member, indexed by source rank.
    fn allgather_bytes(&self, local: &[u8]) -> Vec<Vec<u8>>;

    /// Personalised all-to-all: `outgoing[d]` is delivered to rank `d`; the
    /// result holds what each source rank sent to us, indexed by source.
    ///
    /// # Panics
    /// Panics if `outgoing.len() != self.size()`.
    fn exchange(&self, outgoing: Vec<Vec<u8>>) -> Vec<Vec<u8>>;
}

/// Single-process group for serial runs and unit tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn all_agree(&self, local_ok: bool) -> bool {
        local_ok
    }

    fn allgather_bytes(&self, local: &[u8]) -> Vec<Vec<u8>> {
        vec![local.to_vec()]
    }

    fn exchange(&self, outgoing: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
        assert_eq!(outgoing.len(), 1, "exchange needs one buffer per rank");
        outgoing
    }
}

// --- ThreadComm: N group members as N threads of one process ---

type Key = (u64, usize, usize); // (epoch, src, dst)

struct Hub {
    size: usize,
    barrier: Barrier,
    mailbox: DashMap<Key, Bytes>,
}

/// In-process group member. Create a whole group with [`ThreadComm::group`]
/// and drive each handle from its own thread.
///
/// Collectives are matched by a per-handle epoch counter, so members must
/// issue collectives in the same order (exactly as with MPI).
pub struct ThreadComm {
    rank: usize,
    hub: Arc<Hub>,
    epoch: AtomicU64,
}

impl ThreadComm {
    /// One handle per rank of a fresh group of `size` members.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        assert!(size > 0, "a process group needs at least one member");
        let hub = Arc::new(Hub {
            size,
            barrier: Barrier::new(size),
            mailbox: DashMap::new(),
        });
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                hub: Arc::clone(&hub),
                epoch: AtomicU64::new(0),
            })
            .collect()
    }

    fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::Relaxed)
    }

    fn post_and_collect(&self, outgoing: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
        let epoch = self.next_epoch();
        for (dst, buf) in outgoing.into_iter().enumerate() {
            self.hub
                .mailbox
                .insert((epoch, self.rank, dst), Bytes::from(buf));
        }
        self.hub.barrier.wait();
        (0..self.hub.size)
            .map(|src| {
                self.hub
                    .mailbox
                    .remove(&(epoch, src, self.rank))
                    .map(|(_, v)| v.to_vec())
                    .unwrap_or_default()
            })
            .collect()
    }
}

impl std::fmt::Debug for ThreadComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadComm")
            .field("rank", &self.rank)
            .field("size", &self.hub.size)
            .finish()
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.hub.size
    }

    fn barrier(&self) {
        self.hub.barrier.wait();
    }

    fn all_agree(&self, local_ok: bool) -> bool {
        self.allgather_bytes(&[local_ok as u8])
            .iter()
            .all(|b| b.first() == Some(&1))
    }

    fn allgather_bytes(&self, local: &[u8]) -> Vec<Vec<u8>> {
        let outgoing = vec![local.to_vec(); self.hub.size];
        self.post_and_collect(outgoing)
    }

    fn exchange(&self, outgoing: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
        assert_eq!(
            outgoing.len(),
            self.hub.size,
            "exchange needs one buffer per rank"
        );
        self.post_and_collect(outgoing)
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::Communicator;
    use mpi::Count;
    use mpi::collective::SystemOperation;
    use mpi::datatype::{Partition, PartitionMut};
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// World communicator of an MPI job. Owns the MPI environment:
    /// dropping it finalizes MPI.
    pub struct MpiComm {
        // `world` must drop before `_universe`.
        world: SimpleCommunicator,
        _universe: Universe,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        /// Initialize MPI. Returns `None` if MPI was already initialized.
        pub fn new() -> Option<Self> {
            let universe = mpi::initialize()?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Some(Self {
                world,
                _universe: universe,
                rank,
                size,
            })
        }
    }

    fn displacements(counts: &[Count]) -> Vec<Count> {
        counts
            .iter()
            .scan(0, |acc, &c| {
                let d = *acc;
                *acc += c;
                Some(d)
            })
            .collect()
    }

    fn split(buf: Vec<u8>, counts: &[Count], displs: &[Count]) -> Vec<Vec<u8>> {
        counts
            .iter()
            .zip(displs)
            .map(|(&c, &d)| buf[d as usize..(d + c) as usize].to_vec())
            .collect()
    }

    impl Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn barrier(&self) {
            self.world.barrier();
        }

        fn all_agree(&self, local_ok: bool) -> bool {
            let local = local_ok as i32;
            let mut global = 0i32;
            self.world
                .all_reduce_into(&local, &mut global, SystemOperation::min());
            global == 1
        }

        fn allgather_bytes(&self, local: &[u8]) -> Vec<Vec<u8>> {
            let count = local.len() as Count;
            let mut counts = vec![0 as Count; self.size];
            self.world.all_gather_into(&count, &mut counts[..]);
            let displs = displacements(&counts);
            let total: Count = counts.iter().sum();
            let mut recv = vec![0u8; total as usize];
            {
                let mut partition = PartitionMut::new(&mut recv[..], &counts[..], &displs[..]);
                self.world.all_gather_varcount_into(local, &mut partition);
            }
            split(recv, &counts, &displs)
        }

        fn exchange(&self, outgoing: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
            assert_eq!(outgoing.len(), self.size, "exchange needs one buffer per rank");
            let send_counts: Vec<Count> = outgoing.iter().map(|b| b.len() as Count).collect();
            let send_displs = displacements(&send_counts);
            let send: Vec<u8> = outgoing.concat();

            let mut recv_counts = vec![0 as Count; self.size];
            self.world
                .all_to_all_into(&send_counts[..], &mut recv_counts[..]);
            let recv_displs = displacements(&recv_counts);
            let total: Count = recv_counts.iter().sum();
            let mut recv = vec![0u8; total as usize];
            {
                let partition = Partition::new(&send[..], &send_counts[..], &send_displs[..]);
                let mut recv_partition =
                    PartitionMut::new(&mut recv[..], &recv_counts[..], &recv_displs[..]);
                self.world
                    .all_to_all_varcount_into(&partition, &mut recv_partition);
            }
            split(recv, &recv_counts, &recv_displs)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
