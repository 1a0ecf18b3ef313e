//! Thin façade over serial, intra-process (threads) or inter-process (MPI)
//! collective communication.
//!
//! Payloads are *contiguous byte slices*. Every method is a collective: all
//! ranks of a group must call the same methods in the same order, otherwise
//! the group blocks forever. Nothing here detects a mismatch.

use std::sync::{Arc, Barrier};

use bytes::Bytes;
use parking_lot::Mutex;

/// Reduction applied by [`Communicator::all_reduce_f64`] and friends.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReduceOp {
    Min,
    Max,
    Sum,
}

impl ReduceOp {
    #[inline]
    fn apply_f64(self, a: f64, b: f64) -> f64 {
        match self {
            ReduceOp::Min => a.min(b),
            ReduceOp::Max => a.max(b),
            ReduceOp::Sum => a + b,
        }
    }

    #[inline]
    fn apply_u64(self, a: u64, b: u64) -> u64 {
        match self {
            ReduceOp::Min => a.min(b),
            ReduceOp::Max => a.max(b),
            ReduceOp::Sum => a + b,
        }
    }
}

/// Collective communication interface.
pub trait Communicator {
    /// Rank of this process within the group.
    fn rank(&self) -> usize;
    /// Number of ranks in the group.
    fn size(&self) -> usize;
    /// Block until every rank has reached the barrier.
    fn barrier(&self);
    /// Gather one byte buffer from every rank, indexed by rank.
    fn all_gather(&self, buf: &[u8]) -> Vec<Bytes>;

    /// Reduce a scalar across all ranks.
    fn all_reduce_f64(&self, value: f64, op: ReduceOp) -> f64 {
        self.all_gather(bytemuck::bytes_of(&value))
            .iter()
            .map(|b| bytemuck::pod_read_unaligned::<f64>(&b[..8]))
            .fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |a| op.apply_f64(a, v)))
            })
            .unwrap_or(value)
    }

    /// Reduce an unsigned integer across all ranks.
    fn all_reduce_u64(&self, value: u64, op: ReduceOp) -> u64 {
        self.all_gather(bytemuck::bytes_of(&value))
            .iter()
            .map(|b| bytemuck::pod_read_unaligned::<u64>(&b[..8]))
            .fold(None, |acc: Option<u64>, v| {
                Some(acc.map_or(v, |a| op.apply_u64(a, v)))
            })
            .unwrap_or(value)
    }

    /// Logical OR across all ranks.
    fn any(&self, flag: bool) -> bool {
        self.all_reduce_u64(flag as u64, ReduceOp::Max) != 0
    }
}

/// Single-rank communicator for serial runs and unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn barrier(&self) {}
    fn all_gather(&self, buf: &[u8]) -> Vec<Bytes> {
        vec![Bytes::copy_from_slice(buf)]
    }
    fn all_reduce_f64(&self, value: f64, _op: ReduceOp) -> f64 {
        value
    }
    fn all_reduce_u64(&self, value: u64, _op: ReduceOp) -> u64 {
        value
    }
}

// --- LocalComm: ranks are threads of one process ---

#[derive(Debug)]
struct LocalGroup {
    barrier: Barrier,
    slots: Mutex<Vec<Bytes>>,
}

/// Intra-process communicator: each thread holding one handle acts as a rank.
///
/// Create a whole group with [`LocalComm::group`] and move one handle into each
/// worker thread.
#[derive(Clone, Debug)]
pub struct LocalComm {
    rank: usize,
    size: usize,
    group: Arc<LocalGroup>,
}

impl LocalComm {
    /// Build `size` connected handles, one per rank.
    pub fn group(size: usize) -> Vec<LocalComm> {
        let size = size.max(1);
        let group = Arc::new(LocalGroup {
            barrier: Barrier::new(size),
            slots: Mutex::new(vec![Bytes::new(); size]),
        });
        (0..size)
            .map(|rank| LocalComm {
                rank,
                size,
                group: Arc::clone(&group),
            })
            .collect()
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }
    fn barrier(&self) {
        self.group.barrier.wait();
    }
    fn all_gather(&self, buf: &[u8]) -> Vec<Bytes> {
        self.group.slots.lock()[self.rank] = Bytes::copy_from_slice(buf);
        self.group.barrier.wait();
        let gathered = self.group.slots.lock().clone();
        // nobody may overwrite a slot before every rank has read it
        self.group.barrier.wait();
        gathered
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::collective::SystemOperation;
    use mpi::datatype::PartitionMut;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;
    use mpi::Count;

    /// Communicator over `MPI_COMM_WORLD`.
    pub struct MpiComm {
        _universe: Universe,
        world: SimpleCommunicator,
    }

    impl MpiComm {
        /// Initialise MPI; returns `None` if it was already initialised.
        pub fn new() -> Option<Self> {
            let universe = mpi::initialize()?;
            let world = universe.world();
            Some(Self {
                _universe: universe,
                world,
            })
        }

        fn system_op(op: ReduceOp) -> SystemOperation {
            match op {
                ReduceOp::Min => SystemOperation::min(),
                ReduceOp::Max => SystemOperation::max(),
                ReduceOp::Sum => SystemOperation::sum(),
            }
        }
    }

    impl Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.world.rank() as usize
        }
        fn size(&self) -> usize {
            self.world.size() as usize
        }
        fn barrier(&self) {
            self.world.barrier();
        }
        fn all_gather(&self, buf: &[u8]) -> Vec<Bytes> {
            let size = self.size();
            let local = buf.len() as Count;
            let mut counts = vec![0 as Count; size];
            self.world.all_gather_into(&local, &mut counts[..]);
            let displs: Vec<Count> = counts
                .iter()
                .scan(0 as Count, |acc, &c| {
                    let d = *acc;
                    *acc += c;
                    Some(d)
                })
                .collect();
            let total: usize = counts.iter().map(|&c| c as usize).sum();
            let mut recv = vec![0u8; total];
            {
                let mut partition = PartitionMut::new(&mut recv[..], counts.clone(), &displs[..]);
                self.world.all_gather_varcount_into(buf, &mut partition);
            }
            let recv = Bytes::from(recv);
            counts
                .iter()
                .zip(&displs)
                .map(|(&c, &d)| recv.slice(d as usize..(d + c) as usize))
                .collect()
        }
        fn all_reduce_f64(&self, value: f64, op: ReduceOp) -> f64 {
            let mut out = value;
            self.world
                .all_reduce_into(&value, &mut out, Self::system_op(op));
            out
        }
        fn all_reduce_u64(&self, value: u64, op: ReduceOp) -> u64 {
            let mut out = value;
            self.world
                .all_reduce_into(&value, &mut out, Self::system_op(op));
            out
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_reductions_are_identity() {
        let comm = NoComm;
        assert_eq!(comm.all_reduce_f64(2.5, ReduceOp::Min), 2.5);
        assert_eq!(comm.all_reduce_u64(7, ReduceOp::Sum), 7);
        assert!(comm.any(true));
        assert!(!comm.any(false));
        let gathered = comm.all_gather(&[1, 2, 3]);
        assert_eq!(gathered.len(), 1);
        assert_eq!(&gathered[0][..], &[1, 2, 3]);
    }

    #[test]
    fn local_group_reduces_across_threads() {
        let comms = LocalComm::group(3);
        let results: Vec<(f64, f64, u64, bool)> = std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    s.spawn(move || {
                        let r = comm.rank() as f64;
                        let min = comm.all_reduce_f64(r + 1.0, ReduceOp::Min);
                        let max = comm.all_reduce_f64(r + 1.0, ReduceOp::Max);
                        let sum = comm.all_reduce_u64(comm.rank() as u64, ReduceOp::Sum);
                        let any = comm.any(comm.rank() == 2);
                        (min, max, sum, any)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for (min, max, sum, any) in results {
            assert_eq!(min, 1.0);
            assert_eq!(max, 3.0);
            assert_eq!(sum, 3);
            assert!(any);
        }
    }

    #[test]
    fn local_gather_preserves_rank_order() {
        let comms = LocalComm::group(2);
        let gathered: Vec<Vec<Bytes>> = std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| s.spawn(move || comm.all_gather(&[comm.rank() as u8; 2])))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for g in gathered {
            assert_eq!(&g[0][..], &[0, 0]);
            assert_eq!(&g[1][..], &[1, 1]);
        }
    }
}
