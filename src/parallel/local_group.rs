use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::communicator::{Communicator, ReduceOp};

/// Panic payload of a PE unwound because another PE of its group panicked.
struct GroupAborted;

struct BarrierState
{
    arrived: usize,
    generation: u64,
    aborted: bool,
}

///
/// Reusable barrier that can be torn down. Once aborted, every waiting
/// and every later caller unwinds instead of blocking on a PE that is gone.
///
struct GroupBarrier
{
    size: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl GroupBarrier
{
    fn new(size: usize) -> Self
    {
        Self
        {
            size,
            state: Mutex::new(BarrierState { arrived: 0, generation: 0, aborted: false }),
            released: Condvar::new(),
        }
    }

    fn wait(&self)
    {
        let mut state = self.state.lock();
        if !state.aborted
        {
            let generation = state.generation;
            state.arrived += 1;
            if state.arrived == self.size
            {
                state.arrived = 0;
                state.generation += 1;
                self.released.notify_all();
                return;
            }
            while state.generation == generation && !state.aborted
            {
                self.released.wait(&mut state);
            }
            if state.generation != generation
            {
                return;
            }
        }
        drop(state);
        panic::panic_any(GroupAborted);
    }

    fn abort(&self)
    {
        self.state.lock().aborted = true;
        self.released.notify_all();
    }
}

/// Mailboxes shared by the PEs of one in-process group.
struct Exchange
{
    size: usize,
    barrier: GroupBarrier,
    reals: Vec<Mutex<Vec<f64>>>,
    counts: Vec<Mutex<Vec<u64>>>,
}

impl Exchange
{
    fn new(size: usize) -> Self
    {
        Self
        {
            size,
            barrier: GroupBarrier::new(size),
            reals: (0..size).map(|_| Mutex::new(Vec::new())).collect(),
            counts: (0..size).map(|_| Mutex::new(Vec::new())).collect(),
        }
    }
}

///
/// One PE of a group of threads inside the current process. Each
/// collective posts into the PE's own slot, waits at the barrier, reads
/// what it needs, then waits again so slots can be reused by the next call.
///
pub struct LocalCommunicator
{
    rank: usize,
    exchange: Arc<Exchange>,
}

impl std::fmt::Debug for LocalCommunicator
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCommunicator").field("rank", &self.rank).field("size", &self.exchange.size).finish()
    }
}

impl Communicator for LocalCommunicator
{
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.exchange.size
    }

    fn barrier(&self) {
        self.exchange.barrier.wait();
    }

    fn all_reduce_f64(&self, values: &mut [f64], op: ReduceOp) {
        *self.exchange.reals[self.rank].lock() = values.to_vec();
        self.barrier();
        // combine in rank order so every PE computes a bit-identical result
        let mut result = self.exchange.reals[0].lock().clone();
        for slot in &self.exchange.reals[1..]
        {
            for (acc, &v) in result.iter_mut().zip(slot.lock().iter())
            {
                *acc = op.combine_f64(*acc, v);
            }
        }
        self.barrier();
        values.copy_from_slice(&result);
    }

    fn all_reduce_u64(&self, values: &mut [u64], op: ReduceOp) {
        *self.exchange.counts[self.rank].lock() = values.to_vec();
        self.barrier();
        let mut result = self.exchange.counts[0].lock().clone();
        for slot in &self.exchange.counts[1..]
        {
            for (acc, &v) in result.iter_mut().zip(slot.lock().iter())
            {
                *acc = op.combine_u64(*acc, v);
            }
        }
        self.barrier();
        values.copy_from_slice(&result);
    }

    fn gather_f64(&self, local: &[f64]) -> Vec<Vec<f64>> {
        *self.exchange.reals[self.rank].lock() = local.to_vec();
        self.barrier();
        let gathered = if self.is_root()
        {
            self.exchange.reals.iter().map(|slot| slot.lock().clone()).collect()
        }
        else
        {
            Vec::new()
        };
        self.barrier();
        gathered
    }

    fn scatter_f64(&self, pieces: Vec<Vec<f64>>) -> Vec<f64> {
        if self.is_root()
        {
            for slot in &self.exchange.reals
            {
                slot.lock().clear();
            }
            for (slot, piece) in self.exchange.reals.iter().zip(pieces)
            {
                *slot.lock() = piece;
            }
        }
        self.barrier();
        let mine = std::mem::take(&mut *self.exchange.reals[self.rank].lock());
        self.barrier();
        mine
    }

    fn broadcast_f64(&self, data: Vec<f64>) -> Vec<f64> {
        let root = self.root();
        if self.is_root()
        {
            *self.exchange.reals[root].lock() = data;
        }
        self.barrier();
        let received = self.exchange.reals[root].lock().clone();
        self.barrier();
        received
    }
}

///
/// Runs an SPMD program on `size` threads, one PE each, and returns the
/// per-PE results in rank order. A panic on any PE aborts the group: the
/// other PEs unwind at their next collective, and the first PE's panic is
/// re-raised here once all threads have been joined.
///
pub struct LocalGroup;

impl LocalGroup
{
    pub fn run<R, F>(size: usize, program: F) -> Vec<R>
    where
        R: Send,
        F: Fn(Arc<dyn Communicator>) -> R + Sync,
    {
        assert!(size > 0, "a PE group needs at least one member");
        let exchange = Arc::new(Exchange::new(size));
        let outcomes: Vec<Result<R, Box<dyn Any + Send>>> = std::thread::scope(|scope|
        {
            let handles: Vec<_> = (0..size).map(|rank|
            {
                let exchange = exchange.clone();
                let program = &program;
                scope.spawn(move ||
                {
                    let comm: Arc<dyn Communicator> = Arc::new(LocalCommunicator { rank, exchange: exchange.clone() });
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| program(comm)));
                    if outcome.is_err()
                    {
                        exchange.barrier.abort();
                    }
                    outcome
                })
            }).collect();
            handles.into_iter().map(|h| h.join().unwrap_or_else(Err)).collect()
        });

        let mut results = Vec::with_capacity(size);
        let mut aborted = None;
        for outcome in outcomes
        {
            match outcome
            {
                Ok(r) => results.push(r),
                Err(e) if e.is::<GroupAborted>() => aborted = aborted.or(Some(e)),
                Err(e) => panic::resume_unwind(e),
            }
        }
        if let Some(e) = aborted
        {
            panic::resume_unwind(e);
        }
        results
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn all_reduce_matches_on_every_pe()
    {
        let results = LocalGroup::run(3, |comm|
        {
            let mut v = [comm.rank() as f64 + 1.0, -(comm.rank() as f64)];
            comm.all_reduce_f64(&mut v, ReduceOp::Sum);
            let mut lo = [comm.rank() as f64];
            comm.all_reduce_f64(&mut lo, ReduceOp::Min);
            let mut n = [comm.rank() as u64 * 2];
            comm.all_reduce_u64(&mut n, ReduceOp::Max);
            (v, lo[0], n[0])
        });
        for (v, lo, n) in results
        {
            assert_eq!(v, [6.0, -3.0]);
            assert_eq!(lo, 0.0);
            assert_eq!(n, 4);
        }
    }

    #[test]
    fn gather_then_scatter_restores_local_data()
    {
        let results = LocalGroup::run(4, |comm|
        {
            let local: Vec<f64> = (0..comm.rank() + 1).map(|i| (10 * comm.rank() + i) as f64).collect();
            let gathered = comm.gather_f64(&local);
            if comm.is_root()
            {
                assert_eq!(gathered.len(), 4);
                assert_eq!(gathered[2], vec![20.0, 21.0, 22.0]);
            }
            else
            {
                assert!(gathered.is_empty());
            }
            let back = comm.scatter_f64(gathered);
            (local, back)
        });
        for (local, back) in results
        {
            assert_eq!(local, back);
        }
    }

    #[test]
    fn broadcast_reaches_all_pes()
    {
        let results = LocalGroup::run(2, |comm|
        {
            let data = if comm.is_root() { vec![1.5, 2.5] } else { Vec::new() };
            comm.broadcast_f64(data)
        });
        assert!(results.iter().all(|r| r == &vec![1.5, 2.5]));
    }

    #[test]
    fn panic_on_one_pe_releases_the_others()
    {
        let outcome = panic::catch_unwind(||
        {
            LocalGroup::run(3, |comm|
            {
                if comm.rank() == 1
                {
                    panic!("rank 1 failed");
                }
                let mut v = [1.0];
                comm.all_reduce_f64(&mut v, ReduceOp::Sum);
                comm.barrier();
                v[0]
            })
        });
        let payload = outcome.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"rank 1 failed"));
    }
}
