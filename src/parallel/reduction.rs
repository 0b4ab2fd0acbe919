use super::communicator::{Communicator, ReduceOp};

///
/// Scalar reductions over all PEs of a communicator. Every call is a
/// collective.
///
#[derive(Clone, Copy)]
pub struct ParallelReduction<'a>
{
    comm: &'a dyn Communicator,
}

impl<'a> ParallelReduction<'a>
{
    pub fn new(comm: &'a dyn Communicator) -> Self
    {
        Self { comm }
    }

    pub fn sum(&self, value: f64) -> f64
    {
        let mut v = [value];
        self.comm.all_reduce_f64(&mut v, ReduceOp::Sum);
        v[0]
    }

    /// Sum several partial sums in a single collective.
    pub fn sum_many(&self, values: &mut [f64])
    {
        self.comm.all_reduce_f64(values, ReduceOp::Sum);
    }

    /// Elementwise minimum of several values in a single collective.
    pub fn min_many(&self, values: &mut [f64])
    {
        self.comm.all_reduce_f64(values, ReduceOp::Min);
    }

    pub fn max_many(&self, values: &mut [f64])
    {
        self.comm.all_reduce_f64(values, ReduceOp::Max);
    }

    pub fn sum_count(&self, count: usize) -> usize
    {
        let mut v = [count as u64];
        self.comm.all_reduce_u64(&mut v, ReduceOp::Sum);
        v[0] as usize
    }

    pub fn min(&self, value: f64) -> f64
    {
        let mut v = [value];
        self.comm.all_reduce_f64(&mut v, ReduceOp::Min);
        v[0]
    }

    pub fn max(&self, value: f64) -> f64
    {
        let mut v = [value];
        self.comm.all_reduce_f64(&mut v, ReduceOp::Max);
        v[0]
    }

    ///
    /// Share the root's verdict on a root-only step, so that every PE takes
    /// the same branch afterwards.
    ///
    pub fn root_status(&self, ok: bool) -> bool
    {
        let flag = if self.comm.is_root() { vec![if ok { 1.0 } else { 0.0 }] } else { Vec::new() };
        self.comm.broadcast_f64(flag).first().is_some_and(|&f| f == 1.0)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::parallel::LocalGroup;

    #[test]
    fn reductions_across_two_pes()
    {
        let results = LocalGroup::run(2, |comm|
        {
            let red = ParallelReduction::new(comm.as_ref());
            let r = comm.rank() as f64;
            let mut pair = [r, 2.0 * r];
            red.sum_many(&mut pair);
            (red.sum(r + 1.0), red.sum_count(comm.rank() + 3), red.min(r - 5.0), red.max(r * 10.0), pair)
        });
        for (sum, count, min, max, pair) in results
        {
            assert_eq!(sum, 3.0);
            assert_eq!(count, 7);
            assert_eq!(min, -5.0);
            assert_eq!(max, 10.0);
            assert_eq!(pair, [1.0, 2.0]);
        }
    }

    #[test]
    fn root_status_is_shared()
    {
        let results = LocalGroup::run(3, |comm|
        {
            // only the root's opinion counts
            let red = ParallelReduction::new(comm.as_ref());
            red.root_status(!comm.is_root())
        });
        assert_eq!(results, vec![false, false, false]);
    }
}
