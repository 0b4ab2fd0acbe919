use std::fmt::Debug;

/// Element-wise combination applied by the all-reduce collectives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReduceOp
{
    Sum,
    Min,
    Max,
}

impl ReduceOp
{
    #[inline]
    pub fn combine_f64(&self, a: f64, b: f64) -> f64
    {
        match self
        {
            ReduceOp::Sum => a + b,
            ReduceOp::Min => a.min(b),
            ReduceOp::Max => a.max(b),
        }
    }

    #[inline]
    pub fn combine_u64(&self, a: u64, b: u64) -> u64
    {
        match self
        {
            ReduceOp::Sum => a + b,
            ReduceOp::Min => a.min(b),
            ReduceOp::Max => a.max(b),
        }
    }
}

///
/// A group of processing elements (PEs) running the same program.
///
/// Every method other than `rank`, `size`, `root` and `is_root` is a
/// blocking collective: all PEs of the group must call it, in the same
/// order, or the group deadlocks.
///
pub trait Communicator: Send + Sync + Debug
{
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// PE that owns serial I/O.
    fn root(&self) -> usize
    {
        0
    }

    fn is_root(&self) -> bool
    {
        self.rank() == self.root()
    }

    fn barrier(&self);

    /// Combine `values` element-wise across all PEs; every PE receives the result.
    fn all_reduce_f64(&self, values: &mut [f64], op: ReduceOp);

    fn all_reduce_u64(&self, values: &mut [u64], op: ReduceOp);

    ///
    /// Collect each PE's `local` slice on the root. The root receives one
    /// entry per PE in rank order; every other PE receives an empty vector.
    ///
    fn gather_f64(&self, local: &[f64]) -> Vec<Vec<f64>>;

    ///
    /// Distribute `pieces[r]` to PE `r`. Only the root's `pieces` are read;
    /// a PE with no matching piece receives an empty vector.
    ///
    fn scatter_f64(&self, pieces: Vec<Vec<f64>>) -> Vec<f64>;

    /// Copy the root's `data` to every PE.
    fn broadcast_f64(&self, data: Vec<f64>) -> Vec<f64>;
}

/// Single-PE group. Collectives reduce to identities.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialCommunicator;

impl Communicator for SerialCommunicator
{
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn all_reduce_f64(&self, _values: &mut [f64], _op: ReduceOp) {}

    fn all_reduce_u64(&self, _values: &mut [u64], _op: ReduceOp) {}

    fn gather_f64(&self, local: &[f64]) -> Vec<Vec<f64>> {
        vec![local.to_vec()]
    }

    fn scatter_f64(&self, pieces: Vec<Vec<f64>>) -> Vec<f64> {
        pieces.into_iter().next().unwrap_or_default()
    }

    fn broadcast_f64(&self, data: Vec<f64>) -> Vec<f64> {
        data
    }
}

#[test]
fn serial_collectives_are_identities()
{
    let comm = SerialCommunicator;
    let mut v = [1.0, -2.0];
    comm.all_reduce_f64(&mut v, ReduceOp::Min);
    assert_eq!(v, [1.0, -2.0]);
    assert_eq!(comm.gather_f64(&v), vec![vec![1.0, -2.0]]);
    assert_eq!(comm.scatter_f64(vec![vec![3.0]]), vec![3.0]);
    assert!(comm.is_root());
}
