//!
//! SPMD plumbing: the communicator boundary, a single-PE implementation, an
//! in-process thread group for running several PEs inside one program, and
//! scalar reductions built on top of them.
//!
pub mod communicator;
pub mod local_group;
pub mod reduction;

pub use communicator::{Communicator, ReduceOp, SerialCommunicator};
pub use local_group::{LocalCommunicator, LocalGroup};
pub use reduction::ParallelReduction;
