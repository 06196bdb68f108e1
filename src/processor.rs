//! Background processing.
//!
//! One dedicated worker thread per document runs every scan sequentially. The
//! [`ProcessingSupervisor`] owns that thread, accepts at most one operation at a
//! time, and offers cooperative cancellation and progress.

pub mod protocol;
pub mod supervisor;
mod worker;

pub use protocol::{EventKind, Operation, ProcessorCommand, ProcessorEvent};
pub use supervisor::{Dispatch, ProcessingSupervisor};
