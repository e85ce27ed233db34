//! Queue storage for RelayQ.
//!
//! The dispatcher keeps its pending messages in a single unbounded FIFO held
//! in memory. The store pairs the queue with an "updated" flag and a condition
//! variable so the worker thread sleeps until there is something to do.

pub mod memory;
pub use memory::MessageStore;

/// What the worker should do after waking up on the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// New messages may be pending, drain the queue
    Updated,
    /// Stop was requested and nothing is left to process
    Shutdown,
}
