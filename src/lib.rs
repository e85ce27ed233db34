//! # RelayQ
//!
//! A queued message dispatcher: post messages from any thread, have them
//! handled one at a time, in order, on a dedicated worker thread.
//!
//! ## Features
//!
//! - **Strict FIFO**: messages are handled in the order they were posted
//! - **Non-blocking producers**: posting never waits on the handler
//! - **Graceful or forced stop**: drain everything first, or drop what is left
//! - **Restartable**: start, drain, start again as often as needed
//! - **Observable**: exit status after every run, statistics, `tracing` logs
//!
//! ## Quick Start
//!
//! ```rust
//! use relayq::prelude::*;
//! use std::sync::{Arc, Mutex};
//! use std::time::Duration;
//!
//! #[derive(Debug, Clone, Copy)]
//! enum Op {
//!     Add,
//!     Mul,
//! }
//!
//! type Calc = GenericMessage<Op, i64, ()>;
//!
//! let acc = Arc::new(Mutex::new(1i64));
//! let sink = Arc::clone(&acc);
//!
//! let dispatcher: QueuedDispatcher<Calc> = QueuedDispatcher::with_handler(move |msg: Calc| {
//!     let mut acc = sink.lock().unwrap();
//!     match msg.op {
//!         Op::Add => *acc += msg.lower,
//!         Op::Mul => *acc *= msg.lower,
//!     }
//!     Outcome::Good
//! });
//!
//! dispatcher.start()?;
//! dispatcher.post_message(GenericMessage::new(Op::Add, 2, ()));
//! dispatcher.post_message(GenericMessage::new(Op::Mul, 5, ()));
//!
//! let status = dispatcher.join_after_drain(Duration::from_millis(1));
//! assert_eq!(status, Some(ExitStatus::Stopped));
//! assert_eq!(*acc.lock().unwrap(), 15);
//! # Ok::<(), DispatchError>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod message;
pub mod queue;

pub mod prelude {
    pub use crate::config::*;
    pub use crate::core::{
        DispatcherState, DispatcherStats, ExitStatus, MessageHandler, QueuedDispatcher,
        SharedHandler,
    };
    pub use crate::error::{DispatchError, DispatchResult};
    pub use crate::message::{GenericMessage, Outcome, QuadMessage};
}

pub use crate::config::*;
pub use crate::core::{
    DispatcherState, DispatcherStats, ExitStatus, HandlerSlot, MessageHandler, QueuedDispatcher,
    SharedHandler,
};
pub use crate::error::{DispatchError, DispatchResult};
pub use crate::message::{GenericMessage, Outcome, QuadMessage};
pub use crate::queue::MessageStore;
