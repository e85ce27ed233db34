//! Message handlers and the slot that holds the currently bound one.
//!
//! Any `Fn(M) -> Outcome` closure that is `Send + Sync` is a handler. Types
//! that need more structure can implement [`MessageHandler`] directly.
//!
//! # Examples
//!
//! ```rust
//! use relayq::prelude::*;
//!
//! struct Printer;
//!
//! impl MessageHandler<String> for Printer {
//!     fn handle(&self, message: String) -> Outcome {
//!         println!("{message}");
//!         Outcome::Good
//!     }
//!
//!     fn name(&self) -> &str {
//!         "printer"
//!     }
//! }
//!
//! let dispatcher: QueuedDispatcher<String> = QueuedDispatcher::with_handler(Printer);
//! assert!(dispatcher.has_handler());
//! ```

use crate::message::Outcome;
use std::sync::{Arc, PoisonError, RwLock};

/// Processes one message on the dispatcher thread.
pub trait MessageHandler<M>: Send + Sync {
    /// Handle a single message.
    ///
    /// Returning anything other than [`Outcome::Good`] stops the dispatcher;
    /// messages still queued are discarded as the run ends.
    fn handle(&self, message: M) -> Outcome;

    /// Name used in log fields.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<M, F> MessageHandler<M> for F
where
    F: Fn(M) -> Outcome + Send + Sync,
{
    fn handle(&self, message: M) -> Outcome {
        self(message)
    }

    fn name(&self) -> &str {
        "closure"
    }
}

/// Shared, rebindable handler reference.
pub type SharedHandler<M> = Arc<dyn MessageHandler<M>>;

/// Holds the handler currently bound to a dispatcher.
///
/// The worker takes a fresh reference for every message, so a rebind takes
/// effect from the next message on.
pub struct HandlerSlot<M> {
    current: RwLock<Option<SharedHandler<M>>>,
}

impl<M> HandlerSlot<M> {
    /// Create an empty slot.
    pub fn empty() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// Create a slot holding `handler`.
    pub fn with(handler: SharedHandler<M>) -> Self {
        Self {
            current: RwLock::new(Some(handler)),
        }
    }

    /// Bind a handler, returning the previous one.
    pub fn bind(&self, handler: SharedHandler<M>) -> Option<SharedHandler<M>> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        current.replace(handler)
    }

    /// Current handler, if any.
    pub fn get(&self) -> Option<SharedHandler<M>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a handler is bound.
    pub fn is_bound(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<M> Default for HandlerSlot<M> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<M> std::fmt::Debug for HandlerSlot<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.get().map(|h| h.name().to_string());
        f.debug_struct("HandlerSlot").field("handler", &name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counting {
        seen: AtomicU32,
    }

    impl MessageHandler<u32> for Counting {
        fn handle(&self, message: u32) -> Outcome {
            self.seen.fetch_add(message, Ordering::SeqCst);
            Outcome::Good
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn test_closure_is_handler() {
        let handler = |m: u32| Outcome::from(m % 2 == 0);
        assert_eq!(handler.handle(2), Outcome::Good);
        assert_eq!(handler.handle(3), Outcome::Error);
        assert_eq!(MessageHandler::<u32>::name(&handler), "closure");
    }

    #[test]
    fn test_slot_bind_and_rebind() {
        let slot: HandlerSlot<u32> = HandlerSlot::empty();
        assert!(!slot.is_bound());
        assert!(slot.get().is_none());

        let first: SharedHandler<u32> = Arc::new(|_: u32| Outcome::Good);
        assert!(slot.bind(first).is_none());
        assert!(slot.is_bound());

        let second: SharedHandler<u32> = Arc::new(Counting {
            seen: AtomicU32::new(0),
        });
        let previous = slot.bind(second).expect("first handler");
        assert_eq!(previous.name(), "closure");

        let current = slot.get().expect("bound");
        assert_eq!(current.name(), "counting");
        assert_eq!(current.handle(5), Outcome::Good);
    }

    #[test]
    fn test_slot_debug_shows_name() {
        let slot = HandlerSlot::with(Arc::new(Counting {
            seen: AtomicU32::new(0),
        }) as SharedHandler<u32>);
        assert!(format!("{slot:?}").contains("counting"));
    }
}
