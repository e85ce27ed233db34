//! In-memory message store.
//!
//! All state lives behind one `std::sync::Mutex`. The `updated` flag is an
//! atomic so producers and the worker can peek at it cheaply, but every write
//! to it happens while the queue lock is held, and the condition variable is
//! always paired with that same lock.

use super::WakeReason;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Thread-safe FIFO of pending messages.
#[derive(Debug)]
pub struct MessageStore<M> {
    /// Pending messages, oldest first
    queue: Mutex<VecDeque<M>>,
    /// Set on every push, cleared by the worker before it drains
    updated: AtomicBool,
    /// Wakes the worker on push or stop
    signal: Condvar,
}

impl<M> MessageStore<M> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            updated: AtomicBool::new(false),
            signal: Condvar::new(),
        }
    }

    // The lock is never held while user code runs, so a poisoned mutex still
    // guards a consistent queue.
    fn lock(&self) -> MutexGuard<'_, VecDeque<M>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a message and wake the worker.
    pub fn push(&self, message: M) {
        {
            let mut queue = self.lock();
            queue.push_back(message);
            self.updated.store(true, Ordering::Release);
        }
        self.signal.notify_all();
    }

    /// Pop the front message unless `stop` is set or the queue is empty.
    ///
    /// The emptiness check and the pop happen in one critical section.
    pub fn pop_front_unless(&self, stop: &AtomicBool) -> Option<M> {
        let mut queue = self.lock();
        if stop.load(Ordering::Acquire) {
            return None;
        }
        queue.pop_front()
    }

    /// Whether no messages are pending.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of pending messages.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether a push happened since the worker last started draining.
    pub fn is_updated(&self) -> bool {
        self.updated.load(Ordering::Acquire)
    }

    /// Discard every pending message and reset the updated flag.
    ///
    /// Returns the number of discarded messages.
    pub fn clear(&self) -> usize {
        let mut queue = self.lock();
        let discarded = queue.len();
        queue.clear();
        self.updated.store(false, Ordering::Release);
        discarded
    }

    /// End a worker run: discard what the run left behind and clear
    /// `active`, both under the queue lock.
    ///
    /// A push that loses the race for the lock was posted while the worker
    /// was still active and is discarded with the rest. A push that wins it
    /// afterwards sees an idle dispatcher and stays queued for the next run.
    pub fn close_run(&self, active: &AtomicBool) -> usize {
        let mut queue = self.lock();
        let discarded = queue.len();
        queue.clear();
        self.updated.store(false, Ordering::Release);
        active.store(false, Ordering::Release);
        discarded
    }

    /// Re-arm the updated flag if messages were posted while no worker ran.
    pub fn rearm(&self) {
        let queue = self.lock();
        self.updated.store(!queue.is_empty(), Ordering::Release);
    }

    /// Wake the worker without pushing anything.
    ///
    /// Takes the lock first so a worker that is between checking its wait
    /// condition and parking cannot miss the notification.
    pub fn notify(&self) {
        drop(self.lock());
        self.signal.notify_all();
    }

    /// Block until the store was updated or `stop` is set.
    ///
    /// Returns [`WakeReason::Shutdown`] only if stop was requested, nothing
    /// was pushed since the last drain and the queue is empty, all checked
    /// under the queue lock. Otherwise the updated flag is cleared and
    /// [`WakeReason::Updated`] is returned.
    pub fn wait_for_update(&self, stop: &AtomicBool) -> WakeReason {
        let guard = self.lock();
        let queue = self
            .signal
            .wait_while(guard, |_| {
                !self.updated.load(Ordering::Acquire) && !stop.load(Ordering::Acquire)
            })
            .unwrap_or_else(PoisonError::into_inner);

        if !self.updated.load(Ordering::Acquire) && stop.load(Ordering::Acquire) && queue.is_empty()
        {
            return WakeReason::Shutdown;
        }

        self.updated.store(false, Ordering::Release);
        WakeReason::Updated
    }
}

impl<M> Default for MessageStore<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_push_pop_fifo() {
        let store = MessageStore::new();
        let stop = AtomicBool::new(false);

        for i in 0..5 {
            store.push(i);
        }
        assert_eq!(store.len(), 5);
        assert!(store.is_updated());

        let popped: Vec<_> = std::iter::from_fn(|| store.pop_front_unless(&stop)).collect();
        assert_eq!(popped, vec![0, 1, 2, 3, 4]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_pop_refused_after_stop() {
        let store = MessageStore::new();
        let stop = AtomicBool::new(true);

        store.push("pending");
        assert_eq!(store.pop_front_unless(&stop), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clear_resets_updated() {
        let store = MessageStore::new();
        store.push(1u8);
        store.push(2u8);

        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
        assert!(!store.is_updated());
    }

    #[test]
    fn test_close_run_clears_queue_and_active() {
        let store = MessageStore::new();
        let active = AtomicBool::new(true);
        store.push('a');
        store.push('b');

        assert_eq!(store.close_run(&active), 2);
        assert!(!active.load(Ordering::Acquire));
        assert!(store.is_empty());
        assert!(!store.is_updated());

        // Later pushes are kept for the next run.
        store.push('c');
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_rearm() {
        let store = MessageStore::new();
        store.rearm();
        assert!(!store.is_updated());

        store.push(7u32);
        let stop = AtomicBool::new(false);
        assert_eq!(store.wait_for_update(&stop), WakeReason::Updated);
        assert!(!store.is_updated());

        store.rearm();
        assert!(store.is_updated());
    }

    #[test]
    fn test_wait_returns_shutdown_when_stopped_and_empty() {
        let store: MessageStore<u32> = MessageStore::new();
        let stop = AtomicBool::new(true);
        assert_eq!(store.wait_for_update(&stop), WakeReason::Shutdown);
    }

    #[test]
    fn test_wait_prefers_pending_work_over_shutdown() {
        let store = MessageStore::new();
        let stop = AtomicBool::new(true);
        store.push(1u32);
        assert_eq!(store.wait_for_update(&stop), WakeReason::Updated);
    }

    #[test]
    fn test_wait_wakes_on_push() {
        let store = Arc::new(MessageStore::new());
        let stop = Arc::new(AtomicBool::new(false));

        let waiter = {
            let store = Arc::clone(&store);
            let stop = Arc::clone(&stop);
            thread::spawn(move || store.wait_for_update(&stop))
        };

        thread::sleep(Duration::from_millis(20));
        store.push(42u64);

        assert_eq!(waiter.join().unwrap(), WakeReason::Updated);
    }

    #[test]
    fn test_wait_wakes_on_stop() {
        let store: Arc<MessageStore<u64>> = Arc::new(MessageStore::new());
        let stop = Arc::new(AtomicBool::new(false));

        let waiter = {
            let store = Arc::clone(&store);
            let stop = Arc::clone(&stop);
            thread::spawn(move || store.wait_for_update(&stop))
        };

        thread::sleep(Duration::from_millis(20));
        stop.store(true, Ordering::Release);
        store.notify();

        assert_eq!(waiter.join().unwrap(), WakeReason::Shutdown);
    }

    #[test]
    fn test_concurrent_producers() {
        let store = Arc::new(MessageStore::new());
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100 {
                        store.push(p * 1000 + i);
                    }
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }

        assert_eq!(store.len(), 400);

        // Per-producer order is preserved.
        let stop = AtomicBool::new(false);
        let mut last = [None::<i32>; 4];
        while let Some(value) = store.pop_front_unless(&stop) {
            let p = (value / 1000) as usize;
            if let Some(prev) = last[p] {
                assert!(value > prev);
            }
            last[p] = Some(value);
        }
    }
}
