//! The dispatcher loop that runs on the dedicated worker thread.
//!
//! The worker sleeps on the message store until something is posted or a
//! stop is requested, then drains the queue one message at a time, checking
//! for a stop request between every message.

use crate::core::handler::HandlerSlot;
use crate::error::{DispatchError, DispatchResult};
use crate::message::Outcome;
use crate::queue::{MessageStore, WakeReason};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use uuid::Uuid;

/// How a dispatcher run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    /// The loop observed a stop request and exited cleanly
    Stopped,
    /// The handler returned a non-good outcome
    HandlerFailed(Outcome),
    /// The loop found no handler bound
    NoHandler,
    /// The handler panicked
    Panicked(String),
}

impl ExitStatus {
    /// Whether the run ended without a failure.
    pub fn is_success(&self) -> bool {
        matches!(self, ExitStatus::Stopped)
    }

    /// Convert into a `Result`, mapping failures to [`DispatchError`].
    pub fn into_result(self) -> DispatchResult<()> {
        match self {
            ExitStatus::Stopped => Ok(()),
            ExitStatus::HandlerFailed(outcome) => Err(DispatchError::HandlerFailed { outcome }),
            ExitStatus::NoHandler => Err(DispatchError::NoHandler),
            ExitStatus::Panicked(message) => Err(DispatchError::HandlerPanicked { message }),
        }
    }
}

/// Snapshot of dispatcher statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Messages posted over the dispatcher's lifetime
    pub posted: u64,
    /// Messages handed to the handler
    pub processed: u64,
    /// Handler invocations that returned a non-good outcome
    pub failed: u64,
    /// Messages dropped unprocessed, by a stop, a failed run or
    /// `discard_pending`
    pub discarded: u64,
    /// Number of times the dispatcher was started
    pub runs: u64,
}

/// Lock-free counters behind [`DispatcherStats`].
#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    pub posted: AtomicU64,
    pub processed: AtomicU64,
    pub failed: AtomicU64,
    pub discarded: AtomicU64,
    pub runs: AtomicU64,
}

impl StatCounters {
    pub fn snapshot(&self) -> DispatcherStats {
        DispatcherStats {
            posted: self.posted.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            runs: self.runs.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the control handle and the worker thread.
pub(crate) struct Shared<M> {
    pub id: Uuid,
    pub name: String,
    pub store: MessageStore<M>,
    pub handler: HandlerSlot<M>,
    pub stop_requested: AtomicBool,
    pub active: AtomicBool,
    pub stats: StatCounters,
}

impl<M> Shared<M> {
    pub fn new(name: String, handler: HandlerSlot<M>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            store: MessageStore::new(),
            handler,
            stop_requested: AtomicBool::new(false),
            active: AtomicBool::new(false),
            stats: StatCounters::default(),
        }
    }

    /// Set the stop flag and wake the worker.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.store.notify();
    }
}

/// Closes the run when the worker leaves `run`, panics included: whatever is
/// still queued belongs to this run and is discarded, then `active` clears.
struct RunGuard<'a, M>(&'a Shared<M>);

impl<M> Drop for RunGuard<'_, M> {
    fn drop(&mut self) {
        let shared = self.0;
        let discarded = shared.store.close_run(&shared.active);
        if discarded > 0 {
            shared
                .stats
                .discarded
                .fetch_add(discarded as u64, Ordering::Relaxed);
            tracing::debug!(
                dispatcher = %shared.name,
                id = %shared.id,
                discarded,
                "📨 Discarded messages left by the run"
            );
        }
    }
}

/// The worker loop. Runs once per `start` on the dispatcher thread.
pub(crate) fn run<M>(shared: &Shared<M>) -> ExitStatus {
    let _run = RunGuard(shared);
    let started = Instant::now();

    let Some(mut handler) = shared.handler.get() else {
        tracing::error!(
            dispatcher = %shared.name,
            id = %shared.id,
            "Dispatcher started without a handler"
        );
        return ExitStatus::NoHandler;
    };

    tracing::debug!(dispatcher = %shared.name, id = %shared.id, "📨 Dispatcher loop running");

    let mut handled = 0u64;

    while !shared.stop_requested.load(Ordering::Acquire) {
        if shared.store.wait_for_update(&shared.stop_requested) == WakeReason::Shutdown {
            break;
        }

        while let Some(message) = shared.store.pop_front_unless(&shared.stop_requested) {
            // Pick up a handler rebound since the previous message.
            handler = shared.handler.get().unwrap_or(handler);
            let outcome = handler.handle(message);
            shared.stats.processed.fetch_add(1, Ordering::Relaxed);
            handled += 1;

            if outcome.is_failure() {
                shared.stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    dispatcher = %shared.name,
                    id = %shared.id,
                    handler = handler.name(),
                    %outcome,
                    pending = shared.store.len(),
                    "📨 Handler failed, dispatcher stopping"
                );
                return ExitStatus::HandlerFailed(outcome);
            }
        }
    }

    tracing::debug!(
        dispatcher = %shared.name,
        id = %shared.id,
        handled,
        elapsed = ?started.elapsed(),
        "📨 Dispatcher loop stopped"
    );
    ExitStatus::Stopped
}
