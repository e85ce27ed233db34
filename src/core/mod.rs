//! The queued dispatcher.
//!
//! A [`QueuedDispatcher`] owns one unbounded FIFO and, while running, one
//! dedicated OS thread that feeds every posted message to the bound handler
//! in order. Messages can be posted from any number of threads.

use crate::config::DispatcherConfig;
use crate::error::{DispatchError, DispatchResult, panic_message};
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use uuid::Uuid;

pub mod handler;
pub mod shutdown;
pub mod worker;

pub use handler::{HandlerSlot, MessageHandler, SharedHandler};
pub use worker::{DispatcherStats, ExitStatus};

use worker::Shared;

/// Observable lifecycle state of a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// No worker thread
    Idle,
    /// Worker thread is processing or waiting for messages
    Running,
    /// Stop was requested, the worker has not exited yet
    StopRequested,
    /// The worker exited and is waiting to be joined
    Finished,
}

/// Control-side bookkeeping, only touched by control calls.
///
/// The lock is never held across a thread join, so the handler may query the
/// dispatcher while another thread waits for it to finish.
struct Control {
    worker: Option<JoinHandle<ExitStatus>>,
    /// A join took `worker` and is waiting on the thread
    joining: bool,
    last_exit: Option<ExitStatus>,
}

/// Processes messages sequentially on a dedicated thread.
///
/// # Examples
///
/// ```rust
/// use relayq::prelude::*;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
///
/// let total = Arc::new(AtomicU32::new(0));
/// let sink = Arc::clone(&total);
///
/// let dispatcher: QueuedDispatcher<u32> = QueuedDispatcher::with_handler(move |n: u32| {
///     sink.fetch_add(n, Ordering::SeqCst);
///     Outcome::Good
/// });
///
/// dispatcher.start()?;
/// for n in 0..5 {
///     dispatcher.post_message(n);
/// }
///
/// let status = dispatcher.join_after_drain(Duration::from_millis(1));
/// assert_eq!(status, Some(ExitStatus::Stopped));
/// assert_eq!(total.load(Ordering::SeqCst), 10);
/// # Ok::<(), relayq::DispatchError>(())
/// ```
pub struct QueuedDispatcher<M: Send + 'static> {
    shared: Arc<Shared<M>>,
    control: Mutex<Control>,
    config: DispatcherConfig,
}

impl<M: Send + 'static> QueuedDispatcher<M> {
    /// Create an idle dispatcher with no handler bound.
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create an idle dispatcher with the given configuration.
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self::build(config, HandlerSlot::empty())
    }

    /// Create an idle dispatcher with a handler already bound.
    pub fn with_handler<H>(handler: H) -> Self
    where
        H: MessageHandler<M> + 'static,
    {
        Self::build(DispatcherConfig::default(), HandlerSlot::with(Arc::new(handler)))
    }

    fn build(config: DispatcherConfig, handler: HandlerSlot<M>) -> Self {
        let shared = Arc::new(Shared::new(config.name.clone(), handler));
        tracing::debug!(dispatcher = %shared.name, id = %shared.id, "Dispatcher created");

        Self {
            shared,
            control: Mutex::new(Control {
                worker: None,
                joining: false,
                last_exit: None,
            }),
            config,
        }
    }

    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind the handler. Replaces any previous handler; a running dispatcher
    /// uses the new one from the next message on.
    pub fn register_handler<H>(&self, handler: H)
    where
        H: MessageHandler<M> + 'static,
    {
        self.register_shared_handler(Arc::new(handler));
    }

    /// Bind an already shared handler.
    pub fn register_shared_handler(&self, handler: SharedHandler<M>) {
        let name = handler.name().to_string();
        let replaced = self.shared.handler.bind(handler).is_some();
        tracing::debug!(
            dispatcher = %self.shared.name,
            id = %self.shared.id,
            handler = %name,
            replaced,
            "Handler registered"
        );
    }

    /// Whether a handler is bound.
    pub fn has_handler(&self) -> bool {
        self.shared.handler.is_bound()
    }

    /// Spawn the dispatcher thread.
    ///
    /// Fails with [`DispatchError::AlreadyRunning`] if a worker is active or
    /// still being joined, and with [`DispatchError::NoHandler`] if no
    /// handler is bound. A worker that already exited but was never joined is
    /// joined first; messages posted since it exited are kept.
    pub fn start(&self) -> DispatchResult<()> {
        let mut control = self.control();

        if control.joining || self.shared.active.load(Ordering::Acquire) {
            tracing::warn!(
                dispatcher = %self.shared.name,
                id = %self.shared.id,
                "Start requested while already running"
            );
            return Err(DispatchError::AlreadyRunning);
        }

        // The previous run already left its loop, so this join is short.
        if let Some(worker) = control.worker.take() {
            control.last_exit = Some(self.reap(worker));
        }

        if !self.shared.handler.is_bound() {
            return Err(DispatchError::NoHandler);
        }

        self.shared.stop_requested.store(false, Ordering::Release);
        self.shared.store.rearm();
        self.shared.active.store(true, Ordering::Release);

        let mut builder = thread::Builder::new().name(self.config.name.clone());
        if let Some(size) = self.config.thread_stack_size {
            builder = builder.stack_size(size);
        }

        let shared = Arc::clone(&self.shared);
        let handle = match builder.spawn(move || worker::run(&shared)) {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.active.store(false, Ordering::Release);
                tracing::error!(
                    dispatcher = %self.shared.name,
                    id = %self.shared.id,
                    "Failed to spawn dispatcher thread: {}",
                    e
                );
                return Err(DispatchError::ThreadSpawn(e));
            }
        };

        control.worker = Some(handle);
        self.shared.stats.runs.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            dispatcher = %self.shared.name,
            id = %self.shared.id,
            pending = self.shared.store.len(),
            "📨 Dispatcher started"
        );
        Ok(())
    }

    /// Queue a message. Never blocks beyond lock contention; if the
    /// dispatcher is not running the message waits for the next start.
    pub fn post_message(&self, message: M) {
        self.shared.store.push(message);
        self.shared.stats.posted.fetch_add(1, Ordering::Relaxed);
    }

    /// Whether the dispatcher thread is active.
    ///
    /// A worker that has already exited reports `false` even before it is
    /// joined.
    pub fn is_running(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DispatcherState {
        if !self.has_worker() {
            return DispatcherState::Idle;
        }
        if !self.is_running() {
            return DispatcherState::Finished;
        }
        if self.shared.stop_requested.load(Ordering::Acquire) {
            DispatcherState::StopRequested
        } else {
            DispatcherState::Running
        }
    }

    /// Ask the worker to stop. Does not block.
    pub fn request_stop(&self) {
        self.shared.request_stop();
        tracing::debug!(dispatcher = %self.shared.name, id = %self.shared.id, "Stop requested");
    }

    /// Whether something was posted since the worker last started draining.
    pub fn is_queue_updated(&self) -> bool {
        self.shared.store.is_updated()
    }

    /// Number of messages waiting to be processed.
    pub fn pending(&self) -> usize {
        self.shared.store.len()
    }

    /// Drop every pending message without processing it.
    ///
    /// Returns the number of discarded messages.
    pub fn discard_pending(&self) -> usize {
        let discarded = self.shared.store.clear();
        self.shared
            .stats
            .discarded
            .fetch_add(discarded as u64, Ordering::Relaxed);
        discarded
    }

    /// Block until the queue is empty, sleeping `poll_interval` between
    /// checks. Returns early if the worker exits, so a failed run never
    /// leaves the caller waiting on messages nobody will process.
    pub fn wait_for_empty(&self, poll_interval: Duration) {
        while !self.shared.store.is_empty() && self.is_running() {
            thread::sleep(poll_interval);
        }
    }

    /// Graceful stop: wait for the queue to drain, request a stop and join
    /// the worker. Anything posted after the drain but before the worker
    /// exits is discarded with the run.
    ///
    /// Returns the run's exit status, or `None` if there was no worker.
    pub fn join_after_drain(&self, poll_interval: Duration) -> Option<ExitStatus> {
        if !self.has_worker() {
            return None;
        }

        tracing::info!(
            dispatcher = %self.shared.name,
            id = %self.shared.id,
            pending = self.pending(),
            "📨 Draining dispatcher"
        );

        self.wait_for_empty(poll_interval);
        self.request_stop();
        self.join()
    }

    /// Graceful stop using the configured poll interval.
    pub fn drain_and_join(&self) -> Option<ExitStatus> {
        self.join_after_drain(self.config.drain_poll_interval())
    }

    /// Forced stop: request a stop and join without draining. Queued
    /// messages are discarded; a handler call already in progress finishes.
    ///
    /// Returns the run's exit status, or `None` if there was no worker.
    pub fn force_stop_now(&self) -> Option<ExitStatus> {
        if !self.has_worker() {
            return None;
        }

        self.request_stop();
        self.join()
    }

    /// Wait for the worker to exit and return to idle.
    ///
    /// Only returns once the worker leaves its loop, so call it after
    /// [`request_stop`](Self::request_stop) or once the run has failed.
    /// Returns `None` if there is no worker, if another thread is already
    /// joining it, or if called from the dispatcher thread itself.
    pub fn join(&self) -> Option<ExitStatus> {
        let worker = {
            let mut control = self.control();
            let worker = control.worker.take()?;
            if worker.thread().id() == thread::current().id() {
                control.worker = Some(worker);
                tracing::warn!(
                    dispatcher = %self.shared.name,
                    id = %self.shared.id,
                    "Join requested from the dispatcher thread itself, ignoring"
                );
                return None;
            }
            control.joining = true;
            worker
        };

        let status = self.reap(worker);

        let mut control = self.control();
        control.joining = false;
        control.last_exit = Some(status.clone());
        Some(status)
    }

    /// Exit status of the most recently joined run.
    pub fn last_exit(&self) -> Option<ExitStatus> {
        self.control().last_exit.clone()
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> DispatcherStats {
        self.shared.stats.snapshot()
    }

    /// Instance identifier used in log fields.
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// The configuration this dispatcher was built with.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    fn has_worker(&self) -> bool {
        let control = self.control();
        control.worker.is_some() || control.joining
    }

    /// Join a worker thread and log how its run ended.
    ///
    /// Never takes the control lock. The worker has already discarded
    /// whatever its run left queued.
    fn reap(&self, worker: JoinHandle<ExitStatus>) -> ExitStatus {
        let status = match worker.join() {
            Ok(status) => status,
            Err(payload) => ExitStatus::Panicked(panic_message(payload.as_ref())),
        };

        match &status {
            ExitStatus::Stopped => tracing::info!(
                dispatcher = %self.shared.name,
                id = %self.shared.id,
                pending = self.pending(),
                "📨 Dispatcher joined"
            ),
            failure => tracing::error!(
                dispatcher = %self.shared.name,
                id = %self.shared.id,
                status = ?failure,
                "📨 Dispatcher joined after failure"
            ),
        }

        status
    }
}

impl<M: Send + 'static> Default for QueuedDispatcher<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Send + 'static> fmt::Debug for QueuedDispatcher<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedDispatcher")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .field("running", &self.is_running())
            .field("pending", &self.pending())
            .field("handler", &self.shared.handler)
            .finish()
    }
}

impl<M: Send + 'static> Drop for QueuedDispatcher<M> {
    fn drop(&mut self) {
        if let Some(status) = self.force_stop_now() {
            tracing::debug!(
                dispatcher = %self.shared.name,
                id = %self.shared.id,
                status = ?status,
                "Dispatcher dropped while running, forced stop"
            );
        }
    }
}
