//! Async shutdown helpers.
//!
//! The dispatcher itself is thread based, but it is often owned by a tokio
//! application. These helpers poll the queue with `tokio::time::sleep` and
//! move the blocking thread join onto the blocking pool so the runtime's
//! worker threads are never parked.

use super::{ExitStatus, QueuedDispatcher};
use crate::error::{DispatchError, DispatchResult};
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

impl<M: Send + 'static> QueuedDispatcher<M> {
    /// Async counterpart of [`join_after_drain`](Self::join_after_drain).
    pub async fn join_after_drain_async(
        self: &Arc<Self>,
        poll_interval: Duration,
    ) -> DispatchResult<Option<ExitStatus>> {
        if !self.has_worker() {
            return Ok(None);
        }

        while self.pending() > 0 && self.is_running() {
            sleep(poll_interval).await;
        }

        self.request_stop();
        self.join_blocking().await
    }

    /// Async counterpart of [`force_stop_now`](Self::force_stop_now).
    pub async fn force_stop_async(self: &Arc<Self>) -> DispatchResult<Option<ExitStatus>> {
        if !self.has_worker() {
            return Ok(None);
        }

        self.request_stop();
        self.join_blocking().await
    }

    /// Wait for `signal`, then drain the queue and join the worker.
    ///
    /// If the signal future fails the dispatcher is left running and the
    /// error is returned as [`DispatchError::Signal`].
    pub async fn drain_on<F>(self: &Arc<Self>, signal: F) -> DispatchResult<Option<ExitStatus>>
    where
        F: Future<Output = io::Result<()>>,
    {
        signal.await.map_err(DispatchError::Signal)?;
        tracing::info!(
            dispatcher = %self.shared.name,
            id = %self.shared.id,
            pending = self.pending(),
            "Shutdown signal received, draining dispatcher..."
        );
        self.join_after_drain_async(self.config.drain_poll_interval())
            .await
    }

    /// Wait for Ctrl+C, then drain the queue and join the worker.
    pub async fn drain_on_ctrl_c(self: &Arc<Self>) -> DispatchResult<Option<ExitStatus>> {
        self.drain_on(tokio::signal::ctrl_c()).await
    }

    async fn join_blocking(self: &Arc<Self>) -> DispatchResult<Option<ExitStatus>> {
        let this = Arc::clone(self);
        tokio::task::spawn_blocking(move || this.join())
            .await
            .map_err(|e| DispatchError::HandlerPanicked {
                message: format!("join task failed: {e}"),
            })
    }
}
