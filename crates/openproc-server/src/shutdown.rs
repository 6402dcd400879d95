//! Graceful shutdown.
//!
//! [`ShutdownSignal`] tells the accept loop and every open connection to
//! stop; [`ConnectionTracker`] lets the server wait for connections that are
//! still draining.
//!
//! # Example
//!
//! ```rust,ignore
//! use openproc_server::ShutdownSignal;
//! use std::time::Duration;
//!
//! let shutdown = ShutdownSignal::with_os_signals();
//! tokio::select! {
//!     () = shutdown.recv() => println!("shutting down"),
//!     () = tokio::time::sleep(Duration::from_secs(60)) => println!("timeout"),
//! }
//! ```

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tokio_util::task::TaskTracker;

/// A cloneable, idempotent shutdown trigger.
///
/// # Example
///
/// ```rust
/// use openproc_server::ShutdownSignal;
///
/// let shutdown = ShutdownSignal::new();
/// let observer = shutdown.clone();
///
/// shutdown.trigger();
/// shutdown.trigger();
/// assert!(observer.is_shutdown());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    /// Creates an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers shutdown. Later calls do nothing.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Returns `true` once shutdown was triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns a future that completes when shutdown is triggered, or
    /// immediately if it already was.
    #[must_use]
    pub fn recv(&self) -> WaitForCancellationFutureOwned {
        self.token.clone().cancelled_owned()
    }

    /// A token cancelled with this signal, for work started under it.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Creates a signal triggered by SIGINT (Ctrl+C) or, on Unix, SIGTERM.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn with_os_signals() -> Self {
        let signal = Self::new();
        let trigger = signal.clone();

        tokio::spawn(async move {
            wait_for_os_signal().await;
            trigger.trigger();
        });

        signal
    }
}

async fn wait_for_os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                    () = wait_for_ctrl_c() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM, using Ctrl+C only");
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C"),
        Err(e) => {
            // Without a signal source the server runs until told otherwise.
            tracing::error!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

/// Tracks connection tasks so shutdown can wait for them.
///
/// # Example
///
/// ```rust
/// use openproc_server::ConnectionTracker;
///
/// # tokio_test::block_on(async {
/// let tracker = ConnectionTracker::new();
/// tracker.spawn(async {});
/// tracker.close();
/// tracker.wait().await;
/// assert_eq!(tracker.active_connections(), 0);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    tasks: TaskTracker,
}

impl ConnectionTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a tracked connection task.
    pub fn spawn<F>(&self, connection: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tasks.spawn(connection)
    }

    /// Returns the number of connections still running.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.tasks.len()
    }

    /// Stops accepting new work; [`wait`](Self::wait) completes once the
    /// tracked tasks finish.
    pub fn close(&self) {
        self.tasks.close();
    }

    /// Waits until the tracker is closed and every task has finished.
    pub async fn wait(&self) {
        self.tasks.wait().await;
    }
}
