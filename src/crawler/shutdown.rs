//! Graceful shutdown
//!
//! The first Ctrl-C (or SIGTERM) asks the crawler to stop after a final
//! checkpoint. A second one exits immediately.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, warn};

/// Exit code for a forced quit (128 + SIGINT)
pub const FORCED_EXIT_CODE: i32 = 130;

/// Cloneable shutdown flag backed by a `watch` channel
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Requests shutdown; idempotent
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been requested
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

/// Spawns a task translating OS signals into `signal`
///
/// Must be called from within a tokio runtime.
pub fn install_signal_handlers(signal: ShutdownSignal) {
    tokio::spawn(async move {
        wait_for_termination().await;
        warn!("Received termination signal, stopping after the current page");
        warn!("Press Ctrl-C again to force quit");
        signal.trigger();

        wait_for_termination().await;
        error!("Force quit requested, exiting immediately");
        std::process::exit(FORCED_EXIT_CODE);
    });
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
}
