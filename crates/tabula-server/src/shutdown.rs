//! Graceful shutdown signal.
//!
//! Coordinates shutdown across the accept loop, the scheduler and any
//! other long-lived task. Clones share the same signal; triggering once
//! wakes every waiter, and late subscribers see the flag immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// A cloneable shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    /// Creates a new signal.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    /// Triggers shutdown, waking all waiters.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::Release);
        let _ = self.sender.send(());
    }

    /// True once shutdown has been triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Waits for the shutdown signal.
    pub async fn recv(&self) {
        if self.is_shutdown() {
            return;
        }
        let mut receiver = self.sender.subscribe();
        // A send between the flag check and the subscribe is caught by
        // re-checking the flag; RecvError means every sender is gone,
        // which also ends the wait.
        if self.is_shutdown() {
            return;
        }
        let _ = receiver.recv().await;
    }

    /// Spawns a task that triggers this signal on ctrl-c.
    pub fn listen_for_ctrl_c(&self) {
        let signal = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("ctrl-c received, shutting down");
                signal.trigger();
            }
        });
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_trigger_sets_flag() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_shutdown());
        signal.trigger();
        assert!(signal.is_shutdown());
    }

    #[test]
    fn test_clones_share_state() {
        let signal = ShutdownSignal::new();
        let clone = signal.clone();
        signal.trigger();
        assert!(clone.is_shutdown());
    }

    #[tokio::test]
    async fn test_recv_returns_after_trigger() {
        let signal = ShutdownSignal::new();
        let waiter = signal.clone();

        let handle = tokio::spawn(async move { waiter.recv().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        signal.trigger();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("recv should complete")
            .unwrap();
    }

    #[tokio::test]
    async fn test_recv_after_trigger_is_immediate() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        tokio::time::timeout(Duration::from_millis(100), signal.recv())
            .await
            .expect("recv should be immediate");
    }
}
