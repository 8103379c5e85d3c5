//! Channel-health aggregation and manual retry control.

use tokio::sync::{mpsc, watch};

use crate::sync::engine::SyncMetrics;

/// Condenses channel lifecycle events (opened, closed, error,
/// reconnect-exhausted) into one reachable signal, and exposes the
/// metrics the engine computes.
///
/// The monitor never reconnects on its own: once the underlying
/// channel's attempt ceiling is exhausted it reports unreachable and
/// waits for [`retry`](Self::retry).
#[derive(Debug, Clone)]
pub struct ConnectionMonitor {
    reachable_rx: watch::Receiver<bool>,
    metrics_rx: watch::Receiver<SyncMetrics>,
    retry_tx: mpsc::UnboundedSender<()>,
}

impl ConnectionMonitor {
    pub fn new(
        reachable_rx: watch::Receiver<bool>,
        metrics_rx: watch::Receiver<SyncMetrics>,
        retry_tx: mpsc::UnboundedSender<()>,
    ) -> Self {
        Self {
            reachable_rx,
            metrics_rx,
            retry_tx,
        }
    }

    /// Whether the push channel is currently up.
    pub fn is_reachable(&self) -> bool {
        *self.reachable_rx.borrow()
    }

    /// A receiver that changes whenever reachability flips.
    pub fn reachable_changes(&self) -> watch::Receiver<bool> {
        self.reachable_rx.clone()
    }

    /// Snapshot of the latency/rate metrics.
    pub fn metrics(&self) -> SyncMetrics {
        self.metrics_rx.borrow().clone()
    }

    /// Metrics receiver for awaiting changes.
    pub fn metrics_changes(&self) -> watch::Receiver<SyncMetrics> {
        self.metrics_rx.clone()
    }

    /// Request one re-run of the connect sequence.
    ///
    /// Each call queues exactly one reconnect. Returns `false` if the
    /// session supervisor is gone (session torn down).
    pub fn retry(&self) -> bool {
        self.retry_tx.send(()).is_ok()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn harness() -> (
        watch::Sender<bool>,
        watch::Sender<SyncMetrics>,
        mpsc::UnboundedReceiver<()>,
        ConnectionMonitor,
    ) {
        let (reach_tx, reach_rx) = watch::channel(true);
        let (metrics_tx, metrics_rx) = watch::channel(SyncMetrics::default());
        let (retry_tx, retry_rx) = mpsc::unbounded_channel();
        let monitor = ConnectionMonitor::new(reach_rx, metrics_rx, retry_tx);
        (reach_tx, metrics_tx, retry_rx, monitor)
    }

    #[test]
    fn reachability_follows_channel_state() {
        let (reach_tx, _m, _r, monitor) = harness();
        assert!(monitor.is_reachable());

        reach_tx.send(false).unwrap();
        assert!(!monitor.is_reachable());
    }

    #[test]
    fn metrics_snapshot() {
        let (_c, metrics_tx, _r, monitor) = harness();
        metrics_tx
            .send(SyncMetrics {
                latency_ms: 21,
                updates_per_sec: 30,
                frames_total: 900,
            })
            .unwrap();

        let m = monitor.metrics();
        assert_eq!(m.latency_ms, 21);
        assert_eq!(m.updates_per_sec, 30);
    }

    #[tokio::test]
    async fn each_retry_queues_exactly_one_reconnect() {
        let (_c, _m, mut retry_rx, monitor) = harness();

        assert!(monitor.retry());
        assert!(monitor.retry());

        assert!(retry_rx.recv().await.is_some());
        assert!(retry_rx.recv().await.is_some());
        assert!(retry_rx.try_recv().is_err());
    }

    #[test]
    fn retry_fails_after_supervisor_gone() {
        let (_c, _m, retry_rx, monitor) = harness();
        drop(retry_rx);
        assert!(!monitor.retry());
    }
}
