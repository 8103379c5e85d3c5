//! Push-frame consumer.
//!
//! Receives full-frame snapshots from a [`PushChannel`], reconciles
//! them into the [`PixelBuffer`], and republishes de-duplicated,
//! timestamped state via `tokio::sync::watch` so renderers can read
//! the latest grid without blocking the receive loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::buffer::{PixelBuffer, grid_hash};
use crate::error::JumboError;
use crate::pixel::Pixel;
use crate::protocol::{PushFrame, latency_ms, unix_millis_now};
use crate::push::{PushChannel, PushEvent};

// ── Published state ──────────────────────────────────────────────

/// The latest accepted grid, as handed to renderers.
#[derive(Debug, Clone, Default)]
pub struct GridState {
    pub cells: Vec<Vec<Pixel>>,
    /// Latency of the frame that produced this state, milliseconds.
    pub latency_ms: u64,
}

/// Responsiveness metrics exposed to the UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncMetrics {
    /// Latency of the most recent accepted frame, milliseconds.
    pub latency_ms: u64,
    /// Accepted (non-deduplicated) frames in the last full second.
    pub updates_per_sec: u32,
    /// Total accepted frames since the engine started.
    pub frames_total: u64,
}

// ── SyncEngine ───────────────────────────────────────────────────

/// Bridges the push channel to observable local state.
///
/// The engine survives channel loss: [`run`](Self::run) consumes one
/// channel until it closes or errors, and the caller may run it again
/// with a fresh channel after a manual retry. The last-known grid is
/// deliberately left published across the gap ("last known good").
pub struct SyncEngine {
    buffer: PixelBuffer,
    running: Arc<AtomicBool>,

    frame_tx: watch::Sender<GridState>,
    frame_rx: watch::Receiver<GridState>,
    metrics_tx: watch::Sender<SyncMetrics>,
    metrics_rx: watch::Receiver<SyncMetrics>,
    connected_tx: watch::Sender<bool>,
    connected_rx: watch::Receiver<bool>,

    /// (content hash, latency) of the previously published frame.
    /// A frame is skipped only when *both* match.
    last_published: Option<(blake3::Hash, u64)>,
    /// Accepted frames since the last 1-second tick.
    tick_count: u32,
    frames_total: u64,
}

impl SyncEngine {
    /// Create an engine for a grid of the handshake-reported geometry.
    pub fn new(rows: usize, columns: usize) -> Self {
        let mut buffer = PixelBuffer::new();
        buffer.resize(rows, columns);

        let (frame_tx, frame_rx) = watch::channel(GridState::default());
        let (metrics_tx, metrics_rx) = watch::channel(SyncMetrics::default());
        let (connected_tx, connected_rx) = watch::channel(false);

        Self {
            buffer,
            running: Arc::new(AtomicBool::new(false)),
            frame_tx,
            frame_rx,
            metrics_tx,
            metrics_rx,
            connected_tx,
            connected_rx,
            last_published: None,
            tick_count: 0,
            frames_total: 0,
        }
    }

    /// Latest-grid receiver; clone freely for renderers.
    pub fn frame_receiver(&self) -> watch::Receiver<GridState> {
        self.frame_rx.clone()
    }

    /// Metrics receiver.
    pub fn metrics_receiver(&self) -> watch::Receiver<SyncMetrics> {
        self.metrics_rx.clone()
    }

    /// Connected-flag receiver.
    pub fn connected_receiver(&self) -> watch::Receiver<bool> {
        self.connected_rx.clone()
    }

    /// A cloneable stop handle.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Signal the receive loop to stop after the current event.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Publish the disconnected status without touching the grid.
    pub fn mark_disconnected(&self) {
        let _ = self.connected_tx.send(false);
    }

    pub fn rows(&self) -> usize {
        self.buffer.rows()
    }

    pub fn columns(&self) -> usize {
        self.buffer.columns()
    }

    /// Run the receive loop over one channel.
    ///
    /// Returns when the channel closes or errors, or after
    /// [`stop`](Self::stop). Either way the connected flag reads
    /// `false` on return; re-establishing the channel is the caller's
    /// job (manual retry only, never automatic).
    pub async fn run<C: PushChannel>(&mut self, mut channel: C) -> Result<(), JumboError> {
        self.running.store(true, Ordering::SeqCst);
        let _ = self.connected_tx.send(true);

        let mut tick = tokio::time::interval(Duration::from_millis(1000));
        // The first tick fires immediately; swallow it so the first
        // rate window is a full second.
        tick.tick().await;

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                event = channel.next() => match event {
                    PushEvent::Frame(frame) => {
                        if let Err(e) = self.process_frame(frame, unix_millis_now()) {
                            warn!(error = %e, "skipping snapshot");
                        }
                    }
                    PushEvent::Closed => {
                        debug!("push channel closed by peer");
                        break;
                    }
                    PushEvent::Error(e) => {
                        warn!(error = %e, "push channel failed");
                        break;
                    }
                },
                _ = tick.tick() => self.publish_rate(),
            }
        }

        channel.close().await;
        self.running.store(false, Ordering::SeqCst);
        let _ = self.connected_tx.send(false);
        Ok(())
    }

    /// Reconcile one snapshot into the buffer.
    ///
    /// Returns `Ok(true)` when the frame was published, `Ok(false)`
    /// when it deduplicated against the previous publication.
    pub fn process_frame(
        &mut self,
        frame: PushFrame,
        received_ms: u64,
    ) -> Result<bool, JumboError> {
        let latency = latency_ms(frame.timestamp, received_ms);
        let hash = grid_hash(&frame.data);

        // Skip only when contents AND latency both repeat.
        if self.last_published == Some((hash, latency)) {
            return Ok(false);
        }

        self.buffer.replace(&frame.data)?;
        self.last_published = Some((hash, latency));
        self.tick_count += 1;
        self.frames_total += 1;

        let _ = self.frame_tx.send(GridState {
            cells: frame.data,
            latency_ms: latency,
        });
        self.metrics_tx.send_modify(|m| {
            m.latency_ms = latency;
            m.frames_total = self.frames_total;
        });
        Ok(true)
    }

    /// 1-second boundary: publish the window's count and reset it.
    fn publish_rate(&mut self) {
        let count = self.tick_count;
        self.tick_count = 0;
        self.metrics_tx.send_modify(|m| m.updates_per_sec = count);
    }
}

// ── Tests ────────────────────────────────────────────────────────
