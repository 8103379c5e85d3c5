//! Session assembly: handshake, sync loop supervision, teardown.
//!
//! A [`Session`] wires the other pieces together for one device: it
//! probes the REST surface for the geometry, spins the sync engine on
//! a supervisor task, and hands out the observation handles the UI
//! reads. Channel loss never reconnects by itself; the supervisor
//! parks until [`ConnectionMonitor::retry`] queues a fresh connect
//! sequence.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::{DeviceApi, Endpoint};
use crate::edit::{ApiSink, EditDispatcher};
use crate::error::JumboError;
use crate::push::WsChannel;
use crate::state::{ConnectionState, SessionPhase};
use crate::sync::{ConnectionMonitor, GridState, SyncEngine, SyncMetrics};

/// One live connection to a device.
#[derive(Debug)]
pub struct Session {
    endpoint: Endpoint,
    api: Arc<DeviceApi>,
    phase: SessionPhase,
    rows: usize,
    columns: usize,

    frame_rx: watch::Receiver<GridState>,
    metrics_rx: watch::Receiver<SyncMetrics>,
    monitor: ConnectionMonitor,
    stop: Arc<AtomicBool>,
    supervisor: JoinHandle<()>,
}

impl Session {
    /// Probe the endpoint and start mirroring it.
    ///
    /// Fails fast if the handshake does not yield a live device with a
    /// usable geometry; the push channel is then established (with its
    /// own bounded attempts) on the supervisor task.
    pub async fn connect(endpoint: Endpoint) -> Result<Self, JumboError> {
        let mut phase = SessionPhase::default();
        phase.begin_connect()?;

        let api = Arc::new(DeviceApi::new(&endpoint)?);
        let info = match api.probe().await {
            Ok(info) => info,
            Err(e) => {
                phase.disconnect()?;
                return Err(e);
            }
        };
        info!(%endpoint, rows = info.rows, columns = info.columns, "handshake complete");

        let engine = SyncEngine::new(info.rows, info.columns);
        let frame_rx = engine.frame_receiver();
        let metrics_rx = engine.metrics_receiver();
        let connected_rx = engine.connected_receiver();
        let stop = engine.stop_handle();

        let (retry_tx, retry_rx) = mpsc::unbounded_channel();
        let monitor = ConnectionMonitor::new(connected_rx, metrics_rx.clone(), retry_tx);

        let supervisor = tokio::spawn(supervise(engine, endpoint.clone(), retry_rx));
        phase.complete_connect()?;

        Ok(Self {
            endpoint,
            api,
            phase,
            rows: info.rows,
            columns: info.columns,
            frame_rx,
            metrics_rx,
            monitor,
            stop,
            supervisor,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Session lifecycle phase: connect/disconnect only. A dropped
    /// push channel does not leave `Connected`; link health lives in
    /// the [`monitor`](Self::monitor).
    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// REST client for direct device calls (brightness, uploads,
    /// saved matrices).
    pub fn api(&self) -> Arc<DeviceApi> {
        Arc::clone(&self.api)
    }

    /// Latest-grid receiver for renderers.
    pub fn frames(&self) -> watch::Receiver<GridState> {
        self.frame_rx.clone()
    }

    /// Health and retry handle.
    pub fn monitor(&self) -> ConnectionMonitor {
        self.monitor.clone()
    }

    /// A dispatcher wired to this session's device.
    pub fn dispatcher(&self) -> EditDispatcher {
        EditDispatcher::new(Arc::new(ApiSink::new(self.api())))
    }

    /// Assembled per-session record, as UIs display it. Reads as the
    /// pristine default once the session is disconnected.
    pub fn state(&self) -> ConnectionState {
        if !self.phase.is_connected() {
            return ConnectionState::default();
        }
        let metrics = self.metrics_rx.borrow().clone();
        ConnectionState {
            host: self.endpoint.host.clone(),
            port: self.endpoint.port,
            rows: self.rows,
            columns: self.columns,
            initialized: true,
            latency_ms: metrics.latency_ms,
            updates_per_sec: metrics.updates_per_sec,
        }
    }

    /// Tear the session down: stop the loop, drop the channel, reset
    /// the phase. Safe to call regardless of channel health.
    pub fn disconnect(&mut self) {
        self.stop.store(false, std::sync::atomic::Ordering::SeqCst);
        self.supervisor.abort();
        self.phase.force_disconnect();
        info!(endpoint = %self.endpoint, "session closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.supervisor.abort();
    }
}

/// Owns the engine for the session's lifetime. Runs one channel to
/// completion, then parks until a manual retry (or teardown, which
/// closes the retry queue).
async fn supervise(
    mut engine: SyncEngine,
    endpoint: Endpoint,
    mut retry_rx: mpsc::UnboundedReceiver<()>,
) {
    loop {
        match WsChannel::connect(&endpoint).await {
            Ok(channel) => {
                if let Err(e) = engine.run(channel).await {
                    warn!(%endpoint, error = %e, "sync loop ended with error");
                }
            }
            Err(e) => {
                warn!(%endpoint, error = %e, "push channel unavailable");
                engine.mark_disconnected();
            }
        }

        // Unreachable until someone asks for another attempt.
        match retry_rx.recv().await {
            Some(()) => info!(%endpoint, "manual retry requested"),
            None => break,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal HTTP responder: answers one request with the given JSON
    /// body, then exits.
    async fn one_shot_http_server(body: &'static str) -> Endpoint {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
        });

        Endpoint::new("127.0.0.1", port)
    }

    #[tokio::test]
    async fn connect_rejects_dead_device() {
        let endpoint = one_shot_http_server(r#"{"isAlive":false}"#).await;
        let err = Session::connect(endpoint).await.unwrap_err();
        assert!(matches!(err, JumboError::IncompleteHandshake(_)));
    }

    #[tokio::test]
    async fn connect_rejects_missing_geometry() {
        let endpoint = one_shot_http_server(r#"{"isAlive":true}"#).await;
        let err = Session::connect(endpoint).await.unwrap_err();
        assert!(matches!(err, JumboError::IncompleteHandshake(_)));
    }

    #[tokio::test]
    async fn connect_refused_surfaces_http_error() {
        // Bind then drop: the port is (very likely) unoccupied.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = Session::connect(Endpoint::new("127.0.0.1", port))
            .await
            .unwrap_err();
        assert!(matches!(err, JumboError::Http(_)));
    }

    #[tokio::test]
    async fn successful_handshake_reports_geometry() {
        let endpoint =
            one_shot_http_server(r#"{"isAlive":true,"rows":8,"columns":64}"#).await;

        let mut session = Session::connect(endpoint).await.unwrap();
        assert!(session.phase().is_connected());

        let state = session.state();
        assert_eq!(state.rows, 8);
        assert_eq!(state.columns, 64);
        assert!(state.initialized);

        session.disconnect();
        assert!(session.phase().is_disconnected());
    }

    #[tokio::test]
    async fn state_resets_to_defaults_on_disconnect() {
        let endpoint =
            one_shot_http_server(r#"{"isAlive":true,"rows":8,"columns":64}"#).await;

        let mut session = Session::connect(endpoint).await.unwrap();
        assert!(session.state().initialized);

        session.disconnect();
        let state = session.state();
        assert_eq!(state, ConnectionState::default());
        assert!(!state.initialized);
        assert_eq!(state.rows, 0);
    }
}
