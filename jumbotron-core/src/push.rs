//! Push channel: the persistent connection carrying full-frame
//! snapshots from the device.
//!
//! The device exposes its push feed one port above the HTTP port, as a
//! WebSocket at `/jumbotron`. Each text frame is one JSON
//! [`PushFrame`] (the `array_update` payload). Everything above the
//! socket goes through the [`PushChannel`] capability trait, so the
//! sync engine never touches the channel technology directly.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

use crate::api::Endpoint;
use crate::error::JumboError;
use crate::protocol::PushFrame;

// ── Constants ────────────────────────────────────────────────────

/// Connect attempt ceiling. Once exhausted the channel stays down
/// until a manual retry re-runs the whole connect sequence.
pub const CONNECT_ATTEMPTS: u32 = 5;

/// Pause between connect attempts.
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

// ── PushChannel ──────────────────────────────────────────────────

/// Lifecycle events delivered by a push channel.
#[derive(Debug, Clone)]
pub enum PushEvent {
    /// A full-frame snapshot arrived.
    Frame(PushFrame),
    /// The peer closed the channel (or the stream ended).
    Closed,
    /// The channel failed mid-stream.
    Error(String),
}

/// Capability interface over the device's push mechanism.
///
/// One implementation exists ([`WsChannel`]); tests substitute scripted
/// channels to drive the sync engine deterministically.
#[async_trait]
pub trait PushChannel: Send {
    /// Next event, in arrival order. After `Closed` or `Error` the
    /// channel is spent.
    async fn next(&mut self) -> PushEvent;

    /// Close the channel. Idempotent.
    async fn close(&mut self);
}

// ── WsChannel ────────────────────────────────────────────────────

/// WebSocket implementation of [`PushChannel`].
pub struct WsChannel {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsChannel {
    /// Connect to the endpoint's push feed, retrying up to
    /// [`CONNECT_ATTEMPTS`] times before giving up.
    pub async fn connect(endpoint: &Endpoint) -> Result<Self, JumboError> {
        let url = endpoint.push_url()?;

        for attempt in 1..=CONNECT_ATTEMPTS {
            match connect_async(url.as_str()).await {
                Ok((ws, _)) => {
                    debug!(%url, attempt, "push channel established");
                    return Ok(Self { ws });
                }
                Err(e) => {
                    debug!(%url, attempt, error = %e, "push connect attempt failed");
                    if attempt < CONNECT_ATTEMPTS {
                        tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                    }
                }
            }
        }

        Err(JumboError::ChannelExhausted {
            attempts: CONNECT_ATTEMPTS,
        })
    }
}

#[async_trait]
impl PushChannel for WsChannel {
    async fn next(&mut self) -> PushEvent {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str(&text) {
                    Ok(frame) => return PushEvent::Frame(frame),
                    Err(e) => {
                        // A malformed frame is not fatal; the next one
                        // will be a full snapshot anyway.
                        warn!(error = %e, "dropping unparseable push frame");
                    }
                },
                Some(Ok(Message::Ping(payload))) => {
                    let _ = self.ws.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(_))) | None => return PushEvent::Closed,
                Some(Ok(_)) => {} // binary/pong frames are not part of the feed
                Some(Err(e)) => return PushEvent::Error(e.to_string()),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}

// ── Tests ────────────────────────────────────────────────────────
