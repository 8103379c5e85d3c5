//! # jumbotron-core
//!
//! Client library for remote LED-matrix (Jumbotron) devices.
//!
//! This crate contains:
//! - **Pixel types**: `Pixel`, `Rgb` and hex color conversion
//! - **Buffer**: `PixelBuffer` — the dense local mirror of the grid
//! - **Protocol**: wire shapes for the HTTP and push surfaces
//! - **Api**: `DeviceApi` — the device's REST client
//! - **Push**: `PushChannel` / `WsChannel` — the snapshot feed
//! - **Sync**: `SyncEngine` and `ConnectionMonitor` — mirroring, dedup,
//!   latency/rate metrics, manual retry
//! - **Edit**: `EditDispatcher` — drag-to-paint mutation dispatch
//! - **Session**: handshake, supervision and teardown for one device
//! - **Registry**: persisted list of known endpoints
//! - **Error**: `JumboError` — typed, `thiserror`-based error hierarchy

pub mod api;
pub mod buffer;
pub mod edit;
pub mod error;
pub mod pixel;
pub mod protocol;
pub mod push;
pub mod registry;
pub mod session;
pub mod state;
pub mod sync;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use api::{DeviceApi, Endpoint};
pub use buffer::PixelBuffer;
pub use edit::{ApiSink, EditDispatcher, EditMode, Mutation, MutationSink};
pub use error::JumboError;
pub use pixel::{Pixel, Rgb, hex_to_rgb, rgb_to_hex};
pub use protocol::{Ack, BrightnessInfo, DeviceInfo, PushFrame, SavedMatrix};
pub use push::{CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY, PushChannel, PushEvent, WsChannel};
pub use registry::ConnectionRegistry;
pub use session::Session;
pub use state::{ConnectionState, SessionPhase};
pub use sync::{ConnectionMonitor, GridState, SyncEngine, SyncMetrics};
