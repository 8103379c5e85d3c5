//! Live mirror of the remote matrix.
//!
//! [`engine::SyncEngine`] bridges the asynchronous push channel to
//! watch-observable local state; [`monitor::ConnectionMonitor`]
//! condenses channel health into a single reachable signal with a
//! manual retry trigger.

pub mod engine;
pub mod monitor;

pub use engine::{GridState, SyncEngine, SyncMetrics};
pub use monitor::ConnectionMonitor;
