//! Session state: lifecycle phase machine and the per-session record.
//!
//! The phase machine is deliberately small — there is no internal
//! retry phase. Retry is an external trigger that re-runs the connect
//! sequence from `Disconnected`.

use std::time::Instant;

use crate::error::JumboError;

// ── SessionPhase ─────────────────────────────────────────────────

/// The current phase of a device session.
///
/// ```text
///  Disconnected ──► Connecting ──► Connected
///       ▲               │              │
///       └───────────────┴──────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No active session. Initial / terminal state.
    #[default]
    Disconnected,

    /// Handshake probe in flight.
    Connecting,

    /// Handshake complete; push channel live, frames flowing.
    Connected {
        /// When the session entered the `Connected` state.
        since: Instant,
    },
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected { .. } => write!(f, "Connected"),
        }
    }
}

impl SessionPhase {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// How long the session has been connected, `None` otherwise.
    pub fn connected_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connecting`.
    ///
    /// Valid from: `Disconnected`.
    pub fn begin_connect(&mut self) -> Result<(), JumboError> {
        match self {
            Self::Disconnected => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(JumboError::SessionViolation(
                "cannot connect: not in Disconnected state",
            )),
        }
    }

    /// Transition to `Connected`.
    ///
    /// Valid from: `Connecting`.
    pub fn complete_connect(&mut self) -> Result<(), JumboError> {
        match self {
            Self::Connecting => {
                *self = Self::Connected {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(JumboError::SessionViolation(
                "cannot complete connect: not in Connecting state",
            )),
        }
    }

    /// Transition to `Disconnected`.
    ///
    /// Valid from: `Connecting` (handshake failed), `Connected`
    /// (channel lost or explicit disconnect).
    pub fn disconnect(&mut self) -> Result<(), JumboError> {
        match self {
            Self::Connecting | Self::Connected { .. } => {
                *self = Self::Disconnected;
                Ok(())
            }
            _ => Err(JumboError::SessionViolation(
                "cannot disconnect: already Disconnected",
            )),
        }
    }

    /// Force-reset to `Disconnected` regardless of current state.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── ConnectionState ──────────────────────────────────────────────

/// Everything a UI needs to describe the active session. One instance
/// per session; reset to defaults on disconnect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionState {
    pub host: String,
    pub port: u16,
    pub rows: usize,
    pub columns: usize,
    /// `true` once the handshake supplied a geometry.
    pub initialized: bool,
    /// Last-known latency in milliseconds.
    pub latency_ms: u64,
    /// Last-known update rate, frames per second.
    pub updates_per_sec: u32,
}

impl ConnectionState {
    /// Reset back to the pristine (disconnected) record.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut phase = SessionPhase::Disconnected;

        phase.begin_connect().unwrap();
        assert_eq!(phase, SessionPhase::Connecting);

        phase.complete_connect().unwrap();
        assert!(phase.is_connected());
        assert!(phase.connected_duration().is_some());

        phase.disconnect().unwrap();
        assert!(phase.is_disconnected());
    }

    #[test]
    fn retry_reruns_from_disconnected() {
        let mut phase = SessionPhase::Disconnected;
        phase.begin_connect().unwrap();
        phase.complete_connect().unwrap();
        phase.disconnect().unwrap();

        // A manual retry is just the connect sequence again.
        phase.begin_connect().unwrap();
        assert_eq!(phase, SessionPhase::Connecting);
    }

    #[test]
    fn invalid_transition_connect_when_connected() {
        let mut phase = SessionPhase::Connected {
            since: Instant::now(),
        };
        assert!(phase.begin_connect().is_err());
    }

    #[test]
    fn invalid_transition_complete_from_disconnected() {
        let mut phase = SessionPhase::Disconnected;
        assert!(phase.complete_connect().is_err());
    }

    #[test]
    fn disconnect_from_connecting_on_handshake_failure() {
        let mut phase = SessionPhase::Connecting;
        phase.disconnect().unwrap();
        assert!(phase.is_disconnected());
    }

    #[test]
    fn force_disconnect_from_any_state() {
        let mut phase = SessionPhase::Connected {
            since: Instant::now(),
        };
        phase.force_disconnect();
        assert!(phase.is_disconnected());
    }

    #[test]
    fn display_format() {
        assert_eq!(SessionPhase::Disconnected.to_string(), "Disconnected");
        assert_eq!(SessionPhase::Connecting.to_string(), "Connecting");
        assert_eq!(
            SessionPhase::Connected {
                since: Instant::now()
            }
            .to_string(),
            "Connected"
        );
    }

    #[test]
    fn connection_state_clear() {
        let mut state = ConnectionState {
            host: "10.0.0.9".into(),
            port: 5000,
            rows: 8,
            columns: 64,
            initialized: true,
            latency_ms: 12,
            updates_per_sec: 30,
        };
        state.clear();
        assert_eq!(state, ConnectionState::default());
        assert!(!state.initialized);
    }
}
