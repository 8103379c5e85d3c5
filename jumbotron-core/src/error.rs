//! Domain-specific error types for the jumbotron client.
//!
//! All fallible operations return `Result<T, JumboError>`.
//! No panics on invalid input — every error is typed and recoverable.

use thiserror::Error;

/// The canonical error type for the jumbotron client.
#[derive(Debug, Error)]
pub enum JumboError {
    // ── Handshake Errors ─────────────────────────────────────────
    /// The capability probe answered, but the payload was unusable.
    #[error("handshake incomplete: {0}")]
    IncompleteHandshake(&'static str),

    /// The host/port pair could not be turned into a URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    // ── Grid Errors ──────────────────────────────────────────────
    /// A coordinate fell outside the current grid dimensions.
    #[error("coordinates out of range: ({row}, {column}) on a {rows}x{columns} grid")]
    OutOfRange {
        row: usize,
        column: usize,
        rows: usize,
        columns: usize,
    },

    /// A snapshot's geometry does not match the connected grid.
    #[error("snapshot dimensions {got_rows}x{got_columns} do not match grid {rows}x{columns}")]
    DimensionMismatch {
        got_rows: usize,
        got_columns: usize,
        rows: usize,
        columns: usize,
    },

    /// A color string was not a `#RRGGBB` hex sextet.
    #[error("invalid hex color: {0:?}")]
    InvalidHexColor(String),

    // ── Channel Errors ───────────────────────────────────────────
    /// The push channel could not be established within the attempt ceiling.
    #[error("push channel unreachable after {attempts} attempts")]
    ChannelExhausted { attempts: u32 },

    /// The WebSocket layer reported an error.
    #[error("push channel error: {0}")]
    Channel(#[from] tokio_tungstenite::tungstenite::Error),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    // ── Session Errors ───────────────────────────────────────────
    /// A session lifecycle transition was attempted from the wrong phase.
    #[error("session violation: {0}")]
    SessionViolation(&'static str),

    // ── Remote API Errors ────────────────────────────────────────
    /// The HTTP layer reported an error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The device answered but declined the request.
    #[error("device rejected {operation}: {reason}")]
    DeviceRejected { operation: &'static str, reason: String },

    // ── Serialization / Storage Errors ───────────────────────────
    /// Encoding or decoding of a payload failed.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The I/O layer reported an error (registry file, upload source).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for JumboError {
    fn from(s: String) -> Self {
        JumboError::Other(s)
    }
}

impl From<&str> for JumboError {
    fn from(s: &str) -> Self {
        JumboError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for JumboError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        JumboError::ChannelClosed
    }
}

impl From<url::ParseError> for JumboError {
    fn from(e: url::ParseError) -> Self {
        JumboError::InvalidEndpoint(e.to_string())
    }
}
