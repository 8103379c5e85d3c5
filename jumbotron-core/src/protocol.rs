//! Serialisable wire types for the device's HTTP and push surfaces.
//!
//! These are the *wire* shapes exactly as the device emits them; they
//! are distinct from the internal grid representation in
//! [`crate::buffer`].

use serde::{Deserialize, Serialize};

use crate::pixel::Pixel;

// ── Clock constants ──────────────────────────────────────────────

/// The device stamps push frames in **nanoseconds** since the Unix
/// epoch; the local receive clock is read in **milliseconds**. This is
/// the exact conversion factor between the two — changing it silently
/// corrupts the latency metric.
pub const NANOS_PER_MILLI: u64 = 1_000_000;

/// Milliseconds since the Unix epoch on the local clock.
pub fn unix_millis_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Latency of a push frame: absolute difference between the local
/// receive time and the device timestamp, both normalized to
/// milliseconds.
pub fn latency_ms(device_timestamp_ns: u64, received_unix_ms: u64) -> u64 {
    let device_ms = device_timestamp_ns / NANOS_PER_MILLI;
    received_unix_ms.abs_diff(device_ms)
}

// ── Handshake ────────────────────────────────────────────────────

/// Reply to the `GET /jumbotron` capability probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "isAlive")]
    pub is_alive: bool,
    #[serde(default)]
    pub rows: usize,
    #[serde(default)]
    pub columns: usize,
}

// ── Push frame ───────────────────────────────────────────────────

/// One full-frame snapshot from the push channel (the `array_update`
/// payload): the whole grid plus a device-clock timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushFrame {
    pub data: Vec<Vec<Pixel>>,
    /// Device-side timestamp, nanoseconds since the Unix epoch.
    pub timestamp: u64,
}

impl PushFrame {
    pub fn rows(&self) -> usize {
        self.data.len()
    }

    pub fn columns(&self) -> usize {
        self.data.first().map(Vec::len).unwrap_or(0)
    }
}

// ── REST replies ─────────────────────────────────────────────────

/// Generic `{success, error?}` acknowledgement many routes return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// One entry of the saved-matrix listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedMatrix {
    pub filename: String,
    /// Device-relative URL of the PNG preview.
    pub image: String,
}

impl SavedMatrix {
    /// Display name: the filename without its `.json` suffix.
    pub fn name(&self) -> &str {
        self.filename
            .strip_suffix(".json")
            .unwrap_or(&self.filename)
    }
}

/// Reply to `GET /jumbotron/brightness`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrightnessInfo {
    pub brightness: u8,
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_is_exact_and_sign_independent() {
        let ts_ns: u64 = 1_700_000_000_000 * NANOS_PER_MILLI;
        let base_ms = ts_ns / NANOS_PER_MILLI;

        assert_eq!(latency_ms(ts_ns, base_ms + 42), 42);
        // Device clock ahead of ours: same magnitude.
        assert_eq!(latency_ms(ts_ns, base_ms - 42), 42);
        assert_eq!(latency_ms(ts_ns, base_ms), 0);
    }

    #[test]
    fn device_info_wire_shape() {
        let info: DeviceInfo =
            serde_json::from_str(r#"{"isAlive":true,"rows":8,"columns":64}"#).unwrap();
        assert!(info.is_alive);
        assert_eq!(info.rows, 8);
        assert_eq!(info.columns, 64);

        // Missing geometry deserializes to zero; the probe rejects it.
        let partial: DeviceInfo = serde_json::from_str(r#"{"isAlive":true}"#).unwrap();
        assert_eq!(partial.rows, 0);
    }

    #[test]
    fn push_frame_geometry() {
        let frame: PushFrame = serde_json::from_str(
            r#"{"data":[[{"r":1,"g":2,"b":3,"brightness":4}]],"timestamp":123}"#,
        )
        .unwrap();
        assert_eq!(frame.rows(), 1);
        assert_eq!(frame.columns(), 1);
        assert_eq!(frame.timestamp, 123);
    }

    #[test]
    fn saved_matrix_display_name() {
        let m = SavedMatrix {
            filename: "sunset.json".into(),
            image: "/jumbotron/get_saved_matrix_image/sunset.json".into(),
        };
        assert_eq!(m.name(), "sunset");

        let odd = SavedMatrix {
            filename: "raw".into(),
            image: String::new(),
        };
        assert_eq!(odd.name(), "raw");
    }

    #[test]
    fn ack_tolerates_missing_fields() {
        let ack: Ack = serde_json::from_str("{}").unwrap();
        assert!(!ack.success);
        assert!(ack.error.is_none());
    }
}
