//! Operator panel configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for the panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Device settings.
    pub device: DeviceConfig,
    /// Editing defaults.
    pub editing: EditingConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Device settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device host (IP or name) of the HTTP surface.
    pub host: String,
    /// Device HTTP port. The push feed is one port above.
    pub port: u16,
    /// Where the known-device list is persisted.
    pub registry_path: PathBuf,
}

/// Editing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditingConfig {
    /// Starting paint palette, `#RRGGBB` entries.
    pub palette: Vec<String>,
    /// Starting per-pixel brightness (device range 0-40).
    pub brightness: u8,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
    /// Log file. Empty disables logging (the terminal is owned by the
    /// UI, so there is nowhere else to write).
    pub file: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            editing: EditingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            registry_path: PathBuf::from("jumbotron-devices.json"),
        }
    }
}

impl Default for EditingConfig {
    fn default() -> Self {
        Self {
            palette: vec![
                "#FFFFFF".into(),
                "#FF0000".into(),
                "#00FF00".into(),
                "#0000FF".into(),
                "#FFFF00".into(),
                "#FF00FF".into(),
                "#00FFFF".into(),
                "#FF8000".into(),
            ],
            brightness: 20,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: String::new(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl PanelConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = PanelConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("host"));
        assert!(text.contains("palette"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = PanelConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: PanelConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.device.port, 5000);
        assert_eq!(parsed.editing.brightness, 20);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let parsed: PanelConfig = toml::from_str("[device]\nhost = \"10.0.0.9\"\n").unwrap();
        assert_eq!(parsed.device.host, "10.0.0.9");
        assert_eq!(parsed.device.port, 5000);
        assert!(!parsed.editing.palette.is_empty());
    }
}
