//! Operator panel: application state, configuration, device task glue.

pub mod app;
pub mod config;

pub use app::{App, DeviceCommand, DeviceEvent, MAX_BRIGHTNESS, PromptKind, UiEvent};
pub use config::PanelConfig;
