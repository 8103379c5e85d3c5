//! Persisted list of known device endpoints.
//!
//! The registry is a plain JSON file. Every mutation rewrites it, so
//! the on-disk copy is always current and a crash loses nothing.

use std::path::PathBuf;

use tracing::debug;

use crate::api::Endpoint;
use crate::error::JumboError;

/// Known devices, ordered by insertion.
#[derive(Debug)]
pub struct ConnectionRegistry {
    path: PathBuf,
    endpoints: Vec<Endpoint>,
}

impl ConnectionRegistry {
    /// Load the registry at `path`, starting empty when the file does
    /// not exist yet. A file that exists but fails to parse is an
    /// error; silently discarding someone's device list is worse than
    /// refusing to start.
    pub fn load(path: PathBuf) -> Result<Self, JumboError> {
        let endpoints = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), count = endpoints.len(), "registry loaded");
        Ok(Self { path, endpoints })
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Add an endpoint and persist. A duplicate host/port pair is a
    /// no-op (and does not rewrite the file).
    pub fn add(&mut self, endpoint: Endpoint) -> Result<bool, JumboError> {
        if self.endpoints.contains(&endpoint) {
            return Ok(false);
        }
        self.endpoints.push(endpoint);
        self.persist()?;
        Ok(true)
    }

    /// Remove an endpoint and persist. Returns whether it was present.
    pub fn remove(&mut self, endpoint: &Endpoint) -> Result<bool, JumboError> {
        let before = self.endpoints.len();
        self.endpoints.retain(|e| e != endpoint);
        if self.endpoints.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    fn persist(&self) -> Result<(), JumboError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.endpoints)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
