//! HTTP client for the device's REST surface.
//!
//! Every route is a thin parameterized call — URL construction plus a
//! typed reply. Mutation routes are idempotent at the protocol level
//! (setting a cell to color X twice equals once), so callers may
//! fire-and-forget them; see [`crate::edit`].

use url::Url;

use crate::error::JumboError;
use crate::pixel::Rgb;
use crate::protocol::{Ack, BrightnessInfo, DeviceInfo, SavedMatrix};

// ── Endpoint ─────────────────────────────────────────────────────

/// A device endpoint: the HTTP host/port pair the user supplied.
///
/// The push channel lives one port above the HTTP port.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Base URL of the REST surface.
    pub fn http_base(&self) -> Result<Url, JumboError> {
        Ok(Url::parse(&format!("http://{}:{}", self.host, self.port))?)
    }

    /// URL of the push channel (`ws://host:port+1/jumbotron`).
    pub fn push_url(&self) -> Result<Url, JumboError> {
        Ok(Url::parse(&format!(
            "ws://{}:{}/jumbotron",
            self.host,
            self.port + 1
        ))?)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ── DeviceApi ────────────────────────────────────────────────────

/// Client for the remote matrix's HTTP API.
#[derive(Debug, Clone)]
pub struct DeviceApi {
    client: reqwest::Client,
    base: Url,
}

impl DeviceApi {
    pub fn new(endpoint: &Endpoint) -> Result<Self, JumboError> {
        Ok(Self {
            client: reqwest::Client::new(),
            base: endpoint.http_base()?,
        })
    }

    fn route(&self, segments: &str) -> Url {
        // Base URLs built from host:port always accept a path.
        let mut url = self.base.clone();
        url.set_path(segments);
        url
    }

    /// Expect a `{success: true}` acknowledgement, mapping a device-side
    /// refusal to a typed error.
    async fn expect_ack(
        resp: reqwest::Response,
        operation: &'static str,
    ) -> Result<(), JumboError> {
        let ack: Ack = resp.json().await?;
        if ack.success {
            Ok(())
        } else {
            Err(JumboError::DeviceRejected {
                operation,
                reason: ack.error.unwrap_or_else(|| "no reason given".into()),
            })
        }
    }

    // ── Handshake ────────────────────────────────────────────────

    /// Capability probe. Fails if the device does not report itself
    /// alive with a usable geometry.
    pub async fn probe(&self) -> Result<DeviceInfo, JumboError> {
        let info: DeviceInfo = self
            .client
            .get(self.route("/jumbotron"))
            .send()
            .await?
            .json()
            .await?;

        if !info.is_alive {
            return Err(JumboError::IncompleteHandshake("device reports not alive"));
        }
        if info.rows == 0 || info.columns == 0 {
            return Err(JumboError::IncompleteHandshake("device reported empty geometry"));
        }
        Ok(info)
    }

    // ── Mutations ────────────────────────────────────────────────

    pub async fn set_pixel(
        &self,
        row: usize,
        column: usize,
        color: Rgb,
        brightness: u8,
    ) -> Result<(), JumboError> {
        let url = self.route(&format!(
            "/jumbotron/pixel/{row}/{column}/{}/{}/{}/{brightness}",
            color.r, color.g, color.b
        ));
        self.client.post(url).send().await?.error_for_status()?;
        Ok(())
    }

    pub async fn set_row(&self, row: usize, color: Rgb, brightness: u8) -> Result<(), JumboError> {
        let url = self.route(&format!(
            "/jumbotron/row/{row}/{}/{}/{}/{brightness}",
            color.r, color.g, color.b
        ));
        self.client.post(url).send().await?.error_for_status()?;
        Ok(())
    }

    pub async fn set_column(
        &self,
        column: usize,
        color: Rgb,
        brightness: u8,
    ) -> Result<(), JumboError> {
        let url = self.route(&format!(
            "/jumbotron/column/{column}/{}/{}/{}/{brightness}",
            color.r, color.g, color.b
        ));
        self.client.post(url).send().await?.error_for_status()?;
        Ok(())
    }

    pub async fn set_all(&self, color: Rgb, brightness: u8) -> Result<(), JumboError> {
        let url = self.route(&format!(
            "/jumbotron/all/{}/{}/{}/{brightness}",
            color.r, color.g, color.b
        ));
        self.client.post(url).send().await?.error_for_status()?;
        Ok(())
    }

    // ── Brightness ───────────────────────────────────────────────

    pub async fn brightness(&self) -> Result<u8, JumboError> {
        let info: BrightnessInfo = self
            .client
            .get(self.route("/jumbotron/brightness"))
            .send()
            .await?
            .json()
            .await?;
        Ok(info.brightness)
    }

    pub async fn set_brightness(&self, value: u8) -> Result<(), JumboError> {
        let resp = self
            .client
            .post(self.route(&format!("/jumbotron/brightness/{value}")))
            .send()
            .await?;
        Self::expect_ack(resp, "set_brightness").await
    }

    // ── Board control ────────────────────────────────────────────

    /// Blank the whole board.
    pub async fn reset(&self) -> Result<(), JumboError> {
        let resp = self.client.get(self.route("/jumbotron/reset")).send().await?;
        Self::expect_ack(resp, "reset").await
    }

    // ── Uploads ──────────────────────────────────────────────────

    /// Display a still image. `bytes` is the raw file body; the device
    /// scales it to the matrix.
    pub async fn upload_image(
        &self,
        bytes: Vec<u8>,
        filename: String,
        brightness: u8,
    ) -> Result<(), JumboError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        let form = reqwest::multipart::Form::new().part("file", part);
        self.client
            .post(self.route(&format!("/jumbotron/upload/{brightness}")))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Loop a video on the matrix.
    pub async fn play_video(
        &self,
        bytes: Vec<u8>,
        filename: String,
        brightness: u8,
    ) -> Result<(), JumboError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self
            .client
            .post(self.route(&format!("/jumbotron/playvideo/{brightness}")))
            .multipart(form)
            .send()
            .await?;
        Self::expect_ack(resp, "play_video").await
    }

    // ── Saved matrices ───────────────────────────────────────────

    pub async fn saved_matrices(&self) -> Result<Vec<SavedMatrix>, JumboError> {
        let list: Vec<SavedMatrix> = self
            .client
            .get(self.route("/jumbotron/get_saved_matrices"))
            .send()
            .await?
            .json()
            .await?;
        Ok(list)
    }

    /// PNG preview bytes of a saved matrix.
    pub async fn saved_matrix_image(&self, name: &str) -> Result<Vec<u8>, JumboError> {
        let bytes = self
            .client
            .get(self.route(&format!("/jumbotron/get_saved_matrix_image/{name}")))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }

    pub async fn save_current_matrix(&self, name: &str) -> Result<(), JumboError> {
        let resp = self
            .client
            .post(self.route(&format!("/jumbotron/save_current_matrix/{name}")))
            .send()
            .await?;
        Self::expect_ack(resp, "save_current_matrix").await
    }

    /// Redisplay a saved still image. Unlike
    /// [`activate_saved_matrix`](Self::activate_saved_matrix) this
    /// never touches video playback; the device refuses video saves.
    pub async fn play_saved_matrix(&self, name: &str) -> Result<(), JumboError> {
        let resp = self
            .client
            .get(self.route(&format!("/jumbotron/play_saved_matrix/{name}")))
            .send()
            .await?;
        Self::expect_ack(resp, "play_saved_matrix").await
    }

    pub async fn activate_saved_matrix(&self, name: &str) -> Result<(), JumboError> {
        let resp = self
            .client
            .post(self.route(&format!("/jumbotron/activate_saved_matrix/{name}")))
            .send()
            .await?;
        Self::expect_ack(resp, "activate_saved_matrix").await
    }

    /// Verb pinned to DELETE (what the device firmware declares).
    pub async fn delete_saved_matrix(&self, name: &str) -> Result<(), JumboError> {
        let resp = self
            .client
            .delete(self.route(&format!("/jumbotron/delete_saved_matrix/{name}")))
            .send()
            .await?;
        Self::expect_ack(resp, "delete_saved_matrix").await
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_urls() {
        let ep = Endpoint::new("192.168.1.50", 5000);
        assert_eq!(ep.http_base().unwrap().as_str(), "http://192.168.1.50:5000/");
        assert_eq!(
            ep.push_url().unwrap().as_str(),
            "ws://192.168.1.50:5001/jumbotron"
        );
        assert_eq!(ep.to_string(), "192.168.1.50:5000");
    }

    #[test]
    fn endpoint_rejects_garbage_host() {
        let ep = Endpoint::new("not a host", 5000);
        assert!(ep.http_base().is_err());
    }

    #[test]
    fn route_construction() {
        let api = DeviceApi::new(&Endpoint::new("10.0.0.2", 5000)).unwrap();
        let url = api.route("/jumbotron/pixel/2/3/255/0/160/40");
        assert_eq!(
            url.as_str(),
            "http://10.0.0.2:5000/jumbotron/pixel/2/3/255/0/160/40"
        );
    }

    #[test]
    fn saved_matrix_routes_take_raw_filenames() {
        let api = DeviceApi::new(&Endpoint::new("10.0.0.2", 5000)).unwrap();
        // The device joins the path segment onto its saves directory
        // verbatim, so the full filename goes on the wire.
        let url = api.route("/jumbotron/play_saved_matrix/sunset.json");
        assert_eq!(
            url.as_str(),
            "http://10.0.0.2:5000/jumbotron/play_saved_matrix/sunset.json"
        );
    }
}
