// Device-control service HTTP client
//
// Wraps `reqwest::Client` with service URL construction and error-body
// unwrapping. Each endpoint is a thin inherent method; the transport
// mechanics live in `get` / `post` / `parse_response`.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{
    CaptureMethod, CaptureTrigger, DeviceStatusResponse, InitResponse, MatchResult,
    SaveEnrollment, SavedResponse, TriggerAck,
};
use crate::transport::TransportConfig;

/// Error body the service attaches to non-2xx replies.
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the device-control service's request/response API.
///
/// All endpoints live under `{base_url}/api/`. Non-success replies are
/// turned into [`Error::Service`] carrying the service's `message`, so
/// callers can surface it verbatim.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    base_url: Url,
    /// Request timeout the transport was built with, reported in
    /// [`Error::Timeout`].
    timeout: Option<Duration>,
}

impl DeviceClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the service root, e.g. `http://localhost:3000`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout: Some(transport.timeout),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout: None,
        }
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /api/device-status`
    pub async fn device_status(&self) -> Result<DeviceStatusResponse, Error> {
        let url = self.api_url("device-status")?;
        self.get(url).await
    }

    /// `POST /api/init-device`
    pub async fn init_device(&self) -> Result<InitResponse, Error> {
        let url = self.api_url("init-device")?;
        self.post_empty(url).await
    }

    /// `POST /api/create_template`
    ///
    /// Only starts the capture; the outcome is pushed as `capture_result`.
    pub async fn create_template(
        &self,
        template_no: u8,
        method: CaptureMethod,
    ) -> Result<TriggerAck, Error> {
        let url = self.api_url("create_template")?;
        let body = CaptureTrigger {
            template_no,
            capture_type: method,
        };
        self.post(url, &body).await
    }

    /// `POST /api/match_templates`
    pub async fn match_templates(&self) -> Result<MatchResult, Error> {
        let url = self.api_url("match_templates")?;
        self.post_empty(url).await
    }

    /// `POST /api/start_enrollment`
    ///
    /// Acknowledgment only; progress arrives as `enrollment_step` pushes.
    pub async fn start_enrollment(&self) -> Result<(), Error> {
        let url = self.api_url("start_enrollment")?;
        let _: serde_json::Value = self.post_empty(url).await?;
        Ok(())
    }

    /// `POST /api/save_enrollment`
    pub async fn save_enrollment(
        &self,
        name: &str,
        id_number: &str,
    ) -> Result<SavedResponse, Error> {
        let url = self.api_url("save_enrollment")?;
        let body = SaveEnrollment {
            name: name.to_owned(),
            id_number: id_number.to_owned(),
        };
        self.post(url, &body).await
    }

    /// `POST /api/identify`
    ///
    /// Only starts the identification; the outcome is pushed as
    /// `identification_result`.
    pub async fn identify(&self) -> Result<TriggerAck, Error> {
        let url = self.api_url("identify")?;
        self.post_empty(url).await
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/api/{path}`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let full = format!("{}/api/{path}", self.base_url.as_str().trim_end_matches('/'));
        Ok(Url::parse(&full)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.parse_response(resp).await
    }

    async fn post<T: DeserializeOwned>(&self, url: Url, body: &impl Serialize) -> Result<T, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.parse_response(resp).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.parse_response(resp).await
    }

    /// A timed-out request becomes [`Error::Timeout`] with the configured
    /// limit when it is known.
    fn transport_error(&self, err: reqwest::Error) -> Error {
        match self.timeout {
            Some(limit) if err.is_timeout() => Error::Timeout {
                timeout_secs: limit.as_secs(),
            },
            _ => Error::Transport(err),
        }
    }

    /// Decode a success body, or turn a failure status into
    /// [`Error::Service`] with whatever message the body carried.
    async fn parse_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.is_empty());
            return Err(Error::Service {
                status: status.as_u16(),
                message,
            });
        }

        // Ack-only endpoints may answer with an empty body.
        let text = if body.trim().is_empty() { "{}" } else { body.as_str() };

        serde_json::from_str(text).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}
