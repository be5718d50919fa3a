// ── Runtime connection configuration ──
//
// These types describe *how* to reach the device-control service.
// They never touch disk -- the CLI builds a `ServiceConfig` (usually via
// printgate-config) and hands it in.

use std::time::Duration;

use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed bench services).
    DangerAcceptInvalid,
}

/// Configuration for talking to one device-control service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Service root for request/response calls (e.g., `http://localhost:3000`).
    pub url: Url,
    /// Service root for the push channel. Usually the same host as `url`.
    pub push_url: Url,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Open the push channel on start. Without it only synchronous
    /// operations (status, init, match) can complete.
    pub push_enabled: bool,
    /// Consecutive push reconnection failures tolerated. `None` = forever.
    pub reconnect_attempts: Option<u32>,
    /// Force-close a session that has not seen its terminal push event
    /// within this long. `None` waits indefinitely.
    pub session_timeout: Option<Duration>,
}

impl ServiceConfig {
    /// Config for a service at `url` with the push channel on the same host.
    pub fn new(url: Url) -> Self {
        Self {
            push_url: url.clone(),
            url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            push_enabled: true,
            reconnect_attempts: Some(5),
            session_timeout: None,
        }
    }
}
