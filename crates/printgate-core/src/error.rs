// ── Core error types ──
//
// User-facing errors from printgate-core. These are NOT API-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<printgate_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

use crate::session::SessionKind;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Precondition errors ──────────────────────────────────────────
    #[error("Another operation is in progress ({active})")]
    Busy { active: SessionKind },

    #[error("Device is not ready (status: {status})")]
    DeviceNotReady { status: printgate_api::DeviceStatus },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Both templates must be captured before matching")]
    TemplatesMissing,

    #[error("No failed enrollment save to retry")]
    NoPendingSave,

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach device service at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Device service request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation rejected by device service: {message}")]
    Rejected { message: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The message a user should see for a failed request: the service's
    /// own wording when it sent one, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Rejected { message } | Self::Api { message, status: Some(_) } => {
                message.clone()
            }
            _ => fallback.to_owned(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<printgate_api::Error> for CoreError {
    fn from(err: printgate_api::Error) -> Self {
        match err {
            printgate_api::Error::Transport(ref e) => {
                // Timeouts arrive as `Error::Timeout` from a client built
                // with a `TransportConfig`.
                if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: None,
                    }
                }
            }
            printgate_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            printgate_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            printgate_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            printgate_api::Error::Service {
                status,
                message: Some(message),
            } => CoreError::Api {
                message,
                status: Some(status),
            },
            printgate_api::Error::Service {
                status,
                message: None,
            } => CoreError::Api {
                message: format!("device service returned HTTP {status}"),
                status: None,
            },
            printgate_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("push channel connection failed: {reason}"),
            },
            printgate_api::Error::WebSocketClosed { code, reason } => {
                CoreError::ConnectionFailed {
                    url: String::new(),
                    reason: format!("push channel closed (code {code}): {reason}"),
                }
            }
            printgate_api::Error::Protocol(msg) => {
                CoreError::Internal(format!("push protocol error: {msg}"))
            }
            printgate_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
