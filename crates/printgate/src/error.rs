//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use printgate_config::ConfigError;
use printgate_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_READY: i32 = 3;
    pub const FAILED: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(dead_code, unused_assignments)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the device service at {url}")]
    #[diagnostic(
        code(printgate::connection_failed),
        help(
            "Check that the device service is running and reachable.\n\
             URL: {url}\n\
             Try: printgate status --service http://localhost:3000"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Push channel unavailable at {url}")]
    #[diagnostic(
        code(printgate::push_unavailable),
        help(
            "Capture, enrollment, and identification report their results over\n\
             the service's push channel. Check the service, or set push_url in\n\
             your profile if it listens elsewhere."
        )
    )]
    PushUnavailable { url: String },

    // ── Device / session ─────────────────────────────────────────────
    #[error("Device is not ready (status: {status})")]
    #[diagnostic(
        code(printgate::not_ready),
        help("Initialize the scanner first: printgate init")
    )]
    DeviceNotReady { status: String },

    #[error("Another operation is in progress ({active})")]
    #[diagnostic(code(printgate::busy))]
    Busy { active: String },

    #[error("Both templates must be captured before matching")]
    #[diagnostic(
        code(printgate::templates_missing),
        help(
            "Capture both slots first:\n  \
             printgate capture --slot 1\n  \
             printgate capture --slot 2"
        )
    )]
    TemplatesMissing,

    #[error("{message}")]
    #[diagnostic(code(printgate::rejected))]
    Rejected { message: String },

    #[error("{message}")]
    #[diagnostic(code(printgate::operation_failed))]
    OperationFailed { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Service error: {message}")]
    #[diagnostic(code(printgate::api_error))]
    ApiError {
        message: String,
        status: Option<u16>,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(printgate::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(printgate::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: printgate config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(printgate::config))]
    Config(Box<figment::Error>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("'{action}' requires confirmation")]
    #[diagnostic(
        code(printgate::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Timed out after {seconds}s")]
    #[diagnostic(
        code(printgate::timeout),
        help("Increase --timeout / --session-timeout or check the service.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(printgate::internal))]
    Internal(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::PushUnavailable { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::DeviceNotReady { .. } => exit_code::NOT_READY,
            Self::OperationFailed { .. } => exit_code::FAILED,
            Self::Validation { .. }
            | Self::TemplatesMissing
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Busy { active } => CliError::Busy {
                active: active.to_string(),
            },

            CoreError::DeviceNotReady { status } => CliError::DeviceNotReady {
                status: status.to_string(),
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::TemplatesMissing => CliError::TemplatesMissing,

            CoreError::NoPendingSave => CliError::Validation {
                field: "retry".into(),
                reason: "no failed enrollment save to retry".into(),
            },

            CoreError::Rejected { message } => CliError::Rejected { message },

            CoreError::OperationFailed { message } => CliError::OperationFailed { message },

            CoreError::Api { message, status } => CliError::ApiError { message, status },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
            ConfigError::Serialization(e) => CliError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use printgate_core::{DeviceStatus, SessionKind};

    use super::*;

    #[test]
    fn precondition_errors_map_to_exit_codes() {
        let not_ready = CliError::from(CoreError::DeviceNotReady {
            status: DeviceStatus::NotInitialized,
        });
        assert_eq!(not_ready.exit_code(), exit_code::NOT_READY);
        assert_eq!(
            not_ready.to_string(),
            "Device is not ready (status: not_initialized)"
        );

        let busy = CliError::from(CoreError::Busy {
            active: SessionKind::Enrolling,
        });
        assert_eq!(busy.exit_code(), exit_code::GENERAL);
        assert_eq!(busy.to_string(), "Another operation is in progress (enrolling)");

        assert_eq!(
            CliError::from(CoreError::TemplatesMissing).exit_code(),
            exit_code::USAGE
        );
    }

    #[test]
    fn connection_failure_exit_code() {
        let err = CliError::from(CoreError::ConnectionFailed {
            url: "http://localhost:3000".into(),
            reason: "refused".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }
}
