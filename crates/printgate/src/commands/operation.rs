//! Shared plumbing for operations whose outcome arrives over the push
//! channel: readiness checks, connecting, and following a session to
//! its end with a spinner.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::{self, error::RecvError};

use printgate_core::{ConnectionState, DeviceStatus, Notice, Workflow, WorkflowState};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

const SPINNER_TICK: Duration = Duration::from_millis(100);

/// Query the service and fail unless the scanner is initialized.
///
/// Doubles as the connectivity check: an unreachable service surfaces
/// here as a connection error.
pub async fn require_ready(workflow: &Workflow) -> Result<(), CliError> {
    let status = workflow.refresh_status().await?;
    if status.is_ready() {
        Ok(())
    } else {
        Err(CliError::DeviceNotReady {
            status: status.to_string(),
        })
    }
}

/// Open the push channel and wait until it is connected.
///
/// Bounded by the request timeout, so a dead push endpoint fails fast
/// instead of leaving a session that can never finish.
pub async fn connect_push(workflow: &Workflow) -> Result<(), CliError> {
    workflow.start_push().await?;

    let url = workflow.config().push_url.to_string();
    let mut rx = workflow.connection();
    let wait = rx.wait_for(|s| matches!(s, ConnectionState::Connected | ConnectionState::Failed));
    let state = match tokio::time::timeout(workflow.config().timeout, wait).await {
        Ok(Ok(state)) => *state,
        Ok(Err(_)) | Err(_) => return Err(CliError::PushUnavailable { url }),
    };

    if state == ConnectionState::Connected {
        tracing::debug!(%url, "push channel ready");
        Ok(())
    } else {
        Err(CliError::PushUnavailable { url })
    }
}

// ── Following a session ──────────────────────────────────────────────

/// What happened while a session ran.
pub struct Outcome {
    /// Snapshot taken once the session closed.
    pub state: WorkflowState,
    /// Most recent error notice, if any.
    pub last_error: Option<String>,
    /// The final notice was an error. A connection blip that later
    /// recovered does not count.
    pub failed: bool,
}

impl Outcome {
    /// The last error notice as an [`CliError::OperationFailed`], or
    /// `fallback` if none was seen.
    pub fn failure(&self, fallback: &str) -> CliError {
        CliError::OperationFailed {
            message: self
                .last_error
                .clone()
                .unwrap_or_else(|| fallback.to_owned()),
        }
    }
}

/// Print notices and show progress until no session is active.
///
/// `notices` must be subscribed before the operation was triggered so
/// that nothing published in between is missed.
pub async fn follow(
    workflow: &Workflow,
    mut notices: broadcast::Receiver<Notice>,
    label: &str,
    global: &GlobalOpts,
) -> Result<Outcome, CliError> {
    let color = output::should_color(&global.color);
    let spinner = spinner(label, global);
    let mut states = workflow.subscribe();
    let mut last_error = None;
    let mut failed = false;

    let mut state = states.latest();
    while state.session.is_some() {
        tokio::select! {
            changed = states.changed() => match changed {
                Some(next) => state = next,
                None => break,
            },
            notice = notices.recv() => match notice {
                Ok(notice) => {
                    failed = notice.is_error();
                    if failed {
                        last_error = Some(notice.message.clone());
                    }
                    spinner.suspend(|| output::print_notice(&notice, color, global.quiet));
                }
                Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "notice stream lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                spinner.finish_and_clear();
                return Err(CliError::OperationFailed {
                    message: format!("{label} interrupted"),
                });
            }
        }
        if let Some(progress) = progress_message(&state) {
            spinner.set_message(format!("{label}: {progress}"));
        }
    }

    // Whatever the closing transition published (result, save notice)
    // is already buffered.
    while let Ok(notice) = notices.try_recv() {
        failed = notice.is_error();
        if failed {
            last_error = Some(notice.message.clone());
        }
        spinner.suspend(|| output::print_notice(&notice, color, global.quiet));
    }
    spinner.finish_and_clear();

    Ok(Outcome {
        state: workflow.snapshot(),
        last_error,
        failed,
    })
}

/// Print whatever is already queued on `notices` without waiting.
pub fn drain_notices(notices: &mut broadcast::Receiver<Notice>, global: &GlobalOpts) {
    let color = output::should_color(&global.color);
    while let Ok(notice) = notices.try_recv() {
        output::print_notice(&notice, color, global.quiet);
    }
}

fn progress_message(state: &WorkflowState) -> Option<&str> {
    state
        .enrollment_message
        .as_deref()
        .or(state.identification_message.as_deref())
}

fn spinner(label: &str, global: &GlobalOpts) -> ProgressBar {
    if global.quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::with_template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let bar = ProgressBar::new_spinner().with_style(style);
    bar.set_message(format!("{label}: waiting for the scanner"));
    bar.enable_steady_tick(SPINNER_TICK);
    bar
}

/// Human-readable device status for tables.
pub fn status_label(status: DeviceStatus) -> &'static str {
    match status {
        DeviceStatus::Ready => "ready",
        DeviceStatus::NotInitialized => "not initialized",
        DeviceStatus::Error => "error",
        DeviceStatus::Unknown => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enrollment_progress_wins_over_identification() {
        let mut state = WorkflowState::default();
        assert_eq!(progress_message(&state), None);
        state.identification_message = Some("place finger".into());
        assert_eq!(progress_message(&state), Some("place finger"));
        state.enrollment_message = Some("capture left four".into());
        assert_eq!(progress_message(&state), Some("capture left four"));
    }

    #[test]
    fn failure_prefers_last_error_notice() {
        let outcome = Outcome {
            state: WorkflowState::default(),
            last_error: Some("Scanner timeout".into()),
            failed: true,
        };
        assert_eq!(outcome.failure("capture failed").to_string(), "Scanner timeout");

        let quiet = Outcome {
            state: WorkflowState::default(),
            last_error: None,
            failed: false,
        };
        assert_eq!(quiet.failure("capture failed").to_string(), "capture failed");
    }
}
