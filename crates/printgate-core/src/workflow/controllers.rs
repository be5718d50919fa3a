// ── Operation controllers ──
//
// User-initiated operations. Each checks its preconditions, opens a
// session through the guard, issues its request, and closes the session
// on every terminal path it owns. Every outcome is both returned and
// published as a notice.

use tracing::{debug, warn};

use printgate_api::{CaptureMethod, DeviceStatus, MatchResult};

use super::Workflow;
use crate::error::CoreError;
use crate::notice::Notice;
use crate::session::{Operation, SessionTicket};

const INIT_FAILED: &str = "initialization failed";
const CAPTURE_START_FAILED: &str = "failed to start capture";
const MATCH_FAILED: &str = "matching failed";
const ENROLL_START_FAILED: &str = "failed to start enrollment";
const IDENTIFY_START_FAILED: &str = "failed to start identification";

impl Workflow {
    // ── Device init ──────────────────────────────────────────────────

    /// Initialize the scanner. Safe to retry after a failure.
    ///
    /// Holds a capturing session while the request is in flight so no
    /// other operation can start.
    pub async fn initialize_device(&self) -> Result<(), CoreError> {
        let ticket = self.open(Operation::Init)?;

        match self.inner.client.init_device().await {
            Ok(resp) => {
                self.inner
                    .guard
                    .finish_with(ticket, |s| s.device_status = DeviceStatus::Ready);
                self.notify(Notice::success(
                    resp.message.unwrap_or_else(|| "device initialized".into()),
                ));
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner
                    .guard
                    .finish_with(ticket, |s| s.device_status = DeviceStatus::Error);
                Err(self.request_failed(err, INIT_FAILED))
            }
        }
    }

    // ── Manual capture + 1:1 match ───────────────────────────────────

    /// Trigger a manual capture into template slot 1 or 2.
    ///
    /// Returns once the service accepts the trigger; the session stays
    /// open until the `capture_result` push event arrives.
    pub async fn create_template(&self, slot: u8, method: CaptureMethod) -> Result<(), CoreError> {
        if !matches!(slot, 1 | 2) {
            return Err(self.reject(CoreError::ValidationFailed {
                message: format!("template slot must be 1 or 2, got {slot}"),
            }));
        }
        self.require_idle()?;
        self.require_ready()?;
        let ticket = self.open(Operation::Capture)?;

        debug!(slot, %method, "requesting manual capture");
        match self.inner.client.create_template(slot, method).await {
            Ok(ack) if ack.success => {
                self.arm_watchdog(ticket);
                Ok(())
            }
            Ok(ack) => {
                self.inner.guard.finish(ticket);
                Err(self.trigger_rejected(ack.message, CAPTURE_START_FAILED))
            }
            Err(e) => {
                self.inner.guard.finish(ticket);
                Err(self.request_failed(e.into(), CAPTURE_START_FAILED))
            }
        }
    }

    /// Compare the two captured templates.
    ///
    /// The response is stored verbatim. A reply with `success = false` is
    /// stored too but returned as [`CoreError::OperationFailed`].
    pub async fn match_templates(&self) -> Result<MatchResult, CoreError> {
        let templates = self.inner.guard.snapshot().templates;
        if !(templates.template1 && templates.template2) {
            return Err(self.reject(CoreError::TemplatesMissing));
        }
        self.require_idle()?;
        self.require_ready()?;
        let ticket = self.open(Operation::Match)?;

        let result = match self.inner.client.match_templates().await {
            Ok(result) => result,
            Err(e) => {
                self.inner.guard.finish(ticket);
                return Err(self.request_failed(e.into(), MATCH_FAILED));
            }
        };

        self.inner
            .guard
            .finish_with(ticket, |s| s.match_result = Some(result.clone()));

        let score = format_score(result.score);
        if !result.success {
            let message = result.message.clone().unwrap_or_else(|| MATCH_FAILED.into());
            self.notify(Notice::error(message.clone()));
            return Err(CoreError::OperationFailed { message });
        }
        if result.matched {
            self.notify(Notice::success(format!("fingerprints match (score {score})")));
        } else {
            self.notify(Notice::warning(format!(
                "fingerprints do not match (score {score})"
            )));
        }
        Ok(result)
    }

    // ── Automated enrollment ─────────────────────────────────────────

    /// Start the automated capture sequence for the subject in the form.
    ///
    /// Progress arrives as `enrollment_step` push events; the final step
    /// hands off to the persistence bridge.
    pub async fn start_enrollment(&self) -> Result<(), CoreError> {
        if !self.inner.guard.snapshot().form.is_complete() {
            return Err(self.reject(CoreError::ValidationFailed {
                message: "enter a name and ID number first".into(),
            }));
        }
        self.require_idle()?;
        self.require_ready()?;
        let ticket = self.open(Operation::Enroll)?;

        match self.inner.client.start_enrollment().await {
            Ok(()) => {
                self.arm_watchdog(ticket);
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.guard.finish(ticket);
                Err(self.request_failed(err, ENROLL_START_FAILED))
            }
        }
    }

    /// Re-issue a failed enrollment save with the retained form.
    pub async fn retry_save(&self) -> Result<(), CoreError> {
        if !self.inner.guard.snapshot().pending_save {
            return Err(self.reject(CoreError::NoPendingSave));
        }
        let ticket = self.open(Operation::Save)?;
        self.persist_enrollment(ticket).await
    }

    // ── 1:N identification ───────────────────────────────────────────

    /// Start an identification against the stored database.
    ///
    /// The session stays open until `identification_result` arrives.
    pub async fn start_identification(&self) -> Result<(), CoreError> {
        self.require_idle()?;
        self.require_ready()?;
        let ticket = self.open(Operation::Identify)?;

        match self.inner.client.identify().await {
            Ok(ack) if ack.success => {
                self.arm_watchdog(ticket);
                Ok(())
            }
            Ok(ack) => {
                self.inner.guard.finish(ticket);
                Err(self.trigger_rejected(ack.message, IDENTIFY_START_FAILED))
            }
            Err(e) => {
                self.inner.guard.finish(ticket);
                Err(self.request_failed(e.into(), IDENTIFY_START_FAILED))
            }
        }
    }

    // ── Preconditions ────────────────────────────────────────────────

    fn open(&self, op: Operation) -> Result<SessionTicket, CoreError> {
        self.inner.guard.begin(op).map_err(|e| self.reject(e))
    }

    fn require_idle(&self) -> Result<(), CoreError> {
        match self.inner.guard.active() {
            Some(session) => Err(self.reject(CoreError::Busy {
                active: session.kind(),
            })),
            None => Ok(()),
        }
    }

    fn require_ready(&self) -> Result<(), CoreError> {
        let status = self.inner.guard.snapshot().device_status;
        if status.is_ready() {
            Ok(())
        } else {
            Err(self.reject(CoreError::DeviceNotReady { status }))
        }
    }

    /// Publish the notice for a failed precondition and hand the error back.
    fn reject(&self, err: CoreError) -> CoreError {
        let notice = match &err {
            CoreError::Busy { .. } => Notice::info("another operation is in progress"),
            CoreError::DeviceNotReady { .. } => Notice::warning("device is not initialized"),
            CoreError::ValidationFailed { message } => Notice::warning(message.clone()),
            CoreError::TemplatesMissing => {
                Notice::warning("capture both templates before matching")
            }
            CoreError::NoPendingSave => Notice::warning("no failed enrollment save to retry"),
            other => Notice::error(other.to_string()),
        };
        debug!(error = %err, "precondition failed");
        self.notify(notice);
        err
    }

    // ── Failure reporting ────────────────────────────────────────────

    pub(crate) fn request_failed(&self, err: CoreError, fallback: &str) -> CoreError {
        let message = err.user_message(fallback);
        warn!(error = %err, "{fallback}");
        self.notify(Notice::error(message));
        err
    }

    fn trigger_rejected(&self, message: Option<String>, fallback: &str) -> CoreError {
        let message = message.unwrap_or_else(|| fallback.to_owned());
        warn!(%message, "service rejected trigger");
        self.notify(Notice::error(message.clone()));
        CoreError::Rejected { message }
    }
}

/// Render an optional score the way notices show it.
pub(crate) fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "n/a".to_owned(), |s| s.to_string())
}
