// ── Push dispatch ──
//
// Routes each push message to the handler for the session it belongs to.
// Handlers judge the event against the session active at dispatch time;
// an event for an operation that is not running is dropped.

use std::sync::Arc;

use tracing::{debug, info, warn};

use printgate_api::{
    CaptureResult, ConnectionEvent, EnrollmentStep, IdentificationResult, IdentificationStep,
    PushEvent, PushMessage,
};

use super::controllers::format_score;
use super::{ConnectionState, Workflow};
use crate::notice::Notice;
use crate::session::{Operation, Session, SessionKind};

const ENROLLMENT_FAILED: &str = "enrollment failed";
const CAPTURE_FAILED: &str = "capture failed";
const IDENTIFICATION_FAILED: &str = "identification failed";

impl Workflow {
    /// Apply one push message. Called by the dispatch task in arrival order.
    pub fn dispatch(&self, msg: PushMessage) {
        match msg {
            PushMessage::Event(event) => self.dispatch_event(event),
            PushMessage::Connection(event) => self.on_connection(event),
        }
    }

    fn dispatch_event(&self, event: PushEvent) {
        let name = event.name();
        let handled = match event {
            PushEvent::LivePreview(preview) => self.on_live_preview(preview.image_data),
            PushEvent::EnrollmentStep(step) => self.on_enrollment_step(step),
            PushEvent::CaptureResult(result) => self.on_capture_result(result),
            PushEvent::IdentificationStep(step) => self.on_identification_step(step),
            PushEvent::IdentificationResult(result) => self.on_identification_result(result),
        };
        if !handled {
            debug!(event = name, active = %self.inner.guard.snapshot().session_kind(), "stale push event dropped");
        }
    }

    // ── Event handlers ───────────────────────────────────────────────

    fn on_live_preview(&self, image_data: String) -> bool {
        let frame: Arc<str> = Arc::from(image_data);
        self.inner
            .guard
            .update_if(|_| true, |s, _| s.preview = Some(frame))
            .is_some()
    }

    fn on_enrollment_step(&self, step: EnrollmentStep) -> bool {
        let finished = step.is_finished();
        let promoted = self.inner.guard.update_if(
            |op| op == Operation::Enroll,
            |s, session| {
                s.enrollment_message = Some(step.message);
                s.identification_message = None;
                if finished {
                    // Captures are done; only the save remains.
                    s.session = Some(Session {
                        operation: Operation::Save,
                        ..session
                    });
                }
                session.ticket
            },
        );

        let Some(ticket) = promoted else {
            return false;
        };
        if finished {
            info!(ticket = ticket.id(), "enrollment captures finished, saving");
            let wf = self.clone();
            self.track(tokio::spawn(async move {
                // Outcome is reported through state and notices.
                let _ = wf.persist_enrollment(ticket).await;
            }));
        } else {
            debug!(step = %step.step, "enrollment progress");
        }
        true
    }

    fn on_capture_result(&self, result: CaptureResult) -> bool {
        let Some(session) = self.inner.guard.active() else {
            return false;
        };

        match session.operation {
            // The enrollment flow continues through `enrollment_step`.
            Operation::Enroll if result.success => true,
            Operation::Enroll => {
                let ended = self
                    .inner
                    .guard
                    .end_if(|op| op == Operation::Enroll, |_| ());
                if ended.is_some() {
                    let message = result.message.unwrap_or_else(|| ENROLLMENT_FAILED.into());
                    warn!(%message, "enrollment capture failed");
                    self.notify(Notice::error(message));
                }
                ended.is_some()
            }
            Operation::Capture => {
                let success = result.success;
                let slot = result.template_no;
                let ended = self.inner.guard.end_if(
                    |op| op == Operation::Capture,
                    |s| {
                        if let (true, Some(slot)) = (success, slot) {
                            s.set_template(slot);
                        }
                    },
                );
                if ended.is_none() {
                    return false;
                }
                if success {
                    info!(slot = ?slot, "manual capture complete");
                    self.notify(Notice::success(
                        result.message.unwrap_or_else(|| "template captured".into()),
                    ));
                } else {
                    warn!(message = ?result.message, "manual capture failed");
                    self.notify(Notice::error(
                        result.message.unwrap_or_else(|| CAPTURE_FAILED.into()),
                    ));
                }
                true
            }
            Operation::Init | Operation::Match | Operation::Save | Operation::Identify => false,
        }
    }

    fn on_identification_step(&self, step: IdentificationStep) -> bool {
        self.inner
            .guard
            .update_if(
                |op| op == Operation::Identify,
                |s, _| {
                    s.identification_message = Some(step.message);
                    s.enrollment_message = None;
                },
            )
            .is_some()
    }

    fn on_identification_result(&self, result: IdentificationResult) -> bool {
        let notice = identification_notice(&result);
        let ended = self.inner.guard.end_if(
            |op| op == Operation::Identify,
            |s| s.identification_result = Some(result),
        );
        if ended.is_none() {
            return false;
        }
        info!(level = %notice.level, "identification finished");
        self.notify(notice);
        true
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    fn on_connection(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected => {
                self.set_connection(ConnectionState::Connected);
                self.notify(Notice::info("connected to push service"));
            }
            ConnectionEvent::Disconnected => {
                self.set_connection(ConnectionState::Reconnecting);
                self.notify(Notice::warning("disconnected from push service"));
            }
            ConnectionEvent::Error(reason) => {
                debug!(%reason, "push connection error");
                self.set_connection(ConnectionState::Reconnecting);
                self.notify(Notice::error("cannot reach push service"));
            }
            ConnectionEvent::GaveUp { attempts } => {
                self.set_connection(ConnectionState::Failed);
                self.notify(Notice::error(format!(
                    "gave up reconnecting to push service after {attempts} attempts"
                )));
                self.abandon_push_sessions();
            }
        }
    }

    /// With the push channel gone for good, a session waiting on a push
    /// event can never finish on its own.
    fn abandon_push_sessions(&self) {
        let ended = self.inner.guard.end_if(Operation::awaits_push, |_| ());
        if let Some(session) = ended {
            warn!(operation = %session.operation, "operation abandoned, push channel unavailable");
            let what = match session.kind() {
                SessionKind::Enrolling => "enrollment",
                SessionKind::Identifying => "identification",
                SessionKind::Capturing | SessionKind::None => "capture",
            };
            self.notify(Notice::error(format!(
                "{what} abandoned: push service unavailable"
            )));
        }
    }
}

fn identification_notice(result: &IdentificationResult) -> Notice {
    if !result.success {
        return Notice::error(
            result
                .message
                .clone()
                .unwrap_or_else(|| IDENTIFICATION_FAILED.into()),
        );
    }
    if result.found {
        Notice::success(format!(
            "identified {} (score {})",
            result.name.as_deref().unwrap_or("unknown"),
            format_score(result.score)
        ))
    } else {
        Notice::info(
            result
                .message
                .clone()
                .unwrap_or_else(|| "fingerprint not found".into()),
        )
    }
}
