// ── Persistence bridge ──
//
// Saves the enrolled subject once the capture sequence is complete.

use tracing::{debug, info, warn};

use super::Workflow;
use crate::error::CoreError;
use crate::notice::Notice;
use crate::session::SessionTicket;
use crate::state::WorkflowState;

const SAVE_FAILED: &str = "failed to save enrollment to the database";

impl Workflow {
    /// Save the form as it stands now and close the enrolling session.
    ///
    /// Success clears the form. Failure keeps it and marks the save as
    /// pending so [`retry_save`](Self::retry_save) can re-issue it.
    pub(crate) async fn persist_enrollment(&self, ticket: SessionTicket) -> Result<(), CoreError> {
        let form = self.inner.guard.snapshot().form;
        self.notify(Notice::info("saving enrollment to the database"));

        match self
            .inner
            .client
            .save_enrollment(&form.name, &form.id_number)
            .await
        {
            Ok(resp) => {
                self.settle(ticket, |s| {
                    s.form.clear();
                    s.pending_save = false;
                });
                info!(name = %form.name, "enrollment saved");
                self.notify(Notice::success(
                    resp.message.unwrap_or_else(|| "enrollment saved".into()),
                ));
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.settle(ticket, |s| s.pending_save = true);
                warn!(error = %err, "enrollment save failed, form kept for retry");
                self.notify(Notice::error(err.user_message(SAVE_FAILED)));
                Err(err)
            }
        }
    }

    /// Close the session for `ticket` and apply `f`.
    ///
    /// If the session was already closed elsewhere, `f` still applies as
    /// long as nothing newer has started; a newer session owns the form.
    fn settle(&self, ticket: SessionTicket, f: impl Fn(&mut WorkflowState)) {
        if self.inner.guard.finish_with(ticket, &f) {
            return;
        }
        if !self.inner.guard.update_idle(&f) {
            debug!(ticket = ticket.id(), "save outcome not applied, a newer session is active");
        }
    }
}
