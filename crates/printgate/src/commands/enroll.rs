//! `printgate enroll`: automated capture sequence, then save.

use serde::Serialize;

use printgate_core::{EnrollmentForm, Workflow};

use crate::cli::{EnrollArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::operation::{connect_push, drain_notices, follow, require_ready};
use super::util;

/// Save attempts offered after the automatic one fails.
const MAX_SAVE_RETRIES: u32 = 3;

#[derive(Debug, Serialize)]
struct EnrollReport {
    name: String,
    id_number: String,
    saved: bool,
}

pub async fn handle(workflow: &Workflow, args: EnrollArgs, global: &GlobalOpts) -> Result<(), CliError> {
    require_ready(workflow).await?;
    connect_push(workflow).await?;

    let form = EnrollmentForm::new(args.name.trim(), args.id_number.trim());
    workflow.set_form(form.clone());

    let notices = workflow.notices();
    workflow.start_enrollment().await?;

    let outcome = follow(workflow, notices, "enrolling", global).await?;
    if outcome.state.pending_save {
        retry_failed_save(workflow, global).await?;
    } else if outcome.failed {
        return Err(outcome.failure("enrollment failed"));
    }

    let report = EnrollReport {
        name: form.name,
        id_number: form.id_number,
        saved: true,
    };
    let out = output::render_single(
        &global.output,
        &report,
        |r| format!("Enrolled {} ({})", r.name, r.id_number),
        |r| r.id_number.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

/// The capture sequence completed but the save did not. The form is
/// still held, so offer to re-issue the save.
async fn retry_failed_save(workflow: &Workflow, global: &GlobalOpts) -> Result<(), CliError> {
    let mut last_error = None;
    for attempt in 1..=MAX_SAVE_RETRIES {
        if !util::confirm("Retry saving the enrollment?", global.yes)? {
            break;
        }
        tracing::debug!(attempt, "retrying enrollment save");

        let mut notices = workflow.notices();
        let result = workflow.retry_save().await;
        drain_notices(&mut notices, global);
        match result {
            Ok(()) => return Ok(()),
            Err(e) => last_error = Some(e),
        }
    }

    Err(CliError::OperationFailed {
        message: last_error.map_or_else(
            || "enrollment captured but not saved".into(),
            |e| format!("enrollment captured but not saved: {e}"),
        ),
    })
}
