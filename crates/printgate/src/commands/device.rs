//! Device init, manual capture, and 1:1 match handlers.

use serde::Serialize;
use tabled::Tabled;

use printgate_core::{CaptureMethod, MatchResult, TemplateFlags, Workflow};

use crate::cli::{CaptureArgs, CaptureMethodArg, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::operation::{connect_push, drain_notices, follow, require_ready};
use super::util::{score_label, slot_label};

impl From<CaptureMethodArg> for CaptureMethod {
    fn from(arg: CaptureMethodArg) -> Self {
        match arg {
            CaptureMethodArg::LeftFour => Self::LeftFour,
            CaptureMethodArg::RightFour => Self::RightFour,
            CaptureMethodArg::TwoThumbs => Self::TwoThumbs,
        }
    }
}

// ── Init ─────────────────────────────────────────────────────────────

pub async fn init(workflow: &Workflow, global: &GlobalOpts) -> Result<(), CliError> {
    // Seeds status and checks connectivity; any status is fine to init from.
    workflow.refresh_status().await?;

    let mut notices = workflow.notices();
    workflow.initialize_device().await?;
    drain_notices(&mut notices, global);
    Ok(())
}

// ── Capture ──────────────────────────────────────────────────────────

#[derive(Tabled)]
struct SlotRow {
    #[tabled(rename = "Slot")]
    slot: u8,
    #[tabled(rename = "Template")]
    state: String,
}

#[derive(Debug, Serialize)]
struct CaptureReport {
    slot: u8,
    method: CaptureMethod,
    templates: TemplateFlags,
}

pub async fn capture(
    workflow: &Workflow,
    args: CaptureArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    require_ready(workflow).await?;
    connect_push(workflow).await?;

    let method = CaptureMethod::from(args.method);
    let notices = workflow.notices();
    workflow.create_template(args.slot, method).await?;

    let outcome = follow(workflow, notices, "capturing", global).await?;
    if outcome.failed {
        return Err(outcome.failure("capture failed"));
    }

    let report = CaptureReport {
        slot: args.slot,
        method,
        templates: outcome.state.templates,
    };
    let out = output::render_single(
        &global.output,
        &report,
        |r| {
            let rows = [
                SlotRow {
                    slot: 1,
                    state: slot_label(r.templates.template1).into(),
                },
                SlotRow {
                    slot: 2,
                    state: slot_label(r.templates.template2).into(),
                },
            ];
            output::render_table(&rows)
        },
        |r| r.slot.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Match ────────────────────────────────────────────────────────────

fn match_detail(r: &MatchResult) -> String {
    [
        format!("Matched: {}", if r.matched { "yes" } else { "no" }),
        format!("Score:   {}", score_label(r.score)),
    ]
    .join("\n")
}

pub async fn match_templates(workflow: &Workflow, global: &GlobalOpts) -> Result<(), CliError> {
    // Seeds the template flags the match precondition reads.
    require_ready(workflow).await?;

    let mut notices = workflow.notices();
    let result = workflow.match_templates().await?;
    drain_notices(&mut notices, global);

    let out = output::render_single(&global.output, &result, match_detail, |r| {
        r.matched.to_string()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
