//! `printgate status`: device readiness and template slots.

use serde::Serialize;

use printgate_core::{DeviceStatus, TemplateFlags, Workflow};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::operation::status_label;
use super::util::slot_label;

#[derive(Debug, Serialize)]
struct StatusReport {
    service: String,
    status: DeviceStatus,
    templates: TemplateFlags,
}

fn detail(r: &StatusReport) -> String {
    [
        format!("Service:    {}", r.service),
        format!("Status:     {}", status_label(r.status)),
        format!("Template 1: {}", slot_label(r.templates.template1)),
        format!("Template 2: {}", slot_label(r.templates.template2)),
    ]
    .join("\n")
}

pub async fn handle(workflow: &Workflow, global: &GlobalOpts) -> Result<(), CliError> {
    let status = workflow.refresh_status().await?;
    let report = StatusReport {
        service: workflow.config().url.to_string(),
        status,
        templates: workflow.snapshot().templates,
    };

    let out = output::render_single(&global.output, &report, detail, |r| r.status.to_string());
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_lists_slots() {
        let report = StatusReport {
            service: "http://localhost:3000/".into(),
            status: DeviceStatus::NotInitialized,
            templates: TemplateFlags {
                template1: true,
                template2: false,
            },
        };
        let text = detail(&report);
        assert!(text.contains("Status:     not initialized"));
        assert!(text.contains("Template 1: captured"));
        assert!(text.contains("Template 2: empty"));
    }
}
