//! `printgate identify`: 1:N search against the enrolled database.

use printgate_core::{IdentificationResult, Workflow};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::operation::{connect_push, follow, require_ready};
use super::util::score_label;

fn detail(r: &IdentificationResult) -> String {
    if !r.found {
        return "No match in the database".into();
    }
    [
        format!("Name:      {}", r.name.as_deref().unwrap_or("-")),
        format!("ID number: {}", r.id_number.as_deref().unwrap_or("-")),
        format!("Score:     {}", score_label(r.score)),
    ]
    .join("\n")
}

pub async fn handle(workflow: &Workflow, global: &GlobalOpts) -> Result<(), CliError> {
    require_ready(workflow).await?;
    connect_push(workflow).await?;

    let notices = workflow.notices();
    workflow.start_identification().await?;

    let outcome = follow(workflow, notices, "identifying", global).await?;
    let result = match outcome.state.identification_result {
        Some(ref result) if result.success => result.clone(),
        _ => return Err(outcome.failure("identification failed")),
    };

    let out = output::render_single(&global.output, &result, detail, |r| {
        r.id_number.clone().unwrap_or_default()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_has_short_detail() {
        let result = IdentificationResult {
            success: true,
            ..IdentificationResult::default()
        };
        assert_eq!(detail(&result), "No match in the database");
    }

    #[test]
    fn found_lists_subject() {
        let result = IdentificationResult {
            success: true,
            found: true,
            name: Some("Alice".into()),
            id_number: Some("123".into()),
            score: Some(87.5),
            message: None,
        };
        let text = detail(&result);
        assert!(text.contains("Name:      Alice"));
        assert!(text.contains("ID number: 123"));
        assert!(text.contains("Score:     87.5"));
    }
}
