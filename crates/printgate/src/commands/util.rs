//! Shared helpers for command handlers.

use std::io::IsTerminal;

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to prompt on, the action needs `--yes`.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.trim_end_matches('?').to_lowercase(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(true)
        .interact()
        .map_err(prompt_err)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// `captured` / `empty` for a template slot flag.
pub fn slot_label(captured: bool) -> &'static str {
    if captured { "captured" } else { "empty" }
}

/// Render an optional score for tables.
pub fn score_label(score: Option<f64>) -> String {
    score.map_or_else(|| "-".into(), |s| s.to_string())
}
