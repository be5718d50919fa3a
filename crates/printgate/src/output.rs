//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits a single value. Notices
//! go to stderr, colored by level.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use printgate_core::{Notice, NoticeLevel};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// One notice as a single stderr line: `✓ Saved`, `✗ Scanner busy`, ...
pub fn format_notice(notice: &Notice, color: bool) -> String {
    let (mark, text) = match notice.level {
        NoticeLevel::Success => ("✓", notice.message.as_str()),
        NoticeLevel::Info => ("•", notice.message.as_str()),
        NoticeLevel::Warning => ("!", notice.message.as_str()),
        NoticeLevel::Error => ("✗", notice.message.as_str()),
    };
    if !color {
        return format!("{mark} {text}");
    }
    match notice.level {
        NoticeLevel::Success => format!("{} {text}", mark.green().bold()),
        NoticeLevel::Info => format!("{} {text}", mark.cyan()),
        NoticeLevel::Warning => format!("{} {text}", mark.yellow().bold()),
        NoticeLevel::Error => format!("{} {}", mark.red().bold(), text.red()),
    }
}

/// Print a notice to stderr. Errors are shown even in quiet mode.
pub fn print_notice(notice: &Notice, color: bool, quiet: bool) {
    if quiet && notice.level != NoticeLevel::Error {
        return;
    }
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{}", format_notice(notice, color));
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item detail views don't
/// use `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

/// Render rows as a rounded table.
pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\":\"serialization failed: {e}\"}}"))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("error: serialization failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_notices_have_level_marks() {
        assert_eq!(format_notice(&Notice::success("Saved"), false), "✓ Saved");
        assert_eq!(format_notice(&Notice::error("Scanner busy"), false), "✗ Scanner busy");
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_single(
            &OutputFormat::JsonCompact,
            &serde_json::json!({ "status": "ready" }),
            |_| String::new(),
            |_| String::new(),
        );
        assert_eq!(out, r#"{"status":"ready"}"#);
    }
}
