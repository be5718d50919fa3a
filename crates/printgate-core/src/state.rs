// ── Workflow state ──
//
// The single snapshot every consumer renders from. Only the session
// guard mutates it; each mutation is published whole.

use std::sync::Arc;

use serde::Serialize;

use printgate_api::{DeviceStatus, IdentificationResult, MatchResult, TemplateFlags};

use crate::session::{Session, SessionKind};

/// Identity metadata for the subject being enrolled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrollmentForm {
    pub name: String,
    pub id_number: String,
}

impl EnrollmentForm {
    pub fn new(name: impl Into<String>, id_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_number: id_number.into(),
        }
    }

    /// Both fields hold something other than whitespace.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.id_number.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.name.clear();
        self.id_number.clear();
    }
}

/// Everything the presentation layer can observe.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowState {
    /// The active operation, if any.
    pub session: Option<Session>,
    pub device_status: DeviceStatus,
    /// Manual 1:1 template slots.
    pub templates: TemplateFlags,
    pub form: EnrollmentForm,
    /// A save failed after a complete capture sequence; the form is kept
    /// so it can be retried.
    pub pending_save: bool,
    pub match_result: Option<MatchResult>,
    pub identification_result: Option<IdentificationResult>,
    /// Latest live-preview frame (base64 image data).
    #[serde(skip)]
    pub preview: Option<Arc<str>>,
    pub enrollment_message: Option<String>,
    pub identification_message: Option<String>,
}

impl WorkflowState {
    pub fn session_kind(&self) -> SessionKind {
        self.session.map_or(SessionKind::None, |s| s.kind())
    }

    /// Drop the transient fields tied to a session.
    pub(crate) fn clear_transient(&mut self) {
        self.preview = None;
        self.enrollment_message = None;
        self.identification_message = None;
    }

    pub(crate) fn set_template(&mut self, slot: u8) {
        match slot {
            1 => self.templates.template1 = true,
            2 => self.templates.template2 = true,
            other => tracing::debug!(slot = other, "capture result for unknown template slot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_requires_both_fields() {
        assert!(!EnrollmentForm::default().is_complete());
        assert!(!EnrollmentForm::new("Alice", "  ").is_complete());
        assert!(!EnrollmentForm::new("", "123").is_complete());
        assert!(EnrollmentForm::new("Alice", "123").is_complete());
    }

    #[test]
    fn unknown_slot_leaves_flags_alone() {
        let mut state = WorkflowState::default();
        state.set_template(3);
        assert_eq!(state.templates, TemplateFlags::default());
        state.set_template(2);
        assert!(state.templates.template2);
        assert!(!state.templates.template1);
    }
}
