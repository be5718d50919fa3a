// Wire types for the device-control service.
//
// Request bodies, response bodies, and push payloads. Field names follow
// the service's JSON exactly; optional fields default so that a terse
// service reply still deserializes.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ── Device status ───────────────────────────────────────────────────

/// Device readiness as reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceStatus {
    Ready,
    NotInitialized,
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

impl DeviceStatus {
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Which manual template slots already hold a capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFlags {
    #[serde(default)]
    pub template1: bool,
    #[serde(default)]
    pub template2: bool,
}

/// `GET /api/device-status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStatusResponse {
    #[serde(default)]
    pub status: DeviceStatus,
    #[serde(default)]
    pub templates: TemplateFlags,
}

/// `POST /api/init-device`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitResponse {
    #[serde(default)]
    pub message: Option<String>,
}

// ── Capture ─────────────────────────────────────────────────────────

/// Physical capture the scanner performs for a manual template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CaptureMethod {
    LeftFour,
    RightFour,
    TwoThumbs,
}

/// `POST /api/create_template` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureTrigger {
    pub template_no: u8,
    pub capture_type: CaptureMethod,
}

/// Acknowledgment of an asynchronous trigger (`create_template`, `identify`).
///
/// The real outcome arrives later over the push channel; `success = false`
/// here means the service refused to start at all. A missing `success`
/// field counts as a refusal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

// ── Match / identify ────────────────────────────────────────────────

/// Outcome of a 1:1 template comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub matched: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Outcome of a 1:N identification, pushed as `identification_result`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentificationResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id_number: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

// ── Enrollment ──────────────────────────────────────────────────────

/// `POST /api/save_enrollment` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveEnrollment {
    pub name: String,
    #[serde(rename = "idNumber")]
    pub id_number: String,
}

/// `POST /api/save_enrollment` reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedResponse {
    #[serde(default)]
    pub message: Option<String>,
}

// ── Push payloads ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivePreview {
    pub image_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentStep {
    pub step: String,
    #[serde(default)]
    pub message: String,
}

impl EnrollmentStep {
    /// Step name the service sends once every capture of the sequence is done.
    pub const FINISHED: &'static str = "finished";

    pub fn is_finished(&self) -> bool {
        self.step == Self::FINISHED
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureResult {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub template_no: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentificationStep {
    #[serde(default)]
    pub message: String,
}
