// printgate-api: Async Rust client for the fingerprint device-control service

pub mod client;
pub mod error;
pub mod models;
pub mod push;
pub mod transport;

pub use client::DeviceClient;
pub use error::Error;
pub use models::{
    CaptureMethod, CaptureResult, CaptureTrigger, DeviceStatus, DeviceStatusResponse,
    EnrollmentStep, IdentificationResult, IdentificationStep, InitResponse, LivePreview,
    MatchResult, SaveEnrollment, SavedResponse, TemplateFlags, TriggerAck,
};
pub use push::{ConnectionEvent, PushEvent, PushHandle, PushMessage, ReconnectConfig};
