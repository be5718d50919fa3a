//! Session state machine for the printgate fingerprint workflow.
//!
//! This crate sits between the raw device-service client
//! ([`printgate_api`]) and the presentation layer. It reconciles two
//! independent channels (request/response calls and push events) into a
//! single [`WorkflowState`], guaranteeing that only one biometric
//! operation runs at a time and that stale or duplicate push events are
//! ignored.
//!
//! ## Key components
//!
//! - **[`Workflow`]**: Main entry point. Cheaply cloneable (`Arc`-backed).
//!   Owns the device client, the push channel, and the operation
//!   controllers (`initialize_device`, `create_template`,
//!   `match_templates`, `start_enrollment`, `start_identification`,
//!   `retry_save`).
//!
//! - **[`SessionGuard`]**: Single source of truth for the active
//!   [`Session`]. Every transition is one atomic read-check-write,
//!   published whole on a `watch` channel.
//!
//! - **[`StateStream`]**: Subscription handle for state snapshots with
//!   `current()` / `changed()` access, or as a `futures_core::Stream`.
//!
//! - **[`Notice`]**: Leveled, user-facing outcome of every operation and
//!   push connection change, delivered over a broadcast channel.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use printgate_core::{EnrollmentForm, ServiceConfig, Workflow};
//!
//! let workflow = Workflow::new(ServiceConfig::new("http://localhost:3000".parse()?))?;
//! workflow.start().await?;
//!
//! workflow.set_form(EnrollmentForm::new("Alice", "123"));
//! workflow.start_enrollment().await?;
//! let state = workflow.wait_idle().await;
//! ```

pub mod config;
pub mod error;
pub mod notice;
pub mod session;
pub mod state;
pub mod stream;
pub mod workflow;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ServiceConfig, TlsVerification};
pub use error::CoreError;
pub use notice::{Notice, NoticeLevel};
pub use session::{Operation, Session, SessionGuard, SessionKind, SessionTicket};
pub use state::{EnrollmentForm, WorkflowState};
pub use stream::{StateStream, StateWatchStream};
pub use workflow::{ConnectionState, Workflow};

// ── Wire types consumers commonly need ──────────────────────────────
pub use printgate_api::{
    CaptureMethod, DeviceStatus, IdentificationResult, MatchResult, TemplateFlags,
};
