//! Session guard: the single source of truth for which biometric
//! operation is running.
//!
//! At most one session is live at a time. Every transition runs as one
//! locked read-check-write on [`WorkflowState`] and the resulting snapshot
//! is published on a `watch` channel, so observers never see a torn
//! update and push handlers always judge events against the session that
//! is active *now*.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use strum::Display;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::state::WorkflowState;

/// Coarse kind of the active operation, as push events are routed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionKind {
    None,
    Capturing,
    Enrolling,
    Identifying,
}

/// The concrete operation a session was opened for.
///
/// Several operations share a [`SessionKind`]; the operation decides
/// which transient state is cleared on `begin` and which push events the
/// session answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    /// Device initialization (request/response only).
    Init,
    /// Manual template capture, resolved by `capture_result`.
    Capture,
    /// 1:1 match of the two manual templates (request/response only).
    Match,
    /// Automated multi-step enrollment.
    Enroll,
    /// Persisting a completed enrollment (first attempt or retry).
    Save,
    /// 1:N identification.
    Identify,
}

impl Operation {
    pub fn kind(self) -> SessionKind {
        match self {
            Self::Init | Self::Capture | Self::Match => SessionKind::Capturing,
            Self::Enroll | Self::Save => SessionKind::Enrolling,
            Self::Identify => SessionKind::Identifying,
        }
    }

    /// Whether the operation finishes only on a push event (and so is
    /// subject to the session watchdog).
    pub fn awaits_push(self) -> bool {
        matches!(self, Self::Capture | Self::Enroll | Self::Identify)
    }
}

/// Identifies one begun session. Stale tickets never close a newer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionTicket(u64);

impl SessionTicket {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// The live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Session {
    pub operation: Operation,
    pub ticket: SessionTicket,
}

impl Session {
    pub fn kind(self) -> SessionKind {
        self.operation.kind()
    }
}

// ── SessionGuard ─────────────────────────────────────────────────────

/// Owner of [`WorkflowState`].
///
/// The mutex is never held across an `.await`; every method locks,
/// mutates, publishes, and releases.
pub struct SessionGuard {
    state: Mutex<WorkflowState>,
    tx: watch::Sender<WorkflowState>,
    next_ticket: AtomicU64,
}

impl Default for SessionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGuard {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(WorkflowState::default());
        Self {
            state: Mutex::new(WorkflowState::default()),
            tx,
            next_ticket: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WorkflowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &WorkflowState) {
        self.tx.send_replace(state.clone());
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Open a session for `op`.
    ///
    /// Fails with [`CoreError::Busy`] if any session is active. On success
    /// clears the preview, both progress messages, and whatever results
    /// the new operation supersedes.
    pub fn begin(&self, op: Operation) -> Result<SessionTicket, CoreError> {
        let mut state = self.lock();
        if let Some(active) = state.session {
            debug!(requested = %op, active = %active.operation, "session busy");
            return Err(CoreError::Busy {
                active: active.kind(),
            });
        }

        let ticket = SessionTicket(self.next_ticket.fetch_add(1, Ordering::Relaxed));
        state.session = Some(Session {
            operation: op,
            ticket,
        });
        state.clear_transient();
        match op {
            Operation::Capture | Operation::Identify => {
                state.match_result = None;
                state.identification_result = None;
            }
            Operation::Match => state.identification_result = None,
            Operation::Enroll => {
                state.match_result = None;
                state.identification_result = None;
                state.templates = printgate_api::TemplateFlags::default();
                state.pending_save = false;
            }
            Operation::Init | Operation::Save => {}
        }

        info!(operation = %op, ticket = ticket.id(), "session started");
        self.publish(&state);
        Ok(ticket)
    }

    /// Unconditionally close whatever session is active.
    ///
    /// Returns the session that was closed, if any.
    pub fn end(&self) -> Option<Session> {
        self.end_with(|_| ())
    }

    /// Close the active session and apply `f` in the same transition.
    pub fn end_with(&self, f: impl FnOnce(&mut WorkflowState)) -> Option<Session> {
        let mut state = self.lock();
        let ended = state.session.take();
        state.clear_transient();
        f(&mut state);
        if let Some(session) = ended {
            info!(operation = %session.operation, ticket = session.ticket.id(), "session ended");
        }
        self.publish(&state);
        ended
    }

    /// Close the session only if its operation satisfies `accept`, applying
    /// `f` in the same transition.
    ///
    /// Terminal push events go through here so that a duplicate or stale
    /// terminal event finds no matching session and changes nothing.
    pub fn end_if(
        &self,
        accept: impl FnOnce(Operation) -> bool,
        f: impl FnOnce(&mut WorkflowState),
    ) -> Option<Session> {
        let mut state = self.lock();
        let session = state.session.filter(|s| accept(s.operation))?;
        state.session = None;
        state.clear_transient();
        f(&mut state);
        info!(operation = %session.operation, ticket = session.ticket.id(), "session ended");
        self.publish(&state);
        Some(session)
    }

    /// Close the session only if `ticket` still names it.
    ///
    /// Returns `false` when the session already ended (or a newer one
    /// started), in which case nothing changes.
    pub fn finish(&self, ticket: SessionTicket) -> bool {
        self.finish_with(ticket, |_| ())
    }

    /// [`finish`](Self::finish) plus `f` applied in the same transition.
    pub fn finish_with(&self, ticket: SessionTicket, f: impl FnOnce(&mut WorkflowState)) -> bool {
        let mut state = self.lock();
        match state.session {
            Some(session) if session.ticket == ticket => {
                state.session = None;
                state.clear_transient();
                f(&mut state);
                info!(operation = %session.operation, ticket = ticket.id(), "session finished");
                self.publish(&state);
                true
            }
            _ => {
                debug!(ticket = ticket.id(), "stale session ticket ignored");
                false
            }
        }
    }

    /// Close the session only if `ticket` still names it and its current
    /// operation satisfies `accept`.
    ///
    /// An enrollment promoted to its save keeps its ticket, so a ticket
    /// match alone does not say the session is still waiting on the device.
    pub fn finish_if(
        &self,
        ticket: SessionTicket,
        accept: impl FnOnce(Operation) -> bool,
    ) -> bool {
        let mut state = self.lock();
        match state.session {
            Some(session) if session.ticket == ticket && accept(session.operation) => {
                state.session = None;
                state.clear_transient();
                info!(operation = %session.operation, ticket = ticket.id(), "session finished");
                self.publish(&state);
                true
            }
            _ => false,
        }
    }

    /// Apply `f` only while no session is active.
    pub fn update_idle(&self, f: impl FnOnce(&mut WorkflowState)) -> bool {
        let mut state = self.lock();
        if state.session.is_some() {
            return false;
        }
        f(&mut state);
        self.publish(&state);
        true
    }

    /// Apply `f` only if the active session's operation satisfies `accept`.
    ///
    /// This is the gate every push handler goes through: an event for an
    /// operation that is not running is dropped without touching state.
    pub fn update_if<R>(
        &self,
        accept: impl FnOnce(Operation) -> bool,
        f: impl FnOnce(&mut WorkflowState, Session) -> R,
    ) -> Option<R> {
        let mut state = self.lock();
        let session = state.session.filter(|s| accept(s.operation))?;
        let out = f(&mut state, session);
        self.publish(&state);
        Some(out)
    }

    /// Apply `f` regardless of session state.
    pub fn update<R>(&self, f: impl FnOnce(&mut WorkflowState) -> R) -> R {
        let mut state = self.lock();
        let out = f(&mut state);
        self.publish(&state);
        out
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_active(&self, kind: SessionKind) -> bool {
        self.lock().session_kind() == kind
    }

    pub fn active(&self) -> Option<Session> {
        self.lock().session
    }

    pub fn snapshot(&self) -> WorkflowState {
        self.lock().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.tx.subscribe()
    }
}
