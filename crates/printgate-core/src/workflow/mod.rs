// ── Workflow ──
//
// Full lifecycle of a device-service connection: initial status sync,
// the push channel and its dispatch task, the operation controllers,
// and reactive state/notice streaming for the presentation layer.

mod bridge;
mod controllers;
mod dispatch;

use std::sync::{Arc, PoisonError};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use printgate_api::transport::{TlsMode, TransportConfig};
use printgate_api::{DeviceClient, DeviceStatus, PushHandle, PushMessage, ReconnectConfig};

use crate::config::{ServiceConfig, TlsVerification};
use crate::error::CoreError;
use crate::notice::{Notice, NoticeLevel};
use crate::session::{Operation, SessionGuard, SessionTicket};
use crate::state::{EnrollmentForm, WorkflowState};
use crate::stream::StateStream;

const NOTICE_CHANNEL_SIZE: usize = 256;

// ── ConnectionState ──────────────────────────────────────────────────

/// Push channel state observable by consumers. Never blocks
/// request/response operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Push channel not started (or turned off in config).
    Disabled,
    Connecting,
    Connected,
    /// Lost or refused; the adapter is backing off.
    Reconnecting,
    /// Reconnection budget spent; only synchronous operations work.
    Failed,
}

// ── Workflow ─────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<WorkflowInner>`. Owns the session guard,
/// the device client, and the push channel.
#[derive(Clone)]
pub struct Workflow {
    inner: Arc<WorkflowInner>,
}

struct WorkflowInner {
    config: ServiceConfig,
    client: DeviceClient,
    guard: SessionGuard,
    notice_tx: broadcast::Sender<Notice>,
    connection: watch::Sender<ConnectionState>,
    push: Mutex<Option<PushHandle>>,
    cancel: CancellationToken,
    task_handles: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Workflow {
    /// Create a workflow from configuration. Does NOT contact the service;
    /// call [`start()`](Self::start) to sync status and open the push channel.
    pub fn new(config: ServiceConfig) -> Result<Self, CoreError> {
        let transport = build_transport(&config);
        let client = DeviceClient::new(config.url.clone(), &transport)?;
        let (notice_tx, _) = broadcast::channel(NOTICE_CHANNEL_SIZE);
        let (connection, _) = watch::channel(ConnectionState::Disabled);

        Ok(Self {
            inner: Arc::new(WorkflowInner {
                config,
                client,
                guard: SessionGuard::new(),
                notice_tx,
                connection,
                push: Mutex::new(None),
                cancel: CancellationToken::new(),
                task_handles: std::sync::Mutex::new(Vec::new()),
            }),
        })
    }

    /// Access the service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    /// Access the session guard.
    pub fn guard(&self) -> &SessionGuard {
        &self.inner.guard
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Sync device status and, if enabled, open the push channel.
    ///
    /// A failed status check is not fatal: it leaves the device in
    /// `error` with a notice, and the push channel still starts.
    pub async fn start(&self) -> Result<(), CoreError> {
        if let Err(e) = self.refresh_status().await {
            debug!(error = %e, "initial status check failed");
        }
        self.start_push().await
    }

    /// Open the push channel and its dispatch task, if enabled and not
    /// already running.
    pub async fn start_push(&self) -> Result<(), CoreError> {
        if !self.inner.config.push_enabled {
            debug!("push channel disabled");
            return Ok(());
        }

        let reconnect = ReconnectConfig {
            max_retries: self.inner.config.reconnect_attempts,
            ..ReconnectConfig::default()
        };
        let mut push = self.inner.push.lock().await;
        if push.is_some() {
            return Ok(());
        }
        let handle = PushHandle::spawn(
            &self.inner.config.push_url,
            reconnect,
            self.inner.cancel.child_token(),
        )?;
        let rx = handle.subscribe();
        *push = Some(handle);
        drop(push);
        self.inner.connection.send_replace(ConnectionState::Connecting);

        let wf = self.clone();
        let cancel = self.inner.cancel.clone();
        self.track(tokio::spawn(dispatch_task(wf, rx, cancel)));

        info!(url = %self.inner.config.push_url, "push channel starting");
        Ok(())
    }

    /// Stop background tasks and close the push channel.
    ///
    /// An operation still awaiting a push event stays recorded; it simply
    /// never receives its terminal event.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        // A save already in flight runs to completion.
        let handles: Vec<_> = self.tracked().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }

        if let Some(handle) = self.inner.push.lock().await.take() {
            handle.shutdown();
        }
        self.inner.connection.send_replace(ConnectionState::Disabled);
        debug!("workflow shut down");
    }

    /// Query the device status and seed the template slot flags.
    ///
    /// On failure the status becomes `error` and an error notice is
    /// published.
    pub async fn refresh_status(&self) -> Result<DeviceStatus, CoreError> {
        match self.inner.client.device_status().await {
            Ok(resp) => {
                self.inner.guard.update(|s| {
                    s.device_status = resp.status;
                    s.templates = resp.templates;
                });
                debug!(status = %resp.status, "device status refreshed");
                Ok(resp.status)
            }
            Err(e) => {
                let err = CoreError::from(e);
                warn!(error = %err, "device status check failed");
                self.inner
                    .guard
                    .update(|s| s.device_status = DeviceStatus::Error);
                self.notify(Notice::error(
                    "failed to check device status; is the service running?",
                ));
                Err(err)
            }
        }
    }

    // ── Enrollment form ──────────────────────────────────────────────

    /// Replace the enrollment form. The save request reads whatever the
    /// form holds at the moment the capture sequence finishes.
    pub fn set_form(&self, form: EnrollmentForm) {
        self.inner.guard.update(|s| s.form = form);
    }

    pub fn form(&self) -> EnrollmentForm {
        self.inner.guard.snapshot().form
    }

    // ── State observation ────────────────────────────────────────────

    pub fn snapshot(&self) -> WorkflowState {
        self.inner.guard.snapshot()
    }

    /// Subscribe to workflow state transitions.
    pub fn subscribe(&self) -> StateStream {
        StateStream::new(self.inner.guard.subscribe())
    }

    /// Subscribe to user-facing notices.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notice_tx.subscribe()
    }

    /// Subscribe to push channel state changes.
    pub fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection.subscribe()
    }

    /// Resolve once no session is active, returning that snapshot.
    pub async fn wait_idle(&self) -> WorkflowState {
        let mut rx = self.inner.guard.subscribe();
        match rx.wait_for(|s| s.session.is_none()).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Log and broadcast a notice.
    pub(crate) fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => warn!(message = %notice.message, "notice"),
            NoticeLevel::Warning => info!(message = %notice.message, "notice"),
            NoticeLevel::Info | NoticeLevel::Success => debug!(message = %notice.message, "notice"),
        }
        // Send errors just mean nobody is listening.
        let _ = self.inner.notice_tx.send(notice);
    }

    /// Force-close a push-awaiting session that outlives `session_timeout`.
    ///
    /// A session that has moved on to its save is left to the bridge.
    pub(crate) fn arm_watchdog(&self, ticket: SessionTicket) {
        let Some(timeout) = self.inner.config.session_timeout else {
            return;
        };
        let wf = self.clone();
        let cancel = self.inner.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(timeout) => {
                    if wf.inner.guard.finish_if(ticket, Operation::awaits_push) {
                        error!(ticket = ticket.id(), timeout_secs = timeout.as_secs(), "session timed out");
                        wf.notify(Notice::error("operation timed out"));
                    }
                }
            }
        });
    }

    /// Keep `handle` so that [`shutdown`](Self::shutdown) waits for it.
    pub(crate) fn track(&self, handle: JoinHandle<()>) {
        let mut handles = self.tracked();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    fn tracked(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.inner
            .task_handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_connection(&self, state: ConnectionState) {
        self.inner.connection.send_replace(state);
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Feed push messages to [`Workflow::dispatch`] in arrival order.
async fn dispatch_task(
    wf: Workflow,
    mut rx: broadcast::Receiver<PushMessage>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            msg = rx.recv() => match msg {
                Ok(msg) => wf.dispatch(msg),
                Err(RecvError::Lagged(n)) => {
                    warn!(skipped = n, "push dispatch lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    debug!("push dispatch task exiting");
}

// ── Helpers ──────────────────────────────────────────────────────────

fn build_transport(config: &ServiceConfig) -> TransportConfig {
    TransportConfig {
        tls: match &config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        },
        timeout: config.timeout,
    }
}
