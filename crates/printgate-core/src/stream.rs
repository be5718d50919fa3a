// ── Reactive state stream ──
//
// Subscription type for consuming workflow snapshots.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::state::WorkflowState;

/// A subscription to the workflow state.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via [`changed()`](Self::changed) or by converting to a
/// `Stream`.
pub struct StateStream {
    current: WorkflowState,
    receiver: watch::Receiver<WorkflowState>,
}

impl StateStream {
    pub(crate) fn new(receiver: watch::Receiver<WorkflowState>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &WorkflowState {
        &self.current
    }

    /// The latest snapshot (may have changed since creation).
    pub fn latest(&self) -> WorkflowState {
        self.receiver.borrow().clone()
    }

    /// Wait for the next transition, returning the new snapshot.
    /// Returns `None` once the workflow has been dropped.
    pub async fn changed(&mut self) -> Option<WorkflowState> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> StateWatchStream {
        StateWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields the current snapshot first, then one per transition. Rapid
/// transitions may coalesce into the newest snapshot.
pub struct StateWatchStream {
    inner: WatchStream<WorkflowState>,
}

impl Stream for StateWatchStream {
    type Item = WorkflowState;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Operation, SessionGuard, SessionKind};

    #[tokio::test]
    async fn changed_tracks_transitions() {
        let guard = SessionGuard::new();
        let mut stream = StateStream::new(guard.subscribe());
        assert_eq!(stream.current().session_kind(), SessionKind::None);

        guard.begin(Operation::Identify).unwrap();
        let snap = stream.changed().await.unwrap();

        assert_eq!(snap.session_kind(), SessionKind::Identifying);
        assert_eq!(stream.current().session_kind(), SessionKind::Identifying);
        assert_eq!(stream.latest().session_kind(), SessionKind::Identifying);
    }

    #[tokio::test]
    async fn changed_returns_none_after_drop() {
        let guard = SessionGuard::new();
        let mut stream = StateStream::new(guard.subscribe());
        drop(guard);
        assert!(stream.changed().await.is_none());
    }
}
