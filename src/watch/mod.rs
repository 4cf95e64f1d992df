//! Live watch sessions.
//!
//! A [`WatchSession`] is the handle for one push-based subscription: created
//! by [`EventWatcher::subscribe`], backed by a dedicated background task that
//! owns the upstream feed, decodes each raw log, and forwards records to the
//! consumer's [`LogSink`].
//!
//! [`EventWatcher::subscribe`]: crate::EventWatcher::subscribe

mod sink;
mod task;

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub use sink::{CallbackSink, LogSink, SinkClosed};

use crate::{error::WatcherError, filter::CompiledFilter, source::LogSource};

/// Why a session reached its terminal state.
#[derive(Clone, Debug)]
pub enum CloseReason {
    /// The caller cancelled the session (or dropped its handle or sink).
    CallerCancelled,
    /// The upstream source failed or the connection was lost.
    UpstreamError(WatcherError),
    /// A matching log could not be decoded against the event schema.
    DecodeError(WatcherError),
}

impl CloseReason {
    /// The terminal error, if the session ended in one.
    #[must_use]
    pub fn error(&self) -> Option<&WatcherError> {
        match self {
            CloseReason::CallerCancelled => None,
            CloseReason::UpstreamError(error) | CloseReason::DecodeError(error) => Some(error),
        }
    }
}

/// Lifecycle state of a [`WatchSession`].
///
/// `Open → Closed(reason)`, one-way: a closed session never reopens, and no
/// record is delivered after the terminal state is published.
#[derive(Clone, Debug)]
pub enum SessionState {
    Open,
    Closed(CloseReason),
}

impl SessionState {
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, SessionState::Open)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }
}

/// Handle for one active subscription.
///
/// The caller interacts with the background task only through this handle:
/// [`cancel`](WatchSession::cancel) to end the session,
/// [`closed`](WatchSession::closed) to wait for the terminal state, and the
/// state queries to inspect it afterwards. Dropping the handle cancels the
/// session.
///
/// Cancellation is cooperative: the task observes the signal at its next
/// wait point (log arrival, error arrival, or the signal itself) and then
/// unwinds, releasing the upstream subscription. An in-flight decode
/// completes or fails before the task exits.
#[derive(Debug)]
pub struct WatchSession {
    cancel: CancellationToken,
    state_tx: Arc<watch::Sender<SessionState>>,
    state_rx: watch::Receiver<SessionState>,
}

impl WatchSession {
    pub(crate) fn spawn<S: LogSource, K: LogSink>(
        source: Arc<S>,
        compiled: CompiledFilter,
        sink: K,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(SessionState::Open);
        let state_tx = Arc::new(state_tx);

        tokio::spawn(task::run_session(
            source,
            compiled.query,
            compiled.decoder,
            sink,
            cancel.clone(),
            Arc::clone(&state_tx),
        ));

        Self { cancel, state_tx, state_rx }
    }

    /// Ask the background task to stop. Idempotent; a no-op on a session
    /// that is already closed.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A snapshot of the session's current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state_rx.borrow().is_closed()
    }

    /// Why the session closed, or `None` while it is still open.
    #[must_use]
    pub fn close_reason(&self) -> Option<CloseReason> {
        match &*self.state_rx.borrow() {
            SessionState::Open => None,
            SessionState::Closed(reason) => Some(reason.clone()),
        }
    }

    /// The terminal error, retrievable after termination. `None` while open
    /// or when the session was cancelled rather than failed.
    #[must_use]
    pub fn terminal_error(&self) -> Option<WatcherError> {
        self.close_reason().and_then(|reason| reason.error().cloned())
    }

    /// Wait until the session reaches its terminal state.
    pub async fn closed(&self) -> CloseReason {
        let mut rx = self.state_tx.subscribe();
        if let Ok(state) = rx.wait_for(SessionState::is_closed).await
            && let SessionState::Closed(reason) = &*state
        {
            return reason.clone();
        }
        // the task publishes a terminal state before releasing the channel,
        // and the handle itself keeps the channel alive
        self.close_reason().unwrap_or(CloseReason::CallerCancelled)
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
