use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{CloseReason, SessionState, sink::LogSink};
use crate::{
    decoder::EventDecoder,
    error::WatcherError,
    record,
    source::{LogFeed, LogSource, RawLogQuery, SourceError},
};

/// The background task behind one [`WatchSession`](super::WatchSession).
///
/// Owns the upstream feed exclusively; the session handle interacts with it
/// only through the cancellation token and the state cell. Exits by
/// publishing a terminal state exactly once, then dropping the feed, which
/// releases the upstream subscription.
pub(crate) async fn run_session<S: LogSource, K: LogSink>(
    source: Arc<S>,
    query: RawLogQuery,
    decoder: Option<EventDecoder>,
    mut sink: K,
    cancel: CancellationToken,
    state: Arc<watch::Sender<SessionState>>,
) {
    let close = |reason: CloseReason| {
        // terminal state is one-way; the first close wins
        state.send_if_modified(|current| {
            if current.is_open() {
                *current = SessionState::Closed(reason);
                true
            } else {
                false
            }
        });
    };

    let mut feed = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            info!("Session cancelled before the upstream subscription was established");
            close(CloseReason::CallerCancelled);
            return;
        }
        result = source.subscribe_logs(&query) => match result {
            Ok(feed) => feed,
            Err(e) => {
                error!(error = %e, "Failed to establish upstream subscription");
                close(CloseReason::UpstreamError(WatcherError::Connection(e)));
                return;
            }
        }
    };
    info!("Watch session subscribed");

    let mut upstream_errors_open = true;
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!("Session cancelled by caller");
                close(CloseReason::CallerCancelled);
                break;
            }
            // the logs branch sits above the errors branch so that pending
            // records are drained before a failure terminates the session
            maybe_log = feed.logs.recv() => match maybe_log {
                Some(raw) => {
                    let decoded = match &decoder {
                        Some(decoder) => decoder.decode(&raw),
                        None => record::undecoded(&raw),
                    };
                    let record = match decoded {
                        Ok(record) => record,
                        Err(e) => {
                            error!(error = %e, "Failed to decode log, closing session");
                            close(CloseReason::DecodeError(e.into()));
                            break;
                        }
                    };
                    debug!(
                        block_number = record.block_number(),
                        log_index = record.log_index(),
                        "Delivering record"
                    );
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            info!("Session cancelled while delivering");
                            close(CloseReason::CallerCancelled);
                            break;
                        }
                        delivered = sink.deliver(record) => {
                            if delivered.is_err() {
                                info!("Sink dropped, treating as cancellation");
                                close(CloseReason::CallerCancelled);
                                break;
                            }
                        }
                    }
                }
                None => {
                    close(feed_ended_reason(&mut feed));
                    break;
                }
            },
            maybe_err = feed.errors.recv(), if upstream_errors_open => match maybe_err {
                Some(e) => {
                    error!(error = %e, "Upstream error, closing session");
                    close(CloseReason::UpstreamError(WatcherError::Upstream(e)));
                    break;
                }
                None => upstream_errors_open = false,
            },
        }
    }

    debug!("Watch session task exiting");
    // dropping the feed releases the upstream subscription
}

/// The log channel closed. If the source left an error behind, that error is
/// the terminal cause; otherwise the connection was simply lost.
fn feed_ended_reason(feed: &mut LogFeed) -> CloseReason {
    match feed.errors.try_recv() {
        Ok(e) => CloseReason::UpstreamError(WatcherError::Upstream(e)),
        Err(_) => CloseReason::UpstreamError(WatcherError::Connection(SourceError::Closed)),
    }
}
