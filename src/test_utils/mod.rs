//! In-memory fakes and assertion macros for exercising the watcher without
//! a node.
//!
//! [`MockLogSource`] implements [`LogSource`] over a fixed historical log set
//! and a scripted live feed, with failure injection for connection, query and
//! mid-subscription errors. An active-feed counter lets tests assert that
//! cancellation releases the upstream subscription.

pub mod macros;

use std::{
    ops::RangeInclusive,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use alloy::{rpc::types::Log, transports::TransportErrorKind};
use tokio::sync::mpsc;

use crate::source::{LogFeed, LogSource, RawLogQuery, SourceError};

/// One scripted step of a mock live feed.
#[derive(Clone, Debug)]
pub enum LiveStep {
    /// Emit this raw log (delivered only if it matches the subscription's
    /// query, the way a real source filters server-side).
    Log(Log),
    /// Report this error on the feed's error channel and end the script.
    Error(SourceError),
    /// Close both feed channels without reporting anything, simulating a
    /// connection that simply went away.
    Disconnect,
}

/// A scriptable in-memory chain data source.
///
/// Cheap to clone; clones share state, so tests can keep a handle around for
/// assertions after the watcher has taken ownership.
#[derive(Clone, Debug, Default)]
pub struct MockLogSource {
    inner: Arc<MockState>,
}

#[derive(Debug, Default)]
struct MockState {
    latest: Mutex<u64>,
    logs: Mutex<Vec<Log>>,
    live: Mutex<Vec<LiveStep>>,
    fail_connect: AtomicBool,
    fail_query: AtomicBool,
    fail_subscribe: AtomicBool,
    active_feeds: AtomicUsize,
}

/// The error value injected by the mock's failure knobs. Exposed so tests
/// can script their own [`LiveStep::Error`] steps.
#[must_use]
pub fn injected_error() -> SourceError {
    TransportErrorKind::custom_str("injected failure").into()
}

impl MockLogSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the latest block number the source reports.
    #[must_use]
    pub fn with_latest(self, latest: u64) -> Self {
        *self.inner.latest.lock().unwrap() = latest;
        self
    }

    /// Adds one mined log to the historical set.
    #[must_use]
    pub fn with_log(self, log: Log) -> Self {
        self.inner.logs.lock().unwrap().push(log);
        self
    }

    /// Adds mined logs to the historical set.
    #[must_use]
    pub fn with_logs(self, logs: impl IntoIterator<Item = Log>) -> Self {
        self.inner.logs.lock().unwrap().extend(logs);
        self
    }

    /// Scripts the live feed served to subscriptions.
    ///
    /// Steps are replayed in order to every subscriber. After the script is
    /// exhausted the feed stays open until the subscriber goes away, unless
    /// the script ended in a [`LiveStep::Disconnect`].
    #[must_use]
    pub fn with_live_script(self, steps: impl IntoIterator<Item = LiveStep>) -> Self {
        self.inner.live.lock().unwrap().extend(steps);
        self
    }

    /// Makes `latest_block` fail, simulating an unreachable source.
    #[must_use]
    pub fn with_connect_failure(self) -> Self {
        self.inner.fail_connect.store(true, Ordering::SeqCst);
        self
    }

    /// Makes `query_logs` fail, simulating a connection lost mid-scan.
    #[must_use]
    pub fn with_query_failure(self) -> Self {
        self.inner.fail_query.store(true, Ordering::SeqCst);
        self
    }

    /// Makes `subscribe_logs` fail, so no feed is ever established.
    #[must_use]
    pub fn with_subscribe_failure(self) -> Self {
        self.inner.fail_subscribe.store(true, Ordering::SeqCst);
        self
    }

    /// Number of live feeds currently held open by subscribers.
    #[must_use]
    pub fn active_feeds(&self) -> usize {
        self.inner.active_feeds.load(Ordering::SeqCst)
    }
}

impl LogSource for MockLogSource {
    async fn latest_block(&self) -> Result<u64, SourceError> {
        if self.inner.fail_connect.load(Ordering::SeqCst) {
            return Err(injected_error());
        }
        Ok(*self.inner.latest.lock().unwrap())
    }

    async fn query_logs(
        &self,
        query: &RawLogQuery,
        range: RangeInclusive<u64>,
    ) -> Result<Vec<Log>, SourceError> {
        if self.inner.fail_query.load(Ordering::SeqCst) {
            return Err(injected_error());
        }
        let mut matching: Vec<Log> = self
            .inner
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| {
                log.block_number.is_some_and(|number| range.contains(&number))
                    && query.matches(log)
            })
            .cloned()
            .collect();
        matching.sort_by_key(|log| (log.block_number.unwrap_or(0), log.log_index.unwrap_or(0)));
        Ok(matching)
    }

    async fn subscribe_logs(&self, query: &RawLogQuery) -> Result<LogFeed, SourceError> {
        if self.inner.fail_subscribe.load(Ordering::SeqCst) {
            return Err(injected_error());
        }

        let script = self.inner.live.lock().unwrap().clone();
        let query = query.clone();
        let state = Arc::clone(&self.inner);

        let (logs_tx, logs_rx) = mpsc::channel(script.len().max(1));
        let (errors_tx, errors_rx) = mpsc::channel(1);

        state.active_feeds.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let mut disconnected = false;
            for step in script {
                match step {
                    LiveStep::Log(log) => {
                        if query.matches(&log) && logs_tx.send(log).await.is_err() {
                            break;
                        }
                    }
                    LiveStep::Error(error) => {
                        _ = errors_tx.send(error).await;
                        break;
                    }
                    LiveStep::Disconnect => {
                        disconnected = true;
                        break;
                    }
                }
            }
            if !disconnected {
                // hold the feed open until the subscriber goes away
                logs_tx.closed().await;
            }
            state.active_feeds.fetch_sub(1, Ordering::SeqCst);
        });

        Ok(LogFeed { logs: logs_rx, errors: errors_rx })
    }
}
