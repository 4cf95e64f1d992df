//! The chain-data-source capability consumed by the watcher.
//!
//! [`LogSource`] is the seam between the watcher and whatever supplies raw
//! logs: an RPC node (see [`RpcLogSource`]), or an in-memory fake in tests.
//! The watcher shares one source read-only across every cursor and session it
//! hands out; implementations must tolerate concurrent calls.
//!
//! A live subscription is represented by a [`LogFeed`]: a raw-log channel and
//! an error channel. Dropping the feed is the unsubscribe — implementations
//! observe their senders closing and release the upstream subscription.

use std::{ops::RangeInclusive, sync::Arc};

use alloy::{
    primitives::{Address, B256},
    rpc::types::Log,
    transports::{RpcError, TransportErrorKind},
};
use thiserror::Error;
use tokio::sync::mpsc;

mod rpc;

pub use rpc::RpcLogSource;

/// Errors reported by a [`LogSource`].
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// The underlying RPC transport returned an error.
    #[error("RPC error: {0}")]
    Rpc(Arc<RpcError<TransportErrorKind>>),

    /// The live feed ended (for example, the underlying WebSocket closed).
    #[error("log feed closed")]
    Closed,

    /// The source skipped logs because the consumer lagged too far behind.
    ///
    /// The contained value is the number of skipped logs. Surfaced as an
    /// error rather than absorbed: a gap in the feed means missing events.
    #[error("log feed lagged, {0} logs skipped")]
    Lagged(u64),
}

impl From<RpcError<TransportErrorKind>> for SourceError {
    fn from(error: RpcError<TransportErrorKind>) -> Self {
        SourceError::Rpc(Arc::new(error))
    }
}

/// A compiled address/topic filter, ready to hand to a source.
///
/// Produced by [`EventFilter`](crate::EventFilter) compilation; `topics[0]`
/// holds the event selector when the filter names an event, and positions
/// 1–3 hold OR-sets of candidate words for the event's indexed parameters.
/// `None` in any position is a wildcard.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawLogQuery {
    pub address: Option<Address>,
    pub topics: [Option<Vec<B256>>; 4],
}

impl RawLogQuery {
    /// Whether `log` satisfies this query.
    ///
    /// Sources that filter server-side (RPC nodes) never need this; it is
    /// the reference semantics for sources that filter locally.
    #[must_use]
    pub fn matches(&self, log: &Log) -> bool {
        if let Some(address) = self.address
            && log.inner.address != address
        {
            return false;
        }
        let topics = log.inner.data.topics();
        for (position, constraint) in self.topics.iter().enumerate() {
            if let Some(candidates) = constraint {
                match topics.get(position) {
                    Some(topic) if candidates.contains(topic) => {}
                    _ => return false,
                }
            }
        }
        true
    }
}

/// One live subscription's worth of upstream channels.
///
/// Logs arrive on `logs` in chain order (block number, then log index);
/// source-reported failures arrive on `errors`. Dropping the feed
/// unsubscribes upstream.
#[derive(Debug)]
pub struct LogFeed {
    pub logs: mpsc::Receiver<Log>,
    pub errors: mpsc::Receiver<SourceError>,
}

/// An upstream supplier of raw logs.
///
/// Two capabilities: bounded historical queries and live subscriptions.
/// Both sides of the watcher ([`EventWatcher::open`] and
/// [`EventWatcher::subscribe`]) are generic over this trait.
///
/// [`EventWatcher::open`]: crate::EventWatcher::open
/// [`EventWatcher::subscribe`]: crate::EventWatcher::subscribe
pub trait LogSource: Send + Sync + 'static {
    /// The newest mined block number the source knows about.
    fn latest_block(&self) -> impl Future<Output = Result<u64, SourceError>> + Send;

    /// All mined logs matching `query` within the inclusive block range,
    /// ordered by block number and then log index within a block.
    fn query_logs(
        &self,
        query: &RawLogQuery,
        range: RangeInclusive<u64>,
    ) -> impl Future<Output = Result<Vec<Log>, SourceError>> + Send;

    /// Subscribe to newly appended logs matching `query`.
    fn subscribe_logs(
        &self,
        query: &RawLogQuery,
    ) -> impl Future<Output = Result<LogFeed, SourceError>> + Send;
}
