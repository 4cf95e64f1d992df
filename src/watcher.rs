use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use crate::{
    error::WatcherError,
    filter::EventFilter,
    historical::HistoricalCursor,
    record::LogRecord,
    source::LogSource,
    types::BlockRange,
    watch::{LogSink, WatchSession},
};

/// Default maximum number of blocks fetched per historical chunk.
pub const DEFAULT_MAX_BLOCK_RANGE: u64 = 1_000;

/// Default capacity of the channel handed out by
/// [`EventWatcher::subscribe_stream`].
pub const DEFAULT_STREAM_BUFFER_CAPACITY: usize = 50_000;

/// Configures and connects an [`EventWatcher`].
///
/// # Example
///
/// ```no_run
/// # use alloy::providers::{Provider, ProviderBuilder};
/// # use event_watcher::{EventWatcherBuilder, source::RpcLogSource};
/// #
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = ProviderBuilder::new().connect("ws://localhost:8545").await?;
/// let source = RpcLogSource::new(provider.root().clone());
///
/// let watcher = EventWatcherBuilder::new()
///     .max_block_range(500)
///     .connect(source)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct EventWatcherBuilder {
    max_block_range: u64,
    buffer_capacity: usize,
}

impl Default for EventWatcherBuilder {
    fn default() -> Self {
        Self {
            max_block_range: DEFAULT_MAX_BLOCK_RANGE,
            buffer_capacity: DEFAULT_STREAM_BUFFER_CAPACITY,
        }
    }
}

impl EventWatcherBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of blocks a historical cursor fetches per
    /// upstream query.
    ///
    /// Controls how a large block range is split into chunks. Each chunk is
    /// one call to the source, so smaller values respect node-provider
    /// limits at the cost of more round trips.
    ///
    /// Must be greater than 0. Defaults to [`DEFAULT_MAX_BLOCK_RANGE`].
    #[must_use]
    pub fn max_block_range(mut self, max_block_range: u64) -> Self {
        self.max_block_range = max_block_range;
        self
    }

    /// Sets the delivery-channel capacity used by
    /// [`EventWatcher::subscribe_stream`].
    ///
    /// Once the channel is full the session's background task blocks,
    /// applying backpressure upstream rather than dropping records.
    ///
    /// Must be greater than 0. Defaults to [`DEFAULT_STREAM_BUFFER_CAPACITY`].
    #[must_use]
    pub fn buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    /// Validates the configuration and connects to the given source.
    ///
    /// The source is pinged once so an unreachable endpoint fails here
    /// rather than on first use.
    ///
    /// # Errors
    ///
    /// * [`WatcherError::InvalidMaxBlockRange`] - the max block range is zero.
    /// * [`WatcherError::InvalidBufferCapacity`] - the buffer capacity is zero.
    /// * [`WatcherError::Connection`] - the source is unreachable.
    pub async fn connect<S: LogSource>(self, source: S) -> Result<EventWatcher<S>, WatcherError> {
        if self.max_block_range == 0 {
            return Err(WatcherError::InvalidMaxBlockRange);
        }
        if self.buffer_capacity == 0 {
            return Err(WatcherError::InvalidBufferCapacity);
        }

        let source = Arc::new(source);
        let latest = source.latest_block().await.map_err(WatcherError::Connection)?;
        info!(latest_block = latest, "Connected to chain data source");

        Ok(EventWatcher {
            source,
            max_block_range: self.max_block_range,
            buffer_capacity: self.buffer_capacity,
        })
    }
}

/// Typed, filterable access to a chain's event logs.
///
/// One watcher shares its [`LogSource`] read-only across any number of
/// simultaneous historical cursors and live sessions; each cursor/session
/// owns its own decode state exclusively.
#[derive(Debug)]
pub struct EventWatcher<S: LogSource> {
    source: Arc<S>,
    max_block_range: u64,
    buffer_capacity: usize,
}

impl<S: LogSource> EventWatcher<S> {
    /// Opens a pull-based cursor over already-mined logs matching `filter`
    /// within `range`.
    ///
    /// Range bounds accept plain block numbers and the
    /// [`Earliest`](crate::BlockPosition::Earliest)/
    /// [`Latest`](crate::BlockPosition::Latest) markers, in either order —
    /// the scan always ascends.
    ///
    /// # Errors
    ///
    /// * [`WatcherError::InvalidFilter`] - the filter disagrees with the
    ///   event's declared interface; detected before any upstream call.
    /// * [`WatcherError::Connection`] - the source is unreachable.
    /// * [`WatcherError::BlockExceedsLatest`] - a range bound lies beyond
    ///   the latest block.
    pub async fn open(
        &self,
        filter: &EventFilter,
        range: impl Into<BlockRange>,
    ) -> Result<HistoricalCursor<S>, WatcherError> {
        let compiled = filter.compile()?;

        let range = range.into();
        let latest = self.source.latest_block().await.map_err(WatcherError::Connection)?;
        let from = range.from.resolve(latest);
        let to = range.to.resolve(latest);
        if from > latest {
            return Err(WatcherError::BlockExceedsLatest("from_block", from, latest));
        }
        if to > latest {
            return Err(WatcherError::BlockExceedsLatest("to_block", to, latest));
        }
        let (from, to) = if from > to { (to, from) } else { (from, to) };

        info!(filter = %filter, from_block = from, to_block = to, "Opening historical cursor");
        Ok(HistoricalCursor::new(
            Arc::clone(&self.source),
            compiled.query,
            compiled.decoder,
            from..=to,
            self.max_block_range,
        ))
    }

    /// Subscribes a live session delivering newly appended matching logs to
    /// `sink`.
    ///
    /// Returns the session handle immediately without blocking; a dedicated
    /// background task establishes the upstream subscription and forwards
    /// records in upstream order until the session is cancelled or the
    /// upstream fails. There is no automatic resubscribe: a session that
    /// lost its upstream stays closed, and the terminal error stays
    /// retrievable from the handle.
    ///
    /// # Errors
    ///
    /// * [`WatcherError::InvalidFilter`] - the filter disagrees with the
    ///   event's declared interface; no session is created.
    pub fn subscribe<K: LogSink>(
        &self,
        filter: &EventFilter,
        sink: K,
    ) -> Result<WatchSession, WatcherError> {
        let compiled = filter.compile()?;
        info!(filter = %filter, "Subscribing watch session");
        Ok(WatchSession::spawn(Arc::clone(&self.source), compiled, sink))
    }

    /// Like [`subscribe`](EventWatcher::subscribe), but builds the delivery
    /// channel itself and returns its receiving half as a stream.
    ///
    /// The channel's capacity is the builder's
    /// [`buffer_capacity`](EventWatcherBuilder::buffer_capacity).
    ///
    /// # Errors
    ///
    /// Same as [`subscribe`](EventWatcher::subscribe).
    pub fn subscribe_stream(
        &self,
        filter: &EventFilter,
    ) -> Result<(WatchSession, ReceiverStream<LogRecord>), WatcherError> {
        let (sender, receiver) = mpsc::channel(self.buffer_capacity);
        let session = self.subscribe(filter, sender)?;
        Ok((session, ReceiverStream::new(receiver)))
    }
}
