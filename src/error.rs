use std::sync::Arc;

use thiserror::Error;

use crate::source::SourceError;

/// Errors emitted by the watcher.
///
/// `WatcherError` values are returned by [`EventWatcherBuilder::connect`],
/// [`EventWatcher::open`] and [`EventWatcher::subscribe`], yielded by
/// [`HistoricalCursor::advance`], and stored as the terminal error of a
/// [`WatchSession`].
///
/// All errors are terminal for the cursor or session they affect. This crate
/// never retries and never swallows an error; retry and resubscribe policy
/// belongs to the caller, because a silent resubscribe can silently skip logs
/// produced during the gap.
///
/// [`EventWatcherBuilder::connect`]: crate::EventWatcherBuilder::connect
/// [`EventWatcher::open`]: crate::EventWatcher::open
/// [`EventWatcher::subscribe`]: crate::EventWatcher::subscribe
/// [`HistoricalCursor::advance`]: crate::HistoricalCursor::advance
/// [`WatchSession`]: crate::WatchSession
#[derive(Error, Debug, Clone)]
pub enum WatcherError {
    /// The chain data source is unreachable, or an established feed was lost.
    #[error("connection error: {0}")]
    Connection(SourceError),

    /// The filter does not agree with the event's declared interface.
    ///
    /// Detected before any upstream call; the failing `open`/`subscribe`
    /// leaves no partial state behind.
    #[error("invalid filter: {0}")]
    InvalidFilter(#[from] InvalidFilter),

    /// A log matched the filter but its payload could not be decoded.
    ///
    /// Fail-stop: the affected cursor or session is closed, since skipping
    /// past an undecodable entry could hide missing events.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The chain data source reported an error mid-subscription.
    #[error("upstream error: {0}")]
    Upstream(SourceError),

    /// A configured block parameter exceeds the latest known block.
    #[error("{0} {1} exceeds the latest block {2}")]
    BlockExceedsLatest(&'static str, u64, u64),

    /// The configured maximum block range is invalid (must be greater than zero).
    #[error("Max block range must be greater than 0")]
    InvalidMaxBlockRange,

    /// The configured stream buffer capacity is invalid (must be greater than zero).
    #[error("Stream buffer capacity must be greater than 0")]
    InvalidBufferCapacity,
}

/// Ways a filter can disagree with the event interface it targets.
///
/// Every variant is caught while compiling an [`EventFilter`]
/// — before the filter is ever sent upstream.
///
/// [`EventFilter`]: crate::EventFilter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidFilter {
    /// The event signature could not be parsed.
    #[error("unparsable event signature {signature:?}: {reason}")]
    BadSignature { signature: String, reason: String },

    /// An indexed constraint names a parameter the event does not index.
    #[error("`{name}` is not an indexed parameter of event `{event}`")]
    UnknownIndexedParam { event: String, name: String },

    /// A candidate value does not match the parameter's declared type.
    #[error("candidate value for indexed parameter `{name}` does not match its declared type `{ty}`")]
    TypeMismatch { name: String, ty: String },

    /// An indexed constraint was supplied without an event signature to
    /// resolve it against.
    #[error("indexed constraints require an event signature")]
    ConstraintWithoutEvent,

    /// An indexed constraint with no candidate values can never match.
    #[error("empty candidate set for indexed parameter `{name}`")]
    EmptyCandidates { name: String },
}

/// Why a raw log could not be turned into a [`LogRecord`].
///
/// [`LogRecord`]: crate::LogRecord
#[derive(Error, Debug, Clone)]
pub enum DecodeError {
    /// The log's topics/data are inconsistent with the event schema.
    #[error("log payload does not match the event schema: {0}")]
    Abi(Arc<alloy::dyn_abi::Error>),

    /// The decoded field count disagrees with the schema's parameter count.
    #[error("decoded field count does not match the event schema")]
    FieldCount,

    /// The raw log is missing a provenance field.
    ///
    /// Records expose decoded fields and provenance together or not at all,
    /// so a pending log (no block number, transaction hash or log index yet)
    /// is rejected rather than surfaced half-filled.
    #[error("log is missing its {0}, refusing to emit a partial record")]
    MissingProvenance(&'static str),
}

impl From<alloy::dyn_abi::Error> for DecodeError {
    fn from(error: alloy::dyn_abi::Error) -> Self {
        DecodeError::Abi(Arc::new(error))
    }
}
