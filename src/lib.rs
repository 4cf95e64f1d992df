//! event-watcher is a library for typed, filterable streaming of EVM event
//! logs.
//!
//! The main entry point is [`EventWatcher`], built via [`EventWatcherBuilder`]
//! over any [`source::LogSource`] (use [`source::RpcLogSource`] for a real
//! node). It offers two ways to consume a log stream described by an
//! [`EventFilter`]:
//!
//! * [`EventWatcher::open`] — a pull-based [`HistoricalCursor`] over
//!   already-mined logs in a block range; call
//!   [`advance`](HistoricalCursor::advance) until exhaustion.
//! * [`EventWatcher::subscribe`] — a push-based [`WatchSession`] that decodes
//!   newly appended logs and forwards them to a [`LogSink`] until cancelled
//!   or the upstream fails.
//!
//! Records are [`LogRecord`]s: the event's named, typed fields decoded
//! against its declared signature, always paired with raw provenance (block
//! number, transaction hash, log index, `removed` flag).
//!
//! # Ordering
//!
//! Each cursor and session preserves upstream order: block number, then log
//! index within a block. Nothing is reordered, deduplicated or dropped.
//!
//! # Reorgs
//!
//! A chain reorganization may retract delivered records. event-watcher
//! surfaces the retraction through [`LogRecord::removed`] and otherwise stays
//! out of the way — consumers own retraction handling, typically keyed by
//! transaction hash and log index.
//!
//! # Failure
//!
//! Errors are terminal for the cursor or session they hit, and fail-stop: a
//! log that cannot be decoded closes its stream rather than being skipped,
//! because skipping silently would hide missing events. There is no retry,
//! reconnect or resubscribe in this crate; a resubscribe that silently skips
//! the gap belongs to the caller's policy, not here. A session's terminal
//! error stays retrievable from its handle via
//! [`WatchSession::terminal_error`].
//!
//! # Backpressure
//!
//! Delivery is awaited. A sink that cannot keep up blocks its session's
//! background task, applying backpressure upstream instead of dropping
//! records; buffer on your own side if you need non-blocking delivery.
//!
//! # Example
//!
//! ```no_run
//! use alloy::providers::{Provider, ProviderBuilder};
//! use event_watcher::{EventFilter, EventWatcherBuilder, source::RpcLogSource};
//! use tokio_stream::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = ProviderBuilder::new().connect("ws://localhost:8545").await?;
//! let source = RpcLogSource::new(provider.root().clone());
//! let watcher = EventWatcherBuilder::new().connect(source).await?;
//!
//! let filter = EventFilter::new()
//!     .contract_address(alloy::primitives::address!(
//!         "0xd8dA6BF26964af9d7eed9e03e53415d37aa96045"
//!     ))
//!     .event("event Transfer(address indexed from, address indexed to, uint256 value)");
//!
//! // Drain history first...
//! let mut cursor = watcher.open(&filter, 0..=1_000_000).await?;
//! while let Some(record) = cursor.advance().await? {
//!     println!("historical transfer at block {}", record.block_number());
//! }
//!
//! // ...then follow new logs live.
//! let (session, mut stream) = watcher.subscribe_stream(&filter)?;
//! while let Some(record) = stream.next().await {
//!     println!("live transfer: {:?}", record.field("value"));
//! }
//! println!("session ended: {:?}", session.close_reason());
//! # Ok(())
//! # }
//! ```

pub mod source;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

mod decoder;
mod error;
mod filter;
mod historical;
mod record;
mod types;
mod watch;
mod watcher;

pub use error::{DecodeError, InvalidFilter, WatcherError};
pub use filter::EventFilter;
pub use historical::HistoricalCursor;
pub use record::LogRecord;
pub use types::{BlockPosition, BlockRange};
pub use watch::{CallbackSink, CloseReason, LogSink, SessionState, SinkClosed, WatchSession};
pub use watcher::{
    DEFAULT_MAX_BLOCK_RANGE, DEFAULT_STREAM_BUFFER_CAPACITY, EventWatcher, EventWatcherBuilder,
};
