use std::{collections::VecDeque, ops::RangeInclusive, sync::Arc};

use alloy::rpc::types::Log;
use tracing::{debug, error, info};

use crate::{
    decoder::EventDecoder,
    error::WatcherError,
    record::{self, LogRecord},
    source::{LogSource, RawLogQuery},
};

/// A pull-based scan over already-mined logs.
///
/// Created by [`EventWatcher::open`]; raw logs are fetched lazily in chunks
/// of at most `max_block_range` blocks, so a large range never materializes
/// at once. Call [`advance`](HistoricalCursor::advance) until it returns
/// `Ok(None)`.
///
/// Failure is fail-stop: the first decode or fetch error closes the cursor,
/// and later `advance` calls return `Ok(None)` without resuming past the bad
/// entry — skipping silently could hide missing events.
///
/// [`EventWatcher::open`]: crate::EventWatcher::open
#[derive(Debug)]
pub struct HistoricalCursor<S: LogSource> {
    source: Arc<S>,
    query: RawLogQuery,
    decoder: Option<EventDecoder>,
    buffered: VecDeque<Log>,
    next_start: u64,
    end: u64,
    max_block_range: u64,
    closed: bool,
}

impl<S: LogSource> HistoricalCursor<S> {
    pub(crate) fn new(
        source: Arc<S>,
        query: RawLogQuery,
        decoder: Option<EventDecoder>,
        range: RangeInclusive<u64>,
        max_block_range: u64,
    ) -> Self {
        debug!(
            from_block = *range.start(),
            to_block = *range.end(),
            max_block_range,
            "Opening historical cursor"
        );
        Self {
            source,
            query,
            decoder,
            buffered: VecDeque::new(),
            next_start: *range.start(),
            end: *range.end(),
            max_block_range,
            closed: false,
        }
    }

    /// The next decoded record, or `Ok(None)` once the range is exhausted
    /// (and on every call after the cursor is closed).
    ///
    /// # Errors
    ///
    /// * [`WatcherError::Connection`] - the source failed while fetching a
    ///   chunk; the cursor is closed.
    /// * [`WatcherError::Decode`] - a matching log could not be decoded; the
    ///   cursor is closed and the remainder of the batch is not delivered.
    pub async fn advance(&mut self) -> Result<Option<LogRecord>, WatcherError> {
        if self.closed {
            return Ok(None);
        }

        loop {
            if let Some(log) = self.buffered.pop_front() {
                let decoded = match &self.decoder {
                    Some(decoder) => decoder.decode(&log),
                    None => record::undecoded(&log),
                };
                return match decoded {
                    Ok(decoded) => Ok(Some(decoded)),
                    Err(e) => {
                        error!(error = %e, "Failed to decode log, closing cursor");
                        self.close();
                        Err(e.into())
                    }
                };
            }

            if self.next_start > self.end {
                info!(to_block = self.end, "Historical scan exhausted");
                self.closed = true;
                return Ok(None);
            }

            let chunk_end =
                self.next_start.saturating_add(self.max_block_range - 1).min(self.end);
            let chunk = self.next_start..=chunk_end;
            match self.source.query_logs(&self.query, chunk.clone()).await {
                Ok(logs) => {
                    if !logs.is_empty() {
                        debug!(
                            log_count = logs.len(),
                            block_range = ?chunk,
                            "Fetched logs for block range"
                        );
                    }
                    self.buffered.extend(logs);
                    self.next_start = chunk_end + 1;
                }
                Err(e) => {
                    error!(error = %e, block_range = ?chunk, "Failed to fetch logs, closing cursor");
                    self.close();
                    return Err(WatcherError::Connection(e));
                }
            }
        }
    }

    /// Release buffered logs and mark the cursor closed.
    ///
    /// Idempotent; safe to call after exhaustion or an error.
    pub fn close(&mut self) {
        self.closed = true;
        self.buffered.clear();
    }

    /// Whether the cursor has been exhausted, failed, or explicitly closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
