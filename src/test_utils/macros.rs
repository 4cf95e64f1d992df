//! Stream assertion macros.
//!
//! All macros poll the given stream with a timeout (default 5 seconds) so a
//! stalled watcher fails the test instead of hanging it.

/// Pulls the next [`LogRecord`](crate::LogRecord) off a stream, panicking if
/// the stream is closed or produces nothing within the timeout.
///
/// ```ignore
/// let record = next_record!(stream);
/// assert_eq!(record.ordering_key(), (7, 0));
/// ```
#[macro_export]
macro_rules! next_record {
    ($stream:expr) => {
        $crate::next_record!($stream, timeout = 5)
    };
    ($stream:expr, timeout = $secs:expr) => {
        tokio::time::timeout(
            std::time::Duration::from_secs($secs),
            tokio_stream::StreamExt::next(&mut $stream),
        )
        .await
        .expect("timed out waiting for the next record")
        .expect("stream closed while a record was still expected")
    };
}

/// Asserts that the stream is closed: the next poll yields `None` within the
/// timeout.
#[macro_export]
macro_rules! assert_closed {
    ($stream:expr) => {
        $crate::assert_closed!($stream, timeout = 5)
    };
    ($stream:expr, timeout = $secs:expr) => {
        let message = tokio::time::timeout(
            std::time::Duration::from_secs($secs),
            tokio_stream::StreamExt::next(&mut $stream),
        )
        .await
        .expect("timed out waiting for the stream to close");
        assert!(message.is_none(), "Expected a closed stream, got {message:?}");
    };
}

/// Asserts that a `ReceiverStream` has no pending records, handing the
/// stream back for further use.
#[macro_export]
macro_rules! assert_empty {
    ($stream:expr) => {{
        let inner = $stream.into_inner();
        assert!(inner.is_empty(), "Stream should have no pending records");
        tokio_stream::wrappers::ReceiverStream::new(inner)
    }};
}
