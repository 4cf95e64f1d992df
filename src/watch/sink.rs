use tokio::sync::mpsc;

use crate::record::LogRecord;

/// The consumer side of a watch session walked away: its channel or callback
/// can no longer accept records.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SinkClosed;

/// A consumer of decoded records.
///
/// `deliver` is awaited for every record, in upstream order. A sink that
/// cannot keep up therefore blocks the session's background task — pressure
/// is applied upstream instead of dropping records. Callers wanting
/// non-blocking delivery buffer on their own side.
///
/// Implementations are provided for `mpsc::Sender<LogRecord>` (a bounded
/// channel) and for plain callbacks via [`CallbackSink`].
pub trait LogSink: Send + 'static {
    /// Accept one record. Returning `Err(SinkClosed)` ends the session as if
    /// the caller had cancelled it.
    fn deliver(&mut self, record: LogRecord)
    -> impl Future<Output = Result<(), SinkClosed>> + Send;
}

impl LogSink for mpsc::Sender<LogRecord> {
    fn deliver(
        &mut self,
        record: LogRecord,
    ) -> impl Future<Output = Result<(), SinkClosed>> + Send {
        async move { self.send(record).await.map_err(|_| SinkClosed) }
    }
}

/// Adapts a plain `FnMut(LogRecord)` into a [`LogSink`].
///
/// ```ignore
/// let session = watcher.subscribe(&filter, CallbackSink::new(|record| {
///     println!("{:?}", record.ordering_key());
/// }))?;
/// ```
#[derive(Clone, Debug)]
pub struct CallbackSink<F>(F);

impl<F> CallbackSink<F>
where
    F: FnMut(LogRecord) + Send + 'static,
{
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

impl<F> LogSink for CallbackSink<F>
where
    F: FnMut(LogRecord) + Send + 'static,
{
    fn deliver(
        &mut self,
        record: LogRecord,
    ) -> impl Future<Output = Result<(), SinkClosed>> + Send {
        (self.0)(record);
        std::future::ready(Ok(()))
    }
}
