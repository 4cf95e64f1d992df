use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, LogData},
    rpc::types::Log,
};

use crate::error::DecodeError;

/// One decoded occurrence of an event.
///
/// A record couples the event's typed fields (named, in ABI declaration
/// order) with its raw provenance: emitting address, block number,
/// transaction hash, log index and the `removed` flag. The two halves are
/// always populated together — a log whose provenance is not yet known
/// (a pending log) is rejected at decode time instead of surfaced
/// half-filled. Records are never mutated after creation.
///
/// # Reorgs
///
/// A chain reorganization may retract a previously delivered record. The
/// retraction is surfaced, not hidden: the same log is delivered again with
/// [`removed`](LogRecord::removed) set. Consumers own retraction handling.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    event: Option<String>,
    fields: Vec<(String, DynSolValue)>,
    address: Address,
    block_number: u64,
    transaction_hash: B256,
    log_index: u64,
    removed: bool,
    raw: LogData,
}

impl LogRecord {
    pub(crate) fn new(
        event: Option<String>,
        fields: Vec<(String, DynSolValue)>,
        address: Address,
        provenance: Provenance,
        raw: LogData,
    ) -> Self {
        Self {
            event,
            fields,
            address,
            block_number: provenance.block_number,
            transaction_hash: provenance.transaction_hash,
            log_index: provenance.log_index,
            removed: provenance.removed,
            raw,
        }
    }

    /// The event's name, when the record was decoded against a schema.
    ///
    /// `None` for records produced by an unconstrained (schema-less)
    /// subscription, which carry only the raw payload.
    #[must_use]
    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    /// Decoded fields in ABI declaration order. Empty when no schema was
    /// attached to the filter.
    #[must_use]
    pub fn fields(&self) -> &[(String, DynSolValue)] {
        &self.fields
    }

    /// Look up a decoded field by its parameter name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&DynSolValue> {
        self.fields.iter().find(|(field, _)| field == name).map(|(_, value)| value)
    }

    /// The contract that emitted the log.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    #[must_use]
    pub fn transaction_hash(&self) -> B256 {
        self.transaction_hash
    }

    /// Position of the log within its block.
    #[must_use]
    pub fn log_index(&self) -> u64 {
        self.log_index
    }

    /// Whether the chain has retracted this log in a reorganization.
    #[must_use]
    pub fn removed(&self) -> bool {
        self.removed
    }

    /// The undecoded topics and data, exactly as the source reported them.
    #[must_use]
    pub fn raw(&self) -> &LogData {
        &self.raw
    }

    /// `(block number, log index)` — non-decreasing across a single cursor
    /// or session.
    #[must_use]
    pub fn ordering_key(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

/// Raw provenance of a log, extracted up front so that decode failures and
/// incomplete logs are rejected through the same path.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Provenance {
    pub block_number: u64,
    pub transaction_hash: B256,
    pub log_index: u64,
    pub removed: bool,
}

impl Provenance {
    pub(crate) fn extract(log: &Log) -> Result<Self, DecodeError> {
        let block_number =
            log.block_number.ok_or(DecodeError::MissingProvenance("block number"))?;
        let transaction_hash =
            log.transaction_hash.ok_or(DecodeError::MissingProvenance("transaction hash"))?;
        let log_index = log.log_index.ok_or(DecodeError::MissingProvenance("log index"))?;
        Ok(Self { block_number, transaction_hash, log_index, removed: log.removed })
    }
}

/// Build a record that carries only the raw payload, for subscriptions with
/// no event schema attached.
pub(crate) fn undecoded(log: &Log) -> Result<LogRecord, DecodeError> {
    let provenance = Provenance::extract(log)?;
    Ok(LogRecord::new(None, Vec::new(), log.inner.address, provenance, log.inner.data.clone()))
}
