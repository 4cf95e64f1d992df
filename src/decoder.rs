//! Schema-driven event decoding.
//!
//! One [`EventDecoder`] serves every event shape: it is parameterized by the
//! parsed event declaration and drives alloy's dynamic ABI machinery, instead
//! of stamping out a decoder type per event.

use alloy::{
    dyn_abi::{DynSolType, EventExt, Specifier},
    json_abi::Event,
    primitives::B256,
    rpc::types::Log,
};

use crate::{
    error::{DecodeError, InvalidFilter},
    record::{LogRecord, Provenance},
};

/// Decodes raw logs into [`LogRecord`]s against one event declaration.
#[derive(Clone, Debug)]
pub struct EventDecoder {
    event: Event,
    selector: B256,
}

impl EventDecoder {
    /// Builds a decoder from a parsed event declaration, resolving every
    /// parameter type up front so malformed declarations are rejected before
    /// any log is touched.
    pub(crate) fn new(event: Event, signature: &str) -> Result<Self, InvalidFilter> {
        if event.anonymous {
            return Err(InvalidFilter::BadSignature {
                signature: signature.to_owned(),
                reason: "anonymous events carry no selector topic".to_owned(),
            });
        }
        for input in &event.inputs {
            let _: DynSolType = input.resolve().map_err(|e| InvalidFilter::BadSignature {
                signature: signature.to_owned(),
                reason: e.to_string(),
            })?;
        }
        let selector = event.selector();
        Ok(Self { event, selector })
    }

    /// The event's `topics[0]` word.
    #[must_use]
    pub fn selector(&self) -> B256 {
        self.selector
    }

    /// The event's name as declared.
    #[must_use]
    pub fn event_name(&self) -> &str {
        &self.event.name
    }

    /// The declared type of the named indexed parameter, with its topic
    /// position (1-based), or `None` if the event has no such indexed
    /// parameter.
    ///
    /// Type resolution cannot fail here: every parameter was resolved when
    /// the decoder was built.
    pub(crate) fn indexed_param(&self, name: &str) -> Option<(usize, DynSolType)> {
        self.event
            .inputs
            .iter()
            .filter(|input| input.indexed)
            .enumerate()
            .find(|(_, input)| input.name == name)
            .and_then(|(position, input)| Some((position + 1, input.resolve().ok()?)))
    }

    /// Decode one raw log into a complete record.
    ///
    /// # Errors
    ///
    /// * [`DecodeError::MissingProvenance`] - the log is pending and has no
    ///   block number, transaction hash or log index yet.
    /// * [`DecodeError::Abi`] - topics/data are inconsistent with the schema.
    pub fn decode(&self, log: &Log) -> Result<LogRecord, DecodeError> {
        let provenance = Provenance::extract(log)?;

        let decoded = self
            .event
            .decode_log_parts(log.inner.data.topics().iter().copied(), &log.inner.data.data)?;

        let mut indexed = decoded.indexed.into_iter();
        let mut body = decoded.body.into_iter();
        let mut fields = Vec::with_capacity(self.event.inputs.len());
        for (position, input) in self.event.inputs.iter().enumerate() {
            let value = if input.indexed { indexed.next() } else { body.next() }
                .ok_or(DecodeError::FieldCount)?;
            let name = if input.name.is_empty() {
                format!("arg{position}")
            } else {
                input.name.clone()
            };
            fields.push((name, value));
        }

        Ok(LogRecord::new(
            Some(self.event.name.clone()),
            fields,
            log.inner.address,
            provenance,
            log.inner.data.clone(),
        ))
    }
}
