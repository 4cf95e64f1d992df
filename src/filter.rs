use std::fmt;

use alloy::{
    dyn_abi::DynSolValue,
    json_abi::Event,
    primitives::{Address, B256, keccak256},
};

use crate::{decoder::EventDecoder, error::InvalidFilter, source::RawLogQuery};

/// Identifies one logical event stream.
///
/// A filter names a contract address, an event signature, and candidate
/// values for the event's indexed parameters — each part optional, each
/// narrowing the stream. Built with chained calls:
///
/// ```rust
/// use alloy::{dyn_abi::DynSolValue, primitives::address};
/// use event_watcher::EventFilter;
///
/// let from = address!("0x00000000000000000000000000000000000000b1");
/// let filter = EventFilter::new()
///     .contract_address(address!("0x00000000000000000000000000000000000000c0"))
///     .event("event Transfer(address indexed from, address indexed to, uint256 value)")
///     .indexed("from", [DynSolValue::Address(from)]);
/// ```
///
/// The signature is accepted with or without the leading `event` keyword.
/// Indexed constraints are keyed by parameter name; multiple candidate
/// values for one parameter match with OR semantics. Repeating
/// `indexed` for the same parameter replaces the earlier candidate set.
///
/// A filter is inert until a cursor is opened or a session subscribed with
/// it. At that point it is compiled: the signature is parsed, every
/// constraint is checked against the declared parameter types, and the
/// upstream topic filter is materialized — all before any upstream call, so
/// an [`InvalidFilter`] never leaves partial state behind.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    address: Option<Address>,
    event: Option<String>,
    indexed: Vec<(String, Vec<DynSolValue>)>,
}

impl EventFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the stream to logs emitted by `address`.
    #[must_use]
    pub fn contract_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// Restrict the stream to one event, given its human-readable signature,
    /// e.g. `"event Transfer(address indexed from, address indexed to, uint256 value)"`.
    ///
    /// Attaching an event also attaches its schema: matching logs are
    /// decoded into named, typed fields. Without an event, records carry
    /// only raw payloads.
    #[must_use]
    pub fn event(mut self, signature: impl Into<String>) -> Self {
        self.event = Some(signature.into());
        self
    }

    /// Constrain the indexed parameter `name` to the given candidate values
    /// (OR semantics). Last call wins per parameter.
    #[must_use]
    pub fn indexed(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = DynSolValue>,
    ) -> Self {
        let name = name.into();
        let values = values.into_iter().collect();
        if let Some(entry) = self.indexed.iter_mut().find(|(existing, _)| *existing == name) {
            entry.1 = values;
        } else {
            self.indexed.push((name, values));
        }
        self
    }

    /// Resolve the filter against its event's declared interface.
    ///
    /// # Errors
    ///
    /// Any [`InvalidFilter`] variant; see its documentation.
    pub(crate) fn compile(&self) -> Result<CompiledFilter, InvalidFilter> {
        let mut query = RawLogQuery { address: self.address, ..Default::default() };

        let Some(signature) = &self.event else {
            // a constraint with nothing to resolve it against cannot be type-checked
            if !self.indexed.is_empty() {
                return Err(InvalidFilter::ConstraintWithoutEvent);
            }
            return Ok(CompiledFilter { query, decoder: None });
        };

        let event = Event::parse(signature).map_err(|e| InvalidFilter::BadSignature {
            signature: signature.clone(),
            reason: e.to_string(),
        })?;
        let decoder = EventDecoder::new(event, signature)?;
        query.topics[0] = Some(vec![decoder.selector()]);

        for (name, values) in &self.indexed {
            let Some((position, ty)) = decoder.indexed_param(name) else {
                return Err(InvalidFilter::UnknownIndexedParam {
                    event: decoder.event_name().to_owned(),
                    name: name.clone(),
                });
            };
            if values.is_empty() {
                return Err(InvalidFilter::EmptyCandidates { name: name.clone() });
            }
            let mut words = Vec::with_capacity(values.len());
            for value in values {
                if !ty.matches(value) {
                    return Err(InvalidFilter::TypeMismatch {
                        name: name.clone(),
                        ty: ty.to_string(),
                    });
                }
                words.push(topic_word(value));
            }
            query.topics[position] = Some(words);
        }

        Ok(CompiledFilter { query, decoder: Some(decoder) })
    }
}

impl fmt::Display for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.event {
            Some(signature) => f.write_str(signature)?,
            None => f.write_str("<any event>")?,
        }
        if let Some(address) = self.address {
            write!(f, " @ {address}")?;
        }
        Ok(())
    }
}

/// A filter resolved into its upstream query plus the decoding schema.
#[derive(Clone, Debug)]
pub(crate) struct CompiledFilter {
    pub query: RawLogQuery,
    pub decoder: Option<EventDecoder>,
}

/// Encode one candidate value the way the chain encodes it as a topic word:
/// value types occupy the word directly, dynamic values are stored hashed.
fn topic_word(value: &DynSolValue) -> B256 {
    match value {
        DynSolValue::String(s) => keccak256(s.as_bytes()),
        DynSolValue::Bytes(bytes) => keccak256(bytes),
        other => match other.as_word() {
            Some(word) => word,
            None => keccak256(other.abi_encode()),
        },
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        primitives::{U256, address},
        sol,
        sol_types::SolEvent,
    };

    use super::*;

    sol! {
        event Transfer(address indexed from, address indexed to, uint256 value);
    }

    const SIGNATURE: &str = "event Transfer(address indexed from, address indexed to, uint256 value)";

    #[test]
    fn empty_filter_compiles_to_a_wildcard_query() {
        let compiled = EventFilter::new().compile().unwrap();

        assert_eq!(compiled.query, RawLogQuery::default());
        assert!(compiled.decoder.is_none());
    }

    #[test]
    fn event_filter_pins_the_selector_topic() {
        let compiled = EventFilter::new().event(SIGNATURE).compile().unwrap();

        assert_eq!(compiled.query.topics[0], Some(vec![Transfer::SIGNATURE_HASH]));
        assert!(compiled.decoder.is_some());
    }

    #[test]
    fn indexed_constraint_lands_on_the_right_topic_position() {
        let from = address!("0x00000000000000000000000000000000000000b1");
        let compiled = EventFilter::new()
            .event(SIGNATURE)
            .indexed("from", [DynSolValue::Address(from)])
            .compile()
            .unwrap();

        assert_eq!(compiled.query.topics[1], Some(vec![from.into_word()]));
        assert_eq!(compiled.query.topics[2], None);
    }

    #[test]
    fn last_indexed_call_wins_per_parameter() {
        let first = address!("0x00000000000000000000000000000000000000b1");
        let second = address!("0x00000000000000000000000000000000000000b2");
        let compiled = EventFilter::new()
            .event(SIGNATURE)
            .indexed("from", [DynSolValue::Address(first)])
            .indexed("from", [DynSolValue::Address(second)])
            .compile()
            .unwrap();

        assert_eq!(compiled.query.topics[1], Some(vec![second.into_word()]));
    }

    #[test]
    fn constraint_without_event_is_rejected() {
        let result = EventFilter::new()
            .indexed("from", [DynSolValue::Bool(true)])
            .compile();

        assert_eq!(result.unwrap_err(), InvalidFilter::ConstraintWithoutEvent);
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let result = EventFilter::new()
            .event(SIGNATURE)
            .indexed("owner", [DynSolValue::Bool(true)])
            .compile();

        assert_eq!(
            result.unwrap_err(),
            InvalidFilter::UnknownIndexedParam { event: "Transfer".into(), name: "owner".into() }
        );
    }

    #[test]
    fn non_indexed_parameter_is_rejected() {
        // `value` is declared, but not indexed
        let result = EventFilter::new()
            .event(SIGNATURE)
            .indexed("value", [DynSolValue::Uint(U256::from(1u64), 256)])
            .compile();

        assert_eq!(
            result.unwrap_err(),
            InvalidFilter::UnknownIndexedParam { event: "Transfer".into(), name: "value".into() }
        );
    }

    #[test]
    fn mistyped_candidate_is_rejected() {
        let result = EventFilter::new()
            .event(SIGNATURE)
            .indexed("from", [DynSolValue::Uint(U256::from(7u64), 256)])
            .compile();

        assert_eq!(
            result.unwrap_err(),
            InvalidFilter::TypeMismatch { name: "from".into(), ty: "address".into() }
        );
    }

    #[test]
    fn empty_candidate_set_is_rejected() {
        let result = EventFilter::new().event(SIGNATURE).indexed("from", []).compile();

        assert_eq!(result.unwrap_err(), InvalidFilter::EmptyCandidates { name: "from".into() });
    }

    #[test]
    fn garbage_signature_is_rejected() {
        let result = EventFilter::new().event("not a signature").compile();

        assert!(matches!(result.unwrap_err(), InvalidFilter::BadSignature { .. }));
    }
}
