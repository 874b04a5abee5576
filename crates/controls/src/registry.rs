//! OID-keyed decoder registry and the decoded-control sum type.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::Value;

use crate::assured_replication::AssuredReplicationRequestControl;
use crate::intermediate_client::IntermediateClientRequestControl;
use crate::json::{self, EnvelopeBody, FIELD_OID};
use crate::matching_entry_count::{
    MatchingEntryCountRequestControl, MatchingEntryCountResponseControl,
};
use crate::operation_purpose::OperationPurposeRequestControl;
use crate::route_to_backend_set::RouteToBackendSetRequestControl;
use crate::soft_delete::SoftDeletedEntryAccessRequestControl;
use crate::{ControlError, ControlType, RawControl};

/// The result of generic, OID-driven control decoding.
///
/// Controls with no registered decoder come back as
/// [`DecodedControl::Unrecognized`], carrying the untouched raw triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedControl {
    AssuredReplicationRequest(AssuredReplicationRequestControl),
    IntermediateClientRequest(IntermediateClientRequestControl),
    MatchingEntryCountRequest(MatchingEntryCountRequestControl),
    MatchingEntryCountResponse(MatchingEntryCountResponseControl),
    OperationPurposeRequest(OperationPurposeRequestControl),
    RouteToBackendSetRequest(RouteToBackendSetRequestControl),
    SoftDeletedEntryAccessRequest(SoftDeletedEntryAccessRequestControl),
    Unrecognized(RawControl),
}

impl DecodedControl {
    pub fn oid(&self) -> &str {
        match self {
            Self::AssuredReplicationRequest(_) => AssuredReplicationRequestControl::OID,
            Self::IntermediateClientRequest(_) => IntermediateClientRequestControl::OID,
            Self::MatchingEntryCountRequest(_) => MatchingEntryCountRequestControl::OID,
            Self::MatchingEntryCountResponse(_) => MatchingEntryCountResponseControl::OID,
            Self::OperationPurposeRequest(_) => OperationPurposeRequestControl::OID,
            Self::RouteToBackendSetRequest(_) => RouteToBackendSetRequestControl::OID,
            Self::SoftDeletedEntryAccessRequest(_) => SoftDeletedEntryAccessRequestControl::OID,
            Self::Unrecognized(raw) => raw.oid(),
        }
    }

    /// Re-encodes to the generic triple, whichever variant this is.
    pub fn to_control(&self) -> RawControl {
        match self {
            Self::AssuredReplicationRequest(c) => c.to_control(),
            Self::IntermediateClientRequest(c) => c.to_control(),
            Self::MatchingEntryCountRequest(c) => c.to_control(),
            Self::MatchingEntryCountResponse(c) => c.to_control(),
            Self::OperationPurposeRequest(c) => c.to_control(),
            Self::RouteToBackendSetRequest(c) => c.to_control(),
            Self::SoftDeletedEntryAccessRequest(c) => c.to_control(),
            Self::Unrecognized(raw) => raw.clone(),
        }
    }
}

/// Decodes one raw control into the sum type.
pub type BerDecodeFn = fn(&RawControl) -> Result<DecodedControl, ControlError>;
/// Decodes one JSON control representation into the sum type.
pub type JsonDecodeFn = fn(&Value, bool) -> Result<DecodedControl, ControlError>;

#[derive(Clone, Copy)]
struct RegisteredDecoder {
    ber: BerDecodeFn,
    json: JsonDecodeFn,
}

/// Maps OIDs to decode functions. The last registration for an OID wins.
///
/// [`ControlRegistry::global`] exposes a process-wide instance holding the
/// builtin decoders, initialized once and read-only afterwards. Embedders
/// that want different dispatch build their own owned registry instead of
/// mutating the global one.
pub struct ControlRegistry {
    decoders: HashMap<String, RegisteredDecoder>,
}

impl Default for ControlRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ControlRegistry {
    /// A registry with no decoders; everything comes back unrecognized.
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// A registry holding every control type in this crate.
    ///
    /// The intermediate client request and response controls share one
    /// OID; generic dispatch resolves it to the request form, and response
    /// decoding goes through the typed API.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(
            AssuredReplicationRequestControl::OID,
            |raw| {
                AssuredReplicationRequestControl::decode_control(raw)
                    .map(DecodedControl::AssuredReplicationRequest)
            },
            |value, strict| {
                AssuredReplicationRequestControl::from_json(value, strict)
                    .map(DecodedControl::AssuredReplicationRequest)
            },
        );
        registry.register(
            IntermediateClientRequestControl::OID,
            |raw| {
                IntermediateClientRequestControl::decode_control(raw)
                    .map(DecodedControl::IntermediateClientRequest)
            },
            |value, strict| {
                IntermediateClientRequestControl::from_json(value, strict)
                    .map(DecodedControl::IntermediateClientRequest)
            },
        );
        registry.register(
            MatchingEntryCountRequestControl::OID,
            |raw| {
                MatchingEntryCountRequestControl::decode_control(raw)
                    .map(DecodedControl::MatchingEntryCountRequest)
            },
            |value, strict| {
                MatchingEntryCountRequestControl::from_json(value, strict)
                    .map(DecodedControl::MatchingEntryCountRequest)
            },
        );
        registry.register(
            MatchingEntryCountResponseControl::OID,
            |raw| {
                MatchingEntryCountResponseControl::decode_control(raw)
                    .map(DecodedControl::MatchingEntryCountResponse)
            },
            |value, strict| {
                MatchingEntryCountResponseControl::from_json(value, strict)
                    .map(DecodedControl::MatchingEntryCountResponse)
            },
        );
        registry.register(
            OperationPurposeRequestControl::OID,
            |raw| {
                OperationPurposeRequestControl::decode_control(raw)
                    .map(DecodedControl::OperationPurposeRequest)
            },
            |value, strict| {
                OperationPurposeRequestControl::from_json(value, strict)
                    .map(DecodedControl::OperationPurposeRequest)
            },
        );
        registry.register(
            RouteToBackendSetRequestControl::OID,
            |raw| {
                RouteToBackendSetRequestControl::decode_control(raw)
                    .map(DecodedControl::RouteToBackendSetRequest)
            },
            |value, strict| {
                RouteToBackendSetRequestControl::from_json(value, strict)
                    .map(DecodedControl::RouteToBackendSetRequest)
            },
        );
        registry.register(
            SoftDeletedEntryAccessRequestControl::OID,
            |raw| {
                SoftDeletedEntryAccessRequestControl::decode_control(raw)
                    .map(DecodedControl::SoftDeletedEntryAccessRequest)
            },
            |value, strict| {
                SoftDeletedEntryAccessRequestControl::from_json(value, strict)
                    .map(DecodedControl::SoftDeletedEntryAccessRequest)
            },
        );
        registry
    }

    /// The process-wide default registry.
    pub fn global() -> &'static ControlRegistry {
        static GLOBAL: OnceLock<ControlRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ControlRegistry::builtin)
    }

    /// Registers a decoder pair for an OID, replacing any previous entry.
    pub fn register(&mut self, oid: impl Into<String>, ber: BerDecodeFn, json: JsonDecodeFn) {
        self.decoders
            .insert(oid.into(), RegisteredDecoder { ber, json });
    }

    /// Dispatches a raw control by OID.
    pub fn decode(&self, raw: &RawControl) -> Result<DecodedControl, ControlError> {
        match self.decoders.get(raw.oid()) {
            Some(decoder) => (decoder.ber)(raw),
            None => Ok(DecodedControl::Unrecognized(raw.clone())),
        }
    }

    /// Dispatches a JSON control representation by its `oid` field.
    ///
    /// For unregistered OIDs, a `value-base64` body (or no value) yields
    /// [`DecodedControl::Unrecognized`]; a `value-json` body is an error,
    /// since only a registered decoder can interpret it.
    pub fn decode_json(&self, value: &Value, strict: bool) -> Result<DecodedControl, ControlError> {
        let oid = value
            .get(FIELD_OID)
            .and_then(Value::as_str)
            .ok_or_else(|| ControlError::invalid_json("<unknown>", "missing string field `oid`"))?
            .to_string();

        if let Some(decoder) = self.decoders.get(&oid) {
            return (decoder.json)(value, strict);
        }

        let envelope = json::parse_envelope(&oid, value, strict)?;
        match envelope.body {
            EnvelopeBody::Base64(bytes) => Ok(DecodedControl::Unrecognized(RawControl::new(
                oid,
                envelope.criticality,
                Some(bytes),
            ))),
            EnvelopeBody::Absent => Ok(DecodedControl::Unrecognized(RawControl::new(
                oid,
                envelope.criticality,
                None,
            ))),
            EnvelopeBody::Json(_) => Err(ControlError::invalid_json(
                &oid,
                "`value-json` requires a registered decoder for this OID",
            )),
        }
    }
}

/// Decodes a raw control via the global registry.
pub fn decode_control(raw: &RawControl) -> Result<DecodedControl, ControlError> {
    ControlRegistry::global().decode(raw)
}

/// Decodes a JSON control representation via the global registry.
pub fn decode_json_control(value: &Value, strict: bool) -> Result<DecodedControl, ControlError> {
    ControlRegistry::global().decode_json(value, strict)
}

/// The JSON representation of a generic control, with the value carried as
/// `value-base64`.
pub fn control_to_json(raw: &RawControl) -> Value {
    json::raw_to_json(raw)
}

/// Reconstructs the generic triple from a JSON control representation.
///
/// Registered OIDs go through their typed decoder and are re-encoded, so
/// a `value-json` body yields the same octets the BER path produces.
pub fn control_from_json(value: &Value, strict: bool) -> Result<RawControl, ControlError> {
    decode_json_control(value, strict).map(|decoded| decoded.to_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_by_oid() {
        let control = AssuredReplicationRequestControl::default();
        let decoded = decode_control(&control.to_control()).unwrap();
        assert!(matches!(
            decoded,
            DecodedControl::AssuredReplicationRequest(_)
        ));
        assert_eq!(decoded.oid(), AssuredReplicationRequestControl::OID);
    }

    #[test]
    fn unknown_oid_is_unrecognized() {
        let raw = RawControl::new("2.16.840.1.113730.3.4.2", false, None);
        let decoded = decode_control(&raw).unwrap();
        assert_eq!(decoded, DecodedControl::Unrecognized(raw));
    }

    #[test]
    fn idempotent_re_decoding() {
        let control =
            OperationPurposeRequestControl::new(Some("app".into()), None, None, Some("why".into()))
                .unwrap();
        let raw = control.to_control();
        let first = decode_control(&raw).unwrap();
        let second = decode_control(&raw).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = ControlRegistry::builtin();
        registry.register(
            AssuredReplicationRequestControl::OID,
            |raw| Ok(DecodedControl::Unrecognized(raw.clone())),
            |_, _| {
                Err(ControlError::invalid_json(
                    AssuredReplicationRequestControl::OID,
                    "replaced",
                ))
            },
        );
        let raw = AssuredReplicationRequestControl::default().to_control();
        assert!(matches!(
            registry.decode(&raw).unwrap(),
            DecodedControl::Unrecognized(_)
        ));
        // The builtin global registry is unaffected.
        assert!(matches!(
            decode_control(&raw).unwrap(),
            DecodedControl::AssuredReplicationRequest(_)
        ));
    }

    #[test]
    fn empty_registry_decodes_nothing() {
        let registry = ControlRegistry::empty();
        let raw = AssuredReplicationRequestControl::default().to_control();
        assert!(matches!(
            registry.decode(&raw).unwrap(),
            DecodedControl::Unrecognized(_)
        ));
    }

    #[test]
    fn json_dispatch_known_oid() {
        let control = SoftDeletedEntryAccessRequestControl::new(false, true);
        let decoded = decode_json_control(&control.to_json(), true).unwrap();
        assert_eq!(
            decoded,
            DecodedControl::SoftDeletedEntryAccessRequest(control)
        );
    }

    #[test]
    fn json_dispatch_unknown_oid_with_base64() {
        let value = serde_json::json!({
            "oid": "1.2.840.113556.1.4.473",
            "criticality": false,
            "value-base64": "MAA=",
        });
        let decoded = decode_json_control(&value, true).unwrap();
        match decoded {
            DecodedControl::Unrecognized(raw) => {
                assert_eq!(raw.oid(), "1.2.840.113556.1.4.473");
                assert_eq!(raw.value(), Some(&[0x30, 0x00][..]));
            }
            other => panic!("expected unrecognized control, got {other:?}"),
        }
    }

    #[test]
    fn json_dispatch_unknown_oid_with_value_json_fails() {
        let value = serde_json::json!({
            "oid": "1.2.840.113556.1.4.473",
            "criticality": false,
            "value-json": {"sort-key": "cn"},
        });
        assert!(matches!(
            decode_json_control(&value, false).unwrap_err(),
            ControlError::InvalidJson { .. }
        ));
    }

    #[test]
    fn generic_json_roundtrip_reencodes_identical_bytes() {
        let control = AssuredReplicationRequestControl::new(None, None, Some(250), true);
        let raw = control.to_control();

        let rebuilt = control_from_json(&control.to_json(), true).unwrap();
        assert_eq!(rebuilt, raw);

        // The opaque base64 representation reconstructs the same triple.
        let rebuilt = control_from_json(&control_to_json(&raw), true).unwrap();
        assert_eq!(rebuilt, raw);
    }

    #[test]
    fn json_dispatch_propagates_strictness() {
        let control = MatchingEntryCountRequestControl::default();
        let mut value = control.to_json();
        value["value-json"]["max-candidates"] = Value::from(5);
        assert!(decode_json_control(&value, true).is_err());
        let decoded = decode_json_control(&value, false).unwrap();
        assert_eq!(decoded, DecodedControl::MatchingEntryCountRequest(control));
    }
}
