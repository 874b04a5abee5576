//! Route to backend set request control.
//!
//! Directs an entry-balancing request processor to send an operation to an
//! explicit set of backend sets, either absolutely (only those sets) or as
//! a routing hint (try these first, optionally fall back to others).

use ldapext_ber::{BerElement, BerTag};
use serde_json::{Map, Value};

use crate::codec;
use crate::json::{self, EnvelopeBody, FieldMap};
use crate::{ControlError, ControlType, RawControl};

const TYPE_ABSOLUTE: u8 = 0;
const TYPE_HINT: u8 = 1;

const FIELD_REQUEST_PROCESSOR: &str = "request-processor";
const FIELD_ROUTING_TYPE: &str = "routing-type";
const FIELD_BACKEND_SET_IDS: &str = "backend-set-ids";
const FIELD_FALLBACK_SET_IDS: &str = "fallback-backend-set-ids";

const ROUTING_ABSOLUTE: &str = "absolute";
const ROUTING_HINT: &str = "routing-hint";

/// The routing discriminator and its per-variant fields.
///
/// Absolute routing and routing hints are mutually exclusive shapes of the
/// same control; fallback sets exist only for hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteToBackendSetRequestType {
    AbsoluteRouting {
        backend_set_ids: Vec<String>,
    },
    RoutingHint {
        first_guess_set_ids: Vec<String>,
        fallback_set_ids: Option<Vec<String>>,
    },
}

/// Route to backend set request control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteToBackendSetRequestControl {
    criticality: bool,
    request_processor_id: String,
    request_type: RouteToBackendSetRequestType,
}

impl RouteToBackendSetRequestControl {
    /// Builds an absolute-routing control. The set of backend set IDs must
    /// be non-empty.
    pub fn absolute(
        request_processor_id: impl Into<String>,
        backend_set_ids: Vec<String>,
    ) -> Result<Self, ControlError> {
        let request_processor_id = request_processor_id.into();
        if backend_set_ids.is_empty() {
            return Err(ControlError::conflict(
                Self::OID,
                "absolute routing requires at least one backend set ID",
            ));
        }
        Ok(Self {
            criticality: true,
            request_processor_id,
            request_type: RouteToBackendSetRequestType::AbsoluteRouting { backend_set_ids },
        })
    }

    /// Builds a routing-hint control. The first-guess set must be
    /// non-empty, and the fallback set, when given, must be non-empty too.
    pub fn routing_hint(
        request_processor_id: impl Into<String>,
        first_guess_set_ids: Vec<String>,
        fallback_set_ids: Option<Vec<String>>,
    ) -> Result<Self, ControlError> {
        if first_guess_set_ids.is_empty() {
            return Err(ControlError::conflict(
                Self::OID,
                "a routing hint requires at least one first-guess backend set ID",
            ));
        }
        if matches!(&fallback_set_ids, Some(ids) if ids.is_empty()) {
            return Err(ControlError::conflict(
                Self::OID,
                "a fallback set list must not be empty",
            ));
        }
        Ok(Self {
            criticality: true,
            request_processor_id: request_processor_id.into(),
            request_type: RouteToBackendSetRequestType::RoutingHint {
                first_guess_set_ids,
                fallback_set_ids,
            },
        })
    }

    pub fn with_criticality(mut self, criticality: bool) -> Self {
        self.criticality = criticality;
        self
    }

    pub fn criticality(&self) -> bool {
        self.criticality
    }

    pub fn request_processor_id(&self) -> &str {
        &self.request_processor_id
    }

    pub fn request_type(&self) -> &RouteToBackendSetRequestType {
        &self.request_type
    }

    fn value_elements(&self) -> Vec<BerElement> {
        let mut elements = vec![BerElement::utf8(&self.request_processor_id)];
        match &self.request_type {
            RouteToBackendSetRequestType::AbsoluteRouting { backend_set_ids } => {
                elements.push(BerElement::constructed(
                    BerTag::context_constructed(TYPE_ABSOLUTE),
                    vec![BerElement::set(codec::string_elements(backend_set_ids))],
                ));
            }
            RouteToBackendSetRequestType::RoutingHint {
                first_guess_set_ids,
                fallback_set_ids,
            } => {
                let mut hint =
                    vec![BerElement::set(codec::string_elements(first_guess_set_ids))];
                if let Some(fallback) = fallback_set_ids {
                    hint.push(BerElement::set(codec::string_elements(fallback)));
                }
                elements.push(BerElement::constructed(
                    BerTag::context_constructed(TYPE_HINT),
                    hint,
                ));
            }
        }
        elements
    }

    fn decode_set_ids(element: &BerElement) -> Result<Vec<String>, ControlError> {
        let ids = codec::string_values(Self::OID, element)?;
        if ids.is_empty() {
            return Err(ControlError::invalid_value(
                Self::OID,
                "backend set ID list must not be empty",
            ));
        }
        Ok(ids)
    }

    fn value_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            FIELD_REQUEST_PROCESSOR.into(),
            Value::String(self.request_processor_id.clone()),
        );
        let ids_array = |ids: &[String]| {
            Value::Array(ids.iter().map(|id| Value::String(id.clone())).collect())
        };
        match &self.request_type {
            RouteToBackendSetRequestType::AbsoluteRouting { backend_set_ids } => {
                map.insert(FIELD_ROUTING_TYPE.into(), Value::String(ROUTING_ABSOLUTE.into()));
                map.insert(FIELD_BACKEND_SET_IDS.into(), ids_array(backend_set_ids));
            }
            RouteToBackendSetRequestType::RoutingHint {
                first_guess_set_ids,
                fallback_set_ids,
            } => {
                map.insert(FIELD_ROUTING_TYPE.into(), Value::String(ROUTING_HINT.into()));
                map.insert(FIELD_BACKEND_SET_IDS.into(), ids_array(first_guess_set_ids));
                if let Some(fallback) = fallback_set_ids {
                    map.insert(FIELD_FALLBACK_SET_IDS.into(), ids_array(fallback));
                }
            }
        }
        Value::Object(map)
    }

    fn from_value_json(
        criticality: bool,
        map: &Map<String, Value>,
        strict: bool,
    ) -> Result<Self, ControlError> {
        let fields = FieldMap::new(Self::OID, map);
        fields.reject_unknown(
            &[
                FIELD_REQUEST_PROCESSOR,
                FIELD_ROUTING_TYPE,
                FIELD_BACKEND_SET_IDS,
                FIELD_FALLBACK_SET_IDS,
            ],
            strict,
        )?;

        let processor = fields
            .require(FIELD_REQUEST_PROCESSOR, fields.str_field(FIELD_REQUEST_PROCESSOR)?)?
            .to_string();
        let routing_type =
            fields.require(FIELD_ROUTING_TYPE, fields.str_field(FIELD_ROUTING_TYPE)?)?;
        let set_ids = fields
            .require(FIELD_BACKEND_SET_IDS, fields.string_array_field(FIELD_BACKEND_SET_IDS)?)?;
        let fallback = fields.string_array_field(FIELD_FALLBACK_SET_IDS)?;

        match routing_type {
            ROUTING_ABSOLUTE => {
                // Fallback sets only exist for routing hints; rejected in
                // both strict and non-strict modes.
                if fallback.is_some() {
                    return Err(ControlError::conflict(
                        Self::OID,
                        "absolute routing must not carry fallback backend set IDs",
                    ));
                }
                Self::absolute(processor, set_ids)
            }
            ROUTING_HINT => Self::routing_hint(processor, set_ids, fallback),
            other => Err(ControlError::invalid_json(
                Self::OID,
                format!("unrecognized routing-type `{other}`"),
            )),
        }
        .map(|control| Self {
            criticality,
            ..control
        })
    }
}

impl ControlType for RouteToBackendSetRequestControl {
    const OID: &'static str = "1.3.6.1.4.1.30221.2.5.35";
    const NAME: &'static str = "Route To Backend Set Request Control";

    fn decode_control(raw: &RawControl) -> Result<Self, ControlError> {
        let bytes = codec::require_value(Self::OID, raw)?;
        let children = codec::value_sequence(Self::OID, bytes)?;

        let mut processor = None;
        let mut request_type = None;

        for child in &children {
            if child.tag == BerTag::OCTET_STRING {
                processor = Some(codec::utf8(Self::OID, child)?);
            } else if child.tag.is_context(TYPE_ABSOLUTE) {
                let inner = child.children().map_err(|e| ControlError::ber(Self::OID, e))?;
                match inner.as_slice() {
                    [ids] => {
                        request_type = Some(RouteToBackendSetRequestType::AbsoluteRouting {
                            backend_set_ids: Self::decode_set_ids(ids)?,
                        });
                    }
                    _ => {
                        return Err(ControlError::invalid_value(
                            Self::OID,
                            "absolute routing element must hold exactly one set",
                        ));
                    }
                }
            } else if child.tag.is_context(TYPE_HINT) {
                let inner = child.children().map_err(|e| ControlError::ber(Self::OID, e))?;
                match inner.as_slice() {
                    [first] => {
                        request_type = Some(RouteToBackendSetRequestType::RoutingHint {
                            first_guess_set_ids: Self::decode_set_ids(first)?,
                            fallback_set_ids: None,
                        });
                    }
                    [first, fallback] => {
                        request_type = Some(RouteToBackendSetRequestType::RoutingHint {
                            first_guess_set_ids: Self::decode_set_ids(first)?,
                            fallback_set_ids: Some(Self::decode_set_ids(fallback)?),
                        });
                    }
                    _ => {
                        return Err(ControlError::invalid_value(
                            Self::OID,
                            "routing hint element must hold one or two sets",
                        ));
                    }
                }
            } else {
                return Err(ControlError::unexpected_element(
                    Self::OID,
                    child.tag.identifier_octet(),
                ));
            }
        }

        Ok(Self {
            criticality: raw.criticality(),
            request_processor_id: processor
                .ok_or_else(|| ControlError::missing_field(Self::OID, FIELD_REQUEST_PROCESSOR))?,
            request_type: request_type
                .ok_or_else(|| ControlError::missing_field(Self::OID, FIELD_ROUTING_TYPE))?,
        })
    }

    fn to_control(&self) -> RawControl {
        let value = BerElement::sequence(self.value_elements()).encode();
        RawControl::new(Self::OID, self.criticality, Some(value))
    }

    fn to_json(&self) -> Value {
        json::envelope(Self::OID, Self::NAME, self.criticality, Some(self.value_json()))
    }

    fn from_json(value: &Value, strict: bool) -> Result<Self, ControlError> {
        let envelope = json::parse_envelope(Self::OID, value, strict)?;
        match envelope.body {
            EnvelopeBody::Json(map) => Self::from_value_json(envelope.criticality, map, strict),
            EnvelopeBody::Base64(bytes) => Self::decode_control(&RawControl::new(
                Self::OID,
                envelope.criticality,
                Some(bytes),
            )),
            EnvelopeBody::Absent => Err(ControlError::missing_value(Self::OID)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_roundtrip() {
        let control = RouteToBackendSetRequestControl::absolute(
            "dc_example_dc_com-eb-req-processor",
            vec!["set-a".into(), "set-b".into()],
        )
        .unwrap();
        let raw = control.to_control();
        let decoded = RouteToBackendSetRequestControl::decode_control(&raw).unwrap();
        assert_eq!(decoded, control);
        assert_eq!(decoded.to_control().value(), raw.value());
    }

    #[test]
    fn hint_roundtrip_with_fallback() {
        let control = RouteToBackendSetRequestControl::routing_hint(
            "processor",
            vec!["first".into()],
            Some(vec!["fallback-1".into(), "fallback-2".into()]),
        )
        .unwrap();
        let raw = control.to_control();
        let decoded = RouteToBackendSetRequestControl::decode_control(&raw).unwrap();
        assert_eq!(decoded, control);
    }

    #[test]
    fn construction_rejects_empty_sets() {
        let err = RouteToBackendSetRequestControl::absolute("p", vec![]).unwrap_err();
        assert!(matches!(err, ControlError::Conflict { .. }));
        assert_eq!(err.result_code().int_value(), 89);
        assert!(RouteToBackendSetRequestControl::routing_hint(
            "p",
            vec!["first".into()],
            Some(vec![]),
        )
        .is_err());
    }

    #[test]
    fn decode_rejects_empty_set() {
        let value = BerElement::sequence(vec![
            BerElement::utf8("p"),
            BerElement::constructed(
                BerTag::context_constructed(TYPE_ABSOLUTE),
                vec![BerElement::set(vec![])],
            ),
        ])
        .encode();
        let raw = RawControl::new(RouteToBackendSetRequestControl::OID, true, Some(value));
        assert!(matches!(
            RouteToBackendSetRequestControl::decode_control(&raw).unwrap_err(),
            ControlError::InvalidValue { .. }
        ));
    }

    #[test]
    fn decode_rejects_unknown_discriminator() {
        let value = BerElement::sequence(vec![
            BerElement::utf8("p"),
            BerElement::constructed(
                BerTag::context_constructed(5),
                vec![BerElement::set(vec![BerElement::utf8("x")])],
            ),
        ])
        .encode();
        let raw = RawControl::new(RouteToBackendSetRequestControl::OID, true, Some(value));
        assert!(matches!(
            RouteToBackendSetRequestControl::decode_control(&raw).unwrap_err(),
            ControlError::UnexpectedElement { .. }
        ));
    }

    #[test]
    fn json_roundtrip_absolute() {
        let control = RouteToBackendSetRequestControl::absolute("p", vec!["a".into()]).unwrap();
        let decoded =
            RouteToBackendSetRequestControl::from_json(&control.to_json(), true).unwrap();
        assert_eq!(decoded, control);
    }

    #[test]
    fn json_rejects_absolute_with_fallback_sets() {
        let control = RouteToBackendSetRequestControl::absolute("p", vec!["a".into()]).unwrap();
        let mut value = control.to_json();
        value["value-json"][FIELD_FALLBACK_SET_IDS] =
            serde_json::json!(["sneaky-fallback"]);
        // Rejected even in non-strict mode: this is a field conflict, not
        // an unrecognized field.
        let err = RouteToBackendSetRequestControl::from_json(&value, false).unwrap_err();
        assert!(matches!(err, ControlError::Conflict { .. }));
    }

    #[test]
    fn json_hint_fallback_roundtrip() {
        let control = RouteToBackendSetRequestControl::routing_hint(
            "p",
            vec!["a".into()],
            Some(vec!["b".into()]),
        )
        .unwrap()
        .with_criticality(false);
        let decoded =
            RouteToBackendSetRequestControl::from_json(&control.to_json(), true).unwrap();
        assert_eq!(decoded, control);
    }
}
