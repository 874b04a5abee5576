//! Shared JSON plumbing for control representations.
//!
//! The JSON form of every control is the same envelope:
//!
//! ```json
//! {
//!   "oid": "1.3.6.1.4.1.30221.2.5.8",
//!   "control-name": "Assured Replication Request Control",
//!   "criticality": true,
//!   "value-json": { ... }
//! }
//! ```
//!
//! with `value-base64` as the raw fallback for the same octets the BER
//! path produces. Envelope parsing, the strict unknown-field policy, and
//! typed field extraction are shared here; each control module supplies
//! only its own field names and conversions.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{Map, Value};

use crate::ControlError;

pub(crate) const FIELD_OID: &str = "oid";
pub(crate) const FIELD_CONTROL_NAME: &str = "control-name";
pub(crate) const FIELD_CRITICALITY: &str = "criticality";
pub(crate) const FIELD_VALUE_JSON: &str = "value-json";
pub(crate) const FIELD_VALUE_BASE64: &str = "value-base64";

const ENVELOPE_FIELDS: &[&str] = &[
    FIELD_OID,
    FIELD_CONTROL_NAME,
    FIELD_CRITICALITY,
    FIELD_VALUE_JSON,
    FIELD_VALUE_BASE64,
];

/// Builds the envelope with a `value-json` body, or no value at all.
pub(crate) fn envelope(
    oid: &str,
    name: &str,
    criticality: bool,
    value_json: Option<Value>,
) -> Value {
    let mut map = Map::new();
    map.insert(FIELD_OID.into(), Value::String(oid.to_string()));
    map.insert(FIELD_CONTROL_NAME.into(), Value::String(name.to_string()));
    map.insert(FIELD_CRITICALITY.into(), Value::Bool(criticality));
    if let Some(value) = value_json {
        map.insert(FIELD_VALUE_JSON.into(), value);
    }
    Value::Object(map)
}

/// The JSON representation of a generic control. The value rides as
/// `value-base64`, since its structure is opaque at this layer.
pub(crate) fn raw_to_json(raw: &crate::RawControl) -> Value {
    let mut map = Map::new();
    map.insert(FIELD_OID.into(), Value::String(raw.oid().to_string()));
    map.insert(FIELD_CRITICALITY.into(), Value::Bool(raw.criticality()));
    if let Some(value) = raw.value() {
        map.insert(
            FIELD_VALUE_BASE64.into(),
            Value::String(BASE64.encode(value)),
        );
    }
    Value::Object(map)
}

/// The decoded body of a control envelope.
#[derive(Debug)]
pub(crate) enum EnvelopeBody<'a> {
    /// A structured `value-json` object.
    Json(&'a Map<String, Value>),
    /// Raw value octets from `value-base64`.
    Base64(Vec<u8>),
    /// Neither field present. Only valid for controls without a value.
    Absent,
}

#[derive(Debug)]
pub(crate) struct Envelope<'a> {
    pub criticality: bool,
    pub body: EnvelopeBody<'a>,
}

/// Parses and validates the envelope of a control's JSON representation.
///
/// `control-name` is informational: any value (or its absence) is
/// accepted. Exactly one of `value-json` / `value-base64` may appear.
pub(crate) fn parse_envelope<'a>(
    oid: &str,
    value: &'a Value,
    strict: bool,
) -> Result<Envelope<'a>, ControlError> {
    let map = value
        .as_object()
        .ok_or_else(|| ControlError::invalid_json(oid, "control representation must be an object"))?;

    let got_oid = map
        .get(FIELD_OID)
        .and_then(Value::as_str)
        .ok_or_else(|| ControlError::invalid_json(oid, "missing string field `oid`"))?;
    if got_oid != oid {
        return Err(ControlError::invalid_json(
            oid,
            format!("object has oid {got_oid}"),
        ));
    }

    let criticality = map
        .get(FIELD_CRITICALITY)
        .and_then(Value::as_bool)
        .ok_or_else(|| ControlError::invalid_json(oid, "missing boolean field `criticality`"))?;

    if strict {
        for field in map.keys() {
            if !ENVELOPE_FIELDS.contains(&field.as_str()) {
                return Err(ControlError::unknown_json_field(oid, field));
            }
        }
    }

    let body = match (map.get(FIELD_VALUE_JSON), map.get(FIELD_VALUE_BASE64)) {
        (Some(_), Some(_)) => {
            return Err(ControlError::invalid_json(
                oid,
                "both `value-json` and `value-base64` present",
            ));
        }
        (Some(json), None) => {
            let object = json.as_object().ok_or_else(|| {
                ControlError::invalid_json(oid, "`value-json` must be an object")
            })?;
            EnvelopeBody::Json(object)
        }
        (None, Some(b64)) => {
            let text = b64.as_str().ok_or_else(|| {
                ControlError::invalid_json(oid, "`value-base64` must be a string")
            })?;
            let bytes = BASE64
                .decode(text)
                .map_err(|e| ControlError::invalid_json(oid, format!("invalid base64: {e}")))?;
            EnvelopeBody::Base64(bytes)
        }
        (None, None) => EnvelopeBody::Absent,
    };

    Ok(Envelope { criticality, body })
}

/// Typed accessors over one `value-json` object (or any nested object),
/// attributing failures to the owning control's OID.
pub(crate) struct FieldMap<'a> {
    oid: &'a str,
    map: &'a Map<String, Value>,
}

impl<'a> FieldMap<'a> {
    pub fn new(oid: &'a str, map: &'a Map<String, Value>) -> Self {
        Self { oid, map }
    }

    /// Strict-mode unknown-field rejection for this nesting level.
    pub fn reject_unknown(&self, allowed: &[&str], strict: bool) -> Result<(), ControlError> {
        if !strict {
            return Ok(());
        }
        for field in self.map.keys() {
            if !allowed.contains(&field.as_str()) {
                return Err(ControlError::unknown_json_field(self.oid, field));
            }
        }
        Ok(())
    }

    fn wrong_type(&self, field: &'static str, expected: &str) -> ControlError {
        ControlError::invalid_json(self.oid, format!("field `{field}` must be {expected}"))
    }

    pub fn str_field(&self, field: &'static str) -> Result<Option<&'a str>, ControlError> {
        match self.map.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(self.wrong_type(field, "a string")),
        }
    }

    pub fn bool_field(&self, field: &'static str) -> Result<Option<bool>, ControlError> {
        match self.map.get(field) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(self.wrong_type(field, "a boolean")),
        }
    }

    pub fn u64_field(&self, field: &'static str) -> Result<Option<u64>, ControlError> {
        match self.map.get(field) {
            None => Ok(None),
            Some(Value::Number(n)) => match n.as_u64() {
                Some(v) => Ok(Some(v)),
                None => Err(ControlError::out_of_range(
                    self.oid,
                    field,
                    n.as_i64().unwrap_or(i64::MIN),
                )),
            },
            Some(_) => Err(self.wrong_type(field, "a number")),
        }
    }

    pub fn object_field(
        &self,
        field: &'static str,
    ) -> Result<Option<&'a Map<String, Value>>, ControlError> {
        match self.map.get(field) {
            None => Ok(None),
            Some(Value::Object(o)) => Ok(Some(o)),
            Some(_) => Err(self.wrong_type(field, "an object")),
        }
    }

    pub fn string_array_field(
        &self,
        field: &'static str,
    ) -> Result<Option<Vec<String>>, ControlError> {
        match self.map.get(field) {
            None => Ok(None),
            Some(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => out.push(s.clone()),
                        _ => return Err(self.wrong_type(field, "an array of strings")),
                    }
                }
                Ok(Some(out))
            }
            Some(_) => Err(self.wrong_type(field, "an array of strings")),
        }
    }

    pub fn require<T>(
        &self,
        field: &'static str,
        value: Option<T>,
    ) -> Result<T, ControlError> {
        value.ok_or_else(|| ControlError::missing_field(self.oid, field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_roundtrip() {
        let value = envelope("1.2.3", "Test Control", true, Some(json!({"a": 1})));
        let parsed = parse_envelope("1.2.3", &value, true).unwrap();
        assert!(parsed.criticality);
        assert!(matches!(parsed.body, EnvelopeBody::Json(_)));
    }

    #[test]
    fn envelope_rejects_both_value_forms() {
        let value = json!({
            "oid": "1.2.3",
            "criticality": false,
            "value-json": {},
            "value-base64": "AA==",
        });
        let err = parse_envelope("1.2.3", &value, false).unwrap_err();
        assert!(matches!(err, ControlError::InvalidJson { .. }));
    }

    #[test]
    fn envelope_rejects_oid_mismatch() {
        let value = envelope("1.2.4", "Test", false, None);
        assert!(parse_envelope("1.2.3", &value, false).is_err());
    }

    #[test]
    fn envelope_strict_rejects_extra_top_level_field() {
        let value = json!({
            "oid": "1.2.3",
            "criticality": false,
            "extra": 1,
        });
        let err = parse_envelope("1.2.3", &value, true).unwrap_err();
        assert_eq!(
            err,
            ControlError::unknown_json_field("1.2.3", "extra")
        );
        assert!(parse_envelope("1.2.3", &value, false).is_ok());
    }

    #[test]
    fn envelope_control_name_is_not_validated() {
        let value = json!({
            "oid": "1.2.3",
            "control-name": "completely different name",
            "criticality": true,
        });
        assert!(parse_envelope("1.2.3", &value, true).is_ok());
    }

    #[test]
    fn raw_control_base64_body_decodes() {
        let raw = crate::RawControl::new("1.2.3", false, Some(vec![0x30, 0x00]));
        let value = raw_to_json(&raw);
        let parsed = parse_envelope("1.2.3", &value, true).unwrap();
        match parsed.body {
            EnvelopeBody::Base64(bytes) => assert_eq!(bytes, vec![0x30, 0x00]),
            _ => panic!("expected base64 body"),
        }
    }

    #[test]
    fn raw_control_without_value_omits_both_value_fields() {
        let raw = crate::RawControl::new("1.2.3", true, None);
        let value = raw_to_json(&raw);
        let map = value.as_object().unwrap();
        assert_eq!(map.len(), 2);
        let parsed = parse_envelope("1.2.3", &value, true).unwrap();
        assert!(matches!(parsed.body, EnvelopeBody::Absent));
    }

    #[test]
    fn field_map_type_errors() {
        let value = json!({"name": 42});
        let map = value.as_object().unwrap();
        let fields = FieldMap::new("1.2.3", map);
        assert!(fields.str_field("name").is_err());
        assert_eq!(fields.str_field("missing").unwrap(), None);
    }

    #[test]
    fn field_map_negative_number_is_out_of_range() {
        let value = json!({"max": -1});
        let map = value.as_object().unwrap();
        let fields = FieldMap::new("1.2.3", map);
        let err = fields.u64_field("max").unwrap_err();
        assert!(matches!(err, ControlError::ValueOutOfRange { value: -1, .. }));
    }
}
