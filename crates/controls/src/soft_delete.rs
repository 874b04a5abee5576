//! Soft-deleted entry access request control.
//!
//! Controls whether a search sees soft-deleted entries, regular entries,
//! or both, and whether soft-deleted entries come back in undeleted form.

use ldapext_ber::{BerElement, BerTag};
use serde_json::{Map, Value};

use crate::codec;
use crate::json::{self, EnvelopeBody, FieldMap};
use crate::{ControlError, ControlType, RawControl};

const TYPE_INCLUDE_NON_SOFT_DELETED: u8 = 0;
const TYPE_RETURN_UNDELETED_FORM: u8 = 1;

const FIELD_INCLUDE_NON_SOFT_DELETED: &str = "include-non-soft-deleted-entries";
const FIELD_RETURN_UNDELETED_FORM: &str = "return-entries-in-undeleted-form";

/// Soft-deleted entry access request control.
///
/// Both fields always have a value; the wire encoding only carries the
/// ones that differ from their defaults, and a control with both defaults
/// carries no value at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftDeletedEntryAccessRequestControl {
    criticality: bool,
    include_non_soft_deleted_entries: bool,
    return_entries_in_undeleted_form: bool,
}

impl Default for SoftDeletedEntryAccessRequestControl {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl SoftDeletedEntryAccessRequestControl {
    pub fn new(
        include_non_soft_deleted_entries: bool,
        return_entries_in_undeleted_form: bool,
    ) -> Self {
        Self {
            criticality: false,
            include_non_soft_deleted_entries,
            return_entries_in_undeleted_form,
        }
    }

    pub fn with_criticality(mut self, criticality: bool) -> Self {
        self.criticality = criticality;
        self
    }

    pub fn criticality(&self) -> bool {
        self.criticality
    }

    pub fn include_non_soft_deleted_entries(&self) -> bool {
        self.include_non_soft_deleted_entries
    }

    pub fn return_entries_in_undeleted_form(&self) -> bool {
        self.return_entries_in_undeleted_form
    }

    fn value_elements(&self) -> Vec<BerElement> {
        let mut elements = Vec::new();
        if !self.include_non_soft_deleted_entries {
            elements.push(
                BerElement::boolean(false).retag(BerTag::context(TYPE_INCLUDE_NON_SOFT_DELETED)),
            );
        }
        if self.return_entries_in_undeleted_form {
            elements
                .push(BerElement::boolean(true).retag(BerTag::context(TYPE_RETURN_UNDELETED_FORM)));
        }
        elements
    }

    fn from_value_json(
        criticality: bool,
        map: &Map<String, Value>,
        strict: bool,
    ) -> Result<Self, ControlError> {
        let fields = FieldMap::new(Self::OID, map);
        fields.reject_unknown(
            &[FIELD_INCLUDE_NON_SOFT_DELETED, FIELD_RETURN_UNDELETED_FORM],
            strict,
        )?;
        Ok(Self {
            criticality,
            include_non_soft_deleted_entries: fields
                .bool_field(FIELD_INCLUDE_NON_SOFT_DELETED)?
                .unwrap_or(true),
            return_entries_in_undeleted_form: fields
                .bool_field(FIELD_RETURN_UNDELETED_FORM)?
                .unwrap_or(false),
        })
    }
}

impl ControlType for SoftDeletedEntryAccessRequestControl {
    const OID: &'static str = "1.3.6.1.4.1.30221.2.5.24";
    const NAME: &'static str = "Soft-Deleted Entry Access Request Control";

    fn decode_control(raw: &RawControl) -> Result<Self, ControlError> {
        let Some(bytes) = raw.value() else {
            // Value absent: both fields take their defaults.
            return Ok(Self {
                criticality: raw.criticality(),
                ..Self::default()
            });
        };
        let children = codec::value_sequence(Self::OID, bytes)?;

        let mut control = Self {
            criticality: raw.criticality(),
            ..Self::default()
        };
        for child in &children {
            if child.tag.is_context(TYPE_INCLUDE_NON_SOFT_DELETED) {
                control.include_non_soft_deleted_entries = codec::boolean(Self::OID, child)?;
            } else if child.tag.is_context(TYPE_RETURN_UNDELETED_FORM) {
                control.return_entries_in_undeleted_form = codec::boolean(Self::OID, child)?;
            } else {
                return Err(ControlError::unexpected_element(
                    Self::OID,
                    child.tag.identifier_octet(),
                ));
            }
        }
        Ok(control)
    }

    fn to_control(&self) -> RawControl {
        let elements = self.value_elements();
        let value = if elements.is_empty() {
            None
        } else {
            Some(BerElement::sequence(elements).encode())
        };
        RawControl::new(Self::OID, self.criticality, value)
    }

    fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            FIELD_INCLUDE_NON_SOFT_DELETED.into(),
            Value::Bool(self.include_non_soft_deleted_entries),
        );
        map.insert(
            FIELD_RETURN_UNDELETED_FORM.into(),
            Value::Bool(self.return_entries_in_undeleted_form),
        );
        json::envelope(Self::OID, Self::NAME, self.criticality, Some(Value::Object(map)))
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
            // This control is valid without any value.
            EnvelopeBody::Absent => Ok(Self {
                criticality: envelope.criticality,
                ..Self::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_control_has_no_value() {
        let control = SoftDeletedEntryAccessRequestControl::default();
        let raw = control.to_control();
        assert_eq!(raw.value(), None);
        let decoded = SoftDeletedEntryAccessRequestControl::decode_control(&raw).unwrap();
        assert!(decoded.include_non_soft_deleted_entries());
        assert!(!decoded.return_entries_in_undeleted_form());
    }

    #[test]
    fn non_default_fields_are_encoded() {
        let control = SoftDeletedEntryAccessRequestControl::new(false, true);
        let raw = control.to_control();
        assert!(raw.value().is_some());
        let decoded = SoftDeletedEntryAccessRequestControl::decode_control(&raw).unwrap();
        assert_eq!(decoded, control);
        assert_eq!(decoded.to_control().value(), raw.value());
    }

    #[test]
    fn json_always_emits_both_defaults() {
        let value = SoftDeletedEntryAccessRequestControl::default().to_json();
        let body = value.get("value-json").unwrap().as_object().unwrap();
        assert_eq!(body.len(), 2);
        assert_eq!(
            body.get("include-non-soft-deleted-entries"),
            Some(&Value::Bool(true))
        );
        assert_eq!(
            body.get("return-entries-in-undeleted-form"),
            Some(&Value::Bool(false))
        );
    }

    #[test]
    fn json_without_value_uses_defaults() {
        let value = serde_json::json!({
            "oid": SoftDeletedEntryAccessRequestControl::OID,
            "criticality": false,
        });
        let decoded = SoftDeletedEntryAccessRequestControl::from_json(&value, true).unwrap();
        assert_eq!(decoded, SoftDeletedEntryAccessRequestControl::default());
    }
}
