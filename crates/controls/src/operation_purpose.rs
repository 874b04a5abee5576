//! Operation purpose request control.
//!
//! Lets an application annotate a request with who is asking and why, for
//! the server's access and audit logs.

use ldapext_ber::{BerElement, BerTag};
use serde_json::{Map, Value};

use crate::codec;
use crate::json::{self, EnvelopeBody, FieldMap};
use crate::{ControlError, ControlType, RawControl};

const TYPE_APPLICATION_NAME: u8 = 0;
const TYPE_APPLICATION_VERSION: u8 = 1;
const TYPE_CODE_LOCATION: u8 = 2;
const TYPE_REQUEST_PURPOSE: u8 = 3;

const FIELD_APPLICATION_NAME: &str = "application-name";
const FIELD_APPLICATION_VERSION: &str = "application-version";
const FIELD_CODE_LOCATION: &str = "code-location";
const FIELD_REQUEST_PURPOSE: &str = "request-purpose";

/// Operation purpose request control. At least one of the four fields must
/// be present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationPurposeRequestControl {
    criticality: bool,
    application_name: Option<String>,
    application_version: Option<String>,
    code_location: Option<String>,
    request_purpose: Option<String>,
}

impl OperationPurposeRequestControl {
    pub fn new(
        application_name: Option<String>,
        application_version: Option<String>,
        code_location: Option<String>,
        request_purpose: Option<String>,
    ) -> Result<Self, ControlError> {
        let control = Self {
            criticality: false,
            application_name,
            application_version,
            code_location,
            request_purpose,
        };
        if control.is_empty() {
            return Err(ControlError::conflict(
                Self::OID,
                "at least one of application name, version, code location, or purpose is required",
            ));
        }
        Ok(control)
    }

    pub fn with_criticality(mut self, criticality: bool) -> Self {
        self.criticality = criticality;
        self
    }

    fn is_empty(&self) -> bool {
        self.application_name.is_none()
            && self.application_version.is_none()
            && self.code_location.is_none()
            && self.request_purpose.is_none()
    }

    pub fn criticality(&self) -> bool {
        self.criticality
    }

    pub fn application_name(&self) -> Option<&str> {
        self.application_name.as_deref()
    }

    pub fn application_version(&self) -> Option<&str> {
        self.application_version.as_deref()
    }

    pub fn code_location(&self) -> Option<&str> {
        self.code_location.as_deref()
    }

    pub fn request_purpose(&self) -> Option<&str> {
        self.request_purpose.as_deref()
    }

    fn value_elements(&self) -> Vec<BerElement> {
        let tagged = |text: &Option<String>, tag: u8| {
            text.as_ref()
                .map(|t| BerElement::utf8(t).retag(BerTag::context(tag)))
        };
        [
            tagged(&self.application_name, TYPE_APPLICATION_NAME),
            tagged(&self.application_version, TYPE_APPLICATION_VERSION),
            tagged(&self.code_location, TYPE_CODE_LOCATION),
            tagged(&self.request_purpose, TYPE_REQUEST_PURPOSE),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn value_json(&self) -> Value {
        let mut map = Map::new();
        let mut put = |field: &str, text: &Option<String>| {
            if let Some(text) = text {
                map.insert(field.into(), Value::String(text.clone()));
            }
        };
        put(FIELD_APPLICATION_NAME, &self.application_name);
        put(FIELD_APPLICATION_VERSION, &self.application_version);
        put(FIELD_CODE_LOCATION, &self.code_location);
        put(FIELD_REQUEST_PURPOSE, &self.request_purpose);
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
                FIELD_APPLICATION_NAME,
                FIELD_APPLICATION_VERSION,
                FIELD_CODE_LOCATION,
                FIELD_REQUEST_PURPOSE,
            ],
            strict,
        )?;
        let control = Self::new(
            fields.str_field(FIELD_APPLICATION_NAME)?.map(str::to_string),
            fields
                .str_field(FIELD_APPLICATION_VERSION)?
                .map(str::to_string),
            fields.str_field(FIELD_CODE_LOCATION)?.map(str::to_string),
            fields.str_field(FIELD_REQUEST_PURPOSE)?.map(str::to_string),
        )?;
        Ok(Self {
            criticality,
            ..control
        })
    }
}

impl ControlType for OperationPurposeRequestControl {
    const OID: &'static str = "1.3.6.1.4.1.30221.2.5.19";
    const NAME: &'static str = "Operation Purpose Request Control";

    fn decode_control(raw: &RawControl) -> Result<Self, ControlError> {
        let bytes = codec::require_value(Self::OID, raw)?;
        let children = codec::value_sequence(Self::OID, bytes)?;

        let mut control = Self {
            criticality: raw.criticality(),
            application_name: None,
            application_version: None,
            code_location: None,
            request_purpose: None,
        };

        for child in &children {
            if child.tag.is_context(TYPE_APPLICATION_NAME) {
                control.application_name = Some(codec::utf8(Self::OID, child)?);
            } else if child.tag.is_context(TYPE_APPLICATION_VERSION) {
                control.application_version = Some(codec::utf8(Self::OID, child)?);
            } else if child.tag.is_context(TYPE_CODE_LOCATION) {
                control.code_location = Some(codec::utf8(Self::OID, child)?);
            } else if child.tag.is_context(TYPE_REQUEST_PURPOSE) {
                control.request_purpose = Some(codec::utf8(Self::OID, child)?);
            } else {
                return Err(ControlError::unexpected_element(
                    Self::OID,
                    child.tag.identifier_octet(),
                ));
            }
        }

        if control.is_empty() {
            return Err(ControlError::invalid_value(
                Self::OID,
                "value must contain at least one field",
            ));
        }
        Ok(control)
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
    fn roundtrip_all_fields() {
        let control = OperationPurposeRequestControl::new(
            Some("dir-admin-tool".into()),
            Some("2.1.0".into()),
            Some("BulkImporter.runImport".into()),
            Some("nightly bulk import".into()),
        )
        .unwrap();
        let raw = control.to_control();
        let decoded = OperationPurposeRequestControl::decode_control(&raw).unwrap();
        assert_eq!(decoded, control);
        assert_eq!(decoded.to_control().value(), raw.value());
    }

    #[test]
    fn roundtrip_single_field() {
        let control =
            OperationPurposeRequestControl::new(None, None, None, Some("debugging".into()))
                .unwrap();
        let decoded =
            OperationPurposeRequestControl::decode_control(&control.to_control()).unwrap();
        assert_eq!(decoded.request_purpose(), Some("debugging"));
        assert_eq!(decoded.application_name(), None);
    }

    #[test]
    fn all_fields_absent_is_an_error() {
        let err = OperationPurposeRequestControl::new(None, None, None, None).unwrap_err();
        assert!(matches!(err, ControlError::Conflict { .. }));

        let raw = RawControl::new(
            OperationPurposeRequestControl::OID,
            false,
            Some(BerElement::sequence(vec![]).encode()),
        );
        assert!(matches!(
            OperationPurposeRequestControl::decode_control(&raw).unwrap_err(),
            ControlError::InvalidValue { .. }
        ));
    }

    #[test]
    fn json_roundtrip_omits_absent_fields() {
        let control =
            OperationPurposeRequestControl::new(Some("app".into()), None, None, None).unwrap();
        let value = control.to_json();
        let body = value.get("value-json").unwrap().as_object().unwrap();
        assert_eq!(body.len(), 1);
        let decoded = OperationPurposeRequestControl::from_json(&value, true).unwrap();
        assert_eq!(decoded, control);
    }
}
