//! Intermediate client request and response controls.
//!
//! These controls let a chain of intermediaries (load balancers, proxies)
//! describe themselves to the next hop. The value embeds a downstream copy
//! of its own shape, so a request that crossed three intermediaries carries
//! three nested levels, each with its own field set.

use ldapext_ber::{BerElement, BerTag};
use serde_json::{Map, Value};

use crate::codec;
use crate::json::{self, EnvelopeBody, FieldMap};
use crate::{ControlError, ControlType, RawControl};

const TYPE_DOWNSTREAM_REQUEST: u8 = 0;
const TYPE_DOWNSTREAM_CLIENT_ADDRESS: u8 = 1;
const TYPE_DOWNSTREAM_CLIENT_SECURE: u8 = 2;
const TYPE_CLIENT_IDENTITY: u8 = 3;
const TYPE_CLIENT_NAME: u8 = 4;
const TYPE_CLIENT_SESSION_ID: u8 = 5;
const TYPE_CLIENT_REQUEST_ID: u8 = 6;

const FIELD_DOWNSTREAM_REQUEST: &str = "downstream-request";
const FIELD_DOWNSTREAM_CLIENT_ADDRESS: &str = "downstream-client-address";
const FIELD_DOWNSTREAM_CLIENT_SECURE: &str = "downstream-client-secure";
const FIELD_CLIENT_IDENTITY: &str = "client-identity";
const FIELD_CLIENT_NAME: &str = "client-name";
const FIELD_CLIENT_SESSION_ID: &str = "client-session-id";
const FIELD_CLIENT_REQUEST_ID: &str = "client-request-id";

const REQUEST_FIELDS: &[&str] = &[
    FIELD_DOWNSTREAM_REQUEST,
    FIELD_DOWNSTREAM_CLIENT_ADDRESS,
    FIELD_DOWNSTREAM_CLIENT_SECURE,
    FIELD_CLIENT_IDENTITY,
    FIELD_CLIENT_NAME,
    FIELD_CLIENT_SESSION_ID,
    FIELD_CLIENT_REQUEST_ID,
];

/// One level of the intermediate client request value.
///
/// Every field is optional, but a level must carry at least one; that
/// holds recursively for each downstream level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntermediateClientRequestValue {
    pub downstream_request: Option<Box<IntermediateClientRequestValue>>,
    pub downstream_client_address: Option<String>,
    pub downstream_client_secure: Option<bool>,
    pub client_identity: Option<String>,
    pub client_name: Option<String>,
    pub client_session_id: Option<String>,
    pub client_request_id: Option<String>,
}

impl IntermediateClientRequestValue {
    fn is_empty(&self) -> bool {
        self.downstream_request.is_none()
            && self.downstream_client_address.is_none()
            && self.downstream_client_secure.is_none()
            && self.client_identity.is_none()
            && self.client_name.is_none()
            && self.client_session_id.is_none()
            && self.client_request_id.is_none()
    }

    fn elements(&self) -> Vec<BerElement> {
        let mut elements = Vec::new();
        if let Some(downstream) = &self.downstream_request {
            elements.push(BerElement::constructed(
                BerTag::context_constructed(TYPE_DOWNSTREAM_REQUEST),
                downstream.elements(),
            ));
        }
        if let Some(address) = &self.downstream_client_address {
            elements.push(
                BerElement::utf8(address).retag(BerTag::context(TYPE_DOWNSTREAM_CLIENT_ADDRESS)),
            );
        }
        if let Some(secure) = self.downstream_client_secure {
            elements.push(
                BerElement::boolean(secure).retag(BerTag::context(TYPE_DOWNSTREAM_CLIENT_SECURE)),
            );
        }
        if let Some(identity) = &self.client_identity {
            elements.push(BerElement::utf8(identity).retag(BerTag::context(TYPE_CLIENT_IDENTITY)));
        }
        if let Some(name) = &self.client_name {
            elements.push(BerElement::utf8(name).retag(BerTag::context(TYPE_CLIENT_NAME)));
        }
        if let Some(session) = &self.client_session_id {
            elements
                .push(BerElement::utf8(session).retag(BerTag::context(TYPE_CLIENT_SESSION_ID)));
        }
        if let Some(request) = &self.client_request_id {
            elements
                .push(BerElement::utf8(request).retag(BerTag::context(TYPE_CLIENT_REQUEST_ID)));
        }
        elements
    }

    fn decode_elements(oid: &str, children: &[BerElement]) -> Result<Self, ControlError> {
        let mut value = Self::default();
        for child in children {
            if child.tag.is_context(TYPE_DOWNSTREAM_REQUEST) {
                let inner = child.children().map_err(|e| ControlError::ber(oid, e))?;
                value.downstream_request = Some(Box::new(Self::decode_elements(oid, &inner)?));
            } else if child.tag.is_context(TYPE_DOWNSTREAM_CLIENT_ADDRESS) {
                value.downstream_client_address = Some(codec::utf8(oid, child)?);
            } else if child.tag.is_context(TYPE_DOWNSTREAM_CLIENT_SECURE) {
                value.downstream_client_secure = Some(codec::boolean(oid, child)?);
            } else if child.tag.is_context(TYPE_CLIENT_IDENTITY) {
                value.client_identity = Some(codec::utf8(oid, child)?);
            } else if child.tag.is_context(TYPE_CLIENT_NAME) {
                value.client_name = Some(codec::utf8(oid, child)?);
            } else if child.tag.is_context(TYPE_CLIENT_SESSION_ID) {
                value.client_session_id = Some(codec::utf8(oid, child)?);
            } else if child.tag.is_context(TYPE_CLIENT_REQUEST_ID) {
                value.client_request_id = Some(codec::utf8(oid, child)?);
            } else {
                return Err(ControlError::unexpected_element(
                    oid,
                    child.tag.identifier_octet(),
                ));
            }
        }
        if value.is_empty() {
            return Err(ControlError::invalid_value(
                oid,
                "intermediate client value must contain at least one field",
            ));
        }
        Ok(value)
    }

    fn to_json_object(&self) -> Value {
        let mut map = Map::new();
        if let Some(downstream) = &self.downstream_request {
            map.insert(FIELD_DOWNSTREAM_REQUEST.into(), downstream.to_json_object());
        }
        if let Some(address) = &self.downstream_client_address {
            map.insert(
                FIELD_DOWNSTREAM_CLIENT_ADDRESS.into(),
                Value::String(address.clone()),
            );
        }
        if let Some(secure) = self.downstream_client_secure {
            map.insert(FIELD_DOWNSTREAM_CLIENT_SECURE.into(), Value::Bool(secure));
        }
        if let Some(identity) = &self.client_identity {
            map.insert(FIELD_CLIENT_IDENTITY.into(), Value::String(identity.clone()));
        }
        if let Some(name) = &self.client_name {
            map.insert(FIELD_CLIENT_NAME.into(), Value::String(name.clone()));
        }
        if let Some(session) = &self.client_session_id {
            map.insert(FIELD_CLIENT_SESSION_ID.into(), Value::String(session.clone()));
        }
        if let Some(request) = &self.client_request_id {
            map.insert(FIELD_CLIENT_REQUEST_ID.into(), Value::String(request.clone()));
        }
        Value::Object(map)
    }

    /// Decodes one nesting level, applying the strict policy at this level
    /// and recursing for the downstream object.
    fn from_json_object(
        oid: &str,
        map: &Map<String, Value>,
        strict: bool,
    ) -> Result<Self, ControlError> {
        let fields = FieldMap::new(oid, map);
        fields.reject_unknown(REQUEST_FIELDS, strict)?;

        let downstream_request = fields
            .object_field(FIELD_DOWNSTREAM_REQUEST)?
            .map(|inner| Self::from_json_object(oid, inner, strict))
            .transpose()?
            .map(Box::new);

        let value = Self {
            downstream_request,
            downstream_client_address: fields
                .str_field(FIELD_DOWNSTREAM_CLIENT_ADDRESS)?
                .map(str::to_string),
            downstream_client_secure: fields.bool_field(FIELD_DOWNSTREAM_CLIENT_SECURE)?,
            client_identity: fields.str_field(FIELD_CLIENT_IDENTITY)?.map(str::to_string),
            client_name: fields.str_field(FIELD_CLIENT_NAME)?.map(str::to_string),
            client_session_id: fields
                .str_field(FIELD_CLIENT_SESSION_ID)?
                .map(str::to_string),
            client_request_id: fields
                .str_field(FIELD_CLIENT_REQUEST_ID)?
                .map(str::to_string),
        };
        if value.is_empty() {
            return Err(ControlError::invalid_value(
                oid,
                "intermediate client value must contain at least one field",
            ));
        }
        Ok(value)
    }
}

/// Intermediate client request control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediateClientRequestControl {
    criticality: bool,
    value: IntermediateClientRequestValue,
}

impl IntermediateClientRequestControl {
    /// Wraps a request value. The value must carry at least one field.
    pub fn new(value: IntermediateClientRequestValue) -> Result<Self, ControlError> {
        if value.is_empty() {
            return Err(ControlError::conflict(
                Self::OID,
                "intermediate client value must contain at least one field",
            ));
        }
        Ok(Self {
            criticality: false,
            value,
        })
    }

    pub fn with_criticality(mut self, criticality: bool) -> Self {
        self.criticality = criticality;
        self
    }

    pub fn criticality(&self) -> bool {
        self.criticality
    }

    pub fn value(&self) -> &IntermediateClientRequestValue {
        &self.value
    }
}

impl ControlType for IntermediateClientRequestControl {
    const OID: &'static str = "1.3.6.1.4.1.30221.2.5.2";
    const NAME: &'static str = "Intermediate Client Request Control";

    fn decode_control(raw: &RawControl) -> Result<Self, ControlError> {
        let bytes = codec::require_value(Self::OID, raw)?;
        let children = codec::value_sequence(Self::OID, bytes)?;
        Ok(Self {
            criticality: raw.criticality(),
            value: IntermediateClientRequestValue::decode_elements(Self::OID, &children)?,
        })
    }

    fn to_control(&self) -> RawControl {
        let value = BerElement::sequence(self.value.elements()).encode();
        RawControl::new(Self::OID, self.criticality, Some(value))
    }

    fn to_json(&self) -> Value {
        json::envelope(
            Self::OID,
            Self::NAME,
            self.criticality,
            Some(self.value.to_json_object()),
        )
    }

    fn from_json(value: &Value, strict: bool) -> Result<Self, ControlError> {
        let envelope = json::parse_envelope(Self::OID, value, strict)?;
        match envelope.body {
            EnvelopeBody::Json(map) => Ok(Self {
                criticality: envelope.criticality,
                value: IntermediateClientRequestValue::from_json_object(Self::OID, map, strict)?,
            }),
            EnvelopeBody::Base64(bytes) => Self::decode_control(&RawControl::new(
                Self::OID,
                envelope.criticality,
                Some(bytes),
            )),
            EnvelopeBody::Absent => Err(ControlError::missing_value(Self::OID)),
        }
    }
}

const TYPE_UPSTREAM_RESPONSE: u8 = 0;
const TYPE_UPSTREAM_SERVER_ADDRESS: u8 = 1;
const TYPE_UPSTREAM_SERVER_SECURE: u8 = 2;
const TYPE_SERVER_NAME: u8 = 3;
const TYPE_SERVER_SESSION_ID: u8 = 4;
const TYPE_SERVER_RESPONSE_ID: u8 = 5;

const FIELD_UPSTREAM_RESPONSE: &str = "upstream-response";
const FIELD_UPSTREAM_SERVER_ADDRESS: &str = "upstream-server-address";
const FIELD_UPSTREAM_SERVER_SECURE: &str = "upstream-server-secure";
const FIELD_SERVER_NAME: &str = "server-name";
const FIELD_SERVER_SESSION_ID: &str = "server-session-id";
const FIELD_SERVER_RESPONSE_ID: &str = "server-response-id";

const RESPONSE_FIELDS: &[&str] = &[
    FIELD_UPSTREAM_RESPONSE,
    FIELD_UPSTREAM_SERVER_ADDRESS,
    FIELD_UPSTREAM_SERVER_SECURE,
    FIELD_SERVER_NAME,
    FIELD_SERVER_SESSION_ID,
    FIELD_SERVER_RESPONSE_ID,
];

/// One level of the intermediate client response value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntermediateClientResponseValue {
    pub upstream_response: Option<Box<IntermediateClientResponseValue>>,
    pub upstream_server_address: Option<String>,
    pub upstream_server_secure: Option<bool>,
    pub server_name: Option<String>,
    pub server_session_id: Option<String>,
    pub server_response_id: Option<String>,
}

impl IntermediateClientResponseValue {
    fn is_empty(&self) -> bool {
        self.upstream_response.is_none()
            && self.upstream_server_address.is_none()
            && self.upstream_server_secure.is_none()
            && self.server_name.is_none()
            && self.server_session_id.is_none()
            && self.server_response_id.is_none()
    }

    fn elements(&self) -> Vec<BerElement> {
        let mut elements = Vec::new();
        if let Some(upstream) = &self.upstream_response {
            elements.push(BerElement::constructed(
                BerTag::context_constructed(TYPE_UPSTREAM_RESPONSE),
                upstream.elements(),
            ));
        }
        if let Some(address) = &self.upstream_server_address {
            elements.push(
                BerElement::utf8(address).retag(BerTag::context(TYPE_UPSTREAM_SERVER_ADDRESS)),
            );
        }
        if let Some(secure) = self.upstream_server_secure {
            elements.push(
                BerElement::boolean(secure).retag(BerTag::context(TYPE_UPSTREAM_SERVER_SECURE)),
            );
        }
        if let Some(name) = &self.server_name {
            elements.push(BerElement::utf8(name).retag(BerTag::context(TYPE_SERVER_NAME)));
        }
        if let Some(session) = &self.server_session_id {
            elements
                .push(BerElement::utf8(session).retag(BerTag::context(TYPE_SERVER_SESSION_ID)));
        }
        if let Some(response) = &self.server_response_id {
            elements
                .push(BerElement::utf8(response).retag(BerTag::context(TYPE_SERVER_RESPONSE_ID)));
        }
        elements
    }

    fn decode_elements(oid: &str, children: &[BerElement]) -> Result<Self, ControlError> {
        let mut value = Self::default();
        for child in children {
            if child.tag.is_context(TYPE_UPSTREAM_RESPONSE) {
                let inner = child.children().map_err(|e| ControlError::ber(oid, e))?;
                value.upstream_response = Some(Box::new(Self::decode_elements(oid, &inner)?));
            } else if child.tag.is_context(TYPE_UPSTREAM_SERVER_ADDRESS) {
                value.upstream_server_address = Some(codec::utf8(oid, child)?);
            } else if child.tag.is_context(TYPE_UPSTREAM_SERVER_SECURE) {
                value.upstream_server_secure = Some(codec::boolean(oid, child)?);
            } else if child.tag.is_context(TYPE_SERVER_NAME) {
                value.server_name = Some(codec::utf8(oid, child)?);
            } else if child.tag.is_context(TYPE_SERVER_SESSION_ID) {
                value.server_session_id = Some(codec::utf8(oid, child)?);
            } else if child.tag.is_context(TYPE_SERVER_RESPONSE_ID) {
                value.server_response_id = Some(codec::utf8(oid, child)?);
            } else {
                return Err(ControlError::unexpected_element(
                    oid,
                    child.tag.identifier_octet(),
                ));
            }
        }
        if value.is_empty() {
            return Err(ControlError::invalid_value(
                oid,
                "intermediate client value must contain at least one field",
            ));
        }
        Ok(value)
    }

    fn to_json_object(&self) -> Value {
        let mut map = Map::new();
        if let Some(upstream) = &self.upstream_response {
            map.insert(FIELD_UPSTREAM_RESPONSE.into(), upstream.to_json_object());
        }
        if let Some(address) = &self.upstream_server_address {
            map.insert(
                FIELD_UPSTREAM_SERVER_ADDRESS.into(),
                Value::String(address.clone()),
            );
        }
        if let Some(secure) = self.upstream_server_secure {
            map.insert(FIELD_UPSTREAM_SERVER_SECURE.into(), Value::Bool(secure));
        }
        if let Some(name) = &self.server_name {
            map.insert(FIELD_SERVER_NAME.into(), Value::String(name.clone()));
        }
        if let Some(session) = &self.server_session_id {
            map.insert(FIELD_SERVER_SESSION_ID.into(), Value::String(session.clone()));
        }
        if let Some(response) = &self.server_response_id {
            map.insert(FIELD_SERVER_RESPONSE_ID.into(), Value::String(response.clone()));
        }
        Value::Object(map)
    }

    fn from_json_object(
        oid: &str,
        map: &Map<String, Value>,
        strict: bool,
    ) -> Result<Self, ControlError> {
        let fields = FieldMap::new(oid, map);
        fields.reject_unknown(RESPONSE_FIELDS, strict)?;

        let upstream_response = fields
            .object_field(FIELD_UPSTREAM_RESPONSE)?
            .map(|inner| Self::from_json_object(oid, inner, strict))
            .transpose()?
            .map(Box::new);

        let value = Self {
            upstream_response,
            upstream_server_address: fields
                .str_field(FIELD_UPSTREAM_SERVER_ADDRESS)?
                .map(str::to_string),
            upstream_server_secure: fields.bool_field(FIELD_UPSTREAM_SERVER_SECURE)?,
            server_name: fields.str_field(FIELD_SERVER_NAME)?.map(str::to_string),
            server_session_id: fields
                .str_field(FIELD_SERVER_SESSION_ID)?
                .map(str::to_string),
            server_response_id: fields
                .str_field(FIELD_SERVER_RESPONSE_ID)?
                .map(str::to_string),
        };
        if value.is_empty() {
            return Err(ControlError::invalid_value(
                oid,
                "intermediate client value must contain at least one field",
            ));
        }
        Ok(value)
    }
}

/// Intermediate client response control.
///
/// Shares the request control's OID; whether a raw control is a request or
/// a response follows from which message carried it, so generic registry
/// dispatch treats this OID as the request form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediateClientResponseControl {
    criticality: bool,
    value: IntermediateClientResponseValue,
}

impl IntermediateClientResponseControl {
    pub fn new(value: IntermediateClientResponseValue) -> Result<Self, ControlError> {
        if value.is_empty() {
            return Err(ControlError::conflict(
                Self::OID,
                "intermediate client value must contain at least one field",
            ));
        }
        Ok(Self {
            criticality: false,
            value,
        })
    }

    pub fn criticality(&self) -> bool {
        self.criticality
    }

    pub fn value(&self) -> &IntermediateClientResponseValue {
        &self.value
    }
}

impl ControlType for IntermediateClientResponseControl {
    const OID: &'static str = "1.3.6.1.4.1.30221.2.5.2";
    const NAME: &'static str = "Intermediate Client Response Control";

    fn decode_control(raw: &RawControl) -> Result<Self, ControlError> {
        let bytes = codec::require_value(Self::OID, raw)?;
        let children = codec::value_sequence(Self::OID, bytes)?;
        Ok(Self {
            criticality: raw.criticality(),
            value: IntermediateClientResponseValue::decode_elements(Self::OID, &children)?,
        })
    }

    fn to_control(&self) -> RawControl {
        let value = BerElement::sequence(self.value.elements()).encode();
        RawControl::new(Self::OID, self.criticality, Some(value))
    }

    fn to_json(&self) -> Value {
        json::envelope(
            Self::OID,
            Self::NAME,
            self.criticality,
            Some(self.value.to_json_object()),
        )
    }

    fn from_json(value: &Value, strict: bool) -> Result<Self, ControlError> {
        let envelope = json::parse_envelope(Self::OID, value, strict)?;
        match envelope.body {
            EnvelopeBody::Json(map) => Ok(Self {
                criticality: envelope.criticality,
                value: IntermediateClientResponseValue::from_json_object(Self::OID, map, strict)?,
            }),
            EnvelopeBody::Base64(bytes) => Self::decode_control(&RawControl::new(
                Self::OID,
                envelope.criticality,
                Some(bytes),
            )),
            EnvelopeBody::Absent => Err(ControlError::missing_value(Self::OID)),
        }
    }
}
