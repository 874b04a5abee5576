//! Assured replication request control.
//!
//! Lets a client request that a write be replicated to a given assurance
//! level, locally and/or remotely, before the server responds (or that the
//! server respond immediately and apply assurance in the background).

use ldapext_ber::{BerElement, BerTag};
use serde_json::{Map, Value};

use crate::codec;
use crate::json::{self, EnvelopeBody, FieldMap};
use crate::{ControlError, ControlType, RawControl};

const TYPE_LOCAL_LEVEL: u8 = 0;
const TYPE_REMOTE_LEVEL: u8 = 1;
const TYPE_TIMEOUT: u8 = 2;
const TYPE_RESPONSE_IMMEDIATELY: u8 = 3;

const FIELD_LOCAL_LEVEL: &str = "local-level";
const FIELD_REMOTE_LEVEL: &str = "remote-level";
const FIELD_TIMEOUT: &str = "timeout-millis";
const FIELD_RESPONSE_IMMEDIATELY: &str = "send-response-immediately";

/// Assurance level for replicas in the same location as the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssuredReplicationLocalLevel {
    None,
    ReceivedAnyServer,
    ProcessedAllServers,
}

impl AssuredReplicationLocalLevel {
    pub fn int_value(self) -> i64 {
        match self {
            Self::None => 0,
            Self::ReceivedAnyServer => 1,
            Self::ProcessedAllServers => 2,
        }
    }

    /// Looks up a wire value; unrecognized values yield `None` so the
    /// embedding decoder can decide whether that is fatal.
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::ReceivedAnyServer),
            2 => Some(Self::ProcessedAllServers),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ReceivedAnyServer => "received-any-server",
            Self::ProcessedAllServers => "processed-all-servers",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Self::None),
            "received-any-server" => Some(Self::ReceivedAnyServer),
            "processed-all-servers" => Some(Self::ProcessedAllServers),
            _ => None,
        }
    }
}

/// Assurance level for replicas in other locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssuredReplicationRemoteLevel {
    None,
    ReceivedAnyRemoteLocation,
    ReceivedAllRemoteLocations,
    ProcessedAllRemoteServers,
}

impl AssuredReplicationRemoteLevel {
    pub fn int_value(self) -> i64 {
        match self {
            Self::None => 0,
            Self::ReceivedAnyRemoteLocation => 1,
            Self::ReceivedAllRemoteLocations => 2,
            Self::ProcessedAllRemoteServers => 3,
        }
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::ReceivedAnyRemoteLocation),
            2 => Some(Self::ReceivedAllRemoteLocations),
            3 => Some(Self::ProcessedAllRemoteServers),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ReceivedAnyRemoteLocation => "received-any-remote-location",
            Self::ReceivedAllRemoteLocations => "received-all-remote-locations",
            Self::ProcessedAllRemoteServers => "processed-all-remote-servers",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Self::None),
            "received-any-remote-location" => Some(Self::ReceivedAnyRemoteLocation),
            "received-all-remote-locations" => Some(Self::ReceivedAllRemoteLocations),
            "processed-all-remote-servers" => Some(Self::ProcessedAllRemoteServers),
            _ => None,
        }
    }
}

/// Assured replication request control.
///
/// All assurance fields are optional; an absent field tells the server to
/// use the level configured for the operation. `send_response_immediately`
/// always has a value and defaults to `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssuredReplicationRequestControl {
    criticality: bool,
    local_level: Option<AssuredReplicationLocalLevel>,
    remote_level: Option<AssuredReplicationRemoteLevel>,
    timeout_millis: Option<u64>,
    send_response_immediately: bool,
}

impl Default for AssuredReplicationRequestControl {
    fn default() -> Self {
        Self::new(None, None, None, false)
    }
}

impl AssuredReplicationRequestControl {
    pub fn new(
        local_level: Option<AssuredReplicationLocalLevel>,
        remote_level: Option<AssuredReplicationRemoteLevel>,
        timeout_millis: Option<u64>,
        send_response_immediately: bool,
    ) -> Self {
        Self {
            criticality: true,
            local_level,
            remote_level,
            timeout_millis,
            send_response_immediately,
        }
    }

    pub fn with_criticality(mut self, criticality: bool) -> Self {
        self.criticality = criticality;
        self
    }

    pub fn criticality(&self) -> bool {
        self.criticality
    }

    pub fn local_level(&self) -> Option<AssuredReplicationLocalLevel> {
        self.local_level
    }

    pub fn remote_level(&self) -> Option<AssuredReplicationRemoteLevel> {
        self.remote_level
    }

    pub fn timeout_millis(&self) -> Option<u64> {
        self.timeout_millis
    }

    pub fn send_response_immediately(&self) -> bool {
        self.send_response_immediately
    }

    fn value_elements(&self) -> Vec<BerElement> {
        let mut elements = Vec::new();
        if let Some(level) = self.local_level {
            elements.push(
                BerElement::enumerated(level.int_value())
                    .retag(BerTag::context(TYPE_LOCAL_LEVEL)),
            );
        }
        if let Some(level) = self.remote_level {
            elements.push(
                BerElement::enumerated(level.int_value())
                    .retag(BerTag::context(TYPE_REMOTE_LEVEL)),
            );
        }
        if let Some(timeout) = self.timeout_millis {
            elements.push(
                BerElement::integer(timeout as i64).retag(BerTag::context(TYPE_TIMEOUT)),
            );
        }
        if self.send_response_immediately {
            elements.push(
                BerElement::boolean(true).retag(BerTag::context(TYPE_RESPONSE_IMMEDIATELY)),
            );
        }
        elements
    }

    fn value_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(level) = self.local_level {
            map.insert(FIELD_LOCAL_LEVEL.into(), Value::String(level.name().into()));
        }
        if let Some(level) = self.remote_level {
            map.insert(FIELD_REMOTE_LEVEL.into(), Value::String(level.name().into()));
        }
        if let Some(timeout) = self.timeout_millis {
            map.insert(FIELD_TIMEOUT.into(), Value::from(timeout));
        }
        map.insert(
            FIELD_RESPONSE_IMMEDIATELY.into(),
            Value::Bool(self.send_response_immediately),
        );
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
                FIELD_LOCAL_LEVEL,
                FIELD_REMOTE_LEVEL,
                FIELD_TIMEOUT,
                FIELD_RESPONSE_IMMEDIATELY,
            ],
            strict,
        )?;

        let local_level = fields
            .str_field(FIELD_LOCAL_LEVEL)?
            .map(|name| {
                AssuredReplicationLocalLevel::from_name(name).ok_or_else(|| {
                    ControlError::invalid_json(
                        Self::OID,
                        format!("unrecognized local-level `{name}`"),
                    )
                })
            })
            .transpose()?;
        let remote_level = fields
            .str_field(FIELD_REMOTE_LEVEL)?
            .map(|name| {
                AssuredReplicationRemoteLevel::from_name(name).ok_or_else(|| {
                    ControlError::invalid_json(
                        Self::OID,
                        format!("unrecognized remote-level `{name}`"),
                    )
                })
            })
            .transpose()?;
        let timeout_millis = fields.u64_field(FIELD_TIMEOUT)?;
        if timeout_millis == Some(0) {
            return Err(ControlError::out_of_range(Self::OID, FIELD_TIMEOUT, 0));
        }
        let send_response_immediately =
            fields.bool_field(FIELD_RESPONSE_IMMEDIATELY)?.unwrap_or(false);

        Ok(Self {
            criticality,
            local_level,
            remote_level,
            timeout_millis,
            send_response_immediately,
        })
    }
}

impl ControlType for AssuredReplicationRequestControl {
    const OID: &'static str = "1.3.6.1.4.1.30221.2.5.8";
    const NAME: &'static str = "Assured Replication Request Control";

    fn decode_control(raw: &RawControl) -> Result<Self, ControlError> {
        let bytes = codec::require_value(Self::OID, raw)?;
        let children = codec::value_sequence(Self::OID, bytes)?;

        let mut local_level = None;
        let mut remote_level = None;
        let mut timeout_millis = None;
        let mut send_response_immediately = false;

        for child in &children {
            if child.tag.is_context(TYPE_LOCAL_LEVEL) {
                let value = codec::enumerated(Self::OID, child)?;
                local_level =
                    Some(AssuredReplicationLocalLevel::from_value(value).ok_or_else(|| {
                        ControlError::out_of_range(Self::OID, FIELD_LOCAL_LEVEL, value)
                    })?);
            } else if child.tag.is_context(TYPE_REMOTE_LEVEL) {
                let value = codec::enumerated(Self::OID, child)?;
                remote_level =
                    Some(AssuredReplicationRemoteLevel::from_value(value).ok_or_else(|| {
                        ControlError::out_of_range(Self::OID, FIELD_REMOTE_LEVEL, value)
                    })?);
            } else if child.tag.is_context(TYPE_TIMEOUT) {
                let value = codec::integer(Self::OID, child)?;
                if value < 1 {
                    return Err(ControlError::out_of_range(Self::OID, FIELD_TIMEOUT, value));
                }
                timeout_millis = Some(value as u64);
            } else if child.tag.is_context(TYPE_RESPONSE_IMMEDIATELY) {
                send_response_immediately = codec::boolean(Self::OID, child)?;
            } else {
                return Err(ControlError::unexpected_element(
                    Self::OID,
                    child.tag.identifier_octet(),
                ));
            }
        }

        Ok(Self {
            criticality: raw.criticality(),
            local_level,
            remote_level,
            timeout_millis,
            send_response_immediately,
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
    fn minimal_control_roundtrip_defaults() {
        let control = AssuredReplicationRequestControl::default();
        let raw = control.to_control();
        assert_eq!(raw.oid(), AssuredReplicationRequestControl::OID);
        // Empty SEQUENCE value.
        assert_eq!(raw.value(), Some(&[0x30, 0x00][..]));

        let decoded = AssuredReplicationRequestControl::decode_control(&raw).unwrap();
        assert_eq!(decoded.local_level(), None);
        assert_eq!(decoded.remote_level(), None);
        assert_eq!(decoded.timeout_millis(), None);
        assert!(!decoded.send_response_immediately());
    }

    #[test]
    fn fully_populated_roundtrip() {
        let control = AssuredReplicationRequestControl::new(
            Some(AssuredReplicationLocalLevel::ProcessedAllServers),
            Some(AssuredReplicationRemoteLevel::ReceivedAllRemoteLocations),
            Some(5678),
            true,
        );
        let raw = control.to_control();
        let decoded = AssuredReplicationRequestControl::decode_control(&raw).unwrap();
        assert_eq!(decoded, control);
        // Re-encoding reproduces the value bytes exactly.
        assert_eq!(decoded.to_control().value(), raw.value());
    }

    #[test]
    fn decode_rejects_out_of_range_level() {
        let value = BerElement::sequence(vec![
            BerElement::enumerated(1234).retag(BerTag::context(TYPE_LOCAL_LEVEL)),
        ])
        .encode();
        let raw = RawControl::new(AssuredReplicationRequestControl::OID, true, Some(value));
        let err = AssuredReplicationRequestControl::decode_control(&raw).unwrap_err();
        assert!(matches!(
            err,
            ControlError::ValueOutOfRange { value: 1234, .. }
        ));
    }

    #[test]
    fn decode_rejects_negative_timeout() {
        let value = BerElement::sequence(vec![
            BerElement::integer(-1).retag(BerTag::context(TYPE_TIMEOUT)),
        ])
        .encode();
        let raw = RawControl::new(AssuredReplicationRequestControl::OID, true, Some(value));
        assert!(AssuredReplicationRequestControl::decode_control(&raw).is_err());
    }

    #[test]
    fn decode_rejects_unrecognized_element() {
        let value = BerElement::sequence(vec![
            BerElement::boolean(true).retag(BerTag::context(7)),
        ])
        .encode();
        let raw = RawControl::new(AssuredReplicationRequestControl::OID, true, Some(value));
        let err = AssuredReplicationRequestControl::decode_control(&raw).unwrap_err();
        assert_eq!(
            err,
            ControlError::unexpected_element(AssuredReplicationRequestControl::OID, 0x87)
        );
    }

    #[test]
    fn decode_rejects_missing_value() {
        let raw = RawControl::new(AssuredReplicationRequestControl::OID, true, None);
        assert!(matches!(
            AssuredReplicationRequestControl::decode_control(&raw).unwrap_err(),
            ControlError::MissingValue { .. }
        ));
    }

    #[test]
    fn json_emits_default_boolean_but_omits_absent_optionals() {
        let control = AssuredReplicationRequestControl::default();
        let value = control.to_json();
        let body = value.get("value-json").unwrap().as_object().unwrap();
        // Only the always-present default boolean.
        assert_eq!(body.len(), 1);
        assert_eq!(body.get("send-response-immediately"), Some(&Value::Bool(false)));
    }

    #[test]
    fn json_roundtrip_fully_populated() {
        let control = AssuredReplicationRequestControl::new(
            Some(AssuredReplicationLocalLevel::ReceivedAnyServer),
            Some(AssuredReplicationRemoteLevel::ProcessedAllRemoteServers),
            Some(5678),
            true,
        )
        .with_criticality(false);
        let value = control.to_json();
        let decoded = AssuredReplicationRequestControl::from_json(&value, true).unwrap();
        assert_eq!(decoded, control);
    }

    #[test]
    fn enum_lookup_misses_return_none() {
        assert_eq!(AssuredReplicationLocalLevel::from_value(99), None);
        assert_eq!(AssuredReplicationRemoteLevel::from_name("bogus"), None);
    }
}
