//! The generic control triple and the typed-control trait.

use serde_json::Value;

use crate::ControlError;

/// A control as it travels on the LDAP wire: an OID, a criticality flag,
/// and an optional opaque value.
///
/// The transport layer attaches lists of these to requests, results, and
/// entries; this crate only ever consumes and produces the triple itself.
/// Immutable value object, freely cloneable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawControl {
    oid: String,
    criticality: bool,
    value: Option<Vec<u8>>,
}

impl RawControl {
    pub fn new(oid: impl Into<String>, criticality: bool, value: Option<Vec<u8>>) -> Self {
        let oid = oid.into();
        debug_assert!(!oid.is_empty(), "control OID must be non-empty");
        Self {
            oid,
            criticality,
            value,
        }
    }

    pub fn oid(&self) -> &str {
        &self.oid
    }

    pub fn criticality(&self) -> bool {
        self.criticality
    }

    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    pub fn into_value(self) -> Option<Vec<u8>> {
        self.value
    }
}

/// A strongly-typed control that can be converted to and from the generic
/// triple and to and from its JSON representation.
///
/// Round-trip fidelity is part of the contract: decoding `to_control()`
/// output reproduces the control field-for-field, and re-encoding yields
/// byte-identical value octets.
pub trait ControlType: Sized {
    /// The OID this control type is registered under.
    const OID: &'static str;
    /// Human-readable name, emitted as the informational `control-name`
    /// JSON field. Never consulted on decode.
    const NAME: &'static str;

    fn decode_control(raw: &RawControl) -> Result<Self, ControlError>;
    fn to_control(&self) -> RawControl;

    /// The full JSON representation, including the envelope fields.
    fn to_json(&self) -> Value;
    /// Decodes the JSON representation produced by [`to_json`], or an
    /// equivalent `value-base64` form.
    ///
    /// [`to_json`]: ControlType::to_json
    fn from_json(value: &Value, strict: bool) -> Result<Self, ControlError>;
}

/// Returns the first control matching `C`'s OID, decoded, or `None`.
pub fn get<C: ControlType>(controls: &[RawControl]) -> Result<Option<C>, ControlError> {
    for raw in controls {
        if raw.oid() == C::OID {
            return C::decode_control(raw).map(Some);
        }
    }
    Ok(None)
}

/// Returns every control matching `C`'s OID, independently decoded, in
/// original order.
pub fn get_all<C: ControlType>(controls: &[RawControl]) -> Result<Vec<C>, ControlError> {
    let mut decoded = Vec::new();
    for raw in controls {
        if raw.oid() == C::OID {
            decoded.push(C::decode_control(raw)?);
        }
    }
    Ok(decoded)
}
