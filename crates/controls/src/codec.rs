//! Shared BER plumbing for control values.
//!
//! Every control value in this crate is a SEQUENCE of context-tagged
//! fields. The walk itself (outer container validation, child splitting,
//! primitive conversion, error attribution to the owning OID) is identical
//! across controls, so it lives here; each control contributes only the
//! match over its own tag numbers.

use ldapext_ber::{BerElement, BerTag};

use crate::{ControlError, RawControl};

/// Returns the control's value bytes, failing when absent.
pub(crate) fn require_value<'a>(
    oid: &str,
    raw: &'a RawControl,
) -> Result<&'a [u8], ControlError> {
    raw.value().ok_or_else(|| ControlError::missing_value(oid))
}

/// Decodes the value as an outer SEQUENCE and returns its children.
pub(crate) fn value_sequence(oid: &str, bytes: &[u8]) -> Result<Vec<BerElement>, ControlError> {
    let outer = BerElement::decode(bytes).map_err(|e| ControlError::ber(oid, e))?;
    if outer.tag != BerTag::SEQUENCE {
        return Err(ControlError::unexpected_element(
            oid,
            outer.tag.identifier_octet(),
        ));
    }
    outer.children().map_err(|e| ControlError::ber(oid, e))
}

pub(crate) fn boolean(oid: &str, element: &BerElement) -> Result<bool, ControlError> {
    element.as_boolean().map_err(|e| ControlError::ber(oid, e))
}

pub(crate) fn integer(oid: &str, element: &BerElement) -> Result<i64, ControlError> {
    element.as_integer().map_err(|e| ControlError::ber(oid, e))
}

pub(crate) fn enumerated(oid: &str, element: &BerElement) -> Result<i64, ControlError> {
    element
        .as_enumerated()
        .map_err(|e| ControlError::ber(oid, e))
}

pub(crate) fn utf8(oid: &str, element: &BerElement) -> Result<String, ControlError> {
    element
        .as_utf8()
        .map(str::to_string)
        .map_err(|e| ControlError::ber(oid, e))
}

/// Reads a constructed element as a collection of OCTET STRING values.
pub(crate) fn string_values(
    oid: &str,
    element: &BerElement,
) -> Result<Vec<String>, ControlError> {
    let children = element.children().map_err(|e| ControlError::ber(oid, e))?;
    children.iter().map(|child| utf8(oid, child)).collect()
}

/// Encodes a collection of strings as OCTET STRING children.
pub(crate) fn string_elements(values: &[String]) -> Vec<BerElement> {
    values.iter().map(|v| BerElement::utf8(v)).collect()
}
