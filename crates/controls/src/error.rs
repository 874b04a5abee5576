//! Control decode error type and LDAP-style result codes.

use ldapext_ber::BerError;
use thiserror::Error;

/// LDAP-style result code attached to a control failure.
///
/// These mirror the client-side codes an LDAP SDK reports when a control
/// cannot be processed, so tools embedding this crate can map a failure
/// straight to exit behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    ProtocolError,
    DecodingError,
    ParamError,
}

impl ResultCode {
    /// The numeric LDAP result code.
    pub fn int_value(self) -> i32 {
        match self {
            ResultCode::ProtocolError => 2,
            ResultCode::DecodingError => 84,
            ResultCode::ParamError => 89,
        }
    }
}

/// Error produced when a control or extended-operation value cannot be
/// encoded, decoded, or constructed.
///
/// Every variant names the OID it was raised for, so a failure deep inside
/// a nested value still identifies the control that carried it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("control {oid} requires a value, but none was provided")]
    MissingValue { oid: String },
    #[error("control {oid} value is malformed: {source}")]
    Ber { oid: String, source: BerError },
    #[error("control {oid} is missing required field `{field}`")]
    MissingField { oid: String, field: &'static str },
    #[error("control {oid} value contains unexpected element with tag {tag:#04x}")]
    UnexpectedElement { oid: String, tag: u8 },
    #[error("control {oid} value is malformed: {reason}")]
    InvalidValue { oid: String, reason: String },
    #[error("control {oid} field `{field}` has value {value} outside its defined range")]
    ValueOutOfRange {
        oid: String,
        field: &'static str,
        value: i64,
    },
    #[error("control {oid} JSON object contains unrecognized field `{field}`")]
    UnknownJsonField { oid: String, field: String },
    #[error("control {oid} JSON representation is invalid: {reason}")]
    InvalidJson { oid: String, reason: String },
    #[error("control {oid} violates a field constraint: {reason}")]
    Conflict { oid: String, reason: String },
}

impl ControlError {
    pub(crate) fn ber(oid: &str, source: BerError) -> Self {
        ControlError::Ber {
            oid: oid.to_string(),
            source,
        }
    }

    pub(crate) fn missing_value(oid: &str) -> Self {
        ControlError::MissingValue {
            oid: oid.to_string(),
        }
    }

    pub(crate) fn missing_field(oid: &str, field: &'static str) -> Self {
        ControlError::MissingField {
            oid: oid.to_string(),
            field,
        }
    }

    pub(crate) fn unexpected_element(oid: &str, tag: u8) -> Self {
        ControlError::UnexpectedElement {
            oid: oid.to_string(),
            tag,
        }
    }

    pub(crate) fn invalid_value(oid: &str, reason: impl Into<String>) -> Self {
        ControlError::InvalidValue {
            oid: oid.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn out_of_range(oid: &str, field: &'static str, value: i64) -> Self {
        ControlError::ValueOutOfRange {
            oid: oid.to_string(),
            field,
            value,
        }
    }

    pub(crate) fn unknown_json_field(oid: &str, field: &str) -> Self {
        ControlError::UnknownJsonField {
            oid: oid.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid_json(oid: &str, reason: impl Into<String>) -> Self {
        ControlError::InvalidJson {
            oid: oid.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn conflict(oid: &str, reason: impl Into<String>) -> Self {
        ControlError::Conflict {
            oid: oid.to_string(),
            reason: reason.into(),
        }
    }

    /// The LDAP-style result code this failure maps to.
    pub fn result_code(&self) -> ResultCode {
        match self {
            ControlError::Conflict { .. } => ResultCode::ParamError,
            _ => ResultCode::DecodingError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_codes() {
        let conflict = ControlError::conflict("1.2.3", "both variants present");
        assert_eq!(conflict.result_code(), ResultCode::ParamError);
        assert_eq!(conflict.result_code().int_value(), 89);
        let missing = ControlError::missing_value("1.2.3");
        assert_eq!(missing.result_code(), ResultCode::DecodingError);
        assert_eq!(missing.result_code().int_value(), 84);
    }

    #[test]
    fn messages_name_the_oid() {
        let err = ControlError::missing_field("1.3.6.1.4.1.30221.2.5.37", "search-indexed");
        let text = err.to_string();
        assert!(text.contains("1.3.6.1.4.1.30221.2.5.37"));
        assert!(text.contains("search-indexed"));
    }
}
