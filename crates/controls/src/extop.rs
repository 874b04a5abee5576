//! Extended-operation value model.
//!
//! Extended requests and responses carry the same (name, value) asymmetry
//! as RFC 4511 section 4.12: a request always has a name, a response may
//! have neither. Typed extended operations reuse the control layer's BER
//! helpers and error type.

use ldapext_ber::{BerElement, BerTag};

use crate::codec;
use crate::ControlError;

/// An extended request or response as the transport layer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExtendedOperation {
    name: Option<String>,
    value: Option<Vec<u8>>,
}

impl RawExtendedOperation {
    /// An extended request; requests always carry an OID.
    pub fn request(name: impl Into<String>, value: Option<Vec<u8>>) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }

    /// An extended response, which may omit both fields.
    pub fn response(name: Option<String>, value: Option<Vec<u8>>) -> Self {
        Self { name, value }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }
}

/// A strongly-typed extended-operation value.
pub trait ExtendedOperationType: Sized {
    const OID: &'static str;

    fn decode_value(value: Option<&[u8]>) -> Result<Self, ControlError>;
    fn to_operation(&self) -> RawExtendedOperation;
}

const TYPE_BASE_DN: u8 = 0;

/// Start interactive transaction extended request.
///
/// The value is optional; when present it scopes the transaction to a
/// base DN.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartInteractiveTransactionRequest {
    base_dn: Option<String>,
}

impl StartInteractiveTransactionRequest {
    pub fn new(base_dn: Option<String>) -> Self {
        Self { base_dn }
    }

    pub fn base_dn(&self) -> Option<&str> {
        self.base_dn.as_deref()
    }
}

impl ExtendedOperationType for StartInteractiveTransactionRequest {
    const OID: &'static str = "1.3.6.1.4.1.30221.2.6.3";

    fn decode_value(value: Option<&[u8]>) -> Result<Self, ControlError> {
        let Some(bytes) = value else {
            return Ok(Self::default());
        };
        let children = codec::value_sequence(Self::OID, bytes)?;
        let mut base_dn = None;
        for child in &children {
            if child.tag.is_context(TYPE_BASE_DN) {
                base_dn = Some(codec::utf8(Self::OID, child)?);
            } else {
                return Err(ControlError::unexpected_element(
                    Self::OID,
                    child.tag.identifier_octet(),
                ));
            }
        }
        Ok(Self { base_dn })
    }

    fn to_operation(&self) -> RawExtendedOperation {
        let value = self.base_dn.as_ref().map(|dn| {
            BerElement::sequence(vec![
                BerElement::utf8(dn).retag(BerTag::context(TYPE_BASE_DN)),
            ])
            .encode()
        });
        RawExtendedOperation::request(Self::OID, value)
    }
}

const TYPE_TRANSACTION_ID: u8 = 0;
const TYPE_BASE_DNS: u8 = 1;

/// Start interactive transaction extended result value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartInteractiveTransactionResult {
    transaction_id: String,
    base_dns: Option<Vec<String>>,
}

impl StartInteractiveTransactionResult {
    pub fn new(transaction_id: impl Into<String>, base_dns: Option<Vec<String>>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            base_dns,
        }
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn base_dns(&self) -> Option<&[String]> {
        self.base_dns.as_deref()
    }
}

impl ExtendedOperationType for StartInteractiveTransactionResult {
    const OID: &'static str = "1.3.6.1.4.1.30221.2.6.4";

    fn decode_value(value: Option<&[u8]>) -> Result<Self, ControlError> {
        let bytes = value.ok_or_else(|| ControlError::missing_value(Self::OID))?;
        let children = codec::value_sequence(Self::OID, bytes)?;

        let mut transaction_id = None;
        let mut base_dns = None;
        for child in &children {
            if child.tag.is_context(TYPE_TRANSACTION_ID) {
                transaction_id = Some(codec::utf8(Self::OID, child)?);
            } else if child.tag.is_context(TYPE_BASE_DNS) {
                base_dns = Some(codec::string_values(Self::OID, child)?);
            } else {
                return Err(ControlError::unexpected_element(
                    Self::OID,
                    child.tag.identifier_octet(),
                ));
            }
        }

        Ok(Self {
            transaction_id: transaction_id
                .ok_or_else(|| ControlError::missing_field(Self::OID, "transaction-id"))?,
            base_dns,
        })
    }

    fn to_operation(&self) -> RawExtendedOperation {
        let mut elements = vec![
            BerElement::utf8(&self.transaction_id).retag(BerTag::context(TYPE_TRANSACTION_ID)),
        ];
        if let Some(dns) = &self.base_dns {
            elements.push(BerElement::constructed(
                BerTag::context_constructed(TYPE_BASE_DNS),
                codec::string_elements(dns),
            ));
        }
        RawExtendedOperation::response(
            Some(Self::OID.to_string()),
            Some(BerElement::sequence(elements).encode()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_without_value() {
        let request = StartInteractiveTransactionRequest::default();
        let operation = request.to_operation();
        assert_eq!(operation.name(), Some(StartInteractiveTransactionRequest::OID));
        assert_eq!(operation.value(), None);
        let decoded =
            StartInteractiveTransactionRequest::decode_value(operation.value()).unwrap();
        assert_eq!(decoded.base_dn(), None);
    }

    #[test]
    fn request_with_base_dn_roundtrip() {
        let request =
            StartInteractiveTransactionRequest::new(Some("ou=Apps,dc=example,dc=com".into()));
        let operation = request.to_operation();
        let decoded =
            StartInteractiveTransactionRequest::decode_value(operation.value()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn result_roundtrip() {
        let result = StartInteractiveTransactionResult::new(
            "txn-123",
            Some(vec!["dc=example,dc=com".into()]),
        );
        let operation = result.to_operation();
        let decoded = StartInteractiveTransactionResult::decode_value(operation.value()).unwrap();
        assert_eq!(decoded, result);
    }

    #[test]
    fn result_requires_value_and_transaction_id() {
        assert!(matches!(
            StartInteractiveTransactionResult::decode_value(None).unwrap_err(),
            ControlError::MissingValue { .. }
        ));

        let empty = BerElement::sequence(vec![]).encode();
        assert!(matches!(
            StartInteractiveTransactionResult::decode_value(Some(&empty)).unwrap_err(),
            ControlError::MissingField { field: "transaction-id", .. }
        ));
    }
}
