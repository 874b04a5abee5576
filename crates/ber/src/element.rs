//! The BER element value object and its encode/decode operations.

use std::str;

use crate::{BerError, BerReader, BerTag};

/// One BER tag-length-value element.
///
/// The payload is stored as raw octets. For constructed elements it holds
/// the concatenated encodings of the children, which [`children`] splits
/// back apart. Elements are immutable value objects; encoding the same
/// element always produces identical bytes.
///
/// [`children`]: BerElement::children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BerElement {
    pub tag: BerTag,
    value: Vec<u8>,
}

impl BerElement {
    /// Builds an element from an already-encoded payload.
    pub fn from_parts(tag: BerTag, value: Vec<u8>) -> Self {
        Self { tag, value }
    }

    /// A universal BOOLEAN. Encodes canonically: `0xff` for true.
    pub fn boolean(value: bool) -> Self {
        Self::from_parts(BerTag::BOOLEAN, vec![if value { 0xff } else { 0x00 }])
    }

    /// A universal INTEGER in minimal-length two's-complement form.
    pub fn integer(value: i64) -> Self {
        Self::from_parts(BerTag::INTEGER, encode_i64(value))
    }

    /// A universal ENUMERATED. Same payload rules as INTEGER.
    pub fn enumerated(value: i64) -> Self {
        Self::from_parts(BerTag::ENUMERATED, encode_i64(value))
    }

    /// A universal OCTET STRING.
    pub fn octet_string(value: Vec<u8>) -> Self {
        Self::from_parts(BerTag::OCTET_STRING, value)
    }

    /// An OCTET STRING holding UTF-8 text.
    pub fn utf8(value: &str) -> Self {
        Self::octet_string(value.as_bytes().to_vec())
    }

    /// A universal SEQUENCE. Child order is preserved byte-for-byte.
    pub fn sequence(children: Vec<BerElement>) -> Self {
        Self::constructed(BerTag::SEQUENCE, children)
    }

    /// A universal SET.
    pub fn set(children: Vec<BerElement>) -> Self {
        Self::constructed(BerTag::SET, children)
    }

    /// A constructed element under an arbitrary tag.
    pub fn constructed(tag: BerTag, children: Vec<BerElement>) -> Self {
        let mut value = Vec::new();
        for child in &children {
            child.encode_into(&mut value);
        }
        Self::from_parts(tag, value)
    }

    /// Re-tags the element, keeping the payload (implicit tagging).
    pub fn retag(mut self, tag: BerTag) -> Self {
        self.tag = tag;
        self
    }

    /// The raw payload octets.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn into_value(self) -> Vec<u8> {
        self.value
    }

    /// Encodes the element: identifier octet, definite length, payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.value.len() + 6);
        self.encode_into(&mut out);
        out
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.tag.identifier_octet());
        write_length(out, self.value.len());
        out.extend_from_slice(&self.value);
    }

    /// Decodes exactly one element, requiring all input to be consumed.
    pub fn decode(bytes: &[u8]) -> Result<Self, BerError> {
        let mut reader = BerReader::new(bytes);
        let element = reader.element()?;
        if !reader.is_empty() {
            return Err(BerError::TrailingBytes);
        }
        Ok(element)
    }

    /// Decodes one element and returns the unread remainder.
    pub fn decode_prefix(bytes: &[u8]) -> Result<(Self, &[u8]), BerError> {
        let mut reader = BerReader::new(bytes);
        let element = reader.element()?;
        Ok((element, reader.rest()))
    }

    /// Splits a constructed element into its ordered children.
    pub fn children(&self) -> Result<Vec<BerElement>, BerError> {
        if !self.tag.constructed {
            return Err(BerError::NotConstructed(self.tag.identifier_octet()));
        }
        let mut reader = BerReader::new(&self.value);
        let mut children = Vec::new();
        while !reader.is_empty() {
            children.push(reader.element()?);
        }
        Ok(children)
    }

    /// Reads the payload as a BOOLEAN: exactly one octet, non-zero is true.
    pub fn as_boolean(&self) -> Result<bool, BerError> {
        match self.value.as_slice() {
            [octet] => Ok(*octet != 0),
            _ => Err(BerError::BooleanLength(self.value.len())),
        }
    }

    /// Reads the payload as a two's-complement INTEGER.
    pub fn as_integer(&self) -> Result<i64, BerError> {
        decode_i64(&self.value)
    }

    /// Reads the payload as an ENUMERATED value.
    pub fn as_enumerated(&self) -> Result<i64, BerError> {
        decode_i64(&self.value)
    }

    /// Reads the payload as UTF-8 text.
    pub fn as_utf8(&self) -> Result<&str, BerError> {
        str::from_utf8(&self.value).map_err(|_| BerError::InvalidUtf8)
    }
}

fn write_length(out: &mut Vec<u8>, length: usize) {
    if length < 0x80 {
        out.push(length as u8);
        return;
    }
    let bytes = (length as u32).to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    out.push(0x80 | (4 - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

fn encode_i64(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    // Strip redundant leading octets while the sign bit stays intact.
    while start < 7 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

fn decode_i64(payload: &[u8]) -> Result<i64, BerError> {
    if payload.is_empty() || payload.len() > 8 {
        return Err(BerError::IntegerLength(payload.len()));
    }
    let mut value: i64 = if payload[0] & 0x80 != 0 { -1 } else { 0 };
    for &octet in payload {
        value = (value << 8) | octet as i64;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_minimal_encodings() {
        let cases: &[(i64, &[u8])] = &[
            (0, &[0x00]),
            (1, &[0x01]),
            (127, &[0x7f]),
            (128, &[0x00, 0x80]),
            (256, &[0x01, 0x00]),
            (-1, &[0xff]),
            (-128, &[0x80]),
            (-129, &[0xff, 0x7f]),
            (5678, &[0x16, 0x2e]),
        ];
        for (value, payload) in cases {
            let element = BerElement::integer(*value);
            assert_eq!(element.value(), *payload, "encoding of {value}");
            assert_eq!(element.as_integer().unwrap(), *value);
        }
    }

    #[test]
    fn integer_payload_bounds() {
        let empty = BerElement::from_parts(BerTag::INTEGER, vec![]);
        assert_eq!(empty.as_integer(), Err(BerError::IntegerLength(0)));
        let wide = BerElement::from_parts(BerTag::INTEGER, vec![0x01; 9]);
        assert_eq!(wide.as_integer(), Err(BerError::IntegerLength(9)));
    }

    #[test]
    fn boolean_canonical_and_liberal() {
        assert_eq!(BerElement::boolean(true).value(), &[0xff]);
        assert_eq!(BerElement::boolean(false).value(), &[0x00]);
        // Any non-zero payload octet decodes as true.
        let odd = BerElement::from_parts(BerTag::BOOLEAN, vec![0x01]);
        assert!(odd.as_boolean().unwrap());
    }

    #[test]
    fn boolean_wrong_length() {
        let two = BerElement::from_parts(BerTag::BOOLEAN, vec![0x00, 0x00]);
        assert_eq!(two.as_boolean(), Err(BerError::BooleanLength(2)));
        let none = BerElement::from_parts(BerTag::BOOLEAN, vec![]);
        assert_eq!(none.as_boolean(), Err(BerError::BooleanLength(0)));
    }

    #[test]
    fn sequence_roundtrip_preserves_order() {
        let seq = BerElement::sequence(vec![
            BerElement::octet_string(b"one".to_vec()),
            BerElement::integer(2).retag(BerTag::context(0)),
            BerElement::boolean(true),
        ]);
        let bytes = seq.encode();
        assert_eq!(bytes[0], 0x30);
        let decoded = BerElement::decode(&bytes).unwrap();
        assert_eq!(decoded, seq);
        let children = decoded.children().unwrap();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].as_utf8().unwrap(), "one");
        assert!(children[1].tag.is_context(0));
        assert_eq!(children[1].as_integer().unwrap(), 2);
    }

    #[test]
    fn long_form_length_roundtrip() {
        let payload = vec![0xab; 300];
        let element = BerElement::octet_string(payload.clone());
        let bytes = element.encode();
        assert_eq!(&bytes[..3], &[0x04, 0x82, 0x01]);
        let decoded = BerElement::decode(&bytes).unwrap();
        assert_eq!(decoded.value(), payload.as_slice());
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let mut bytes = BerElement::boolean(true).encode();
        bytes.push(0x00);
        assert_eq!(BerElement::decode(&bytes), Err(BerError::TrailingBytes));
    }

    #[test]
    fn decode_prefix_returns_remainder() {
        let mut bytes = BerElement::integer(7).encode();
        bytes.extend_from_slice(&BerElement::boolean(false).encode());
        let (first, rest) = BerElement::decode_prefix(&bytes).unwrap();
        assert_eq!(first.as_integer().unwrap(), 7);
        let (second, rest) = BerElement::decode_prefix(rest).unwrap();
        assert!(!second.as_boolean().unwrap());
        assert!(rest.is_empty());
    }

    #[test]
    fn children_of_primitive_fails() {
        let element = BerElement::octet_string(b"x".to_vec());
        assert_eq!(element.children(), Err(BerError::NotConstructed(0x04)));
    }

    #[test]
    fn children_with_inconsistent_length_fails() {
        // A sequence whose payload ends mid-child.
        let element = BerElement::from_parts(BerTag::SEQUENCE, vec![0x04, 0x05, 0xaa]);
        assert_eq!(element.children(), Err(BerError::Truncated));
    }

    #[test]
    fn utf8_validation() {
        let bad = BerElement::octet_string(vec![0xff, 0xfe]);
        assert_eq!(bad.as_utf8(), Err(BerError::InvalidUtf8));
    }
}
