//! BER encoder/decoder error type.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BerError {
    #[error("unexpected end of input")]
    Truncated,
    #[error("trailing bytes after element")]
    TrailingBytes,
    #[error("high-tag-number form is not supported")]
    HighTagNumber,
    #[error("indefinite lengths are not supported")]
    IndefiniteLength,
    #[error("length encoded in {0} octets is too long")]
    LengthTooLong(usize),
    #[error("element with tag {0:#04x} is not constructed")]
    NotConstructed(u8),
    #[error("boolean value must be exactly one octet, got {0}")]
    BooleanLength(usize),
    #[error("integer value must be between 1 and 8 octets, got {0}")]
    IntegerLength(usize),
    #[error("octet string is not valid UTF-8")]
    InvalidUtf8,
}
