//! ASN.1 BER element encoding/decoding for LDAP protocol extensions.
//!
//! This crate provides the tag-length-value layer that LDAP control and
//! extended-operation values are built from. It deliberately covers only
//! what the LDAP wire format uses: definite lengths, low tag numbers, and
//! the primitive types that appear inside control values.
//!
//! # Overview
//!
//! - [`BerTag`] - A tag class, constructed flag, and tag number
//! - [`BerElement`] - One tagged value, primitive or constructed
//! - [`BerReader`] - Reads elements from a byte slice with cursor tracking
//!
//! # Example
//!
//! ```
//! use ldapext_ber::{BerElement, BerTag};
//!
//! let seq = BerElement::sequence(vec![
//!     BerElement::octet_string(b"dc=example,dc=com".to_vec()),
//!     BerElement::boolean(true).retag(BerTag::context(2)),
//! ]);
//! let bytes = seq.encode();
//!
//! let decoded = BerElement::decode(&bytes).unwrap();
//! let children = decoded.children().unwrap();
//! assert_eq!(children.len(), 2);
//! assert!(children[1].as_boolean().unwrap());
//! ```

mod element;
mod error;
mod reader;
mod tag;

pub use element::BerElement;
pub use error::BerError;
pub use reader::BerReader;
pub use tag::{BerTag, TagClass};
