//! Typed LDAP request/response controls with BER and JSON codecs.
//!
//! LDAP controls travel on the wire as an (OID, criticality, opaque value)
//! triple per RFC 4511 section 4.1.11; the value's internal structure is a
//! BER SEQUENCE specific to each control type. This crate models that
//! triple as [`RawControl`], gives each supported control a strongly-typed
//! struct implementing [`ControlType`], and adds a parallel JSON
//! representation of the same fields for tooling and logging, with strict
//! and non-strict unknown-field policies.
//!
//! # Overview
//!
//! - [`RawControl`] - The generic triple the transport layer exchanges
//! - [`ControlType`] - BER and JSON codec contract for one control type
//! - [`ControlRegistry`] / [`DecodedControl`] - OID-driven generic dispatch
//! - [`get`] / [`get_all`] - Typed lookup over a list of raw controls
//! - [`RawExtendedOperation`] / [`ExtendedOperationType`] - The same model
//!   for extended-operation values
//!
//! # Example
//!
//! ```
//! use ldapext_controls::{get, ControlType};
//! use ldapext_controls::assured_replication::{
//!     AssuredReplicationLocalLevel, AssuredReplicationRequestControl,
//! };
//!
//! let control = AssuredReplicationRequestControl::new(
//!     Some(AssuredReplicationLocalLevel::ProcessedAllServers),
//!     None,
//!     Some(5000),
//!     false,
//! );
//! let raw = control.to_control();
//!
//! // A response carrying the control, as the transport would hand it over.
//! let controls = vec![raw];
//! let decoded: AssuredReplicationRequestControl = get(&controls).unwrap().unwrap();
//! assert_eq!(decoded.timeout_millis(), Some(5000));
//! ```

mod codec;
mod control;
mod error;
mod json;
mod registry;

pub mod assured_replication;
pub mod extop;
pub mod intermediate_client;
pub mod matching_entry_count;
pub mod operation_purpose;
pub mod route_to_backend_set;
pub mod soft_delete;

pub use control::{get, get_all, ControlType, RawControl};
pub use error::{ControlError, ResultCode};
pub use extop::{ExtendedOperationType, RawExtendedOperation};
pub use registry::{
    control_from_json, control_to_json, decode_control, decode_json_control, BerDecodeFn,
    ControlRegistry, DecodedControl, JsonDecodeFn,
};
