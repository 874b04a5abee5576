//! Strict versus non-strict JSON decoding, and equivalence of the
//! `value-json` and `value-base64` representations.

use ldapext_controls::assured_replication::{
    AssuredReplicationLocalLevel, AssuredReplicationRemoteLevel,
    AssuredReplicationRequestControl,
};
use ldapext_controls::matching_entry_count::MatchingEntryCountRequestControl;
use ldapext_controls::{decode_json_control, ControlError, ControlType, DecodedControl};
use serde_json::{json, Value};

fn sample_control() -> AssuredReplicationRequestControl {
    AssuredReplicationRequestControl::new(
        Some(AssuredReplicationLocalLevel::ReceivedAnyServer),
        Some(AssuredReplicationRemoteLevel::ReceivedAnyRemoteLocation),
        Some(5678),
        true,
    )
}

#[test]
fn base64_and_value_json_decode_identically() {
    let control = sample_control();
    let raw = control.to_control();

    let via_json =
        AssuredReplicationRequestControl::from_json(&control.to_json(), true).unwrap();

    let base64_form = json!({
        "oid": AssuredReplicationRequestControl::OID,
        "criticality": control.criticality(),
        "value-base64": base64_of(raw.value().unwrap()),
    });
    let via_base64 =
        AssuredReplicationRequestControl::from_json(&base64_form, true).unwrap();

    assert_eq!(via_json, via_base64);
    assert_eq!(via_base64, control);
}

fn base64_of(bytes: &[u8]) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    STANDARD.encode(bytes)
}

#[test]
fn strict_rejects_extra_field_in_value_object() {
    let control = sample_control();
    let mut value = control.to_json();
    value["value-json"]["minimum-level"] = Value::String("none".into());

    let err = AssuredReplicationRequestControl::from_json(&value, true).unwrap_err();
    assert_eq!(
        err,
        ControlError::UnknownJsonField {
            oid: AssuredReplicationRequestControl::OID.to_string(),
            field: "minimum-level".to_string(),
        }
    );

    // Non-strict mode ignores the extra field and recovers every
    // recognized one.
    let decoded = AssuredReplicationRequestControl::from_json(&value, false).unwrap();
    assert_eq!(decoded, control);
}

#[test]
fn strict_rejects_extra_top_level_field_via_dispatch() {
    let control = MatchingEntryCountRequestControl::default();
    let mut value = control.to_json();
    value["comment"] = Value::String("from the capture".into());

    assert!(decode_json_control(&value, true).is_err());
    let decoded = decode_json_control(&value, false).unwrap();
    assert_eq!(decoded, DecodedControl::MatchingEntryCountRequest(control));
}

#[test]
fn invalid_enum_value_fails_in_both_modes() {
    let value = json!({
        "oid": AssuredReplicationRequestControl::OID,
        "criticality": true,
        "value-json": {"local-level": "invalid"},
    });
    assert!(AssuredReplicationRequestControl::from_json(&value, true).is_err());
    assert!(AssuredReplicationRequestControl::from_json(&value, false).is_err());

    // With a legal value substituted the same object decodes.
    let value = json!({
        "oid": AssuredReplicationRequestControl::OID,
        "criticality": true,
        "value-json": {"local-level": "processed-all-servers"},
    });
    let decoded = AssuredReplicationRequestControl::from_json(&value, true).unwrap();
    assert_eq!(
        decoded.local_level(),
        Some(AssuredReplicationLocalLevel::ProcessedAllServers)
    );
    assert!(!decoded.send_response_immediately());
}

#[test]
fn typo_field_fails_strict_then_decodes_without_it() {
    let value = json!({
        "oid": AssuredReplicationRequestControl::OID,
        "criticality": true,
        "value-json": {
            "local-levle": "none",
            "timeout-millis": 1000,
        },
    });
    let err = AssuredReplicationRequestControl::from_json(&value, true).unwrap_err();
    assert!(matches!(err, ControlError::UnknownJsonField { .. }));

    let value = json!({
        "oid": AssuredReplicationRequestControl::OID,
        "criticality": true,
        "value-json": {
            "local-level": "none",
            "timeout-millis": 1000,
        },
    });
    let decoded = AssuredReplicationRequestControl::from_json(&value, true).unwrap();
    assert_eq!(decoded.local_level(), Some(AssuredReplicationLocalLevel::None));
    assert_eq!(decoded.timeout_millis(), Some(1000));
}

#[test]
fn missing_criticality_is_rejected() {
    let value = json!({
        "oid": AssuredReplicationRequestControl::OID,
        "value-json": {"send-response-immediately": false},
    });
    assert!(matches!(
        AssuredReplicationRequestControl::from_json(&value, false).unwrap_err(),
        ControlError::InvalidJson { .. }
    ));
}

#[test]
fn both_value_forms_at_once_are_rejected() {
    let control = sample_control();
    let raw = control.to_control();
    let mut value = control.to_json();
    value["value-base64"] = Value::String(base64_of(raw.value().unwrap()));

    assert!(matches!(
        AssuredReplicationRequestControl::from_json(&value, false).unwrap_err(),
        ControlError::InvalidJson { .. }
    ));
}

#[test]
fn malformed_base64_is_rejected() {
    let value = json!({
        "oid": AssuredReplicationRequestControl::OID,
        "criticality": true,
        "value-base64": "not!!base64",
    });
    assert!(matches!(
        AssuredReplicationRequestControl::from_json(&value, false).unwrap_err(),
        ControlError::InvalidJson { .. }
    ));
}

#[test]
fn base64_body_still_runs_ber_validation() {
    // A syntactically valid base64 string holding an invalid BER value.
    let value = json!({
        "oid": AssuredReplicationRequestControl::OID,
        "criticality": true,
        "value-base64": base64_of(&[0xff, 0x00, 0x01]),
    });
    assert!(matches!(
        AssuredReplicationRequestControl::from_json(&value, true).unwrap_err(),
        ControlError::Ber { .. } | ControlError::UnexpectedElement { .. }
    ));
}
