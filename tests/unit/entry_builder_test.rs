//! Unit tests for session entry validation.

use chrono::{TimeZone, Utc};
use trainlog::session::builder::{RawFields, SessionEntryBuilder, ValidationError};
use trainlog::session::types::Phase;

fn builder() -> SessionEntryBuilder {
    SessionEntryBuilder::new().with_clock(|| Utc.with_ymd_and_hms(2025, 4, 10, 17, 45, 0).unwrap())
}

#[test]
fn test_condition_entry_fields() {
    let raw = RawFields::condition(
        "윤영철",
        Phase::Maintenance,
        6,
        2,
        Some("왼쪽 햄스트링 타이트함".to_string()),
    );
    let entry = builder().build(raw).unwrap();

    assert_eq!(entry.player_id, "윤영철");
    assert_eq!(entry.phase, Phase::Maintenance);
    assert_eq!(entry.rpe, Some(6));
    assert_eq!(entry.pain, Some(2));
    assert_eq!(entry.note.as_deref(), Some("왼쪽 햄스트링 타이트함"));
    assert_eq!(entry.timestamp, Utc.with_ymd_and_hms(2025, 4, 10, 17, 45, 0).unwrap());
    assert!(!entry.has_power_test());
}

#[test]
fn test_rpe_boundaries() {
    let b = builder();
    assert!(b.build(RawFields::condition("A", Phase::Power, 1, 0, None)).is_ok());
    assert!(b.build(RawFields::condition("A", Phase::Power, 10, 10, None)).is_ok());
    assert_eq!(
        b.build(RawFields::condition("A", Phase::Power, 0, 0, None)),
        Err(ValidationError::OutOfRange("rpe"))
    );
    assert_eq!(
        b.build(RawFields::condition("A", Phase::Power, 11, 0, None)),
        Err(ValidationError::OutOfRange("rpe"))
    );
}

#[test]
fn test_pain_boundaries() {
    let b = builder();
    assert!(b.build(RawFields::condition("A", Phase::Power, 5, 0, None)).is_ok());
    assert_eq!(
        b.build(RawFields::condition("A", Phase::Power, 5, -1, None)),
        Err(ValidationError::OutOfRange("pain"))
    );
}

#[test]
fn test_combined_entry_allowed() {
    let mut raw = RawFields::condition("A", Phase::Power, 8, 1, None);
    raw.jump_height_cm = Some(55.0);
    raw.ttpf_ms = Some(170.0);

    let entry = builder().build(raw).unwrap();
    assert!(entry.has_power_test());
    assert_eq!(entry.rpe, Some(8));
    assert_eq!(entry.peak_force_n, None);
}

#[test]
fn test_power_test_without_scores() {
    let raw = RawFields::power_test("B", None, Some(2500.0), None);
    let entry = builder().build(raw).unwrap();
    assert_eq!(entry.pain, None);
    assert_eq!(entry.peak_force_n, Some(2500.0));
}

#[test]
fn test_entry_needs_a_measurement() {
    let raw = RawFields::power_test("B", None, None, None);
    assert_eq!(builder().build(raw), Err(ValidationError::MissingRequired("rpe")));
}

#[test]
fn test_raw_fields_from_json() {
    let raw: RawFields = serde_json::from_str(
        r#"{"player_id": "나성범", "phase": "strength", "rpe": 7, "pain": 0}"#,
    )
    .unwrap();
    let entry = builder().build(raw).unwrap();
    assert_eq!(entry.phase, Phase::Strength);
    assert_eq!(entry.note, None);
}

#[test]
fn test_error_messages_name_field() {
    let err = ValidationError::OutOfRange("rpe");
    assert!(err.to_string().contains("rpe"));
    let err = ValidationError::MissingRequired("player_id");
    assert!(err.to_string().contains("player_id"));
}
