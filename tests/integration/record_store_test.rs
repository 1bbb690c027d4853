//! Integration tests for the record store contract.

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use trainlog::metrics::trends::TrendAggregator;
use trainlog::session::builder::{RawFields, SessionEntryBuilder};
use trainlog::session::types::Phase;
use trainlog::storage::backend::MemoryBackend;
use trainlog::storage::record_store::{RecordStore, StoreError, DEFAULT_WORKSHEET};
use trainlog::storage::table::Table;

#[tokio::test]
async fn test_two_entry_scenario() {
    let t1 = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
    let t2 = t1 + Duration::minutes(5);

    let store = RecordStore::with_defaults(Arc::new(MemoryBackend::new()));

    let first = SessionEntryBuilder::new()
        .with_clock(move || t1)
        .build(RawFields::condition("A", Phase::Power, 7, 1, None))
        .unwrap();
    let second = SessionEntryBuilder::new()
        .with_clock(move || t2)
        .build(RawFields::condition("B", Phase::Strength, 4, 0, None))
        .unwrap();

    store.append(&first).await.unwrap();
    store.append(&second).await.unwrap();

    let rows = store.read_all().await.unwrap();
    assert_eq!(rows, vec![first, second]);

    let summary = TrendAggregator::new().summary(&rows);
    assert_eq!(summary.len(), 2);
    assert_eq!(summary["A"].count, 1);
    assert_eq!(summary["A"].mean_rpe, Some(7.0));
    assert_eq!(summary["A"].mean_pain, Some(1.0));
    assert_eq!(summary["B"].count, 1);
    assert_eq!(summary["B"].mean_rpe, Some(4.0));
    assert_eq!(summary["B"].mean_pain, Some(0.0));
}

#[tokio::test]
async fn test_append_extends_prior_set_in_order() {
    let store = RecordStore::with_defaults(Arc::new(MemoryBackend::new()));
    let builder = SessionEntryBuilder::new();

    let mut expected = Vec::new();
    for (i, player) in ["김도영", "양현종", "나성범", "윤영철", "김도영"].iter().enumerate() {
        let prior = store.read_all().await.unwrap();
        assert_eq!(prior, expected);

        let mut raw = RawFields::condition(*player, Phase::Strength, (i as i64 % 10) + 1, 0, None);
        if i % 2 == 1 {
            raw.jump_height_cm = Some(40.0 + i as f64 * 0.7);
            raw.note = Some(format!("set {}, \"heavy\"", i));
        }
        let entry = builder.build(raw).unwrap();
        store.append(&entry).await.unwrap();
        expected.push(entry);
    }

    assert_eq!(store.read_all().await.unwrap(), expected);
}

#[tokio::test]
async fn test_connectivity_failure_during_append_keeps_rows() {
    let backend = Arc::new(MemoryBackend::new());
    let store = RecordStore::with_defaults(backend.clone());
    let builder = SessionEntryBuilder::new();

    for player in ["A", "B", "C"] {
        let entry = builder
            .build(RawFields::condition(player, Phase::Power, 6, 0, None))
            .unwrap();
        store.append(&entry).await.unwrap();
    }
    let before = backend.snapshot(DEFAULT_WORKSHEET).unwrap();

    backend.set_fail_reads(true);
    let entry = builder
        .build(RawFields::condition("D", Phase::Power, 6, 0, None))
        .unwrap();
    let err = store.append(&entry).await.unwrap_err();
    assert!(matches!(err, StoreError::BackendUnavailable(_)));

    assert_eq!(backend.snapshot(DEFAULT_WORKSHEET), Some(before));

    backend.set_fail_reads(false);
    assert_eq!(store.read_all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_read_failure_is_an_error_not_empty() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_fail_reads(true);
    let store = RecordStore::with_defaults(backend);

    assert!(matches!(
        store.read_all().await,
        Err(StoreError::BackendUnavailable(_))
    ));
}

#[tokio::test]
async fn test_legacy_condition_sheet_is_readable_and_appendable() {
    let mut table = Table::new(
        ["날짜", "선수명", "단계", "RPE", "통증", "메모"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    table.rows.push(
        ["2025-01-03 18:02:11", "김도영", "Power", "8", "1", ""]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    let backend = Arc::new(MemoryBackend::with_sheet(DEFAULT_WORKSHEET, table));
    let store = RecordStore::with_defaults(backend.clone());

    let existing = store.read_all().await.unwrap();
    assert_eq!(existing.len(), 1);
    assert_eq!(existing[0].rpe, Some(8));

    let entry = SessionEntryBuilder::new()
        .build(RawFields::condition("양현종", Phase::Strength, 5, 0, None))
        .unwrap();
    store.append(&entry).await.unwrap();

    let sheet = backend.snapshot(DEFAULT_WORKSHEET).unwrap();
    assert_eq!(sheet.columns[0], "날짜");
    assert_eq!(sheet.rows.len(), 2);
    assert_eq!(sheet.rows[0][0], "2025-01-03 18:02:11");
    assert_eq!(store.read_all().await.unwrap()[1], entry);

    // A power test does not fit the condition-only header.
    let power = SessionEntryBuilder::new()
        .build(RawFields::power_test("양현종", Some(50.0), None, None))
        .unwrap();
    assert!(matches!(
        store.append(&power).await,
        Err(StoreError::SchemaMismatch(_))
    ));
    assert_eq!(backend.snapshot(DEFAULT_WORKSHEET).unwrap().rows.len(), 2);
}
