//! Integration tests for the submit / read-back flow.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use trainlog::session::builder::{RawFields, SessionEntryBuilder, ValidationError};
use trainlog::session::types::{Metric, Phase};
use trainlog::storage::backend::MemoryBackend;
use trainlog::storage::config::{AppConfig, BackendKind};
use trainlog::storage::record_store::{RecordStore, StoreError, DEFAULT_WORKSHEET};
use trainlog::{SubmitError, TrainingLog};

#[tokio::test]
async fn test_submit_then_summary() {
    let log = TrainingLog::new(
        SessionEntryBuilder::new(),
        RecordStore::with_defaults(Arc::new(MemoryBackend::new())),
    );

    log.submit(RawFields::condition("A", Phase::Power, 7, 1, None))
        .await
        .unwrap();
    log.submit(RawFields::condition("A", Phase::Power, 9, 3, None))
        .await
        .unwrap();
    log.submit(RawFields::power_test("A", Some(48.0), Some(2200.0), Some(195.0)))
        .await
        .unwrap();

    let summary = log.summary().await.unwrap();
    assert_eq!(summary["A"].count, 3);
    assert_eq!(summary["A"].mean_rpe, Some(8.0));
    assert_eq!(summary["A"].mean_pain, Some(2.0));
    assert_eq!(summary["A"].max_jump_height_cm, Some(48.0));

    let series = log.series("A", Metric::Rpe).await.unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(log.compare(Metric::Ttpf).await.unwrap()["A"].len(), 1);
}

#[tokio::test]
async fn test_validation_error_writes_nothing() {
    let backend = Arc::new(MemoryBackend::new());
    let log = TrainingLog::new(
        SessionEntryBuilder::new(),
        RecordStore::with_defaults(backend.clone()),
    );

    let err = log
        .submit(RawFields::condition("A", Phase::Power, 11, 0, None))
        .await
        .unwrap_err();
    assert_eq!(err, SubmitError::Validation(ValidationError::OutOfRange("rpe")));
    assert!(backend.snapshot(DEFAULT_WORKSHEET).is_none());
}

#[tokio::test]
async fn test_queued_submissions() {
    let backend = Arc::new(MemoryBackend::new());
    let log = TrainingLog::with_queue(
        SessionEntryBuilder::new(),
        RecordStore::with_defaults(backend.clone()),
    );

    for rpe in 1..=5 {
        log.submit(RawFields::condition("B", Phase::Maintenance, rpe, 0, None))
            .await
            .unwrap();
    }
    let rpes: Vec<Option<u8>> = log
        .entries()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.rpe)
        .collect();
    assert_eq!(rpes, vec![Some(1), Some(2), Some(3), Some(4), Some(5)]);

    backend.set_fail_reads(true);
    let err = log
        .submit(RawFields::condition("B", Phase::Maintenance, 6, 0, None))
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::Store(StoreError::BackendUnavailable(_))));

    log.close().await;
    backend.set_fail_reads(false);
    assert_eq!(backend.snapshot(DEFAULT_WORKSHEET).unwrap().rows.len(), 5);
}

#[tokio::test]
async fn test_from_config_csv_backend() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    config.store.backend = BackendKind::Csv;
    config.store.serialize_writes = false;

    let log = TrainingLog::from_config(&config, config.open_store().unwrap());
    log.submit(RawFields::condition("김도영", Phase::Strength, 5, 0, None))
        .await
        .unwrap();

    assert!(dir.path().join("sheets").join("Sheet1.csv").exists());
    assert_eq!(log.entries().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_condition_report_and_latest() {
    let day1 = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
    let times = [day1, day1 + Duration::hours(8), day1 + Duration::days(1)];
    let backend = Arc::new(MemoryBackend::new());
    let store = RecordStore::with_defaults(backend);

    let scores = [(6, 2), (8, 4), (5, 1)];
    for (at, (rpe, pain)) in times.iter().zip(scores) {
        let at = *at;
        let log = TrainingLog::new(
            SessionEntryBuilder::new().with_clock(move || at),
            store.clone(),
        );
        log.submit(RawFields::condition("김도영", Phase::Strength, rpe, pain, None))
            .await
            .unwrap();
    }
    let log = TrainingLog::new(SessionEntryBuilder::new(), store);
    log.submit(RawFields::condition("양현종", Phase::Power, 9, 0, None))
        .await
        .unwrap();

    let report = log.condition_report("김도영").await.unwrap();
    assert_eq!(report.len(), 2);
    assert_eq!(report[0].date, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
    assert_eq!(report[0].sessions, 2);
    assert_eq!(report[0].mean_rpe, Some(7.0));
    assert_eq!(report[0].mean_pain, Some(3.0));
    assert_eq!(report[1].sessions, 1);
    assert_eq!(report[1].mean_rpe, Some(5.0));
    assert!(log.condition_report("나성범").await.unwrap().is_empty());

    let latest = log.latest("김도영").await.unwrap().unwrap();
    assert_eq!(latest.timestamp, times[2]);
    assert_eq!(latest.rpe, Some(5));
    assert!(log.latest("나성범").await.unwrap().is_none());
}
