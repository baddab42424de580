//! Contract tests for create/update reconciliation.
//!
//! Covers idempotent creates, zone authorization, zone selection,
//! dedup-by-recency, and the best-effort batch policy.

mod common;

use common::*;
use dockdns_core::error::Error;
use dockdns_core::manager::Manager;
use dockdns_core::record::{RecordState, RecordType};

#[tokio::test]
async fn repeated_identical_create_yields_one_present_record() {
    let adapter = MockZoneAdapter::new();
    let manager = Manager::new(vec![provider("cf", &["example.com"], adapter.clone())]);

    let request = intent("app.example.com", "cf", "10.0.0.1", "c1");
    manager.create_record(request.clone()).await.unwrap();
    manager.create_record(request).await.unwrap();

    let records = manager.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].state, RecordState::Present);
    assert_eq!(records[0].value, "10.0.0.1");
    assert_eq!(records[0].record_type, RecordType::A);
    assert_eq!(adapter.append_calls(), 2);
}

#[tokio::test]
async fn hostname_outside_zone_filters_is_rejected() {
    let adapter = MockZoneAdapter::new();
    let manager = Manager::new(vec![provider("cf", &["example.com"], adapter.clone())]);

    let err = manager
        .create_record(intent("app.different.com", "cf", "10.0.0.1", "c1"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ZoneUnauthorized { .. }));
    assert_eq!(adapter.append_calls(), 0, "adapter must not be called");
    assert!(manager.records().await.is_empty());
}

#[tokio::test]
async fn unknown_provider_is_rejected() {
    let manager = Manager::new(vec![]);

    let err = manager
        .create_record(intent("app.example.com", "nope", "10.0.0.1", "c1"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ProviderNotFound(_)));
}

#[tokio::test]
async fn most_specific_zone_owns_the_record() {
    let adapter = MockZoneAdapter::new();
    let manager = Manager::new(vec![provider(
        "cf",
        &["example.com", "sub.example.com"],
        adapter.clone(),
    )]);

    manager
        .create_record(intent("app.sub.example.com", "cf", "10.0.0.1", "c1"))
        .await
        .unwrap();

    let appended = adapter.appended();
    assert_eq!(appended.len(), 1);
    let (zone, names) = &appended[0];
    assert_eq!(zone, "sub.example.com");
    assert_eq!(names, &vec!["app".to_string()]);
}

#[tokio::test]
async fn non_ip_target_is_rejected() {
    let adapter = MockZoneAdapter::new();
    let manager = Manager::new(vec![provider("cf", &["example.com"], adapter.clone())]);

    let err = manager
        .create_record(intent("app.example.com", "cf", "upstream.example.com", "c1"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidTarget(_)));
    assert_eq!(adapter.append_calls(), 0);
}

#[tokio::test]
async fn omitted_ttl_defaults_to_300() {
    let adapter = MockZoneAdapter::new();
    let manager = Manager::new(vec![provider("cf", &["example.com"], adapter.clone())]);

    manager
        .create_record(intent("app.example.com", "cf", "10.0.0.1", "c1"))
        .await
        .unwrap();

    let records = manager.records().await;
    assert_eq!(records[0].ttl, 300);
}

#[tokio::test]
async fn explicit_ttl_is_kept() {
    let adapter = MockZoneAdapter::new();
    let manager = Manager::new(vec![provider("cf", &["example.com"], adapter.clone())]);

    let mut request = intent("app.example.com", "cf", "10.0.0.1", "c1");
    request.ttl = Some(60);
    manager.create_record(request).await.unwrap();

    assert_eq!(manager.records().await[0].ttl, 60);
}

#[tokio::test]
async fn provider_assigned_id_is_captured_when_offered() {
    let adapter = MockZoneAdapter::with_assigned_id("rec-123");
    let manager = Manager::new(vec![provider("cf", &["example.com"], adapter.clone())]);

    manager
        .create_record(intent("app.example.com", "cf", "10.0.0.1", "c1"))
        .await
        .unwrap();

    assert_eq!(manager.records().await[0].id.as_deref(), Some("rec-123"));

    // No id offered is not an error.
    let bare = MockZoneAdapter::new();
    let manager = Manager::new(vec![provider("cf", &["example.com"], bare)]);
    manager
        .create_record(intent("app.example.com", "cf", "10.0.0.1", "c1"))
        .await
        .unwrap();
    assert_eq!(manager.records().await[0].id, None);
}

#[tokio::test]
async fn failed_create_is_tracked_in_error_state() {
    let adapter = MockZoneAdapter::new();
    adapter.fail_append(true);
    let manager = Manager::new(vec![provider("cf", &["example.com"], adapter.clone())]);

    let err = manager
        .create_record(intent("app.example.com", "cf", "10.0.0.1", "c1"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Adapter { .. }));

    // The attempted value is retained so the next pass retries it.
    let records = manager.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].state, RecordState::Error);
    assert_eq!(records[0].value, "10.0.0.1");

    // A later successful pass flips the same key to present.
    adapter.fail_append(false);
    manager
        .create_record(intent("app.example.com", "cf", "10.0.0.1", "c1"))
        .await
        .unwrap();
    let records = manager.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].state, RecordState::Present);
}

#[tokio::test]
async fn sync_applies_only_the_most_recent_duplicate() {
    let adapter = MockZoneAdapter::new();
    let manager = Manager::new(vec![provider("cf", &["example.com"], adapter.clone())]);

    manager
        .sync(vec![
            intent_at("app.example.com", "cf", "10.0.0.1", "c1", 100),
            intent_at("app.example.com", "cf", "10.0.0.2", "c2", 200),
        ])
        .await
        .unwrap();

    assert_eq!(adapter.append_calls(), 1, "exactly one create for the key");
    let records = manager.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value, "10.0.0.2");
    assert_eq!(records[0].source_id, "c2");
}

#[tokio::test]
async fn sync_tie_break_on_equal_timestamps_is_deterministic() {
    for _ in 0..4 {
        let adapter = MockZoneAdapter::new();
        let manager = Manager::new(vec![provider("cf", &["example.com"], adapter)]);

        manager
            .sync(vec![
                intent_at("app.example.com", "cf", "10.0.0.1", "aaa", 100),
                intent_at("app.example.com", "cf", "10.0.0.2", "zzz", 100),
            ])
            .await
            .unwrap();

        let records = manager.records().await;
        assert_eq!(records[0].source_id, "zzz");
    }
}

#[tokio::test]
async fn sync_is_best_effort_and_reports_failures_jointly() {
    let good = MockZoneAdapter::new();
    let bad = MockZoneAdapter::new();
    bad.fail_append(true);

    let manager = Manager::new(vec![
        provider("good", &["example.com"], good.clone()),
        provider("bad", &["example.org"], bad.clone()),
    ]);

    let err = manager
        .sync(vec![
            intent("a.example.org", "bad", "10.0.0.1", "c1"),
            intent("b.example.com", "good", "10.0.0.2", "c1"),
            intent("c.example.org", "bad", "10.0.0.3", "c1"),
        ])
        .await
        .unwrap_err();

    // Both failures reported; the healthy provider still got its record.
    match err {
        Error::Aggregate(errors) => assert_eq!(errors.len(), 2),
        other => panic!("expected aggregate error, got {other}"),
    }
    assert_eq!(good.append_calls(), 1);

    let records = manager.records().await;
    assert_eq!(records.len(), 3);
    let present = records
        .iter()
        .filter(|r| r.state == RecordState::Present)
        .count();
    let errored = records
        .iter()
        .filter(|r| r.state == RecordState::Error)
        .count();
    assert_eq!((present, errored), (1, 2));
}

#[tokio::test]
async fn snapshot_is_a_value_copy() {
    let adapter = MockZoneAdapter::new();
    let manager = Manager::new(vec![provider("cf", &["example.com"], adapter)]);

    manager
        .create_record(intent("app.example.com", "cf", "10.0.0.1", "c1"))
        .await
        .unwrap();

    let mut snapshot = manager.records().await;
    snapshot[0].value = "changed".to_string();
    snapshot.clear();

    let fresh = manager.records().await;
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh[0].value, "10.0.0.1");
}

#[tokio::test]
async fn hostname_matching_is_case_insensitive() {
    let adapter = MockZoneAdapter::new();
    let manager = Manager::new(vec![provider("cf", &["Example.COM"], adapter.clone())]);

    manager
        .create_record(intent("App.Example.com", "cf", "10.0.0.1", "c1"))
        .await
        .unwrap();

    let records = manager.records().await;
    assert_eq!(records[0].hostname, "app.example.com");
}
