//! Contract Test: Delete-Then-Create Ordering
//!
//! When the record holds a stale IP, the deletion batch is submitted and
//! polled to `done` before the creation batch is submitted. A failed
//! deletion stops the run; a failed creation leaves the name without a
//! record and is reported, not papered over.

mod common;

use common::*;
use dnssync_core::traits::{Change, MetadataKey, RecordSet};
use dnssync_core::{Error, ReconcileOutcome, ReconcileSettings, SyncDriver};
use std::net::Ipv4Addr;

fn run(store: &RecordingStore, ip: Ipv4Addr) -> (SyncDriver, RecordingFactory) {
    let factory = RecordingFactory::new(store.clone());
    let driver = SyncDriver::new(
        Box::new(ScriptedMetadata::new(ip)),
        Box::new(RecordingFactory::sharing_counters_with(&factory)),
        ReconcileSettings::default(),
    )
    .expect("driver construction succeeds");
    (driver, factory)
}

#[tokio::test(start_paused = true)]
async fn no_prior_record_creates_one_record() {
    let store = RecordingStore::new();
    let (driver, factory) = run(&store, Ipv4Addr::new(203, 0, 113, 5));

    let outcome = driver.run_once().await.unwrap();

    assert_eq!(
        outcome,
        ReconcileOutcome::Created {
            new_ip: Ipv4Addr::new(203, 0, 113, 5)
        }
    );
    assert_eq!(
        store.submitted_changes(),
        vec![Change::new().add(a_record(60, [203, 0, 113, 5]))]
    );
    assert_eq!(factory.last_project().as_deref(), Some(PROJECT));
}

#[tokio::test(start_paused = true)]
async fn changed_ip_deletes_then_creates_in_order() {
    let store = RecordingStore::new()
        .with_records(vec![a_record(60, [203, 0, 113, 5])])
        .script_polls(&[PollReply::Pending, PollReply::Done, PollReply::Done]);
    let (driver, _factory) = run(&store, Ipv4Addr::new(203, 0, 113, 9));

    let outcome = driver.run_once().await.unwrap();

    assert_eq!(
        outcome,
        ReconcileOutcome::Replaced {
            previous_ip: Ipv4Addr::new(203, 0, 113, 5),
            new_ip: Ipv4Addr::new(203, 0, 113, 9),
        }
    );
    assert_eq!(
        store.calls(),
        vec![
            StoreCall::List {
                zone: ZONE.to_string(),
                name: FQDN.to_string()
            },
            StoreCall::Submit {
                zone: ZONE.to_string(),
                change: Change::new().delete(a_record(60, [203, 0, 113, 5])),
            },
            StoreCall::Poll {
                change_id: "1".to_string()
            },
            StoreCall::Poll {
                change_id: "1".to_string()
            },
            StoreCall::Submit {
                zone: ZONE.to_string(),
                change: Change::new().add(a_record(60, [203, 0, 113, 9])),
            },
            StoreCall::Poll {
                change_id: "2".to_string()
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn deletion_carries_the_existing_ttl_and_value() {
    let store = RecordingStore::new().with_records(vec![a_record(300, [198, 51, 100, 7])]);
    let (driver, _factory) = run(&store, Ipv4Addr::new(198, 51, 100, 8));

    driver.run_once().await.unwrap();

    let changes = store.submitted_changes();
    assert_eq!(changes[0].deletions, vec![a_record(300, [198, 51, 100, 7])]);
    assert!(changes[0].additions.is_empty());
    assert_eq!(changes[1].additions, vec![a_record(60, [198, 51, 100, 8])]);
    assert!(changes[1].deletions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn exactly_one_record_remains_after_a_successful_run() {
    let store = RecordingStore::new().with_records(vec![a_record(300, [203, 0, 113, 5])]);
    let (driver, _factory) = run(&store, Ipv4Addr::new(203, 0, 113, 9));

    driver.run_once().await.unwrap();

    assert_eq!(store.zone_records(), vec![a_record(60, [203, 0, 113, 9])]);
}

#[tokio::test(start_paused = true)]
async fn rejected_deletion_aborts_before_creation() {
    let store = RecordingStore::new()
        .with_records(vec![a_record(60, [203, 0, 113, 5])])
        .reject_submission(0);
    let (driver, _factory) = run(&store, Ipv4Addr::new(203, 0, 113, 9));

    let err = driver.run_once().await.unwrap_err();

    assert!(matches!(err, Error::Submission(_)));
    assert_eq!(store.submitted_changes().len(), 1);
    assert_eq!(store.poll_count(), 0);
    assert_eq!(store.zone_records(), vec![a_record(60, [203, 0, 113, 5])]);
}

#[tokio::test(start_paused = true)]
async fn rejected_creation_leaves_name_without_record() {
    let store = RecordingStore::new()
        .with_records(vec![a_record(60, [203, 0, 113, 5])])
        .reject_submission(1);
    let (driver, _factory) = run(&store, Ipv4Addr::new(203, 0, 113, 9));

    let err = driver.run_once().await.unwrap_err();

    assert!(matches!(err, Error::Submission(_)));
    assert!(store.zone_records().is_empty());
}

#[tokio::test(start_paused = true)]
async fn multi_value_record_is_not_collapsed() {
    let round_robin = RecordSet {
        rrdatas: vec!["203.0.113.5".to_string(), "203.0.113.6".to_string()],
        ..a_record(60, [203, 0, 113, 5])
    };
    let store = RecordingStore::new().with_records(vec![round_robin.clone()]);
    let (driver, _factory) = run(&store, Ipv4Addr::new(203, 0, 113, 9));

    let err = driver.run_once().await.unwrap_err();

    assert!(matches!(err, Error::UnsupportedRecordState(_)));
    assert!(store.submitted_changes().is_empty());
    assert_eq!(store.zone_records(), vec![round_robin]);
}

#[tokio::test(start_paused = true)]
async fn domain_with_trailing_dot_targets_the_same_name() {
    let store = RecordingStore::new();
    let factory = RecordingFactory::new(store.clone());
    let driver = SyncDriver::new(
        Box::new(
            ScriptedMetadata::new(Ipv4Addr::new(203, 0, 113, 5))
                .with(MetadataKey::Domain, "example.com."),
        ),
        Box::new(RecordingFactory::sharing_counters_with(&factory)),
        ReconcileSettings::default(),
    )
    .unwrap();

    driver.run_once().await.unwrap();

    assert_eq!(store.zone_records(), vec![a_record(60, [203, 0, 113, 5])]);
}
