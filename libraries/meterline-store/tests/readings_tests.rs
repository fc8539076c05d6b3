//! Integration tests for the readings vertical slice
//!
//! Covers deduplication by local_id, pending lookup, sync bookkeeping,
//! and the 7-day retention sweep.


use meterline_core::types::ValidationStatus;
use meterline_store::readings;
use test_helpers::*;

#[tokio::test]
async fn test_save_and_get_reading() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    let mut reading = test_reading("meter-1", 123.5);
    reading.note = Some("gate was open".to_string());
    reading.validation_status = ValidationStatus::Valid;
    reading.validation_messages = vec!["First reading for this meter".to_string()];

    readings::save(pool, &reading).await.expect("Failed to save");

    let stored = readings::get(pool, &reading.local_id)
        .await
        .expect("Failed to get")
        .expect("Reading not found");

    assert_eq!(stored.local_id, reading.local_id);
    assert_eq!(stored.value, 123.5);
    assert_eq!(stored.note.as_deref(), Some("gate was open"));
    assert_eq!(stored.validation_status, ValidationStatus::Valid);
    assert_eq!(stored.validation_messages.len(), 1);
    assert!(!stored.synced);
}

#[tokio::test]
async fn test_duplicate_local_id_last_write_wins() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    let mut reading = test_reading("meter-1", 100.0);
    readings::save(pool, &reading).await.expect("first save");

    reading.value = 150.0;
    readings::save(pool, &reading).await.expect("second save");

    let pending = readings::get_pending(pool).await.expect("get pending");
    assert_eq!(pending.len(), 1, "same local_id must not duplicate");
    assert_eq!(pending[0].value, 150.0);
}

#[tokio::test]
async fn test_get_pending_excludes_synced() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    let a = test_reading("meter-1", 10.0);
    let b = test_reading("meter-2", 20.0);
    readings::save(pool, &a).await.unwrap();
    readings::save(pool, &b).await.unwrap();

    readings::mark_synced(pool, &[a.local_id.clone()]).await.unwrap();

    let pending = readings::get_pending(pool).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].local_id, b.local_id);

    assert_eq!(readings::count_pending(pool).await.unwrap(), 1);
}

#[tokio::test]
async fn test_mark_synced_skips_missing_ids() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    let reading = test_reading("meter-1", 10.0);
    readings::save(pool, &reading).await.unwrap();

    // One real id, one that was deleted in the interim: no error.
    readings::mark_synced(
        pool,
        &[reading.local_id.clone(), "no-such-id".to_string()],
    )
    .await
    .expect("missing ids must be skipped silently");

    let stored = readings::get(pool, &reading.local_id).await.unwrap().unwrap();
    assert!(stored.synced);
}

#[tokio::test]
async fn test_delete_absent_reading_succeeds() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    readings::delete(pool, "never-existed")
        .await
        .expect("delete of absent reading must succeed");
}

#[tokio::test]
async fn test_increment_sync_attempts() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    let reading = test_reading("meter-1", 10.0);
    readings::save(pool, &reading).await.unwrap();

    let ids = vec![reading.local_id.clone()];
    readings::increment_sync_attempts(pool, &ids).await.unwrap();
    readings::increment_sync_attempts(pool, &ids).await.unwrap();

    let stored = readings::get(pool, &reading.local_id).await.unwrap().unwrap();
    assert_eq!(stored.sync_attempts, 2);
}

#[tokio::test]
async fn test_get_for_meter() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    readings::save(pool, &test_reading("meter-1", 10.0)).await.unwrap();
    readings::save(pool, &test_reading("meter-1", 11.0)).await.unwrap();
    readings::save(pool, &test_reading("meter-2", 20.0)).await.unwrap();

    let for_meter = readings::get_for_meter(pool, "meter-1").await.unwrap();
    assert_eq!(for_meter.len(), 2);
    assert!(for_meter.iter().all(|r| r.meter_id == "meter-1"));
}

#[tokio::test]
async fn test_retention_sweep() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    // Synced, 8 days old: swept.
    let old_synced = test_reading("meter-1", 10.0);
    readings::save(pool, &old_synced).await.unwrap();
    readings::mark_synced(pool, &[old_synced.local_id.clone()]).await.unwrap();
    age_reading(pool, &old_synced.local_id, 8).await;

    // Synced, 6 days old: retained.
    let recent_synced = test_reading("meter-2", 20.0);
    readings::save(pool, &recent_synced).await.unwrap();
    readings::mark_synced(pool, &[recent_synced.local_id.clone()]).await.unwrap();
    age_reading(pool, &recent_synced.local_id, 6).await;

    // Unsynced, 30 days old: never swept.
    let old_unsynced = test_reading("meter-3", 30.0);
    readings::save(pool, &old_unsynced).await.unwrap();
    age_reading(pool, &old_unsynced.local_id, 30).await;

    let deleted = readings::cleanup_old_synced(pool).await.unwrap();
    assert_eq!(deleted, 1);

    assert!(readings::get(pool, &old_synced.local_id).await.unwrap().is_none());
    assert!(readings::get(pool, &recent_synced.local_id).await.unwrap().is_some());
    assert!(readings::get(pool, &old_unsynced.local_id).await.unwrap().is_some());
}
