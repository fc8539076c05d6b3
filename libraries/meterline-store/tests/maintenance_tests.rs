//! Integration tests for storage stats and full reset


use meterline_core::types::ExceptionKind;
use meterline_store::{exceptions, maintenance, meters, readings};
use test_helpers::*;

#[tokio::test]
async fn test_storage_stats_snapshot() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    let synced = test_reading("meter-1", 10.0);
    readings::save(pool, &synced).await.unwrap();
    readings::save(pool, &test_reading("meter-2", 20.0)).await.unwrap();
    readings::mark_synced(pool, &[synced.local_id.clone()]).await.unwrap();

    exceptions::save(pool, &test_exception("meter-3", ExceptionKind::Other)).await.unwrap();
    meters::cache_all(pool, &[test_meter("m1", "QR-1"), test_meter("m2", "QR-2")])
        .await
        .unwrap();

    let stats = maintenance::storage_stats(pool).await.unwrap();
    assert_eq!(stats.total_readings, 2);
    assert_eq!(stats.pending_readings, 1);
    assert_eq!(stats.synced_readings, 1);
    assert_eq!(stats.total_exceptions, 1);
    assert_eq!(stats.pending_exceptions, 1);
    assert_eq!(stats.meter_count, 2);
}

#[tokio::test]
async fn test_clear_all_data() {
    let test_db = TestDb::new().await;
    let pool = test_db.pool();

    readings::save(pool, &test_reading("meter-1", 10.0)).await.unwrap();
    exceptions::save(pool, &test_exception("meter-2", ExceptionKind::Other)).await.unwrap();
    meters::cache_all(pool, &[test_meter("m1", "QR-1")]).await.unwrap();

    maintenance::clear_all_data(pool).await.expect("reset failed");

    let stats = maintenance::storage_stats(pool).await.unwrap();
    assert_eq!(stats.total_readings, 0);
    assert_eq!(stats.total_exceptions, 0);
    assert_eq!(stats.meter_count, 0);
}
