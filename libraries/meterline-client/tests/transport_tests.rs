//! Tests for the bulk sync transport.
//!
//! These tests use a mock server to verify transport behavior without a
//! real backend.

use std::sync::Arc;

use chrono::NaiveDate;
use meterline_client::{
    AccessTokenSource, BackendConfig, BulkSyncRequest, BulkSyncTransport, ClientError,
    FileTokenSource, HttpBulkTransport, ReadingPayload, StaticTokenSource,
};
use meterline_core::types::{DeviceInfo, Reading};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_request() -> BulkSyncRequest {
    let device = DeviceInfo {
        platform: "android".to_string(),
        user_agent: "meterline-test".to_string(),
        app_version: "0.1.0".to_string(),
    };
    let reading = Reading::new("meter-1", "M-1", 123.0, "op-1", "Test Operator", device.clone());

    BulkSyncRequest {
        operator_id: "op-1".to_string(),
        date: NaiveDate::from_ymd_opt(2026, 8, 27).unwrap(),
        readings: vec![ReadingPayload::from(&reading)],
        exceptions: vec![],
        device_info: device,
    }
}

fn transport(url: &str) -> HttpBulkTransport {
    HttpBulkTransport::new(
        BackendConfig::new(url),
        Arc::new(StaticTokenSource::new("test-token")),
    )
    .expect("transport")
}

mod config {
    use super::*;

    #[test]
    fn test_empty_url_rejected() {
        let result = HttpBulkTransport::new(
            BackendConfig::new(""),
            Arc::new(StaticTokenSource::new("t")),
        );
        assert!(matches!(result.unwrap_err(), ClientError::InvalidUrl(_)));
    }

    #[test]
    fn test_url_without_scheme_rejected() {
        let result = HttpBulkTransport::new(
            BackendConfig::new("portal.example.com"),
            Arc::new(StaticTokenSource::new("t")),
        );
        assert!(matches!(result.unwrap_err(), ClientError::InvalidUrl(_)));
    }
}

#[tokio::test]
async fn test_push_bulk_success_with_partial_failures() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/readings/bulk-sync"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "failed_readings": [
                {"local_id": "bad-1", "reason": "unknown meter"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = transport(&server.uri())
        .push_bulk(&test_request())
        .await
        .expect("push failed");

    assert!(response.success);
    assert_eq!(response.failed_readings.len(), 1);
    assert_eq!(response.failed_readings[0].local_id, "bad-1");
}

#[tokio::test]
async fn test_push_bulk_tolerates_absent_failed_list() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/readings/bulk-sync"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})),
        )
        .mount(&server)
        .await;

    let response = transport(&server.uri())
        .push_bulk(&test_request())
        .await
        .expect("push failed");

    assert!(response.success);
    assert!(response.failed_readings.is_empty());
}

#[tokio::test]
async fn test_push_bulk_server_error_is_hard_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/readings/bulk-sync"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = transport(&server.uri())
        .push_bulk(&test_request())
        .await
        .unwrap_err();

    match err {
        ClientError::ServerError { status, ref message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("Expected ServerError, got {other:?}"),
    }
    assert!(err.is_network(), "5xx counts as a retryable network error");
}

#[tokio::test]
async fn test_push_bulk_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/readings/bulk-sync"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = transport(&server.uri())
        .push_bulk(&test_request())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::AuthRequired));
    assert!(!err.is_network());
}

mod token_sources {
    use super::*;

    #[tokio::test]
    async fn test_file_token_source_trims_content() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token");
        tokio::fs::write(&token_path, "  secret-token\n").await.unwrap();

        let source = FileTokenSource::new(&token_path);
        assert_eq!(source.access_token().await.unwrap(), "secret-token");
    }

    #[tokio::test]
    async fn test_file_token_source_missing_file() {
        let source = FileTokenSource::new("/nonexistent/token");
        let err = source.access_token().await.unwrap_err();
        assert!(matches!(err, ClientError::TokenUnavailable(_)));
    }

    #[tokio::test]
    async fn test_file_token_source_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token");
        tokio::fs::write(&token_path, "   \n").await.unwrap();

        let source = FileTokenSource::new(&token_path);
        let err = source.access_token().await.unwrap_err();
        assert!(matches!(err, ClientError::TokenUnavailable(_)));
    }
}
