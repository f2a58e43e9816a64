//! Integration tests for the mock scanner used through the transport trait.

use bcr_core::error::{FUNCTION_FAILED, WEB_SERVICE_NOT_RESPONDING};
use bcr_core::transport::{PropertyValues, Transport};
use bcr_driver_mock::*;
use serde_json::json;
use std::sync::Arc;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// The mock is usable as a shared trait object.
#[tokio::test]
async fn test_trait_object_usage() {
    let transport: Arc<dyn Transport> = Arc::new(
        MockScanner::builder()
            .property("DEC_CODE39_ENABLED", json!(false))
            .build(),
    );
    let session = transport.open(None).await.unwrap();

    let mut values = PropertyValues::new();
    values.insert("DEC_CODE39_ENABLED".into(), json!(true));
    transport.set_properties(&session, values).await.unwrap();

    let read = transport
        .get_properties(&session, &names(&["DEC_CODE39_ENABLED"]))
        .await
        .unwrap();
    assert_eq!(read["DEC_CODE39_ENABLED"], json!(true));
    transport.close(&session).await.unwrap();
}

/// Seeded random failures produce the same sequence on two scanners.
#[tokio::test]
async fn test_seeded_failures_are_reproducible() {
    async fn outcomes(seed: u64) -> Vec<bool> {
        let scanner = MockScanner::builder()
            .error_config(ErrorConfig::random_failures_seeded(0.4, Some(seed)))
            .build();
        let mut out = Vec::new();
        for _ in 0..30 {
            out.push(scanner.list_scanners().await.is_ok());
        }
        out
    }

    assert_eq!(outcomes(12345).await, outcomes(12345).await);
}

/// Service loss takes down every operation, including open.
#[tokio::test]
async fn test_service_loss() {
    let scanner = MockScanner::builder()
        .error_config(ErrorConfig::scenario(ErrorScenario::ServiceLoss))
        .build();
    let err = scanner.open(None).await.unwrap_err();
    assert_eq!(err.code, WEB_SERVICE_NOT_RESPONDING);
    assert_eq!(err.message, "Web service not responding.");
    assert!(scanner.list_scanners().await.is_err());
}

/// Writes stop taking effect after the configured number of batches.
#[tokio::test]
async fn test_fail_after_n_writes() {
    let scanner = MockScanner::builder()
        .property("A", json!(0))
        .error_config(ErrorConfig::scenario(ErrorScenario::FailAfterN {
            operation: ops::SET_PROPERTIES,
            count: 1,
        }))
        .build();
    let session = scanner.open(None).await.unwrap();

    let mut first = PropertyValues::new();
    first.insert("A".into(), json!(1));
    scanner.set_properties(&session, first).await.unwrap();

    let mut second = PropertyValues::new();
    second.insert("A".into(), json!(2));
    let err = scanner.set_properties(&session, second).await.unwrap_err();
    assert_eq!(err.code, FUNCTION_FAILED);
    assert_eq!(scanner.property("A"), Some(json!(1)));
}

/// Concurrent writers all land in the property table.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes() {
    let scanner = Arc::new(MockScanner::builder().timing(TimingConfig::fixed(1)).build());
    let session = scanner.open(None).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let scanner = scanner.clone();
        let session = session.clone();
        handles.push(tokio::spawn(async move {
            let mut values = PropertyValues::new();
            values.insert(format!("P{}", i), json!(i));
            scanner.set_properties(&session, values).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    for i in 0..16 {
        assert_eq!(scanner.property(&format!("P{}", i)), Some(json!(i)));
    }
}
