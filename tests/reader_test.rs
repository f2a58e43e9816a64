//! Immediate operations and session lifecycle of `BarcodeReader`.

mod common;

use barcode_reader::error::{
    INVALID_PARAMETER, INVALID_SETTING_VALUE, MISSING_SETTINGS_DEF, NO_CONNECTION,
    SCANNER_NOT_FOUND, UNSUPPORTED_FAMILY_NAME, UNSUPPORTED_KEY_OR_OPTION,
};
use barcode_reader::{CatalogSet, ReaderConfig};
use bcr_driver_mock::{ErrorConfig, ErrorScenario, MockCall, MockScanner};
use common::*;
use serde_json::json;
use std::sync::Arc;

// =============================================================================
// Immediate set
// =============================================================================

#[tokio::test]
async fn test_set_confirmed_by_read_back() {
    let (scanner, reader) = connected_reader().await;

    let result = reader.set("Symbology", "Code39", "Enable", "true").await;
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({
            "status": 0,
            "message": "Operation completed successfully.",
            "family": "Symbology",
            "key": "Code39",
            "option": "Enable"
        })
    );
    assert_eq!(scanner.property(CODE39_ENABLED), Some(json!(true)));

    let mut written = barcode_reader::PropertyValues::new();
    written.insert(CODE39_ENABLED.into(), json!(true));
    assert_eq!(
        scanner.calls(),
        vec![
            MockCall::SetProperties { values: written },
            MockCall::GetProperties {
                names: vec![CODE39_ENABLED.to_string()]
            },
        ]
    );
}

#[tokio::test]
async fn test_set_ignored_by_device_is_rejected() {
    let (scanner, reader) =
        connected_reader_over(scanner_builder().ignore_writes_to(CODE39_MIN_LENGTH).build()).await;

    let result = reader.set("Symbology", "Code39", "MinLength", "12").await;
    assert_eq!(result.status, INVALID_SETTING_VALUE);
    assert_eq!(result.message, "Scanner rejects the setting value.");
    assert_eq!(scanner.property(CODE39_MIN_LENGTH), Some(json!(4)));
}

#[tokio::test]
async fn test_set_unreported_property() {
    let (_, reader) =
        connected_reader_over(scanner_builder().unreported(CODE39_ENABLED).build()).await;

    let result = reader.set("Symbology", "Code39", "Enable", "false").await;
    assert_eq!(result.status, INVALID_PARAMETER);
    assert_eq!(result.message, "Invalid scanner property: DEC_CODE39_ENABLED");
}

#[tokio::test]
async fn test_set_invalid_value_never_reaches_device() {
    let (scanner, reader) = connected_reader().await;

    let result = reader.set("Symbology", "Code39", "Enable", "maybe").await;
    assert_eq!(result.status, INVALID_SETTING_VALUE);
    assert_eq!(result.message, "Invalid setting value.");

    let result = reader.set("Symbology", "Code39", "MinLength", "long").await;
    assert_eq!(result.message, "Invalid setting value, not a number.");

    let result = reader.set("Scanner", "Mode", "Value", "turbo").await;
    assert_eq!(result.status, INVALID_SETTING_VALUE);

    assert!(scanner.calls().is_empty());
}

#[tokio::test]
async fn test_set_unknown_setting() {
    let (_, reader) = connected_reader().await;

    let result = reader.set("Imager", "Exposure", "Value", "1").await;
    assert_eq!(result.status, UNSUPPORTED_FAMILY_NAME);
    assert_eq!(result.message, "Unsupported family name: Imager");

    let result = reader.set("Symbology", "Code128", "Enable", "true").await;
    assert_eq!(result.status, UNSUPPORTED_KEY_OR_OPTION);
    assert_eq!(result.message, "Unsupported key or option name");
    assert_eq!(result.key.as_deref(), Some("Code128"));
}

// =============================================================================
// Immediate get
// =============================================================================

#[tokio::test]
async fn test_get_decodes_device_values() {
    let (scanner, reader) = connected_reader().await;

    let result = reader.get("Symbology", "Code39", "MinLength").await;
    assert!(result.is_success());
    assert_eq!(result.value.as_deref(), Some("4"));

    let result = reader.get("Trigger", "Scan", "Timeout").await;
    assert_eq!(result.value.as_deref(), Some("off"));

    scanner.set_property(TRIGGER_TIMEOUT, json!("2500"));
    let result = reader.get("Trigger", "Scan", "Timeout").await;
    assert_eq!(result.value.as_deref(), Some("custom"));

    let result = reader.get("Scanner", "Mode", "Value").await;
    assert_eq!(result.value.as_deref(), Some("normal"));
}

#[tokio::test]
async fn test_get_without_session() {
    let scanner = Arc::new(scanner_builder().build());
    let reader = reader_with(scanner.clone(), CatalogSet::decoder_only(decoder_catalog()));

    let result = reader.get("Symbology", "Code39", "Enable").await;
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({
            "status": NO_CONNECTION,
            "message": "No scanner connection",
            "family": "Symbology",
            "key": "Code39",
            "option": "Enable"
        })
    );
    assert!(scanner.calls().is_empty());
}

#[tokio::test]
async fn test_get_unexpected_device_value() {
    let (scanner, reader) = connected_reader().await;
    scanner.set_property(CODE39_ENABLED, json!("yes"));

    let result = reader.get("Symbology", "Code39", "Enable").await;
    assert_eq!(result.status, INVALID_SETTING_VALUE);
    assert_eq!(result.message, "Unexpected scanner setting value");
    assert!(result.value.is_none());
}

#[tokio::test]
async fn test_get_transport_error_passes_through() {
    let scanner = scanner_builder()
        .error_config(ErrorConfig::scenario(ErrorScenario::RpcError {
            operation: bcr_driver_mock::ops::GET_PROPERTIES,
            code: -32601,
            message: "Method not found".into(),
        }))
        .build();
    let (_, reader) = connected_reader_over(scanner).await;

    let result = reader.get("Symbology", "Code39", "Enable").await;
    assert_eq!(result.status, -32601);
    assert_eq!(result.message, "Method not found");
    assert_eq!(result.family.as_deref(), Some("Symbology"));
}

// =============================================================================
// Catalog selection
// =============================================================================

#[tokio::test]
async fn test_accessory_scanner_uses_accessory_catalog() {
    let scanner = Arc::new(
        MockScanner::builder()
            .property(RING_BEEP, json!(2))
            .interface("USB HID")
            .build(),
    );
    let catalogs = CatalogSet::new()
        .with_decoder(Arc::new(decoder_catalog()))
        .with_accessory(Arc::new(accessory_catalog()));
    let reader = reader_with(scanner, catalogs);
    assert!(reader.connect().await.is_success());

    let result = reader.get("Notification", "Beep", "Volume").await;
    assert_eq!(result.value.as_deref(), Some("2"));

    let result = reader.get("Symbology", "Code39", "Enable").await;
    assert_eq!(result.status, UNSUPPORTED_FAMILY_NAME);
}

#[tokio::test]
async fn test_missing_accessory_catalog() {
    let scanner = Arc::new(MockScanner::builder().interface("USB HID").build());
    let reader = reader_with(scanner, CatalogSet::decoder_only(decoder_catalog()));
    reader.connect().await;

    let result = reader.get("Symbology", "Code39", "Enable").await;
    assert_eq!(result.status, MISSING_SETTINGS_DEF);
    assert_eq!(
        result.message,
        "Missing settings definition for accessory scanners."
    );

    let result = reader.get_buffered("Symbology", "Code39", "Enable");
    assert_eq!(result.status, MISSING_SETTINGS_DEF);
    assert_eq!(reader.buffered_len(), 0);
}

#[tokio::test]
async fn test_no_catalog_is_checked_before_session() {
    let scanner = Arc::new(MockScanner::new());
    let reader = reader_with(scanner, CatalogSet::new());

    let result = reader.set("Symbology", "Code39", "Enable", "true").await;
    assert_eq!(result.status, MISSING_SETTINGS_DEF);
    assert_eq!(
        result.message,
        "Missing settings definition for decoder or accessory scanners."
    );
}

// =============================================================================
// Session lifecycle
// =============================================================================

#[tokio::test]
async fn test_connect_is_idempotent() {
    let scanner = Arc::new(MockScanner::new());
    let reader = reader_with(scanner.clone(), CatalogSet::decoder_only(decoder_catalog()));

    assert!(!reader.is_connected());
    assert!(reader.connect().await.is_success());
    assert!(reader.connect().await.is_success());
    assert!(reader.is_connected());
    assert_eq!(
        scanner.calls(),
        vec![MockCall::Open { scanner_name: None }]
    );
    assert_eq!(scanner.open_session_count(), 1);
}

#[tokio::test]
async fn test_connect_to_unknown_scanner() {
    let scanner = Arc::new(MockScanner::builder().scanners(["dcs.scanner.imager"]).build());
    let config = ReaderConfig {
        scanner_name: Some("dcs.scanner.ring".into()),
        ..ReaderConfig::default()
    };
    let reader = reader_with_config(
        scanner,
        CatalogSet::decoder_only(decoder_catalog()),
        &config,
    );

    let result = reader.connect().await;
    assert_eq!(result.status, SCANNER_NOT_FOUND);
    assert!(!reader.is_connected());
}

#[tokio::test]
async fn test_close_twice() {
    let (scanner, reader) = connected_reader().await;

    let first = reader.close().await;
    assert!(first.is_success());
    assert_eq!(first.message, "Operation completed successfully.");
    assert!(!reader.is_connected());
    assert_eq!(scanner.open_session_count(), 0);

    let second = reader.close().await;
    assert_eq!(second.status, 0);
    assert_eq!(second.message, "BarcodeReader already closed");
    assert_eq!(scanner.calls(), vec![MockCall::Close]);
}

#[tokio::test]
async fn test_activate_restarts_trigger() {
    let (scanner, reader) = connected_reader().await;

    assert!(reader.activate(true).await.is_success());
    assert!(scanner.trigger_active());
    assert!(reader.activate(false).await.is_success());
    assert!(!scanner.trigger_active());

    assert_eq!(
        scanner.calls(),
        vec![
            MockCall::SetTrigger { on: false },
            MockCall::SetTrigger { on: true },
            MockCall::SetTrigger { on: false },
        ]
    );
}

#[tokio::test]
async fn test_enable_trigger_sets_control_mode() {
    let (scanner, reader) = connected_reader().await;

    assert!(reader.enable_trigger(true).await.is_success());
    assert_eq!(
        scanner.property(barcode_reader::reader::TRIGGER_CONTROL_MODE),
        Some(json!("autoControl"))
    );
    assert!(reader.enable_trigger(false).await.is_success());
    assert_eq!(scanner.property("TRIG_CONTROL_MODE"), Some(json!("disable")));
}

#[tokio::test]
async fn test_session_operations_require_connection() {
    let reader = reader_with(
        Arc::new(MockScanner::new()),
        CatalogSet::decoder_only(decoder_catalog()),
    );
    assert_eq!(reader.activate(true).await.status, NO_CONNECTION);
    assert_eq!(reader.enable_trigger(true).await.status, NO_CONNECTION);
}
