//! Shared fixtures for reader integration tests.

#![allow(dead_code)]

use barcode_reader::{BarcodeReader, CatalogSet, ReaderConfig, SettingCatalog, Transport};
use bcr_driver_mock::MockScanner;
use serde_json::json;
use std::sync::Arc;

pub const CODE39_ENABLED: &str = "DEC_CODE39_ENABLED";
pub const CODE39_MIN_LENGTH: &str = "DEC_CODE39_MIN_LENGTH";
pub const TRIGGER_TIMEOUT: &str = "TRIG_SCAN_TIMEOUT";
pub const SCANNER_MODE: &str = "SCN_MODE";
pub const RING_BEEP: &str = "RING_BEEP_VOLUME";

/// Decoder catalog covering each value type.
pub fn decoder_catalog() -> SettingCatalog {
    SettingCatalog::from_json_value(
        "Swift",
        json!([
            { "family": "Symbology", "key": "Code39", "option": "Enable",
              "command": CODE39_ENABLED, "valueType": "map",
              "valueMap": [ { "true": true }, { "false": false } ] },
            { "family": "Symbology", "key": "Code39", "option": "MinLength",
              "command": CODE39_MIN_LENGTH, "valueType": "int",
              "valueRange": [ { "min": 1 }, { "max": 48 } ] },
            { "family": "Trigger", "key": "Scan", "option": "Timeout",
              "command": TRIGGER_TIMEOUT, "valueType": "map",
              "valueMap": [ { "off": "0" }, { "short": "1000" }, { "long": "5000" } ],
              "reverseValueMap": [ { "0": "off" }, { "1000": "short" }, { "*": "custom" } ] },
            { "family": "Scanner", "key": "Mode", "option": "Value",
              "command": SCANNER_MODE, "valueType": "list",
              "values": [ "normal", "presentation" ] }
        ]),
    )
    .unwrap()
}

/// Accessory catalog with a single ring setting.
pub fn accessory_catalog() -> SettingCatalog {
    SettingCatalog::from_json_value(
        "Ring",
        json!([
            { "family": "Notification", "key": "Beep", "option": "Volume",
              "command": RING_BEEP, "valueType": "int",
              "valueRange": [ { "min": 0 }, { "max": 3 } ] }
        ]),
    )
    .unwrap()
}

/// Mock with every decoder property present.
pub fn scanner_builder() -> bcr_driver_mock::MockScannerBuilder {
    MockScanner::builder()
        .property(CODE39_ENABLED, json!(false))
        .property(CODE39_MIN_LENGTH, json!(4))
        .property(TRIGGER_TIMEOUT, json!("0"))
        .property(SCANNER_MODE, json!("normal"))
}

pub fn reader_with(scanner: Arc<MockScanner>, catalogs: CatalogSet) -> BarcodeReader {
    reader_with_config(scanner, catalogs, &ReaderConfig::default())
}

pub fn reader_with_config(
    scanner: Arc<MockScanner>,
    catalogs: CatalogSet,
    config: &ReaderConfig,
) -> BarcodeReader {
    let transport: Arc<dyn Transport> = scanner;
    BarcodeReader::new(transport, catalogs, config)
}

/// Connected reader over a default mock and the decoder catalog.
pub async fn connected_reader() -> (Arc<MockScanner>, BarcodeReader) {
    connected_reader_over(scanner_builder().build()).await
}

pub async fn connected_reader_over(scanner: MockScanner) -> (Arc<MockScanner>, BarcodeReader) {
    let scanner = Arc::new(scanner);
    let reader = reader_with(scanner.clone(), CatalogSet::decoder_only(decoder_catalog()));
    assert!(reader.connect().await.is_success());
    scanner.clear_calls();
    (scanner, reader)
}
