//! Mock scanner transport for barcode_reader
//!
//! This crate provides a simulated scanner for testing without a device or a
//! running Data Collection Service. All delays use `tokio::time::sleep`, so
//! tests can run with paused time.
//!
//! # Features
//!
//! - Property table with initial values
//! - Writes that are accepted but ignored, for exercising verifying read-back
//! - Properties that are never reported on read
//! - Interface string on opened sessions (e.g. "USB HID" for ring scanners)
//! - Call log ([`MockCall`]) for ordering assertions
//! - Error injection ([`ErrorConfig`]) producing transport errors
//!
//! ```rust,ignore
//! use bcr_driver_mock::MockScanner;
//! use std::sync::Arc;
//!
//! let scanner = Arc::new(MockScanner::builder().property("A", json!(1)).build());
//! let reader = BarcodeReader::new(scanner.clone(), catalogs, &config);
//! reader.connect().await;
//! ```

pub mod common;
mod mock_scanner;

pub use common::{ops, ErrorConfig, ErrorScenario, MockRng, TimingConfig};
pub use mock_scanner::{MockCall, MockScanner, MockScannerBuilder, DEFAULT_MOCK_SCANNER};
