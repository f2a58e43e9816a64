//! The shipped configuration and catalogs load and validate.

use barcode_reader::config::DEFAULT_CONFIG_PATH;
use barcode_reader::{ReaderConfig, Session};
use serial_test::serial;

#[test]
#[serial]
fn test_shipped_config_loads() {
    let config = ReaderConfig::load_from(DEFAULT_CONFIG_PATH).unwrap();
    assert!(config.validate().is_ok());

    let catalogs = config.load_catalogs().unwrap();
    let decoder = catalogs.decoder().unwrap();
    let accessory = catalogs.accessory().unwrap();
    assert_eq!(decoder.name(), "swift");
    assert_eq!(accessory.name(), "Ring");
    assert!(decoder.validate().is_ok());
    assert!(accessory.validate().is_ok());

    let ring = Session::new("s").with_interface("USB HID");
    assert_eq!(catalogs.select(&ring).unwrap().name(), "Ring");
}
