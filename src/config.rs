//! Reader configuration using Figment
//!
//! Configuration is loaded from:
//! 1. a TOML file (base configuration)
//! 2. environment variables prefixed with `BCR_`, nested keys split on `__`
//!
//! ```toml
//! scanner_name = "dcs.scanner.ring"
//! log_level = "debug"
//! request_timeout_ms = 3000
//!
//! [catalogs]
//! decoder = "catalogs/swift.json"
//! accessory = "catalogs/ring.toml"
//! ```
//!
//! `BCR_LOG_LEVEL=trace` or `BCR_CATALOGS__DECODER=/etc/bcr/swift.json`
//! override the file.
//!
//! # Example
//! ```no_run
//! use barcode_reader::config::ReaderConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ReaderConfig::load_from("config/barcode_reader.toml")?;
//! config.validate()?;
//! let catalogs = config.load_catalogs()?;
//! # Ok(())
//! # }
//! ```

use crate::catalog_set::CatalogSet;
use anyhow::Context;
use bcr_core::SettingCatalog;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/barcode_reader.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "BCR_";

/// Scanner reported when the service lists none (the built-in imager).
pub const DEFAULT_SCANNER: &str = "dcs.scanner.imager";

/// Top-level reader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Scanner to open; `None` opens the service's default scanner
    #[serde(default)]
    pub scanner_name: Option<String>,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Upper bound on each transport call; `None` leaves timing to the transport
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// Setting catalog files
    #[serde(default)]
    pub catalogs: CatalogPaths,
    /// Name reported by `BarcodeReaders::available_readers` when nothing is listed
    #[serde(default = "default_scanner")]
    pub default_scanner: String,
}

/// Catalog file locations. JSON or TOML, chosen by extension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogPaths {
    /// Catalog for built-in decoders
    #[serde(default)]
    pub decoder: Option<PathBuf>,
    /// Catalog for USB accessory (ring) scanners
    #[serde(default)]
    pub accessory: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_scanner() -> String {
    DEFAULT_SCANNER.to_string()
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            scanner_name: None,
            log_level: default_log_level(),
            request_timeout_ms: None,
            catalogs: CatalogPaths::default(),
            default_scanner: default_scanner(),
        }
    }
}

impl ReaderConfig {
    /// Load configuration from [`DEFAULT_CONFIG_PATH`] and environment variables
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; every field has a default.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    /// The provider stack used by [`load_from`](Self::load_from).
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.request_timeout_ms == Some(0) {
            return Err("Invalid request_timeout_ms 0. Must be positive or unset".to_string());
        }

        if let Some(name) = &self.scanner_name {
            if name.trim().is_empty() {
                return Err("Invalid scanner_name: must not be empty".to_string());
            }
        }

        if self.default_scanner.trim().is_empty() {
            return Err("Invalid default_scanner: must not be empty".to_string());
        }

        Ok(())
    }

    /// Per-call transport timeout, if configured
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Load the configured catalog files
    pub fn load_catalogs(&self) -> anyhow::Result<CatalogSet> {
        let mut catalogs = CatalogSet::new();
        if let Some(path) = &self.catalogs.decoder {
            let catalog = load_catalog(path).context("Failed to load decoder catalog")?;
            catalogs = catalogs.with_decoder(Arc::new(catalog));
        }
        if let Some(path) = &self.catalogs.accessory {
            let catalog = load_catalog(path).context("Failed to load accessory catalog")?;
            catalogs = catalogs.with_accessory(Arc::new(catalog));
        }
        Ok(catalogs)
    }
}

fn load_catalog(path: &Path) -> anyhow::Result<SettingCatalog> {
    let catalog = SettingCatalog::from_file(path)?;
    if let Err(issues) = catalog.validate() {
        for issue in &issues {
            tracing::warn!(catalog = %catalog.name(), %issue, "Catalog entry will not resolve");
        }
    }
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tracing_test::traced_test;

    #[test]
    fn test_defaults() {
        let config = ReaderConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.default_scanner, "dcs.scanner.imager");
        assert!(config.request_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ReaderConfig::default();
        config.log_level = "verbose".into();
        let err = config.validate().unwrap_err();
        assert!(err.contains("Invalid log_level"));

        let mut config = ReaderConfig::default();
        config.request_timeout_ms = Some(0);
        assert!(config.validate().is_err());

        let mut config = ReaderConfig::default();
        config.scanner_name = Some("  ".into());
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reader.toml");
        std::fs::write(
            &path,
            r#"
                scanner_name = "dcs.scanner.ring"
                log_level = "debug"
                request_timeout_ms = 1500

                [catalogs]
                decoder = "swift.json"
            "#,
        )
        .unwrap();

        let config = ReaderConfig::load_from(&path).unwrap();
        assert_eq!(config.scanner_name.as_deref(), Some("dcs.scanner.ring"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.catalogs.decoder, Some(PathBuf::from("swift.json")));
        assert!(config.catalogs.accessory.is_none());
        assert_eq!(config.default_scanner, DEFAULT_SCANNER);
    }

    #[test]
    #[serial]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReaderConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ReaderConfig::default());
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("reader.toml", "log_level = \"warn\"")?;
            jail.set_env("BCR_LOG_LEVEL", "trace");
            jail.set_env("BCR_CATALOGS__ACCESSORY", "ring.toml");
            let config = ReaderConfig::load_from("reader.toml")?;
            assert_eq!(config.log_level, "trace");
            assert_eq!(config.catalogs.accessory, Some(PathBuf::from("ring.toml")));
            Ok(())
        });
    }

    #[test]
    fn test_load_catalogs() {
        let dir = tempfile::tempdir().unwrap();
        let decoder = dir.path().join("swift.json");
        std::fs::write(
            &decoder,
            r#"[{ "family": "Symbology", "key": "Code39", "option": "Enable",
                  "command": "DEC_CODE39_ENABLED", "valueType": "map",
                  "valueMap": [ { "true": true }, { "false": false } ] }]"#,
        )
        .unwrap();

        let mut config = ReaderConfig::default();
        config.catalogs.decoder = Some(decoder);
        let catalogs = config.load_catalogs().unwrap();
        assert!(catalogs.decoder().is_some());
        assert!(catalogs.accessory().is_none());

        config.catalogs.accessory = Some(dir.path().join("missing.json"));
        let err = config.load_catalogs().unwrap_err();
        assert!(format!("{:#}", err).contains("accessory catalog"));
    }

    #[test]
    #[traced_test]
    fn test_catalog_issue_logged_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("twice.json");
        std::fs::write(
            &path,
            r#"[{ "family": "A", "key": "B", "option": "C", "command": "X", "valueType": "string" },
                { "family": "A", "key": "B", "option": "C", "command": "Y", "valueType": "string" }]"#,
        )
        .unwrap();

        let catalog = load_catalog(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        logs_assert(|lines: &[&str]| {
            match lines
                .iter()
                .filter(|line| line.contains("first defined at entry 0"))
                .count()
            {
                1 => Ok(()),
                n => Err(format!("expected one warning, got {}", n)),
            }
        });
    }
}
