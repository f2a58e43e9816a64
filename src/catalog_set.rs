//! Catalog selection per scanner kind.
//!
//! Built-in decoders and USB ring accessories expose different property sets,
//! so a reader carries up to two catalogs and picks one per session.

use bcr_core::{BcrError, BcrResult, Session, SettingCatalog};
use std::sync::Arc;

/// Decoder and accessory catalogs held by one reader.
#[derive(Debug, Clone, Default)]
pub struct CatalogSet {
    decoder: Option<Arc<SettingCatalog>>,
    accessory: Option<Arc<SettingCatalog>>,
}

impl CatalogSet {
    /// Empty set; every lookup reports a missing settings definition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set with only a decoder catalog.
    pub fn decoder_only(catalog: SettingCatalog) -> Self {
        Self::new().with_decoder(Arc::new(catalog))
    }

    /// Use `catalog` for built-in decoders.
    pub fn with_decoder(mut self, catalog: Arc<SettingCatalog>) -> Self {
        self.decoder = Some(catalog);
        self
    }

    /// Use `catalog` for USB accessory scanners.
    pub fn with_accessory(mut self, catalog: Arc<SettingCatalog>) -> Self {
        self.accessory = Some(catalog);
        self
    }

    /// Decoder catalog, if loaded.
    pub fn decoder(&self) -> Option<&SettingCatalog> {
        self.decoder.as_deref()
    }

    /// Accessory catalog, if loaded.
    pub fn accessory(&self) -> Option<&SettingCatalog> {
        self.accessory.as_deref()
    }

    /// Fails unless at least one catalog is loaded.
    pub fn ensure_loaded(&self) -> BcrResult<()> {
        if self.decoder.is_none() && self.accessory.is_none() {
            Err(BcrError::MissingSettingsDef(
                "for decoder or accessory scanners".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    /// Catalog matching the scanner behind `session`.
    pub fn select(&self, session: &Session) -> BcrResult<&SettingCatalog> {
        if session.is_accessory() {
            self.accessory()
                .ok_or_else(|| BcrError::MissingSettingsDef("for accessory scanners".to_string()))
        } else {
            self.decoder()
                .ok_or_else(|| BcrError::MissingSettingsDef("for decoder scanners".to_string()))
        }
    }
}
