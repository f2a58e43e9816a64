//! `bcr-core`
//!
//! Core types for the barcode reader setting protocol.
//!
//! Application code names scanner settings with a vendor-neutral triple
//! (family, key, option) and string values. Devices know them as native
//! property names with native values. This crate holds everything needed to
//! translate between the two, plus the shared error taxonomy.
//!
//! ## Key Types
//!
//! - [`SettingCatalog`]: ordered descriptors, loaded from JSON or TOML
//! - [`resolve`]: (family, key, option, value) to [`SettingDefinition`]
//! - [`ValueRule`]: encode/decode between external strings and device values
//! - [`Transport`]: async seam to the scanner service
//! - [`BcrError`]: error taxonomy with numeric status codes
//! - [`OperationResult`] / [`CommitEntry`]: values delivered to callers
//!
//! ## Example
//!
//! ```rust
//! use bcr_core::{resolve, SettingCatalog, SettingId};
//!
//! let catalog = SettingCatalog::from_json_str(
//!     "Swift",
//!     r#"[{ "family": "Symbology", "key": "Code39", "option": "Enable",
//!           "command": "DEC_CODE39_ENABLED", "valueType": "map",
//!           "valueMap": [ { "true": true }, { "false": false } ] }]"#,
//! )
//! .unwrap();
//! let def = resolve(&catalog, SettingId::new("Symbology", "Code39", "Enable"), Some("true"), true);
//! assert_eq!(def.status(), 0);
//! assert_eq!(def.command(), Some("DEC_CODE39_ENABLED"));
//! ```

pub mod catalog;
pub mod codec;
pub mod error;
pub mod resolver;
pub mod result;
pub mod transport;

pub use catalog::{CatalogIssue, SettingCatalog, SettingDescriptor};
pub use codec::{ValueRule, ValueType};
pub use error::{BcrError, BcrResult, TransportError};
pub use resolver::{resolve, ResolvedSetting, SettingDefinition, SettingId};
pub use result::{BufferedMethod, CommitEntry, OperationResult};
pub use transport::{PropertyValues, Session, Transport};
