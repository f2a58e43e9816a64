//! # Barcode Reader
//!
//! Reads and writes barcode scanner settings through a pluggable device
//! transport.
//!
//! Application code names a setting with a (family, key, option) triple and a
//! string value. A setting catalog maps each triple to the device-native
//! property name and a value rule; the reader resolves requests against the
//! catalog, encodes values, talks to the device through a
//! [`Transport`](bcr_core::Transport), and decodes what comes back.
//!
//! ## Crate Structure
//!
//! - **`reader`**: [`BarcodeReader`], immediate and buffered get/set, session lifecycle
//! - **`readers`**: [`BarcodeReaders`], scanner discovery
//! - **`buffer`**: [`CommandBuffer`], pending buffered requests
//! - **`commit`**: [`BufferCommitEngine`], the batched write/verify/read protocol
//! - **`catalog_set`**: [`CatalogSet`], decoder and accessory catalogs
//! - **`jsonrpc`**: JSON-RPC envelope and [`JsonRpcTransport`]
//! - **`config`**: [`ReaderConfig`], loaded with Figment from TOML and `BCR_*` variables
//! - **`logging`**: `tracing-subscriber` setup
//!
//! Catalogs, resolution, value codecs, errors and result types live in
//! `bcr-core` and are re-exported here.
//!
//! ## Example
//!
//! ```rust,ignore
//! use barcode_reader::{BarcodeReader, CatalogSet, ReaderConfig};
//!
//! let config = ReaderConfig::load()?;
//! let catalogs = config.load_catalogs()?;
//! let reader = BarcodeReader::new(transport, catalogs, &config);
//!
//! reader.connect().await;
//! let result = reader.set("Symbology", "Code39", "Enable", "true").await;
//! assert!(result.is_success());
//! ```

pub mod buffer;
pub mod catalog_set;
pub mod commit;
pub mod config;
pub mod jsonrpc;
pub mod logging;
pub mod reader;
pub mod readers;

pub use buffer::{BufferSnapshot, CommandBuffer};
pub use catalog_set::CatalogSet;
pub use commit::{BufferCommitEngine, CommitPhase};
pub use config::ReaderConfig;
pub use jsonrpc::{JsonRpcRequest, JsonRpcTransport, RpcChannel};
pub use reader::BarcodeReader;
pub use readers::BarcodeReaders;

pub use bcr_core::{
    error, BcrError, BcrResult, BufferedMethod, CommitEntry, OperationResult, PropertyValues,
    Session, SettingCatalog, SettingDefinition, SettingId, Transport, TransportError,
};
