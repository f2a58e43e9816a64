//! `BarcodeReader`, the application-facing surface.
//!
//! A reader owns one transport, up to two setting catalogs, at most one open
//! session, and a command buffer. Every operation completes with a result
//! value; nothing is returned as `Err` and nothing panics.
//!
//! Immediate operations:
//! - [`BarcodeReader::get`] resolves the setting, reads the device property
//!   and decodes it.
//! - [`BarcodeReader::set`] resolves and encodes the value, writes it, then
//!   reads it back to confirm the device took it.
//!
//! Buffered operations append to the buffer synchronously and report only the
//! buffering outcome; [`BarcodeReader::commit_buffer`] applies everything
//! that was buffered in one batched write and one batched read.
//!
//! # Example
//!
//! ```rust,ignore
//! let reader = BarcodeReader::new(transport, catalogs, &config);
//! reader.connect().await;
//! reader.set_buffered("Symbology", "Code39", "Enable", "true");
//! reader.get_buffered("Symbology", "Code39", "Enable");
//! for entry in reader.commit_buffer().await {
//!     println!("{}: {}", entry.status, entry.message);
//! }
//! ```

use crate::buffer::CommandBuffer;
use crate::catalog_set::CatalogSet;
use crate::commit::{bounded, read_value, verify_write, BufferCommitEngine};
use crate::config::ReaderConfig;
use bcr_core::error::SUCCESS;
use bcr_core::{
    resolve, BcrError, BcrResult, CommitEntry, OperationResult, PropertyValues,
    Session, SettingDefinition, SettingId, Transport,
};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Device property driving the hardware trigger mode.
pub const TRIGGER_CONTROL_MODE: &str = "TRIG_CONTROL_MODE";

const GET_BUFFERED_MESSAGE: &str = "Get request successfully buffered.";
const SET_BUFFERED_MESSAGE: &str = "Set request successfully buffered.";
const ALREADY_CLOSED_MESSAGE: &str = "BarcodeReader already closed";

/// One barcode reader bound to one scanner.
pub struct BarcodeReader {
    transport: Arc<dyn Transport>,
    catalogs: CatalogSet,
    scanner_name: Option<String>,
    timeout: Option<Duration>,
    session: RwLock<Option<Session>>,
    buffer: Mutex<CommandBuffer>,
    // Held for the whole of a commit; tokio's mutex queues waiters in order.
    commit_lock: tokio::sync::Mutex<()>,
}

impl BarcodeReader {
    /// Disconnected reader over `transport`.
    pub fn new(transport: Arc<dyn Transport>, catalogs: CatalogSet, config: &ReaderConfig) -> Self {
        Self {
            transport,
            catalogs,
            scanner_name: config.scanner_name.clone(),
            timeout: config.request_timeout(),
            session: RwLock::new(None),
            buffer: Mutex::new(CommandBuffer::new()),
            commit_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Open a session on the configured scanner.
    ///
    /// Succeeds without reopening when a session is already open.
    pub async fn connect(&self) -> OperationResult {
        if self.is_connected() {
            return OperationResult::success();
        }
        match bounded(self.timeout, self.transport.open(self.scanner_name.as_deref())).await {
            Ok(session) => {
                tracing::info!(
                    scanner = ?session.scanner_name,
                    interface = ?session.interface,
                    "Barcode reader connected"
                );
                *self.session.write() = Some(session);
                OperationResult::success()
            }
            Err(e) => {
                tracing::warn!(scanner = ?self.scanner_name, status = e.code, error = %e, "Failed to connect");
                OperationResult::from_error(&e.into())
            }
        }
    }

    /// True while a session is open.
    pub fn is_connected(&self) -> bool {
        self.session.read().is_some()
    }

    /// The open session, if any.
    pub fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    /// Close the session.
    ///
    /// The session is kept when the transport fails to close it, so the call
    /// can be retried.
    pub async fn close(&self) -> OperationResult {
        let Some(session) = self.session() else {
            return OperationResult::with_message(SUCCESS, ALREADY_CLOSED_MESSAGE);
        };
        match bounded(self.timeout, self.transport.close(&session)).await {
            Ok(()) => {
                let mut current = self.session.write();
                if current.as_ref() == Some(&session) {
                    *current = None;
                }
                tracing::info!("Barcode reader closed");
                OperationResult::success()
            }
            Err(e) => {
                tracing::warn!(status = e.code, error = %e, "Failed to close");
                OperationResult::from_error(&e.into())
            }
        }
    }

    /// Turn the software trigger on or off.
    ///
    /// Turning it on first turns it off, so an already-running scan restarts.
    pub async fn activate(&self, on: bool) -> OperationResult {
        OperationResult::from_outcome(self.try_activate(on).await)
    }

    async fn try_activate(&self, on: bool) -> BcrResult<()> {
        let session = self.require_session()?;
        bounded(self.timeout, self.transport.set_trigger(&session, false)).await?;
        if on {
            bounded(self.timeout, self.transport.set_trigger(&session, true)).await?;
        }
        Ok(())
    }

    /// Enable or disable the hardware trigger.
    pub async fn enable_trigger(&self, enabled: bool) -> OperationResult {
        OperationResult::from_outcome(self.try_enable_trigger(enabled).await)
    }

    async fn try_enable_trigger(&self, enabled: bool) -> BcrResult<()> {
        let session = self.require_session()?;
        let mode = if enabled { "autoControl" } else { "disable" };
        let mut values = PropertyValues::new();
        values.insert(TRIGGER_CONTROL_MODE.to_string(), Value::from(mode));
        bounded(self.timeout, self.transport.set_properties(&session, values)).await?;
        Ok(())
    }

    /// Read one setting from the device.
    ///
    /// On success the result carries the decoded value.
    pub async fn get(&self, family: &str, key: &str, option: &str) -> OperationResult {
        let id = SettingId::new(family, key, option);
        let result = match self.try_get(id.clone()).await {
            Ok(value) => OperationResult {
                value: Some(value),
                ..OperationResult::success()
            },
            Err(e) => OperationResult::from_error(&e),
        };
        result.for_setting(&id)
    }

    async fn try_get(&self, id: SettingId) -> BcrResult<String> {
        let (session, def) = self.prepare(id, None, false)?;
        tracing::debug!(setting = %def.id, outcome = ?def.outcome, "Resolved get");
        let resolved = def.outcome?;

        let names = [resolved.command.clone()];
        let values = bounded(self.timeout, self.transport.get_properties(&session, &names)).await?;
        read_value(&resolved, &values)
    }

    /// Write one setting to the device and confirm it by reading it back.
    pub async fn set(&self, family: &str, key: &str, option: &str, value: &str) -> OperationResult {
        let id = SettingId::new(family, key, option);
        OperationResult::from_outcome(self.try_set(id.clone(), value).await).for_setting(&id)
    }

    async fn try_set(&self, id: SettingId, value: &str) -> BcrResult<()> {
        let (session, def) = self.prepare(id, Some(value), true)?;
        tracing::debug!(setting = %def.id, outcome = ?def.outcome, "Resolved set");
        let resolved = def.outcome?;

        let mut values = PropertyValues::new();
        values.insert(
            resolved.command.clone(),
            resolved.value.clone().unwrap_or(Value::Null),
        );
        bounded(self.timeout, self.transport.set_properties(&session, values)).await?;

        let names = [resolved.command.clone()];
        let read_back = bounded(self.timeout, self.transport.get_properties(&session, &names)).await?;
        verify_write(&resolved, &read_back)
    }

    /// Queue a read for the next commit.
    ///
    /// A request that fails to resolve is still queued and reported again by
    /// the commit. Without a catalog or a session nothing is queued.
    pub fn get_buffered(&self, family: &str, key: &str, option: &str) -> OperationResult {
        let id = SettingId::new(family, key, option);
        match self.prepare(id.clone(), None, false) {
            Ok((_, def)) => {
                tracing::debug!(setting = %def.id, outcome = ?def.outcome, "Resolved buffered get");
                let result = buffered_result(&def, GET_BUFFERED_MESSAGE);
                self.buffer.lock().push_get(def);
                result
            }
            Err(e) => OperationResult::from_error(&e).for_setting(&id),
        }
    }

    /// Queue a write for the next commit. See [`get_buffered`](Self::get_buffered).
    pub fn set_buffered(&self, family: &str, key: &str, option: &str, value: &str) -> OperationResult {
        let id = SettingId::new(family, key, option);
        match self.prepare(id.clone(), Some(value), true) {
            Ok((_, def)) => {
                tracing::debug!(setting = %def.id, outcome = ?def.outcome, "Resolved buffered set");
                let result = buffered_result(&def, SET_BUFFERED_MESSAGE);
                self.buffer.lock().push_set(def);
                result
            }
            Err(e) => OperationResult::from_error(&e).for_setting(&id),
        }
    }

    /// Apply everything buffered so far.
    ///
    /// The buffer is snapshotted on entry; requests buffered while the
    /// commit runs wait for the next one. The buffer is not cleared. Commits
    /// on one reader run one at a time, in call order.
    pub async fn commit_buffer(&self) -> Vec<CommitEntry> {
        let snapshot = self.buffer.lock().snapshot();
        let _guard = self.commit_lock.lock().await;
        let session = self.session();
        BufferCommitEngine::new(self.transport.as_ref())
            .with_timeout(self.timeout)
            .run(session.as_ref(), snapshot)
            .await
    }

    /// Like [`commit_buffer`](Self::commit_buffer), but rejects with one
    /// `COMMIT_IN_PROGRESS` entry instead of waiting for a running commit.
    pub async fn try_commit_buffer(&self) -> Vec<CommitEntry> {
        let Ok(_guard) = self.commit_lock.try_lock() else {
            tracing::debug!("Commit rejected, another commit is running");
            return vec![CommitEntry::aggregate(None, &BcrError::CommitInProgress)];
        };
        let snapshot = self.buffer.lock().snapshot();
        let session = self.session();
        BufferCommitEngine::new(self.transport.as_ref())
            .with_timeout(self.timeout)
            .run(session.as_ref(), snapshot)
            .await
    }

    /// Drop every buffered request.
    pub fn clear_buffer(&self) {
        self.buffer.lock().clear();
    }

    /// Number of buffered requests, gets and sets together.
    pub fn buffered_len(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Number of buffered gets.
    pub fn buffered_gets(&self) -> usize {
        self.buffer.lock().gets().len()
    }

    /// Number of buffered sets.
    pub fn buffered_sets(&self) -> usize {
        self.buffer.lock().sets().len()
    }

    /// The transport this reader talks through.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    fn require_session(&self) -> BcrResult<Session> {
        self.session().ok_or(BcrError::NoConnection)
    }

    /// Common checks before resolving: a catalog is loaded, a session is
    /// open, and the catalog for this scanner kind exists.
    fn prepare(
        &self,
        id: SettingId,
        value: Option<&str>,
        verify_value: bool,
    ) -> BcrResult<(Session, SettingDefinition)> {
        self.catalogs.ensure_loaded()?;
        let session = self.require_session()?;
        let catalog = self.catalogs.select(&session)?;
        let def = resolve(catalog, id, value, verify_value);
        Ok((session, def))
    }
}

fn buffered_result(def: &SettingDefinition, buffered_message: &str) -> OperationResult {
    let message = if def.is_usable() {
        buffered_message.to_string()
    } else {
        def.message()
    };
    OperationResult::with_message(def.status(), message).for_setting(&def.id)
}

impl std::fmt::Debug for BarcodeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarcodeReader")
            .field("scanner_name", &self.scanner_name)
            .field("connected", &self.is_connected())
            .field("buffered", &self.buffered_len())
            .finish()
    }
}
