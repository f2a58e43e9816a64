//! Discovery of connected scanners.

use crate::commit::bounded;
use crate::config::ReaderConfig;
use bcr_core::Transport;
use std::sync::Arc;
use std::time::Duration;

/// Lists the scanners a [`BarcodeReader`](crate::BarcodeReader) can open.
pub struct BarcodeReaders {
    transport: Arc<dyn Transport>,
    default_scanner: String,
    timeout: Option<Duration>,
}

impl BarcodeReaders {
    /// Discovery over `transport`.
    pub fn new(transport: Arc<dyn Transport>, config: &ReaderConfig) -> Self {
        Self {
            transport,
            default_scanner: config.default_scanner.clone(),
            timeout: config.request_timeout(),
        }
    }

    /// Names of the connected scanners.
    ///
    /// Falls back to the configured default scanner when the service lists
    /// none or cannot be asked, so the result is never empty.
    pub async fn available_readers(&self) -> Vec<String> {
        match bounded(self.timeout, self.transport.list_scanners()).await {
            Ok(names) if !names.is_empty() => names,
            Ok(_) => vec![self.default_scanner.clone()],
            Err(e) => {
                tracing::debug!(status = e.code, error = %e, "Scanner listing failed, using default");
                vec![self.default_scanner.clone()]
            }
        }
    }
}
