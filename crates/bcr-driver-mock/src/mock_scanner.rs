//! In-memory scanner implementing [`Transport`].
//!
//! Holds a property table and answers reads and writes the way the Data
//! Collection Service does, including its weak spots: a write can be
//! accepted and silently ignored, and a read simply omits properties the
//! device does not report.
//!
//! # Example
//!
//! ```rust,ignore
//! use bcr_driver_mock::{MockScanner, TimingConfig};
//! use serde_json::json;
//!
//! let scanner = MockScanner::builder()
//!     .property("DEC_CODE39_ENABLED", json!(false))
//!     .ignore_writes_to("DEC_CODE39_MIN_LENGTH")
//!     .interface("USB HID")
//!     .timing(TimingConfig::loopback_service())
//!     .build();
//! ```

use crate::common::{ops, ErrorConfig, MockRng, TimingConfig};
use async_trait::async_trait;
use bcr_core::error::{TransportError, INVALID_PARAMETER, SCANNER_NOT_FOUND};
use bcr_core::transport::{PropertyValues, Session, Transport};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Name the mock reports for itself when no scanner list is configured.
pub const DEFAULT_MOCK_SCANNER: &str = "dcs.scanner.imager";

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Open { scanner_name: Option<String> },
    Close,
    GetProperties { names: Vec<String> },
    SetProperties { values: PropertyValues },
    SetTrigger { on: bool },
    ListScanners,
}

/// Simulated barcode scanner.
pub struct MockScanner {
    properties: Mutex<PropertyValues>,
    ignored_writes: HashSet<String>,
    unreported: HashSet<String>,
    interface: Option<String>,
    scanners: Vec<String>,
    timing: TimingConfig,
    error_config: ErrorConfig,
    rng: MockRng,
    calls: Mutex<Vec<MockCall>>,
    open_sessions: Mutex<HashSet<String>>,
    next_session: AtomicU64,
    trigger_on: AtomicBool,
}

impl MockScanner {
    /// Scanner with no properties and no failures.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> MockScannerBuilder {
        MockScannerBuilder::default()
    }

    /// Current device value of `name`, ignoring the unreported set.
    pub fn property(&self, name: &str) -> Option<Value> {
        self.properties.lock().get(name).cloned()
    }

    /// Change a device value behind the reader's back.
    pub fn set_property(&self, name: impl Into<String>, value: Value) {
        self.properties.lock().insert(name.into(), value);
    }

    /// Calls seen so far, oldest first.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn trigger_active(&self) -> bool {
        self.trigger_on.load(Ordering::SeqCst)
    }

    pub fn open_session_count(&self) -> usize {
        self.open_sessions.lock().len()
    }

    pub fn error_config(&self) -> &ErrorConfig {
        &self.error_config
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().push(call);
    }

    async fn simulate_latency(&self) {
        let delay = self.timing.delay(self.rng.jitter(self.timing.jitter_ms));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_session(&self, session: &Session) -> Result<(), TransportError> {
        let handle = session_key(&session.handle);
        if self.open_sessions.lock().contains(&handle) {
            Ok(())
        } else {
            Err(TransportError::new(
                INVALID_PARAMETER,
                format!("Invalid session: {}", handle),
            ))
        }
    }
}

impl Default for MockScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn session_key(handle: &Value) -> String {
    match handle {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Transport for MockScanner {
    async fn open(&self, scanner_name: Option<&str>) -> Result<Session, TransportError> {
        self.record(MockCall::Open {
            scanner_name: scanner_name.map(str::to_string),
        });
        self.simulate_latency().await;
        self.error_config.check_operation(ops::OPEN)?;

        let name = match scanner_name {
            Some(name) if !self.scanners.is_empty() && !self.scanners.iter().any(|s| s == name) => {
                return Err(TransportError::new(
                    SCANNER_NOT_FOUND,
                    format!("Scanner not found: {}", name),
                ));
            }
            Some(name) => name.to_string(),
            None => self
                .scanners
                .first()
                .cloned()
                .unwrap_or_else(|| DEFAULT_MOCK_SCANNER.to_string()),
        };

        let id = self.next_session.fetch_add(1, Ordering::SeqCst);
        let handle = format!("mock-session-{}", id);
        self.open_sessions.lock().insert(handle.clone());

        let mut session = Session::new(handle.clone())
            .with_filter(format!("mock-filter-{}", id))
            .with_scanner_name(name.clone());
        if let Some(interface) = &self.interface {
            session = session.with_interface(interface.clone());
        }
        tracing::debug!(session = %handle, scanner = %name, "Mock scanner opened");
        Ok(session)
    }

    async fn close(&self, session: &Session) -> Result<(), TransportError> {
        self.record(MockCall::Close);
        self.simulate_latency().await;
        self.error_config.check_operation(ops::CLOSE)?;
        self.check_session(session)?;
        self.open_sessions.lock().remove(&session_key(&session.handle));
        self.trigger_on.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn get_properties(
        &self,
        session: &Session,
        names: &[String],
    ) -> Result<PropertyValues, TransportError> {
        self.record(MockCall::GetProperties {
            names: names.to_vec(),
        });
        self.simulate_latency().await;
        self.error_config.check_operation(ops::GET_PROPERTIES)?;
        self.check_session(session)?;

        let properties = self.properties.lock();
        let values: PropertyValues = names
            .iter()
            .filter(|name| !self.unreported.contains(*name))
            .filter_map(|name| properties.get(name).map(|v| (name.clone(), v.clone())))
            .collect();
        tracing::trace!(requested = names.len(), returned = values.len(), "Mock read");
        Ok(values)
    }

    async fn set_properties(
        &self,
        session: &Session,
        values: PropertyValues,
    ) -> Result<(), TransportError> {
        self.record(MockCall::SetProperties {
            values: values.clone(),
        });
        self.simulate_latency().await;
        self.error_config.check_operation(ops::SET_PROPERTIES)?;
        self.check_session(session)?;

        let mut properties = self.properties.lock();
        for (name, value) in values {
            if self.ignored_writes.contains(&name) {
                tracing::trace!(property = %name, "Mock ignored write");
                continue;
            }
            properties.insert(name, value);
        }
        Ok(())
    }

    async fn set_trigger(&self, session: &Session, on: bool) -> Result<(), TransportError> {
        self.record(MockCall::SetTrigger { on });
        self.simulate_latency().await;
        self.error_config.check_operation(ops::SET_TRIGGER)?;
        self.check_session(session)?;
        self.trigger_on.store(on, Ordering::SeqCst);
        Ok(())
    }

    async fn list_scanners(&self) -> Result<Vec<String>, TransportError> {
        self.record(MockCall::ListScanners);
        self.simulate_latency().await;
        self.error_config.check_operation(ops::LIST_SCANNERS)?;
        Ok(self.scanners.clone())
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for [`MockScanner`].
#[derive(Default)]
pub struct MockScannerBuilder {
    properties: PropertyValues,
    ignored_writes: HashSet<String>,
    unreported: HashSet<String>,
    interface: Option<String>,
    scanners: Vec<String>,
    timing: TimingConfig,
    error_config: ErrorConfig,
    rng_seed: Option<u64>,
}

impl MockScannerBuilder {
    /// Initial value of one device property
    pub fn property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn properties(mut self, values: PropertyValues) -> Self {
        self.properties.extend(values);
        self
    }

    /// Writes to `name` are accepted but have no effect
    pub fn ignore_writes_to(mut self, name: impl Into<String>) -> Self {
        self.ignored_writes.insert(name.into());
        self
    }

    /// `name` is never included in read responses
    pub fn unreported(mut self, name: impl Into<String>) -> Self {
        self.unreported.insert(name.into());
        self
    }

    /// Interface string reported on opened sessions
    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Scanner names returned by `list_scanners`; opening any other name fails
    pub fn scanners<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scanners = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    pub fn error_config(mut self, config: ErrorConfig) -> Self {
        self.error_config = config;
        self
    }

    /// Seed for latency jitter
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn build(self) -> MockScanner {
        MockScanner {
            properties: Mutex::new(self.properties),
            ignored_writes: self.ignored_writes,
            unreported: self.unreported,
            interface: self.interface,
            scanners: self.scanners,
            timing: self.timing,
            error_config: self.error_config,
            rng: MockRng::new(self.rng_seed),
            calls: Mutex::new(Vec::new()),
            open_sessions: Mutex::new(HashSet::new()),
            next_session: AtomicU64::new(1),
            trigger_on: AtomicBool::new(false),
        }
    }
}
