//! The device transport seam.
//!
//! A [`Transport`] is anything that can open a scanner session and read or
//! write named device properties: the Data Collection Service over JSON-RPC,
//! a native bridge, or the in-memory mock. The reader never sees how the
//! bytes move; it only sees these calls and [`TransportError`]s.
//!
//! # Example
//!
//! ```rust,ignore
//! let session = transport.open(None).await?;
//! let mut values = PropertyValues::new();
//! values.insert("DEC_CODE39_ENABLED".into(), json!(true));
//! transport.set_properties(&session, values).await?;
//! let read_back = transport
//!     .get_properties(&session, &["DEC_CODE39_ENABLED".to_string()])
//!     .await?;
//! ```

use crate::error::{TransportError, FEATURE_NOT_SUPPORTED};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Device property values keyed by command name.
pub type PropertyValues = serde_json::Map<String, Value>;

/// An open scanner session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session handle handed back to the transport on every call.
    pub handle: Value,
    /// Event filter claimed with the session, when the transport uses one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    /// Physical interface the scanner is attached through (e.g. "USB HID").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanner_name: Option<String>,
}

impl Session {
    pub fn new(handle: impl Into<Value>) -> Self {
        Self {
            handle: handle.into(),
            filter: None,
            interface: None,
            scanner_name: None,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<Value>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    pub fn with_scanner_name(mut self, name: impl Into<String>) -> Self {
        self.scanner_name = Some(name.into());
        self
    }

    /// True for ring/accessory scanners, which attach over USB.
    pub fn is_accessory(&self) -> bool {
        self.interface
            .as_deref()
            .is_some_and(|i| i.to_ascii_uppercase().contains("USB"))
    }
}

/// Executes property reads and writes against a scanner.
///
/// Implementations must be `Send + Sync`; a reader shares one transport
/// across tasks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a session on `scanner_name`, or on the default scanner.
    async fn open(&self, scanner_name: Option<&str>) -> Result<Session, TransportError>;

    async fn close(&self, session: &Session) -> Result<(), TransportError>;

    /// Read the named properties. Properties the device does not know are
    /// simply absent from the returned map.
    async fn get_properties(
        &self,
        session: &Session,
        names: &[String],
    ) -> Result<PropertyValues, TransportError>;

    /// Write properties. Success says nothing about whether individual
    /// writes took effect.
    async fn set_properties(
        &self,
        session: &Session,
        values: PropertyValues,
    ) -> Result<(), TransportError>;

    /// Drive the software trigger.
    async fn set_trigger(&self, _session: &Session, _on: bool) -> Result<(), TransportError> {
        Err(TransportError::new(
            FEATURE_NOT_SUPPORTED,
            "Software trigger not supported by this transport.",
        ))
    }

    /// Names of the scanners currently connected.
    async fn list_scanners(&self) -> Result<Vec<String>, TransportError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessory_detection() {
        assert!(Session::new("s1").with_interface("usb hid").is_accessory());
        assert!(Session::new("s1").with_interface("Ring USB").is_accessory());
        assert!(!Session::new("s1").with_interface("Internal").is_accessory());
        assert!(!Session::new("s1").is_accessory());
    }
}
