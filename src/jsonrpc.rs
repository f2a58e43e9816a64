//! JSON-RPC envelope layer for the Data Collection Service.
//!
//! The scanner service speaks JSON-RPC 2.0. How a request reaches it (HTTP on
//! a loopback port, a platform bridge, a browser plugin) is hidden behind
//! [`RpcChannel`]; this module owns the envelope: request construction,
//! response classification, and the mapping of [`Transport`] calls onto
//! service methods.
//!
//! | Transport call | Service methods |
//! |---|---|
//! | `open` | `scanner.connect`, then `scanner.claim` |
//! | `close` | `scanner.release`, then `scanner.disconnect` |
//! | `get_properties` | `scanner.getProperties` |
//! | `set_properties` | `scanner.setProperties` |
//! | `set_trigger` | `internal.setTrigger` |
//! | `list_scanners` | `scanner.listConnectedScanners` |

use async_trait::async_trait;
use bcr_core::error::TransportError;
use bcr_core::{PropertyValues, Session, Transport};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Subsystem every scanner method is routed to.
pub const DATACOLLECTION: &str = "datacollection";

/// Protocol version carried in every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// One JSON-RPC request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`
    pub jsonrpc: String,
    /// Random five-digit id, echoed by the service
    pub id: u32,
    /// Method name, e.g. `scanner.getProperties`
    pub method: String,
    /// Named parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Request for `method` with a fresh id.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self::with_id(rand::thread_rng().gen_range(10000..=99999), method, params)
    }

    /// Request with a fixed id.
    pub fn with_id(id: u32, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// Whether a `null` result counts as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultRequirement {
    /// Set-like calls: `"result": null` is fine
    Nullable,
    /// Get-like calls: the result must carry data
    NonNull,
}

/// Classify a response to `request`.
///
/// Success returns the `result` member. An `error` object with both `code`
/// and `message` is passed through verbatim; everything else (not an object,
/// an id mismatch, a missing or null `result`, an error code that does not fit
/// an `i32`) is a parse error.
pub fn classify(
    request: &JsonRpcRequest,
    response: &Value,
    requirement: ResultRequirement,
) -> Result<Value, TransportError> {
    let Some(object) = response.as_object() else {
        return Err(TransportError::parse_error());
    };
    if !id_matches(request.id, object.get("id")) {
        tracing::debug!(expected = request.id, got = ?object.get("id"), "JSON-RPC id mismatch");
        return Err(TransportError::parse_error());
    }

    if let Some(result) = object.get("result") {
        if !(result.is_null() && requirement == ResultRequirement::NonNull) {
            return Ok(result.clone());
        }
    }

    if let Some(error) = object.get("error").and_then(Value::as_object) {
        // A code outside the status range cannot be passed through.
        let code = error
            .get("code")
            .and_then(Value::as_i64)
            .and_then(|code| i32::try_from(code).ok());
        let message = error.get("message").and_then(Value::as_str);
        if let (Some(code), Some(message)) = (code, message) {
            return Err(TransportError::new(code, message));
        }
    }

    Err(TransportError::parse_error())
}

/// Ids compare loosely: `12345` matches `"12345"`.
fn id_matches(expected: u32, id: Option<&Value>) -> bool {
    match id {
        Some(Value::Number(n)) => n.as_u64() == Some(u64::from(expected)),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok() == Some(expected),
        _ => false,
    }
}

/// Carrier for JSON-RPC requests.
///
/// Returns the raw response body. Carrier failures (connection refused, a
/// non-success HTTP status) should be reported as
/// [`TransportError::not_responding`].
#[async_trait]
pub trait RpcChannel: Send + Sync {
    /// Send `request` to `subsystem` and return the response body.
    async fn call(&self, subsystem: &str, request: &JsonRpcRequest) -> Result<Value, TransportError>;
}

/// [`Transport`] speaking the Data Collection Service protocol over a channel.
pub struct JsonRpcTransport<C> {
    channel: C,
}

impl<C: RpcChannel> JsonRpcTransport<C> {
    /// Transport over `channel`.
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// The underlying channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    async fn invoke(
        &self,
        method: &str,
        params: Option<Value>,
        requirement: ResultRequirement,
    ) -> Result<Value, TransportError> {
        let request = JsonRpcRequest::new(method, params);
        tracing::trace!(id = request.id, method, "JSON-RPC request");
        let response = self.channel.call(DATACOLLECTION, &request).await?;
        let result = classify(&request, &response, requirement);
        if let Err(e) = &result {
            tracing::debug!(id = request.id, method, status = e.code, error = %e, "JSON-RPC call failed");
        }
        result
    }
}

#[async_trait]
impl<C: RpcChannel> Transport for JsonRpcTransport<C> {
    async fn open(&self, scanner_name: Option<&str>) -> Result<Session, TransportError> {
        let params = scanner_name.map(|name| json!({ "scanner": name }));
        let connected = self
            .invoke("scanner.connect", params, ResultRequirement::NonNull)
            .await?;
        let handle = match connected.get("session") {
            Some(handle) if !handle.is_null() => handle.clone(),
            _ => return Err(TransportError::missing_member("session")),
        };

        let claimed = self
            .invoke(
                "scanner.claim",
                Some(json!({ "session": handle })),
                ResultRequirement::NonNull,
            )
            .await?;
        let filter = match claimed.get("filter") {
            Some(filter) if !filter.is_null() => filter.clone(),
            _ => return Err(TransportError::missing_member("filter")),
        };

        let mut session = Session::new(handle).with_filter(filter);
        if let Some(interface) = connected.get("interface").and_then(Value::as_str) {
            session = session.with_interface(interface);
        }
        if let Some(name) = scanner_name {
            session = session.with_scanner_name(name);
        }
        Ok(session)
    }

    async fn close(&self, session: &Session) -> Result<(), TransportError> {
        let params = json!({ "session": session.handle });
        self.invoke("scanner.release", Some(params.clone()), ResultRequirement::Nullable)
            .await?;
        self.invoke("scanner.disconnect", Some(params), ResultRequirement::Nullable)
            .await?;
        Ok(())
    }

    async fn get_properties(
        &self,
        session: &Session,
        names: &[String],
    ) -> Result<PropertyValues, TransportError> {
        let result = self
            .invoke(
                "scanner.getProperties",
                Some(json!({ "session": session.handle, "names": names })),
                ResultRequirement::NonNull,
            )
            .await?;
        match result.get("values") {
            Some(Value::Object(values)) => Ok(values.clone()),
            _ => Err(TransportError::missing_member("values")),
        }
    }

    async fn set_properties(
        &self,
        session: &Session,
        values: PropertyValues,
    ) -> Result<(), TransportError> {
        self.invoke(
            "scanner.setProperties",
            Some(json!({ "session": session.handle, "values": values })),
            ResultRequirement::Nullable,
        )
        .await?;
        Ok(())
    }

    async fn set_trigger(&self, session: &Session, on: bool) -> Result<(), TransportError> {
        self.invoke(
            "internal.setTrigger",
            Some(json!({ "session": session.handle, "state": on })),
            ResultRequirement::Nullable,
        )
        .await?;
        Ok(())
    }

    async fn list_scanners(&self) -> Result<Vec<String>, TransportError> {
        let result = self
            .invoke("scanner.listConnectedScanners", None, ResultRequirement::NonNull)
            .await?;
        let Some(scanners) = result.get("scanners").and_then(Value::as_array) else {
            return Err(TransportError::missing_member("scanners"));
        };
        Ok(scanners
            .iter()
            .filter_map(|s| s.get("scanner").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }
}
