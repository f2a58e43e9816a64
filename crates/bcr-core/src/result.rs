//! Result values delivered to callers.
//!
//! Every reader operation ends in one of these, success or failure. Both
//! serialize to the JSON shape application code has always received, so a
//! front end can forward them untouched.

use crate::error::{BcrError, BcrResult, MSG_OPERATION_COMPLETED, SUCCESS};
use crate::resolver::{SettingDefinition, SettingId};
use serde::{Deserialize, Serialize};

/// Outcome of one immediate operation (get, set, a buffering call, connect).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub status: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
    /// Decoded value, for successful reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl OperationResult {
    pub fn success() -> Self {
        Self::with_message(SUCCESS, MSG_OPERATION_COMPLETED)
    }

    pub fn with_message(status: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            family: None,
            key: None,
            option: None,
            value: None,
        }
    }

    pub fn from_error(error: &BcrError) -> Self {
        Self::with_message(error.status(), error.to_string())
    }

    /// Collapse a unit outcome.
    pub fn from_outcome(outcome: BcrResult<()>) -> Self {
        match outcome {
            Ok(()) => Self::success(),
            Err(e) => Self::from_error(&e),
        }
    }

    /// Status and message of a definition, tagged with its identifier.
    pub fn from_definition(def: &SettingDefinition) -> Self {
        Self::with_message(def.status(), def.message()).for_setting(&def.id)
    }

    pub fn for_setting(mut self, id: &SettingId) -> Self {
        self.family = Some(id.family.clone());
        self.key = Some(id.key.clone());
        self.option = Some(id.option.clone());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == SUCCESS
    }
}

/// Which buffered operation a commit entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferedMethod {
    #[serde(rename = "getBuffered")]
    GetBuffered,
    #[serde(rename = "setBuffered")]
    SetBuffered,
}

impl BufferedMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BufferedMethod::GetBuffered => "getBuffered",
            BufferedMethod::SetBuffered => "setBuffered",
        }
    }
}

impl std::fmt::Display for BufferedMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element of the list produced by a commit.
///
/// Per-setting entries carry the method and identifier. Aggregate entries
/// (a whole sub-batch failed, or the commit never started) have `None`
/// identifiers, and `None` method when the commit never started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEntry {
    pub method: Option<BufferedMethod>,
    pub family: Option<String>,
    pub key: Option<String>,
    pub option: Option<String>,
    pub status: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl CommitEntry {
    pub fn aggregate(method: Option<BufferedMethod>, error: &BcrError) -> Self {
        Self {
            method,
            family: None,
            key: None,
            option: None,
            status: error.status(),
            message: error.to_string(),
            value: None,
        }
    }

    /// Entry for one setting. `Ok(value)` is a success, with the decoded
    /// value for reads.
    pub fn for_setting(method: BufferedMethod, id: &SettingId, outcome: BcrResult<Option<String>>) -> Self {
        let (status, message, value) = match outcome {
            Ok(value) => (SUCCESS, MSG_OPERATION_COMPLETED.to_string(), value),
            Err(e) => (e.status(), e.to_string(), None),
        };
        Self {
            method: Some(method),
            family: Some(id.family.clone()),
            key: Some(id.key.clone()),
            option: Some(id.option.clone()),
            status,
            message,
            value,
        }
    }

    /// Entry for a definition that failed at buffering time.
    pub fn from_definition(method: BufferedMethod, def: &SettingDefinition) -> Self {
        Self {
            method: Some(method),
            family: Some(def.id.family.clone()),
            key: Some(def.id.key.clone()),
            option: Some(def.id.option.clone()),
            status: def.status(),
            message: def.message(),
            value: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SUCCESS
    }

    pub fn is_aggregate(&self) -> bool {
        self.family.is_none() && self.key.is_none() && self.option.is_none()
    }
}
