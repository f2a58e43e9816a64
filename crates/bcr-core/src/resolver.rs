//! Resolution of (family, key, option) triples into device commands.
//!
//! [`resolve`] is a pure function of the catalog and its arguments. It scans
//! the catalog in order, stops at the first descriptor matching all three
//! parts, checks that descriptor's shape, and (for writes) encodes the value.
//! The outcome is a [`SettingDefinition`] that always carries the requested
//! identifier, whether or not resolution succeeded; failed definitions are
//! inert and only ever surface their status and message.

use crate::catalog::{SettingCatalog, SettingDescriptor};
use crate::codec::{associations, ValueRule, ValueType};
use crate::error::{BcrError, BcrResult, MSG_OPERATION_COMPLETED, SUCCESS};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// External identifier of a setting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SettingId {
    pub family: String,
    pub key: String,
    pub option: String,
}

impl SettingId {
    pub fn new(family: impl Into<String>, key: impl Into<String>, option: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            key: key.into(),
            option: option.into(),
        }
    }
}

impl fmt::Display for SettingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.family, self.key, self.option)
    }
}

/// A usable definition: the device command, its rule, and the encoded value
/// when one was verified.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSetting {
    pub command: String,
    pub rule: ValueRule,
    pub value: Option<Value>,
}

impl ResolvedSetting {
    pub fn value_type(&self) -> ValueType {
        self.rule.value_type()
    }
}

/// Resolver output and buffer entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingDefinition {
    pub id: SettingId,
    pub outcome: BcrResult<ResolvedSetting>,
}

impl SettingDefinition {
    /// A definition that failed before the catalog was consulted.
    pub fn failed(id: SettingId, error: BcrError) -> Self {
        Self {
            id,
            outcome: Err(error),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn status(&self) -> i32 {
        match &self.outcome {
            Ok(_) => SUCCESS,
            Err(e) => e.status(),
        }
    }

    pub fn message(&self) -> String {
        match &self.outcome {
            Ok(_) => MSG_OPERATION_COMPLETED.to_string(),
            Err(e) => e.to_string(),
        }
    }

    pub fn resolved(&self) -> Option<&ResolvedSetting> {
        self.outcome.as_ref().ok()
    }

    pub fn command(&self) -> Option<&str> {
        self.resolved().map(|r| r.command.as_str())
    }
}

/// Look up `id` in `catalog` and, when `verify_value` is set, encode `value`.
pub fn resolve(
    catalog: &SettingCatalog,
    id: SettingId,
    value: Option<&str>,
    verify_value: bool,
) -> SettingDefinition {
    let mut found_family = false;
    let mut outcome = None;

    for descriptor in catalog.iter() {
        if !descriptor.has_family(&id.family) {
            continue;
        }
        found_family = true;
        if descriptor.matches(&id.family, &id.key, &id.option) {
            outcome = Some(resolve_descriptor(descriptor, value, verify_value));
            break;
        }
    }

    let outcome = outcome.unwrap_or_else(|| {
        if found_family {
            Err(BcrError::UnsupportedKeyOrOption)
        } else {
            Err(BcrError::UnsupportedFamilyName(id.family.clone()))
        }
    });

    match &outcome {
        Ok(resolved) => tracing::trace!(
            catalog = catalog.name(),
            setting = %id,
            command = %resolved.command,
            value_type = %resolved.value_type(),
            value = ?resolved.value,
            "Resolved setting"
        ),
        Err(e) => tracing::debug!(
            catalog = catalog.name(),
            setting = %id,
            status = e.status(),
            error = %e,
            "Setting resolution failed"
        ),
    }

    SettingDefinition { id, outcome }
}

/// Check one descriptor's shape and optionally encode `value` with it.
pub fn resolve_descriptor(
    descriptor: &SettingDescriptor,
    value: Option<&str>,
    verify_value: bool,
) -> BcrResult<ResolvedSetting> {
    let command = descriptor
        .command
        .clone()
        .ok_or_else(|| def_error("Setting definition missing command property."))?;
    let value_type: ValueType = descriptor
        .value_type
        .as_deref()
        .ok_or_else(|| def_error("Setting definition missing valueType property."))?
        .parse()?;

    let rule = match value_type {
        ValueType::Map => {
            let raw = descriptor
                .value_map
                .as_ref()
                .ok_or_else(|| def_error("Settings definition missing valueMap property for map type."))?;
            let value_map = associations(raw).ok_or_else(|| {
                def_error("Settings definition has invalid valueMap property, not an array.")
            })?;
            let reverse_value_map = descriptor
                .reverse_value_map
                .as_ref()
                .map(|raw| {
                    associations(raw).ok_or_else(|| {
                        def_error(
                            "Settings definition has invalid reverseValueMap property, not an array.",
                        )
                    })
                })
                .transpose()?;
            ValueRule::Map {
                value_map,
                reverse_value_map,
            }
        }
        ValueType::Int => {
            let raw = descriptor.value_range.as_ref().ok_or_else(|| {
                def_error("Setting definition missing valueRange property for int type.")
            })?;
            let value_range = associations(raw).ok_or_else(|| {
                def_error("Setting definition has invalid valueRange property, not an array.")
            })?;
            ValueRule::Int { value_range }
        }
        ValueType::String => ValueRule::String,
        ValueType::List => {
            let raw = descriptor.values.as_ref().ok_or_else(|| {
                def_error("Setting definition missing values property for list type.")
            })?;
            let values = raw.as_array().cloned().ok_or_else(|| {
                def_error("Setting definition has invalid values property, not an array.")
            })?;
            ValueRule::List { values }
        }
    };

    let value = if verify_value {
        Some(rule.encode(value)?)
    } else {
        None
    };

    Ok(ResolvedSetting {
        command,
        rule,
        value,
    })
}

fn def_error(message: &str) -> BcrError {
    BcrError::InvalidSettingsDef(message.to_string())
}
