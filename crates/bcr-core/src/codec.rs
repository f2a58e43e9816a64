//! Value conversion between the external string vocabulary and device values.
//!
//! Application code always speaks strings (`"true"`, `"12"`, `"continuous"`).
//! Devices speak whatever their property uses: booleans, integers, enumerated
//! codes. A [`ValueRule`] is the parsed, validated form of a descriptor's
//! type-specific members and performs both directions:
//!
//! | type | encode (external -> device) | decode (device -> external) |
//! |---|---|---|
//! | map | first `valueMap` key equal to the value | `reverseValueMap` (with `"*"` wildcard), else first `valueMap` entry whose value equals |
//! | int | parse as integer | stringify the number |
//! | string | unchanged | device string unchanged |
//! | list | exact member of `values` | device string unchanged |
//!
//! Encode failures and decode failures are both `INVALID_SETTING_VALUE` but
//! carry different messages; callers tell them apart by which direction ran.

use crate::error::{BcrError, BcrResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Wildcard key in a reverse value map.
pub const WILDCARD: &str = "*";

/// Ordered list of single-entry associations, flattened.
pub type Associations = Vec<(String, Value)>;

/// The `valueType` of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Map,
    Int,
    String,
    List,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Map => "map",
            ValueType::Int => "int",
            ValueType::String => "string",
            ValueType::List => "list",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = BcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "map" => Ok(ValueType::Map),
            "int" => Ok(ValueType::Int),
            "string" => Ok(ValueType::String),
            "list" => Ok(ValueType::List),
            other => Err(BcrError::InvalidSettingsDef(format!(
                "Unsupported setting value data type: {}",
                other
            ))),
        }
    }
}

/// Validated encoding rule of one setting.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueRule {
    Map {
        value_map: Associations,
        reverse_value_map: Option<Associations>,
    },
    Int {
        /// Advisory min/max metadata. Not enforced here.
        value_range: Associations,
    },
    String,
    List {
        values: Vec<Value>,
    },
}

impl ValueRule {
    pub fn value_type(&self) -> ValueType {
        match self {
            ValueRule::Map { .. } => ValueType::Map,
            ValueRule::Int { .. } => ValueType::Int,
            ValueRule::String => ValueType::String,
            ValueRule::List { .. } => ValueType::List,
        }
    }

    /// Convert an external value into the device's native value.
    ///
    /// `None` always fails: a set without a value cannot be encoded.
    pub fn encode(&self, value: Option<&str>) -> BcrResult<Value> {
        match self {
            ValueRule::Map { value_map, .. } => {
                let value = value.ok_or_else(invalid_value)?;
                value_map
                    .iter()
                    .find(|(external, device)| external == value && !device.is_null())
                    .map(|(_, device)| device.clone())
                    .ok_or_else(invalid_value)
            }
            ValueRule::Int { .. } => value
                .and_then(parse_int)
                .map(Value::from)
                .ok_or_else(|| {
                    BcrError::InvalidSettingValue("Invalid setting value, not a number.".to_string())
                }),
            ValueRule::String => value
                .map(|v| Value::String(v.to_string()))
                .ok_or_else(invalid_value),
            ValueRule::List { values } => {
                let value = value.ok_or_else(invalid_value)?;
                if values.iter().any(|v| v.as_str() == Some(value)) {
                    Ok(Value::String(value.to_string()))
                } else {
                    Err(invalid_value())
                }
            }
        }
    }

    /// Convert a device value read back from the scanner into the external
    /// vocabulary.
    pub fn decode(&self, device: &Value) -> BcrResult<String> {
        match self {
            ValueRule::Map {
                reverse_value_map: Some(reverse),
                ..
            } => {
                let mut wildcard = None;
                for (device_key, external) in reverse {
                    if device.as_str() == Some(device_key.as_str()) {
                        return Ok(external_string(external));
                    }
                    if device_key == WILDCARD && wildcard.is_none() {
                        wildcard = Some(external);
                    }
                }
                wildcard
                    .map(external_string)
                    .ok_or_else(BcrError::unexpected_device_value)
            }
            ValueRule::Map {
                value_map,
                reverse_value_map: None,
            } => value_map
                .iter()
                .find(|(_, mapped)| device_values_equal(mapped, device))
                .map(|(external, _)| external.clone())
                .ok_or_else(BcrError::unexpected_device_value),
            ValueRule::Int { .. } => match device {
                Value::Number(n) => Ok(number_string(n)),
                Value::String(s) => Ok(s.clone()),
                Value::Bool(b) => Ok(b.to_string()),
                _ => Err(BcrError::unexpected_device_value()),
            },
            ValueRule::String | ValueRule::List { .. } => device
                .as_str()
                .map(str::to_string)
                .ok_or_else(BcrError::unexpected_device_value),
        }
    }
}

/// Equality of two device values. Numbers compare by value, so `1` equals
/// `1.0`; everything else compares strictly.
pub fn device_values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

fn invalid_value() -> BcrError {
    BcrError::InvalidSettingValue("Invalid setting value.".to_string())
}

/// Integer parse used by int encoding. Accepts surrounding whitespace and any
/// finite decimal number, truncated toward zero, so `"1e3"` is 1000. Radix
/// prefixes such as `"0x10"` are not numbers here.
fn parse_int(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(n);
    }
    let f = trimmed.parse::<f64>().ok()?;
    if f.is_finite() && f.abs() < i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

fn number_string(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

fn external_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flatten a sequence of single-entry objects into ordered pairs.
///
/// Returns `None` when `value` is not a sequence. Entries that are not
/// objects contribute nothing; an object with several members contributes
/// them all in order.
pub fn associations(value: &Value) -> Option<Associations> {
    let entries = value.as_array()?;
    Some(
        entries
            .iter()
            .filter_map(Value::as_object)
            .flat_map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect(),
    )
}
