//! Setting catalogs - the static description of every controllable setting.
//!
//! A [`SettingCatalog`] is an ordered list of [`SettingDescriptor`]s, each keyed
//! by a (family, key, option) triple and naming the device command plus the
//! rule used to encode its value. Catalogs are loaded once and read-only
//! afterwards; different device kinds (a decoder, a ring accessory) each get
//! their own catalog with the same descriptor shape.
//!
//! Descriptors are deliberately loose: every field is optional and the
//! type-specific members are kept as raw JSON. Shape problems (missing command,
//! a `valueMap` that is not a sequence, an unknown `valueType`) are reported by
//! the resolver as `INVALID_SETTINGS_DEF` for the descriptor that was asked for,
//! or all at once by [`SettingCatalog::validate`].
//!
//! # Formats
//!
//! JSON (an array of descriptor objects):
//!
//! ```json
//! [
//!   { "family": "Symbology", "key": "Code39", "option": "Enable",
//!     "command": "DEC_CODE39_ENABLED", "valueType": "map",
//!     "valueMap": [ { "true": true }, { "false": false } ] }
//! ]
//! ```
//!
//! TOML (`[[setting]]` tables, camelCase or snake_case keys):
//!
//! ```toml
//! name = "Swift"
//!
//! [[setting]]
//! family = "Symbology"
//! key = "Code39"
//! option = "MinLength"
//! command = "DEC_CODE39_MIN_LENGTH"
//! value_type = "int"
//! value_range = [ { min = 1 }, { max = 48 } ]
//! ```

use crate::error::{BcrError, BcrResult};
use crate::resolver::{resolve_descriptor, SettingId};
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// One entry of a [`SettingCatalog`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
    /// Device-native property name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// One of `map`, `int`, `string`, `list`.
    #[serde(default, alias = "value_type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    /// Sequence of single-entry `{external: device}` objects.
    #[serde(default, alias = "value_map", skip_serializing_if = "Option::is_none")]
    pub value_map: Option<Value>,
    /// Sequence of single-entry `{device: external}` objects; `"*"` matches any
    /// device value not listed.
    #[serde(
        default,
        alias = "reverse_value_map",
        skip_serializing_if = "Option::is_none"
    )]
    pub reverse_value_map: Option<Value>,
    /// Sequence of single-entry `{attribute: integer}` objects (min/max).
    /// Advisory only: the device enforces the range.
    #[serde(default, alias = "value_range", skip_serializing_if = "Option::is_none")]
    pub value_range: Option<Value>,
    /// Accepted external values for `list` settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Value>,
}

impl SettingDescriptor {
    /// True when this descriptor's family equals `family`.
    pub fn has_family(&self, family: &str) -> bool {
        self.family.as_deref() == Some(family)
    }

    /// True when family, key and option all match.
    pub fn matches(&self, family: &str, key: &str, option: &str) -> bool {
        self.has_family(family)
            && self.key.as_deref() == Some(key)
            && self.option.as_deref() == Some(option)
    }

    /// The identifying triple, when all three parts are present.
    pub fn id(&self) -> Option<SettingId> {
        match (&self.family, &self.key, &self.option) {
            (Some(f), Some(k), Some(o)) => Some(SettingId::new(f, k, o)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TomlCatalog {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    setting: Vec<SettingDescriptor>,
}

/// Problem found by [`SettingCatalog::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogIssue {
    /// Position of the offending descriptor.
    pub index: usize,
    pub id: Option<SettingId>,
    pub error: BcrError,
}

impl std::fmt::Display for CatalogIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(f, "entry {} ({}): {}", self.index, id, self.error),
            None => write!(f, "entry {}: {}", self.index, self.error),
        }
    }
}

/// Ordered, immutable collection of setting descriptors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingCatalog {
    name: String,
    descriptors: Vec<SettingDescriptor>,
}

impl SettingCatalog {
    pub fn new(name: impl Into<String>, descriptors: Vec<SettingDescriptor>) -> Self {
        Self {
            name: name.into(),
            descriptors,
        }
    }

    /// Parse a JSON catalog. The document must be an array.
    pub fn from_json_str(name: impl Into<String>, json: &str) -> BcrResult<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| {
            BcrError::InvalidSettingsDef(format!("Settings definition is not valid JSON: {}", e))
        })?;
        Self::from_json_value(name, value)
    }

    pub fn from_json_value(name: impl Into<String>, value: Value) -> BcrResult<Self> {
        let Value::Array(entries) = value else {
            return Err(BcrError::InvalidSettingsDef(
                "Invalid settings definition object, needs to be an array.".to_string(),
            ));
        };
        let descriptors = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                serde_json::from_value::<SettingDescriptor>(entry).map_err(|e| {
                    BcrError::InvalidSettingsDef(format!(
                        "Settings definition entry {} is malformed: {}",
                        i, e
                    ))
                })
            })
            .collect::<BcrResult<Vec<_>>>()?;
        Ok(Self::new(name, descriptors))
    }

    /// Parse a TOML catalog made of `[[setting]]` tables.
    ///
    /// A top-level `name` key, when present, overrides `name`.
    pub fn from_toml_str(name: impl Into<String>, toml_str: &str) -> BcrResult<Self> {
        let parsed: TomlCatalog = toml::from_str(toml_str).map_err(|e| {
            BcrError::InvalidSettingsDef(format!("Settings definition is not valid TOML: {}", e))
        })?;
        let name = parsed.name.unwrap_or_else(|| name.into());
        Ok(Self::new(name, parsed.setting))
    }

    /// Load a catalog file, choosing the format from the extension
    /// (`.json` or `.toml`). The catalog is named after the file stem unless
    /// the file names itself.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("catalog")
            .to_string();
        let catalog = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => Self::from_json_str(stem, &content),
            Some("toml") => Self::from_toml_str(stem, &content),
            other => return Err(anyhow!("Unsupported catalog format: {:?}", other)),
        }
        .with_context(|| format!("Failed to parse catalog {}", path.display()))?;
        tracing::debug!(
            catalog = %catalog.name,
            entries = catalog.len(),
            "Loaded setting catalog"
        );
        Ok(catalog)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptors(&self) -> &[SettingDescriptor] {
        &self.descriptors
    }

    pub fn iter(&self) -> impl Iterator<Item = &SettingDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn contains_family(&self, family: &str) -> bool {
        self.descriptors.iter().any(|d| d.has_family(family))
    }

    /// First descriptor matching the triple.
    pub fn find(&self, family: &str, key: &str, option: &str) -> Option<&SettingDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.matches(family, key, option))
    }

    /// Check every descriptor's shape and report duplicate triples.
    ///
    /// Lookups always use the first of several duplicates; later ones are
    /// reported here and never reached by the resolver. Nothing is logged;
    /// callers decide what to do with the issues.
    pub fn validate(&self) -> Result<(), Vec<CatalogIssue>> {
        let mut issues = Vec::new();
        let mut seen: HashMap<SettingId, usize> = HashMap::new();

        for (index, descriptor) in self.descriptors.iter().enumerate() {
            let id = descriptor.id();
            let Some(ref setting_id) = id else {
                issues.push(CatalogIssue {
                    index,
                    id: None,
                    error: BcrError::InvalidSettingsDef(
                        "Setting definition missing family, key or option property.".to_string(),
                    ),
                });
                continue;
            };

            if let Some(first) = seen.get(setting_id) {
                issues.push(CatalogIssue {
                    index,
                    id: id.clone(),
                    error: BcrError::InvalidSettingsDef(format!(
                        "Duplicate setting definition, first defined at entry {}.",
                        first
                    )),
                });
                continue;
            }
            seen.insert(setting_id.clone(), index);

            if let Err(error) = resolve_descriptor(descriptor, None, false) {
                issues.push(CatalogIssue { index, id, error });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}
