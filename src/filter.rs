//! Per-invocation filter state and the definitions shared by every filter kind.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::SchemaError;

/// Loosely-typed configuration object as produced by the config loader.
pub type RawObject = Map<String, Value>;

/// Metadata common to every filter definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDefinition {
    pub id: String,
}

impl FilterDefinition {
    pub fn from_id(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Definition of a filter pack fetched from a remote repository.
///
/// Downloading is handled elsewhere; this only knows where the pack lives
/// once it has been installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFilterDefinition {
    pub id: String,
    pub url: String,
    pub version: String,
}

impl RemoteFilterDefinition {
    /// Parse a `[remotes.<id>]` table: `url` is required, `version` optional.
    pub fn from_object(id: &str, obj: &RawObject) -> Result<Self, SchemaError> {
        Ok(Self {
            id: id.to_string(),
            url: required_str(obj, "url")?.to_string(),
            version: optional_str(obj, "version")?.unwrap_or_default().to_string(),
        })
    }

    /// Directory the remote pack was downloaded into.
    pub fn download_path(&self, dot_regolith_path: &Path) -> PathBuf {
        dot_regolith_path.join("cache").join("filters").join(&self.id)
    }
}

/// Per-run state of one filter entry of a pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub id: String,
    pub description: String,
    pub disabled: bool,
    pub arguments: Vec<String>,
    pub settings: Map<String, Value>,
}

impl Filter {
    /// Parse the fields every filter entry shares.
    pub fn from_object(obj: &RawObject) -> Result<Self, SchemaError> {
        let id = required_str(obj, "filter")?.to_string();
        let description = optional_str(obj, "description")?
            .unwrap_or_default()
            .to_string();
        let disabled = match obj.get("disabled") {
            None => false,
            Some(Value::Bool(disabled)) => *disabled,
            Some(_) => return Err(SchemaError::mistyped("disabled", "bool")),
        };
        let arguments = match obj.get("arguments") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(idx, item)| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| SchemaError::mistyped(format!("arguments[{idx}]"), "string"))
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(SchemaError::mistyped("arguments", "array")),
        };
        let settings = match obj.get("settings") {
            None => Map::new(),
            Some(Value::Object(settings)) => settings.clone(),
            Some(_) => return Err(SchemaError::mistyped("settings", "object")),
        };
        Ok(Self {
            id,
            description,
            disabled,
            arguments,
            settings,
        })
    }
}

/// Fetch a property that must be present and hold a string.
pub fn required_str<'a>(obj: &'a RawObject, property: &str) -> Result<&'a str, SchemaError> {
    optional_str(obj, property)?.ok_or_else(|| SchemaError::missing(property))
}

/// Fetch a property that may be absent but must be a string when present.
pub fn optional_str<'a>(obj: &'a RawObject, property: &str) -> Result<Option<&'a str>, SchemaError> {
    match obj.get(property) {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(SchemaError::mistyped(property, "string")),
    }
}
