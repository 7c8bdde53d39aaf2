//! Pipeline configuration loaded from a TOML file.
//!
//! Definitions and filter entries are kept as raw JSON objects so each
//! filter kind can validate its own properties.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::filter::{RawObject, RemoteFilterDefinition, optional_str};

#[derive(Debug, Deserialize)]
/// Top-level filters.toml representation.
pub struct PipelineConfig {
    /// State directory, relative to the config file's directory.
    #[serde(default = "default_dot_regolith")]
    pub dot_regolith: PathBuf,
    #[serde(default)]
    pub definitions: BTreeMap<String, RawObject>,
    /// Remote filter packs that definitions may name with `remote = "<id>"`.
    #[serde(default)]
    pub remotes: BTreeMap<String, RawObject>,
    /// Filter entries, run in order.
    #[serde(default)]
    pub filters: Vec<RawObject>,
}

impl PipelineConfig {
    /// Raw definition for a filter id.
    pub fn definition(&self, id: &str) -> Result<&RawObject> {
        self.definitions
            .get(id)
            .with_context(|| format!("filter definition {} not found", id))
    }

    /// Remote pack a definition belongs to, if it names one.
    pub fn remote_for(&self, id: &str) -> Result<Option<RemoteFilterDefinition>> {
        let Some(remote_id) = optional_str(self.definition(id)?, "remote")
            .with_context(|| format!("invalid definition {}", id))?
        else {
            return Ok(None);
        };
        let raw = self
            .remotes
            .get(remote_id)
            .with_context(|| format!("remote {} of definition {} not found", remote_id, id))?;
        RemoteFilterDefinition::from_object(remote_id, raw)
            .map(Some)
            .with_context(|| format!("invalid remote {}", remote_id))
    }
}

/// Load filters.toml from disk.
pub fn load_pipeline_config(path: &Path) -> Result<PipelineConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read pipeline config at {}", path.display()))?;
    parse_pipeline_config(&raw)
}

/// Parse filters.toml contents.
pub fn parse_pipeline_config(raw: &str) -> Result<PipelineConfig> {
    toml::from_str(raw).with_context(|| "failed to parse pipeline config")
}

/// Absolute directory containing the config file.
pub fn project_root(config_path: &Path) -> Result<PathBuf> {
    let dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::path::absolute(&dir)
        .with_context(|| format!("failed to resolve project root {}", dir.display()))
}

fn default_dot_regolith() -> PathBuf {
    PathBuf::from(".regolith")
}
