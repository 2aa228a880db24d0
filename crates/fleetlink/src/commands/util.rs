//! Shared helpers for command handlers.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use fleetlink_core::{MachineId, ModelState, ModelStore};

use crate::error::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocFormat {
    Json,
    Yaml,
}

fn doc_format(path: &Path) -> Result<DocFormat, CliError> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => Ok(DocFormat::Json),
        Some("yaml" | "yml") => Ok(DocFormat::Yaml),
        _ => Err(CliError::UnknownFormat {
            path: path.display().to_string(),
        }),
    }
}

/// Read a JSON or YAML document, picking the format from the extension.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let format = doc_format(path)?;
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let value = match format {
        DocFormat::Json => serde_json::from_str(&raw)?,
        DocFormat::Yaml => serde_yaml::from_str(&raw)?,
    };
    Ok(value)
}

/// Write a document in the format its extension names.
pub fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let body = match doc_format(path)? {
        DocFormat::Json => {
            let mut s = serde_json::to_string_pretty(value)?;
            s.push('\n');
            s
        }
        DocFormat::Yaml => serde_yaml::to_string(value)?,
    };
    std::fs::write(path, body).map_err(|source| CliError::Write {
        path: path.display().to_string(),
        source,
    })
}

/// Load and validate a model file into a store.
pub fn load_store(path: &Path) -> Result<ModelStore, CliError> {
    let state: ModelState = read_document(path)?;
    Ok(ModelStore::from_state(state)?)
}

pub fn machine_id(raw: &str) -> Result<MachineId, CliError> {
    if raw.trim().is_empty() {
        return Err(CliError::Validation {
            field: "machine".into(),
            reason: "machine ID cannot be empty".into(),
        });
    }
    Ok(MachineId::from(raw))
}
