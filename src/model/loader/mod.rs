//! Registry loaders for different document formats.
//!
//! Currently supports:
//! - **TOML** (.toml)
//! - **JSON** (.json)
//!
//! Both formats share one document shape:
//!
//! ```toml
//! [[entities]]
//! name = "Task"
//! associations = [{ target = "Person" }]
//! fields = [
//!   { name = "name" },
//!   { name = "Label", derived = { attributes = ["name"], joins = ["Person"] } },
//! ]
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use derivo::model::loader::load_registry;
//! use std::path::Path;
//!
//! let registry = load_registry(Path::new("schema.toml"))?;
//! ```

use std::collections::HashSet;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use super::registry::{EntityDefinition, Registry};

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid name pattern"));

/// Errors that can occur when loading a registry.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Unsupported file extension
    #[error("Unsupported file extension: {extension}. Supported: .toml, .json")]
    UnsupportedExtension { extension: String },

    /// IO error reading file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate entity '{name}'")]
    DuplicateEntity { name: String },

    #[error("Duplicate field '{field}' on entity '{entity}'")]
    DuplicateField { entity: String, field: String },

    /// Entity, field or alias name is not an identifier
    #[error("Invalid {kind} name '{name}'")]
    InvalidName { kind: &'static str, name: String },
}

/// Result type for registry loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Document format of a registry source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
}

impl Format {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "toml" => Some(Format::Toml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    entities: Vec<EntityDefinition>,
}

/// Load a registry from a file path.
///
/// The format is selected based on the file extension.
pub fn load_registry(path: &Path) -> LoadResult<Registry> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let format = Format::from_extension(extension).ok_or_else(|| {
        LoadError::UnsupportedExtension {
            extension: extension.to_string(),
        }
    })?;

    let content = std::fs::read_to_string(path)?;
    log::debug!("loading registry from {}", path.display());
    load_registry_from_str(&content, format)
}

/// Load a registry from a string (useful for testing).
pub fn load_registry_from_str(content: &str, format: Format) -> LoadResult<Registry> {
    let document: RegistryDocument = match format {
        Format::Toml => toml::from_str(content)?,
        Format::Json => serde_json::from_str(content)?,
    };
    build_registry(document.entities)
}

/// Load a registry from an already-parsed JSON value.
pub fn load_registry_from_value(value: serde_json::Value) -> LoadResult<Registry> {
    let document: RegistryDocument = serde_json::from_value(value)?;
    build_registry(document.entities)
}

/// Build a registry from entity definitions, rejecting duplicates and
/// non-identifier names.
pub fn build_registry(entities: Vec<EntityDefinition>) -> LoadResult<Registry> {
    let mut registry = Registry::new();

    for entity in entities {
        check_name("entity", &entity.name)?;
        if registry.contains(&entity.name) {
            return Err(LoadError::DuplicateEntity { name: entity.name });
        }

        let mut seen = HashSet::new();
        for field in &entity.fields {
            check_name("field", &field.name)?;
            if !seen.insert(field.name.as_str()) {
                return Err(LoadError::DuplicateField {
                    entity: entity.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        for association in &entity.associations {
            check_name("entity", &association.target)?;
            if let Some(alias) = &association.alias {
                check_name("alias", alias)?;
            }
        }

        registry.insert(entity);
    }

    Ok(registry)
}

fn check_name(kind: &'static str, name: &str) -> LoadResult<()> {
    if NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(LoadError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}
