//! Load schema metadata from a JSON file, process settings from the environment,
//! and build the registry.

use crate::case::{simple_name, to_path_name, to_table_name};
use crate::config::resolved::{AssociationDescriptor, FieldDescriptor, Registry, TypeDescriptor};
use crate::config::types::*;
use crate::config::{ancestor_chain, validate};
use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Build the registry from schema metadata (validates first).
pub fn resolve(config: &SchemaConfig) -> Result<Registry, ConfigError> {
    validate(config)?;

    let mut types = Vec::new();
    let mut type_by_path = HashMap::new();

    for t in config.types.iter().filter(|t| t.entity) {
        let type_name = simple_name(&t.name).to_string();
        let path_name = to_path_name(&type_name);
        let table_name = to_table_name(&path_name);

        let mut columns = Vec::new();
        let mut associations = Vec::new();
        for f in ancestor_chain(config, t)?.iter().flat_map(|a| a.fields.iter()) {
            match (&f.association, f.type_) {
                (Some(assoc), _) => {
                    let target = config.type_by_name(&assoc.target).ok_or_else(|| {
                        ConfigError::MissingReference {
                            kind: "association target",
                            id: assoc.target.clone(),
                        }
                    })?;
                    if let Some(mapped_by) = assoc.mapped_by.as_deref() {
                        let declared = ancestor_chain(config, target)?
                            .iter()
                            .flat_map(|a| a.fields.iter())
                            .any(|tf| tf.name == mapped_by && tf.association.is_none());
                        if !declared {
                            return Err(ConfigError::MissingReference {
                                kind: "mapped_by field",
                                id: format!("{}.{}", target.name, mapped_by),
                            });
                        }
                    }
                    associations.push(AssociationDescriptor {
                        name: f.name.clone(),
                        target_path: to_path_name(simple_name(&target.name)),
                        mapped_by: assoc.mapped_by.clone(),
                        json_ignore: f.json_ignore,
                    });
                }
                (None, Some(field_type)) => columns.push(FieldDescriptor {
                    name: f.name.clone(),
                    field_type,
                    id: f.id,
                    generated: f.generated,
                    nullable: f.nullable,
                    json_ignore: f.json_ignore,
                }),
                (None, None) => {
                    return Err(ConfigError::Validation(format!(
                        "{}.{}: scalar field needs a type",
                        t.name, f.name
                    )))
                }
            }
        }

        let descriptor = TypeDescriptor {
            type_name,
            path_name: path_name.clone(),
            table_name,
            columns,
            associations,
        };
        tracing::debug!(path = %path_name, table = %descriptor.table_name, "registered record type");
        type_by_path.insert(path_name, descriptor.clone());
        types.push(descriptor);
    }

    Ok(Registry { types, type_by_path })
}

/// Read and parse a schema file.
pub async fn load_schema_file(path: impl AsRef<Path>) -> Result<SchemaConfig, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

/// Process settings from environment variables.
#[derive(Clone, Debug)]
pub struct Settings {
    /// When absent, records are kept in memory.
    pub database_url: Option<String>,
    pub schema_path: PathBuf,
    /// First path segment of every API route, without slashes.
    pub api_prefix: String,
    pub bind_addr: String,
    pub max_body_bytes: usize,
}

pub const DEFAULT_API_PREFIX: &str = "!api";
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: None,
            schema_path: PathBuf::from("schema.json"),
            api_prefix: DEFAULT_API_PREFIX.into(),
            bind_addr: "0.0.0.0:3000".into(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Settings {
    /// Read `DATABASE_URL`, `SCHEMA_PATH`, `API_PREFIX`, `BIND_ADDR`, `MAX_BODY_BYTES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let max_body_bytes = match get("MAX_BODY_BYTES") {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::Load(format!("MAX_BODY_BYTES: not a number: {v}")))?,
            None => defaults.max_body_bytes,
        };
        let api_prefix = get("API_PREFIX")
            .map(|p| p.trim_matches('/').to_string())
            .unwrap_or(defaults.api_prefix);
        if api_prefix.is_empty() || api_prefix.contains('/') {
            return Err(ConfigError::Load(format!(
                "API_PREFIX must be a single path segment, got '{api_prefix}'"
            )));
        }
        Ok(Settings {
            database_url: get("DATABASE_URL").filter(|s| !s.is_empty()),
            schema_path: get("SCHEMA_PATH").map(PathBuf::from).unwrap_or(defaults.schema_path),
            api_prefix,
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_body_bytes,
        })
    }
}
