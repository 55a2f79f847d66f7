//! Schema validation: referential integrity and naming consistency.

use crate::case::{simple_name, to_path_name};
use crate::config::{RecordTypeConfig, SchemaConfig};
use crate::error::ConfigError;
use std::collections::HashSet;

/// Ancestor chain of a type, root first, the type itself last.
pub fn ancestor_chain<'a>(
    config: &'a SchemaConfig,
    ty: &'a RecordTypeConfig,
) -> Result<Vec<&'a RecordTypeConfig>, ConfigError> {
    let mut chain = vec![ty];
    let mut seen: HashSet<&str> = HashSet::from([ty.name.as_str()]);
    let mut current = ty;
    while let Some(parent_name) = current.extends.as_deref() {
        let parent = config
            .type_by_name(parent_name)
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "supertype",
                id: parent_name.to_string(),
            })?;
        if !seen.insert(parent.name.as_str()) {
            return Err(ConfigError::InheritanceCycle(ty.name.clone()));
        }
        chain.push(parent);
        current = parent;
    }
    chain.reverse();
    Ok(chain)
}

pub fn validate(config: &SchemaConfig) -> Result<(), ConfigError> {
    let mut type_names = HashSet::new();
    for t in &config.types {
        if !type_names.insert(t.name.as_str()) {
            return Err(ConfigError::Validation(format!("type {} declared twice", t.name)));
        }
    }

    let mut path_names = HashSet::new();
    for t in &config.types {
        let chain = ancestor_chain(config, t)?;

        let mut field_names = HashSet::new();
        for f in chain.iter().flat_map(|a| a.fields.iter()) {
            if !field_names.insert(f.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "{}: field {} declared more than once in its hierarchy",
                    t.name, f.name
                )));
            }
        }

        for f in &t.fields {
            match &f.association {
                Some(assoc) => {
                    let target = config.type_by_name(&assoc.target).ok_or_else(|| {
                        ConfigError::MissingReference {
                            kind: "association target",
                            id: assoc.target.clone(),
                        }
                    })?;
                    if !target.entity {
                        return Err(ConfigError::Validation(format!(
                            "{}.{}: target {} is not an entity",
                            t.name, f.name, target.name
                        )));
                    }
                }
                None if f.type_.is_none() => {
                    return Err(ConfigError::Validation(format!(
                        "{}.{}: scalar field needs a type",
                        t.name, f.name
                    )));
                }
                None => {}
            }
        }

        if t.entity {
            let path = to_path_name(simple_name(&t.name));
            if !path_names.insert(path.clone()) {
                return Err(ConfigError::DuplicatePathName(path));
            }
        }
    }

    Ok(())
}
