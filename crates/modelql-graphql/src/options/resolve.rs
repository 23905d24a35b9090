//! Cascading resolution of partial generation options.
//!
//! Both the parent configuration and the child partial are flattened to
//! dotted paths. Every boolean leaf of the partial then overwrites the parent
//! leaf at the same path and every leaf nested under it, shallowest override
//! first. A `false` on an inner node therefore disables the whole branch,
//! while a deeper explicit `true` in the same partial re-enables its own leaf.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::trace;

use super::GenerationConfig;
use crate::error::CompileError;

/// Dotted path → leaf value, in document order.
pub type FlatConfig = IndexMap<String, Value>;

/// Flattens a JSON document into dotted-path leaves.
///
/// Empty objects produce no leaves; arrays are leaves.
#[must_use]
pub fn flatten(value: &Value) -> FlatConfig {
    let mut flat = FlatConfig::new();
    flatten_into(value, String::new(), &mut flat);
    flat
}

fn flatten_into(value: &Value, prefix: String, flat: &mut FlatConfig) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(child, path, flat);
            }
        }
        leaf => {
            flat.insert(prefix, leaf.clone());
        }
    }
}

/// Re-nests dotted-path leaves into a JSON document.
#[must_use]
pub fn unflatten(flat: &FlatConfig) -> Value {
    let mut root = Map::new();
    for (path, value) in flat {
        let segments: Vec<&str> = path.split('.').collect();
        insert_path(&mut root, &segments, value.clone());
    }
    Value::Object(root)
}

fn insert_path(map: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            map.insert((*last).to_string(), value);
        }
        [head, rest @ ..] => {
            let entry = map
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}

/// Applies the boolean leaves of `partial` onto `base`.
///
/// Paths of `partial` that match nothing in `base` are ignored. A known path
/// holding something other than a boolean is rejected.
///
/// # Errors
///
/// Returns [`CompileError::InvalidConfig`] for non-boolean overrides of known
/// paths.
pub fn apply_overrides(base: &mut FlatConfig, partial: &Value) -> Result<(), CompileError> {
    if let Value::Bool(all) = partial {
        for value in base.values_mut() {
            *value = Value::Bool(*all);
        }
        return Ok(());
    }

    let mut overrides: Vec<(String, Value)> = flatten(partial).into_iter().collect();
    overrides.sort_by_key(|(path, _)| path.split('.').count());

    for (path, value) in overrides {
        let nested = format!("{path}.");
        let targets: Vec<String> = base
            .keys()
            .filter(|key| **key == path || key.starts_with(&nested))
            .cloned()
            .collect();
        if targets.is_empty() {
            trace!(path = %path, "Ignoring unknown option");
            continue;
        }
        let Value::Bool(enabled) = value else {
            return Err(CompileError::InvalidConfig(format!(
                "option {path} must be a boolean, got {value}"
            )));
        };
        for key in targets {
            base.insert(key, Value::Bool(enabled));
        }
    }
    Ok(())
}

impl GenerationConfig {
    /// Resolves a partial option document against a fully resolved parent.
    ///
    /// `Null` yields a copy of the parent.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidConfig`] if the partial is malformed.
    pub fn resolve(partial: &Value, parent: &GenerationConfig) -> Result<Self, CompileError> {
        if partial.is_null() {
            return Ok(*parent);
        }
        if !partial.is_object() && !partial.is_boolean() {
            return Err(CompileError::InvalidConfig(format!(
                "generation options must be a table, got {partial}"
            )));
        }
        let parent = serde_json::to_value(parent)
            .map_err(|e| CompileError::InvalidConfig(e.to_string()))?;
        let mut flat = flatten(&parent);
        apply_overrides(&mut flat, partial)?;
        serde_json::from_value(unflatten(&flat))
            .map_err(|e| CompileError::InvalidConfig(e.to_string()))
    }

    /// Resolves a partial against the all-enabled defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidConfig`] if the partial is malformed.
    pub fn from_partial(partial: &Value) -> Result<Self, CompileError> {
        Self::resolve(partial, &Self::default())
    }
}
