//! Field-level options.
//!
//! A field's `options` table carries the per-field configuration surface:
//!
//! ```toml
//! [schemas.fields.tags]
//! type = "String"
//! options = { nullable = { object = [false, true] }, attach = { interface = false } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{AuthSegment, GenerationConfig, InputAction, InputFlags, SegmentFlags};
use crate::error::CompileError;

/// Where a field is attached, resolved from the holding node's type options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachFlags {
    pub object: SegmentFlags,
    pub input: InputFlags,
    pub interface: bool,
    #[serde(rename = "enum")]
    pub enums: bool,
}

/// Nullability vectors of one field, each `depth + 1` entries long.
///
/// Index 0 is the outermost list level and index `depth` the named type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullableVectors {
    object: [Vec<bool>; 3],
    create: Vec<bool>,
    update: Vec<bool>,
}

impl NullableVectors {
    /// Default vectors for a field of `depth` list levels.
    #[must_use]
    pub fn defaults(depth: usize, required: bool) -> Self {
        let object = pad(&[], depth, false, !required);
        Self {
            object: [object.clone(), object.clone(), object],
            create: pad(&[], depth, !required, !required),
            update: pad(&[], depth, true, true),
        }
    }

    #[must_use]
    pub fn object(&self, segment: AuthSegment) -> &[bool] {
        &self.object[segment_index(segment)]
    }

    #[must_use]
    pub fn input(&self, action: InputAction) -> &[bool] {
        match action {
            InputAction::Create => &self.create,
            InputAction::Update => &self.update,
        }
    }
}

fn segment_index(segment: AuthSegment) -> usize {
    match segment {
        AuthSegment::Owned => 0,
        AuthSegment::Others => 1,
        AuthSegment::Mixed => 2,
    }
}

// Missing list levels take `list`, a missing named-type entry `innermost`.
// Read objects keep lists non-null; inputs only when the field is required.
fn pad(given: &[bool], depth: usize, list: bool, innermost: bool) -> Vec<bool> {
    (0..=depth)
        .map(|level| {
            given
                .get(level)
                .copied()
                .unwrap_or(if level == depth { innermost } else { list })
        })
        .collect()
}

/// Segment → segment mapping used to pick the target object of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthMapper([AuthSegment; 3]);

impl AuthMapper {
    /// Every segment maps to itself.
    #[must_use]
    pub fn identity() -> Self {
        Self(AuthSegment::ALL)
    }

    /// Every segment maps to `target`.
    #[must_use]
    pub fn uniform(target: AuthSegment) -> Self {
        Self([target; 3])
    }

    #[must_use]
    pub fn map(&self, segment: AuthSegment) -> AuthSegment {
        self.0[segment_index(segment)]
    }
}

/// Resolved configuration of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConfig {
    /// Generation options seen by this field and, for object fields, the
    /// parent configuration of the nested node.
    pub config: GenerationConfig,
    pub attach: AttachFlags,
    pub nullable: NullableVectors,
    pub auth_mapper: AuthMapper,
}

impl FieldConfig {
    /// Resolves a field's `options` table against its node's configuration.
    ///
    /// `attach` keys override the matching `type` toggles of the node, so a
    /// disabled `attach.object.self` on an object field also hides the whole
    /// nested subtree from that segment.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidConfig`] for malformed options.
    pub fn resolve(
        options: &Value,
        node: &GenerationConfig,
        depth: usize,
        required: bool,
        reference: bool,
    ) -> Result<Self, CompileError> {
        if !options.is_null() && !options.is_object() {
            return Err(CompileError::InvalidConfig(format!(
                "field options must be a table, got {options}"
            )));
        }
        let config = match options.get("attach") {
            Some(attach) => GenerationConfig::resolve(&json!({ "type": attach }), node)?,
            None => *node,
        };
        let attach = AttachFlags {
            object: config.types.object,
            input: config.types.input,
            interface: config.types.interface,
            enums: config.types.enums,
        };

        let mut nullable = NullableVectors::defaults(depth, required);
        if let Some(spec) = options.get("nullable") {
            apply_nullable(&mut nullable, spec, depth, required)?;
        }

        let default_mapper = if reference {
            AuthMapper::uniform(AuthSegment::Mixed)
        } else {
            AuthMapper::identity()
        };
        let auth_mapper = match options.get("authMapper") {
            Some(spec) => parse_auth_mapper(spec, default_mapper)?,
            None => default_mapper,
        };

        Ok(Self {
            config,
            attach,
            nullable,
            auth_mapper,
        })
    }
}

fn apply_nullable(
    vectors: &mut NullableVectors,
    spec: &Value,
    depth: usize,
    required: bool,
) -> Result<(), CompileError> {
    if let Some(object) = spec.get("object") {
        match object {
            Value::Array(_) => {
                let given = parse_vector(object, "nullable.object")?;
                let padded = pad(&given, depth, false, !required);
                vectors.object = [padded.clone(), padded.clone(), padded];
            }
            Value::Object(per_segment) => {
                for (key, value) in per_segment {
                    let Some(segment) = AuthSegment::from_key(key) else {
                        continue;
                    };
                    let given = parse_vector(value, &format!("nullable.object.{key}"))?;
                    vectors.object[segment_index(segment)] = pad(&given, depth, false, !required);
                }
            }
            other => {
                return Err(CompileError::InvalidConfig(format!(
                    "nullable.object must be a list or a table, got {other}"
                )));
            }
        }
    }
    if let Some(input) = spec.get("input") {
        match input {
            Value::Array(_) => {
                let given = parse_vector(input, "nullable.input")?;
                vectors.create = pad(&given, depth, !required, !required);
                vectors.update = pad(&given, depth, true, true);
            }
            Value::Object(per_action) => {
                if let Some(create) = per_action.get("create") {
                    let given = parse_vector(create, "nullable.input.create")?;
                    vectors.create = pad(&given, depth, !required, !required);
                }
                if let Some(update) = per_action.get("update") {
                    let given = parse_vector(update, "nullable.input.update")?;
                    vectors.update = pad(&given, depth, true, true);
                }
            }
            other => {
                return Err(CompileError::InvalidConfig(format!(
                    "nullable.input must be a list or a table, got {other}"
                )));
            }
        }
    }
    Ok(())
}

fn parse_vector(value: &Value, path: &str) -> Result<Vec<bool>, CompileError> {
    let invalid = || CompileError::InvalidConfig(format!("{path} must be a list of booleans"));
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|entry| entry.as_bool().ok_or_else(invalid))
        .collect()
}

fn parse_auth_mapper(spec: &Value, default: AuthMapper) -> Result<AuthMapper, CompileError> {
    let Some(entries) = spec.as_object() else {
        return Err(CompileError::InvalidConfig(format!(
            "authMapper must be a table, got {spec}"
        )));
    };
    let mut mapper = default;
    for (key, value) in entries {
        let from = AuthSegment::from_key(key);
        let to = value.as_str().and_then(AuthSegment::from_key);
        match (from, to) {
            (Some(from), Some(to)) => mapper.0[segment_index(from)] = to,
            _ => {
                return Err(CompileError::InvalidConfig(format!(
                    "authMapper entry {key} = {value} does not name auth segments"
                )));
            }
        }
    }
    Ok(mapper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_vectors() {
        let config = FieldConfig::resolve(&Value::Null, &GenerationConfig::default(), 2, true, false)
            .unwrap();
        assert_eq!(config.nullable.object(AuthSegment::Owned), &[false, false, false]);
        assert_eq!(config.nullable.input(InputAction::Create), &[false, false, false]);
        assert_eq!(config.nullable.input(InputAction::Update), &[true, true, true]);

        let optional =
            FieldConfig::resolve(&Value::Null, &GenerationConfig::default(), 0, false, false)
                .unwrap();
        assert_eq!(optional.nullable.object(AuthSegment::Mixed), &[true]);
    }

    #[test]
    fn test_optional_input_lists_are_nullable() {
        let optional =
            FieldConfig::resolve(&Value::Null, &GenerationConfig::default(), 1, false, false)
                .unwrap();
        assert_eq!(optional.nullable.object(AuthSegment::Owned), &[false, true]);
        assert_eq!(optional.nullable.input(InputAction::Create), &[true, true]);
        assert_eq!(optional.nullable.input(InputAction::Update), &[true, true]);

        let required =
            FieldConfig::resolve(&Value::Null, &GenerationConfig::default(), 1, true, false)
                .unwrap();
        assert_eq!(required.nullable.input(InputAction::Create), &[false, false]);
    }

    #[test]
    fn test_nullable_overrides() {
        let options = json!({
            "nullable": {
                "object": {"others": [true]},
                "input": [false, true]
            }
        });
        let config =
            FieldConfig::resolve(&options, &GenerationConfig::default(), 1, true, false).unwrap();
        assert_eq!(config.nullable.object(AuthSegment::Owned), &[false, false]);
        assert_eq!(config.nullable.object(AuthSegment::Others), &[true, false]);
        assert_eq!(config.nullable.input(InputAction::Update), &[false, true]);
    }

    #[test]
    fn test_attach_overrides_node_types() {
        let node = GenerationConfig::from_partial(&json!({"type": {"interface": false}})).unwrap();
        let options = json!({"attach": {"object": {"others": false}, "input": {"update": false}}});
        let config = FieldConfig::resolve(&options, &node, 0, false, false).unwrap();
        assert!(!config.attach.object.others);
        assert!(config.attach.object.owned);
        assert!(!config.attach.input.update);
        assert!(!config.attach.interface);
        assert!(!config.config.types.object.others);
    }

    #[test]
    fn test_auth_mapper_defaults() {
        let node = GenerationConfig::default();
        let reference = FieldConfig::resolve(&Value::Null, &node, 0, false, true).unwrap();
        assert_eq!(reference.auth_mapper.map(AuthSegment::Owned), AuthSegment::Mixed);

        let object = FieldConfig::resolve(&Value::Null, &node, 0, false, false).unwrap();
        assert_eq!(object.auth_mapper.map(AuthSegment::Others), AuthSegment::Others);

        let mapped =
            FieldConfig::resolve(&json!({"authMapper": {"self": "self"}}), &node, 0, false, true)
                .unwrap();
        assert_eq!(mapped.auth_mapper.map(AuthSegment::Owned), AuthSegment::Owned);
        assert_eq!(mapped.auth_mapper.map(AuthSegment::Others), AuthSegment::Mixed);
    }

    #[test]
    fn test_malformed_options() {
        let node = GenerationConfig::default();
        assert!(FieldConfig::resolve(&json!({"nullable": {"object": 1}}), &node, 0, false, false).is_err());
        assert!(FieldConfig::resolve(&json!({"nullable": {"input": ["x"]}}), &node, 0, false, false).is_err());
        assert!(FieldConfig::resolve(&json!({"authMapper": {"self": "all"}}), &node, 0, false, true).is_err());
        assert!(FieldConfig::resolve(&json!(true), &node, 0, false, false).is_err());
    }
}
