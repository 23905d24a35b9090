//! Type synthesis.
//!
//! Walks a resource's model tree and produces, per auth segment and per
//! depth level, the object, input, interface, union and enum definitions of
//! its [`TypeGraph`].

use std::collections::{HashMap, HashSet};

use modelql_storage::ID_FIELD;
use serde_json::Value;
use tracing::{debug, trace};

use super::classifier::{ClassifiedField, FieldKind, classify};
use super::graph::{
    FieldNode, FieldNodeKind, GraphBuilder, TypeGraph, TypeKind, input_type_name,
    interface_type_name, object_type_name, union_type_name,
};
use crate::error::CompileError;
use crate::model::{ResourceSchema, SchemaNode};
use crate::options::{
    AuthSegment, FieldConfig, GenerationConfig, InputAction, InputFlags, SegmentFlags,
};
use crate::scalars::ScalarRegistry;

/// Walks model trees into type graphs.
///
/// # Example
///
/// ```ignore
/// let synthesizer = TypeSynthesizer::new(&scalars);
/// let graph = synthesizer.synthesize(&schema, &resource_config, None)?;
/// assert!(graph.contains("SelfUserObject"));
/// ```
pub struct TypeSynthesizer<'a> {
    scalars: &'a ScalarRegistry,
}

/// Visibility inherited from the ancestors of a node.
#[derive(Debug, Clone, Copy)]
struct Inherited {
    objects: SegmentFlags,
    inputs: InputFlags,
}

/// Per-walk state.
struct Walk<'a> {
    scalars: &'a ScalarRegistry,
    builder: GraphBuilder,
}

impl<'a> TypeSynthesizer<'a> {
    #[must_use]
    pub fn new(scalars: &'a ScalarRegistry) -> Self {
        Self { scalars }
    }

    /// Synthesizes the type graph of `schema`.
    ///
    /// `config` is the resource-level configuration, already resolved against
    /// the global options. `existing` lists the fields an initial document
    /// already defines per type name.
    ///
    /// # Errors
    ///
    /// Returns synthesis errors from classification or field options.
    pub fn synthesize(
        &self,
        schema: &ResourceSchema,
        config: &GenerationConfig,
        existing: Option<HashMap<String, HashSet<String>>>,
    ) -> Result<TypeGraph, CompileError> {
        debug!(resource = %schema.resource, "Starting type synthesis");
        let mut walk = Walk {
            scalars: self.scalars,
            builder: GraphBuilder::new(&schema.resource, existing.unwrap_or_default()),
        };
        let inherited = Inherited {
            objects: SegmentFlags::uniform(true),
            inputs: InputFlags::default(),
        };
        walk.node(&schema.node, &schema.resource, config, inherited, 0)?;
        let graph = walk.builder.finish();
        debug!(
            resource = %schema.resource,
            type_count = graph.len(),
            levels = graph.levels.len(),
            "Type synthesis complete"
        );
        Ok(graph)
    }
}

impl Walk<'_> {
    fn node(
        &mut self,
        node: &SchemaNode,
        type_name: &str,
        config: &GenerationConfig,
        inherited: Inherited,
        level: usize,
    ) -> Result<(), CompileError> {
        let included = inherited.objects.and(&config.types.object);
        let inputs = InputFlags {
            create: inherited.inputs.create && config.types.input.create,
            update: inherited.inputs.update && config.types.input.update,
        };
        trace!(type_name, level, segments = included.count(), "Walking node");

        for segment in included.enabled() {
            let name = object_type_name(segment, type_name);
            let object = self
                .builder
                .ensure_type(level, &name, TypeKind::Object, type_name);
            object.segment = Some(segment);
            object.fragments = node.fragments.clone();
            if level == 0 {
                self.builder.add_field(
                    level,
                    &name,
                    FieldNode::leaf(ID_FIELD, FieldNodeKind::Scalar, "ID", vec![false]),
                );
            }
        }
        for action in InputAction::ALL {
            if !inputs.get(action) {
                continue;
            }
            let name = input_type_name(action, type_name);
            self.builder
                .ensure_type(level, &name, TypeKind::Input(action), type_name);
            if level == 0 && action == InputAction::Update {
                self.builder.add_field(
                    level,
                    &name,
                    FieldNode::leaf(ID_FIELD, FieldNodeKind::Scalar, "ID", vec![false]),
                );
            }
        }
        if config.types.interface {
            self.builder.ensure_type(
                level,
                &interface_type_name(type_name),
                TypeKind::Interface,
                type_name,
            );
        }

        for (field_name, spec) in &node.fields {
            let field = classify(type_name, field_name, spec, self.scalars)?;
            let field_config = FieldConfig::resolve(
                field.options,
                config,
                field.depth,
                field.required,
                field.kind.is_reference(),
            )?;
            self.field(type_name, &field, &field_config, included, inputs, level)?;
        }

        if config.types.union {
            let members: Vec<String> = included
                .enabled()
                .map(|segment| object_type_name(segment, type_name))
                .filter(|name| self.builder.is_available(level, name))
                .collect();
            if !members.is_empty() {
                let union = self.builder.ensure_type(
                    level,
                    &union_type_name(type_name),
                    TypeKind::Union,
                    type_name,
                );
                for member in members {
                    if !union.members.contains(&member) {
                        union.members.push(member);
                    }
                }
            }
        }
        Ok(())
    }

    fn field(
        &mut self,
        type_name: &str,
        field: &ClassifiedField<'_>,
        field_config: &FieldConfig,
        included: SegmentFlags,
        inputs: InputFlags,
        level: usize,
    ) -> Result<(), CompileError> {
        let visible = included.and(&field_config.attach.object);
        let field_inputs = InputFlags {
            create: inputs.create && field_config.attach.input.create,
            update: inputs.update && field_config.attach.input.update,
        };

        if let FieldKind::Object { node } = field.kind {
            let partial = node.generate.as_ref().unwrap_or(&Value::Null);
            let nested_config = GenerationConfig::resolve(partial, &field_config.config)?;
            let inherited = Inherited {
                objects: visible,
                inputs: field_inputs,
            };
            self.node(node, &field.target, &nested_config, inherited, level + 1)?;
        }

        let leaf_type = match field.kind {
            FieldKind::Enum { values } => {
                if field_config.attach.enums {
                    let enumeration =
                        self.builder
                            .ensure_type(level, &field.target, TypeKind::Enum, type_name);
                    for value in values {
                        if !enumeration.values.contains(value) {
                            enumeration.values.push(value.clone());
                        }
                    }
                    Some((FieldNodeKind::Enum, field.target.clone()))
                } else {
                    Some((FieldNodeKind::Scalar, "String".to_string()))
                }
            }
            FieldKind::Scalar => Some((FieldNodeKind::Scalar, field.target.clone())),
            FieldKind::Reference | FieldKind::Object { .. } => None,
        };

        // Read objects.
        for segment in visible.enabled() {
            let holder = object_type_name(segment, type_name);
            let nullable = field_config.nullable.object(segment).to_vec();
            let node = match (&leaf_type, field.kind) {
                (Some((kind, target)), _) => FieldNode::leaf(&field.name, *kind, target, nullable),
                (None, FieldKind::Reference) => FieldNode::to_object(
                    &field.name,
                    FieldNodeKind::Reference,
                    field_config.auth_mapper.map(segment),
                    &field.target,
                    nullable,
                ),
                (None, _) => {
                    let mapped = field_config.auth_mapper.map(segment);
                    if !self
                        .builder
                        .is_available(level + 1, &object_type_name(mapped, &field.target))
                    {
                        continue;
                    }
                    FieldNode::to_object(
                        &field.name,
                        FieldNodeKind::Object,
                        mapped,
                        &field.target,
                        nullable,
                    )
                }
            };
            self.builder.add_field(
                level,
                &holder,
                node.with_description(field.description.clone()),
            );
        }

        // Inputs.
        for action in InputAction::ALL {
            if !field_inputs.get(action) {
                continue;
            }
            let holder = input_type_name(action, type_name);
            let nullable = field_config.nullable.input(action).to_vec();
            let (kind, target) = match (&leaf_type, field.kind) {
                (Some((kind, target)), _) => (*kind, target.clone()),
                (None, FieldKind::Reference) => (FieldNodeKind::Scalar, "ID".to_string()),
                (None, _) => {
                    let nested = input_type_name(action, &field.target);
                    if !self.builder.is_available(level + 1, &nested) {
                        continue;
                    }
                    (FieldNodeKind::Object, nested)
                }
            };
            self.builder.add_field(
                level,
                &holder,
                FieldNode::leaf(&field.name, kind, target, nullable)
                    .with_description(field.description.clone()),
            );
        }

        // Interface: only fields visible in some but not all segments.
        let interface = interface_type_name(type_name);
        let visible_count = visible.count();
        if field_config.attach.interface
            && (1..AuthSegment::ALL.len()).contains(&visible_count)
            && self.builder.get(level, &interface).is_some()
        {
            let nullable = visible
                .enabled()
                .next()
                .map(|segment| field_config.nullable.object(segment).to_vec())
                .unwrap_or_default();
            let target = match (&leaf_type, field.kind) {
                (Some((kind, target)), _) => Some((*kind, target.clone())),
                (None, FieldKind::Reference) => Some((FieldNodeKind::Scalar, "ID".to_string())),
                (None, _) => {
                    let union = union_type_name(&field.target);
                    self.builder
                        .is_available(level + 1, &union)
                        .then_some((FieldNodeKind::Object, union))
                }
            };
            if let Some((kind, target)) = target {
                self.builder.add_field(
                    level,
                    &interface,
                    FieldNode::leaf(&field.name, kind, target, nullable)
                        .with_description(field.description.clone()),
                );
            }
        }
        Ok(())
    }
}
