//! The depth-indexed type graph.
//!
//! A [`TypeGraph`] is produced by one walk over one resource and never
//! mutated afterwards. [`GraphBuilder`] is the single-owner accumulator the
//! walk threads through its recursion.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::trace;

use crate::model::FragmentSelection;
use crate::options::{AuthSegment, InputAction};

/// Kind of a synthesized type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Object,
    Input(InputAction),
    Interface,
    Union,
    Enum,
}

/// Kind of a synthesized field, after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldNodeKind {
    Scalar,
    Enum,
    Reference,
    Object,
}

impl FieldNodeKind {
    /// Scalars and enums select without a sub-selection.
    #[must_use]
    pub fn is_leaf(self) -> bool {
        matches!(self, Self::Scalar | Self::Enum)
    }
}

/// One field of a synthesized type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    pub name: String,
    pub kind: FieldNodeKind,
    /// Named type without list or non-null decoration.
    pub type_name: String,
    /// Fully decorated type, e.g. `[SelfUserAddressObject!]`.
    pub decorated: String,
    pub depth: usize,
    pub nullable: Vec<bool>,
    pub description: Option<String>,
    /// Segment of the target object for object and reference fields.
    pub target_segment: Option<AuthSegment>,
    /// Model type name of the target for object and reference fields.
    pub target_base: Option<String>,
}

impl FieldNode {
    /// A leaf field (scalar or enum).
    #[must_use]
    pub fn leaf(
        name: impl Into<String>,
        kind: FieldNodeKind,
        type_name: impl Into<String>,
        nullable: Vec<bool>,
    ) -> Self {
        let type_name = type_name.into();
        Self {
            name: name.into(),
            kind,
            decorated: super::decorate(&type_name, &nullable),
            depth: nullable.len().saturating_sub(1),
            type_name,
            nullable,
            description: None,
            target_segment: None,
            target_base: None,
        }
    }

    /// A field pointing at the object `{segment}{base}Object`.
    #[must_use]
    pub fn to_object(
        name: impl Into<String>,
        kind: FieldNodeKind,
        segment: AuthSegment,
        base: impl Into<String>,
        nullable: Vec<bool>,
    ) -> Self {
        let base = base.into();
        let mut field = Self::leaf(name, kind, object_type_name(segment, &base), nullable);
        field.target_segment = Some(segment);
        field.target_base = Some(base);
        field
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Re-points the field at another named type, keeping its shape.
    pub fn retarget(&mut self, type_name: impl Into<String>, kind: FieldNodeKind) {
        self.type_name = type_name.into();
        self.kind = kind;
        self.decorated = super::decorate(&self.type_name, &self.nullable);
        self.target_segment = None;
        self.target_base = None;
    }
}

/// One synthesized type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    pub name: String,
    pub kind: TypeKind,
    /// Model type name the definition was synthesized from, e.g. `UserAddress`.
    pub base_name: String,
    /// Auth segment of object types.
    pub segment: Option<AuthSegment>,
    pub fields: IndexMap<String, FieldNode>,
    /// Union members.
    pub members: Vec<String>,
    /// Enum values.
    pub values: Vec<String>,
    /// Custom fragment parts declared on the model node (objects only).
    pub fragments: IndexMap<String, Vec<FragmentSelection>>,
    /// The type already exists in the initial document; only new fields are
    /// emitted, as an extension.
    pub extends: bool,
}

impl TypeNode {
    fn new(name: String, kind: TypeKind, base_name: &str) -> Self {
        Self {
            name,
            kind,
            base_name: base_name.to_string(),
            segment: None,
            fields: IndexMap::new(),
            members: Vec::new(),
            values: Vec::new(),
            fragments: IndexMap::new(),
            extends: false,
        }
    }

    /// Returns `true` if the definition has nothing to emit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self.kind {
            TypeKind::Union => self.members.is_empty(),
            TypeKind::Enum => self.values.is_empty(),
            _ => self.fields.is_empty(),
        }
    }
}

/// `{Segment}{Base}Object`
#[must_use]
pub fn object_type_name(segment: AuthSegment, base: &str) -> String {
    format!("{}{base}Object", segment.label())
}

/// `{Action}{Base}Input`
#[must_use]
pub fn input_type_name(action: InputAction, base: &str) -> String {
    format!("{}{base}Input", action.label())
}

/// `{Base}Interface`
#[must_use]
pub fn interface_type_name(base: &str) -> String {
    format!("{base}Interface")
}

/// `{Base}Union`
#[must_use]
pub fn union_type_name(base: &str) -> String {
    format!("{base}Union")
}

/// Synthesized type definitions of one resource, indexed by depth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeGraph {
    pub resource: String,
    pub levels: Vec<IndexMap<String, TypeNode>>,
}

impl TypeGraph {
    /// Looks a type up at any level.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeNode> {
        self.levels.iter().find_map(|level| level.get(name))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All definitions, shallowest level first, in synthesis order.
    pub fn definitions(&self) -> impl Iterator<Item = &TypeNode> {
        self.levels.iter().flat_map(IndexMap::values)
    }

    /// Object types with their level.
    pub fn objects(&self) -> impl Iterator<Item = (usize, &TypeNode)> {
        self.levels.iter().enumerate().flat_map(|(level, types)| {
            types
                .values()
                .filter(|node| node.kind == TypeKind::Object)
                .map(move |node| (level, node))
        })
    }

    /// Root object type of a segment, if synthesized.
    #[must_use]
    pub fn root_object(&self, segment: AuthSegment) -> Option<&TypeNode> {
        self.levels
            .first()
            .and_then(|level| level.get(&object_type_name(segment, &self.resource)))
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.iter().map(IndexMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn fields_mut(&mut self) -> impl Iterator<Item = &mut FieldNode> {
        self.levels
            .iter_mut()
            .flat_map(|level| level.values_mut())
            .flat_map(|node| node.fields.values_mut())
    }
}

/// Accumulates a [`TypeGraph`] during one walk.
///
/// Fields are first-writer-wins: attaching a field name a type already holds
/// (or that the initial document already defines on it) is a no-op.
#[derive(Debug)]
pub struct GraphBuilder {
    graph: TypeGraph,
    existing: HashMap<String, HashSet<String>>,
}

impl GraphBuilder {
    /// Creates a builder seeded with the fields of an initial document.
    #[must_use]
    pub fn new(resource: &str, existing: HashMap<String, HashSet<String>>) -> Self {
        Self {
            graph: TypeGraph {
                resource: resource.to_string(),
                levels: Vec::new(),
            },
            existing,
        }
    }

    fn level_mut(&mut self, level: usize) -> &mut IndexMap<String, TypeNode> {
        while self.graph.levels.len() <= level {
            self.graph.levels.push(IndexMap::new());
        }
        &mut self.graph.levels[level]
    }

    /// Returns the type `name` at `level`, creating it if needed.
    pub fn ensure_type(
        &mut self,
        level: usize,
        name: &str,
        kind: TypeKind,
        base_name: &str,
    ) -> &mut TypeNode {
        let extends = self.existing.contains_key(name);
        self.level_mut(level)
            .entry(name.to_string())
            .or_insert_with(|| {
                trace!(type_name = %name, level, "Synthesizing type");
                let mut node = TypeNode::new(name.to_string(), kind, base_name);
                node.extends = extends;
                node
            })
    }

    #[must_use]
    pub fn get(&self, level: usize, name: &str) -> Option<&TypeNode> {
        self.graph.levels.get(level).and_then(|types| types.get(name))
    }

    /// Returns `true` if `name` can be used as a field type from `level - 1`:
    /// synthesized with at least one field, or defined by the initial
    /// document.
    #[must_use]
    pub fn is_available(&self, level: usize, name: &str) -> bool {
        self.existing.contains_key(name)
            || self.get(level, name).is_some_and(|node| !node.is_empty())
    }

    /// Attaches `field` to the type `name` at `level` unless already present.
    ///
    /// Returns `true` if the field was added.
    pub fn add_field(&mut self, level: usize, name: &str, field: FieldNode) -> bool {
        if self
            .existing
            .get(name)
            .is_some_and(|fields| fields.contains(&field.name))
        {
            return false;
        }
        let Some(node) = self.graph.levels.get_mut(level).and_then(|t| t.get_mut(name)) else {
            return false;
        };
        if node.fields.contains_key(&field.name) {
            return false;
        }
        node.fields.insert(field.name.clone(), field);
        true
    }

    /// Drops empty definitions and returns the finished graph.
    #[must_use]
    pub fn finish(mut self) -> TypeGraph {
        for level in &mut self.graph.levels {
            level.retain(|_, node| !node.is_empty());
        }
        while self.graph.levels.last().is_some_and(IndexMap::is_empty) {
            self.graph.levels.pop();
        }
        self.graph
    }
}
