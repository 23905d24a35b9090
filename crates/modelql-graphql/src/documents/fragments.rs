//! Fragment generation.
//!
//! Every object type of a compilation run gets the built-in parts
//! [`WHOLE`], [`SCALARS_ONLY`], [`OBJECTS_NONE`] and [`REFS_NONE`], followed by
//! the custom parts declared on its model node. Fragments are named
//! `{Segment}{Base}{Part}Fragment`.
//!
//! Nested object fields spread the nested type's fragment for the same part.
//! Reference fields spread the target's `RefsNone` fragment, which holds no
//! references itself, so the spread graph cannot cycle. Parts are computed in
//! passes (`ScalarsOnly` and `RefsNone`, then `ObjectsNone`, then `Whole`,
//! then custom parts), each pass deepest level first, so every spread target
//! exists before it is used.

use std::fmt::Write as _;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::model::FragmentSelection;
use crate::schema::{FieldNode, FieldNodeKind, TypeGraph, TypeNode};

pub const WHOLE: &str = "Whole";
pub const SCALARS_ONLY: &str = "ScalarsOnly";
pub const OBJECTS_NONE: &str = "ObjectsNone";
pub const REFS_NONE: &str = "RefsNone";

/// Built-in parts, in generation order of the info map.
pub const BUILTIN_PARTS: [&str; 4] = [WHOLE, SCALARS_ONLY, OBJECTS_NONE, REFS_NONE];

/// Object type → part → fragment name, `None` when the part is empty.
pub type FragmentInfoMap = IndexMap<String, IndexMap<String, Option<String>>>;

/// One entry of a fragment selection set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A leaf field.
    Field(String),
    /// A reference selected as `{ id }`.
    IdOnly(String),
    /// A field whose sub-selection spreads `fragment`.
    Spread { field: String, fragment: String },
}

impl Selection {
    #[must_use]
    pub fn field_name(&self) -> &str {
        match self {
            Self::Field(name) | Self::IdOnly(name) => name,
            Self::Spread { field, .. } => field,
        }
    }

    /// Fragment spread by this selection.
    #[must_use]
    pub fn spread(&self) -> Option<&str> {
        match self {
            Self::Spread { fragment, .. } => Some(fragment),
            _ => None,
        }
    }
}

/// A named fragment on one object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentDefinition {
    pub name: String,
    /// Object type the fragment applies to.
    pub on: String,
    pub part: String,
    pub selections: Vec<Selection>,
}

impl FragmentDefinition {
    /// Fragments spread directly by this one.
    pub fn spreads(&self) -> impl Iterator<Item = &str> {
        self.selections.iter().filter_map(Selection::spread)
    }

    /// Renders the fragment as executable document text.
    #[must_use]
    pub fn to_source(&self) -> String {
        let mut out = format!("fragment {} on {} {{\n", self.name, self.on);
        for selection in &self.selections {
            let _ = match selection {
                Selection::Field(name) => writeln!(out, "  {name}"),
                Selection::IdOnly(name) => writeln!(out, "  {name} {{\n    id\n  }}"),
                Selection::Spread { field, fragment } => {
                    writeln!(out, "  {field} {{\n    ...{fragment}\n  }}")
                }
            };
        }
        out.push_str("}\n");
        out
    }
}

/// Fragments of a compilation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentSet {
    /// Definitions by name; spread targets precede their users.
    pub definitions: IndexMap<String, FragmentDefinition>,
    pub info: FragmentInfoMap,
}

impl FragmentSet {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FragmentDefinition> {
        self.definitions.get(name)
    }

    /// Fragment name of `part` on `object`, if the part is not empty.
    #[must_use]
    pub fn fragment_for(&self, object: &str, part: &str) -> Option<&str> {
        self.info
            .get(object)
            .and_then(|parts| parts.get(part))
            .and_then(Option::as_deref)
    }

    /// Non-empty parts of `object` with their fragment names, in order.
    pub fn parts_of<'a>(&'a self, object: &str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.info.get(object).into_iter().flat_map(|parts| {
            parts
                .iter()
                .filter_map(|(part, name)| name.as_deref().map(|name| (part.as_str(), name)))
        })
    }

    /// `root` and every fragment it transitively spreads, depth first, each
    /// once.
    #[must_use]
    pub fn collect_dependencies(&self, root: &str) -> Vec<&FragmentDefinition> {
        let mut visited = Vec::new();
        self.visit(root, &mut visited);
        visited
    }

    fn visit<'a>(&'a self, name: &str, visited: &mut Vec<&'a FragmentDefinition>) {
        let Some(definition) = self.definitions.get(name) else {
            return;
        };
        if visited.iter().any(|seen| seen.name == definition.name) {
            return;
        }
        visited.push(definition);
        for spread in definition.spreads() {
            self.visit(spread, visited);
        }
    }

    /// Renders every fragment.
    #[must_use]
    pub fn to_source(&self) -> String {
        self.definitions
            .values()
            .map(FragmentDefinition::to_source)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// `{Segment}{Base}{Part}Fragment`
fn fragment_name(node: &TypeNode, part: &str) -> String {
    let segment = node.segment.map_or("", |segment| segment.label());
    format!("{segment}{}{part}Fragment", node.base_name)
}

/// Derives fragments from the type graphs of one run.
#[derive(Debug, Default)]
pub struct FragmentGenerator {
    set: FragmentSet,
}

impl FragmentGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates the fragments of every object type in `graphs`.
    #[must_use]
    pub fn generate(mut self, graphs: &[&TypeGraph]) -> FragmentSet {
        let objects = deepest_first(graphs);
        debug!(objects = objects.len(), "Generating fragments");

        for node in &objects {
            let parts = self.set.info.entry(node.name.clone()).or_default();
            for part in BUILTIN_PARTS {
                parts.insert(part.to_string(), None);
            }
        }

        for node in &objects {
            self.emit(node, SCALARS_ONLY, |_, field| {
                field.kind.is_leaf().then(|| Selection::Field(field.name.clone()))
            });
            self.emit(node, REFS_NONE, |set, field| match field.kind {
                FieldNodeKind::Scalar | FieldNodeKind::Enum => Some(Selection::Field(field.name.clone())),
                FieldNodeKind::Object => spread(set, field, REFS_NONE),
                FieldNodeKind::Reference => None,
            });
        }
        for node in &objects {
            self.emit(node, OBJECTS_NONE, |_, field| match field.kind {
                FieldNodeKind::Scalar | FieldNodeKind::Enum => Some(Selection::Field(field.name.clone())),
                FieldNodeKind::Reference => Some(Selection::IdOnly(field.name.clone())),
                FieldNodeKind::Object => None,
            });
        }
        for node in &objects {
            self.emit(node, WHOLE, |set, field| match field.kind {
                FieldNodeKind::Scalar | FieldNodeKind::Enum => Some(Selection::Field(field.name.clone())),
                FieldNodeKind::Object => spread(set, field, WHOLE),
                FieldNodeKind::Reference => Some(reference(set, field, REFS_NONE)),
            });
        }
        for node in &objects {
            for (part, selections) in &node.fragments {
                if BUILTIN_PARTS.contains(&part.as_str()) {
                    warn!(type_name = %node.name, part = %part, "Custom fragment part shadows a built-in part, skipping");
                    continue;
                }
                self.emit_custom(node, part, selections);
            }
        }
        self.set
    }

    fn emit(
        &mut self,
        node: &TypeNode,
        part: &str,
        select: impl Fn(&FragmentSet, &FieldNode) -> Option<Selection>,
    ) {
        let selections = node
            .fields
            .values()
            .filter_map(|field| select(&self.set, field))
            .collect();
        self.insert(node, part, selections);
    }

    fn emit_custom(&mut self, node: &TypeNode, part: &str, selections: &[FragmentSelection]) {
        let mut resolved = Vec::new();
        for selection in selections {
            let Some(field) = node.fields.get(selection.field_name()) else {
                trace!(type_name = %node.name, field = selection.field_name(), "Custom fragment field not on type");
                continue;
            };
            let entry = match (field.kind, selection.part()) {
                (FieldNodeKind::Scalar | FieldNodeKind::Enum, _) => {
                    Some(Selection::Field(field.name.clone()))
                }
                (FieldNodeKind::Object, requested) => {
                    let nested = requested.unwrap_or(WHOLE);
                    let entry = spread(&self.set, field, nested);
                    if entry.is_none() {
                        warn!(
                            type_name = %node.name,
                            field = %field.name,
                            part = nested,
                            "Nested fragment part is missing or empty, omitting field"
                        );
                    }
                    entry
                }
                (FieldNodeKind::Reference, requested) => {
                    let target_part = match requested {
                        Some(builtin) if BUILTIN_PARTS.contains(&builtin) => builtin,
                        Some(custom) => {
                            debug!(field = %field.name, part = custom, "Custom part on a reference, using RefsNone");
                            REFS_NONE
                        }
                        None => REFS_NONE,
                    };
                    Some(reference(&self.set, field, target_part))
                }
            };
            resolved.extend(entry);
        }
        self.set
            .info
            .entry(node.name.clone())
            .or_default()
            .insert(part.to_string(), None);
        self.insert(node, part, resolved);
    }

    fn insert(&mut self, node: &TypeNode, part: &str, selections: Vec<Selection>) {
        let name = if selections.is_empty() {
            trace!(type_name = %node.name, part, "Pruning empty fragment part");
            None
        } else {
            let name = fragment_name(node, part);
            self.set.definitions.insert(
                name.clone(),
                FragmentDefinition {
                    name: name.clone(),
                    on: node.name.clone(),
                    part: part.to_string(),
                    selections,
                },
            );
            Some(name)
        };
        if let Some(parts) = self.set.info.get_mut(&node.name) {
            parts.insert(part.to_string(), name);
        }
    }
}

/// Objects of every graph, deepest level first; graph order, then synthesis
/// order, within a level.
fn deepest_first<'a>(graphs: &[&'a TypeGraph]) -> Vec<&'a TypeNode> {
    let max_level = graphs.iter().map(|graph| graph.levels.len()).max().unwrap_or(0);
    let mut objects = Vec::new();
    for level in (0..max_level).rev() {
        for graph in graphs {
            objects.extend(
                graph
                    .objects()
                    .filter(|(at, _)| *at == level)
                    .map(|(_, node)| node),
            );
        }
    }
    objects
}

fn spread(set: &FragmentSet, field: &FieldNode, part: &str) -> Option<Selection> {
    set.fragment_for(&field.type_name, part)
        .map(|fragment| Selection::Spread {
            field: field.name.clone(),
            fragment: fragment.to_string(),
        })
}

fn reference(set: &FragmentSet, field: &FieldNode, part: &str) -> Selection {
    spread(set, field, part).unwrap_or_else(|| Selection::IdOnly(field.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldSpec, ResourceSchema, SchemaNode};
    use crate::options::GenerationConfig;
    use crate::scalars::ScalarRegistry;
    use crate::schema::TypeSynthesizer;

    fn graph(schema: &ResourceSchema) -> TypeGraph {
        let scalars = ScalarRegistry::with_defaults();
        TypeSynthesizer::new(&scalars)
            .synthesize(schema, &GenerationConfig::default(), None)
            .unwrap()
    }

    fn user() -> ResourceSchema {
        ResourceSchema::new("User")
            .field("name", FieldSpec::primitive("String"))
            .field(
                "address",
                FieldSpec::object(
                    SchemaNode::new()
                        .field("city", FieldSpec::primitive("String"))
                        .field("owner", FieldSpec::reference("User")),
                ),
            )
            .field("friends", FieldSpec::reference("User").list())
            .fragment(
                "Preview",
                vec![
                    FragmentSelection::field("name"),
                    FragmentSelection::nested("address", SCALARS_ONLY),
                ],
            )
    }

    #[test]
    fn test_builtin_parts() {
        let graph = graph(&user());
        let set = FragmentGenerator::new().generate(&[&graph]);

        let whole = set.get("SelfUserWholeFragment").unwrap();
        assert_eq!(whole.on, "SelfUserObject");
        assert_eq!(
            whole.selections,
            vec![
                Selection::Field("id".into()),
                Selection::Field("name".into()),
                Selection::Spread {
                    field: "address".into(),
                    fragment: "SelfUserAddressWholeFragment".into()
                },
                Selection::Spread {
                    field: "friends".into(),
                    fragment: "MixedUserRefsNoneFragment".into()
                },
            ]
        );

        let scalars = set.get("SelfUserScalarsOnlyFragment").unwrap();
        assert_eq!(scalars.selections.len(), 2);

        let objects_none = set.get("SelfUserObjectsNoneFragment").unwrap();
        assert!(objects_none.selections.contains(&Selection::IdOnly("friends".into())));
        assert!(!objects_none.selections.iter().any(|s| s.field_name() == "address"));

        let refs_none = set.get("SelfUserRefsNoneFragment").unwrap();
        assert!(!refs_none.selections.iter().any(|s| s.field_name() == "friends"));
        assert!(refs_none.selections.contains(&Selection::Spread {
            field: "address".into(),
            fragment: "SelfUserAddressRefsNoneFragment".into()
        }));
    }

    #[test]
    fn test_empty_part_is_pruned() {
        let schema = ResourceSchema::new("Tag").field("label", FieldSpec::primitive("String"));
        let graph = graph(&schema);
        let set = FragmentGenerator::new().generate(&[&graph]);
        // No nested objects and no references: every part is non-empty.
        assert_eq!(set.parts_of("SelfTagObject").count(), 4);

        let nested = ResourceSchema::new("Link").field(
            "meta",
            FieldSpec::object(SchemaNode::new().field("target", FieldSpec::reference("Link"))),
        );
        let graph = self::graph(&nested);
        let set = FragmentGenerator::new().generate(&[&graph]);
        assert_eq!(set.fragment_for("SelfLinkMetaObject", SCALARS_ONLY), None);
        assert_eq!(set.fragment_for("SelfLinkMetaObject", REFS_NONE), None);
        let refs_none = set.get("SelfLinkRefsNoneFragment").unwrap();
        assert_eq!(refs_none.selections, vec![Selection::Field("id".into())]);
    }

    #[test]
    fn test_custom_part() {
        let graph = graph(&user());
        let set = FragmentGenerator::new().generate(&[&graph]);
        let preview = set.get("SelfUserPreviewFragment").unwrap();
        assert_eq!(
            preview.selections,
            vec![
                Selection::Field("name".into()),
                Selection::Spread {
                    field: "address".into(),
                    fragment: "SelfUserAddressScalarsOnlyFragment".into()
                },
            ]
        );
        let parts: Vec<_> = set.parts_of("SelfUserObject").map(|(part, _)| part).collect();
        assert_eq!(parts, vec![WHOLE, SCALARS_ONLY, OBJECTS_NONE, REFS_NONE, "Preview"]);
    }

    #[test]
    fn test_missing_nested_part_is_omitted() {
        let schema = ResourceSchema::new("User")
            .field("name", FieldSpec::primitive("String"))
            .field(
                "address",
                FieldSpec::object(SchemaNode::new().field("city", FieldSpec::primitive("String"))),
            )
            .fragment("Short", vec![FragmentSelection::nested("address", "Nope")]);
        let graph = graph(&schema);
        let set = FragmentGenerator::new().generate(&[&graph]);
        assert_eq!(set.fragment_for("SelfUserObject", "Short"), None);
    }

    #[test]
    fn test_idempotent_and_acyclic() {
        let graph = graph(&user());
        let first = FragmentGenerator::new().generate(&[&graph]);
        let second = FragmentGenerator::new().generate(&[&graph]);
        assert_eq!(first, second);

        for name in first.definitions.keys() {
            let deps = first.collect_dependencies(name);
            let mut names: Vec<_> = deps.iter().map(|d| d.name.as_str()).collect();
            let total = names.len();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), total);
            assert_eq!(deps[0].name, *name);
        }
    }

    #[test]
    fn test_spread_targets_precede_users() {
        let graph = graph(&user());
        let set = FragmentGenerator::new().generate(&[&graph]);
        for (index, definition) in set.definitions.values().enumerate() {
            for spread in definition.spreads() {
                assert!(set.definitions.get_index_of(spread).unwrap() < index);
            }
        }
    }

    #[test]
    fn test_reference_outside_run_selects_id() {
        let schema = ResourceSchema::new("Post").field("author", FieldSpec::reference("Account"));
        let graph = graph(&schema);
        let set = FragmentGenerator::new().generate(&[&graph]);
        let whole = set.get("SelfPostWholeFragment").unwrap();
        assert!(whole.selections.contains(&Selection::IdOnly("author".into())));
    }

    #[test]
    fn test_to_source() {
        let definition = FragmentDefinition {
            name: "SelfUserWholeFragment".into(),
            on: "SelfUserObject".into(),
            part: WHOLE.into(),
            selections: vec![
                Selection::Field("id".into()),
                Selection::IdOnly("friends".into()),
            ],
        };
        assert_eq!(
            definition.to_source(),
            "fragment SelfUserWholeFragment on SelfUserObject {\n  id\n  friends {\n    id\n  }\n}\n"
        );
    }
}
