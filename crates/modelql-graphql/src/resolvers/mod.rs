//! Resolver synthesis.
//!
//! [`ResolverSynthesizer`] mirrors the type graph and operation schema of a
//! resource into a [`ResourceResolvers`] table:
//! - `query`: one [`QueryResolver`] per Query field
//! - `mutation`: one [`MutationResolver`] per Mutation field
//! - `types`: [`FieldResolver`]s for reference, object and enum fields
//!
//! Scalar fields need no resolver; they project from the parent record.

mod field;
mod mutation;
mod query;

pub use field::FieldResolver;
pub use mutation::{MutationOutcome, MutationResolver, ScalarCheck};
pub use query::{
    NAME_FIELD, Pagination, QueryResolver, auth_filter, combine_filters, segment_allows,
};

use indexmap::IndexMap;
use modelql_storage::ModelHandle;
use tracing::debug;

use crate::options::{AuthSegment, InputAction, MutationAction};
use crate::scalars::{ScalarRegistry, is_builtin};
use crate::schema::{
    FieldNode, FieldNodeKind, Operation, OperationSchema, TypeGraph, TypeKind, input_type_name,
};

/// Resolvers of one resource.
#[derive(Debug, Clone, Default)]
pub struct ResourceResolvers {
    pub query: IndexMap<String, QueryResolver>,
    pub mutation: IndexMap<String, MutationResolver>,
    /// Type name → field name → resolver.
    pub types: IndexMap<String, IndexMap<String, FieldResolver>>,
}

impl ResourceResolvers {
    /// Number of resolvers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.query.len() + self.mutation.len() + self.types.values().map(IndexMap::len).sum::<usize>()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resource name → resolvers.
#[derive(Debug, Clone, Default)]
pub struct ResolverTable {
    resources: IndexMap<String, ResourceResolvers>,
}

impl ResolverTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource: impl Into<String>, resolvers: ResourceResolvers) {
        self.resources.insert(resource.into(), resolvers);
    }

    #[must_use]
    pub fn get(&self, resource: &str) -> Option<&ResourceResolvers> {
        self.resources.get(resource)
    }

    pub fn resources(&self) -> impl Iterator<Item = (&str, &ResourceResolvers)> {
        self.resources
            .iter()
            .map(|(name, resolvers)| (name.as_str(), resolvers))
    }

    /// Query resolver of the field `name`, across resources.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&QueryResolver> {
        self.resources.values().find_map(|r| r.query.get(name))
    }

    /// Mutation resolver of the field `name`, across resources.
    #[must_use]
    pub fn mutation(&self, name: &str) -> Option<&MutationResolver> {
        self.resources.values().find_map(|r| r.mutation.get(name))
    }

    /// Resolver of `type_name.field`, across resources.
    #[must_use]
    pub fn field(&self, type_name: &str, field: &str) -> Option<&FieldResolver> {
        self.resources
            .values()
            .find_map(|r| r.types.get(type_name).and_then(|fields| fields.get(field)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Builds resolvers from synthesis output.
#[derive(Debug, Clone, Copy)]
pub struct ResolverSynthesizer<'a> {
    scalars: &'a ScalarRegistry,
}

impl<'a> ResolverSynthesizer<'a> {
    #[must_use]
    pub fn new(scalars: &'a ScalarRegistry) -> Self {
        Self { scalars }
    }

    /// Resolvers for one resource.
    #[must_use]
    pub fn synthesize(
        &self,
        graph: &TypeGraph,
        operations: &OperationSchema,
        model: &ModelHandle,
    ) -> ResourceResolvers {
        let mut resolvers = ResourceResolvers::default();

        for signature in operations.signatures() {
            match signature.operation {
                Operation::Query {
                    range,
                    segment,
                    part,
                } => {
                    resolvers.query.insert(
                        signature.name.clone(),
                        QueryResolver {
                            resource: graph.resource.clone(),
                            range,
                            segment,
                            part,
                            projection: root_fields(graph, segment),
                            label: label_field(graph, segment),
                        },
                    );
                }
                Operation::Mutation { action, target } => {
                    let checks = match action {
                        MutationAction::Create => self.scalar_checks(graph, InputAction::Create),
                        MutationAction::Update => self.scalar_checks(graph, InputAction::Update),
                        MutationAction::Delete => Vec::new(),
                    };
                    resolvers.mutation.insert(
                        signature.name.clone(),
                        MutationResolver::new(
                            model.clone(),
                            action,
                            target,
                            checks,
                            self.scalars.clone(),
                        ),
                    );
                }
            }
        }

        for (_, object) in graph.objects() {
            let fields: IndexMap<String, FieldResolver> = object
                .fields
                .values()
                .filter_map(|field| {
                    let resolver = match (field.kind, field.target_segment, &field.target_base) {
                        (FieldNodeKind::Reference, Some(segment), Some(resource)) => {
                            FieldResolver::Reference {
                                resource: resource.clone(),
                                segment,
                            }
                        }
                        (FieldNodeKind::Object | FieldNodeKind::Enum, ..) => FieldResolver::Projection,
                        _ => return None,
                    };
                    Some((field.name.clone(), resolver))
                })
                .collect();
            if !fields.is_empty() {
                resolvers.types.insert(object.name.clone(), fields);
            }
        }

        debug!(
            resource = %graph.resource,
            queries = resolvers.query.len(),
            mutations = resolvers.mutation.len(),
            types = resolvers.types.len(),
            "Resolver synthesis complete"
        );
        resolvers
    }

    /// Custom scalars reachable from the root input of `action`.
    fn scalar_checks(&self, graph: &TypeGraph, action: InputAction) -> Vec<ScalarCheck> {
        let mut checks = Vec::new();
        let root = input_type_name(action, &graph.resource);
        self.walk_input(graph, &root, &mut Vec::new(), &mut checks);
        checks
    }

    fn walk_input(
        &self,
        graph: &TypeGraph,
        input: &str,
        path: &mut Vec<String>,
        checks: &mut Vec<ScalarCheck>,
    ) {
        let Some(node) = graph.get(input).filter(|node| matches!(node.kind, TypeKind::Input(_)))
        else {
            return;
        };
        for field in node.fields.values() {
            path.push(field.name.clone());
            match field.kind {
                FieldNodeKind::Scalar
                    if !is_builtin(&field.type_name) && self.scalars.contains(&field.type_name) =>
                {
                    checks.push(ScalarCheck {
                        path: path.clone(),
                        scalar: field.type_name.clone(),
                    });
                }
                FieldNodeKind::Object => self.walk_input(graph, &field.type_name, path, checks),
                _ => {}
            }
            path.pop();
        }
    }
}

/// Field names of the root object of `segment`.
fn root_fields(graph: &TypeGraph, segment: AuthSegment) -> Vec<String> {
    graph
        .root_object(segment)
        .map(|object| object.fields.keys().cloned().collect())
        .unwrap_or_default()
}

/// Field reported as `name` by `nameAndId` parts: a String field called
/// `name`, otherwise the first single String field of the root object.
fn label_field(graph: &TypeGraph, segment: AuthSegment) -> Option<String> {
    let object = graph.root_object(segment)?;
    let is_text = |field: &&FieldNode| {
        field.kind == FieldNodeKind::Scalar && field.depth == 0 && field.type_name == "String"
    };
    object
        .fields
        .get(NAME_FIELD)
        .filter(|field| is_text(field))
        .or_else(|| object.fields.values().find(is_text))
        .map(|field| field.name.clone())
}
