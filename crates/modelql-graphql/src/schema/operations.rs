//! Query and mutation signatures.
//!
//! Signatures are derived from the resolved query / mutation matrices of a
//! resource and pruned against its type graph: an operation whose return
//! object or input was not synthesized is dropped.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use super::graph::{TypeGraph, input_type_name, object_type_name};
use crate::options::{
    AuthSegment, InputAction, MutationAction, MutationOptions, MutationTarget, QueryOptions,
    QueryPart, QueryRange,
};
use crate::scalars::{JSON_SCALAR, NON_NEGATIVE_INT_SCALAR};

/// Minimal `{ id name }` return type of nameAndId queries.
pub const NAME_AND_ID_TYPE: &str = "NameAndId";

/// Pagination argument input type.
pub const PAGINATION_INPUT_TYPE: &str = "PaginationInput";

/// Root operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    /// Root type name and document keyword.
    #[must_use]
    pub fn root_type(self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Mutation => "Mutation",
        }
    }

    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }
}

/// What a signature does, used to pick its resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Query {
        range: QueryRange,
        segment: AuthSegment,
        part: QueryPart,
    },
    Mutation {
        action: MutationAction,
        target: MutationTarget,
    },
}

impl Operation {
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Query { .. } => OperationKind::Query,
            Self::Mutation { .. } => OperationKind::Mutation,
        }
    }
}

/// Shape of a signature's return type, used for selection sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnShape {
    /// A scalar; selected bare.
    Scalar,
    /// `NameAndId` records.
    NameAndId,
    /// A page wrapper around objects of `object`.
    Page { object: String },
    /// Objects of type `object`.
    Object { object: String },
}

/// One argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentSignature {
    pub name: String,
    /// Decorated type.
    pub ty: String,
}

impl ArgumentSignature {
    fn new(name: &str, ty: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            ty: ty.into(),
        }
    }
}

/// A Query or Mutation field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSignature {
    /// Name after `operation_names` remapping.
    pub name: String,
    /// Synthesized name.
    pub synthesized: String,
    pub resource: String,
    pub operation: Operation,
    pub arguments: Vec<ArgumentSignature>,
    /// Decorated return type.
    pub return_type: String,
    pub shape: ReturnShape,
}

impl FieldSignature {
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }
}

/// `{Segment}{Plural}Page` wrapper returned by paginated whole queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageType {
    pub name: String,
    pub resource: String,
    pub object: String,
}

/// `{Segment}{Plural}Page`
#[must_use]
pub fn page_type_name(segment: AuthSegment, plural: &str) -> String {
    format!("{}{plural}Page", segment.label())
}

/// Signatures and support types of one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationSchema {
    pub queries: Vec<FieldSignature>,
    pub mutations: Vec<FieldSignature>,
    pub pages: Vec<PageType>,
}

impl OperationSchema {
    /// Queries then mutations.
    pub fn signatures(&self) -> impl Iterator<Item = &FieldSignature> {
        self.queries.iter().chain(&self.mutations)
    }
}

/// Builds operation signatures for one resource.
#[derive(Debug, Clone)]
pub struct OperationSchemaSynthesizer<'a> {
    resource: &'a str,
    plural: String,
    renames: &'a IndexMap<String, String>,
}

impl<'a> OperationSchemaSynthesizer<'a> {
    #[must_use]
    pub fn new(resource: &'a str, plural: String, renames: &'a IndexMap<String, String>) -> Self {
        Self {
            resource,
            plural,
            renames,
        }
    }

    /// Builds queries, mutations and page wrappers, pruned against `graph`.
    #[must_use]
    pub fn synthesize(
        &self,
        query: &QueryOptions,
        mutation: &MutationOptions,
        graph: &TypeGraph,
    ) -> OperationSchema {
        let mut schema = OperationSchema::default();
        for signature in self.synthesize_query(query) {
            let object = object_type_name(segment_of(&signature), self.resource);
            if graph.contains(&object) {
                schema.queries.push(signature);
            } else {
                debug!(operation = %signature.name, object = %object, "Pruning query without return object");
            }
        }
        for signature in self.synthesize_mutation(mutation) {
            let object = object_type_name(AuthSegment::Owned, self.resource);
            let input = match signature.operation {
                Operation::Mutation {
                    action: MutationAction::Create,
                    ..
                } => Some(input_type_name(InputAction::Create, self.resource)),
                Operation::Mutation {
                    action: MutationAction::Update,
                    ..
                } => Some(input_type_name(InputAction::Update, self.resource)),
                _ => None,
            };
            let has_input = input.as_deref().is_none_or(|name| graph.contains(name));
            if graph.contains(&object) && has_input {
                schema.mutations.push(signature);
            } else {
                debug!(operation = %signature.name, "Pruning mutation without return object or input");
            }
        }
        for segment in AuthSegment::ALL {
            let name = page_type_name(segment, &self.plural);
            let used = schema.queries.iter().any(|q| {
                matches!(
                    q.operation,
                    Operation::Query { segment: s, range: QueryRange::Paginated, part: QueryPart::Whole }
                        if s == segment
                )
            });
            if used {
                schema.pages.push(PageType {
                    name,
                    resource: self.resource.to_string(),
                    object: object_type_name(segment, self.resource),
                });
            }
        }
        schema
    }

    /// Query signatures for every enabled range × auth × part cell.
    #[must_use]
    pub fn synthesize_query(&self, query: &QueryOptions) -> Vec<FieldSignature> {
        let mut signatures = Vec::new();
        for range in QueryRange::ALL {
            for segment in AuthSegment::ALL {
                for &part in range.parts() {
                    if !query.enabled(range, segment, part) {
                        continue;
                    }
                    let synthesized = format!(
                        "get{}{}{}{}",
                        range.label(),
                        segment.label(),
                        self.plural,
                        part.label()
                    );
                    let object = object_type_name(segment, self.resource);
                    let (return_type, shape) = match (range, part) {
                        (_, QueryPart::Count) => {
                            (format!("{NON_NEGATIVE_INT_SCALAR}!"), ReturnShape::Scalar)
                        }
                        (QueryRange::Id, QueryPart::NameAndId) => {
                            (NAME_AND_ID_TYPE.to_string(), ReturnShape::NameAndId)
                        }
                        (_, QueryPart::NameAndId) => {
                            (format!("[{NAME_AND_ID_TYPE}!]!"), ReturnShape::NameAndId)
                        }
                        (QueryRange::Id, QueryPart::Whole) => {
                            (object.clone(), ReturnShape::Object { object })
                        }
                        (QueryRange::Paginated, QueryPart::Whole) => (
                            format!("{}!", page_type_name(segment, &self.plural)),
                            ReturnShape::Page { object },
                        ),
                        (_, QueryPart::Whole) => {
                            (format!("[{object}!]!"), ReturnShape::Object { object })
                        }
                    };
                    signatures.push(self.signature(
                        synthesized,
                        Operation::Query {
                            range,
                            segment,
                            part,
                        },
                        query_arguments(range),
                        return_type,
                        shape,
                    ));
                }
            }
        }
        signatures
    }

    /// Mutation signatures for every enabled action × target cell.
    #[must_use]
    pub fn synthesize_mutation(&self, mutation: &MutationOptions) -> Vec<FieldSignature> {
        let object = object_type_name(AuthSegment::Owned, self.resource);
        let mut signatures = Vec::new();
        for action in MutationAction::ALL {
            for target in MutationTarget::ALL {
                if !mutation.enabled(action, target) {
                    continue;
                }
                let subject: &str = match target {
                    MutationTarget::Single => self.resource,
                    MutationTarget::Multi => &self.plural,
                };
                let synthesized = format!("{}{subject}", action.key());
                let argument = match (action, target) {
                    (MutationAction::Create, MutationTarget::Single) => ArgumentSignature::new(
                        "data",
                        format!("{}!", input_type_name(InputAction::Create, self.resource)),
                    ),
                    (MutationAction::Create, MutationTarget::Multi) => ArgumentSignature::new(
                        "data",
                        format!("[{}!]!", input_type_name(InputAction::Create, self.resource)),
                    ),
                    (MutationAction::Update, MutationTarget::Single) => ArgumentSignature::new(
                        "data",
                        format!("{}!", input_type_name(InputAction::Update, self.resource)),
                    ),
                    (MutationAction::Update, MutationTarget::Multi) => ArgumentSignature::new(
                        "data",
                        format!("[{}!]!", input_type_name(InputAction::Update, self.resource)),
                    ),
                    (MutationAction::Delete, MutationTarget::Single) => {
                        ArgumentSignature::new("id", "ID!")
                    }
                    (MutationAction::Delete, MutationTarget::Multi) => {
                        ArgumentSignature::new("ids", "[ID!]!")
                    }
                };
                let return_type = match target {
                    MutationTarget::Single => object.clone(),
                    MutationTarget::Multi => format!("[{object}]!"),
                };
                signatures.push(self.signature(
                    synthesized,
                    Operation::Mutation { action, target },
                    vec![argument],
                    return_type,
                    ReturnShape::Object {
                        object: object.clone(),
                    },
                ));
            }
        }
        signatures
    }

    fn signature(
        &self,
        synthesized: String,
        operation: Operation,
        arguments: Vec<ArgumentSignature>,
        return_type: String,
        shape: ReturnShape,
    ) -> FieldSignature {
        let name = self
            .renames
            .get(&synthesized)
            .cloned()
            .unwrap_or_else(|| synthesized.clone());
        FieldSignature {
            name,
            synthesized,
            resource: self.resource.to_string(),
            operation,
            arguments,
            return_type,
            shape,
        }
    }
}

fn segment_of(signature: &FieldSignature) -> AuthSegment {
    match signature.operation {
        Operation::Query { segment, .. } => segment,
        Operation::Mutation { .. } => AuthSegment::Owned,
    }
}

fn query_arguments(range: QueryRange) -> Vec<ArgumentSignature> {
    match range {
        QueryRange::All => Vec::new(),
        QueryRange::Filtered => vec![ArgumentSignature::new("filter", JSON_SCALAR)],
        QueryRange::Paginated => vec![
            ArgumentSignature::new("filter", JSON_SCALAR),
            ArgumentSignature::new("pagination", format!("{PAGINATION_INPUT_TYPE}!")),
        ],
        QueryRange::Id => vec![ArgumentSignature::new("id", "ID!")],
    }
}
