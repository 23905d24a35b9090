//! Operation documents.
//!
//! One self-contained document per operation signature and applicable
//! fragment part: the operation itself followed by every fragment it
//! transitively spreads.

use std::fmt::Write as _;

use async_graphql_parser::parse_query;
use async_graphql_parser::types::ExecutableDocument;
use serde::Serialize;
use tracing::{debug, trace};

use super::fragments::FragmentSet;
use crate::error::CompileError;
use crate::schema::{FieldSignature, OperationKind, ReturnShape};

/// A ready-to-send operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationDocument {
    /// `{op}` or `{op}_{Part}`.
    pub name: String,
    pub kind: OperationKind,
    /// Root field the operation selects.
    pub operation: String,
    pub resource: String,
    /// Fragment part, for object returns.
    pub part: Option<String>,
    /// Operation text followed by its fragments.
    pub source: String,
}

impl OperationDocument {
    /// Parses the document into the standard executable AST.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidDocument`] if the text does not parse.
    pub fn to_ast(&self) -> Result<ExecutableDocument, CompileError> {
        parse_query(&self.source).map_err(|e| CompileError::InvalidDocument(e.to_string()))
    }
}

/// Builds operation documents from signatures and fragments.
#[derive(Debug, Clone, Copy)]
pub struct OperationDocumentGenerator<'a> {
    fragments: &'a FragmentSet,
}

impl<'a> OperationDocumentGenerator<'a> {
    #[must_use]
    pub fn new(fragments: &'a FragmentSet) -> Self {
        Self { fragments }
    }

    /// Documents for every signature, in signature order.
    pub fn generate<'s>(
        &self,
        signatures: impl IntoIterator<Item = &'s FieldSignature>,
    ) -> Vec<OperationDocument> {
        let documents: Vec<_> = signatures
            .into_iter()
            .flat_map(|signature| self.generate_one(signature))
            .collect();
        debug!(count = documents.len(), "Generated operation documents");
        documents
    }

    /// Documents for one signature.
    #[must_use]
    pub fn generate_one(&self, signature: &FieldSignature) -> Vec<OperationDocument> {
        let name = &signature.name;
        match &signature.shape {
            ReturnShape::Scalar => vec![document(signature, name, None, None)],
            ReturnShape::NameAndId => vec![document(signature, name, None, Some("{ id name }"))],
            ReturnShape::Object { object } | ReturnShape::Page { object } => {
                let parts: Vec<_> = self.fragments.parts_of(object).collect();
                if parts.is_empty() {
                    trace!(operation = %name, object = %object, "No fragments for return type");
                    return vec![document(signature, name, None, Some("{ __typename }"))];
                }
                let suffixed = parts.len() > 1;
                parts
                    .into_iter()
                    .map(|(part, fragment)| {
                        let name = if suffixed {
                            format!("{name}_{part}")
                        } else {
                            name.clone()
                        };
                        self.spread_document(signature, &name, part, fragment)
                    })
                    .collect()
            }
        }
    }

    fn spread_document(
        &self,
        signature: &FieldSignature,
        name: &str,
        part: &str,
        fragment: &str,
    ) -> OperationDocument {
        let selection = match signature.shape {
            ReturnShape::Page { .. } => format!("{{ docs {{ ...{fragment} }} total page limit }}"),
            _ => format!("{{ ...{fragment} }}"),
        };
        let mut document = document(signature, name, Some(part), Some(&selection));
        for definition in self.fragments.collect_dependencies(fragment) {
            document.source.push('\n');
            document.source.push_str(&definition.to_source());
        }
        document
    }
}

fn document(
    signature: &FieldSignature,
    name: &str,
    part: Option<&str>,
    selection: Option<&str>,
) -> OperationDocument {
    let kind = signature.kind();
    let mut source = format!("{} {name}", kind.keyword());
    if !signature.arguments.is_empty() {
        let variables: Vec<String> = signature
            .arguments
            .iter()
            .map(|arg| format!("${}: {}", arg.name, arg.ty))
            .collect();
        let _ = write!(source, "({})", variables.join(", "));
    }
    let _ = write!(source, " {{\n  {}", signature.name);
    if !signature.arguments.is_empty() {
        let arguments: Vec<String> = signature
            .arguments
            .iter()
            .map(|arg| format!("{0}: ${0}", arg.name))
            .collect();
        let _ = write!(source, "({})", arguments.join(", "));
    }
    if let Some(selection) = selection {
        let _ = write!(source, " {selection}");
    }
    source.push_str("\n}\n");

    OperationDocument {
        name: name.to_string(),
        kind,
        operation: signature.name.clone(),
        resource: signature.resource.clone(),
        part: part.map(str::to_string),
        source,
    }
}

/// Joins documents into one text, separated by blank lines.
#[must_use]
pub fn render_documents(documents: &[OperationDocument]) -> String {
    documents
        .iter()
        .map(|document| document.source.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::FragmentGenerator;
    use crate::model::{FieldSpec, ResourceSchema, SchemaNode};
    use crate::options::GenerationConfig;
    use crate::scalars::ScalarRegistry;
    use crate::schema::{OperationSchema, OperationSchemaSynthesizer, TypeGraph, TypeSynthesizer};
    use indexmap::IndexMap;

    fn compile() -> (TypeGraph, OperationSchema) {
        let schema = ResourceSchema::new("User")
            .field("name", FieldSpec::primitive("String"))
            .field(
                "address",
                FieldSpec::object(SchemaNode::new().field("city", FieldSpec::primitive("String"))),
            );
        let scalars = ScalarRegistry::with_defaults();
        let config = GenerationConfig::default();
        let graph = TypeSynthesizer::new(&scalars)
            .synthesize(&schema, &config, None)
            .unwrap();
        let renames = IndexMap::new();
        let operations = OperationSchemaSynthesizer::new("User", "Users".into(), &renames)
            .synthesize(&config.query, &config.mutation, &graph);
        (graph, operations)
    }

    fn find<'a>(operations: &'a OperationSchema, name: &str) -> &'a FieldSignature {
        operations.signatures().find(|s| s.name == name).unwrap()
    }

    #[test]
    fn test_scalar_operation() {
        let (graph, operations) = compile();
        let fragments = FragmentGenerator::new().generate(&[&graph]);
        let generator = OperationDocumentGenerator::new(&fragments);
        let documents = generator.generate_one(find(&operations, "getFilteredSelfUsersCount"));
        assert_eq!(documents.len(), 1);
        assert_eq!(
            documents[0].source,
            "query getFilteredSelfUsersCount($filter: JSON) {\n  getFilteredSelfUsersCount(filter: $filter)\n}\n"
        );
        assert!(documents[0].to_ast().is_ok());
    }

    #[test]
    fn test_object_operation_per_part() {
        let (graph, operations) = compile();
        let fragments = FragmentGenerator::new().generate(&[&graph]);
        let generator = OperationDocumentGenerator::new(&fragments);
        let documents = generator.generate_one(find(&operations, "getIdSelfUsersWhole"));
        let names: Vec<_> = documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "getIdSelfUsersWhole_Whole",
                "getIdSelfUsersWhole_ScalarsOnly",
                "getIdSelfUsersWhole_ObjectsNone",
                "getIdSelfUsersWhole_RefsNone",
            ]
        );
        let whole = &documents[0];
        assert!(whole.source.starts_with(
            "query getIdSelfUsersWhole_Whole($id: ID!) {\n  getIdSelfUsersWhole(id: $id) { ...SelfUserWholeFragment }\n}\n"
        ));
        assert!(whole.source.contains("fragment SelfUserWholeFragment on SelfUserObject"));
        assert!(whole.source.contains("fragment SelfUserAddressWholeFragment on SelfUserAddressObject"));
        assert!(!whole.source.contains("ScalarsOnlyFragment"));
        for document in &documents {
            assert!(document.to_ast().is_ok(), "{}", document.source);
        }
    }

    #[test]
    fn test_page_and_name_and_id() {
        let (graph, operations) = compile();
        let fragments = FragmentGenerator::new().generate(&[&graph]);
        let generator = OperationDocumentGenerator::new(&fragments);

        let page = &generator.generate_one(find(&operations, "getPaginatedMixedUsersWhole"))[0];
        assert!(page.source.contains(
            "getPaginatedMixedUsersWhole(filter: $filter, pagination: $pagination) { docs { ...MixedUserWholeFragment } total page limit }"
        ));
        assert!(page.source.contains("($filter: JSON, $pagination: PaginationInput!)"));

        let name_and_id = &generator.generate_one(find(&operations, "getAllOthersUsersNameAndId"))[0];
        assert!(name_and_id.source.contains("getAllOthersUsersNameAndId { id name }"));
    }

    #[test]
    fn test_mutation_document() {
        let (graph, operations) = compile();
        let fragments = FragmentGenerator::new().generate(&[&graph]);
        let generator = OperationDocumentGenerator::new(&fragments);
        let documents = generator.generate_one(find(&operations, "deleteUsers"));
        assert!(documents[0].source.starts_with("mutation deleteUsers_Whole($ids: [ID!]!)"));
        assert_eq!(documents[0].kind, OperationKind::Mutation);
    }

    #[test]
    fn test_every_document_parses() {
        let (graph, operations) = compile();
        let fragments = FragmentGenerator::new().generate(&[&graph]);
        let documents = OperationDocumentGenerator::new(&fragments).generate(operations.signatures());
        assert!(!documents.is_empty());
        for document in &documents {
            assert!(document.to_ast().is_ok(), "{}", document.source);
        }
    }
}
