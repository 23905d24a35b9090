//! Type documents.
//!
//! A [`TypeDocument`] is an ordered list of SDL definitions, groupable by the
//! resource that contributed them. It renders to SDL text and, through
//! `async-graphql-parser`, to the standard service-document AST.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use async_graphql_parser::types::{
    FieldDefinition as AstField, InputValueDefinition, ServiceDocument, TypeKind as AstKind,
    TypeSystemDefinition,
};
use async_graphql_parser::{Positioned, parse_schema};
use indexmap::IndexSet;
use serde::Serialize;
use tracing::debug;

use super::decorate::parse_decorated;
use super::graph::{TypeGraph, TypeKind};
use super::operations::{
    NAME_AND_ID_TYPE, OperationKind, OperationSchema, PAGINATION_INPUT_TYPE,
};
use crate::error::CompileError;
use crate::scalars::{
    DATE_TIME_SCALAR, JSON_SCALAR, NON_NEGATIVE_INT_SCALAR, ScalarRegistry, is_builtin,
};

/// Kind of an SDL definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DefinitionKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl DefinitionKind {
    fn keyword(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Object => "type",
            Self::Interface => "interface",
            Self::Union => "union",
            Self::Enum => "enum",
            Self::InputObject => "input",
        }
    }
}

/// An argument of a field definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A field of an object, interface or input definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDefinition {
    pub name: String,
    /// Decorated type.
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<ArgumentDefinition>,
    /// Default value of an input field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            arguments: Vec::new(),
            default: None,
            description: None,
        }
    }

    /// Named type without decoration.
    #[must_use]
    pub fn named_type(&self) -> String {
        named_type(&self.ty)
    }
}

/// One SDL definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Definition {
    pub name: String,
    pub kind: DefinitionKind,
    /// Rendered as `extend ...`.
    pub extend: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDefinition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    /// Resource that contributed the definition; `None` for shared ones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl Definition {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: DefinitionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            extend: false,
            description: None,
            fields: Vec::new(),
            members: Vec::new(),
            values: Vec::new(),
            resource: None,
        }
    }

    #[must_use]
    pub fn with_fields(mut self, fields: Vec<FieldDefinition>) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    fn render(&self, out: &mut String) {
        if let Some(description) = &self.description {
            render_description(out, description, "");
        }
        if self.extend {
            out.push_str("extend ");
        }
        let _ = write!(out, "{} {}", self.kind.keyword(), self.name);
        match self.kind {
            DefinitionKind::Scalar => out.push('\n'),
            DefinitionKind::Union => {
                let _ = writeln!(out, " = {}", self.members.join(" | "));
            }
            DefinitionKind::Enum => {
                out.push_str(" {\n");
                for value in &self.values {
                    let _ = writeln!(out, "  {value}");
                }
                out.push_str("}\n");
            }
            DefinitionKind::Object | DefinitionKind::Interface | DefinitionKind::InputObject => {
                out.push_str(" {\n");
                for field in &self.fields {
                    if let Some(description) = &field.description {
                        render_description(out, description, "  ");
                    }
                    let _ = write!(out, "  {}", field.name);
                    if !field.arguments.is_empty() {
                        let arguments: Vec<String> = field
                            .arguments
                            .iter()
                            .map(|arg| match &arg.default {
                                Some(default) => format!("{}: {} = {default}", arg.name, arg.ty),
                                None => format!("{}: {}", arg.name, arg.ty),
                            })
                            .collect();
                        let _ = write!(out, "({})", arguments.join(", "));
                    }
                    let _ = write!(out, ": {}", field.ty);
                    if let Some(default) = &field.default {
                        let _ = write!(out, " = {default}");
                    }
                    out.push('\n');
                }
                out.push_str("}\n");
            }
        }
    }
}

fn render_description(out: &mut String, description: &str, indent: &str) {
    let escaped = description.replace("\"\"\"", "\\\"\"\"");
    let _ = writeln!(out, "{indent}\"\"\"{escaped}\"\"\"");
}

/// Strips list and non-null decoration.
#[must_use]
pub fn named_type(decorated: &str) -> String {
    parse_decorated(decorated).map_or_else(
        || decorated.trim_matches(|c| c == '[' || c == ']' || c == '!').to_string(),
        |parsed| parsed.name,
    )
}

/// Ordered SDL definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TypeDocument {
    definitions: Vec<Definition>,
}

impl TypeDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the definitions contributed by one resource: its type graph,
    /// page wrappers and Query / Mutation extensions. Empty extensions are
    /// omitted.
    #[must_use]
    pub fn from_resource(graph: &TypeGraph, operations: &OperationSchema) -> Self {
        let resource = Some(graph.resource.clone());
        let mut document = Self::new();

        for node in graph.definitions() {
            let kind = match node.kind {
                TypeKind::Object => DefinitionKind::Object,
                TypeKind::Input(_) => DefinitionKind::InputObject,
                TypeKind::Interface => DefinitionKind::Interface,
                TypeKind::Union => DefinitionKind::Union,
                TypeKind::Enum => DefinitionKind::Enum,
            };
            let mut definition = Definition::new(&node.name, kind);
            definition.extend = node.extends;
            definition.resource.clone_from(&resource);
            definition.fields = node
                .fields
                .values()
                .map(|field| FieldDefinition {
                    name: field.name.clone(),
                    ty: field.decorated.clone(),
                    arguments: Vec::new(),
                    default: None,
                    description: field.description.clone(),
                })
                .collect();
            definition.members.clone_from(&node.members);
            definition.values.clone_from(&node.values);
            document.push(definition);
        }

        for page in &operations.pages {
            let mut definition = Definition::new(&page.name, DefinitionKind::Object).with_fields(vec![
                FieldDefinition::new("docs", format!("[{}!]!", page.object)),
                FieldDefinition::new("total", format!("{NON_NEGATIVE_INT_SCALAR}!")),
                FieldDefinition::new("page", "Int!"),
                FieldDefinition::new("limit", "Int!"),
            ]);
            definition.resource.clone_from(&resource);
            document.push(definition);
        }

        for (kind, signatures) in [
            (OperationKind::Query, &operations.queries),
            (OperationKind::Mutation, &operations.mutations),
        ] {
            if signatures.is_empty() {
                continue;
            }
            let mut extension = Definition::new(kind.root_type(), DefinitionKind::Object);
            extension.extend = true;
            extension.resource.clone_from(&resource);
            extension.fields = signatures
                .iter()
                .map(|signature| FieldDefinition {
                    name: signature.name.clone(),
                    ty: signature.return_type.clone(),
                    arguments: signature
                        .arguments
                        .iter()
                        .map(|arg| ArgumentDefinition {
                            name: arg.name.clone(),
                            ty: arg.ty.clone(),
                            default: None,
                        })
                        .collect(),
                    default: None,
                    description: None,
                })
                .collect();
            document.push(extension);
        }
        document
    }

    /// Parses SDL text.
    ///
    /// Schema and directive definitions are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidDocument`] if the text is not valid SDL.
    pub fn from_sdl(sdl: &str) -> Result<Self, CompileError> {
        let ast = parse_schema(sdl).map_err(|e| CompileError::InvalidDocument(e.to_string()))?;
        let mut document = Self::new();
        for definition in ast.definitions {
            let TypeSystemDefinition::Type(ty) = definition else {
                debug!("Skipping non-type definition in initial document");
                continue;
            };
            let ty = ty.node;
            let (kind, fields, members, values) = match ty.kind {
                AstKind::Scalar => (DefinitionKind::Scalar, Vec::new(), Vec::new(), Vec::new()),
                AstKind::Object(object) => (
                    DefinitionKind::Object,
                    convert_fields(object.fields),
                    Vec::new(),
                    Vec::new(),
                ),
                AstKind::Interface(interface) => (
                    DefinitionKind::Interface,
                    convert_fields(interface.fields),
                    Vec::new(),
                    Vec::new(),
                ),
                AstKind::Union(union) => (
                    DefinitionKind::Union,
                    Vec::new(),
                    union.members.into_iter().map(|m| m.node.to_string()).collect(),
                    Vec::new(),
                ),
                AstKind::Enum(enumeration) => (
                    DefinitionKind::Enum,
                    Vec::new(),
                    Vec::new(),
                    enumeration
                        .values
                        .into_iter()
                        .map(|v| v.node.value.node.to_string())
                        .collect(),
                ),
                AstKind::InputObject(input) => (
                    DefinitionKind::InputObject,
                    input.fields.into_iter().map(convert_input_value).collect(),
                    Vec::new(),
                    Vec::new(),
                ),
            };
            document.push(Definition {
                name: ty.name.node.to_string(),
                kind,
                extend: ty.extend,
                description: ty.description.map(|d| d.node),
                fields,
                members,
                values,
                resource: None,
            });
        }
        Ok(document)
    }

    /// Renders SDL text.
    #[must_use]
    pub fn to_sdl(&self) -> String {
        let mut out = String::new();
        for (i, definition) in self.definitions.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            definition.render(&mut out);
        }
        out
    }

    /// Parses the rendered SDL into the standard AST.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidDocument`] if rendering produced text
    /// the parser rejects.
    pub fn to_ast(&self) -> Result<ServiceDocument, CompileError> {
        parse_schema(self.to_sdl()).map_err(|e| CompileError::InvalidDocument(e.to_string()))
    }

    pub fn push(&mut self, definition: Definition) {
        self.definitions.push(definition);
    }

    /// Turns the first `extend type Query` / `extend type Mutation` into a
    /// base definition when nothing else defines that root, so the rendered
    /// SDL stands on its own.
    pub fn promote_root_extensions(&mut self) {
        for root in ["Query", "Mutation"] {
            if self.get(root).is_some() {
                continue;
            }
            if let Some(first) = self
                .definitions
                .iter_mut()
                .find(|definition| definition.name == root)
            {
                first.extend = false;
            }
        }
    }

    /// Appends every definition of `other`.
    pub fn append(&mut self, other: TypeDocument) {
        self.definitions.extend(other.definitions);
    }

    #[must_use]
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// First non-extension definition named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.definitions
            .iter()
            .find(|definition| definition.name == name && !definition.extend)
    }

    /// Every definition or extension named `name`, in order.
    pub fn all_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Definition> {
        self.definitions
            .iter()
            .filter(move |definition| definition.name == name)
    }

    /// Definitions contributed by `resource`.
    pub fn for_resource<'a>(&'a self, resource: &'a str) -> impl Iterator<Item = &'a Definition> {
        self.definitions
            .iter()
            .filter(move |definition| definition.resource.as_deref() == Some(resource))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Type name → field names, across definitions and extensions.
    #[must_use]
    pub fn existing_fields(&self) -> HashMap<String, HashSet<String>> {
        let mut existing: HashMap<String, HashSet<String>> = HashMap::new();
        for definition in &self.definitions {
            existing
                .entry(definition.name.clone())
                .or_default()
                .extend(definition.fields.iter().map(|field| field.name.clone()));
        }
        existing
    }

    /// Names of types defined (not only extended).
    #[must_use]
    pub fn defined_types(&self) -> HashSet<&str> {
        self.definitions
            .iter()
            .filter(|definition| !definition.extend)
            .map(|definition| definition.name.as_str())
            .collect()
    }

    /// Named types referenced by fields, arguments and union members.
    #[must_use]
    pub fn referenced_types(&self) -> IndexSet<String> {
        let mut referenced = IndexSet::new();
        for definition in &self.definitions {
            for field in &definition.fields {
                referenced.insert(field.named_type());
                for argument in &field.arguments {
                    referenced.insert(named_type(&argument.ty));
                }
            }
            referenced.extend(definition.members.iter().cloned());
        }
        referenced
    }

    /// Definitions for referenced types nothing defines: custom scalars,
    /// `PaginationInput` and `NameAndId`.
    #[must_use]
    pub fn support_definitions(&self, scalars: &ScalarRegistry) -> Vec<Definition> {
        let defined = self.defined_types();
        let mut support = Vec::new();
        for name in self.referenced_types() {
            if defined.contains(name.as_str()) || crate::scalars::BUILTIN_SCALARS.contains(&name.as_str()) {
                continue;
            }
            if name == PAGINATION_INPUT_TYPE {
                support.push(
                    Definition::new(PAGINATION_INPUT_TYPE, DefinitionKind::InputObject).with_fields(vec![
                        FieldDefinition::new("page", "Int!"),
                        FieldDefinition::new("limit", "Int!"),
                        FieldDefinition::new("sort", JSON_SCALAR),
                    ]),
                );
            } else if name == NAME_AND_ID_TYPE {
                support.push(
                    Definition::new(NAME_AND_ID_TYPE, DefinitionKind::Object).with_fields(vec![
                        FieldDefinition::new("id", "ID!"),
                        FieldDefinition::new("name", "String"),
                    ]),
                );
            } else if is_builtin(&name) || name == DATE_TIME_SCALAR || scalars.contains(&name) {
                support.push(Definition::new(name, DefinitionKind::Scalar));
            }
        }
        // PaginationInput's sort needs JSON even when nothing else does.
        let has_json = support.iter().any(|d| d.name == JSON_SCALAR) || defined.contains(JSON_SCALAR);
        let needs_json = support.iter().any(|d| d.name == PAGINATION_INPUT_TYPE);
        if needs_json && !has_json {
            support.push(Definition::new(JSON_SCALAR, DefinitionKind::Scalar));
        }
        support.sort_by_key(|definition| definition.kind != DefinitionKind::Scalar);
        support
    }
}

fn convert_fields(fields: Vec<Positioned<AstField>>) -> Vec<FieldDefinition> {
    fields
        .into_iter()
        .map(|field| {
            let field = field.node;
            FieldDefinition {
                name: field.name.node.to_string(),
                ty: field.ty.node.to_string(),
                arguments: field
                    .arguments
                    .into_iter()
                    .map(|arg| ArgumentDefinition {
                        name: arg.node.name.node.to_string(),
                        ty: arg.node.ty.node.to_string(),
                        default: arg.node.default_value.map(|d| d.node.to_string()),
                    })
                    .collect(),
                default: None,
                description: field.description.map(|d| d.node),
            }
        })
        .collect()
}

fn convert_input_value(value: Positioned<InputValueDefinition>) -> FieldDefinition {
    let value = value.node;
    let mut field = FieldDefinition::new(value.name.node.to_string(), value.ty.node.to_string());
    field.default = value.default_value.map(|d| d.node.to_string());
    field.description = value.description.map(|d| d.node);
    field
}

#[cfg(test)]
mod tests {
    use super::*;

    const SDL: &str = r#"
"""A user"""
type UserObject {
  id: ID!
  "display name"
  name: String
  posts(first: Int = 10): [PostObject!]!
}

extend type Query {
  me: UserObject
}

union Any = UserObject | PostObject

enum Role {
  ADMIN
  MEMBER
}

input Filter {
  name: String = "x"
}

scalar Email

directive @auth on FIELD_DEFINITION
"#;

    #[test]
    fn test_from_sdl() {
        let document = TypeDocument::from_sdl(SDL).unwrap();
        assert_eq!(document.len(), 6);

        let user = document.get("UserObject").unwrap();
        assert_eq!(user.description.as_deref(), Some("A user"));
        assert_eq!(user.field("posts").unwrap().ty, "[PostObject!]!");
        assert_eq!(
            user.field("posts").unwrap().arguments[0].default.as_deref(),
            Some("10")
        );
        assert_eq!(user.field("name").unwrap().description.as_deref(), Some("display name"));

        assert!(document.get("Query").is_none());
        assert_eq!(document.all_named("Query").count(), 1);
        assert_eq!(document.get("Any").unwrap().members, vec!["UserObject", "PostObject"]);
        assert_eq!(document.get("Role").unwrap().values, vec!["ADMIN", "MEMBER"]);
        assert_eq!(
            document.get("Filter").unwrap().field("name").unwrap().default.as_deref(),
            Some("\"x\"")
        );
    }

    #[test]
    fn test_sdl_roundtrip() {
        let document = TypeDocument::from_sdl(SDL).unwrap();
        let reparsed = TypeDocument::from_sdl(&document.to_sdl()).unwrap();
        assert_eq!(document, reparsed);
        assert!(document.to_ast().is_ok());
    }

    #[test]
    fn test_invalid_sdl() {
        assert!(matches!(
            TypeDocument::from_sdl("type {"),
            Err(CompileError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_promote_root_extensions() {
        let mut document = TypeDocument::from_sdl(
            "extend type Query { a: Int }\nextend type Query { b: Int }\ntype Mutation { m: Int }\nextend type Mutation { n: Int }",
        )
        .unwrap();
        document.promote_root_extensions();
        let query: Vec<_> = document.all_named("Query").map(|d| d.extend).collect();
        assert_eq!(query, vec![false, true]);
        let mutation: Vec<_> = document.all_named("Mutation").map(|d| d.extend).collect();
        assert_eq!(mutation, vec![false, true]);
        assert!(document.to_sdl().starts_with("type Query {"));
        assert!(document.to_ast().is_ok());
    }

    #[test]
    fn test_existing_fields() {
        let document = TypeDocument::from_sdl(SDL).unwrap();
        let existing = document.existing_fields();
        assert!(existing["UserObject"].contains("posts"));
        assert!(existing["Query"].contains("me"));
    }

    #[test]
    fn test_support_definitions() {
        let mut document = TypeDocument::new();
        let mut query = Definition::new("Query", DefinitionKind::Object);
        query.extend = true;
        query.fields = vec![
            FieldDefinition {
                name: "page".into(),
                ty: "[NameAndId!]!".into(),
                arguments: vec![ArgumentDefinition {
                    name: "pagination".into(),
                    ty: "PaginationInput!".into(),
                    default: None,
                }],
                default: None,
                description: None,
            },
            FieldDefinition::new("count", "NonNegativeInt!"),
            FieldDefinition::new("email", "Email"),
            FieldDefinition::new("missing", "Nowhere"),
        ];
        document.push(query);
        let support = document.support_definitions(&ScalarRegistry::with_defaults());
        let names: Vec<_> = support.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["NonNegativeInt", "Email", "JSON", "NameAndId", "PaginationInput"]
        );
    }

    #[test]
    fn test_named_type() {
        assert_eq!(named_type("[[SelfUserObject!]]!"), "SelfUserObject");
        assert_eq!(named_type("ID"), "ID");
    }
}
