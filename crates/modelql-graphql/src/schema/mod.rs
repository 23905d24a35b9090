//! Schema synthesis.
//!
//! Turns a resource schema into a layered [`TypeGraph`], derives the root
//! operation fields for it and renders both into a [`TypeDocument`]. The
//! [`ExecutableSchemaBuilder`] then wires the document to resolvers with
//! async-graphql's dynamic schema.

mod builder;
mod classifier;
mod decorate;
mod document;
mod graph;
mod operations;
mod type_generator;

pub use builder::ExecutableSchemaBuilder;
pub use classifier::{ClassifiedField, FieldKind, classify};
pub use decorate::{DecoratedType, decorate, parse_decorated};
pub use document::{
    ArgumentDefinition, Definition, DefinitionKind, FieldDefinition, TypeDocument, named_type,
};
pub use graph::{
    FieldNode, FieldNodeKind, GraphBuilder, TypeGraph, TypeKind, TypeNode, input_type_name,
    interface_type_name, object_type_name, union_type_name,
};
pub use operations::{
    ArgumentSignature, FieldSignature, NAME_AND_ID_TYPE, Operation, OperationKind,
    OperationSchema, OperationSchemaSynthesizer, PAGINATION_INPUT_TYPE, PageType, ReturnShape,
    page_type_name,
};
pub use type_generator::TypeSynthesizer;
