//! # modelql-graphql
//!
//! Compiles hierarchical data-model descriptions into a GraphQL API surface.
//!
//! From one or more [`ResourceSchema`] trees and a set of generation options
//! the compiler produces:
//!
//! - Object, input, interface, union and enum type definitions per auth
//!   segment (`Self`, `Others`, `Mixed`) and nesting level
//! - Query and Mutation extension signatures
//! - Reusable fragments and ready-to-send operation documents
//! - A resolver table delegating data access to the storage traits of
//!   `modelql-storage`
//!
//! ## Overview
//!
//! Options cascade from the global level through resources and nested
//! objects down to single fields. Each compilation run owns its type graphs;
//! nothing is shared between runs.
//!
//! ```ignore
//! let compiler = Compiler::new(serde_json::Value::Null, ScalarRegistry::with_defaults())?;
//! let compiled = compiler.compile_all(&schemas, None)?;
//! std::fs::write("schema.graphql", &compiled.sdl)?;
//! let schema = compiler.executable_schema(&compiled)?;
//! ```
//!
//! ## Modules
//!
//! - [`options`] - Generation options and their cascading resolution
//! - [`model`] - Data-model description
//! - [`schema`] - Type graphs, operation signatures, SDL documents and the
//!   executable mount
//! - [`documents`] - Fragments and operation documents
//! - [`resolvers`] - Query, mutation and type-field resolvers
//! - [`context`] - Request-scoped resolver context
//! - [`config`] - Project files
//! - [`error`] - Error types

pub mod compiler;
pub mod config;
pub mod context;
pub mod documents;
pub mod error;
pub mod model;
pub mod options;
pub mod resolvers;
pub mod scalars;
pub mod schema;

// Re-export main types
pub use compiler::{CompiledResource, CompiledSchema, Compiler};
pub use config::{OutputConfig, OutputFormat, ProjectConfig};
pub use context::{RequestContext, RequestContextBuilder};
pub use documents::{FragmentSet, OperationDocument};
pub use error::{CompileError, ReportedError, ResolveError};
pub use model::{FieldSpec, FragmentSelection, ResourceSchema, SchemaNode};
pub use options::GenerationConfig;
pub use resolvers::{MutationOutcome, ResolverTable};
pub use scalars::ScalarRegistry;
pub use schema::{ExecutableSchemaBuilder, TypeDocument, TypeGraph};

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;
