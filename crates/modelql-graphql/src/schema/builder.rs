//! Executable schema builder.
//!
//! Mounts a compiled type document and its resolver table onto an
//! async-graphql dynamic schema. Resolvers read the per-request
//! [`RequestContext`] from the request data:
//!
//! ```ignore
//! let schema = ExecutableSchemaBuilder::new(&compiled.type_document, table, &scalars).build()?;
//! let response = schema
//!     .execute(async_graphql::Request::new(query).data(request_context))
//!     .await;
//! ```
//!
//! Interfaces stay SDL-only: no synthesized object implements them.
//!
//! A null item of an object list (a failed entry of a multi-target
//! mutation, a dangling reference) is still resolved field by field by the
//! executor. Every field of such an item fails with a marked error, which
//! leaves the item null, and `NullListItems` removes those errors from the
//! response.

use std::collections::HashSet;
use std::sync::Arc;

use async_graphql::dynamic::{
    Enum, Field, FieldFuture, FieldValue, InputObject, InputValue, Object, ResolverContext,
    Scalar, Schema, SchemaBuilder, TypeRef, Union,
};
use async_graphql::extensions::{Extension, ExtensionContext, ExtensionFactory, NextRequest};
use async_graphql::{ErrorExtensions, Response, ServerError};
use async_graphql_value::{ConstValue as Value, Name};
use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use super::decorate::parse_decorated;
use super::document::{Definition, DefinitionKind, FieldDefinition, TypeDocument};
use crate::context::RequestContext;
use crate::error::{CompileError, ReportedError, ResolveError};
use crate::resolvers::{FieldResolver, ResolverTable};
use crate::scalars::{BUILTIN_SCALARS, NON_NEGATIVE_INT_SCALAR, ScalarRegistry};

const QUERY: &str = "Query";
const MUTATION: &str = "Mutation";

/// Placeholder field for a root with nothing to mount.
const EMPTY_QUERY_FIELD: &str = "_empty";

/// Error extension marking a field read off a null list item.
const NULL_ITEM: &str = "nullListItem";

/// Builds an executable schema from a compiled run.
pub struct ExecutableSchemaBuilder<'a> {
    document: &'a TypeDocument,
    resolvers: Arc<ResolverTable>,
    scalars: &'a ScalarRegistry,
}

impl<'a> ExecutableSchemaBuilder<'a> {
    #[must_use]
    pub fn new(
        document: &'a TypeDocument,
        resolvers: impl Into<Arc<ResolverTable>>,
        scalars: &'a ScalarRegistry,
    ) -> Self {
        Self {
            document,
            resolvers: resolvers.into(),
            scalars,
        }
    }

    /// Builds the schema.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::SchemaBuildFailed`] if async-graphql rejects
    /// the assembled schema, or [`CompileError::InvalidDocument`] for a
    /// malformed type reference.
    pub fn build(&self) -> Result<Schema, CompileError> {
        debug!("Starting executable schema build");
        let merged = merge(self.document);
        let has_mutation = merged.get(MUTATION).is_some_and(|d| !d.fields.is_empty());
        let mut builder =
            Schema::build(QUERY, has_mutation.then_some(MUTATION), None).extension(NullListItems);
        let enums: HashSet<String> = merged
            .values()
            .filter(|definition| definition.kind == DefinitionKind::Enum)
            .map(|definition| definition.name.clone())
            .collect();

        for definition in merged.values() {
            builder = match definition.kind {
                DefinitionKind::Scalar => self.register_scalar(builder, definition),
                DefinitionKind::Enum => builder.register(
                    Enum::new(&definition.name).items(definition.values.iter().map(String::as_str)),
                ),
                DefinitionKind::Union => {
                    let union = definition
                        .members
                        .iter()
                        .fold(Union::new(&definition.name), |union, member| {
                            union.possible_type(member)
                        });
                    builder.register(union)
                }
                DefinitionKind::InputObject => builder.register(input_object(definition)?),
                DefinitionKind::Interface => {
                    trace!(type_name = %definition.name, "Skipping interface");
                    builder
                }
                DefinitionKind::Object if definition.name == QUERY => {
                    builder.register(self.root(definition, RootKind::Query)?)
                }
                DefinitionKind::Object if definition.name == MUTATION => {
                    if has_mutation {
                        builder.register(self.root(definition, RootKind::Mutation)?)
                    } else {
                        builder
                    }
                }
                DefinitionKind::Object => builder.register(self.object(definition, &enums)?),
            };
        }
        if !merged.contains_key(QUERY) {
            builder = builder.register(self.root(&Definition::new(QUERY, DefinitionKind::Object), RootKind::Query)?);
        }

        let schema = builder
            .finish()
            .map_err(|e| CompileError::SchemaBuildFailed(e.to_string()))?;
        debug!(types = merged.len(), "Executable schema build complete");
        Ok(schema)
    }

    fn register_scalar(&self, builder: SchemaBuilder, definition: &Definition) -> SchemaBuilder {
        if BUILTIN_SCALARS.contains(&definition.name.as_str()) {
            return builder;
        }
        let mut scalar = Scalar::new(&definition.name);
        if let Some(description) = &definition.description {
            scalar = scalar.description(description);
        }
        // Null reaches validators only as an item of a nullable list.
        if definition.name == NON_NEGATIVE_INT_SCALAR {
            scalar = scalar.validator(|value| match value {
                Value::Number(n) => n.as_u64().is_some(),
                Value::Null => true,
                _ => false,
            });
        } else if let Some(validator) = self.scalars.validator(&definition.name) {
            scalar = scalar.validator(move |value| {
                matches!(value, Value::Null)
                    || value
                        .clone()
                        .into_json()
                        .is_ok_and(|json| validator(&json))
            });
        }
        builder.register(scalar)
    }

    fn object(&self, definition: &Definition, enums: &HashSet<String>) -> Result<Object, CompileError> {
        let mut object = Object::new(&definition.name);
        if let Some(description) = &definition.description {
            object = object.description(description);
        }
        for field in &definition.fields {
            let resolver = self.resolvers.field(&definition.name, &field.name).cloned();
            let name = field.name.clone();
            let is_enum = enums.contains(&field.named_type());
            let mut built = match resolver {
                Some(resolver @ FieldResolver::Reference { .. }) => {
                    let resolver = Arc::new(resolver);
                    Field::new(&field.name, type_ref(&field.ty)?, move |ctx| {
                        let resolver = Arc::clone(&resolver);
                        let name = name.clone();
                        FieldFuture::new(async move {
                            let parent = match ctx.parent_value.as_value() {
                                Some(Value::Null) | None => return Err(null_item()),
                                Some(parent) => parent.clone().into_json()?,
                            };
                            let request = request_context(&ctx)?;
                            let value = resolver
                                .resolve(request, &parent, &name)
                                .await
                                .map_err(|e| to_graphql_error(&e))?;
                            to_field_value(Value::from_json(value)?)
                        })
                    })
                }
                _ => Field::new(&field.name, type_ref(&field.ty)?, move |ctx| {
                    let name = name.clone();
                    FieldFuture::new(async move {
                        let value = match ctx.parent_value.as_value() {
                            Some(Value::Object(map)) => {
                                map.get(name.as_str()).cloned().unwrap_or(Value::Null)
                            }
                            Some(Value::Null) | None => return Err(null_item()),
                            Some(_) => Value::Null,
                        };
                        to_field_value(if is_enum { enum_value(value) } else { value })
                    })
                }),
            };
            if let Some(description) = &field.description {
                built = built.description(description);
            }
            object = object.field(with_arguments(built, field)?);
        }
        Ok(object)
    }

    fn root(&self, definition: &Definition, kind: RootKind) -> Result<Object, CompileError> {
        let mut object = Object::new(&definition.name);
        let mut mounted = 0;
        for field in &definition.fields {
            let name = field.name.clone();
            let built = match kind {
                RootKind::Query => {
                    let Some(resolver) = self.resolvers.query(&field.name).cloned() else {
                        warn!(field = %field.name, "Query field without resolver, skipping");
                        continue;
                    };
                    let resolver = Arc::new(resolver);
                    Field::new(&field.name, type_ref(&field.ty)?, move |ctx| {
                        let resolver = Arc::clone(&resolver);
                        FieldFuture::new(async move {
                            let request = request_context(&ctx)?;
                            let args = arguments(&ctx)?;
                            let value = resolver
                                .resolve(request, &args)
                                .await
                                .map_err(|e| to_graphql_error(&e))?;
                            to_field_value(Value::from_json(value)?)
                        })
                    })
                }
                RootKind::Mutation => {
                    let Some(resolver) = self.resolvers.mutation(&field.name).cloned() else {
                        warn!(field = %name, "Mutation field without resolver, skipping");
                        continue;
                    };
                    let resolver = Arc::new(resolver);
                    Field::new(&field.name, type_ref(&field.ty)?, move |ctx| {
                        let resolver = Arc::clone(&resolver);
                        FieldFuture::new(async move {
                            let request = request_context(&ctx)?;
                            let args = arguments(&ctx)?;
                            let outcome = resolver
                                .resolve(request, &args)
                                .await
                                .map_err(|e| to_graphql_error(&e))?;
                            for reported in &outcome.errors {
                                ctx.ctx.add_error(
                                    reported_error(reported).into_server_error(ctx.ctx.item.pos),
                                );
                            }
                            to_field_value(Value::from_json(outcome.data)?)
                        })
                    })
                }
            };
            object = object.field(with_arguments(built, field)?);
            mounted += 1;
        }
        if mounted == 0 {
            object = object.field(Field::new(
                EMPTY_QUERY_FIELD,
                TypeRef::named(TypeRef::BOOLEAN),
                |_| FieldFuture::new(async { Ok(None::<FieldValue>) }),
            ));
        }
        Ok(object)
    }
}

#[derive(Debug, Clone, Copy)]
enum RootKind {
    Query,
    Mutation,
}

/// Folds extensions into their base definitions; first field wins.
fn merge(document: &TypeDocument) -> IndexMap<String, Definition> {
    let mut merged: IndexMap<String, Definition> = IndexMap::new();
    for definition in document.definitions() {
        match merged.get_mut(&definition.name) {
            Some(existing) => {
                for field in &definition.fields {
                    if existing.field(&field.name).is_none() {
                        existing.fields.push(field.clone());
                    }
                }
                for member in &definition.members {
                    if !existing.members.contains(member) {
                        existing.members.push(member.clone());
                    }
                }
                for value in &definition.values {
                    if !existing.values.contains(value) {
                        existing.values.push(value.clone());
                    }
                }
            }
            None => {
                let mut definition = definition.clone();
                definition.extend = false;
                merged.insert(definition.name.clone(), definition);
            }
        }
    }
    merged
}

fn input_object(definition: &Definition) -> Result<InputObject, CompileError> {
    let mut input = InputObject::new(&definition.name);
    if let Some(description) = &definition.description {
        input = input.description(description);
    }
    for field in &definition.fields {
        let mut value = InputValue::new(&field.name, type_ref(&field.ty)?);
        if let Some(description) = &field.description {
            value = value.description(description);
        }
        input = input.field(value);
    }
    Ok(input)
}

fn with_arguments(mut field: Field, definition: &FieldDefinition) -> Result<Field, CompileError> {
    for argument in &definition.arguments {
        field = field.argument(InputValue::new(&argument.name, type_ref(&argument.ty)?));
    }
    Ok(field)
}

/// Converts a decorated type string into a dynamic type reference.
fn type_ref(decorated: &str) -> Result<TypeRef, CompileError> {
    let parsed = parse_decorated(decorated)
        .ok_or_else(|| CompileError::InvalidDocument(format!("invalid type reference {decorated}")))?;
    let mut levels = parsed.nullable.iter().rev();
    let mut ty = TypeRef::Named(parsed.name.into());
    if levels.next() == Some(&false) {
        ty = TypeRef::NonNull(Box::new(ty));
    }
    for nullable in levels {
        ty = TypeRef::List(Box::new(ty));
        if !nullable {
            ty = TypeRef::NonNull(Box::new(ty));
        }
    }
    Ok(ty)
}

fn request_context<'a>(ctx: &'a ResolverContext<'_>) -> Result<&'a RequestContext, async_graphql::Error> {
    ctx.data::<RequestContext>()
        .map_err(|_| async_graphql::Error::new("Request context not available"))
}

fn arguments(ctx: &ResolverContext<'_>) -> Result<serde_json::Value, async_graphql::Error> {
    Ok(Value::Object(ctx.args.as_index_map().clone()).into_json()?)
}

/// Stored enum values are strings; the executor expects enum names.
fn enum_value(value: Value) -> Value {
    match value {
        Value::String(name) => Value::Enum(Name::new(name)),
        Value::List(items) => Value::List(items.into_iter().map(enum_value).collect()),
        other => other,
    }
}

/// Converts a resolved value, turning lists into list field values.
fn to_field_value(value: Value) -> Result<Option<FieldValue<'static>>, async_graphql::Error> {
    Ok(match value {
        Value::Null => None,
        Value::List(items) => Some(FieldValue::list(
            items
                .into_iter()
                .map(|item| to_field_value(item).map(|v| v.unwrap_or(FieldValue::NULL)))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        other => Some(FieldValue::value(other)),
    })
}

fn null_item() -> async_graphql::Error {
    async_graphql::Error::new("null list item").extend_with(|_, e| e.set(NULL_ITEM, true))
}

fn is_null_item(error: &ServerError) -> bool {
    error
        .extensions
        .as_ref()
        .is_some_and(|extensions| extensions.get(NULL_ITEM).is_some())
}

/// Drops the errors raised while resolving null items of object lists.
struct NullListItems;

impl ExtensionFactory for NullListItems {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(NullListItemsExtension)
    }
}

struct NullListItemsExtension;

#[async_trait::async_trait]
impl Extension for NullListItemsExtension {
    async fn request(&self, ctx: &ExtensionContext<'_>, next: NextRequest<'_>) -> Response {
        let mut response = next.run(ctx).await;
        response.errors.retain(|error| !is_null_item(error));
        response
    }
}

fn to_graphql_error(err: &ResolveError) -> async_graphql::Error {
    let code = err.error_code();
    async_graphql::Error::new(err.to_string()).extend_with(|_, e| e.set("code", code))
}

fn reported_error(reported: &ReportedError) -> async_graphql::Error {
    let code = reported.code;
    let index = reported.index as u64;
    async_graphql::Error::new(&reported.message).extend_with(|_, e| {
        e.set("code", code);
        e.set("index", index);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_conversion() {
        assert_eq!(type_ref("ID!").unwrap().to_string(), "ID!");
        assert_eq!(type_ref("[[T]!]").unwrap().to_string(), "[[T]!]");
        assert_eq!(type_ref("[SelfUserObject!]!").unwrap().to_string(), "[SelfUserObject!]!");
        assert!(type_ref("[").is_err());
    }

    #[test]
    fn test_merge_folds_extensions() {
        let document = TypeDocument::from_sdl(
            "type Query { a: Int }\nextend type Query { b: Int a: String }\nenum E { X }\nextend enum E { Y }",
        )
        .unwrap();
        let merged = merge(&document);
        let query = &merged["Query"];
        assert_eq!(query.fields.len(), 2);
        assert_eq!(query.field("a").unwrap().ty, "Int");
        assert_eq!(merged["E"].values, vec!["X", "Y"]);
    }

    #[test]
    fn test_enum_value() {
        let value = enum_value(Value::List(vec![Value::String("ADMIN".into()), Value::Null]));
        assert_eq!(
            value,
            Value::List(vec![Value::Enum(Name::new("ADMIN")), Value::Null])
        );
    }

    #[test]
    fn test_null_item_errors_are_marked() {
        let marked = null_item().into_server_error(Default::default());
        assert!(is_null_item(&marked));

        let reported = reported_error(&ReportedError {
            index: 1,
            code: "NOT_FOUND",
            message: "gone".into(),
        })
        .into_server_error(Default::default());
        assert!(!is_null_item(&reported));
    }

    #[test]
    fn test_to_field_value_nulls() {
        assert!(to_field_value(Value::Null).unwrap().is_none());
        assert!(to_field_value(Value::List(vec![Value::Null])).unwrap().is_some());
    }
}
