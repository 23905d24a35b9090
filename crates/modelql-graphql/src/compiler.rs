//! Compilation entry points.
//!
//! A [`Compiler`] holds the resolved global generation options and the
//! scalar registry. Each call to [`Compiler::compile`] or
//! [`Compiler::compile_all`] is an independent run that owns its graphs and
//! documents.

use std::collections::HashSet;

use async_graphql::dynamic::Schema;
use modelql_storage::ModelHandle;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::documents::{
    FragmentGenerator, FragmentSet, OperationDocument, OperationDocumentGenerator, render_documents,
};
use crate::error::CompileError;
use crate::model::ResourceSchema;
use crate::options::GenerationConfig;
use crate::resolvers::{ResolverSynthesizer, ResolverTable, ResourceResolvers};
use crate::scalars::ScalarRegistry;
use crate::schema::{
    ExecutableSchemaBuilder, FieldNodeKind, OperationSchema, OperationSchemaSynthesizer,
    TypeDocument, TypeGraph, TypeSynthesizer,
};

/// Output of a single-resource run.
#[derive(Debug, Clone)]
pub struct CompiledResource {
    pub graph: TypeGraph,
    pub operations: OperationSchema,
    /// Initial definitions followed by the resource's definitions and
    /// support types.
    pub type_document: TypeDocument,
    pub fragments: FragmentSet,
    pub operation_documents: Vec<OperationDocument>,
    pub resolvers: ResourceResolvers,
}

/// Output of a multi-resource run.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub type_document: TypeDocument,
    /// Rendered `type_document`.
    pub sdl: String,
    pub fragments: FragmentSet,
    pub operation_documents: Vec<OperationDocument>,
    pub resolver_table: ResolverTable,
}

impl CompiledSchema {
    /// Operation documents rendered as one text, fragments included per
    /// document.
    #[must_use]
    pub fn operations_source(&self) -> String {
        render_documents(&self.operation_documents)
    }
}

/// Per-resource intermediate state of a run.
struct Stage<'s> {
    schema: &'s ResourceSchema,
    config: GenerationConfig,
    graph: TypeGraph,
}

/// Schema compiler.
///
/// # Example
///
/// ```ignore
/// let compiler = Compiler::new(json!({"query": {"paginated": false}}), ScalarRegistry::with_defaults())?;
/// let compiled = compiler.compile_all(&schemas, None)?;
/// println!("{}", compiled.sdl);
/// ```
#[derive(Debug, Clone)]
pub struct Compiler {
    global: GenerationConfig,
    scalars: ScalarRegistry,
}

impl Compiler {
    /// Creates a compiler from a global option partial.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidConfig`] if the partial is malformed.
    pub fn new(global_partial: Value, scalars: ScalarRegistry) -> Result<Self, CompileError> {
        let global = GenerationConfig::from_partial(&global_partial)?;
        Ok(Self { global, scalars })
    }

    #[must_use]
    pub fn global_config(&self) -> &GenerationConfig {
        &self.global
    }

    #[must_use]
    pub fn scalars(&self) -> &ScalarRegistry {
        &self.scalars
    }

    /// Compiles one resource.
    ///
    /// # Errors
    ///
    /// Returns configuration errors before synthesis begins, then synthesis
    /// errors.
    pub fn compile(
        &self,
        schema: &ResourceSchema,
        initial: Option<&TypeDocument>,
    ) -> Result<CompiledResource, CompileError> {
        if schema.resource.trim().is_empty() {
            return Err(CompileError::MissingResource { index: 0 });
        }
        let mut stages = vec![self.stage(schema, initial)?];
        retarget_dangling(&mut stages, initial);

        let Some(stage) = stages.pop() else {
            return Err(CompileError::EmptySchemaSet);
        };
        let operations = self.operations(&stage);
        let resolvers = self.resolvers(&stage, &operations);

        let mut type_document = initial.cloned().unwrap_or_default();
        type_document.append(TypeDocument::from_resource(&stage.graph, &operations));
        self.append_support(&mut type_document);

        let fragments = FragmentGenerator::new().generate(&[&stage.graph]);
        let operation_documents =
            OperationDocumentGenerator::new(&fragments).generate(operations.signatures());

        Ok(CompiledResource {
            graph: stage.graph,
            operations,
            type_document,
            fragments,
            operation_documents,
            resolvers,
        })
    }

    /// Compiles a set of resources into one schema.
    ///
    /// Resources are processed sequentially in input order. Fragments are
    /// generated over every graph together so cross-resource references
    /// spread their targets' fragments.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::EmptySchemaSet`], [`CompileError::MissingResource`]
    /// or [`CompileError::DuplicateResource`] before synthesis begins, then
    /// synthesis errors.
    pub fn compile_all(
        &self,
        schemas: &[ResourceSchema],
        initial: Option<&TypeDocument>,
    ) -> Result<CompiledSchema, CompileError> {
        validate_schemas(schemas)?;
        info!(resources = schemas.len(), "Compiling schema set");

        let mut stages = schemas
            .iter()
            .map(|schema| self.stage(schema, initial))
            .collect::<Result<Vec<_>, _>>()?;
        retarget_dangling(&mut stages, initial);

        let mut type_document = initial.cloned().unwrap_or_default();
        let mut resolver_table = ResolverTable::new();
        let mut all_operations = Vec::with_capacity(stages.len());
        for stage in &stages {
            let operations = self.operations(stage);
            type_document.append(TypeDocument::from_resource(&stage.graph, &operations));
            resolver_table.insert(&stage.schema.resource, self.resolvers(stage, &operations));
            all_operations.push(operations);
        }
        self.append_support(&mut type_document);

        let graphs: Vec<&TypeGraph> = stages.iter().map(|stage| &stage.graph).collect();
        let fragments = FragmentGenerator::new().generate(&graphs);
        let generator = OperationDocumentGenerator::new(&fragments);
        let operation_documents = all_operations
            .iter()
            .flat_map(|operations| generator.generate(operations.signatures()))
            .collect::<Vec<_>>();

        let sdl = type_document.to_sdl();
        info!(
            definitions = type_document.len(),
            fragments = fragments.len(),
            operations = operation_documents.len(),
            "Schema set compiled"
        );
        Ok(CompiledSchema {
            type_document,
            sdl,
            fragments,
            operation_documents,
            resolver_table,
        })
    }

    /// Mounts a compiled schema set onto an executable async-graphql schema.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::SchemaBuildFailed`] if the schema is rejected.
    pub fn executable_schema(&self, compiled: &CompiledSchema) -> Result<Schema, CompileError> {
        ExecutableSchemaBuilder::new(
            &compiled.type_document,
            compiled.resolver_table.clone(),
            &self.scalars,
        )
        .build()
    }

    fn stage<'s>(
        &self,
        schema: &'s ResourceSchema,
        initial: Option<&TypeDocument>,
    ) -> Result<Stage<'s>, CompileError> {
        let partial = schema.node.generate.clone().unwrap_or(Value::Null);
        let config = GenerationConfig::resolve(&partial, &self.global)?;
        let graph = TypeSynthesizer::new(&self.scalars).synthesize(
            schema,
            &config,
            initial.map(TypeDocument::existing_fields),
        )?;
        Ok(Stage {
            schema,
            config,
            graph,
        })
    }

    fn operations(&self, stage: &Stage<'_>) -> OperationSchema {
        OperationSchemaSynthesizer::new(
            &stage.schema.resource,
            stage.schema.plural_name(),
            &stage.schema.operation_names,
        )
        .synthesize(&stage.config.query, &stage.config.mutation, &stage.graph)
    }

    fn resolvers(&self, stage: &Stage<'_>, operations: &OperationSchema) -> ResourceResolvers {
        let model = ModelHandle::new(&stage.schema.resource).with_unique(stage.schema.unique.iter().cloned());
        ResolverSynthesizer::new(&self.scalars).synthesize(&stage.graph, operations, &model)
    }

    fn append_support(&self, document: &mut TypeDocument) {
        for definition in document.support_definitions(&self.scalars) {
            document.push(definition);
        }
        document.promote_root_extensions();
    }
}

/// Rejects empty sets, unnamed and duplicate resources.
fn validate_schemas(schemas: &[ResourceSchema]) -> Result<(), CompileError> {
    if schemas.is_empty() {
        return Err(CompileError::EmptySchemaSet);
    }
    let mut seen = HashSet::new();
    for (index, schema) in schemas.iter().enumerate() {
        if schema.resource.trim().is_empty() {
            return Err(CompileError::MissingResource { index });
        }
        if !seen.insert(schema.resource.as_str()) {
            return Err(CompileError::DuplicateResource {
                resource: schema.resource.clone(),
            });
        }
    }
    Ok(())
}

/// Points reference fields whose target object exists nowhere in the run
/// at `ID`.
fn retarget_dangling(stages: &mut [Stage<'_>], initial: Option<&TypeDocument>) {
    let mut known: HashSet<String> = stages
        .iter()
        .flat_map(|stage| stage.graph.definitions().map(|node| node.name.clone()))
        .collect();
    if let Some(initial) = initial {
        known.extend(initial.defined_types().into_iter().map(str::to_string));
    }
    for stage in stages.iter_mut() {
        for field in stage.graph.fields_mut() {
            if field.kind == FieldNodeKind::Reference && !known.contains(&field.type_name) {
                warn!(
                    resource = %stage.schema.resource,
                    field = %field.name,
                    target = %field.type_name,
                    "Reference target not in run, exposing identifier"
                );
                field.retarget("ID", FieldNodeKind::Scalar);
            }
        }
    }
    debug!(known_types = known.len(), "Reference targets checked");
}
