//! Mutation resolvers.
//!
//! Mutations delegate to the context's [`CrudBackend`](modelql_storage::CrudBackend),
//! one call per item. Ownership, not-found and uniqueness failures are
//! reported per item in [`MutationOutcome::errors`] while the remaining
//! items proceed. A custom-scalar validation failure rejects the whole
//! mutation before any item is written.

use modelql_storage::{ModelHandle, StorageError};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::RequestContext;
use crate::error::{ReportedError, ResolveError};
use crate::options::{MutationAction, MutationTarget};
use crate::scalars::ScalarRegistry;

/// A custom scalar found in a mutation input, by field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarCheck {
    pub path: Vec<String>,
    pub scalar: String,
}

impl ScalarCheck {
    /// Values at the check's path; list levels are walked transparently.
    fn values<'a>(&self, item: &'a Value) -> Vec<&'a Value> {
        let mut found = Vec::new();
        collect(item, &self.path, &mut found);
        found
    }
}

fn collect<'a>(value: &'a Value, path: &[String], found: &mut Vec<&'a Value>) {
    if let Value::Array(items) = value {
        for item in items {
            collect(item, path, found);
        }
        return;
    }
    match path.split_first() {
        None => found.push(value),
        Some((head, rest)) => {
            if let Some(next) = value.get(head) {
                collect(next, rest, found);
            }
        }
    }
}

/// Result of a mutation: data plus non-fatal per-item errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationOutcome {
    /// A record (or `null`) for single targets, a list for multi targets.
    pub data: Value,
    pub errors: Vec<ReportedError>,
}

impl MutationOutcome {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Resolver of one generated mutation field.
#[derive(Debug, Clone)]
pub struct MutationResolver {
    pub model: ModelHandle,
    pub action: MutationAction,
    pub target: MutationTarget,
    pub checks: Vec<ScalarCheck>,
    scalars: ScalarRegistry,
}

impl MutationResolver {
    #[must_use]
    pub fn new(
        model: ModelHandle,
        action: MutationAction,
        target: MutationTarget,
        checks: Vec<ScalarCheck>,
        scalars: ScalarRegistry,
    ) -> Self {
        Self {
            model,
            action,
            target,
            checks,
            scalars,
        }
    }

    fn argument(&self) -> &'static str {
        match (self.action, self.target) {
            (MutationAction::Delete, MutationTarget::Single) => "id",
            (MutationAction::Delete, MutationTarget::Multi) => "ids",
            _ => "data",
        }
    }

    fn items(&self, args: &Value) -> Result<Vec<Value>, ResolveError> {
        let name = self.argument();
        let value = args
            .get(name)
            .filter(|value| !value.is_null())
            .ok_or_else(|| ResolveError::BadArgument(format!("{name} is required")))?;
        match (self.target, value) {
            (MutationTarget::Single, item) => Ok(vec![item.clone()]),
            (MutationTarget::Multi, Value::Array(items)) => Ok(items.clone()),
            (MutationTarget::Multi, _) => {
                Err(ResolveError::BadArgument(format!("{name} must be a list")))
            }
        }
    }

    /// Checks every item against the registered scalar predicates.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Validation`] for the first failing value.
    pub fn validate(&self, items: &[Value]) -> Result<(), ResolveError> {
        for (index, item) in items.iter().enumerate() {
            for check in &self.checks {
                for value in check.values(item) {
                    if !self.scalars.validate(&check.scalar, value) {
                        return Err(ResolveError::Validation(format!(
                            "item {index}: {} is not a valid {}",
                            check.path.join("."),
                            check.scalar
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    async fn apply(
        &self,
        ctx: &RequestContext,
        item: Value,
        caller: &str,
    ) -> Result<Value, StorageError> {
        match self.action {
            MutationAction::Create => ctx.crud.create(&self.model, item, caller).await,
            MutationAction::Update => ctx.crud.update(&self.model, item, caller).await,
            MutationAction::Delete => {
                let id = item
                    .as_str()
                    .ok_or_else(|| StorageError::invalid_record("id must be a string"))?;
                ctx.crud.delete(&self.model, id, caller).await
            }
        }
    }

    /// Runs the mutation.
    ///
    /// # Errors
    ///
    /// Returns an error for a missing caller, malformed arguments, a failed
    /// scalar validation or a storage failure other than an ownership,
    /// not-found or uniqueness failure.
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        args: &Value,
    ) -> Result<MutationOutcome, ResolveError> {
        let caller = ctx.caller()?;
        let items = self.items(args)?;
        if self.action != MutationAction::Delete {
            self.validate(&items)?;
        }
        debug!(
            resource = %self.model.resource,
            action = self.action.key(),
            items = items.len(),
            request_id = %ctx.request_id,
            "Resolving mutation"
        );

        let mut data = Vec::with_capacity(items.len());
        let mut errors = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            match self.apply(ctx, item, caller).await {
                Ok(record) => data.push(record),
                Err(err) if is_reportable(&err) => {
                    warn!(resource = %self.model.resource, index, error = %err, "Mutation item failed");
                    errors.push(ReportedError::new(index, &ResolveError::from(err)));
                    data.push(Value::Null);
                }
                Err(err) => return Err(err.into()),
            }
        }

        let data = match self.target {
            MutationTarget::Single => data.into_iter().next().unwrap_or(Value::Null),
            MutationTarget::Multi => Value::Array(data),
        };
        Ok(MutationOutcome { data, errors })
    }
}

fn is_reportable(err: &StorageError) -> bool {
    err.is_not_owner() || err.is_not_found() || err.is_already_exists()
}
