//! Request-scoped resolver context.
//!
//! Resolvers reach their collaborators through a [`RequestContext`]: one
//! read store per resource, the CRUD backend and the caller identity. It is
//! built per request and inserted into the executable schema's request data.
//!
//! # Example
//!
//! ```ignore
//! use modelql_graphql::RequestContext;
//!
//! let context = RequestContext::builder()
//!     .with_store("User", memory.store("User"))
//!     .with_crud(Arc::new(memory.clone()))
//!     .with_caller(Some("user-1".to_string()))
//!     .with_request_id("req-123")
//!     .build()?;
//! ```

use indexmap::IndexMap;
use modelql_storage::{DynCrud, DynStore};

use crate::error::ResolveError;

/// Collaborators and caller identity for one request.
#[derive(Clone)]
pub struct RequestContext {
    /// Identifier of the caller; `None` for anonymous requests.
    pub caller_id: Option<String>,

    /// Read stores keyed by resource name.
    pub stores: IndexMap<String, DynStore>,

    /// Backend used by mutation resolvers.
    pub crud: DynCrud,

    /// Request ID for tracing and correlation.
    pub request_id: String,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("caller_id", &self.caller_id)
            .field("stores", &self.stores.keys().collect::<Vec<_>>())
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

impl RequestContext {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::default()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.caller_id.is_some()
    }

    /// Returns the caller identity.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Unauthenticated`] for anonymous requests.
    pub fn caller(&self) -> Result<&str, ResolveError> {
        self.caller_id
            .as_deref()
            .ok_or_else(|| ResolveError::Unauthenticated("caller identity required".into()))
    }

    /// Returns the store of `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Internal`] if no store is registered.
    pub fn store(&self, resource: &str) -> Result<&DynStore, ResolveError> {
        self.stores
            .get(resource)
            .ok_or_else(|| ResolveError::Internal(format!("no store registered for {resource}")))
    }
}

/// Builder for [`RequestContext`].
#[derive(Default)]
pub struct RequestContextBuilder {
    caller_id: Option<String>,
    stores: IndexMap<String, DynStore>,
    crud: Option<DynCrud>,
    request_id: Option<String>,
}

impl RequestContextBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the read store of `resource`.
    #[must_use]
    pub fn with_store(mut self, resource: impl Into<String>, store: DynStore) -> Self {
        self.stores.insert(resource.into(), store);
        self
    }

    /// Sets the CRUD backend.
    #[must_use]
    pub fn with_crud(mut self, crud: DynCrud) -> Self {
        self.crud = Some(crud);
        self
    }

    /// Sets the caller identity.
    #[must_use]
    pub fn with_caller(mut self, caller: Option<String>) -> Self {
        self.caller_id = caller;
        self
    }

    /// Sets the request ID.
    #[must_use]
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Builds the context.
    ///
    /// # Errors
    ///
    /// Returns an error if the CRUD backend or request ID is missing.
    pub fn build(self) -> Result<RequestContext, ContextBuilderError> {
        let crud = self.crud.ok_or(ContextBuilderError::MissingField("crud"))?;
        let request_id = self
            .request_id
            .ok_or(ContextBuilderError::MissingField("request_id"))?;
        Ok(RequestContext {
            caller_id: self.caller_id,
            stores: self.stores,
            crud,
            request_id,
        })
    }
}

/// Errors that can occur when building a [`RequestContext`].
#[derive(Debug, thiserror::Error)]
pub enum ContextBuilderError {
    /// A required field was not provided.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use modelql_db_memory::InMemoryStore;

    use super::*;

    #[test]
    fn test_builder_missing_crud() {
        let result = RequestContextBuilder::new().with_request_id("req-1").build();
        assert!(matches!(result, Err(ContextBuilderError::MissingField("crud"))));
    }

    #[test]
    fn test_builder_missing_request_id() {
        let result = RequestContext::builder()
            .with_crud(Arc::new(InMemoryStore::new()))
            .build();
        assert!(matches!(
            result,
            Err(ContextBuilderError::MissingField("request_id"))
        ));
    }

    #[test]
    fn test_caller_and_store_lookup() {
        let memory = InMemoryStore::new();
        let context = RequestContext::builder()
            .with_store("User", memory.store("User"))
            .with_crud(Arc::new(memory))
            .with_request_id("req-1")
            .build()
            .unwrap();

        assert!(!context.is_authenticated());
        assert_eq!(context.caller().unwrap_err().error_code(), "UNAUTHENTICATED");
        assert!(context.store("User").is_ok());
        match context.store("Post") {
            Err(err) => assert_eq!(err.error_code(), "INTERNAL_ERROR"),
            Ok(_) => panic!("store lookup for an unregistered resource succeeded"),
        }
    }
}
