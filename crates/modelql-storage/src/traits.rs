//! Storage traits consumed by synthesized resolvers.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;
use crate::types::{FindOptions, ModelHandle};

/// Read access to the records of one resource.
///
/// Resolvers reach a store through the request context, keyed by resource
/// name. Filters are MongoDB-style JSON documents.
///
/// # Example
///
/// ```ignore
/// use modelql_storage::{FindOptions, ResourceStore};
///
/// async fn first_page(store: &dyn ResourceStore) -> Result<Vec<Value>, StorageError> {
///     store
///         .find(&json!({"owner": "u1"}), &FindOptions::new().with_limit(10))
///         .await
/// }
/// ```
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Returns the resource name this store serves.
    fn resource(&self) -> &str;

    /// Reads a record by identifier.
    ///
    /// Returns `None` if the record does not exist.
    async fn find_by_id(&self, id: &str) -> Result<Option<Value>, StorageError>;

    /// Reads several records by identifier.
    ///
    /// The result has one entry per requested id, in request order; missing
    /// records are `None`.
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Option<Value>>, StorageError> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            found.push(self.find_by_id(id).await?);
        }
        Ok(found)
    }

    /// Returns the records matching `filter`.
    async fn find(&self, filter: &Value, options: &FindOptions)
    -> Result<Vec<Value>, StorageError>;

    /// Counts the records matching `filter`.
    async fn count(&self, filter: &Value) -> Result<u64, StorageError>;
}

/// Write access used by mutation resolvers.
///
/// Each call handles exactly one record; multi-target mutations call the
/// backend once per item. Ownership failures are returned as
/// [`StorageError::NotOwner`].
#[async_trait]
pub trait CrudBackend: Send + Sync {
    /// Creates a record owned by `caller`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` on a uniqueness violation.
    async fn create(
        &self,
        model: &ModelHandle,
        payload: Value,
        caller: &str,
    ) -> Result<Value, StorageError>;

    /// Updates the record identified by the payload's `id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record does not exist and
    /// `StorageError::NotOwner` if `caller` does not own it.
    async fn update(
        &self,
        model: &ModelHandle,
        payload: Value,
        caller: &str,
    ) -> Result<Value, StorageError>;

    /// Deletes the record `id` and returns it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record does not exist and
    /// `StorageError::NotOwner` if `caller` does not own it.
    async fn delete(
        &self,
        model: &ModelHandle,
        id: &str,
        caller: &str,
    ) -> Result<Value, StorageError>;
}
