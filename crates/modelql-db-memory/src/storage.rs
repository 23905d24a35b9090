use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use modelql_storage::{
    CrudBackend, DynStore, FindOptions, ID_FIELD, ModelHandle, OWNER_FIELD, ResourceStore,
    StorageError, project,
};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::query::{matches, sort_records};

/// Records of one resource keyed by id, in insertion order.
type Collection = IndexMap<String, Value>;

/// In-memory storage backend.
///
/// This storage implementation provides:
/// - One insertion-ordered collection per resource
/// - Owner stamping on create and owner checks on update / delete
/// - Uniqueness constraints taken from the [`ModelHandle`]
/// - Filtered, sorted and paginated reads through [`ResourceStore`] views
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<RwLock<IndexMap<String, Collection>>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a read view over one resource's collection.
    pub fn store(&self, resource: impl Into<String>) -> DynStore {
        Arc::new(CollectionStore {
            resource: resource.into(),
            collections: Arc::clone(&self.collections),
        })
    }

    /// Inserts a record as-is, bypassing ownership and uniqueness checks.
    ///
    /// The record must carry a string `id`.
    pub async fn insert(&self, resource: &str, record: Value) -> Result<(), StorageError> {
        let id = record_id(&record)?.to_string();
        let mut guard = self.collections.write().await;
        guard
            .entry(resource.to_string())
            .or_default()
            .insert(id, record);
        Ok(())
    }

    /// Returns the number of records stored for `resource`.
    pub async fn len(&self, resource: &str) -> usize {
        let guard = self.collections.read().await;
        guard.get(resource).map_or(0, IndexMap::len)
    }

    /// Returns `true` if no record is stored for `resource`.
    pub async fn is_empty(&self, resource: &str) -> bool {
        self.len(resource).await == 0
    }
}

fn record_id(record: &Value) -> Result<&str, StorageError> {
    record
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| StorageError::invalid_record("record is missing a string `id`"))
}

fn check_owner(resource: &str, id: &str, record: &Value, caller: &str) -> Result<(), StorageError> {
    match record.get(OWNER_FIELD).and_then(Value::as_str) {
        Some(owner) if owner == caller => Ok(()),
        _ => Err(StorageError::not_owner(resource, id)),
    }
}

/// Rejects `candidate` if another record already holds one of its unique values.
fn check_unique(
    model: &ModelHandle,
    collection: Option<&Collection>,
    candidate: &Value,
    own_id: &str,
) -> Result<(), StorageError> {
    let Some(collection) = collection else {
        return Ok(());
    };
    for field in &model.unique {
        let Some(value) = candidate.get(field).filter(|v| !v.is_null()) else {
            continue;
        };
        let clash = collection
            .iter()
            .any(|(id, existing)| id != own_id && existing.get(field) == Some(value));
        if clash {
            return Err(StorageError::already_exists(
                &model.resource,
                field,
                value.to_string(),
            ));
        }
    }
    Ok(())
}

#[async_trait]
impl CrudBackend for InMemoryStore {
    async fn create(
        &self,
        model: &ModelHandle,
        payload: Value,
        caller: &str,
    ) -> Result<Value, StorageError> {
        let Value::Object(mut fields) = payload else {
            return Err(StorageError::invalid_record("payload must be an object"));
        };
        let id = match fields.get(ID_FIELD).and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };
        fields.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        fields.insert(OWNER_FIELD.to_string(), Value::String(caller.to_string()));
        let record = Value::Object(fields);

        let mut guard = self.collections.write().await;
        if guard
            .get(&model.resource)
            .is_some_and(|collection| collection.contains_key(&id))
        {
            return Err(StorageError::already_exists(&model.resource, ID_FIELD, id));
        }
        check_unique(model, guard.get(&model.resource), &record, &id)?;
        guard
            .entry(model.resource.clone())
            .or_default()
            .insert(id.clone(), record.clone());

        debug!(resource = %model.resource, id = %id, "Record created");
        Ok(record)
    }

    async fn update(
        &self,
        model: &ModelHandle,
        payload: Value,
        caller: &str,
    ) -> Result<Value, StorageError> {
        let Value::Object(changes) = payload else {
            return Err(StorageError::invalid_record("payload must be an object"));
        };
        let id = changes
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| StorageError::invalid_record("update payload is missing `id`"))?
            .to_string();

        let mut guard = self.collections.write().await;
        let existing = guard
            .get(&model.resource)
            .and_then(|collection| collection.get(&id))
            .ok_or_else(|| StorageError::not_found(&model.resource, &id))?;
        check_owner(&model.resource, &id, existing, caller)?;

        let mut updated = existing.clone();
        if let Value::Object(target) = &mut updated {
            for (key, value) in changes {
                if key == OWNER_FIELD {
                    continue;
                }
                target.insert(key, value);
            }
        }
        check_unique(model, guard.get(&model.resource), &updated, &id)?;
        guard
            .entry(model.resource.clone())
            .or_default()
            .insert(id.clone(), updated.clone());

        debug!(resource = %model.resource, id = %id, "Record updated");
        Ok(updated)
    }

    async fn delete(
        &self,
        model: &ModelHandle,
        id: &str,
        caller: &str,
    ) -> Result<Value, StorageError> {
        let mut guard = self.collections.write().await;
        let collection = guard
            .get_mut(&model.resource)
            .ok_or_else(|| StorageError::not_found(&model.resource, id))?;
        let existing = collection
            .get(id)
            .ok_or_else(|| StorageError::not_found(&model.resource, id))?;
        check_owner(&model.resource, id, existing, caller)?;
        let removed = collection
            .shift_remove(id)
            .ok_or_else(|| StorageError::not_found(&model.resource, id))?;

        debug!(resource = %model.resource, id = %id, "Record deleted");
        Ok(removed)
    }
}

/// Read view over one collection of an [`InMemoryStore`].
#[derive(Debug)]
struct CollectionStore {
    resource: String,
    collections: Arc<RwLock<IndexMap<String, Collection>>>,
}

#[async_trait]
impl ResourceStore for CollectionStore {
    fn resource(&self) -> &str {
        &self.resource
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Value>, StorageError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&self.resource)
            .and_then(|collection| collection.get(id))
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Option<Value>>, StorageError> {
        let guard = self.collections.read().await;
        let collection = guard.get(&self.resource);
        Ok(ids
            .iter()
            .map(|id| collection.and_then(|c| c.get(id)).cloned())
            .collect())
    }

    async fn find(
        &self,
        filter: &Value,
        options: &FindOptions,
    ) -> Result<Vec<Value>, StorageError> {
        let guard = self.collections.read().await;
        let mut found: Vec<Value> = guard
            .get(&self.resource)
            .map(|collection| {
                collection
                    .values()
                    .filter(|record| matches(filter, record))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(guard);

        sort_records(&mut found, &options.sort);
        let skip = options.skip.unwrap_or(0);
        let limit = options.limit.unwrap_or(usize::MAX);
        let page = found.into_iter().skip(skip).take(limit);
        let page: Vec<Value> = match &options.projection {
            Some(fields) => page.map(|record| project(&record, fields)).collect(),
            None => page.collect(),
        };

        trace!(resource = %self.resource, count = page.len(), "Find completed");
        Ok(page)
    }

    async fn count(&self, filter: &Value) -> Result<u64, StorageError> {
        let guard = self.collections.read().await;
        let count = guard.get(&self.resource).map_or(0, |collection| {
            collection
                .values()
                .filter(|record| matches(filter, record))
                .count()
        });
        Ok(count as u64)
    }
}
