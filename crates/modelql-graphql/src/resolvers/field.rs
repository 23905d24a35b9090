//! Type-field resolvers.

use modelql_storage::ID_FIELD;
use serde_json::Value;
use tracing::trace;

use super::query::segment_allows;
use crate::context::RequestContext;
use crate::error::ResolveError;
use crate::options::AuthSegment;

/// Resolver of one field of a synthesized object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldResolver {
    /// Looks stored identifiers up in the store of `resource`, keeping the
    /// list shape. Records outside `segment` resolve to `null`.
    Reference {
        resource: String,
        segment: AuthSegment,
    },
    /// Reads the property of the parent record.
    Projection,
}

impl FieldResolver {
    /// Resolves `field` on `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the referenced store is missing or fails.
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        parent: &Value,
        field: &str,
    ) -> Result<Value, ResolveError> {
        let value = parent.get(field).cloned().unwrap_or(Value::Null);
        let Self::Reference { resource, segment } = self else {
            return Ok(value);
        };

        let mut ids = Vec::new();
        collect_ids(&value, &mut ids);
        if ids.is_empty() {
            return Ok(value);
        }
        trace!(resource = %resource, field, count = ids.len(), "Resolving reference");
        let found = ctx.store(resource)?.find_by_ids(&ids).await?;
        let caller = ctx.caller_id.as_deref();
        let mut records = found.into_iter().map(|record| {
            record
                .filter(|record| segment_allows(*segment, record, caller))
                .unwrap_or(Value::Null)
        });
        Ok(rebuild(&value, &mut records))
    }
}

/// Identifiers in `value`, depth first. Embedded records contribute their id.
fn collect_ids(value: &Value, ids: &mut Vec<String>) {
    match value {
        Value::String(id) => ids.push(id.clone()),
        Value::Object(record) => {
            if let Some(Value::String(id)) = record.get(ID_FIELD) {
                ids.push(id.clone());
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_ids(item, ids);
            }
        }
        _ => {}
    }
}

/// Replaces every identifier of `shape` with the next fetched record.
fn rebuild(shape: &Value, records: &mut impl Iterator<Item = Value>) -> Value {
    match shape {
        Value::Array(items) => Value::Array(items.iter().map(|item| rebuild(item, records)).collect()),
        Value::String(_) => records.next().unwrap_or(Value::Null),
        Value::Object(record) if matches!(record.get(ID_FIELD), Some(Value::String(_))) => {
            records.next().unwrap_or(Value::Null)
        }
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use modelql_db_memory::InMemoryStore;
    use serde_json::json;

    use super::*;

    async fn context() -> RequestContext {
        let memory = InMemoryStore::new();
        for (id, owner) in [("a", "u1"), ("b", "u2"), ("c", "u1")] {
            memory
                .insert("User", json!({"id": id, "owner": owner, "name": id.to_uppercase()}))
                .await
                .unwrap();
        }
        RequestContext::builder()
            .with_store("User", memory.store("User"))
            .with_crud(Arc::new(memory))
            .with_caller(Some("u1".into()))
            .with_request_id("req-test")
            .build()
            .unwrap()
    }

    fn reference(segment: AuthSegment) -> FieldResolver {
        FieldResolver::Reference {
            resource: "User".into(),
            segment,
        }
    }

    #[tokio::test]
    async fn test_list_reference_preserves_order() {
        let ctx = context().await;
        let parent = json!({"friends": ["c", "a", "b", "missing"]});
        let resolved = reference(AuthSegment::Mixed)
            .resolve(&ctx, &parent, "friends")
            .await
            .unwrap();
        let names: Vec<_> = resolved
            .as_array()
            .unwrap()
            .iter()
            .map(|record| record.get("name").cloned().unwrap_or(Value::Null))
            .collect();
        assert_eq!(names, vec![json!("C"), json!("A"), json!("B"), Value::Null]);
    }

    #[tokio::test]
    async fn test_nested_list_shape() {
        let ctx = context().await;
        let parent = json!({"groups": [["a"], [], ["b", "c"]]});
        let resolved = reference(AuthSegment::Mixed)
            .resolve(&ctx, &parent, "groups")
            .await
            .unwrap();
        assert_eq!(resolved[0][0]["id"], "a");
        assert_eq!(resolved[1], json!([]));
        assert_eq!(resolved[2][1]["id"], "c");
    }

    #[tokio::test]
    async fn test_segment_filtering() {
        let ctx = context().await;
        let parent = json!({"friends": ["a", "b"]});
        let own = reference(AuthSegment::Owned)
            .resolve(&ctx, &parent, "friends")
            .await
            .unwrap();
        assert_eq!(own[0]["id"], "a");
        assert!(own[1].is_null());
    }

    #[tokio::test]
    async fn test_single_and_null_reference() {
        let ctx = context().await;
        let resolved = reference(AuthSegment::Mixed)
            .resolve(&ctx, &json!({"author": "b"}), "author")
            .await
            .unwrap();
        assert_eq!(resolved["name"], "B");

        let missing = reference(AuthSegment::Mixed)
            .resolve(&ctx, &json!({}), "author")
            .await
            .unwrap();
        assert!(missing.is_null());
    }

    #[tokio::test]
    async fn test_projection() {
        let ctx = context().await;
        let value = FieldResolver::Projection
            .resolve(&ctx, &json!({"address": {"city": "Oslo"}}), "address")
            .await
            .unwrap();
        assert_eq!(value, json!({"city": "Oslo"}));
    }
}
