//! Integration tests for the in-memory CRUD backend and read views.

use modelql_db_memory::InMemoryStore;
use modelql_storage::{
    CrudBackend, FindOptions, ModelHandle, ResourceStore, SortParam, StorageError,
};
use serde_json::{Value, json};

fn users() -> ModelHandle {
    ModelHandle::new("User").with_unique(["email"])
}

#[tokio::test]
async fn create_stamps_id_and_owner() {
    let store = InMemoryStore::new();
    let created = store
        .create(&users(), json!({"name": "Ann"}), "u1")
        .await
        .unwrap();

    assert_eq!(created["owner"], "u1");
    assert!(created["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(store.len("User").await, 1);
}

#[tokio::test]
async fn create_rejects_duplicate_unique_value() {
    let store = InMemoryStore::new();
    store
        .create(&users(), json!({"email": "a@x.io"}), "u1")
        .await
        .unwrap();
    let err = store
        .create(&users(), json!({"email": "a@x.io"}), "u2")
        .await
        .unwrap_err();

    assert!(err.is_already_exists());
}

#[tokio::test]
async fn update_and_delete_check_ownership() {
    let store = InMemoryStore::new();
    store
        .insert("User", json!({"id": "1", "owner": "u1", "name": "Ann"}))
        .await
        .unwrap();

    let err = store
        .update(&users(), json!({"id": "1", "name": "Eve"}), "u2")
        .await
        .unwrap_err();
    assert_eq!(err, StorageError::not_owner("User", "1"));

    let updated = store
        .update(&users(), json!({"id": "1", "name": "Bea", "owner": "u9"}), "u1")
        .await
        .unwrap();
    assert_eq!(updated, json!({"id": "1", "owner": "u1", "name": "Bea"}));

    assert!(store.delete(&users(), "1", "u2").await.unwrap_err().is_not_owner());
    assert!(store.delete(&users(), "404", "u1").await.unwrap_err().is_not_found());

    let removed = store.delete(&users(), "1", "u1").await.unwrap();
    assert_eq!(removed["name"], "Bea");
    assert!(store.is_empty("User").await);
}

#[tokio::test]
async fn find_filters_sorts_and_paginates() {
    let store = InMemoryStore::new();
    for (id, owner, age) in [("1", "u1", 30), ("2", "u2", 20), ("3", "u1", 40), ("4", "u1", 10)] {
        store
            .insert("User", json!({"id": id, "owner": owner, "age": age}))
            .await
            .unwrap();
    }
    let view = store.store("User");

    let options = FindOptions::new()
        .with_sort(vec![SortParam::desc("age")])
        .with_skip(1)
        .with_limit(2)
        .with_projection(vec!["id".to_string()]);
    let page = view.find(&json!({"owner": "u1"}), &options).await.unwrap();
    assert_eq!(page, vec![json!({"id": "1"}), json!({"id": "4"})]);

    assert_eq!(view.count(&json!({"owner": {"$ne": "u1"}})).await.unwrap(), 1);
    assert_eq!(view.count(&json!({})).await.unwrap(), 4);
}

#[tokio::test]
async fn find_by_ids_preserves_request_order() {
    let store = InMemoryStore::new();
    for id in ["a", "b", "c"] {
        store.insert("User", json!({"id": id})).await.unwrap();
    }
    let view = store.store("User");

    let ids = vec!["c".to_string(), "missing".to_string(), "a".to_string()];
    let found = view.find_by_ids(&ids).await.unwrap();
    let found: Vec<Option<&str>> = found
        .iter()
        .map(|r| r.as_ref().and_then(|r| r["id"].as_str()))
        .collect();
    assert_eq!(found, vec![Some("c"), None, Some("a")]);

    assert_eq!(view.resource(), "User");
    assert_eq!(view.find_by_id("zzz").await.unwrap(), None::<Value>);
}
