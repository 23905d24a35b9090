//! In-memory storage backend for modelql resolvers.
//!
//! This crate provides an in-memory implementation of the `CrudBackend` and
//! `ResourceStore` traits from `modelql-storage`.
//!
//! # Example
//!
//! ```ignore
//! use modelql_db_memory::InMemoryStore;
//! use modelql_storage::{CrudBackend, ModelHandle};
//!
//! let store = InMemoryStore::new();
//! let user = store
//!     .create(&ModelHandle::new("User"), json!({"name": "Ann"}), "caller-1")
//!     .await?;
//! let users = store.store("User");
//! ```

pub mod query;
pub mod storage;

pub use modelql_storage::{CrudBackend, ResourceStore, StorageError};
pub use query::{matches, sort_records};
pub use storage::InMemoryStore;

/// Type alias for a shareable in-memory store.
pub type SharedMemoryStore = std::sync::Arc<InMemoryStore>;

/// Creates a new shareable in-memory store.
pub fn create_memory_store() -> SharedMemoryStore {
    std::sync::Arc::new(InMemoryStore::new())
}
