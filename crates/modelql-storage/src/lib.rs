//! # modelql-storage
//!
//! Storage boundary for modelql resolvers.
//!
//! This crate defines the traits synthesized resolvers call into. It does not
//! contain any implementation; `modelql-db-memory` provides one.
//!
//! ## Overview
//!
//! - [`ResourceStore`] - per-resource lookups (`find_by_id`, `find`, `count`)
//! - [`CrudBackend`] - create / update / delete with ownership checks
//!
//! ## Example
//!
//! ```ignore
//! use modelql_storage::{CrudBackend, ModelHandle};
//!
//! let model = ModelHandle::new("User").with_unique(["email"]);
//! let created = backend.create(&model, json!({"name": "Ann"}), "caller-1").await?;
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::{CrudBackend, ResourceStore};
pub use types::{
    FindOptions, ID_FIELD, ModelHandle, OWNER_FIELD, SortDirection, SortParam, project,
};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared resource store.
pub type DynStore = std::sync::Arc<dyn ResourceStore>;

/// Type alias for a shared CRUD backend.
pub type DynCrud = std::sync::Arc<dyn CrudBackend>;
