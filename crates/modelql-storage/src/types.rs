//! Types shared by storage backends and resolvers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field holding a record's identifier.
pub const ID_FIELD: &str = "id";

/// Field holding the identifier of the caller that created a record.
pub const OWNER_FIELD: &str = "owner";

/// Handle describing the model a CRUD call operates on.
///
/// Resolvers build one handle per resource at synthesis time and pass it to
/// every [`CrudBackend`](crate::CrudBackend) call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelHandle {
    /// Resource name, e.g. `User`.
    pub resource: String,
    /// Top-level fields whose values must be unique across records.
    #[serde(default)]
    pub unique: Vec<String>,
}

impl ModelHandle {
    /// Creates a handle without uniqueness constraints.
    #[must_use]
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            unique: Vec::new(),
        }
    }

    /// Adds uniqueness constraints.
    #[must_use]
    pub fn with_unique(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.unique.extend(fields.into_iter().map(Into::into));
        self
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// A single sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortParam {
    /// Field to sort by.
    pub field: String,
    /// Direction of the sort.
    pub direction: SortDirection,
}

impl SortParam {
    /// Creates an ascending sort on `field`.
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Creates a descending sort on `field`.
    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Parses a MongoDB-style sort document such as `{"name": 1, "age": -1}`.
    ///
    /// Entries with a non-numeric direction are skipped.
    #[must_use]
    pub fn from_document(doc: &Value) -> Vec<Self> {
        let Some(map) = doc.as_object() else {
            return Vec::new();
        };
        map.iter()
            .filter_map(|(field, direction)| {
                let direction = direction.as_i64()?;
                Some(if direction < 0 {
                    Self::desc(field)
                } else {
                    Self::asc(field)
                })
            })
            .collect()
    }
}

/// Options for a `find` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindOptions {
    /// Number of matching records to skip.
    pub skip: Option<usize>,
    /// Maximum number of records to return.
    pub limit: Option<usize>,
    /// Sort keys, applied in order.
    #[serde(default)]
    pub sort: Vec<SortParam>,
    /// Top-level fields to keep; `None` keeps the whole record.
    pub projection: Option<Vec<String>>,
}

impl FindOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the skip count.
    #[must_use]
    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sets the limit.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the sort keys.
    #[must_use]
    pub fn with_sort(mut self, sort: Vec<SortParam>) -> Self {
        self.sort = sort;
        self
    }

    /// Sets the projection.
    #[must_use]
    pub fn with_projection(mut self, fields: Vec<String>) -> Self {
        self.projection = Some(fields);
        self
    }
}

/// Applies a top-level projection to a record.
///
/// Non-object values are returned unchanged.
#[must_use]
pub fn project(record: &Value, fields: &[String]) -> Value {
    match record {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| fields.iter().any(|f| f == *key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}
