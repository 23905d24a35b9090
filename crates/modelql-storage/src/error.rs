//! Storage error types.
//!
//! Ownership failures are ordinary values of this type; callers decide
//! whether to report them per item or abort.

use std::fmt;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    /// The requested record was not found.
    #[error("Record not found: {resource}/{id}")]
    NotFound {
        /// Resource the record belongs to.
        resource: String,
        /// Identifier that was looked up.
        id: String,
    },

    /// A uniqueness constraint would be violated.
    #[error("Duplicate value for unique field {resource}.{field}: {value}")]
    AlreadyExists {
        /// Resource holding the constraint.
        resource: String,
        /// Field declared unique.
        field: String,
        /// The offending value, rendered as JSON.
        value: String,
    },

    /// The caller does not own the record it tried to modify.
    #[error("Record {resource}/{id} is not owned by the caller")]
    NotOwner {
        /// Resource the record belongs to.
        resource: String,
        /// Identifier of the record.
        id: String,
    },

    /// The payload is malformed.
    #[error("Invalid record: {message}")]
    InvalidRecord {
        /// Description of why the payload is invalid.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Creates a new `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(
        resource: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::AlreadyExists {
            resource: resource.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a new `NotOwner` error.
    #[must_use]
    pub fn not_owner(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotOwner {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Creates a new `InvalidRecord` error.
    #[must_use]
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is an ownership failure.
    #[must_use]
    pub fn is_not_owner(&self) -> bool {
        matches!(self, Self::NotOwner { .. })
    }

    /// Returns `true` if this is a uniqueness violation.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::NotOwner { .. } => ErrorCategory::Ownership,
            Self::InvalidRecord { .. } => ErrorCategory::Validation,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Record not found.
    NotFound,
    /// Uniqueness conflict.
    Conflict,
    /// Caller does not own the record.
    Ownership,
    /// Validation error.
    Validation,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Ownership => write!(f, "ownership"),
            Self::Validation => write!(f, "validation"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
