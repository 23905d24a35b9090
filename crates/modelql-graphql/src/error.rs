//! Error types for compilation and resolution.
//!
//! [`CompileError`] aborts a whole compilation run. [`ResolveError`] is scoped
//! to one request; per-item failures inside multi-target mutations travel as
//! [`ReportedError`] values instead.

use modelql_storage::StorageError;
use serde::Serialize;

/// Errors that abort a compilation run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// No schema was passed to the compiler.
    #[error("No schemas to compile")]
    EmptySchemaSet,

    /// A schema has an empty resource name.
    #[error("Schema #{index} is missing its resource name")]
    MissingResource {
        /// Position of the schema in the input set.
        index: usize,
    },

    /// Two schemas declare the same resource.
    #[error("Resource {resource} is declared more than once")]
    DuplicateResource {
        /// The duplicated resource name.
        resource: String,
    },

    /// An output file extension does not match the output format.
    #[error("Output file {path} does not match output format {format}")]
    ConflictingExtension {
        /// Offending path.
        path: String,
        /// Configured format.
        format: String,
    },

    /// A configuration value is malformed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A field declaration could not be categorized.
    #[error("Cannot classify field {type_name}.{field}: {reason}")]
    UnclassifiableField {
        /// Type holding the field.
        type_name: String,
        /// Field name.
        field: String,
        /// Why classification failed.
        reason: String,
    },

    /// A field names a scalar that is neither built in nor registered.
    #[error("Unknown scalar {scalar} on field {type_name}.{field}")]
    UnknownScalar {
        /// Type holding the field.
        type_name: String,
        /// Field name.
        field: String,
        /// The unknown scalar name.
        scalar: String,
    },

    /// A supplied document could not be parsed.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// The executable schema could not be built.
    #[error("Failed to build executable schema: {0}")]
    SchemaBuildFailed(String),
}

impl CompileError {
    /// Creates an `UnclassifiableField` error.
    #[must_use]
    pub fn unclassifiable(
        type_name: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnclassifiableField {
            type_name: type_name.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors raised before synthesis starts.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::EmptySchemaSet
                | Self::MissingResource { .. }
                | Self::DuplicateResource { .. }
                | Self::ConflictingExtension { .. }
                | Self::InvalidConfig(_)
        )
    }
}

/// Errors scoped to a single resolver invocation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    /// The operation needs a caller identity and none was supplied.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// The caller may not touch the record.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A record was not found.
    #[error("{resource}/{id} not found")]
    NotFound {
        /// Resource name.
        resource: String,
        /// Record identifier.
        id: String,
    },

    /// A scalar value failed its registered predicate.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An argument is missing or malformed.
    #[error("Bad argument: {0}")]
    BadArgument(String),

    /// Storage failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResolveError {
    /// Returns the error code for GraphQL error extensions.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "UNAUTHENTICATED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BadArgument(_) => "BAD_ARGUMENT",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<StorageError> for ResolveError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { resource, id } => Self::NotFound { resource, id },
            StorageError::NotOwner { .. } => Self::Forbidden(err.to_string()),
            StorageError::AlreadyExists { .. } | StorageError::InvalidRecord { .. } => {
                Self::Validation(err.to_string())
            }
            StorageError::Internal { .. } => Self::Storage(err.to_string()),
        }
    }
}

/// A non-fatal error returned alongside mutation data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportedError {
    /// Position of the failed item in a multi-target mutation.
    pub index: usize,
    /// Error code, see [`ResolveError::error_code`].
    pub code: &'static str,
    /// Human readable message.
    pub message: String,
}

impl ReportedError {
    /// Builds a report for the item at `index`.
    #[must_use]
    pub fn new(index: usize, err: &ResolveError) -> Self {
        Self {
            index,
            code: err.error_code(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ResolveError::Unauthenticated("x".into()).error_code(),
            "UNAUTHENTICATED"
        );
        assert_eq!(
            ResolveError::Validation("x".into()).error_code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_storage_conversion() {
        let err: ResolveError = StorageError::not_owner("User", "1").into();
        assert_eq!(err.error_code(), "FORBIDDEN");

        let err: ResolveError = StorageError::not_found("User", "2").into();
        assert_eq!(
            err,
            ResolveError::NotFound {
                resource: "User".into(),
                id: "2".into()
            }
        );
    }

    #[test]
    fn test_configuration_classification() {
        assert!(CompileError::EmptySchemaSet.is_configuration_error());
        assert!(!CompileError::unclassifiable("User", "x", "empty").is_configuration_error());
    }

    #[test]
    fn test_reported_error() {
        let report = ReportedError::new(3, &ResolveError::Forbidden("nope".into()));
        assert_eq!(report.index, 3);
        assert_eq!(report.code, "FORBIDDEN");
        assert_eq!(report.message, "Forbidden: nope");
    }
}
