//! Scalar normalization and the custom-scalar validator registry.
//!
//! The registry is built once when a [`crate::Compiler`] is constructed and
//! is read-only afterwards. Validators are opaque predicates over JSON values
//! and run at write time, never during compilation.

use std::fmt;
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use serde_json::Value;

/// Scalars every GraphQL schema knows.
pub const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "ID", "Boolean"];

/// Untyped JSON scalar used for filters, sort documents and mixed fields.
pub const JSON_SCALAR: &str = "JSON";

/// Non-negative integer scalar used for counts and totals.
pub const NON_NEGATIVE_INT_SCALAR: &str = "NonNegativeInt";

/// Timestamp scalar.
pub const DATE_TIME_SCALAR: &str = "DateTime";

/// Email: local part, `@`, dotted domain.
static EMAIL_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)+$")
        .expect("Invalid email regex")
});

/// Username: 3-32 characters, starting with a letter.
static USERNAME_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[A-Za-z][A-Za-z0-9_.\-]{2,31}$").expect("Invalid username regex")
});

/// RFC 3339 date or date-time.
static DATE_TIME_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])(T([01]\d|2[0-3]):[0-5]\d:[0-5]\d(\.\d+)?(Z|[+\-]([01]\d|2[0-3]):[0-5]\d))?$",
    )
    .expect("Invalid dateTime regex")
});

/// Maps a declared primitive to its scalar.
///
/// Integer-like primitives collapse to `Int`, floating ones to `Float` and
/// identifier-like ones to `ID`.
#[must_use]
pub fn normalize_primitive(primitive: &str) -> Option<&'static str> {
    let scalar = match primitive {
        "String" | "Str" => "String",
        "Int" | "Integer" | "Int32" | "Int64" | "Long" | "BigInt" => "Int",
        "Number" | "Float" | "Double" | "Decimal" | "Decimal128" => "Float",
        "ID" | "Id" | "ObjectId" | "UUID" => "ID",
        "Boolean" | "Bool" => "Boolean",
        "Date" | "DateTime" => DATE_TIME_SCALAR,
        "Mixed" | "Map" | "Object" | "JSON" => JSON_SCALAR,
        _ => return None,
    };
    Some(scalar)
}

/// Returns `true` for scalars synthesized without a registry entry.
#[must_use]
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_SCALARS.contains(&name) || name == JSON_SCALAR || name == NON_NEGATIVE_INT_SCALAR
}

/// A validation predicate.
pub type ScalarValidator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Custom scalar name → validator.
#[derive(Clone, Default)]
pub struct ScalarRegistry {
    validators: IndexMap<String, ScalarValidator>,
}

impl fmt::Debug for ScalarRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarRegistry")
            .field("scalars", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ScalarRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with `Password`, `Username`, `Email` and `DateTime`.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new()
            .register("Password", |value| {
                value.as_str().is_some_and(|s| {
                    s.chars().count() >= 8
                        && s.chars().any(|c| c.is_ascii_digit())
                        && s.chars().any(char::is_alphabetic)
                })
            })
            .register("Username", |value| {
                value.as_str().is_some_and(|s| USERNAME_REGEX.is_match(s))
            })
            .register("Email", |value| {
                value.as_str().is_some_and(|s| EMAIL_REGEX.is_match(s))
            })
            .register(DATE_TIME_SCALAR, |value| {
                value.as_str().is_some_and(|s| DATE_TIME_REGEX.is_match(s))
            })
    }

    /// Registers (or replaces) a validator.
    #[must_use]
    pub fn register(
        mut self,
        name: impl Into<String>,
        validator: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.validators.insert(name.into(), Arc::new(validator));
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    /// Names of registered scalars, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.keys().map(String::as_str)
    }

    /// Returns `true` if `name` is a builtin or registered scalar.
    #[must_use]
    pub fn is_known(&self, name: &str) -> bool {
        is_builtin(name) || self.contains(name)
    }

    /// Returns the validator for `name`.
    #[must_use]
    pub fn validator(&self, name: &str) -> Option<ScalarValidator> {
        self.validators.get(name).cloned()
    }

    /// Checks `value` against the validator of `name`.
    ///
    /// `null` and scalars without a validator always pass.
    #[must_use]
    pub fn validate(&self, name: &str, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        self.validators
            .get(name)
            .is_none_or(|validator| validator(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_primitive() {
        assert_eq!(normalize_primitive("Int64"), Some("Int"));
        assert_eq!(normalize_primitive("Decimal128"), Some("Float"));
        assert_eq!(normalize_primitive("ObjectId"), Some("ID"));
        assert_eq!(normalize_primitive("Date"), Some("DateTime"));
        assert_eq!(normalize_primitive("Mixed"), Some("JSON"));
        assert_eq!(normalize_primitive("Buffer"), None);
    }

    #[test]
    fn test_default_validators() {
        let registry = ScalarRegistry::with_defaults();
        assert!(registry.validate("Email", &json!("ann@example.com")));
        assert!(!registry.validate("Email", &json!("ann@")));
        assert!(registry.validate("Username", &json!("ann_01")));
        assert!(!registry.validate("Username", &json!("1ann")));
        assert!(registry.validate("Password", &json!("s3cretpass")));
        assert!(!registry.validate("Password", &json!("short1")));
        assert!(registry.validate("DateTime", &json!("2024-01-15T10:30:00Z")));
        assert!(registry.validate("DateTime", &json!("2024-01-15")));
        assert!(!registry.validate("DateTime", &json!("yesterday")));
        assert!(!registry.validate("Email", &json!(42)));
    }

    #[test]
    fn test_null_and_unvalidated_pass() {
        let registry = ScalarRegistry::with_defaults();
        assert!(registry.validate("Email", &Value::Null));
        assert!(registry.validate("String", &json!(1)));
    }

    #[test]
    fn test_custom_registration() {
        let registry = ScalarRegistry::with_defaults()
            .register("Even", |value| value.as_i64().is_some_and(|n| n % 2 == 0));
        assert!(registry.is_known("Even"));
        assert!(registry.is_known("Int"));
        assert!(!registry.is_known("Odd"));
        assert!(registry.validate("Even", &json!(4)));
        assert!(!registry.validate("Even", &json!(3)));
        assert_eq!(registry.names().count(), 5);
    }
}
