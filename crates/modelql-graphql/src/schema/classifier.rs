//! Field classification.
//!
//! Turns a permissive [`FieldSpec`] into a tagged [`FieldKind`] with its list
//! depth and target type name. Precedence: nested schema, enum values,
//! reference, explicit scalar, declared primitive.

use heck::{ToShoutySnakeCase, ToUpperCamelCase};
use serde_json::Value;

use crate::error::CompileError;
use crate::model::{FieldAttributes, FieldSpec, SchemaNode};
use crate::scalars::{ScalarRegistry, normalize_primitive};

/// Generic kind of a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind<'a> {
    Scalar,
    Enum { values: &'a [String] },
    Reference,
    Object { node: &'a SchemaNode },
}

impl FieldKind<'_> {
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference)
    }

    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object { .. })
    }
}

/// A classified field.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedField<'a> {
    pub name: String,
    pub kind: FieldKind<'a>,
    /// Number of list levels around the named type.
    pub depth: usize,
    /// Scalar name, enum name, referenced resource or nested type name.
    pub target: String,
    pub required: bool,
    pub description: Option<String>,
    pub options: &'a Value,
}

static NO_OPTIONS: Value = Value::Null;

/// Classifies the field `name` of the type `parent`.
///
/// # Errors
///
/// Returns [`CompileError::UnclassifiableField`] for malformed declarations
/// and [`CompileError::UnknownScalar`] for scalars that are neither builtin
/// nor registered.
pub fn classify<'a>(
    parent: &str,
    name: &str,
    spec: &'a FieldSpec,
    scalars: &ScalarRegistry,
) -> Result<ClassifiedField<'a>, CompileError> {
    classify_at(parent, name, spec, 0, scalars)
}

fn classify_at<'a>(
    parent: &str,
    name: &str,
    spec: &'a FieldSpec,
    depth: usize,
    scalars: &ScalarRegistry,
) -> Result<ClassifiedField<'a>, CompileError> {
    match spec {
        FieldSpec::List(items) => {
            let [inner] = items.as_slice() else {
                return Err(CompileError::unclassifiable(
                    parent,
                    name,
                    format!("list declarations need exactly one element, found {}", items.len()),
                ));
            };
            classify_at(parent, name, inner, depth + 1, scalars)
        }
        FieldSpec::Primitive(primitive) => Ok(ClassifiedField {
            name: name.to_string(),
            kind: FieldKind::Scalar,
            depth,
            target: scalar_name(parent, name, primitive, scalars)?,
            required: false,
            description: None,
            options: &NO_OPTIONS,
        }),
        FieldSpec::Attributes(attrs) => classify_attributes(parent, name, attrs, depth, scalars),
    }
}

fn classify_attributes<'a>(
    parent: &str,
    name: &str,
    attrs: &'a FieldAttributes,
    depth: usize,
    scalars: &ScalarRegistry,
) -> Result<ClassifiedField<'a>, CompileError> {
    let (kind, target) = if let Some(node) = &attrs.schema {
        let local = attrs.alias.as_deref().unwrap_or(name);
        (
            FieldKind::Object { node },
            format!("{parent}{}", local.to_upper_camel_case()),
        )
    } else if let Some(values) = &attrs.values {
        if values.is_empty() {
            return Err(CompileError::unclassifiable(parent, name, "enum has no values"));
        }
        (
            FieldKind::Enum { values },
            format!("{parent}_{name}").to_shouty_snake_case(),
        )
    } else if let Some(resource) = &attrs.reference {
        if resource.is_empty() {
            return Err(CompileError::unclassifiable(parent, name, "empty reference"));
        }
        (FieldKind::Reference, resource.clone())
    } else if let Some(scalar) = &attrs.scalar {
        let known = normalize_primitive(scalar)
            .map(str::to_string)
            .or_else(|| scalars.is_known(scalar).then(|| scalar.clone()));
        let Some(target) = known else {
            return Err(CompileError::UnknownScalar {
                type_name: parent.to_string(),
                field: name.to_string(),
                scalar: scalar.clone(),
            });
        };
        (FieldKind::Scalar, target)
    } else if let Some(primitive) = &attrs.primitive {
        (FieldKind::Scalar, scalar_name(parent, name, primitive, scalars)?)
    } else {
        return Err(CompileError::unclassifiable(
            parent,
            name,
            "declaration has no type, enum, ref, scalar or schema",
        ));
    };

    Ok(ClassifiedField {
        name: name.to_string(),
        kind,
        depth,
        target,
        required: attrs.required,
        description: attrs.description.clone(),
        options: &attrs.options,
    })
}

fn scalar_name(
    parent: &str,
    name: &str,
    primitive: &str,
    scalars: &ScalarRegistry,
) -> Result<String, CompileError> {
    if let Some(scalar) = normalize_primitive(primitive) {
        return Ok(scalar.to_string());
    }
    if scalars.contains(primitive) {
        return Ok(primitive.to_string());
    }
    Err(CompileError::UnknownScalar {
        type_name: parent.to_string(),
        field: name.to_string(),
        scalar: primitive.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ScalarRegistry {
        ScalarRegistry::with_defaults()
    }

    #[test]
    fn test_primitive_normalization() {
        let spec = FieldSpec::primitive("Int64");
        let field = classify("User", "age", &spec, &registry()).unwrap();
        assert_eq!(field.kind, FieldKind::Scalar);
        assert_eq!(field.target, "Int");
        assert_eq!(field.depth, 0);
    }

    #[test]
    fn test_list_depth() {
        let spec = FieldSpec::primitive("String").list().list();
        let field = classify("User", "matrix", &spec, &registry()).unwrap();
        assert_eq!(field.depth, 2);
        assert_eq!(field.target, "String");

        let bad = FieldSpec::List(vec![FieldSpec::primitive("String"), FieldSpec::primitive("Int")]);
        assert!(matches!(
            classify("User", "pair", &bad, &registry()),
            Err(CompileError::UnclassifiableField { .. })
        ));
    }

    #[test]
    fn test_precedence() {
        let spec = FieldSpec::Attributes(Box::new(FieldAttributes {
            primitive: Some("String".into()),
            values: Some(vec!["A".into()]),
            reference: Some("Team".into()),
            ..FieldAttributes::default()
        }));
        let field = classify("User", "kind", &spec, &registry()).unwrap();
        assert!(matches!(field.kind, FieldKind::Enum { .. }));
        assert_eq!(field.target, "USER_KIND");

        let spec = FieldSpec::Attributes(Box::new(FieldAttributes {
            reference: Some("Team".into()),
            scalar: Some("Email".into()),
            schema: Some(SchemaNode::new()),
            alias: Some("homeAddress".into()),
            ..FieldAttributes::default()
        }));
        let field = classify("User", "address", &spec, &registry()).unwrap();
        assert!(field.kind.is_object());
        assert_eq!(field.target, "UserHomeAddress");
    }

    #[test]
    fn test_reference_and_scalar() {
        let spec = FieldSpec::reference("Team").list();
        let field = classify("User", "teams", &spec, &registry()).unwrap();
        assert!(field.kind.is_reference());
        assert_eq!(field.target, "Team");
        assert_eq!(field.depth, 1);

        let spec = FieldSpec::scalar("Email");
        assert_eq!(classify("User", "email", &spec, &registry()).unwrap().target, "Email");
    }

    #[test]
    fn test_unknown_scalar() {
        let spec = FieldSpec::scalar("Phone");
        let err = classify("User", "phone", &spec, &registry()).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownScalar {
                type_name: "User".into(),
                field: "phone".into(),
                scalar: "Phone".into()
            }
        );
        let spec = FieldSpec::primitive("Buffer");
        assert!(classify("User", "blob", &spec, &registry()).is_err());
    }

    #[test]
    fn test_empty_declaration() {
        let spec = FieldSpec::Attributes(Box::default());
        assert!(matches!(
            classify("User", "ghost", &spec, &registry()),
            Err(CompileError::UnclassifiableField { .. })
        ));
    }
}
