//! Data-model description.
//!
//! A [`ResourceSchema`] is a tree of [`SchemaNode`]s whose fields are written
//! in a permissive form ([`FieldSpec`]) and classified into tagged kinds by
//! [`crate::schema::classify`].

use indexmap::IndexMap;
use inflector::Inflector;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One resource: the root node of a model tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSchema {
    /// Resource name, e.g. `User`.
    #[serde(default)]
    pub resource: String,

    /// Root node.
    #[serde(flatten)]
    pub node: SchemaNode,

    /// Synthesized operation name → replacement name.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub operation_names: IndexMap<String, String>,

    /// Top-level fields whose values must be unique.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique: Vec<String>,

    /// Plural override; derived from the resource name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,
}

impl ResourceSchema {
    /// Creates an empty schema for `resource`.
    #[must_use]
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Self::default()
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.node.fields.insert(name.into(), spec);
        self
    }

    /// Sets the resource-level generation partial.
    #[must_use]
    pub fn generate(mut self, partial: Value) -> Self {
        self.node.generate = Some(partial);
        self
    }

    /// Adds a custom fragment part on the root node.
    #[must_use]
    pub fn fragment(mut self, part: impl Into<String>, selection: Vec<FragmentSelection>) -> Self {
        self.node.fragments.insert(part.into(), selection);
        self
    }

    /// Renames a synthesized operation.
    #[must_use]
    pub fn rename_operation(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.operation_names.insert(from.into(), to.into());
        self
    }

    /// Adds uniqueness constraints.
    #[must_use]
    pub fn unique(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.unique.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Returns the plural resource name used in operation names.
    #[must_use]
    pub fn plural_name(&self) -> String {
        self.plural
            .clone()
            .unwrap_or_else(|| pluralize(&self.resource))
    }
}

/// A resource or nested sub-object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    /// Partial generation options for this level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate: Option<Value>,

    /// Field name → declaration, in declaration order.
    #[serde(default)]
    pub fields: IndexMap<String, FieldSpec>,

    /// Custom fragment part name → selection.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fragments: IndexMap<String, Vec<FragmentSelection>>,
}

impl SchemaNode {
    /// Creates an empty node.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    /// Sets the node-level generation partial.
    #[must_use]
    pub fn generate(mut self, partial: Value) -> Self {
        self.generate = Some(partial);
        self
    }

    /// Adds a custom fragment part.
    #[must_use]
    pub fn fragment(mut self, part: impl Into<String>, selection: Vec<FragmentSelection>) -> Self {
        self.fragments.insert(part.into(), selection);
        self
    }
}

/// A field declaration as written.
///
/// `["String"]` and `[{ ref = "User" }]` declare one list level each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    List(Vec<FieldSpec>),
    Attributes(Box<FieldAttributes>),
    Primitive(String),
}

impl FieldSpec {
    /// A bare primitive such as `String`.
    #[must_use]
    pub fn primitive(name: impl Into<String>) -> Self {
        Self::Primitive(name.into())
    }

    /// A primitive with `required = true`.
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self::Attributes(Box::new(FieldAttributes {
            primitive: Some(name.into()),
            required: true,
            ..FieldAttributes::default()
        }))
    }

    /// A foreign key into `resource`.
    #[must_use]
    pub fn reference(resource: impl Into<String>) -> Self {
        Self::Attributes(Box::new(FieldAttributes {
            reference: Some(resource.into()),
            ..FieldAttributes::default()
        }))
    }

    /// A closed set of values.
    #[must_use]
    pub fn enumeration(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Attributes(Box::new(FieldAttributes {
            values: Some(values.into_iter().map(Into::into).collect()),
            ..FieldAttributes::default()
        }))
    }

    /// A custom scalar such as `Email`.
    #[must_use]
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::Attributes(Box::new(FieldAttributes {
            scalar: Some(name.into()),
            ..FieldAttributes::default()
        }))
    }

    /// A nested sub-object.
    #[must_use]
    pub fn object(node: SchemaNode) -> Self {
        Self::Attributes(Box::new(FieldAttributes {
            schema: Some(node),
            ..FieldAttributes::default()
        }))
    }

    /// Wraps this declaration in one list level.
    #[must_use]
    pub fn list(self) -> Self {
        Self::List(vec![self])
    }

    /// Sets field options, converting a bare primitive to attributes.
    #[must_use]
    pub fn with_options(self, options: Value) -> Self {
        match self {
            Self::List(mut items) => {
                if let Some(inner) = items.pop() {
                    items.push(inner.with_options(options));
                }
                Self::List(items)
            }
            Self::Attributes(mut attrs) => {
                attrs.options = options;
                Self::Attributes(attrs)
            }
            Self::Primitive(name) => Self::Attributes(Box::new(FieldAttributes {
                primitive: Some(name),
                options,
                ..FieldAttributes::default()
            })),
        }
    }
}

/// Attribute-table form of a field declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldAttributes {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub primitive: Option<String>,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,

    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,

    #[serde(default)]
    pub required: bool,

    /// Name used for the synthesized nested type instead of the field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Field-level options (`nullable`, `attach`, `authMapper`).
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

/// One entry of a custom fragment part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FragmentSelection {
    /// Select the field; nested fields spread their `Whole` part.
    Field(String),
    /// Select the field spreading a named part of its target.
    Nested { field: String, part: String },
}

impl FragmentSelection {
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    #[must_use]
    pub fn nested(field: impl Into<String>, part: impl Into<String>) -> Self {
        Self::Nested {
            field: field.into(),
            part: part.into(),
        }
    }

    /// Selected field name.
    #[must_use]
    pub fn field_name(&self) -> &str {
        match self {
            Self::Field(name) | Self::Nested { field: name, .. } => name,
        }
    }

    /// Requested sub-part, if any.
    #[must_use]
    pub fn part(&self) -> Option<&str> {
        match self {
            Self::Field(_) => None,
            Self::Nested { part, .. } => Some(part),
        }
    }
}

/// English plural of a resource name.
///
/// Only the last word of a PascalCase name is inflected, so `BlogPost`
/// becomes `BlogPosts`. A word Inflector treats as uncountable takes a
/// plain `s` so single and multi operations never share a name.
#[must_use]
pub fn pluralize(name: &str) -> String {
    let split = name
        .char_indices()
        .rev()
        .find(|&(i, c)| {
            c.is_uppercase() && name[..i].chars().next_back().is_some_and(char::is_lowercase)
        })
        .map_or(0, |(i, _)| i);
    let (head, word) = name.split_at(split);
    let lower = word.to_lowercase();
    let plural = match IRREGULAR.iter().find(|(singular, _)| *singular == lower) {
        Some((_, plural)) => (*plural).to_string(),
        None => lower.to_plural(),
    };
    if plural == lower {
        return format!("{name}s");
    }

    let plural = if word.chars().count() > 1 && !word.chars().any(char::is_lowercase) {
        plural.to_uppercase()
    } else if word.starts_with(char::is_uppercase) {
        let mut chars = plural.chars();
        chars
            .next()
            .map(|first| first.to_uppercase().chain(chars).collect())
            .unwrap_or_default()
    } else {
        plural
    };
    format!("{head}{plural}")
}

// Inflector's `person` and `(m|l)ouse` rules append to the singular stem.
const IRREGULAR: &[(&str, &str)] = &[("person", "people"), ("mouse", "mice"), ("louse", "lice")];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("User"), "Users");
        assert_eq!(pluralize("Address"), "Addresses");
        assert_eq!(pluralize("Category"), "Categories");
        assert_eq!(pluralize("Day"), "Days");
        assert_eq!(pluralize("Box"), "Boxes");
    }

    #[test]
    fn test_pluralize_irregular_words() {
        assert_eq!(pluralize("Person"), "People");
        assert_eq!(pluralize("Child"), "Children");
        assert_eq!(pluralize("Quiz"), "Quizzes");
        assert_eq!(pluralize("Mouse"), "Mice");
        assert_eq!(pluralize("Knife"), "Knives");
        assert_eq!(pluralize("BlogPost"), "BlogPosts");
        assert_eq!(pluralize("SalesPerson"), "SalesPeople");
        assert_eq!(pluralize("URL"), "URLS");
        // uncountable words still get a distinct plural
        assert_eq!(pluralize("Sheep"), "Sheeps");
    }

    #[test]
    fn test_plural_names_reach_operations() {
        let schema = ResourceSchema::new("Person");
        assert_eq!(schema.plural_name(), "People");
        let renamed = ResourceSchema {
            plural: Some("Persons".into()),
            ..ResourceSchema::new("Person")
        };
        assert_eq!(renamed.plural_name(), "Persons");
    }

    #[test]
    fn test_deserialize_from_toml() {
        let schema: ResourceSchema = toml::from_str(
            r#"
            resource = "User"
            unique = ["email"]
            generate = { query = { paginated = false } }

            [fields]
            name = { type = "String", required = true }
            nick = "String"
            role = { enum = ["ADMIN", "MEMBER"] }
            friends = [{ ref = "User" }]
            address = { schema = { fields = { city = "String" } } }

            [fragments]
            Preview = ["name", { field = "address", part = "ScalarsOnly" }]
            "#,
        )
        .unwrap();

        assert_eq!(schema.resource, "User");
        assert_eq!(schema.unique, vec!["email".to_string()]);
        assert_eq!(
            schema.node.generate,
            Some(json!({"query": {"paginated": false}}))
        );
        assert_eq!(schema.node.fields.len(), 5);
        assert_eq!(schema.node.fields["nick"], FieldSpec::primitive("String"));
        assert!(matches!(&schema.node.fields["friends"], FieldSpec::List(items) if items.len() == 1));
        let FieldSpec::Attributes(address) = &schema.node.fields["address"] else {
            panic!("address should be an attribute table");
        };
        assert!(address.schema.is_some());
        assert_eq!(
            schema.node.fragments["Preview"],
            vec![
                FragmentSelection::field("name"),
                FragmentSelection::nested("address", "ScalarsOnly")
            ]
        );
    }

    #[test]
    fn test_builders_match_parsed_form() {
        let built = ResourceSchema::new("User")
            .field("name", FieldSpec::required("String"))
            .field("friends", FieldSpec::reference("User").list());
        let parsed: ResourceSchema = serde_json::from_value(json!({
            "resource": "User",
            "fields": {
                "name": {"type": "String", "required": true},
                "friends": [{"ref": "User"}]
            }
        }))
        .unwrap();
        assert_eq!(built, parsed);
        assert_eq!(built.plural_name(), "Users");
    }
}
