//! Project configuration.
//!
//! A project file holds the global generation options, output settings,
//! extra scalars and the resource schemas to compile. TOML and JSON are
//! both accepted.
//!
//! # Example Configuration
//!
//! ```toml
//! generate = { mutation = { delete = false } }
//! initial_types = "base.graphql"
//!
//! [output]
//! types_file = "schema.graphql"
//! operations_file = "operations.graphql"
//! format = "sdl"
//!
//! [scalars]
//! Slug = "^[a-z0-9-]+$"
//!
//! [[schemas]]
//! resource = "User"
//! unique = ["email"]
//!
//! [schemas.fields]
//! name = { type = "String", required = true }
//! email = { scalar = "Email" }
//! ```

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CompileError;
use crate::model::ResourceSchema;
use crate::scalars::ScalarRegistry;

/// Serialization of generated artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// GraphQL SDL and executable document text.
    #[default]
    Sdl,
    /// JSON listings of definitions and documents.
    Json,
}

impl OutputFormat {
    fn accepts(self, extension: &str) -> bool {
        match self {
            Self::Sdl => matches!(extension, "graphql" | "gql"),
            Self::Json => extension == "json",
        }
    }
}

/// Where generated artifacts go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Type document destination. Printed to stdout when absent.
    pub types_file: Option<PathBuf>,
    /// Operation document destination. Printed to stdout when absent.
    pub operations_file: Option<PathBuf>,
    pub format: OutputFormat,
}

impl OutputConfig {
    /// Checks output paths against the format.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::ConflictingExtension`] for a path whose
    /// extension belongs to the other format.
    pub fn validate(&self) -> Result<(), CompileError> {
        for path in [&self.types_file, &self.operations_file].into_iter().flatten() {
            let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            let extension = extension.to_ascii_lowercase();
            let known = OutputFormat::Sdl.accepts(&extension) || OutputFormat::Json.accepts(&extension);
            if known && !self.format.accepts(&extension) {
                return Err(CompileError::ConflictingExtension {
                    path: path.display().to_string(),
                    format: format!("{:?}", self.format).to_lowercase(),
                });
            }
        }
        Ok(())
    }
}

/// A project file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Global generation partial.
    pub generate: Value,
    pub output: OutputConfig,
    /// SDL file whose definitions precede the generated ones.
    pub initial_types: Option<PathBuf>,
    /// Extra scalar name → regex the values must match.
    pub scalars: IndexMap<String, String>,
    pub schemas: Vec<ResourceSchema>,
}

impl ProjectConfig {
    /// Parses a TOML project.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidConfig`] on a parse failure.
    pub fn from_toml(text: &str) -> Result<Self, CompileError> {
        toml::from_str(text).map_err(|e| CompileError::InvalidConfig(e.to_string()))
    }

    /// Parses a JSON project.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidConfig`] on a parse failure.
    pub fn from_json(text: &str) -> Result<Self, CompileError> {
        serde_json::from_str(text).map_err(|e| CompileError::InvalidConfig(e.to_string()))
    }

    /// Parses by file extension: `.json` is JSON, anything else TOML.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidConfig`] on a parse failure.
    pub fn from_path_text(path: &Path, text: &str) -> Result<Self, CompileError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json(text),
            _ => Self::from_toml(text),
        }
    }

    /// Validates the project before any synthesis.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found.
    pub fn validate(&self) -> Result<(), CompileError> {
        if self.schemas.is_empty() {
            return Err(CompileError::EmptySchemaSet);
        }
        if let Some(index) = self.schemas.iter().position(|s| s.resource.trim().is_empty()) {
            return Err(CompileError::MissingResource { index });
        }
        if !(self.generate.is_null() || self.generate.is_object() || self.generate.is_boolean()) {
            return Err(CompileError::InvalidConfig(
                "generate must be a table or a boolean".into(),
            ));
        }
        self.output.validate()
    }

    /// Default scalars plus the project's pattern scalars.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidConfig`] for an invalid pattern.
    pub fn scalar_registry(&self) -> Result<ScalarRegistry, CompileError> {
        let mut registry = ScalarRegistry::with_defaults();
        for (name, pattern) in &self.scalars {
            let regex = regex::Regex::new(pattern).map_err(|e| {
                CompileError::InvalidConfig(format!("scalar {name}: invalid pattern: {e}"))
            })?;
            registry = registry.register(name, move |value| {
                value.as_str().is_some_and(|s| regex.is_match(s))
            });
        }
        Ok(registry)
    }
}
