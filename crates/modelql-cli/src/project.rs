//! Project loading.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use modelql_graphql::{CompiledSchema, Compiler, ProjectConfig, TypeDocument};
use tracing::debug;

/// A loaded, validated project.
pub struct Project {
    pub config: ProjectConfig,
    /// Directory relative paths in the project file resolve against.
    pub root: PathBuf,
    pub initial: Option<TypeDocument>,
}

impl Project {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read project file {}", path.display()))?;
        let config = ProjectConfig::from_path_text(path, &text)
            .with_context(|| format!("Failed to parse project file {}", path.display()))?;
        config.validate()?;

        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let initial = match &config.initial_types {
            Some(file) => {
                let file = root.join(file);
                let sdl = fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read initial types {}", file.display()))?;
                Some(TypeDocument::from_sdl(&sdl)?)
            }
            None => None,
        };
        debug!(schemas = config.schemas.len(), root = %root.display(), "Project loaded");
        Ok(Self {
            config,
            root,
            initial,
        })
    }

    pub fn compiler(&self) -> Result<Compiler> {
        let scalars = self.config.scalar_registry()?;
        Ok(Compiler::new(self.config.generate.clone(), scalars)?)
    }

    pub fn compile(&self) -> Result<(Compiler, CompiledSchema)> {
        let compiler = self.compiler()?;
        let compiled = compiler.compile_all(&self.config.schemas, self.initial.as_ref())?;
        Ok((compiler, compiled))
    }

    /// Resolves an output path against the project root.
    pub fn output_path(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}
