use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use modelql_graphql::{CompiledSchema, OutputFormat};
use tracing::info;

use crate::output::print_success;
use crate::project::Project;

pub fn compile(project: &Project) -> Result<()> {
    let (_, compiled) = project.compile()?;
    let output = &project.config.output;

    let types = render_types(&compiled, output.format)?;
    let operations = render_operations(&compiled, output.format)?;
    emit(project, output.types_file.as_deref(), &types, "Type document")?;
    emit(project, output.operations_file.as_deref(), &operations, "Operation documents")?;
    Ok(())
}

pub fn render_types(compiled: &CompiledSchema, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Sdl => compiled.sdl.clone(),
        OutputFormat::Json => serde_json::to_string_pretty(&compiled.type_document)?,
    })
}

pub fn render_operations(compiled: &CompiledSchema, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Sdl => compiled.operations_source(),
        OutputFormat::Json => serde_json::to_string_pretty(&compiled.operation_documents)?,
    })
}

fn emit(project: &Project, file: Option<&Path>, content: &str, label: &str) -> Result<()> {
    let Some(file) = file else {
        println!("{content}");
        return Ok(());
    };
    let path = project.output_path(file);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = content.len(), "Wrote output");
    print_success(&format!("{label} written to {}", path.display()));
    Ok(())
}
