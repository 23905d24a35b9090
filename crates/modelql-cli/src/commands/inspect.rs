use anyhow::{Result, bail};
use colored::Colorize;

use crate::cli::OperationsArgs;
use crate::output::{print_field, print_success};
use crate::project::Project;

pub fn sdl(project: &Project) -> Result<()> {
    let (_, compiled) = project.compile()?;
    println!("{}", compiled.sdl);
    Ok(())
}

pub fn operations(project: &Project, args: &OperationsArgs) -> Result<()> {
    let (_, compiled) = project.compile()?;
    if args.fragments {
        println!("{}", compiled.fragments.to_source());
        return Ok(());
    }
    if let Some(resource) = &args.resource
        && compiled.resolver_table.get(resource).is_none()
    {
        bail!("Unknown resource: {resource}");
    }
    let documents: Vec<_> = compiled
        .operation_documents
        .iter()
        .filter(|document| {
            args.resource
                .as_deref()
                .is_none_or(|resource| document.resource == resource)
        })
        .map(|document| document.source.as_str())
        .collect();
    println!("{}", documents.join("\n"));
    Ok(())
}

pub fn resolvers(project: &Project) -> Result<()> {
    let (_, compiled) = project.compile()?;
    for (resource, resolvers) in compiled.resolver_table.resources() {
        println!("{}", resource.bold());
        print_field("  Query", resolvers.query.len());
        print_field("  Mutation", resolvers.mutation.len());
        for (type_name, fields) in &resolvers.types {
            let names: Vec<_> = fields.keys().map(String::as_str).collect();
            print_field(&format!("  {type_name}"), names.join(", "));
        }
    }
    Ok(())
}

pub fn check(project: &Project) -> Result<()> {
    let (compiler, compiled) = project.compile()?;
    compiled.type_document.to_ast()?;
    for document in &compiled.operation_documents {
        document.to_ast()?;
    }
    compiler.executable_schema(&compiled)?;
    print_success(&format!(
        "{} resources, {} definitions, {} operations, {} fragments",
        compiled.resolver_table.len(),
        compiled.type_document.len(),
        compiled.operation_documents.len(),
        compiled.fragments.len()
    ));
    Ok(())
}
