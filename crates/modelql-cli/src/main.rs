mod cli;
mod commands;
mod observability;
mod output;
mod project;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use output::print_error;
use project::Project;

fn main() {
    if let Err(e) = run() {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    observability::init_tracing_with_level(&cli.log_level);
    let project = Project::load(&cli.config)?;

    match &cli.command {
        Commands::Compile => commands::compile::compile(&project)?,
        Commands::Sdl => commands::inspect::sdl(&project)?,
        Commands::Operations(args) => commands::inspect::operations(&project, args)?,
        Commands::Resolvers => commands::inspect::resolvers(&project)?,
        Commands::Check => commands::inspect::check(&project)?,
    }

    Ok(())
}
