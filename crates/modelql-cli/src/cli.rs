use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "modelql")]
#[command(about = "Compile data models into GraphQL schemas, operations and resolvers")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project file (TOML or JSON)
    #[arg(short, long, global = true, env = "MODELQL_CONFIG", default_value = "modelql.toml")]
    pub config: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile the project and write its outputs
    Compile,
    /// Print the type document as SDL
    Sdl,
    /// Print operation documents
    Operations(OperationsArgs),
    /// Summarize the resolver table
    Resolvers,
    /// Validate the project and build the executable schema
    Check,
}

#[derive(clap::Args)]
pub struct OperationsArgs {
    /// Only documents of this resource
    #[arg(short, long)]
    pub resource: Option<String>,
    /// Print fragments instead of operations
    #[arg(long)]
    pub fragments: bool,
}
