//! libraryctl - library API server and query inspection
//!
//! - `serve`: run the JSON:API HTTP server over Postgres
//! - `explain`: print the SQL a list or lookup request compiles to
//! - `config`: show, locate or validate the configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use library_server::LibraryConfig;

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "libraryctl",
    author,
    version,
    about = "Library API server: books, members and borrows over Postgres"
)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (default: ~/.library-api/config.toml)
    #[arg(long, global = true, env = "LIBRARY_API_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Print the SQL for a collection query without touching the database
    Explain(commands::explain::ExplainArgs),
    /// Inspect configuration (show, path, validate)
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }).ok();

    match cli.command {
        Commands::Serve(args) => {
            let config = LibraryConfig::load(cli.config.as_deref())
                .context("Failed to load configuration")?;
            commands::run_serve(args, config).await?
        }
        Commands::Explain(args) => commands::run_explain(args)?,
        Commands::Config(args) => commands::run_config(args, cli.config.as_deref())?,
    }
    Ok(())
}
