//! `libraryctl serve`: run the HTTP API

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use library_server::db::{create_pool_with_options, PgProvider};
use library_server::http::{run_server, AppState, ServerConfig};
use library_server::LibraryConfig;

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides config bind_addr)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (overrides config/environment)
    #[arg(long)]
    pub database_url: Option<String>,
}

pub async fn run_serve(args: ServeArgs, mut config: LibraryConfig) -> Result<()> {
    if let Some(url) = args.database_url {
        config.database_url = Some(url);
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    let database_url = config
        .database_url()
        .context("Set database_url in the config file, DATABASE_URL, or --database-url")?;
    let settings = config.repo_settings().context("Invalid configuration")?;

    tracing::info!(
        bind = %config.bind_addr,
        time_zone = %settings.time_zone,
        max_connections = config.max_connections,
        "starting library API"
    );

    let pool = create_pool_with_options(database_url, config.max_connections)
        .await
        .context("Failed to create database pool")?;

    let provider = PgProvider::new(pool).with_statement_timeout(settings.statement_timeout);
    let state = AppState::new(
        Arc::new(provider),
        settings,
        config.api_base_url.clone(),
    );
    let server = ServerConfig {
        bind_addr: config.bind_addr,
        cors_permissive: args.cors_permissive,
    };

    run_server(state, server).await.context("Server error")?;
    Ok(())
}
