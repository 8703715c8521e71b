//! library-server: transactional persistence and the JSON:API HTTP surface
//!
//! - `db`: connection seam, Postgres provider, per-operation transactions, resource repository
//! - `translate`: storage errors into the domain taxonomy
//! - `serializer`: JSON:API documents with pagination links
//! - `http`: axum routes for /library/{books,members,borrows}
//! - `config`: TOML file plus environment overrides

pub mod config;
pub mod db;
pub mod http;
pub mod serializer;
pub mod translate;

pub use config::{ConfigError, LibraryConfig};
pub use db::{ConnectionProvider, PgProvider, RepoSettings, ResourceRepo};
pub use http::{build_router, run_server, AppState, ServerConfig};
pub use serializer::Serializer;
