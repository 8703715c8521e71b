//! Database layer - connection seam, Postgres provider and the resource repository
//!
//! - One transaction per operation, released on every exit path
//! - Bound parameters only; SQL text comes from library-core builders
//! - Rely on DB constraints (foreign keys) and translate their violations

pub mod connection;
pub mod pool;
pub mod postgres;
pub mod repo;
pub mod transaction;

pub use connection::{Connection, ConnectionProvider, DbError, ExecOutcome, FOREIGN_KEY_VIOLATION};
pub use pool::{create_pool, create_pool_with_options};
pub use postgres::PgProvider;
pub use repo::{RepoSettings, ResourceRepo};
pub use transaction::TransactionContext;
