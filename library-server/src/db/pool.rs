//! Postgres pool for the library tables

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// How long a request waits for a free connection before it fails with a
/// persistence error.
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    create_pool_with_options(database_url, DEFAULT_MAX_CONNECTIONS).await
}

/// Connect eagerly so a bad `database_url` fails at startup, not on the first
/// request.
pub async fn create_pool_with_options(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;
    tracing::info!(max_connections, "database pool ready");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    // DATABASE_URL=postgres://... cargo test -p library-server -- --ignored

    #[tokio::test]
    #[ignore = "requires database"]
    async fn pool_reaches_library_schema() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool_with_options(&url, 2).await.expect("pool creation failed");
        sqlx::raw_sql(include_str!("../../tests/fixtures/schema.sql"))
            .execute(&pool)
            .await
            .expect("fixture failed");

        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_name IN ('library_api_books', 'library_api_members', 'library_api_borrows')",
        )
        .fetch_one(&pool)
        .await
        .expect("query failed");

        assert_eq!(tables, 3);
    }
}
