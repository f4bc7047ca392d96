//! Database configuration and connection pool initialization.
//!
//! The database URL is read from the `DATABASE_URL` environment variable.
//! A missing variable or unreachable database is fatal at startup.

use sqlx::PgPool;
use std::env;

/// Initializes a PostgreSQL connection pool.
///
/// Called once during application startup. The returned pool is cheaply
/// cloneable and is shared through the application state.
///
/// # Panics
///
/// Panics if `DATABASE_URL` is not set or the connection fails.
pub async fn init_db_pool() -> PgPool {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to database")
}
